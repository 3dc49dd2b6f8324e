#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! `contra-tensor` stores multi-dimensional arrays in a single flat buffer with
//! explicit strides, so contraction kernels can walk the data either by logical
//! index or as a contiguous slice.
//!
//! ```rust
//! use contra_tensor::{Tensor, CpuAllocator};
//!
//! let t = Tensor::<i32, 4, _>::from_shape_vec([1, 2, 2, 2], (1..=8).collect(), CpuAllocator).unwrap();
//! let rows = t.reshape([2, 4]).unwrap();
//! assert_eq!(*rows.get_unchecked([1, 0]), 5);
//! ```

/// Allocator module containing memory management utilities.
///
/// Provides the [`TensorAllocator`] trait and the system-backed [`CpuAllocator`].
pub mod allocator;

/// Serde module for serialization and deserialization of tensors.
#[cfg(feature = "serde")]
pub mod serde;

/// Storage module containing the owned element buffer.
pub mod storage;

/// Tensor module containing the main tensor implementation and error types.
pub mod tensor;

/// View module containing non-owning tensor views.
pub mod view;

pub use crate::allocator::{CpuAllocator, TensorAllocator};
pub use crate::tensor::{Tensor, TensorError};
pub use crate::view::TensorView;

/// Type alias for a 1-dimensional tensor.
pub type Tensor1<T, A> = Tensor<T, 1, A>;

/// Type alias for a 2-dimensional tensor.
pub type Tensor2<T, A> = Tensor<T, 2, A>;

/// Type alias for a 3-dimensional tensor.
pub type Tensor3<T, A> = Tensor<T, 3, A>;

/// Type alias for a 4-dimensional tensor.
pub type Tensor4<T, A> = Tensor<T, 4, A>;
