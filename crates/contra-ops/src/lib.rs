#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for tensor operations.
///
/// Defines [`TensorOpsError`] for handling failures during contractions.
pub mod error;

/// Rank-4 by rank-2 contraction over the trailing dimensions.
///
/// Provides [`contract`] and [`contract_with_path`] together with the
/// [`ContractionPath`] strategies.
pub mod contraction;

/// Einstein summation over dense strided operands.
pub mod einsum;

pub use contraction::{contract, contract_with_path, ContractionPath};
pub use einsum::{einsum, einsum_with_path, EinsumOperand};
pub use error::TensorOpsError;
