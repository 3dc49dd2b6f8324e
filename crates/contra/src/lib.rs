#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use contra_tensor as tensor;

#[doc(inline)]
pub use contra_kernels as kernels;

#[doc(inline)]
pub use contra_ops as ops;
