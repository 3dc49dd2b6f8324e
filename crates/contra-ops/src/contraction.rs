use std::borrow::Cow;

use contra_kernels::ops::{contract_naive_kernel, matvec_kernel, matvec_parallel_kernel};
use contra_tensor::{Tensor, TensorAllocator};
use num_traits::Zero;

use crate::error::TensorOpsError;

/// The evaluation strategy of a contraction.
///
/// Every path computes the same sums; they differ only in memory access pattern
/// and in how the work is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContractionPath {
    /// Four nested loops over the strided operands.
    Naive,
    /// One contiguous dot product per output cell, i.e. a `(P*Q, R*S)` matrix
    /// times a length `R*S` vector.
    #[default]
    Optimized,
    /// The optimized layout with output rows split across the rayon thread pool.
    Parallel,
}

impl std::str::FromStr for ContractionPath {
    type Err = TensorOpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "naive" => Ok(Self::Naive),
            "optimized" | "optimize" => Ok(Self::Optimized),
            "parallel" => Ok(Self::Parallel),
            _ => Err(TensorOpsError::UnknownPath(s.to_string())),
        }
    }
}

impl std::fmt::Display for ContractionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Naive => "naive",
            Self::Optimized => "optimized",
            Self::Parallel => "parallel",
        };
        write!(f, "{name}")
    }
}

/// Contract a rank-4 tensor with a rank-2 tensor over the trailing two dimensions.
///
/// Computes `J[p, q] = sum_{r, s} I[p, q, r, s] * D[r, s]` with the
/// [`ContractionPath::Optimized`] path.
///
/// # Arguments
///
/// * `i` - The rank-4 tensor of shape `(P, Q, R, S)`.
/// * `d` - The rank-2 tensor of shape `(R, S)`.
///
/// # Returns
///
/// A new tensor of shape `(P, Q)`, allocated with the allocator of `i`.
///
/// # Errors
///
/// Returns [`TensorOpsError::ShapeMismatch`] if the trailing dimensions of `i` differ from the shape of `d`.
///
/// # Example
///
/// ```
/// use contra_tensor::{Tensor, CpuAllocator};
/// use contra_ops::contraction::contract;
///
/// let i = Tensor::<i64, 4, _>::from_shape_vec([2, 2, 2, 2], (1..=16).collect(), CpuAllocator).unwrap();
/// let d = Tensor::<i64, 2, _>::from_shape_vec([2, 2], vec![1, 2, 3, 4], CpuAllocator).unwrap();
/// let j = contract(&i, &d).unwrap();
/// assert_eq!(j.shape, [2, 2]);
/// assert_eq!(j.as_slice(), &[30, 70, 110, 150]);
/// ```
pub fn contract<T, A>(
    i: &Tensor<T, 4, A>,
    d: &Tensor<T, 2, A>,
) -> Result<Tensor<T, 2, A>, TensorOpsError>
where
    T: Zero + Copy + Send + Sync + std::ops::Add<Output = T> + std::ops::Mul<Output = T>,
    A: TensorAllocator,
{
    contract_with_path(i, d, ContractionPath::default())
}

/// Contract a rank-4 tensor with a rank-2 tensor using an explicit evaluation path.
///
/// Inputs in any stride layout are accepted. The naive path walks the strides
/// directly, the other paths first obtain a row-major copy when needed.
///
/// # Arguments
///
/// * `i` - The rank-4 tensor of shape `(P, Q, R, S)`.
/// * `d` - The rank-2 tensor of shape `(R, S)`.
/// * `path` - The evaluation strategy.
///
/// # Errors
///
/// Returns [`TensorOpsError::ShapeMismatch`] if the trailing dimensions of `i` differ from the shape of `d`.
///
/// # Example
///
/// ```
/// use contra_tensor::{Tensor, CpuAllocator};
/// use contra_ops::contraction::{contract_with_path, ContractionPath};
///
/// let i = Tensor::<i64, 4, _>::from_shape_fn([3, 2, 4, 5], CpuAllocator, |[p, q, r, s]| {
///     (p + q + r + s) as i64
/// })
/// .unwrap();
/// let d = Tensor::<i64, 2, _>::from_shape_fn([4, 5], CpuAllocator, |[r, s]| (r + s) as i64).unwrap();
///
/// let naive = contract_with_path(&i, &d, ContractionPath::Naive).unwrap();
/// let fast = contract_with_path(&i, &d, ContractionPath::Optimized).unwrap();
/// assert_eq!(naive.as_slice(), fast.as_slice());
/// ```
pub fn contract_with_path<T, A>(
    i: &Tensor<T, 4, A>,
    d: &Tensor<T, 2, A>,
    path: ContractionPath,
) -> Result<Tensor<T, 2, A>, TensorOpsError>
where
    T: Zero + Copy + Send + Sync + std::ops::Add<Output = T> + std::ops::Mul<Output = T>,
    A: TensorAllocator,
{
    let [p, q, r, s] = i.shape;
    if [r, s] != d.shape {
        return Err(TensorOpsError::ShapeMismatch(
            vec![r, s],
            d.shape.to_vec(),
        ));
    }

    log::debug!(
        "contracting {:?} with {:?} using the {} path",
        i.shape,
        d.shape,
        path
    );

    let mut out = vec![T::zero(); p * q];

    match path {
        ContractionPath::Naive => contract_naive_kernel(
            i.as_slice(),
            i.shape,
            i.strides,
            d.as_slice(),
            d.strides,
            &mut out,
        )?,
        ContractionPath::Optimized | ContractionPath::Parallel => {
            let i_std = if i.is_standard_layout() {
                Cow::Borrowed(i)
            } else {
                Cow::Owned(i.to_standard_layout()?)
            };
            let (rows, cols) = (p * q, r * s);
            let i_mat = i_std.reshape([rows, cols])?;
            let d_vec = d.to_contiguous_data();

            if path == ContractionPath::Parallel {
                matvec_parallel_kernel(i_mat.as_slice(), rows, cols, &d_vec, &mut out)?;
            } else {
                matvec_kernel(i_mat.as_slice(), rows, cols, &d_vec, &mut out)?;
            }
        }
    }

    Ok(Tensor::from_shape_vec(
        [p, q],
        out,
        i.storage.alloc().clone(),
    )?)
}
