use crate::error::KernelError;
use num_traits::Zero;
use rayon::prelude::*;

#[inline]
fn dot_unchecked<T>(a: &[T], b: &[T]) -> T
where
    T: Zero + Copy + std::ops::Add<Output = T> + std::ops::Mul<Output = T>,
{
    a.iter()
        .zip(b.iter())
        .fold(T::zero(), |acc, (a_val, b_val)| acc + *a_val * *b_val)
}

/// Computes the dot product of two slices.
///
/// # Arguments
///
/// * `a` - First slice of values
/// * `b` - Second slice of values
///
/// # Errors
///
/// If the lengths of the slices don't match, a `LengthMismatch` error is returned.
///
/// Example:
/// ```
/// use contra_kernels::ops::dot_product1_kernel;
///
/// let a = [1, 2, 3];
/// let b = [4, 5, 6];
/// assert_eq!(dot_product1_kernel(&a, &b).unwrap(), 32);
/// ```
pub fn dot_product1_kernel<T>(a: &[T], b: &[T]) -> Result<T, KernelError>
where
    T: Zero + Copy + std::ops::Add<Output = T> + std::ops::Mul<Output = T>,
{
    if a.len() != b.len() {
        return Err(KernelError::LengthMismatch(a.len(), b.len()));
    }

    Ok(dot_unchecked(a, b))
}

fn check_matvec<T>(
    a: &[T],
    rows: usize,
    cols: usize,
    x: &[T],
    out: &[T],
) -> Result<(), KernelError> {
    KernelError::check_len("a", rows * cols, a.len())?;
    KernelError::check_len("x", cols, x.len())?;
    KernelError::check_len("out", rows, out.len())
}

/// Multiplies a row-major `rows x cols` matrix by a vector of length `cols`.
///
/// Each output element is the dot product of one contiguous matrix row with `x`.
/// With `cols == 0` every output element is zero.
///
/// # Arguments
///
/// * `a` - The matrix in row-major order.
/// * `rows` - Number of matrix rows.
/// * `cols` - Number of matrix columns.
/// * `x` - The vector.
/// * `out` - The destination, one element per row.
///
/// # Errors
///
/// Returns a `BufferSize` error if a buffer does not match the dimensions.
///
/// Example:
/// ```
/// use contra_kernels::ops::matvec_kernel;
///
/// let a = [1, 2, 3, 4, 5, 6];
/// let x = [1, 0, 2];
/// let mut out = [0; 2];
/// matvec_kernel(&a, 2, 3, &x, &mut out).unwrap();
/// assert_eq!(out, [7, 16]);
/// ```
pub fn matvec_kernel<T>(
    a: &[T],
    rows: usize,
    cols: usize,
    x: &[T],
    out: &mut [T],
) -> Result<(), KernelError>
where
    T: Zero + Copy + std::ops::Add<Output = T> + std::ops::Mul<Output = T>,
{
    check_matvec(a, rows, cols, x, out)?;

    out.iter_mut().enumerate().for_each(|(row, dst)| {
        *dst = dot_unchecked(&a[row * cols..(row + 1) * cols], x);
    });

    Ok(())
}

/// Parallel version of [`matvec_kernel`]; output rows are split across the rayon pool.
///
/// # Errors
///
/// Returns a `BufferSize` error if a buffer does not match the dimensions.
pub fn matvec_parallel_kernel<T>(
    a: &[T],
    rows: usize,
    cols: usize,
    x: &[T],
    out: &mut [T],
) -> Result<(), KernelError>
where
    T: Zero + Copy + Send + Sync + std::ops::Add<Output = T> + std::ops::Mul<Output = T>,
{
    check_matvec(a, rows, cols, x, out)?;

    out.par_iter_mut().enumerate().for_each(|(row, dst)| {
        *dst = dot_unchecked(&a[row * cols..(row + 1) * cols], x);
    });

    Ok(())
}

/// Evaluates `out[p, q] = sum_{r, s} i[p, q, r, s] * d[r, s]` with four nested loops.
///
/// Both inputs are addressed through their strides, so any layout is accepted.
/// `out` is written in row-major `(P, Q)` order.
///
/// # Arguments
///
/// * `i` - Storage of the rank-4 operand.
/// * `i_shape` - Shape `(P, Q, R, S)` of the rank-4 operand.
/// * `i_strides` - Strides of the rank-4 operand.
/// * `d` - Storage of the rank-2 operand, of shape `(R, S)`.
/// * `d_strides` - Strides of the rank-2 operand.
/// * `out` - The destination with `P * Q` elements.
///
/// # Errors
///
/// Returns a `BufferSize` error if `out` does not hold `P * Q` elements.
///
/// # Panics
///
/// Panics if the strides address elements outside `i` or `d`.
pub fn contract_naive_kernel<T>(
    i: &[T],
    i_shape: [usize; 4],
    i_strides: [usize; 4],
    d: &[T],
    d_strides: [usize; 2],
    out: &mut [T],
) -> Result<(), KernelError>
where
    T: Zero + Copy + std::ops::Add<Output = T> + std::ops::Mul<Output = T>,
{
    let [p_len, q_len, r_len, s_len] = i_shape;
    KernelError::check_len("out", p_len * q_len, out.len())?;

    for p in 0..p_len {
        for q in 0..q_len {
            let mut acc = T::zero();
            for r in 0..r_len {
                for s in 0..s_len {
                    let i_val = i[p * i_strides[0] + q * i_strides[1] + r * i_strides[2] + s * i_strides[3]];
                    let d_val = d[r * d_strides[0] + s * d_strides[1]];
                    acc = acc + i_val * d_val;
                }
            }
            out[p * q_len + q] = acc;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_product1_kernel_length_mismatch() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0];
        let result = dot_product1_kernel(&a, &b);
        assert!(matches!(result, Err(KernelError::LengthMismatch(3, 2))));
    }

    #[test]
    fn test_dot_product1_kernel_f64() {
        let a: [f64; 3] = [1.0, 2.0, 3.0];
        let b: [f64; 3] = [4.0, 5.0, 6.0];
        approx::assert_relative_eq!(dot_product1_kernel(&a, &b).unwrap(), 32.0);
    }

    #[test]
    fn test_dot_product1_kernel_empty() {
        let a: [i64; 0] = [];
        assert_eq!(dot_product1_kernel(&a, &a), Ok(0));
    }

    #[test]
    fn test_matvec_kernel() -> Result<(), KernelError> {
        // rows of the literal 2x2x2x2 example flattened against [1, 2, 3, 4]
        let a: Vec<i64> = (1..=16).collect();
        let x = [1, 2, 3, 4];
        let mut out = [0i64; 4];
        matvec_kernel(&a, 4, 4, &x, &mut out)?;
        assert_eq!(out, [30, 70, 110, 150]);
        Ok(())
    }

    #[test]
    fn test_matvec_kernel_zero_cols() -> Result<(), KernelError> {
        let a: [i32; 0] = [];
        let x: [i32; 0] = [];
        let mut out = [5i32; 3];
        matvec_kernel(&a, 3, 0, &x, &mut out)?;
        assert_eq!(out, [0, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_matvec_kernel_bad_sizes() {
        let a = [1, 2, 3, 4, 5, 6];
        let mut out = [0; 2];
        assert_eq!(
            matvec_kernel(&a, 2, 3, &[1, 2], &mut out),
            Err(KernelError::BufferSize {
                name: "x",
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            matvec_kernel(&a, 3, 3, &[1, 2, 3], &mut out),
            Err(KernelError::BufferSize {
                name: "a",
                expected: 9,
                actual: 6
            })
        );
        let mut out = [0; 3];
        assert!(matches!(
            matvec_kernel(&a, 2, 3, &[1, 2, 3], &mut out),
            Err(KernelError::BufferSize { name: "out", .. })
        ));
    }

    #[test]
    fn test_matvec_parallel_matches_sequential() -> Result<(), KernelError> {
        let (rows, cols) = (37, 19);
        let a: Vec<i64> = (0..rows * cols).map(|v| (v as i64 % 11) - 5).collect();
        let x: Vec<i64> = (0..cols).map(|v| v as i64 * 3 - 7).collect();
        let mut seq = vec![0i64; rows];
        let mut par = vec![0i64; rows];
        matvec_kernel(&a, rows, cols, &x, &mut seq)?;
        matvec_parallel_kernel(&a, rows, cols, &x, &mut par)?;
        assert_eq!(seq, par);
        Ok(())
    }

    #[test]
    fn test_contract_naive_kernel() -> Result<(), KernelError> {
        let i: Vec<i64> = (1..=16).collect();
        let d = [1i64, 2, 3, 4];
        let mut out = [0i64; 4];
        contract_naive_kernel(&i, [2, 2, 2, 2], [8, 4, 2, 1], &d, [2, 1], &mut out)?;
        assert_eq!(out, [30, 70, 110, 150]);
        Ok(())
    }

    #[test]
    fn test_contract_naive_kernel_transposed_d() -> Result<(), KernelError> {
        let i: Vec<i64> = (1..=16).collect();
        // column-major storage of [[1, 2], [3, 4]]
        let d = [1i64, 3, 2, 4];
        let mut out = [0i64; 4];
        contract_naive_kernel(&i, [2, 2, 2, 2], [8, 4, 2, 1], &d, [1, 2], &mut out)?;
        assert_eq!(out, [30, 70, 110, 150]);
        Ok(())
    }

    #[test]
    fn test_contract_naive_kernel_bad_out() {
        let mut out = [0i64; 3];
        assert!(contract_naive_kernel(&[], [2, 2, 0, 0], [0, 0, 0, 0], &[], [0, 0], &mut out).is_err());
    }
}
