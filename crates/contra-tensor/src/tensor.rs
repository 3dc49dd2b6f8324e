use std::borrow::Cow;

use thiserror::Error;

use super::{
    allocator::{CpuAllocator, TensorAllocator, TensorAllocatorError},
    storage::TensorStorage,
    view::TensorView,
};

/// An error type for tensor operations.
#[derive(Error, Debug, PartialEq)]
pub enum TensorError {
    /// The number of elements in the data does not match the requested shape.
    #[error("Shape mismatch: expected {expected} elements for shape, but got {actual} elements in data")]
    InvalidShape {
        /// Expected number of elements based on shape
        expected: usize,
        /// Actual number of elements in the data
        actual: usize,
    },

    /// Index exceeds tensor bounds.
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index that was attempted
        index: usize,
        /// The size of the dimension being indexed
        size: usize,
    },

    /// Tensor dimensions are incompatible for the requested operation.
    #[error("Dimension mismatch: {message}. Expected shape: {expected}, got: {actual}")]
    DimensionMismatch {
        /// Human-readable description of the mismatch
        message: String,
        /// Expected shape description
        expected: String,
        /// Actual shape description
        actual: String,
    },

    /// The operation requires a standard (row-major contiguous) layout.
    #[error("Operation requires a contiguous tensor, got strides {0:?} for shape {1:?}")]
    NotContiguous(Vec<usize>, Vec<usize>),

    /// Underlying storage operation failed.
    #[error("Storage error: {0}")]
    StorageError(#[from] TensorAllocatorError),
}

impl TensorError {
    /// Creates an InvalidShape error.
    pub fn invalid_shape(expected: usize, actual: usize) -> Self {
        Self::InvalidShape { expected, actual }
    }

    /// Creates a DimensionMismatch error with formatted shapes.
    pub fn dimension_mismatch(
        message: impl Into<String>,
        expected: &[usize],
        actual: &[usize],
    ) -> Self {
        Self::DimensionMismatch {
            message: message.into(),
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }
}

/// Computes the strides for a row-major (C-contiguous) tensor layout.
///
/// The rightmost dimension has stride 1, and each dimension's stride is the
/// product of all dimensions to its right.
///
/// # Examples
///
/// ```rust
/// use contra_tensor::tensor::get_strides_from_shape;
///
/// let strides = get_strides_from_shape([2, 3, 4]);
/// assert_eq!(strides, [12, 4, 1]);
/// ```
pub fn get_strides_from_shape<const N: usize>(shape: [usize; N]) -> [usize; N] {
    let mut strides: [usize; N] = [0; N];
    let mut stride = 1;
    for i in (0..shape.len()).rev() {
        strides[i] = stride;
        stride *= shape[i];
    }
    strides
}

/// A dense multi-dimensional array with owned data.
///
/// The tensor combines an allocator-backed [`TensorStorage`] holding the elements
/// in a single flat buffer with a shape and per-dimension strides. Tensors built by
/// the constructors use the row-major layout; `strides` is public so callers can
/// describe permuted layouts over the same buffer.
///
/// # Type Parameters
///
/// * `T` - The element type.
/// * `N` - The number of dimensions.
/// * `A` - The allocator owning the storage.
///
/// # Example
///
/// ```rust
/// use contra_tensor::{Tensor, CpuAllocator};
///
/// let t = Tensor::<i64, 4, _>::from_shape_fn([2, 2, 2, 2], CpuAllocator, |[p, q, r, s]| {
///     (p + q + r + s) as i64
/// })
/// .unwrap();
/// assert_eq!(t.get([1, 1, 1, 0]), Some(&3));
/// ```
pub struct Tensor<T, const N: usize, A: TensorAllocator = CpuAllocator> {
    /// The storage of the tensor.
    pub storage: TensorStorage<T, A>,
    /// The shape of the tensor.
    pub shape: [usize; N],
    /// The strides of the tensor data in memory.
    pub strides: [usize; N],
}

impl<T, const N: usize, A: TensorAllocator> Tensor<T, N, A> {
    /// Get the data of the tensor as a slice, in storage order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.storage.as_slice()
    }

    /// Get the data of the tensor as a mutable slice, in storage order.
    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        self.storage.as_mut_slice()
    }

    /// Get the data of the tensor as a pointer.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.storage.as_ptr()
    }

    /// Consumes the tensor and returns the underlying vector in storage order.
    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.storage.into_vec()
    }

    /// Creates a new `Tensor` with the given shape and data.
    ///
    /// # Arguments
    ///
    /// * `shape` - An array containing the shape of the tensor.
    /// * `data` - A vector containing the data of the tensor in row-major order.
    /// * `alloc` - The allocator used to allocate the tensor storage.
    ///
    /// # Errors
    ///
    /// If the number of elements in the data does not match the shape of the tensor, an error is returned.
    ///
    /// # Example
    ///
    /// ```
    /// use contra_tensor::{Tensor, CpuAllocator};
    ///
    /// let t = Tensor::<u8, 2, _>::from_shape_vec([2, 2], vec![1, 2, 3, 4], CpuAllocator).unwrap();
    /// assert_eq!(t.shape, [2, 2]);
    /// assert_eq!(t.strides, [2, 1]);
    /// ```
    pub fn from_shape_vec(shape: [usize; N], data: Vec<T>, alloc: A) -> Result<Self, TensorError> {
        let numel = shape.iter().product::<usize>();
        if numel != data.len() {
            return Err(TensorError::invalid_shape(numel, data.len()));
        }
        let storage = TensorStorage::from_vec(data, alloc)?;
        let strides = get_strides_from_shape(shape);
        Ok(Self {
            storage,
            shape,
            strides,
        })
    }

    /// Creates a new `Tensor` with the given shape and slice of data.
    ///
    /// # Errors
    ///
    /// If the number of elements in the data does not match the shape of the tensor, an error is returned.
    pub fn from_shape_slice(shape: [usize; N], data: &[T], alloc: A) -> Result<Self, TensorError>
    where
        T: Clone,
    {
        Self::from_shape_vec(shape, data.to_vec(), alloc)
    }

    /// Creates a new `Tensor` with every element set to `value`.
    ///
    /// # Example
    ///
    /// ```
    /// use contra_tensor::{Tensor, CpuAllocator};
    ///
    /// let t = Tensor::<u8, 3, _>::from_shape_val([2, 1, 3], 2, CpuAllocator).unwrap();
    /// assert_eq!(t.as_slice(), &[2, 2, 2, 2, 2, 2]);
    /// ```
    pub fn from_shape_val(shape: [usize; N], value: T, alloc: A) -> Result<Self, TensorError>
    where
        T: Clone,
    {
        let numel = shape.iter().product::<usize>();
        Self::from_shape_vec(shape, vec![value; numel], alloc)
    }

    /// Creates a new `Tensor` whose elements are generated from their index.
    ///
    /// The function `f` is called once per element, in row-major order.
    ///
    /// # Example
    ///
    /// ```
    /// use contra_tensor::{Tensor, CpuAllocator};
    ///
    /// let t = Tensor::<usize, 2, _>::from_shape_fn([2, 3], CpuAllocator, |[r, s]| r + s).unwrap();
    /// assert_eq!(t.as_slice(), &[0, 1, 2, 1, 2, 3]);
    /// ```
    pub fn from_shape_fn<F>(shape: [usize; N], alloc: A, f: F) -> Result<Self, TensorError>
    where
        F: Fn([usize; N]) -> T,
    {
        let numel = shape.iter().product::<usize>();
        let data: Vec<T> = (0..numel)
            .map(|i| {
                let mut index = [0; N];
                let mut j = i;
                for k in (0..N).rev() {
                    index[k] = j % shape[k];
                    j /= shape[k];
                }
                f(index)
            })
            .collect();
        Self::from_shape_vec(shape, data, alloc)
    }

    /// Creates a new `Tensor` filled with zeros.
    pub fn zeros(shape: [usize; N], alloc: A) -> Result<Self, TensorError>
    where
        T: Clone + num_traits::Zero,
    {
        Self::from_shape_val(shape, T::zero(), alloc)
    }

    /// Returns the number of elements in the tensor.
    #[inline]
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Get the storage offset of the element at the given index, or `None` if out of bounds.
    pub fn get_iter_offset(&self, index: [usize; N]) -> Option<usize> {
        let mut offset = 0;
        for ((&idx, dim_size), stride) in index.iter().zip(self.shape).zip(self.strides) {
            if idx >= dim_size {
                return None;
            }
            offset += idx * stride;
        }
        Some(offset)
    }

    /// Get the storage offset of the element at the given index without checking dim sizes.
    #[inline]
    pub fn get_iter_offset_unchecked(&self, index: [usize; N]) -> usize {
        index
            .iter()
            .zip(self.strides)
            .fold(0, |acc, (&idx, stride)| acc + idx * stride)
    }

    /// Get the element at the given index without checking dim sizes.
    ///
    /// # Panics
    ///
    /// Panics if the computed offset falls outside the storage.
    #[inline]
    pub fn get_unchecked(&self, index: [usize; N]) -> &T {
        &self.storage.as_slice()[self.get_iter_offset_unchecked(index)]
    }

    /// Get the element at the given index, or `None` if the index is out of bounds.
    ///
    /// # Example
    ///
    /// ```
    /// use contra_tensor::{Tensor, CpuAllocator};
    ///
    /// let t = Tensor::<u8, 2, _>::from_shape_vec([2, 2], vec![1, 2, 3, 4], CpuAllocator).unwrap();
    /// assert_eq!(t.get([1, 0]), Some(&3));
    /// assert!(t.get([2, 0]).is_none());
    /// ```
    pub fn get(&self, index: [usize; N]) -> Option<&T> {
        self.get_iter_offset(index)
            .and_then(|i| self.storage.as_slice().get(i))
    }

    /// Get the element at the given index, reporting the first axis that is out of range.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] with the offending index and the
    /// extent of its dimension.
    ///
    /// # Example
    ///
    /// ```
    /// use contra_tensor::{Tensor, TensorError, CpuAllocator};
    ///
    /// let t = Tensor::<u8, 2, _>::from_shape_vec([2, 3], vec![1, 2, 3, 4, 5, 6], CpuAllocator).unwrap();
    /// assert_eq!(t.try_get([1, 2]), Ok(&6));
    /// assert_eq!(t.try_get([1, 3]), Err(TensorError::IndexOutOfBounds { index: 3, size: 3 }));
    /// ```
    pub fn try_get(&self, index: [usize; N]) -> Result<&T, TensorError> {
        if let Some((&index, &size)) = index.iter().zip(&self.shape).find(|(i, n)| i >= n) {
            return Err(TensorError::IndexOutOfBounds { index, size });
        }
        Ok(self.get_unchecked(index))
    }

    /// Reshape the tensor into a zero-copy view with a new shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the element counts differ or the tensor is not in standard layout.
    ///
    /// # Example
    ///
    /// ```
    /// use contra_tensor::{Tensor, CpuAllocator};
    ///
    /// let t = Tensor::<u8, 4, _>::from_shape_vec([1, 2, 2, 1], vec![1, 2, 3, 4], CpuAllocator).unwrap();
    /// let m = t.reshape([2, 2]).unwrap();
    /// assert_eq!(m.strides, [2, 1]);
    /// assert_eq!(*m.get_unchecked([1, 0]), 3);
    /// ```
    pub fn reshape<const M: usize>(
        &self,
        shape: [usize; M],
    ) -> Result<TensorView<'_, T, M, A>, TensorError> {
        let numel = shape.iter().product::<usize>();
        if numel != self.numel() {
            return Err(TensorError::dimension_mismatch(
                "Reshape operation requires same number of elements",
                &shape,
                &self.shape,
            ));
        }
        if !self.is_standard_layout() {
            return Err(TensorError::NotContiguous(
                self.strides.to_vec(),
                self.shape.to_vec(),
            ));
        }

        Ok(TensorView {
            storage: &self.storage,
            shape,
            strides: get_strides_from_shape(shape),
        })
    }

    /// Permutes the dimensions of the tensor without moving data.
    ///
    /// `axes[i]` names the source dimension that becomes dimension `i` of the view.
    pub fn permute_axes(&self, axes: [usize; N]) -> TensorView<'_, T, N, A> {
        let mut shape = [0; N];
        let mut strides = [0; N];
        for (i, &axis) in axes.iter().enumerate() {
            shape[i] = self.shape[axis];
            strides[i] = self.strides[axis];
        }

        TensorView {
            storage: &self.storage,
            shape,
            strides,
        }
    }

    /// Return a view over the whole tensor.
    pub fn view(&self) -> TensorView<'_, T, N, A> {
        TensorView {
            storage: &self.storage,
            shape: self.shape,
            strides: self.strides,
        }
    }

    /// Checks if the tensor has a standard contiguous (row-major) memory layout.
    ///
    /// # Examples
    ///
    /// ```
    /// use contra_tensor::{Tensor, CpuAllocator};
    ///
    /// let mut t = Tensor::<u8, 2, _>::from_shape_val([2, 3], 0, CpuAllocator).unwrap();
    /// assert!(t.is_standard_layout());
    /// t.strides = [1, 2];
    /// assert!(!t.is_standard_layout());
    /// ```
    pub fn is_standard_layout(&self) -> bool {
        is_standard_layout(&self.shape, &self.strides)
    }

    /// Returns the elements in row-major logical order.
    ///
    /// Borrows the storage when the tensor is already in standard layout and gathers a
    /// copy otherwise.
    pub fn to_contiguous_data(&self) -> Cow<'_, [T]>
    where
        T: Clone,
    {
        if self.is_standard_layout() {
            Cow::Borrowed(self.as_slice())
        } else {
            Cow::Owned(gather_strided(
                self.storage.as_slice(),
                &self.shape,
                &self.strides,
            ))
        }
    }

    /// Converts the tensor to the standard contiguous (row-major) layout.
    ///
    /// # Example
    ///
    /// ```
    /// use contra_tensor::{Tensor, CpuAllocator};
    ///
    /// let mut t = Tensor::<u8, 2, _>::from_shape_vec([2, 2], vec![1, 2, 3, 4], CpuAllocator).unwrap();
    /// t.strides = [1, 2];
    /// let t2 = t.to_standard_layout().unwrap();
    /// assert!(t2.is_standard_layout());
    /// assert_eq!(t2.as_slice(), &[1, 3, 2, 4]);
    /// ```
    pub fn to_standard_layout(&self) -> Result<Self, TensorError>
    where
        T: Clone,
    {
        let data = self.to_contiguous_data().into_owned();
        Self::from_shape_vec(self.shape, data, self.storage.alloc().clone())
    }

    /// Apply a function to each element of the tensor.
    ///
    /// # Example
    ///
    /// ```
    /// use contra_tensor::{Tensor, CpuAllocator};
    ///
    /// let t = Tensor::<u8, 1, _>::from_shape_vec([4], vec![1, 2, 3, 4], CpuAllocator).unwrap();
    /// let t2 = t.map(|x| *x + 1).unwrap();
    /// assert_eq!(t2.as_slice(), &[2, 3, 4, 5]);
    /// ```
    pub fn map<U, F>(&self, f: F) -> Result<Tensor<U, N, A>, TensorError>
    where
        F: Fn(&T) -> U,
    {
        let data: Vec<U> = self.as_slice().iter().map(f).collect();
        let storage = TensorStorage::from_vec(data, self.storage.alloc().clone())?;

        Ok(Tensor {
            storage,
            shape: self.shape,
            strides: self.strides,
        })
    }

    /// Cast the tensor to a new element type with a lossless conversion.
    ///
    /// # Example
    ///
    /// ```
    /// use contra_tensor::{Tensor, CpuAllocator};
    ///
    /// let t = Tensor::<i32, 1, _>::from_shape_vec([3], vec![1, 2, 3], CpuAllocator).unwrap();
    /// let t2 = t.cast::<i64>().unwrap();
    /// assert_eq!(t2.as_slice(), &[1i64, 2, 3]);
    /// ```
    pub fn cast<U>(&self) -> Result<Tensor<U, N, A>, TensorError>
    where
        U: From<T>,
        T: Clone,
    {
        self.map(|x| U::from(x.clone()))
    }

    /// Perform an element-wise operation on two tensors of identical shape.
    ///
    /// The result is in standard layout regardless of the input layouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the shapes differ.
    ///
    /// # Example
    ///
    /// ```
    /// use contra_tensor::{Tensor, CpuAllocator};
    ///
    /// let a = Tensor::<i32, 1, _>::from_shape_vec([3], vec![1, 2, 3], CpuAllocator).unwrap();
    /// let b = Tensor::<i32, 1, _>::from_shape_vec([3], vec![4, 5, 6], CpuAllocator).unwrap();
    /// let c = a.element_wise_op(&b, |x, y| *x + *y).unwrap();
    /// assert_eq!(c.as_slice(), &[5, 7, 9]);
    /// ```
    pub fn element_wise_op<F>(&self, other: &Tensor<T, N, A>, op: F) -> Result<Self, TensorError>
    where
        T: Clone,
        F: Fn(&T, &T) -> T,
    {
        if self.shape != other.shape {
            return Err(TensorError::dimension_mismatch(
                "Element-wise operations require identical shapes",
                &self.shape,
                &other.shape,
            ));
        }

        let lhs = self.to_contiguous_data();
        let rhs = other.to_contiguous_data();
        let data = lhs.iter().zip(rhs.iter()).map(|(a, b)| op(a, b)).collect();

        Self::from_shape_vec(self.shape, data, self.storage.alloc().clone())
    }
}

/// Returns true if `strides` describe the row-major layout of `shape`.
pub(crate) fn is_standard_layout(shape: &[usize], strides: &[usize]) -> bool {
    let mut expected_stride: usize = 1;
    for (&dim, &stride) in shape.iter().rev().zip(strides.iter().rev()) {
        // strides of unit or empty dimensions never affect addressing
        if dim > 1 && stride != expected_stride {
            return false;
        }
        expected_stride = expected_stride.saturating_mul(dim);
    }
    true
}

/// Copies the elements addressed by `shape`/`strides` out of `data` in row-major order.
pub(crate) fn gather_strided<T: Clone>(data: &[T], shape: &[usize], strides: &[usize]) -> Vec<T> {
    let numel: usize = shape.iter().product();
    let mut out = Vec::with_capacity(numel);
    if numel == 0 {
        return out;
    }

    let mut idx = vec![0usize; shape.len()];
    for _ in 0..numel {
        let offset = idx
            .iter()
            .zip(strides.iter())
            .map(|(&i, &s)| i * s)
            .sum::<usize>();
        out.push(data[offset].clone());

        for dim in (0..shape.len()).rev() {
            idx[dim] += 1;
            if idx[dim] < shape[dim] {
                break;
            }
            idx[dim] = 0;
        }
    }
    out
}

impl<T, const N: usize, A> Clone for Tensor<T, N, A>
where
    T: Clone,
    A: TensorAllocator,
{
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            shape: self.shape,
            strides: self.strides,
        }
    }
}

impl<T, const N: usize, A> std::fmt::Debug for Tensor<T, N, A>
where
    T: std::fmt::Debug,
    A: TensorAllocator,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("data", &self.as_slice())
            .finish()
    }
}

impl<T, const N: usize, A> std::fmt::Display for Tensor<T, N, A>
where
    T: std::fmt::Display,
    A: TensorAllocator,
{
    /// Formats the tensor as nested brackets, one innermost row per line.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self
            .as_slice()
            .iter()
            .map(|v| v.to_string().len())
            .max()
            .unwrap_or(0);
        self.fmt_axis(f, 0, 0, width)
    }
}

impl<T, const N: usize, A> Tensor<T, N, A>
where
    T: std::fmt::Display,
    A: TensorAllocator,
{
    fn fmt_axis(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        axis: usize,
        offset: usize,
        width: usize,
    ) -> std::fmt::Result {
        if axis == N {
            return write!(f, "{:>1$}", self.as_slice()[offset], width);
        }

        write!(f, "[")?;
        for i in 0..self.shape[axis] {
            if i > 0 {
                if axis + 1 == N {
                    write!(f, ", ")?;
                } else {
                    write!(f, ",")?;
                    for _ in 0..(N - axis - 1) {
                        writeln!(f)?;
                    }
                    write!(f, "{}", " ".repeat(axis + 1))?;
                }
            }
            self.fmt_axis(f, axis + 1, offset + i * self.strides[axis], width)?;
        }
        write!(f, "]")
    }
}
