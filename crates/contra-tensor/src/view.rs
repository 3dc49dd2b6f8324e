use crate::{
    storage::TensorStorage,
    tensor::{gather_strided, is_standard_layout},
    Tensor, TensorAllocator, TensorError,
};

/// A non-owning view into tensor data with its own shape and strides.
///
/// Views are produced by [`Tensor::reshape`], [`Tensor::permute_axes`] and
/// [`Tensor::view`] and borrow the storage of the tensor they came from.
///
/// # Example
///
/// ```rust
/// use contra_tensor::{Tensor, CpuAllocator};
///
/// let t = Tensor::<i32, 2, _>::from_shape_vec([2, 2], vec![1, 2, 3, 4], CpuAllocator).unwrap();
/// let view = t.permute_axes([1, 0]);
/// assert_eq!(*view.get_unchecked([0, 1]), 3);
/// assert_eq!(view.as_contiguous().unwrap().as_slice(), &[1, 3, 2, 4]);
/// ```
pub struct TensorView<'a, T, const N: usize, A: TensorAllocator> {
    /// Reference to the storage held by another tensor.
    pub storage: &'a TensorStorage<T, A>,

    /// The shape of the tensor view.
    pub shape: [usize; N],

    /// The strides for accessing elements in the view.
    pub strides: [usize; N],
}

impl<T, const N: usize, A: TensorAllocator> TensorView<'_, T, N, A> {
    /// Returns the whole underlying storage as a slice.
    ///
    /// The slice is in storage order, which matches the view only when
    /// [`TensorView::is_standard_layout`] holds.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.storage.as_slice()
    }

    /// Returns the number of elements addressed by the view.
    #[inline]
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Returns true if the view addresses its storage in row-major order.
    pub fn is_standard_layout(&self) -> bool {
        is_standard_layout(&self.shape, &self.strides)
    }

    /// Gets the element at the given index without checking dim sizes.
    ///
    /// # Panics
    ///
    /// Panics if the computed offset falls outside the storage.
    pub fn get_unchecked(&self, index: [usize; N]) -> &T {
        let offset = index
            .iter()
            .zip(self.strides.iter())
            .fold(0, |acc, (&i, &s)| acc + i * s);
        &self.storage.as_slice()[offset]
    }

    /// Gets the element at the given index, or `None` if the index is out of bounds.
    pub fn get(&self, index: [usize; N]) -> Option<&T> {
        if index.iter().zip(self.shape.iter()).any(|(&i, &n)| i >= n) {
            return None;
        }
        Some(self.get_unchecked(index))
    }

    /// Copies the viewed elements into a new tensor with standard layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocation fails.
    pub fn as_contiguous(&self) -> Result<Tensor<T, N, A>, TensorError>
    where
        T: Clone,
    {
        let data = gather_strided(self.storage.as_slice(), &self.shape, &self.strides);
        Tensor::from_shape_vec(self.shape, data, self.storage.alloc().clone())
    }
}
