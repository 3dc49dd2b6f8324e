//! Owned, allocator-backed element buffers.

use std::{alloc::Layout, mem::ManuallyDrop, ptr::NonNull};

use crate::allocator::{array_layout, TensorAllocator, TensorAllocatorError};

/// A contiguous buffer of `len` elements of type `T` owned by allocator `A`.
///
/// The storage owns its elements: they are dropped together with the storage
/// and the memory is returned to the allocator that produced it. Zero-sized
/// buffers (no elements, or a zero-sized `T`) never reach the allocator.
pub struct TensorStorage<T, A: TensorAllocator> {
    /// The pointer to the first element. Dangling when the layout is zero-sized.
    ptr: NonNull<T>,
    /// The number of initialized elements.
    len: usize,
    /// The layout used for the allocation.
    layout: Layout,
    /// The allocator that owns the memory.
    alloc: A,
}

impl<T, A: TensorAllocator> TensorStorage<T, A> {
    /// Creates a new storage by moving the elements of `vec` into memory obtained from `alloc`.
    ///
    /// # Arguments
    ///
    /// * `vec` - The elements to store.
    /// * `alloc` - The allocator used to allocate the storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout overflows or the allocation fails.
    pub fn from_vec(mut vec: Vec<T>, alloc: A) -> Result<Self, TensorAllocatorError> {
        let len = vec.len();
        let layout = array_layout::<T>(len)?;

        let ptr = if layout.size() == 0 {
            NonNull::dangling()
        } else {
            NonNull::new(alloc.alloc(layout)? as *mut T).ok_or(TensorAllocatorError::NullPointer)?
        };

        // SAFETY: `ptr` is valid for `len` writes and cannot overlap the vector buffer.
        // The elements are moved, so the vector must forget them before it is dropped.
        unsafe {
            std::ptr::copy_nonoverlapping(vec.as_ptr(), ptr.as_ptr(), len);
            vec.set_len(0);
        }

        Ok(Self {
            ptr,
            len,
            layout,
            alloc,
        })
    }

    /// Returns the allocator used to allocate the storage.
    #[inline]
    pub fn alloc(&self) -> &A {
        &self.alloc
    }

    /// Returns the number of elements in the storage.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether the storage holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the layout of the underlying allocation.
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Returns the data pointer.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Returns the elements as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `ptr` points to `len` initialized elements (or is dangling with len 0).
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Returns the elements as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: `&mut self` guarantees exclusive access to the elements.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Consumes the storage and moves its elements into a vector.
    pub fn into_vec(self) -> Vec<T> {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the allocator is read out exactly once.
        let alloc = unsafe { std::ptr::read(&this.alloc) };

        let mut vec = Vec::with_capacity(this.len);
        // SAFETY: the elements are moved out and the buffer is released without dropping them.
        unsafe {
            std::ptr::copy_nonoverlapping(this.ptr.as_ptr(), vec.as_mut_ptr(), this.len);
            vec.set_len(this.len);
        }

        if this.layout.size() != 0 {
            alloc.dealloc(this.ptr.as_ptr() as *mut u8, this.layout);
        }

        vec
    }
}

// SAFETY: the storage uniquely owns its elements, like `Vec<T>`.
unsafe impl<T: Send, A: TensorAllocator + Send> Send for TensorStorage<T, A> {}

// SAFETY: shared access only hands out `&[T]`.
unsafe impl<T: Sync, A: TensorAllocator + Sync> Sync for TensorStorage<T, A> {}

impl<T, A: TensorAllocator> Drop for TensorStorage<T, A> {
    fn drop(&mut self) {
        // SAFETY: the elements are initialized and owned by this storage.
        unsafe {
            std::ptr::drop_in_place(std::ptr::slice_from_raw_parts_mut(
                self.ptr.as_ptr(),
                self.len,
            ));
        }
        if self.layout.size() != 0 {
            self.alloc.dealloc(self.ptr.as_ptr() as *mut u8, self.layout);
        }
    }
}

impl<T: Clone, A: TensorAllocator> Clone for TensorStorage<T, A> {
    /// Deep-copies the elements into a new allocation from the same allocator.
    fn clone(&self) -> Self {
        match Self::from_vec(self.as_slice().to_vec(), self.alloc.clone()) {
            Ok(storage) => storage,
            Err(_) => std::alloc::handle_alloc_error(self.layout),
        }
    }
}

impl<T, A: TensorAllocator> std::fmt::Debug for TensorStorage<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TensorStorage")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("layout", &self.layout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::allocator::CpuAllocator;

    type CpuStorage<T> = TensorStorage<T, CpuAllocator>;

    #[test]
    fn test_storage_from_vec() -> Result<(), TensorAllocatorError> {
        let storage = CpuStorage::from_vec(vec![1i32, 2, 3, 4, 5], CpuAllocator)?;
        assert_eq!(storage.len(), 5);
        assert!(!storage.is_empty());
        assert_eq!(storage.as_slice(), &[1, 2, 3, 4, 5]);
        assert!(!storage.as_ptr().is_null());
        Ok(())
    }

    #[test]
    fn test_storage_empty() -> Result<(), TensorAllocatorError> {
        let storage = CpuStorage::<i64>::from_vec(Vec::new(), CpuAllocator)?;
        assert!(storage.is_empty());
        assert_eq!(storage.layout().size(), 0);
        assert!(storage.as_slice().is_empty());
        assert!(storage.into_vec().is_empty());
        Ok(())
    }

    #[test]
    fn test_storage_mutability() -> Result<(), TensorAllocatorError> {
        let mut storage = CpuStorage::from_vec(vec![1u8, 2, 3, 4], CpuAllocator)?;
        storage.as_mut_slice()[0] = 10;
        assert_eq!(storage.as_slice(), &[10, 2, 3, 4]);
        Ok(())
    }

    #[test]
    fn test_storage_into_vec() -> Result<(), TensorAllocatorError> {
        let storage = CpuStorage::from_vec(vec![1.0f64, 2.0, 3.0], CpuAllocator)?;
        assert_eq!(storage.into_vec(), vec![1.0, 2.0, 3.0]);
        Ok(())
    }

    #[test]
    fn test_storage_clone_is_deep() -> Result<(), TensorAllocatorError> {
        let mut storage = CpuStorage::from_vec(vec![1i32, 2, 3], CpuAllocator)?;
        let copy = storage.clone();
        storage.as_mut_slice()[0] = 7;
        assert_eq!(copy.as_slice(), &[1, 2, 3]);
        assert_ne!(copy.as_ptr(), storage.as_ptr());
        Ok(())
    }

    #[test]
    fn test_storage_drops_elements() -> Result<(), TensorAllocatorError> {
        let shared = Rc::new(0);
        let storage = CpuStorage::from_vec(vec![shared.clone(), shared.clone()], CpuAllocator)?;
        assert_eq!(Rc::strong_count(&shared), 3);
        drop(storage);
        assert_eq!(Rc::strong_count(&shared), 1);
        Ok(())
    }

    #[test]
    fn test_storage_into_vec_keeps_elements() -> Result<(), TensorAllocatorError> {
        let shared = Rc::new(0);
        let storage = CpuStorage::from_vec(vec![shared.clone()], CpuAllocator)?;
        let vec = storage.into_vec();
        assert_eq!(Rc::strong_count(&shared), 2);
        drop(vec);
        assert_eq!(Rc::strong_count(&shared), 1);
        Ok(())
    }
}
