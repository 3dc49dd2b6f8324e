use std::alloc::{self, Layout};

use thiserror::Error;

/// An error raised while reserving the buffer of a tensor.
#[derive(Debug, Error, PartialEq)]
pub enum TensorAllocatorError {
    /// The element count does not fit in a valid memory layout.
    #[error("Invalid tensor layout {0}")]
    LayoutError(core::alloc::LayoutError),

    /// The allocator could not provide the memory.
    #[error("Null pointer")]
    NullPointer,
}

/// The layout of a buffer holding `len` values of type `T`.
///
/// # Errors
///
/// Returns [`TensorAllocatorError::LayoutError`] if the byte size overflows `isize`.
pub fn array_layout<T>(len: usize) -> Result<Layout, TensorAllocatorError> {
    Layout::array::<T>(len).map_err(TensorAllocatorError::LayoutError)
}

/// Source of the memory behind tensor storage.
///
/// Implementors only ever see layouts of non-zero size. Empty buffers never
/// reach the allocator.
///
/// # Safety
///
/// The tensor allocator must be thread-safe.
pub trait TensorAllocator: Clone {
    /// Reserve a block of memory matching `layout`.
    fn alloc(&self, layout: Layout) -> Result<*mut u8, TensorAllocatorError>;

    /// Release a block returned by [`TensorAllocator::alloc`] for the same layout.
    fn dealloc(&self, ptr: *mut u8, layout: Layout);
}

/// The global system allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuAllocator;

impl TensorAllocator for CpuAllocator {
    fn alloc(&self, layout: Layout) -> Result<*mut u8, TensorAllocatorError> {
        debug_assert!(layout.size() > 0);
        let ptr = unsafe { alloc::alloc(layout) };
        if ptr.is_null() {
            return Err(TensorAllocatorError::NullPointer);
        }
        Ok(ptr)
    }

    #[allow(clippy::not_unsafe_ptr_arg_deref)]
    fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if !ptr.is_null() {
            unsafe { alloc::dealloc(ptr, layout) }
        }
    }
}
