use thiserror::Error;

/// An error type for kernel operations.
#[derive(Error, Debug, PartialEq)]
pub enum KernelError {
    /// Length mismatch for vector operations
    #[error("Length mismatch: expected equal length vectors, got {0} and {1}")]
    LengthMismatch(usize, usize),

    /// A buffer does not hold the number of elements implied by the dimensions.
    #[error("Buffer `{name}` has {actual} elements, expected {expected}")]
    BufferSize {
        /// Name of the offending argument
        name: &'static str,
        /// Number of elements implied by the dimensions
        expected: usize,
        /// Number of elements in the buffer
        actual: usize,
    },
}

impl KernelError {
    pub(crate) fn check_len(
        name: &'static str,
        expected: usize,
        actual: usize,
    ) -> Result<(), KernelError> {
        if expected != actual {
            return Err(KernelError::BufferSize {
                name,
                expected,
                actual,
            });
        }
        Ok(())
    }
}
