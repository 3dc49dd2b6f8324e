use contra_kernels::KernelError;
use contra_tensor::TensorError;
use thiserror::Error;

/// An error type for tensor operations.
#[derive(Error, Debug, PartialEq)]
pub enum TensorOpsError {
    /// The contracted dimensions of the operands differ.
    #[error("Shape mismatch: {0:?} != {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// Tensor error
    #[error("Error with the tensor: {0}")]
    TensorError(#[from] TensorError),

    /// Kernel error
    #[error(transparent)]
    KernelError(#[from] KernelError),

    /// The contraction path name is not recognised.
    #[error("Unknown contraction path `{0}`, expected one of: naive, optimized, parallel")]
    UnknownPath(String),

    /// The einsum subscripts string is malformed.
    #[error("Invalid subscripts `{0}`: {1}")]
    InvalidSubscripts(String, String),

    /// The number of input terms differs from the number of operands.
    #[error("Subscripts name {0} operands, but {1} were given")]
    OperandCountMismatch(usize, usize),

    /// An input term names a different number of labels than its operand has dimensions.
    #[error("Operand {operand} has {actual} dimensions, but its subscripts name {expected}")]
    RankMismatch {
        /// Position of the operand
        operand: usize,
        /// Number of labels in the term
        expected: usize,
        /// Rank of the operand
        actual: usize,
    },

    /// The same label is bound to dimensions of different extent.
    #[error("Label `{label}` is bound to extent {expected} and to extent {actual}")]
    LabelSizeMismatch {
        /// The label
        label: char,
        /// Extent of the first binding
        expected: usize,
        /// Extent of the conflicting binding
        actual: usize,
    },

    /// An output label does not appear in any input term.
    #[error("Output label `{0}` does not appear in any input")]
    UnknownOutputLabel(char),
}
