use contra_kernels::ops::{matvec_kernel, matvec_parallel_kernel};
use contra_tensor::{Tensor, TensorAllocator};
use num_traits::{One, Zero};

use crate::contraction::ContractionPath;
use crate::error::TensorOpsError;

/// A dense strided operand that can take part in an einsum expression.
///
/// Implemented for every [`Tensor`] so that operands of different ranks can be
/// passed together as `&[&dyn EinsumOperand<T>]`.
pub trait EinsumOperand<T> {
    /// The extent of each dimension.
    fn shape(&self) -> &[usize];

    /// The distance in elements between neighbours along each dimension.
    fn strides(&self) -> &[usize];

    /// The underlying storage, in storage order.
    fn data(&self) -> &[T];

    /// Whether the data is laid out row-major without gaps.
    fn is_contiguous(&self) -> bool;
}

impl<T, const N: usize, A: TensorAllocator> EinsumOperand<T> for Tensor<T, N, A> {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn strides(&self) -> &[usize] {
        &self.strides
    }

    fn data(&self) -> &[T] {
        self.as_slice()
    }

    fn is_contiguous(&self) -> bool {
        self.is_standard_layout()
    }
}

/// The labels of each input term and of the output term.
#[derive(Debug, PartialEq)]
struct Subscripts {
    inputs: Vec<Vec<char>>,
    output: Vec<char>,
}

fn parse_subscripts(subscripts: &str) -> Result<Subscripts, TensorOpsError> {
    let invalid = |reason: String| TensorOpsError::InvalidSubscripts(subscripts.to_string(), reason);

    let compact: String = subscripts.chars().filter(|c| !c.is_whitespace()).collect();
    let Some((lhs, rhs)) = compact.split_once("->") else {
        return Err(invalid("missing `->`".to_string()));
    };
    if rhs.contains("->") {
        return Err(invalid("more than one `->`".to_string()));
    }

    let parse_term = |term: &str| -> Result<Vec<char>, TensorOpsError> {
        term.chars()
            .map(|c| {
                if c.is_ascii_alphabetic() {
                    Ok(c)
                } else {
                    Err(invalid(format!("`{c}` is not a label")))
                }
            })
            .collect()
    };

    let inputs = lhs.split(',').map(parse_term).collect::<Result<Vec<_>, _>>()?;
    let output = parse_term(rhs)?;

    for (k, label) in output.iter().enumerate() {
        if output[..k].contains(label) {
            return Err(invalid(format!("output label `{label}` is repeated")));
        }
    }

    Ok(Subscripts { inputs, output })
}

/// A validated expression. Labels are numbered with the output labels first,
/// in output order, followed by the summed labels in order of appearance.
#[derive(Debug)]
struct Plan {
    extents: Vec<usize>,
    num_output: usize,
    /// For each operand, the label index of each of its axes.
    operand_labels: Vec<Vec<usize>>,
}

impl Plan {
    fn new<T>(
        subscripts: &Subscripts,
        operands: &[&dyn EinsumOperand<T>],
    ) -> Result<Self, TensorOpsError> {
        if subscripts.inputs.len() != operands.len() {
            return Err(TensorOpsError::OperandCountMismatch(
                subscripts.inputs.len(),
                operands.len(),
            ));
        }

        // labels in order of first appearance, and each axis as an index into them
        let mut seen: Vec<(char, usize)> = Vec::new();
        let mut operand_labels: Vec<Vec<usize>> = Vec::with_capacity(operands.len());
        for (operand, (term, tensor)) in subscripts.inputs.iter().zip(operands).enumerate() {
            let shape = tensor.shape();
            if term.len() != shape.len() {
                return Err(TensorOpsError::RankMismatch {
                    operand,
                    expected: term.len(),
                    actual: shape.len(),
                });
            }
            let mut axes = Vec::with_capacity(term.len());
            for (&label, &extent) in term.iter().zip(shape) {
                match seen.iter().position(|&(l, _)| l == label) {
                    Some(k) if seen[k].1 != extent => {
                        return Err(TensorOpsError::LabelSizeMismatch {
                            label,
                            expected: seen[k].1,
                            actual: extent,
                        });
                    }
                    Some(k) => axes.push(k),
                    None => {
                        axes.push(seen.len());
                        seen.push((label, extent));
                    }
                }
            }
            operand_labels.push(axes);
        }

        // output labels first, then the summed ones
        let mut order: Vec<usize> = Vec::with_capacity(seen.len());
        for &label in &subscripts.output {
            match seen.iter().position(|&(l, _)| l == label) {
                Some(k) => order.push(k),
                None => return Err(TensorOpsError::UnknownOutputLabel(label)),
            }
        }
        order.extend((0..seen.len()).filter(|&k| !subscripts.output.contains(&seen[k].0)));

        let mut rank = vec![0; seen.len()];
        for (new, &old) in order.iter().enumerate() {
            rank[old] = new;
        }
        for axes in &mut operand_labels {
            for label in axes.iter_mut() {
                *label = rank[*label];
            }
        }

        Ok(Self {
            extents: order.iter().map(|&k| seen[k].1).collect(),
            num_output: subscripts.output.len(),
            operand_labels,
        })
    }

    fn output_extents(&self) -> &[usize] {
        &self.extents[..self.num_output]
    }

    fn summed_extents(&self) -> &[usize] {
        &self.extents[self.num_output..]
    }

    /// Whether the expression reads `<free><summed>,<summed>-><free>`, i.e. a
    /// matrix-vector product over flattened operands.
    fn is_trailing_contraction(&self) -> bool {
        let [lhs, rhs] = self.operand_labels.as_slice() else {
            return false;
        };
        let free = self.num_output;
        let summed = self.extents.len() - free;
        lhs.len() == free + summed
            && rhs.len() == summed
            && lhs.iter().copied().eq(0..free + summed)
            && rhs.iter().copied().eq(free..free + summed)
    }

    /// The element stride of each label in the given operand. Repeated labels
    /// add up their strides, which walks the diagonal.
    fn label_strides(&self, operand: usize, strides: &[usize]) -> Vec<usize> {
        let mut out = vec![0; self.extents.len()];
        for (&label, &stride) in self.operand_labels[operand].iter().zip(strides) {
            out[label] += stride;
        }
        out
    }
}

/// Step a row-major multi-index forward, returning `false` once it wraps around.
fn advance(index: &mut [usize], extents: &[usize]) -> bool {
    for (i, &extent) in index.iter_mut().zip(extents).rev() {
        *i += 1;
        if *i < extent {
            return true;
        }
        *i = 0;
    }
    false
}

fn evaluate_generic<T>(plan: &Plan, operands: &[&dyn EinsumOperand<T>], out: &mut [T])
where
    T: Zero + One + Copy + std::ops::Add<Output = T> + std::ops::Mul<Output = T>,
{
    let strides: Vec<Vec<usize>> = operands
        .iter()
        .enumerate()
        .map(|(k, op)| plan.label_strides(k, op.strides()))
        .collect();

    let num_output = plan.num_output;
    let summed_empty = plan.summed_extents().contains(&0);
    let mut index = vec![0usize; plan.extents.len()];

    for cell in out.iter_mut() {
        let mut acc = T::zero();
        if !summed_empty {
            loop {
                let mut term = T::one();
                for (op, op_strides) in operands.iter().zip(&strides) {
                    let offset: usize = index.iter().zip(op_strides).map(|(i, s)| i * s).sum();
                    term = term * op.data()[offset];
                }
                acc = acc + term;
                if !advance(&mut index[num_output..], plan.summed_extents()) {
                    break;
                }
            }
        }
        *cell = acc;
        advance(&mut index[..num_output], plan.output_extents());
    }
}

/// Evaluate an Einstein summation expression over dense operands.
///
/// Uses the [`ContractionPath::Optimized`] path. See [`einsum_with_path`].
///
/// # Example
///
/// ```
/// use contra_tensor::{Tensor, CpuAllocator};
/// use contra_ops::einsum::einsum;
///
/// let a = Tensor::<i64, 2, _>::from_shape_vec([2, 2], vec![1, 2, 3, 4], CpuAllocator).unwrap();
/// let b = Tensor::<i64, 2, _>::from_shape_vec([2, 2], vec![5, 6, 7, 8], CpuAllocator).unwrap();
/// let c = einsum::<i64, 2, _>("ij,jk->ik", &[&a, &b], CpuAllocator).unwrap();
/// assert_eq!(c.as_slice(), &[19, 22, 43, 50]);
/// ```
pub fn einsum<T, const M: usize, A>(
    subscripts: &str,
    operands: &[&dyn EinsumOperand<T>],
    alloc: A,
) -> Result<Tensor<T, M, A>, TensorOpsError>
where
    T: Zero + One + Copy + Send + Sync + std::ops::Add<Output = T> + std::ops::Mul<Output = T>,
    A: TensorAllocator,
{
    einsum_with_path(subscripts, operands, alloc, ContractionPath::default())
}

/// Evaluate an Einstein summation expression with an explicit evaluation path.
///
/// The subscripts take the form `"ab,bc->ac"`: one comma-separated term of ASCII
/// letters per operand, then `->` and the output term. Whitespace is ignored.
/// Every label missing from the output is summed over, and a label repeated
/// inside one term selects the diagonal of that operand.
///
/// Expressions of the form `<free><summed>,<summed>-><free>` over row-major
/// operands are evaluated as a matrix-vector product, in parallel for
/// [`ContractionPath::Parallel`]. Everything else, and every expression on the
/// [`ContractionPath::Naive`] path, goes through a strided loop over all labels.
///
/// # Arguments
///
/// * `subscripts` - The expression.
/// * `operands` - One operand per input term.
/// * `alloc` - The allocator of the result.
/// * `path` - The evaluation strategy.
///
/// # Returns
///
/// A tensor with one dimension per output label.
///
/// # Errors
///
/// * [`TensorOpsError::InvalidSubscripts`] if the expression is malformed or names
///   a number of output labels other than `M`.
/// * [`TensorOpsError::OperandCountMismatch`] if the number of terms and operands differ.
/// * [`TensorOpsError::RankMismatch`] if a term and its operand disagree on rank.
/// * [`TensorOpsError::LabelSizeMismatch`] if a label is bound to different extents.
/// * [`TensorOpsError::UnknownOutputLabel`] if an output label appears in no input.
///
/// # Example
///
/// ```
/// use contra_tensor::{Tensor, CpuAllocator};
/// use contra_ops::contraction::ContractionPath;
/// use contra_ops::einsum::einsum_with_path;
///
/// let m = Tensor::<i32, 2, _>::from_shape_vec([2, 2], vec![1, 2, 3, 4], CpuAllocator).unwrap();
/// let trace = einsum_with_path::<i32, 0, _>("ii->", &[&m], CpuAllocator, ContractionPath::Naive).unwrap();
/// assert_eq!(trace.as_slice(), &[5]);
/// ```
pub fn einsum_with_path<T, const M: usize, A>(
    subscripts: &str,
    operands: &[&dyn EinsumOperand<T>],
    alloc: A,
    path: ContractionPath,
) -> Result<Tensor<T, M, A>, TensorOpsError>
where
    T: Zero + One + Copy + Send + Sync + std::ops::Add<Output = T> + std::ops::Mul<Output = T>,
    A: TensorAllocator,
{
    let parsed = parse_subscripts(subscripts)?;
    let plan = Plan::new(&parsed, operands)?;

    if plan.num_output != M {
        return Err(TensorOpsError::InvalidSubscripts(
            subscripts.to_string(),
            format!(
                "the output names {} labels, expected {}",
                plan.num_output, M
            ),
        ));
    }

    log::debug!("einsum `{}` using the {} path", subscripts, path);

    let mut shape = [0usize; M];
    shape.copy_from_slice(plan.output_extents());
    let mut out = vec![T::zero(); shape.iter().product()];

    let fast = path != ContractionPath::Naive
        && plan.is_trailing_contraction()
        && operands.iter().all(|op| op.is_contiguous());

    if fast {
        let rows = plan.output_extents().iter().product::<usize>();
        let cols = plan.summed_extents().iter().product::<usize>();
        log::trace!("einsum `{}` as a {}x{} matvec", subscripts, rows, cols);

        let (a, x) = (operands[0].data(), operands[1].data());
        if path == ContractionPath::Parallel {
            matvec_parallel_kernel(a, rows, cols, x, &mut out)?;
        } else {
            matvec_kernel(a, rows, cols, x, &mut out)?;
        }
    } else {
        log::trace!(
            "einsum `{}` as a strided loop over {:?}",
            subscripts,
            plan.extents
        );
        evaluate_generic(&plan, operands, &mut out);
    }

    Ok(Tensor::from_shape_vec(shape, out, alloc)?)
}
