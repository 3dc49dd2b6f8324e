use approx::assert_relative_eq;
use contra_ops::{contract, contract_with_path, einsum, ContractionPath, TensorOpsError};
use contra_tensor::{CpuAllocator, Tensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const PATHS: [ContractionPath; 3] = [
    ContractionPath::Naive,
    ContractionPath::Optimized,
    ContractionPath::Parallel,
];

fn random_i64<const N: usize>(rng: &mut StdRng, shape: [usize; N]) -> Tensor<i64, N> {
    let data = (0..shape.iter().product::<usize>())
        .map(|_| rng.random_range(-100..100))
        .collect();
    Tensor::from_shape_vec(shape, data, CpuAllocator).unwrap()
}

fn random_f64<const N: usize>(rng: &mut StdRng, shape: [usize; N]) -> Tensor<f64, N> {
    let data = (0..shape.iter().product::<usize>())
        .map(|_| rng.random::<f64>() * 2.0 - 1.0)
        .collect();
    Tensor::from_shape_vec(shape, data, CpuAllocator).unwrap()
}

#[test]
fn literal_example() -> Result<(), TensorOpsError> {
    let i = Tensor::<i32, 4>::from_shape_vec([2, 2, 2, 2], (1..=16).collect(), CpuAllocator)?;
    let d = Tensor::<i32, 2>::from_shape_vec([2, 2], vec![1, 2, 3, 4], CpuAllocator)?;

    let j = contract(&i, &d)?;
    assert_eq!(j.shape, [2, 2]);
    assert_eq!(j.as_slice(), &[30, 70, 110, 150]);
    assert_eq!(j.to_string(), "[[ 30,  70],\n [110, 150]]");
    Ok(())
}

#[test]
fn generated_shape_paths_agree() -> Result<(), TensorOpsError> {
    let i = Tensor::<i64, 4>::from_shape_fn([10, 10, 10, 10], CpuAllocator, |[p, q, r, s]| {
        (p + q + r + s) as i64
    })?;
    let d = Tensor::<i64, 2>::from_shape_fn([10, 10], CpuAllocator, |[r, s]| (r + s) as i64)?;

    let expected = contract_with_path(&i, &d, ContractionPath::Naive)?;
    for p in 0..10 {
        for q in 0..10 {
            let mut acc = 0i64;
            for r in 0..10 {
                for s in 0..10 {
                    acc += (p + q + r + s) as i64 * (r + s) as i64;
                }
            }
            assert_eq!(*expected.get_unchecked([p, q]), acc);
        }
    }

    for path in PATHS {
        assert_eq!(contract_with_path(&i, &d, path)?.as_slice(), expected.as_slice());
    }
    Ok(())
}

#[test]
fn zero_operand_gives_zero() -> Result<(), TensorOpsError> {
    let mut rng = StdRng::seed_from_u64(7);
    let i = random_i64(&mut rng, [4, 3, 5, 6]);
    let d = Tensor::<i64, 2>::zeros([5, 6], CpuAllocator)?;

    for path in PATHS {
        let j = contract_with_path(&i, &d, path)?;
        assert!(j.as_slice().iter().all(|v| *v == 0));
    }
    Ok(())
}

#[test]
fn linear_in_the_second_operand() -> Result<(), TensorOpsError> {
    let mut rng = StdRng::seed_from_u64(11);
    let i = random_i64(&mut rng, [5, 4, 3, 7]);
    let d1 = random_i64(&mut rng, [3, 7]);
    let d2 = random_i64(&mut rng, [3, 7]);
    let (a, b) = (3i64, -5i64);

    let combined = d1.element_wise_op(&d2, |x, y| a * *x + b * *y)?;

    for path in PATHS {
        let lhs = contract_with_path(&i, &combined, path)?;
        let j1 = contract_with_path(&i, &d1, path)?;
        let j2 = contract_with_path(&i, &d2, path)?;
        let rhs = j1.element_wise_op(&j2, |x, y| a * *x + b * *y)?;
        assert_eq!(lhs.as_slice(), rhs.as_slice());
    }
    Ok(())
}

#[test]
fn float_paths_agree() -> Result<(), TensorOpsError> {
    let mut rng = StdRng::seed_from_u64(42);
    let i = random_f64(&mut rng, [8, 6, 9, 7]);
    let d = random_f64(&mut rng, [9, 7]);

    let naive = contract_with_path(&i, &d, ContractionPath::Naive)?;
    for path in [ContractionPath::Optimized, ContractionPath::Parallel] {
        let j = contract_with_path(&i, &d, path)?;
        for (a, b) in naive.as_slice().iter().zip(j.as_slice()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9, max_relative = 1e-9);
        }
    }
    Ok(())
}

#[test]
fn shape_mismatch_is_reported() -> Result<(), TensorOpsError> {
    let i = Tensor::<i64, 4>::zeros([2, 2, 3, 3], CpuAllocator)?;
    let d = Tensor::<i64, 2>::zeros([2, 2], CpuAllocator)?;

    for path in PATHS {
        assert_eq!(
            contract_with_path(&i, &d, path).err(),
            Some(TensorOpsError::ShapeMismatch(vec![3, 3], vec![2, 2]))
        );
    }
    Ok(())
}

#[test]
fn einsum_agrees_with_contract() -> Result<(), TensorOpsError> {
    let mut rng = StdRng::seed_from_u64(3);
    let i = random_i64(&mut rng, [3, 5, 4, 2]);
    let d = random_i64(&mut rng, [4, 2]);

    let j = contract(&i, &d)?;
    let e = einsum::<i64, 2, _>("pqrs,rs->pq", &[&i, &d], CpuAllocator)?;
    assert_eq!(j.as_slice(), e.as_slice());
    Ok(())
}
