use std::hint::black_box;

use contra_ops::{contract_with_path, einsum_with_path, ContractionPath};
use contra_tensor::{CpuAllocator, Tensor};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::Rng;

const PATHS: [ContractionPath; 3] = [
    ContractionPath::Naive,
    ContractionPath::Optimized,
    ContractionPath::Parallel,
];

fn random_operands(shape: [usize; 4]) -> (Tensor<i64, 4>, Tensor<i64, 2>) {
    let mut rng = rand::rng();
    let [p, q, r, s] = shape;
    let i: Vec<i64> = (0..p * q * r * s).map(|_| rng.random_range(-10..10)).collect();
    let d: Vec<i64> = (0..r * s).map(|_| rng.random_range(-10..10)).collect();
    (
        Tensor::from_shape_vec(shape, i, CpuAllocator).unwrap(),
        Tensor::from_shape_vec([r, s], d, CpuAllocator).unwrap(),
    )
}

fn bench_contract(c: &mut Criterion) {
    let mut group = c.benchmark_group("contract");

    for n in [10, 20, 40] {
        let (i, d) = random_operands([n, n, n, n]);

        for path in PATHS {
            group.bench_function(format!("{}_{}", path, n), |bencher| {
                bencher.iter(|| black_box(contract_with_path(&i, &d, path).unwrap()))
            });
        }
    }

    group.finish();
}

fn bench_einsum(c: &mut Criterion) {
    let mut group = c.benchmark_group("einsum");
    let (i, d) = random_operands([20, 20, 20, 20]);

    for path in PATHS {
        group.bench_function(format!("pqrs_rs_{}", path), |bencher| {
            bencher.iter(|| {
                black_box(
                    einsum_with_path::<i64, 2, _>("pqrs,rs->pq", &[&i, &d], CpuAllocator, path)
                        .unwrap(),
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_contract, bench_einsum);
criterion_main!(benches);
