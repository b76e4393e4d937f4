use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use matprod::Kernel;
use std::hint::black_box;

const SIZES: &[usize] = &[64, 128, 256];

fn bench_kernel(c: &mut Criterion, kernel: Kernel) {
    let mut group = c.benchmark_group(kernel.name());
    for &n in SIZES {
        group.throughput(Throughput::Elements((n as u64).pow(3)));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bench, &n| {
            bench.iter(|| {
                let product = kernel.run(black_box(n), black_box(n)).unwrap();
                black_box(product.matrix.get(n / 2, n / 2));
            });
        });
    }
    group.finish();
}

fn bench_matmul(c: &mut Criterion) {
    bench_kernel(c, Kernel::Naive);
    bench_kernel(c, Kernel::Line);
    bench_kernel(c, Kernel::Block { block_size: 32 });
    bench_kernel(c, Kernel::LineParallelRows { threads: 4 });
    bench_kernel(c, Kernel::LineParallelCols { threads: 4 });
}

criterion_group!(benches, bench_matmul);
criterion_main!(benches);
