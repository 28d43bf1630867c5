use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pcdomain_core::PointTable;
use pcdomain_spatial::{KdTree, PlanarKdTree};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_table(n: usize, seed: u64) -> PointTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let x: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..100.0)).collect();
    let y: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..100.0)).collect();
    let z: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..100.0)).collect();
    PointTable::from_xyz(x, y, z)
}

fn bench_knn(c: &mut Criterion) {
    let mut group = c.benchmark_group("kdtree_knn_1");
    for size in [100_000, 1_000_000] {
        let table = random_table(size, 42);
        let tree = KdTree::build(&table.view());
        let query = [50.0, 50.0, 50.0];
        group.bench_with_input(BenchmarkId::new("spatial", size), &size, |b, _| {
            b.iter(|| tree.knn(&query, 1))
        });
    }
    group.finish();
}

fn bench_radius_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("kdtree_radius_search");
    for size in [100_000, 1_000_000] {
        let table = random_table(size, 42);
        let view = table.view();
        let spatial = KdTree::build(&view);
        let planar = PlanarKdTree::build(&view);
        group.bench_with_input(BenchmarkId::new("spatial", size), &size, |b, _| {
            b.iter(|| spatial.radius_search(&[50.0, 50.0, 50.0], 1.0))
        });
        group.bench_with_input(BenchmarkId::new("planar", size), &size, |b, _| {
            b.iter(|| planar.radius_search(&[50.0, 50.0], 1.0))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_knn, bench_radius_search);
criterion_main!(benches);
