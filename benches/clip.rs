//! Benchmarks for polygon Boolean operations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use exactum::clip::{intersection, union_with, FillRule};
use exactum::{Path64, Paths64, Point64};

/// Generates a star polygon with alternating radii; with enough points the
/// spikes self-intersect, which stresses the intersection machinery.
fn star(points: usize, r_outer: f64, r_inner: f64, cx: i64, cy: i64) -> Path64 {
    let n = points * 2;
    (0..n)
        .map(|i| {
            let angle = i as f64 / n as f64 * std::f64::consts::TAU;
            let r = if i % 2 == 0 { r_outer } else { r_inner };
            Point64::new(
                cx + (angle.cos() * r) as i64,
                cy + (angle.sin() * r) as i64,
            )
        })
        .collect()
}

/// A field of overlapping rectangles on a staggered grid.
fn rectangle_field(count: usize) -> Paths64 {
    let mut paths = Paths64::new();
    let mut state = 0x2545F4914F6CDD1D_u64;
    for i in 0..count {
        // xorshift for deterministic jitter
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let jx = (state % 50) as i64;
        let jy = ((state >> 8) % 50) as i64;
        let x = (i as i64 % 10) * 70 + jx;
        let y = (i as i64 / 10) * 70 + jy;
        paths.push(vec![
            Point64::new(x, y),
            Point64::new(x + 100, y),
            Point64::new(x + 100, y + 100),
            Point64::new(x, y + 100),
        ]);
    }
    paths
}

fn bench_star_union(c: &mut Criterion) {
    let mut group = c.benchmark_group("star_union");
    for points in [50, 500, 5000] {
        let a = vec![star(points, 10000.0, 4000.0, 0, 0)];
        let b = vec![star(points, 10000.0, 4000.0, 3000, 3000)];
        group.throughput(Throughput::Elements(points as u64 * 2));
        group.bench_with_input(
            BenchmarkId::from_parameter(points),
            &(a, b),
            |bench, (a, b)| {
                bench.iter(|| union_with(black_box(a), black_box(b), FillRule::NonZero).unwrap())
            },
        );
    }
    group.finish();
}

fn bench_star_intersection(c: &mut Criterion) {
    let mut group = c.benchmark_group("star_intersection");
    for points in [50, 500, 5000] {
        let a = vec![star(points, 10000.0, 4000.0, 0, 0)];
        let b = vec![star(points, 10000.0, 4000.0, 3000, 3000)];
        group.throughput(Throughput::Elements(points as u64 * 2));
        group.bench_with_input(
            BenchmarkId::from_parameter(points),
            &(a, b),
            |bench, (a, b)| {
                bench.iter(|| intersection(black_box(a), black_box(b), FillRule::NonZero).unwrap())
            },
        );
    }
    group.finish();
}

fn bench_rectangle_field(c: &mut Criterion) {
    let mut group = c.benchmark_group("rectangle_field_union");
    for count in [10, 100, 400] {
        let subj = rectangle_field(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &subj, |bench, subj| {
            bench.iter(|| {
                union_with(black_box(subj), black_box(&Paths64::new()), FillRule::NonZero).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_star_union,
    bench_star_intersection,
    bench_rectangle_field
);
criterion_main!(benches);
