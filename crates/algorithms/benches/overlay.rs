//! Benchmarks for the overlay chain and transition aggregation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use landshift_algorithms::classification::ClassId;
use landshift_algorithms::history::aggregate;
use landshift_algorithms::vector::{
    chain_intersect, label_period, regions_to_features, vectorize, LabelParams, Period,
    PeriodLayer, PolygonizeParams,
};
use landshift_core::{GeoTransform, Raster};

fn create_classes(size: usize, seed: usize) -> Raster<ClassId> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64 * 30.0, 30.0, -30.0));
    for row in 0..size {
        for col in 0..size {
            let v = ((row / 4 * 7 + col / 3 * 13 + seed) % 5) as ClassId + 1;
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn create_layer(size: usize, year: i32) -> PeriodLayer {
    let regions = vectorize(&create_classes(size, year as usize), &PolygonizeParams::default());
    let features = regions_to_features(&regions, "bench", None).unwrap();
    label_period(&features, Period(year), &LabelParams::default()).unwrap()
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("vector/chain_intersect");
    group.sample_size(10);
    for size in [32, 64, 128] {
        let layers = [create_layer(size, 2010), create_layer(size, 2015), create_layer(size, 2020)];
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| chain_intersect(black_box(&layers)).unwrap())
        });
    }
    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("history/aggregate");
    for size in [64, 128] {
        let layers = [create_layer(size, 2010), create_layer(size, 2015)];
        let fragments = chain_intersect(&layers).unwrap().fragments;
        let fields = fragments.fields().to_vec();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| aggregate(black_box(&fragments), &fields).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_chain, bench_aggregate);
criterion_main!(benches);
