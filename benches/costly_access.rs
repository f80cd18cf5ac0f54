//! Scanner throughput benchmark
//!
//! Measures the single-trace hot path: one `push()` per access, with a hash
//! lookup for the cluster and one for the run's modes.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench costly_access
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use frontera::decomposition::Decomposition;
use frontera::mode::AccessMode;
use frontera::scanner::scan_controller;
use frontera::trace::{Access, AccessTrace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ENTITIES: i64 = 2_000;
const CLUSTERS: i64 = 16;

fn bench_decomposition() -> Decomposition {
    Decomposition::from_clusters(
        (0..CLUSTERS).map(|c| (c, (0..ENTITIES).filter(|e| e % CLUSTERS == c).collect())),
    )
}

/// Random trace; `locality` is the chance the next access stays on the
/// previous entity's cluster
fn synthetic_trace(rng: &mut StdRng, len: usize, locality: f64) -> AccessTrace {
    let mut entity = rng.gen_range(0..ENTITIES);
    (0..len)
        .map(|_| {
            entity = if rng.gen_bool(locality) {
                let step = rng.gen_range(0..ENTITIES / CLUSTERS) * CLUSTERS;
                (entity % CLUSTERS + step) % ENTITIES
            } else {
                rng.gen_range(0..ENTITIES)
            };
            let mode = if rng.gen_bool(0.3) {
                AccessMode::Write
            } else {
                AccessMode::Read
            };
            Access::new(mode, entity)
        })
        .collect()
}

fn bench_scan_trace_length(c: &mut Criterion) {
    let decomposition = bench_decomposition();
    let mut rng = StdRng::seed_from_u64(42);
    let mut group = c.benchmark_group("scan_trace_length");

    for len in [100usize, 1_000, 10_000, 100_000] {
        let trace = synthetic_trace(&mut rng, len, 0.8);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &trace, |b, trace| {
            b.iter(|| scan_controller("bench", black_box(trace), &decomposition));
        });
    }

    group.finish();
}

/// Low locality means short runs and mostly costly accesses
fn bench_scan_locality(c: &mut Criterion) {
    let decomposition = bench_decomposition();
    let mut rng = StdRng::seed_from_u64(7);
    let mut group = c.benchmark_group("scan_locality");

    for locality in [0.0, 0.5, 0.9, 0.99] {
        let trace = synthetic_trace(&mut rng, 10_000, locality);
        group.bench_with_input(
            BenchmarkId::from_parameter(locality),
            &trace,
            |b, trace| {
                b.iter(|| scan_controller("bench", black_box(trace), &decomposition));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_scan_trace_length, bench_scan_locality);
criterion_main!(benches);
