//! Scheduler throughput over many tracked containers.

use std::time::Duration;

use alembic_bench::reference_profile;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_update_all_1k(c: &mut Criterion) {
    let mut world = reference_profile(1_000, 42).unwrap();
    let mut now = Duration::ZERO;

    c.bench_function("update_all_1k", |b| {
        b.iter(|| {
            now += world.engine.config().update_interval;
            let report = world.engine.update_all(now, &mut world.host);
            black_box(&report);
        });
    });
}

fn bench_full_run_100(c: &mut Criterion) {
    c.bench_function("full_run_100_containers", |b| {
        b.iter(|| {
            let mut world = reference_profile(100, 7).unwrap();
            for tick in 1..=60 {
                let report = world
                    .engine
                    .update_all(Duration::from_secs(tick), &mut world.host);
                black_box(&report);
            }
        });
    });
}

criterion_group!(benches, bench_update_all_1k, bench_full_run_100);
criterion_main!(benches);
