use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use statmux::simulation::{Engine, SimConfig};
use std::hint::black_box;

const TICKS: u64 = 200;

fn bench_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_ticks");
    group.throughput(Throughput::Elements(TICKS));

    for users in [10u32, 35, 100, 1000] {
        let config = SimConfig::default().with_users(users, 0.1).with_seed(42);
        group.bench_with_input(BenchmarkId::from_parameter(users), &config, |b, config| {
            b.iter(|| {
                let mut engine = Engine::new(config.clone()).unwrap();
                engine.run(TICKS).unwrap();
                black_box(engine.counters())
            })
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut engine = Engine::new(SimConfig::default().with_users(500, 0.3).with_seed(7)).unwrap();
    engine.run(100).unwrap();

    c.bench_function("snapshot_500_users", |b| b.iter(|| black_box(engine.snapshot())));
}

criterion_group!(benches, bench_ticks, bench_snapshot);
criterion_main!(benches);
