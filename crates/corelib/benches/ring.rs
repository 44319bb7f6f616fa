use corelib::node::NodeAddress;
use corelib::ring::RingSnapshot;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn inventory(count: u16) -> Vec<NodeAddress> {
    (0..count)
        .map(|i| NodeAddress::new("10.0.0.1", 50000 + i))
        .collect()
}

fn bench_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute");
    for n in [4u16, 32, 256] {
        let alive = inventory(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &alive, |b, alive| {
            b.iter(|| RingSnapshot::compute(black_box(alive), alive.len()))
        });
    }
    group.finish();
}

fn bench_owner_of(c: &mut Criterion) {
    let ring = match RingSnapshot::compute(&inventory(64), 64) {
        Ok(ring) => ring,
        Err(e) => panic!("ring setup failed: {}", e),
    };
    let keys: Vec<String> = (0..1024).map(|i| format!("user:{}", i)).collect();
    c.bench_function("owner_of/64", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(ring.owner_of(key));
            }
        })
    });
}

criterion_group!(benches, bench_compute, bench_owner_of);
criterion_main!(benches);
