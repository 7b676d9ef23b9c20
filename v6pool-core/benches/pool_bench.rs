//! Performance benchmarks for the subnet pool and range decomposition

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use v6pool_core::{Address, AddressPool, AddressRange, Network};

fn network(s: &str) -> Network {
    s.parse().unwrap()
}

/// Benchmark allocating until the pool runs dry
fn bench_sequential_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_allocation_sequential");

    for prefix in [56u8, 60, 64].iter() {
        let capacity = 1u64 << (*prefix - 48);

        group.throughput(Throughput::Elements(capacity));
        group.bench_with_input(BenchmarkId::new("prefix", prefix), prefix, |b, prefix| {
            b.iter(|| {
                let mut pool = AddressPool::from_network(&network("2001:db8::/48"), *prefix).unwrap();
                let mut count = 0u64;
                while let Some(next) = pool.allocate() {
                    pool = next;
                    count += 1;
                }
                black_box(count)
            });
        });
    }

    group.finish();
}

/// Benchmark targeted allocation and release in a fragmented pool
fn bench_fragmented_pool(c: &mut Criterion) {
    let fragmented = || {
        let mut pool = AddressPool::from_network(&network("2001:db8::/48"), 60).unwrap();
        let mut allocated = Vec::new();
        while let Some(next) = pool.allocate() {
            allocated.push(next.last_allocated().unwrap());
            pool = next;
        }
        for (i, net) in allocated.iter().enumerate() {
            if i % 2 == 0 {
                pool = pool.deallocate(net).unwrap();
            }
        }
        (pool, allocated)
    };

    c.bench_function("pool_deallocate_fragmented", |b| {
        b.iter_batched(
            fragmented,
            |(pool, allocated)| {
                let mut pool = pool;
                for net in allocated.iter().skip(1).step_by(2) {
                    pool = pool.deallocate(net).unwrap();
                }
                black_box(pool.free_range_count())
            },
            BatchSize::SmallInput,
        );
    });

    let (pool, _) = fragmented();
    c.bench_function("pool_is_free_fragmented", |b| {
        let candidate = network("2001:db8:0:7f00::/60");
        b.iter(|| black_box(pool.is_free(black_box(&candidate)).unwrap()));
    });
}

/// Benchmark CIDR decomposition of unaligned ranges
fn bench_to_subnets(c: &mut Criterion) {
    let range = AddressRange::from_first_and_last(Address::from_u128(1), Address::from_u128(u128::MAX - 1)).unwrap();

    c.bench_function("range_to_subnets_worst_case", |b| {
        b.iter(|| black_box(range.to_subnets().count()));
    });
}

criterion_group!(
    benches,
    bench_sequential_allocation,
    bench_fragmented_pool,
    bench_to_subnets,
);

criterion_main!(benches);
