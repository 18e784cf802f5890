//! Lookup and forwarding throughput benchmarks.
//!
//! Measures ranked lookup over tables of increasing size, and the full
//! per-unit forwarding path with a no-op transmitter.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use semroute::descriptor::{Descriptor, DescriptorBuilder};
use semroute::forwarding::{ForwardUnit, ForwardingConfig, ForwardingEngine, PortId, TransmitError};
use semroute::resolver::ResolveResult;
use semroute::scoring::ScoringWeights;
use semroute::table::{NodeId, RouteEntry, RoutingTable};
use std::sync::Arc;

fn populated_table(size: u32) -> Arc<RoutingTable> {
    let table = Arc::new(RoutingTable::default());
    for i in 0..size {
        let profile = DescriptorBuilder::new()
            .capabilities(u64::from(i) * 0x9E37_79B9)
            .context_window(4096 << (i % 4))
            .build();
        let entry = RouteEntry::new(NodeId::from_u128(u128::from(i)))
            .with_capabilities(profile)
            .with_latency_us(10_000 + (i % 50) * 1_000)
            .with_cost_milli(i % 100)
            .with_trust_level((i % 8) as u8)
            .with_region((i % 16) as u16)
            .with_load_factor((i % 10) as f32 / 10.0);
        let _ = table.insert(entry);
    }
    table
}

fn query() -> Descriptor {
    DescriptorBuilder::new()
        .capabilities(0xFF)
        .context_window(8192)
        .max_latency_us(40_000)
        .max_cost_milli(80)
        .trust_floor(2)
        .region_exclude(vec![3, 5])
        .build()
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    let weights = ScoringWeights::default();
    let query = query();

    for size in [16u32, 256, 4096] {
        let table = populated_table(size);
        let mut out: Vec<ResolveResult> = Vec::with_capacity(3);

        group.throughput(Throughput::Elements(u64::from(size)));
        group.bench_function(BenchmarkId::new("top3", size), |b| {
            b.iter(|| {
                let found = table
                    .lookup_with(black_box(&query), &weights, 3, &mut out)
                    .unwrap_or(0);
                black_box(found)
            })
        });
    }

    group.finish();
}

fn bench_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("forward");
    let query = query();
    let template = ForwardUnit::new(NodeId::from_u128(u128::MAX), NodeId::from_u128(0xFEED), 64)
        .with_descriptor(&query)
        .unwrap_or_else(|_| ForwardUnit::new(NodeId::from_u128(0), NodeId::from_u128(1), 64));

    for size in [16u32, 256] {
        let engine = ForwardingEngine::new(
            NodeId::from_u128(u128::MAX - 1),
            populated_table(size),
            |_: &ForwardUnit, _: NodeId, _: PortId| -> Result<(), TransmitError> { Ok(()) },
            ForwardingConfig::default(),
        );

        group.throughput(Throughput::Elements(1));
        group.bench_function(BenchmarkId::new("process", size), |b| {
            b.iter(|| {
                let mut unit = template.clone();
                black_box(engine.process(&mut unit, 0).is_ok())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_lookup, bench_forward);
criterion_main!(benches);
