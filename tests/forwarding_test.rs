//! Tests for ForwardingEngine - per-unit forwarding decisions.

use semroute::descriptor::{Descriptor, DescriptorBuilder, DescriptorError};
use semroute::forwarding::{
    DescriptorSpan, Disposition, Dropped, ForwardUnit, ForwardingConfig, ForwardingEngine,
    ForwardingStats, PortId, TransmitError, Transmitter, XorShift64,
};
use semroute::table::{NodeId, RouteEntry, RoutingTable};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const SELF_ID: u128 = 100;
const ANYCAST: u128 = 200;

fn node(id: u128) -> NodeId {
    NodeId::from_u128(id)
}

type Sent = Arc<Mutex<Vec<(NodeId, NodeId, u8)>>>;

/// Transmitter recording `(next_hop, unit destination, hop_limit)` per call.
fn recording() -> (Sent, impl Transmitter) {
    let sent: Sent = Arc::new(Mutex::new(Vec::new()));
    let log = sent.clone();
    let tx = move |unit: &ForwardUnit, next_hop: NodeId, _port: PortId| -> Result<(), TransmitError> {
        log.lock()
            .unwrap()
            .push((next_hop, unit.destination, unit.hop_limit));
        Ok(())
    };
    (sent, tx)
}

fn engine_with(table: Arc<RoutingTable>, config: ForwardingConfig) -> (Sent, ForwardingEngine) {
    let (sent, tx) = recording();
    (sent, ForwardingEngine::new(node(SELF_ID), table, tx, config))
}

fn latency_query(bound_us: u32) -> Descriptor {
    DescriptorBuilder::new().max_latency_us(bound_us).build()
}

fn unit_for(query: &Descriptor) -> ForwardUnit {
    ForwardUnit::new(node(1), node(ANYCAST), 16)
        .with_descriptor(query)
        .unwrap()
}

fn table_with(latencies: &[(u128, u32)]) -> Arc<RoutingTable> {
    let table = Arc::new(RoutingTable::default());
    for &(id, latency) in latencies {
        table
            .insert(RouteEntry::new(node(id)).with_latency_us(latency))
            .unwrap();
    }
    table
}

#[test]
fn test_local_unit_is_untouched() {
    let (sent, engine) = engine_with(table_with(&[(1, 10)]), ForwardingConfig::default());
    let mut unit = ForwardUnit::new(node(1), node(SELF_ID), 3);

    assert_eq!(engine.process(&mut unit, 0), Ok(Disposition::Local));
    assert_eq!(unit.hop_limit, 3);
    assert!(sent.lock().unwrap().is_empty());
    assert_eq!(engine.stats(), ForwardingStats::default());
}

#[test]
fn test_forward_rewrites_destination_and_decrements_hops() {
    let (sent, engine) = engine_with(table_with(&[(7, 10_000)]), ForwardingConfig::default());
    let mut unit = unit_for(&latency_query(100_000));

    let disposition = engine.process(&mut unit, 2).unwrap();

    assert!(matches!(disposition, Disposition::Forwarded { next_hop, .. } if next_hop == node(7)));
    assert_eq!(unit.destination, node(7));
    assert_eq!(unit.hop_limit, 15);
    assert_eq!(*sent.lock().unwrap(), vec![(node(7), node(7), 15)]);
    assert_eq!(engine.frames_forwarded(), 1);
    assert_eq!(engine.resolved(), 1);
}

#[test]
fn test_exhausted_hop_limit_is_dropped() {
    let (sent, engine) = engine_with(table_with(&[(7, 10)]), ForwardingConfig::default());
    let mut unit = unit_for(&latency_query(100));
    unit.hop_limit = 0;

    assert_eq!(engine.process(&mut unit, 0), Err(Dropped::HopLimitExceeded));
    assert!(sent.lock().unwrap().is_empty());
    assert_eq!(engine.frames_dropped(), 1);
    assert_eq!(engine.resolved(), 0);
}

#[test]
fn test_missing_descriptor_is_dropped() {
    let (_, engine) = engine_with(table_with(&[(7, 10)]), ForwardingConfig::default());
    let mut unit = ForwardUnit::new(node(1), node(ANYCAST), 4);

    let result = engine.process(&mut unit, 0);
    assert_eq!(result, Err(Dropped::NoDescriptor));
    assert_eq!(result.unwrap_err().reason(), "no_descriptor");
}

#[test]
fn test_malformed_descriptor_is_dropped() {
    let (sent, engine) = engine_with(table_with(&[(7, 10)]), ForwardingConfig::default());
    let bytes = vec![1, 0, 0, 1, 0x01, 0, 8];
    let span = DescriptorSpan {
        offset: 0,
        len: bytes.len(),
    };
    let mut unit = ForwardUnit::new(node(1), node(ANYCAST), 4).with_options(bytes, Some(span));

    let err = engine.process(&mut unit, 0).unwrap_err();
    assert!(matches!(err, Dropped::MalformedDescriptor(_)));
    assert!(err.is_adversarial());
    assert!(sent.lock().unwrap().is_empty());
    assert_eq!(engine.frames_dropped(), 1);
}

#[test]
fn test_span_outside_options_is_dropped() {
    let (_, engine) = engine_with(table_with(&[(7, 10)]), ForwardingConfig::default());
    let mut unit = ForwardUnit::new(node(1), node(ANYCAST), 4)
        .with_options(vec![1, 0, 0, 0], Some(DescriptorSpan { offset: 3, len: 64 }));

    assert_eq!(
        engine.process(&mut unit, 0),
        Err(Dropped::MalformedDescriptor(DescriptorError::BufferTooSmall {
            needed: 67,
            actual: 4
        }))
    );
}

#[test]
fn test_no_eligible_route_is_dropped() {
    let table = Arc::new(RoutingTable::default());
    table
        .insert(RouteEntry::new(node(7)).with_trust_level(1))
        .unwrap();
    let (_, engine) = engine_with(table, ForwardingConfig::default());
    let query = DescriptorBuilder::new().trust_floor(5).build();
    let mut unit = unit_for(&query);

    assert_eq!(engine.process(&mut unit, 0), Err(Dropped::NoRoute));
    assert_eq!(engine.resolve_failures(), 1);
    assert_eq!(engine.frames_dropped(), 1);
    assert_eq!(unit.destination, node(ANYCAST));
}

#[test]
fn test_transmit_failure_is_dropped() {
    let tx = |_: &ForwardUnit, _: NodeId, _: PortId| -> Result<(), TransmitError> {
        Err(TransmitError::LinkDown("eth1".into()))
    };
    let engine = ForwardingEngine::new(
        node(SELF_ID),
        table_with(&[(7, 10)]),
        tx,
        ForwardingConfig::default(),
    );
    let mut unit = unit_for(&latency_query(100));

    let err = engine.process(&mut unit, 0).unwrap_err();
    assert_eq!(err, Dropped::Transmit(TransmitError::LinkDown("eth1".into())));
    assert_eq!(
        engine.stats(),
        ForwardingStats {
            forwarded: 0,
            dropped: 1,
            resolved: 1,
            resolve_failures: 0,
        }
    );
}

#[test]
fn test_single_path_always_takes_best() {
    let config = ForwardingConfig {
        max_multipath: 1,
        ..Default::default()
    };
    let (sent, engine) = engine_with(table_with(&[(1, 30_000), (2, 50_000), (3, 20_000)]), config);

    for _ in 0..50 {
        let mut unit = unit_for(&latency_query(500_000));
        engine.process(&mut unit, 0).unwrap();
    }
    assert!(sent.lock().unwrap().iter().all(|(hop, _, _)| *hop == node(3)));
}

#[test]
fn test_multipath_spreads_by_score() {
    let caps = 0b1011_0001;
    let table = Arc::new(RoutingTable::default());
    for (id, latency) in [(1u128, 30_000u32), (2, 50_000), (3, 450_000)] {
        table
            .insert(
                RouteEntry::new(node(id))
                    .with_capabilities(DescriptorBuilder::new().capabilities(caps).build())
                    .with_latency_us(latency),
            )
            .unwrap();
    }
    let (sent, engine) = engine_with(table, ForwardingConfig::default());
    let query = DescriptorBuilder::new()
        .capabilities(caps)
        .max_latency_us(500_000)
        .build();

    for _ in 0..1000 {
        let mut unit = unit_for(&query);
        engine.process(&mut unit, 0).unwrap();
    }

    let mut hits: HashMap<NodeId, u32> = HashMap::new();
    for (hop, _, _) in sent.lock().unwrap().iter() {
        *hits.entry(*hop).or_default() += 1;
    }
    let fast = hits.get(&node(1)).copied().unwrap_or(0);
    let mid = hits.get(&node(2)).copied().unwrap_or(0);
    let slow = hits.get(&node(3)).copied().unwrap_or(0);

    assert!(fast > 0 && mid > 0 && slow > 0, "{:?}", hits);
    assert!(slow < fast && slow < mid, "{:?}", hits);
    assert_eq!(engine.frames_forwarded(), 1000);
}

#[test]
fn test_same_seed_same_choices() {
    let table = table_with(&[(1, 100), (2, 200), (3, 300)]);
    let config = ForwardingConfig {
        rng_seed: 77,
        ..Default::default()
    };
    let (sent_a, a) = engine_with(table.clone(), config.clone());
    let (sent_b, b) = engine_with(table, config);

    for _ in 0..100 {
        a.process(&mut unit_for(&latency_query(1_000)), 0).unwrap();
        b.process(&mut unit_for(&latency_query(1_000)), 0).unwrap();
    }
    assert_eq!(*sent_a.lock().unwrap(), *sent_b.lock().unwrap());
}

#[test]
fn test_with_rng_replaces_generator() {
    let table = table_with(&[(1, 100), (2, 200)]);
    let (sent_a, a) = engine_with(table.clone(), ForwardingConfig::default());
    let (sent_b, b) = engine_with(table, ForwardingConfig::default());
    let b = b.with_rng(XorShift64::new(ForwardingConfig::default().rng_seed));

    for _ in 0..50 {
        a.process(&mut unit_for(&latency_query(1_000)), 0).unwrap();
        b.process(&mut unit_for(&latency_query(1_000)), 0).unwrap();
    }
    assert_eq!(*sent_a.lock().unwrap(), *sent_b.lock().unwrap());
}

#[test]
fn test_reset_stats() {
    let (_, engine) = engine_with(table_with(&[(7, 10)]), ForwardingConfig::default());
    engine.process(&mut unit_for(&latency_query(100)), 0).unwrap();
    let _ = engine.process(&mut ForwardUnit::new(node(1), node(ANYCAST), 0), 0);
    assert_eq!(engine.frames_forwarded(), 1);
    assert_eq!(engine.frames_dropped(), 1);

    engine.reset_stats();
    assert_eq!(engine.stats(), ForwardingStats::default());
}

#[test]
fn test_table_updates_are_seen_by_next_unit() {
    let table = table_with(&[(1, 10)]);
    let (sent, engine) = engine_with(table.clone(), ForwardingConfig::default());

    engine.process(&mut unit_for(&latency_query(100)), 0).unwrap();
    table.remove(node(1)).unwrap();
    table.insert(RouteEntry::new(node(2)).with_latency_us(10)).unwrap();
    engine.process(&mut unit_for(&latency_query(100)), 0).unwrap();

    let hops: Vec<_> = sent.lock().unwrap().iter().map(|(hop, _, _)| *hop).collect();
    assert_eq!(hops, vec![node(1), node(2)]);
}
