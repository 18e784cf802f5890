//! Fuzz target for the per-unit forwarding path.
//!
//! Untrusted options bytes and descriptor spans must only ever produce a
//! counted drop or a forward, never a panic.

#![no_main]

use std::sync::{Arc, OnceLock};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use semroute::descriptor::DescriptorBuilder;
use semroute::forwarding::{
    DescriptorSpan, ForwardUnit, ForwardingConfig, ForwardingEngine, PortId, TransmitError,
};
use semroute::table::{NodeId, RouteEntry, RoutingTable};

#[derive(Debug, Arbitrary)]
struct Input {
    hop_limit: u8,
    destination: u128,
    span: Option<(usize, usize)>,
    options: Vec<u8>,
}

fn engine() -> &'static ForwardingEngine {
    static ENGINE: OnceLock<ForwardingEngine> = OnceLock::new();
    ENGINE.get_or_init(|| {
        let table = Arc::new(RoutingTable::default());
        for id in 1..=4u128 {
            let profile = DescriptorBuilder::new()
                .capabilities(1 << id)
                .context_window(4096 * id as u32)
                .build();
            let entry = RouteEntry::new(NodeId::from_u128(id))
                .with_capabilities(profile)
                .with_latency_us(id as u32 * 10_000)
                .with_trust_level(id as u8)
                .with_region(id as u16);
            table.insert(entry).expect("valid entry");
        }
        ForwardingEngine::new(
            NodeId::from_u128(0),
            table,
            |_: &ForwardUnit, _: NodeId, _: PortId| -> Result<(), TransmitError> { Ok(()) },
            ForwardingConfig::default(),
        )
    })
}

fuzz_target!(|input: Input| {
    let span = input
        .span
        .map(|(offset, len)| DescriptorSpan { offset, len });
    let mut unit = ForwardUnit::new(
        NodeId::from_u128(u128::MAX),
        NodeId::from_u128(input.destination),
        input.hop_limit,
    )
    .with_options(input.options, span);

    let _ = engine().process(&mut unit, 0);
});
