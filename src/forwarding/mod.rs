//! Forwarding module.
//!
//! Turns inbound units carrying a semantic query into a transmit toward
//! one of the best-matching registered nodes.

mod engine;
mod select;
mod stats;
mod unit;

pub use engine::{
    Disposition, Dropped, ForwardingConfig, ForwardingEngine, TransmitError, Transmitter,
};
pub use select::{select_weighted, XorShift64, DEFAULT_SEED};
pub use stats::ForwardingStats;
pub use unit::{DescriptorSpan, ForwardUnit, PortId};
