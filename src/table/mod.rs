//! Routing table module.
//!
//! Holds the registered forwarding candidates with wait-free reads and
//! serialized, copy-on-write writes.

mod entry;
mod error;
mod routing_table;
mod snapshot;

pub use entry::{NodeId, RouteEntry};
pub use error::TableError;
pub use routing_table::{RoutingTable, TableConfig, MAX_INITIAL_CAPACITY};
pub use snapshot::{Snapshot, SnapshotGuard};
