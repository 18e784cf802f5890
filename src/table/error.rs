use thiserror::Error;

use super::entry::NodeId;

/// Errors returned by routing table operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("No route entry for node {0}")]
    NotFound(NodeId),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
