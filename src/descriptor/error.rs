//! Descriptor codec error types.
//!
//! All errors are fail-closed: a buffer that fails any check is rejected
//! whole, never partially decoded.

use thiserror::Error;

/// Errors raised while validating, decoding, or encoding a Descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("Buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("Descriptor too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Unsupported descriptor version: {0}")]
    UnsupportedVersion(u8),

    #[error("Too many fields: {count} (max {max})")]
    TooManyFields { count: usize, max: usize },

    #[error("Malformed descriptor: {0}")]
    Malformed(String),
}

impl DescriptorError {
    /// Returns true if the input was structurally truncated rather than
    /// semantically invalid.
    pub fn is_truncation(&self) -> bool {
        matches!(self, Self::BufferTooSmall { .. })
    }
}
