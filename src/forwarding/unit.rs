//! Dataplane units of work.

use crate::descriptor::{self, Descriptor, DescriptorError};
use crate::table::NodeId;

/// Ingress/egress port identifier on the dataplane host.
pub type PortId = u32;

/// Location of an embedded Descriptor inside a unit's options region.
///
/// Supplied by the framing layer and not trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorSpan {
    pub offset: usize,
    pub len: usize,
}

/// One decapsulated frame awaiting a forwarding decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardUnit {
    pub source: NodeId,
    pub destination: NodeId,
    /// Remaining hops; the unit is dropped when asked to forward at zero.
    pub hop_limit: u8,
    pub options: Vec<u8>,
    pub descriptor_span: Option<DescriptorSpan>,
    pub payload: Vec<u8>,
}

impl ForwardUnit {
    pub fn new(source: NodeId, destination: NodeId, hop_limit: u8) -> Self {
        Self {
            source,
            destination,
            hop_limit,
            options: Vec::new(),
            descriptor_span: None,
            payload: Vec::new(),
        }
    }

    /// Append an encoded Descriptor to the options region and point the span at it.
    pub fn with_descriptor(mut self, query: &Descriptor) -> Result<Self, DescriptorError> {
        let encoded = descriptor::encode(query)?;
        let offset = self.options.len();
        self.options.extend_from_slice(&encoded);
        self.descriptor_span = Some(DescriptorSpan {
            offset,
            len: encoded.len(),
        });
        Ok(self)
    }

    /// Replace the options region verbatim, with an unchecked span.
    pub fn with_options(mut self, options: Vec<u8>, span: Option<DescriptorSpan>) -> Self {
        self.options = options;
        self.descriptor_span = span;
        self
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    /// Bounds-checked view of the embedded Descriptor bytes, if a span is present.
    pub fn descriptor_bytes(&self) -> Option<Result<&[u8], DescriptorError>> {
        let span = self.descriptor_span?;
        let Some(end) = span.offset.checked_add(span.len) else {
            return Some(Err(DescriptorError::Malformed(
                "descriptor span overflows".into(),
            )));
        };
        Some(
            self.options
                .get(span.offset..end)
                .ok_or(DescriptorError::BufferTooSmall {
                    needed: end,
                    actual: self.options.len(),
                }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DescriptorBuilder;

    fn unit() -> ForwardUnit {
        ForwardUnit::new(NodeId::from_u128(1), NodeId::from_u128(2), 8)
    }

    #[test]
    fn no_span_means_no_descriptor() {
        assert!(unit().descriptor_bytes().is_none());
    }

    #[test]
    fn embedded_descriptor_roundtrips() {
        let query = DescriptorBuilder::new().capabilities(0b101).build();
        let unit = unit()
            .with_options(vec![0xAA, 0xBB], None)
            .with_descriptor(&query)
            .unwrap();
        let bytes = unit.descriptor_bytes().unwrap().unwrap();
        assert_eq!(descriptor::decode(bytes).unwrap(), query);
        assert_eq!(unit.descriptor_span.unwrap().offset, 2);
    }

    #[test]
    fn out_of_bounds_span_rejected() {
        let unit = unit().with_options(
            vec![1, 0, 0, 0],
            Some(DescriptorSpan { offset: 2, len: 4 }),
        );
        assert!(matches!(
            unit.descriptor_bytes(),
            Some(Err(DescriptorError::BufferTooSmall { needed: 6, actual: 4 }))
        ));
    }

    #[test]
    fn overflowing_span_rejected() {
        let unit = unit().with_options(
            vec![1, 0, 0, 0],
            Some(DescriptorSpan {
                offset: usize::MAX,
                len: 2,
            }),
        );
        assert!(matches!(
            unit.descriptor_bytes(),
            Some(Err(DescriptorError::Malformed(_)))
        ));
    }
}
