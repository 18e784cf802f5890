//! Semantic query Descriptors.
//!
//! A Descriptor describes what a caller needs (capabilities, latency and
//! cost budgets, trust floor, region constraints) or what an endpoint
//! advertises. The same type serves both roles. A Descriptor with no
//! fields is the universal wildcard.

mod codec;
mod error;
mod field;

pub use codec::{
    decode, encode, validate, DESCRIPTOR_VERSION, FIELD_HEADER_LEN, HEADER_LEN,
    MAX_DESCRIPTOR_SIZE, MAX_FIELDS,
};
pub use error::DescriptorError;
pub use field::{Field, FieldKind, ModelArchitecture, MAX_REGIONS};

/// A versioned, bounded list of typed fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    flags: u8,
    fields: Vec<Field>,
}

impl Descriptor {
    /// The empty Descriptor; matches every entry with score 1.0.
    pub fn wildcard() -> Self {
        Self::default()
    }

    /// Build a Descriptor from raw fields. Nothing is checked until `encode`.
    pub fn with_fields(flags: u8, fields: Vec<Field>) -> Self {
        Self { flags, fields }
    }

    pub fn version(&self) -> u8 {
        DESCRIPTOR_VERSION
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn is_wildcard(&self) -> bool {
        self.fields.is_empty()
    }

    /// Size of the encoded form, computed without allocating.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN
            + self
                .fields
                .iter()
                .map(|f| FIELD_HEADER_LEN + f.value_len())
                .sum::<usize>()
    }

    pub fn capabilities(&self) -> Option<u64> {
        self.fields.iter().find_map(|f| match f {
            Field::Capabilities(mask) => Some(*mask),
            _ => None,
        })
    }

    pub fn context_window(&self) -> Option<u32> {
        self.fields.iter().find_map(|f| match f {
            Field::ContextWindow(tokens) => Some(*tokens),
            _ => None,
        })
    }

    pub fn max_latency_us(&self) -> Option<u32> {
        self.fields.iter().find_map(|f| match f {
            Field::MaxLatency(us) => Some(*us),
            _ => None,
        })
    }

    pub fn max_cost_milli(&self) -> Option<u32> {
        self.fields.iter().find_map(|f| match f {
            Field::MaxCost(milli) => Some(*milli),
            _ => None,
        })
    }

    pub fn trust_floor(&self) -> Option<u8> {
        self.fields.iter().find_map(|f| match f {
            Field::TrustFloor(level) => Some(*level),
            _ => None,
        })
    }

    pub fn region_prefer(&self) -> Option<&[u16]> {
        self.fields.iter().find_map(|f| match f {
            Field::RegionPrefer(regions) => Some(regions.as_slice()),
            _ => None,
        })
    }

    pub fn region_exclude(&self) -> Option<&[u16]> {
        self.fields.iter().find_map(|f| match f {
            Field::RegionExclude(regions) => Some(regions.as_slice()),
            _ => None,
        })
    }

    pub fn architecture(&self) -> Option<ModelArchitecture> {
        self.fields.iter().find_map(|f| match f {
            Field::Architecture(arch) => Some(*arch),
            _ => None,
        })
    }
}

/// Fluent builder. Setting a field twice replaces the earlier value.
#[derive(Debug, Clone, Default)]
pub struct DescriptorBuilder {
    flags: u8,
    fields: Vec<Field>,
}

impl DescriptorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn capabilities(self, mask: u64) -> Self {
        self.set(Field::Capabilities(mask))
    }

    pub fn context_window(self, tokens: u32) -> Self {
        self.set(Field::ContextWindow(tokens))
    }

    pub fn max_latency_us(self, us: u32) -> Self {
        self.set(Field::MaxLatency(us))
    }

    pub fn max_cost_milli(self, milli: u32) -> Self {
        self.set(Field::MaxCost(milli))
    }

    pub fn trust_floor(self, level: u8) -> Self {
        self.set(Field::TrustFloor(level))
    }

    pub fn region_prefer(self, regions: Vec<u16>) -> Self {
        self.set(Field::RegionPrefer(regions))
    }

    pub fn region_exclude(self, regions: Vec<u16>) -> Self {
        self.set(Field::RegionExclude(regions))
    }

    /// Stores the canonical form, so `Other(1)` is recorded as `Transformer`.
    pub fn architecture(self, arch: ModelArchitecture) -> Self {
        self.set(Field::Architecture(arch.canonical()))
    }

    pub fn opaque(self, kind: u8, value: Vec<u8>) -> Self {
        self.set(Field::Opaque { kind, value })
    }

    fn set(mut self, field: Field) -> Self {
        let kind = field.kind();
        match self.fields.iter_mut().find(|f| f.kind() == kind) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    pub fn build(self) -> Descriptor {
        Descriptor::with_fields(self.flags, self.fields)
    }
}
