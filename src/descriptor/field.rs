//! Typed Descriptor fields and their wire identifiers.

use super::error::DescriptorError;

/// Maximum number of region codes carried by one region list.
pub const MAX_REGIONS: usize = 8;

/// Wire type identifiers for well-known fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldKind {
    Capabilities = 0x01,
    ContextWindow = 0x02,
    MaxLatency = 0x03,
    MaxCost = 0x04,
    TrustFloor = 0x05,
    RegionPrefer = 0x06,
    RegionExclude = 0x07,
    Architecture = 0x08,
}

impl FieldKind {
    /// Map a wire type byte to a known kind; unknown bytes yield `None`.
    pub fn from_wire(kind: u8) -> Option<Self> {
        match kind {
            0x01 => Some(Self::Capabilities),
            0x02 => Some(Self::ContextWindow),
            0x03 => Some(Self::MaxLatency),
            0x04 => Some(Self::MaxCost),
            0x05 => Some(Self::TrustFloor),
            0x06 => Some(Self::RegionPrefer),
            0x07 => Some(Self::RegionExclude),
            0x08 => Some(Self::Architecture),
            _ => None,
        }
    }

    /// Check a declared value length against what the encoder produces.
    pub fn check_len(self, len: usize) -> Result<(), DescriptorError> {
        let ok = match self {
            Self::Capabilities => len == 8,
            Self::ContextWindow | Self::MaxLatency | Self::MaxCost => len == 4,
            Self::TrustFloor | Self::Architecture => len == 1,
            Self::RegionPrefer | Self::RegionExclude => {
                len >= 2 && len <= MAX_REGIONS * 2 && len % 2 == 0
            }
        };
        if ok {
            Ok(())
        } else {
            Err(DescriptorError::Malformed(format!(
                "field {:?} has length {}",
                self, len
            )))
        }
    }
}

/// Model architecture family advertised or requested by a Descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelArchitecture {
    Transformer,
    MixtureOfExperts,
    StateSpace,
    Diffusion,
    Embedding,
    /// Tag not known to this build; preserved verbatim.
    Other(u8),
}

impl ModelArchitecture {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            1 => Self::Transformer,
            2 => Self::MixtureOfExperts,
            3 => Self::StateSpace,
            4 => Self::Diffusion,
            5 => Self::Embedding,
            other => Self::Other(other),
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            Self::Transformer => 1,
            Self::MixtureOfExperts => 2,
            Self::StateSpace => 3,
            Self::Diffusion => 4,
            Self::Embedding => 5,
            Self::Other(tag) => tag,
        }
    }

    /// The variant `from_tag` yields for this value's tag.
    ///
    /// `Other(1)` through `Other(5)` share a wire byte with a named variant
    /// and collapse onto it.
    pub fn canonical(self) -> Self {
        Self::from_tag(self.tag())
    }

    pub fn is_canonical(self) -> bool {
        self.canonical() == self
    }
}

/// A single Descriptor field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// Capability bitmask.
    Capabilities(u64),
    /// Context window size in tokens.
    ContextWindow(u32),
    /// Latency bound in microseconds.
    MaxLatency(u32),
    /// Cost bound in milli-units.
    MaxCost(u32),
    TrustFloor(u8),
    RegionPrefer(Vec<u16>),
    RegionExclude(Vec<u16>),
    Architecture(ModelArchitecture),
    /// Field type unknown to this build, carried through untouched.
    Opaque { kind: u8, value: Vec<u8> },
}

impl Field {
    /// Wire type byte.
    pub fn kind(&self) -> u8 {
        match self {
            Self::Capabilities(_) => FieldKind::Capabilities as u8,
            Self::ContextWindow(_) => FieldKind::ContextWindow as u8,
            Self::MaxLatency(_) => FieldKind::MaxLatency as u8,
            Self::MaxCost(_) => FieldKind::MaxCost as u8,
            Self::TrustFloor(_) => FieldKind::TrustFloor as u8,
            Self::RegionPrefer(_) => FieldKind::RegionPrefer as u8,
            Self::RegionExclude(_) => FieldKind::RegionExclude as u8,
            Self::Architecture(_) => FieldKind::Architecture as u8,
            Self::Opaque { kind, .. } => *kind,
        }
    }

    /// Encoded value length, excluding the 3-byte field header.
    pub fn value_len(&self) -> usize {
        match self {
            Self::Capabilities(_) => 8,
            Self::ContextWindow(_) | Self::MaxLatency(_) | Self::MaxCost(_) => 4,
            Self::TrustFloor(_) | Self::Architecture(_) => 1,
            Self::RegionPrefer(regions) | Self::RegionExclude(regions) => regions.len() * 2,
            Self::Opaque { value, .. } => value.len(),
        }
    }

    pub(crate) fn write_value(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Capabilities(mask) => buf.extend_from_slice(&mask.to_be_bytes()),
            Self::ContextWindow(v) | Self::MaxLatency(v) | Self::MaxCost(v) => {
                buf.extend_from_slice(&v.to_be_bytes())
            }
            Self::TrustFloor(level) => buf.push(*level),
            Self::Architecture(arch) => buf.push(arch.tag()),
            Self::RegionPrefer(regions) | Self::RegionExclude(regions) => {
                for region in regions {
                    buf.extend_from_slice(&region.to_be_bytes());
                }
            }
            Self::Opaque { value, .. } => buf.extend_from_slice(value),
        }
    }

    /// Parse a field value whose length has already been validated.
    pub(crate) fn read_value(kind: u8, value: &[u8]) -> Result<Self, DescriptorError> {
        let Some(known) = FieldKind::from_wire(kind) else {
            return Ok(Self::Opaque {
                kind,
                value: value.to_vec(),
            });
        };
        known.check_len(value.len())?;

        let field = match known {
            FieldKind::Capabilities => Self::Capabilities(u64::from_be_bytes(fixed(value)?)),
            FieldKind::ContextWindow => Self::ContextWindow(u32::from_be_bytes(fixed(value)?)),
            FieldKind::MaxLatency => Self::MaxLatency(u32::from_be_bytes(fixed(value)?)),
            FieldKind::MaxCost => Self::MaxCost(u32::from_be_bytes(fixed(value)?)),
            FieldKind::TrustFloor => Self::TrustFloor(value[0]),
            FieldKind::Architecture => Self::Architecture(ModelArchitecture::from_tag(value[0])),
            FieldKind::RegionPrefer => Self::RegionPrefer(read_regions(value)),
            FieldKind::RegionExclude => Self::RegionExclude(read_regions(value)),
        };
        Ok(field)
    }

    /// Check that the field can be encoded into something the decoder accepts.
    pub(crate) fn check_encodable(&self) -> Result<(), DescriptorError> {
        match self {
            Self::Opaque { kind, value } => {
                if FieldKind::from_wire(*kind).is_some() {
                    return Err(DescriptorError::Malformed(format!(
                        "opaque field uses reserved type 0x{:02x}",
                        kind
                    )));
                }
                if value.len() > u16::MAX as usize {
                    return Err(DescriptorError::Malformed("opaque field too long".into()));
                }
                Ok(())
            }
            Self::Architecture(arch) if !arch.is_canonical() => Err(DescriptorError::Malformed(
                format!("architecture {:?} shadows tag {}", arch, arch.tag()),
            )),
            other => match FieldKind::from_wire(other.kind()) {
                Some(known) => known.check_len(other.value_len()),
                None => Ok(()),
            },
        }
    }
}

fn fixed<const N: usize>(value: &[u8]) -> Result<[u8; N], DescriptorError> {
    value
        .try_into()
        .map_err(|_| DescriptorError::Malformed(format!("expected {} value bytes", N)))
}

fn read_regions(value: &[u8]) -> Vec<u16> {
    value
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}
