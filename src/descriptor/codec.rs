//! Binary wire format for Descriptors.
//!
//! Format: `[version:u8][flags:u8][field_count:u16-be]` followed by
//! `field_count` entries of `[type:u8][length:u16-be][value]`.
//!
//! # Security
//! - Bytes come from untrusted frames; every length is bounds-checked
//! - `field_count` is capped before anything is allocated
//! - Known field types must carry exactly the length the encoder writes

use super::error::DescriptorError;
use super::field::{Field, FieldKind};
use super::Descriptor;

/// Only supported wire version.
pub const DESCRIPTOR_VERSION: u8 = 1;

/// Fixed header: version, flags, field count.
pub const HEADER_LEN: usize = 4;

/// Per-field header: type, length.
pub const FIELD_HEADER_LEN: usize = 3;

/// Hard cap on fields per Descriptor.
pub const MAX_FIELDS: usize = 16;

/// Hard cap on total encoded size.
pub const MAX_DESCRIPTOR_SIZE: usize = 512;

struct Header {
    flags: u8,
    field_count: usize,
}

fn read_header(bytes: &[u8]) -> Result<Header, DescriptorError> {
    if bytes.len() < HEADER_LEN {
        return Err(DescriptorError::BufferTooSmall {
            needed: HEADER_LEN,
            actual: bytes.len(),
        });
    }
    if bytes.len() > MAX_DESCRIPTOR_SIZE {
        return Err(DescriptorError::TooLarge {
            size: bytes.len(),
            max: MAX_DESCRIPTOR_SIZE,
        });
    }
    if bytes[0] != DESCRIPTOR_VERSION {
        return Err(DescriptorError::UnsupportedVersion(bytes[0]));
    }

    let field_count = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
    if field_count > MAX_FIELDS {
        return Err(DescriptorError::TooManyFields {
            count: field_count,
            max: MAX_FIELDS,
        });
    }

    let min_len = HEADER_LEN + field_count * FIELD_HEADER_LEN;
    if min_len > bytes.len() {
        return Err(DescriptorError::BufferTooSmall {
            needed: min_len,
            actual: bytes.len(),
        });
    }

    Ok(Header {
        flags: bytes[1],
        field_count,
    })
}

/// Walk every field, checking structure, and hand each `(type, value)` to `visit`.
fn walk_fields<F>(bytes: &[u8], field_count: usize, mut visit: F) -> Result<(), DescriptorError>
where
    F: FnMut(u8, &[u8]) -> Result<(), DescriptorError>,
{
    let mut offset = HEADER_LEN;
    // Bit per known field type, for duplicate detection without allocating.
    let mut seen: u32 = 0;

    for index in 0..field_count {
        let header_end = offset + FIELD_HEADER_LEN;
        if header_end > bytes.len() {
            return Err(DescriptorError::BufferTooSmall {
                needed: header_end,
                actual: bytes.len(),
            });
        }
        let kind = bytes[offset];
        let len = u16::from_be_bytes([bytes[offset + 1], bytes[offset + 2]]) as usize;
        let value_end = header_end + len;
        if value_end > bytes.len() {
            return Err(DescriptorError::BufferTooSmall {
                needed: value_end,
                actual: bytes.len(),
            });
        }

        if let Some(known) = FieldKind::from_wire(kind) {
            known.check_len(len)?;
            let bit = 1u32 << kind;
            if seen & bit != 0 {
                return Err(DescriptorError::Malformed(format!(
                    "field {} repeats type {:?}",
                    index, known
                )));
            }
            seen |= bit;
        }

        visit(kind, &bytes[header_end..value_end])?;
        offset = value_end;
    }

    if offset != bytes.len() {
        return Err(DescriptorError::Malformed(format!(
            "{} trailing bytes after last field",
            bytes.len() - offset
        )));
    }
    Ok(())
}

/// Check structural well-formedness without building a Descriptor.
pub fn validate(bytes: &[u8]) -> Result<(), DescriptorError> {
    let header = read_header(bytes)?;
    walk_fields(bytes, header.field_count, |_, _| Ok(()))
}

/// Decode a Descriptor from untrusted bytes.
pub fn decode(bytes: &[u8]) -> Result<Descriptor, DescriptorError> {
    let header = read_header(bytes)?;
    let mut fields = Vec::with_capacity(header.field_count);
    walk_fields(bytes, header.field_count, |kind, value| {
        fields.push(Field::read_value(kind, value)?);
        Ok(())
    })?;
    Ok(Descriptor::with_fields(header.flags, fields))
}

/// Encode a Descriptor, refusing to emit anything `decode` would reject.
pub fn encode(descriptor: &Descriptor) -> Result<Vec<u8>, DescriptorError> {
    let fields = descriptor.fields();
    if fields.len() > MAX_FIELDS {
        return Err(DescriptorError::TooManyFields {
            count: fields.len(),
            max: MAX_FIELDS,
        });
    }

    let mut seen: u32 = 0;
    for field in fields {
        field.check_encodable()?;
        if FieldKind::from_wire(field.kind()).is_some() {
            let bit = 1u32 << field.kind();
            if seen & bit != 0 {
                return Err(DescriptorError::Malformed(format!(
                    "duplicate field type 0x{:02x}",
                    field.kind()
                )));
            }
            seen |= bit;
        }
    }

    let size = descriptor.encoded_len();
    if size > MAX_DESCRIPTOR_SIZE {
        return Err(DescriptorError::TooLarge {
            size,
            max: MAX_DESCRIPTOR_SIZE,
        });
    }

    let mut buf = Vec::with_capacity(size);
    buf.push(DESCRIPTOR_VERSION);
    buf.push(descriptor.flags());
    buf.extend_from_slice(&(fields.len() as u16).to_be_bytes());
    for field in fields {
        buf.push(field.kind());
        buf.extend_from_slice(&(field.value_len() as u16).to_be_bytes());
        field.write_value(&mut buf);
    }
    Ok(buf)
}
