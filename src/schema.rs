//! Field types and the ordered schema that gives columns their wire order.
//!
//! `FieldType` is a closed, sparse tag set decoded from a single byte —
//! the same shape as the teacher's `PdbVersion`/`PdbFeature` enums, so it
//! reuses `modular_bitfield::BitfieldSpecifier` for the bit-packed
//! representation. Unlike `TrackType` (metadata.rs), it never round-trips
//! through `declio` directly: the section-header TLV reads/writes it via
//! the hand-rolled `field_type_tag`/`field_type_from_tag` below so an
//! unrecognized tag surfaces `BadSchema` instead of a generic codec error,
//! so it has no `impl_bitfield_specifier_codecs!` wiring.

use modular_bitfield::BitfieldSpecifier;

use crate::constants;
use crate::result::{Error, Result};

/// v2 wire tags. F64 additionally carries a scale byte; all other types
/// carry no parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BitfieldSpecifier)]
#[bits = 8]
pub enum FieldType {
    I64 = 0x00,
    F64 = 0x01,
    U64 = 0x02,
    Bool = 0x10,
    String = 0x20,
    BoolArray = 0x21,
    U64Array = 0x22,
    ByteArray = 0x23,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub name: Vec<u8>,
    pub field_type: FieldType,
    /// Only meaningful (and only present) for `FieldType::F64`.
    pub scale: Option<u8>,
}

impl SchemaField {
    pub fn new(name: impl Into<Vec<u8>>, field_type: FieldType) -> Result<Self> {
        if field_type == FieldType::F64 {
            return Err(Error::BadSchema("F64 field requires a scale".into()));
        }
        Ok(Self { name: name.into(), field_type, scale: None })
    }

    /// `scale` is taken as `u32` (rather than the on-wire `u8`) so that
    /// out-of-range values like `500` can be rejected here instead of
    /// merely failing to fit the narrower wire type at the call site.
    pub fn new_f64(name: impl Into<Vec<u8>>, scale: u32) -> Result<Self> {
        if scale > constants::MAX_F64_SCALE as u32 {
            return Err(Error::BadSchema(format!(
                "F64 scale {scale} exceeds maximum {}",
                constants::MAX_F64_SCALE
            )));
        }
        Ok(Self { name: name.into(), field_type: FieldType::F64, scale: Some(scale as u8) })
    }
}

/// Ordered sequence of fields; order is significant and defines column
/// order on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<SchemaField>,
}

impl Schema {
    pub fn new(fields: Vec<SchemaField>) -> Result<Self> {
        for field in &fields {
            if field.field_type == FieldType::F64 && field.scale.is_none() {
                return Err(Error::BadSchema("F64 field is missing its scale".into()));
            }
            if let Some(scale) = field.scale {
                if field.field_type != FieldType::F64 {
                    return Err(Error::BadSchema("scale is only valid for F64 fields".into()));
                }
                if scale > constants::MAX_F64_SCALE {
                    return Err(Error::BadSchema(format!(
                        "F64 scale {scale} exceeds maximum {}",
                        constants::MAX_F64_SCALE
                    )));
                }
            }
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn position_of(&self, name: &[u8]) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// `schema_version` byte currently written/accepted.
pub(crate) const SCHEMA_VERSION: u8 = 0;

/// Raw-byte tag lookup used by the section-header TLV, which needs a
/// `BadSchema` (not a generic codec error) on an unrecognized tag.
pub(crate) fn field_type_from_tag(tag: u8) -> Result<FieldType> {
    use modular_bitfield::Specifier;
    FieldType::from_bytes(tag).map_err(|_| Error::BadSchema(format!("unknown field type tag {tag:#04x}")))
}

pub(crate) fn field_type_tag(ty: FieldType) -> u8 {
    use modular_bitfield::Specifier;
    ty.into_bytes().expect("FieldType::into_bytes is infallible for a closed enum")
}
