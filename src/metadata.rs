//! Metadata table: the file's `{track_type, created_at}` entries.
//!
//! `TrackType` is another closed, single-byte tag set, so it reuses the
//! same `modular_bitfield::BitfieldSpecifier` shape as `FieldType`
//! (spec.md §3, §4.5).

use std::io::{Cursor, Read, Write};

use declio::{Decode, Encode};
use modular_bitfield::BitfieldSpecifier;

use crate::constants;
use crate::crc;
use crate::impl_bitfield_specifier_codecs;
use crate::result::{Error, Result};
use crate::varint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, BitfieldSpecifier)]
#[bits = 8]
pub enum TrackType {
    Trip = 0x00,
    Route = 0x01,
    Segment = 0x02,
}

impl_bitfield_specifier_codecs!(TrackType);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataEntry {
    TrackType { kind: TrackType, id: u32 },
    CreatedAt(i64),
}

const KIND_TRACK_TYPE: u8 = 0x00;
const KIND_CREATED_AT: u8 = 0x01;

impl MetadataEntry {
    fn kind_tag(&self) -> u8 {
        match self {
            MetadataEntry::TrackType { .. } => KIND_TRACK_TYPE,
            MetadataEntry::CreatedAt(_) => KIND_CREATED_AT,
        }
    }

    fn write_body(&self, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            MetadataEntry::TrackType { kind, id } => {
                kind.encode(constants::ENDIANESS, buf)?;
                id.encode(constants::ENDIANESS, buf)?;
            }
            MetadataEntry::CreatedAt(seconds) => {
                seconds.encode(constants::ENDIANESS, buf)?;
            }
        }
        Ok(())
    }

    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        let mut body = Vec::new();
        self.write_body(&mut body)?;
        buf.push(self.kind_tag());
        (body.len() as u16).encode(constants::ENDIANESS, buf)?;
        buf.extend_from_slice(&body);
        Ok(())
    }

    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let mut kind_byte = [0u8; 1];
        reader.read_exact(&mut kind_byte).map_err(|_| Error::TruncatedInput)?;
        let size = u16::decode(constants::ENDIANESS, reader)?;
        let mut body = vec![0u8; size as usize];
        reader.read_exact(&mut body).map_err(|_| Error::TruncatedInput)?;
        let mut body = Cursor::new(body);

        match kind_byte[0] {
            KIND_TRACK_TYPE => {
                if size != 5 {
                    return Err(Error::BadMetadata(format!("track_type body must be 5 bytes, got {size}")));
                }
                let kind = TrackType::decode(constants::ENDIANESS, &mut body)?;
                let id = u32::decode(constants::ENDIANESS, &mut body)?;
                Ok(MetadataEntry::TrackType { kind, id })
            }
            KIND_CREATED_AT => {
                if size != 8 {
                    return Err(Error::BadMetadata(format!("created_at body must be 8 bytes, got {size}")));
                }
                let seconds = i64::decode(constants::ENDIANESS, &mut body)?;
                Ok(MetadataEntry::CreatedAt(seconds))
            }
            other => Err(Error::BadMetadata(format!("unknown metadata entry kind {other:#04x}"))),
        }
    }
}

/// Encodes the metadata table: LEB128 entry count, entries, CRC-16 over
/// the table body (count + entries).
pub(crate) fn encode_table<W: Write>(writer: &mut W, entries: &[MetadataEntry]) -> Result<()> {
    let mut body = Vec::new();
    varint::write_u64(&mut body, entries.len() as u64)?;
    for entry in entries {
        entry.encode(&mut body)?;
    }
    let check = crc::crc16(&body);
    writer.write_all(&body)?;
    writer.write_all(&check.to_le_bytes())?;
    Ok(())
}

/// Decodes the metadata table, verifying its CRC-16 first.
pub(crate) fn decode_table(buf: &[u8]) -> Result<(Vec<MetadataEntry>, usize)> {
    let mut cursor = Cursor::new(buf);
    let count = varint::read_u64(&mut cursor)? as usize;

    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        entries.push(MetadataEntry::decode(&mut cursor)?);
    }

    let body_len = cursor.position() as usize;
    let stored_crc_bytes = buf
        .get(body_len..body_len + 2)
        .ok_or(Error::TruncatedInput)?;
    let stored_crc = u16::from_le_bytes([stored_crc_bytes[0], stored_crc_bytes[1]]);
    let actual_crc = crc::crc16(&buf[..body_len]);
    if stored_crc != actual_crc {
        return Err(Error::CrcMismatch { region: "metadata" });
    }

    Ok((entries, body_len + 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_fixture() {
        let mut buf = Vec::new();
        encode_table(&mut buf, &[]).unwrap();
        assert_eq!(buf, vec![0x00, 0x40, 0xBF]);
    }

    #[test]
    fn roundtrip_mixed_entries() {
        let entries = vec![
            MetadataEntry::TrackType { kind: TrackType::Route, id: 42 },
            MetadataEntry::CreatedAt(1_700_000_000),
        ];
        let mut buf = Vec::new();
        encode_table(&mut buf, &entries).unwrap();
        let (decoded, consumed) = decode_table(&buf).unwrap();
        assert_eq!(decoded, entries);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn crc_mismatch_is_detected() {
        let mut buf = Vec::new();
        encode_table(&mut buf, &[MetadataEntry::CreatedAt(5)]).unwrap();
        *buf.last_mut().unwrap() ^= 0xFF;
        assert!(matches!(decode_table(&buf), Err(Error::CrcMismatch { region: "metadata" })));
    }
}
