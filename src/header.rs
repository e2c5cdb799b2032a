//! Fixed 22-byte file header plus its trailing CRC-16 (spec.md §4.5). The
//! magic is checked by hand rather than through declio's `magic_bytes!`
//! (used elsewhere in this crate, e.g. the teacher's MSF superblock) so a
//! mismatch surfaces as the taxonomy's own `BadMagic`, not a generic
//! encoding error.

use std::io::{Read, Write};

use crate::constants;
use crate::crc;
use crate::result::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub file_version: u16,
    pub creator_version: u16,
    pub metadata_table_offset: u16,
    pub data_offset: u16,
}

pub(crate) fn write_header<W: Write>(writer: &mut W, header: &FileHeader) -> Result<()> {
    let mut body = Vec::with_capacity(constants::HEADER_BODY_SIZE as usize);
    body.extend_from_slice(constants::MAGIC);
    body.extend_from_slice(&header.file_version.to_le_bytes());
    body.extend_from_slice(&0u16.to_le_bytes()); // reserved_fv
    body.extend_from_slice(&header.creator_version.to_le_bytes());
    body.extend_from_slice(&0u16.to_le_bytes()); // reserved_cv
    body.extend_from_slice(&header.metadata_table_offset.to_le_bytes());
    body.extend_from_slice(&header.data_offset.to_le_bytes());
    body.extend_from_slice(&0u16.to_le_bytes()); // reserved_e
    debug_assert_eq!(body.len(), constants::HEADER_BODY_SIZE as usize);

    writer.write_all(&body)?;
    writer.write_all(&crc::crc16(&body).to_le_bytes())?;
    Ok(())
}

pub(crate) fn read_header<R: Read>(reader: &mut R) -> Result<FileHeader> {
    let mut body = vec![0u8; constants::HEADER_TOTAL_SIZE as usize];
    reader.read_exact(&mut body).map_err(|_| Error::TruncatedInput)?;

    let (body, crc_bytes) = body.split_at(constants::HEADER_BODY_SIZE as usize);
    let stored_crc = u16::from_le_bytes([crc_bytes[0], crc_bytes[1]]);
    if crc::crc16(body) != stored_crc {
        return Err(Error::CrcMismatch { region: "header" });
    }

    if &body[0..8] != constants::MAGIC {
        return Err(Error::BadMagic);
    }

    let file_version = u16::from_le_bytes([body[8], body[9]]);
    if file_version != constants::FILE_VERSION {
        return Err(Error::BadVersion(file_version));
    }
    let creator_version = u16::from_le_bytes([body[12], body[13]]);
    let metadata_table_offset = u16::from_le_bytes([body[16], body[17]]);
    let data_offset = u16::from_le_bytes([body[18], body[19]]);

    if metadata_table_offset != constants::HEADER_TOTAL_SIZE {
        return Err(Error::BadSchema(format!(
            "metadata_table_offset must equal {}, got {metadata_table_offset}",
            constants::HEADER_TOTAL_SIZE
        )));
    }

    Ok(FileHeader { file_version, creator_version, metadata_table_offset, data_offset })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let header = FileHeader {
            file_version: constants::FILE_VERSION,
            creator_version: 7,
            metadata_table_offset: constants::HEADER_TOTAL_SIZE,
            data_offset: constants::HEADER_TOTAL_SIZE + 3,
        };
        let mut buf = Vec::new();
        write_header(&mut buf, &header).unwrap();
        assert_eq!(buf.len(), constants::HEADER_TOTAL_SIZE as usize);
        assert_eq!(read_header(&mut &buf[..]).unwrap(), header);
    }

    #[test]
    fn bad_magic_is_detected() {
        let header = FileHeader {
            file_version: constants::FILE_VERSION,
            creator_version: 0,
            metadata_table_offset: constants::HEADER_TOTAL_SIZE,
            data_offset: constants::HEADER_TOTAL_SIZE,
        };
        let mut buf = Vec::new();
        write_header(&mut buf, &header).unwrap();
        buf[0] ^= 0xFF;
        // corrupting the magic also flips the CRC verdict first.
        assert!(matches!(read_header(&mut &buf[..]), Err(Error::CrcMismatch { region: "header" })));
    }
}
