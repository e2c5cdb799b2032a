//! Top-level file assembly/disassembly: header, metadata table, data
//! table, and the lazy, cached section reader (spec.md §4.5, §4.6, §5).

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use crate::constants;
use crate::crc;
use crate::header::{self, FileHeader};
use crate::metadata::{self, MetadataEntry};
use crate::result::{Error, Result};
use crate::schema::Schema;
use crate::section::{self, ParsedSection, Section, SectionEncoding};
use crate::value::Row;
use crate::varint;

/// Assembles a complete RWTF file from metadata and sections.
///
/// The wire-level `write_track` described in spec.md §6 has no
/// `creator_version` parameter even though the file header carries one;
/// this is filled in here as a leading argument (see `DESIGN.md`).
pub fn write_track(creator_version: u16, metadata: &[MetadataEntry], sections: &[Section]) -> Result<Vec<u8>> {
    let mut metadata_body = Vec::new();
    metadata::encode_table(&mut metadata_body, metadata)?;

    let metadata_table_offset = constants::HEADER_TOTAL_SIZE;
    let metadata_region_len = metadata_body.len();
    let data_offset_u64 = metadata_table_offset as u64 + metadata_region_len as u64;
    let data_offset = u16::try_from(data_offset_u64)
        .map_err(|_| Error::OutOfRange("header+metadata region exceeds 64 KiB".into()))?;

    let encoded_sections: Vec<section::EncodedSection> =
        sections.iter().map(section::encode).collect::<Result<_>>()?;

    let mut data_table_head = Vec::new();
    varint::write_u64(&mut data_table_head, encoded_sections.len() as u64)?;
    for encoded in &encoded_sections {
        section::write_header(&mut data_table_head, encoded)?;
    }
    let data_table_crc = crc::crc16(&data_table_head);

    let mut out = Vec::new();
    header::write_header(
        &mut out,
        &FileHeader { file_version: constants::FILE_VERSION, creator_version, metadata_table_offset, data_offset },
    )?;
    out.extend_from_slice(&metadata_body);
    out.extend_from_slice(&data_table_head);
    out.extend_from_slice(&data_table_crc.to_le_bytes());
    for encoded in &encoded_sections {
        out.extend_from_slice(&encoded.body);
    }

    Ok(out)
}

struct SectionEntry<'a> {
    encoding_tag: u8,
    rows: u64,
    schema: Schema,
    column_sizes: Vec<u64>,
    body: &'a [u8],
}

/// Borrows the source buffer; parses the header, metadata table, and
/// data-table section index eagerly, and decodes individual sections
/// lazily (and caches the result, per spec.md §4.6).
pub struct TrackReader<'a> {
    file_version: u16,
    creator_version: u16,
    metadata: Vec<MetadataEntry>,
    sections: Vec<SectionEntry<'a>>,
    cache: Mutex<HashMap<usize, Arc<ParsedSection>>>,
}

impl<'a> TrackReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        let header_region = bytes.get(..constants::HEADER_TOTAL_SIZE as usize).ok_or(Error::TruncatedInput)?;
        let file_header = header::read_header(&mut &header_region[..])?;

        let metadata_region = bytes
            .get(file_header.metadata_table_offset as usize..)
            .ok_or(Error::TruncatedInput)?;
        let (metadata, metadata_consumed) = metadata::decode_table(metadata_region)?;

        let expected_data_offset = file_header.metadata_table_offset as usize + metadata_consumed;
        if file_header.data_offset as usize != expected_data_offset {
            return Err(Error::BadSchema(format!(
                "data_offset {} does not match end of metadata region {expected_data_offset}",
                file_header.data_offset
            )));
        }

        let data_region = bytes.get(file_header.data_offset as usize..).ok_or(Error::TruncatedInput)?;
        let mut cursor = Cursor::new(data_region);
        let section_count = varint::read_u64(&mut cursor)? as usize;
        let mut headers = Vec::with_capacity(section_count);
        for _ in 0..section_count {
            headers.push(section::read_header(&mut cursor)?);
        }

        let header_region_len = cursor.position() as usize;
        let crc_bytes = data_region
            .get(header_region_len..header_region_len + 2)
            .ok_or(Error::TruncatedInput)?;
        let stored_crc = u16::from_le_bytes([crc_bytes[0], crc_bytes[1]]);
        if crc::crc16(&data_region[..header_region_len]) != stored_crc {
            return Err(Error::CrcMismatch { region: "data_table" });
        }

        let mut body_offset = header_region_len + 2;
        let mut sections = Vec::with_capacity(section_count);
        for h in headers {
            let size = h.data_size as usize;
            let body = data_region.get(body_offset..body_offset + size).ok_or(Error::TruncatedInput)?;
            sections.push(SectionEntry {
                encoding_tag: h.encoding_tag,
                rows: h.rows,
                schema: h.schema,
                column_sizes: h.column_sizes,
                body,
            });
            body_offset += size;
        }

        Ok(Self {
            file_version: file_header.file_version,
            creator_version: file_header.creator_version,
            metadata,
            sections,
            cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn file_version(&self) -> u16 {
        self.file_version
    }

    pub fn creator_version(&self) -> u16 {
        self.creator_version
    }

    pub fn metadata(&self) -> &[MetadataEntry] {
        &self.metadata
    }

    pub fn section_count(&self) -> u32 {
        self.sections.len() as u32
    }

    fn entry(&self, index: usize) -> Result<&SectionEntry<'a>> {
        self.sections.get(index).ok_or(Error::SectionIndex { index, len: self.sections.len() })
    }

    pub fn section_encoding(&self, index: usize) -> Result<SectionEncoding> {
        Ok(section::encoding_from_tag(self.entry(index)?.encoding_tag))
    }

    pub fn section_schema(&self, index: usize) -> Result<&Schema> {
        Ok(&self.entry(index)?.schema)
    }

    pub fn section_rows(&self, index: usize) -> Result<u32> {
        Ok(self.entry(index)?.rows as u32)
    }

    fn parsed(&self, index: usize, key: Option<&[u8]>) -> Result<Arc<ParsedSection>> {
        if let Some(cached) = self.cache.lock().unwrap().get(&index) {
            return Ok(Arc::clone(cached));
        }

        let entry = self.entry(index)?;
        let parsed = if entry.encoding_tag == section::ENCODING_ENCRYPTED {
            let key = key.ok_or(Error::DecryptFail)?;
            section::parse_encrypted_body(&entry.schema, entry.rows as usize, &entry.column_sizes, entry.body, key)?
        } else {
            section::parse_standard_body(&entry.schema, entry.rows as usize, &entry.column_sizes, entry.body)?
        };

        let parsed = Arc::new(parsed);
        self.cache.lock().unwrap().insert(index, Arc::clone(&parsed));
        Ok(parsed)
    }

    pub fn section_data(
        &self,
        index: usize,
        key: Option<&[u8]>,
        projection_schema: Option<&Schema>,
    ) -> Result<Vec<Row>> {
        let entry = self.entry(index)?;
        let parsed = self.parsed(index, key)?;
        let mut rows = section::rebuild_rows(&entry.schema, &parsed);

        if let Some(projection) = projection_schema {
            for field in entry.schema.fields() {
                let name = String::from_utf8_lossy(&field.name).into_owned();
                if let Some(p) = projection.fields().iter().find(|p| p.name == field.name) {
                    if p.field_type != field.field_type {
                        for row in &mut rows {
                            row.remove(&name);
                        }
                    }
                }
            }
        }

        Ok(rows)
    }

    pub fn section_column(
        &self,
        index: usize,
        name: &[u8],
        key: Option<&[u8]>,
    ) -> Result<Option<Vec<Option<crate::value::Value>>>> {
        let entry = self.entry(index)?;
        let parsed = self.parsed(index, key)?;
        Ok(section::column_values(&entry.schema, &parsed, name, None))
    }
}
