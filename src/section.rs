//! Section engine: row↔column transposition, schema trimming, presence
//! bitmap, per-column CRC-32 framing, and the standard/encrypted wire
//! variants (spec.md §4.3, §4.4).

use std::io::{Cursor, Read, Write};

use secrecy::SecretBox;

use crate::bitmap::PresenceBitmap;
use crate::constants;
use crate::crc;
use crate::crypto;
use crate::field_codec;
use crate::result::{Error, Result};
use crate::schema::{FieldType, Schema, SchemaField};
use crate::value::{coerce, Coerced, Row, Value};
use crate::varint;

pub(crate) const ENCODING_STANDARD: u8 = 0;
pub(crate) const ENCODING_ENCRYPTED: u8 = 1;

/// The host-facing view of a stored section's encoding (spec.md §6
/// `reader.section_encoding(i)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionEncoding {
    Standard,
    Encrypted,
}

pub(crate) fn encoding_from_tag(tag: u8) -> SectionEncoding {
    if tag == ENCODING_ENCRYPTED {
        SectionEncoding::Encrypted
    } else {
        SectionEncoding::Standard
    }
}

enum SectionKind {
    Standard,
    Encrypted(SecretBox<[u8; constants::AEAD_KEY_SIZE]>),
}

/// A write-side section: the schema and rows a caller wants persisted,
/// plus how to encode it.
pub struct Section {
    kind: SectionKind,
    schema: Schema,
    rows: Vec<Row>,
}

impl Section {
    pub fn standard(schema: Schema, rows: Vec<Row>) -> Self {
        Self { kind: SectionKind::Standard, schema, rows }
    }

    /// `key` must be exactly [`constants::AEAD_KEY_SIZE`] bytes; any other
    /// length is a fatal error (spec.md §4.4).
    pub fn encrypted(schema: Schema, rows: Vec<Row>, key: &[u8]) -> Result<Self> {
        let key = crypto::load_key(key)?;
        Ok(Self { kind: SectionKind::Encrypted(key), schema, rows })
    }
}

/// One already-coerced field column, still addressed by the original
/// (pre-trim) schema position.
struct BuiltColumn {
    field: SchemaField,
    present: Vec<Coerced>,
}

fn build_columns(schema: &Schema, rows: &[Row]) -> Vec<Option<BuiltColumn>> {
    schema
        .fields()
        .iter()
        .map(|field| {
            let name = String::from_utf8_lossy(&field.name).into_owned();
            let mut present = Vec::new();
            let mut any_present = false;
            for row in rows {
                match row.get(&name) {
                    Some(Value::Null) | None => {}
                    Some(value) => match coerce(value, field.field_type, field.scale) {
                        Some(c) => {
                            present.push(c);
                            any_present = true;
                        }
                        None => {
                            tracing::debug!(field = %name, "dropping value that cannot coerce to declared type");
                        }
                    },
                }
            }
            if any_present {
                Some(BuiltColumn { field: field.clone(), present })
            } else {
                tracing::trace!(field = %name, "trimming all-absent field from persisted schema");
                None
            }
        })
        .collect()
}

fn presence_bitmap(schema: &Schema, rows: &[Row], trimmed: &Schema) -> Result<PresenceBitmap> {
    let mut bitmap = PresenceBitmap::new(rows.len(), trimmed.len());
    for (r, row) in rows.iter().enumerate() {
        for (f, field) in trimmed.fields().iter().enumerate() {
            let name = String::from_utf8_lossy(&field.name).into_owned();
            let present = match row.get(&name) {
                Some(Value::Null) | None => false,
                Some(value) => coerce(value, field.field_type, field.scale).is_some(),
            };
            if present {
                bitmap.set(r, f);
            }
        }
    }
    Ok(bitmap)
}

fn encode_column(field_type: FieldType, values: &[Coerced]) -> Result<Vec<u8>> {
    match field_type {
        FieldType::I64 => {
            let xs: Vec<i64> = values.iter().map(|c| match c { Coerced::I64(v) => *v, _ => unreachable!() }).collect();
            field_codec::encode_i64(&xs)
        }
        FieldType::U64 => {
            let xs: Vec<u64> = values.iter().map(|c| match c { Coerced::U64(v) => *v, _ => unreachable!() }).collect();
            field_codec::encode_u64(&xs)
        }
        FieldType::F64 => {
            let xs: Vec<i64> = values.iter().map(|c| match c { Coerced::F64Scaled(v) => *v, _ => unreachable!() }).collect();
            field_codec::encode_f64_scaled(&xs)
        }
        FieldType::Bool => {
            let xs: Vec<bool> = values.iter().map(|c| match c { Coerced::Bool(v) => *v, _ => unreachable!() }).collect();
            field_codec::encode_bool(&xs)
        }
        FieldType::String | FieldType::ByteArray => {
            let xs: Vec<Vec<u8>> = values.iter().map(|c| match c { Coerced::Bytes(v) => v.clone(), _ => unreachable!() }).collect();
            field_codec::encode_bytes(&xs)
        }
        FieldType::BoolArray => {
            let xs: Vec<Vec<bool>> = values.iter().map(|c| match c { Coerced::BoolArray(v) => v.clone(), _ => unreachable!() }).collect();
            field_codec::encode_bool_array(&xs)
        }
        FieldType::U64Array => {
            let xs: Vec<Vec<u64>> = values.iter().map(|c| match c { Coerced::U64Array(v) => v.clone(), _ => unreachable!() }).collect();
            field_codec::encode_u64_array(&xs)
        }
    }
}

fn frame(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(bytes);
    buf.extend_from_slice(&crc::crc32(bytes).to_le_bytes());
}

/// The encoded, ready-to-place form of one section: the wire fields a
/// section header needs plus the already-framed (and, if requested,
/// AEAD-sealed) body.
pub(crate) struct EncodedSection {
    pub encoding_tag: u8,
    pub rows: u64,
    pub schema: Schema,
    pub column_sizes: Vec<u64>,
    pub body: Vec<u8>,
}

pub(crate) fn encode(section: &Section) -> Result<EncodedSection> {
    let built = build_columns(&section.schema, &section.rows);
    let trimmed_fields: Vec<SchemaField> = built.iter().flatten().map(|c| c.field.clone()).collect();
    let trimmed = Schema::new(trimmed_fields)?;

    let bitmap = presence_bitmap(&section.schema, &section.rows, &trimmed)?;

    let mut plaintext = Vec::new();
    frame(&mut plaintext, bitmap.as_bytes());

    let mut column_sizes = Vec::with_capacity(trimmed.len());
    for column in built.into_iter().flatten() {
        let bytes = encode_column(column.field.field_type, &column.present)?;
        column_sizes.push(bytes.len() as u64);
        frame(&mut plaintext, &bytes);
    }

    let (encoding_tag, body) = match &section.kind {
        SectionKind::Standard => (ENCODING_STANDARD, plaintext),
        SectionKind::Encrypted(key) => (ENCODING_ENCRYPTED, crypto::seal(key, &plaintext)?),
    };

    Ok(EncodedSection {
        encoding_tag,
        rows: section.rows.len() as u64,
        schema: trimmed,
        column_sizes,
        body,
    })
}

pub(crate) fn write_header<W: Write>(writer: &mut W, encoded: &EncodedSection) -> Result<()> {
    writer.write_all(&[encoded.encoding_tag])?;
    varint::write_u64(writer, encoded.rows)?;
    varint::write_u64(writer, encoded.body.len() as u64)?;

    writer.write_all(&[crate::schema::SCHEMA_VERSION])?;
    varint::write_u64(writer, encoded.schema.len() as u64)?;
    for (field, &column_size) in encoded.schema.fields().iter().zip(&encoded.column_sizes) {
        writer.write_all(&[crate::schema::field_type_tag(field.field_type)])?;
        if let Some(scale) = field.scale {
            writer.write_all(&[scale])?;
        }
        varint::write_len_bytes(writer, &field.name)?;
        varint::write_u64(writer, column_size)?;
    }
    Ok(())
}

pub(crate) struct SectionHeader {
    pub encoding_tag: u8,
    pub rows: u64,
    pub data_size: u64,
    pub schema: Schema,
    pub column_sizes: Vec<u64>,
}

pub(crate) fn read_header<R: Read>(reader: &mut R) -> Result<SectionHeader> {
    let mut encoding_tag = [0u8; 1];
    reader.read_exact(&mut encoding_tag).map_err(|_| Error::TruncatedInput)?;
    if encoding_tag[0] != ENCODING_STANDARD && encoding_tag[0] != ENCODING_ENCRYPTED {
        return Err(Error::BadSchema(format!("unknown section encoding tag {:#04x}", encoding_tag[0])));
    }

    let rows = varint::read_u64(reader)?;
    let data_size = varint::read_u64(reader)?;

    let mut version = [0u8; 1];
    reader.read_exact(&mut version).map_err(|_| Error::TruncatedInput)?;
    if version[0] != crate::schema::SCHEMA_VERSION {
        return Err(Error::BadSchema(format!("unknown schema_version {}", version[0])));
    }

    let field_count = varint::read_u64(reader)? as usize;
    let mut fields = Vec::with_capacity(field_count);
    let mut column_sizes = Vec::with_capacity(field_count);
    for _ in 0..field_count {
        let mut tag = [0u8; 1];
        reader.read_exact(&mut tag).map_err(|_| Error::TruncatedInput)?;
        let field_type = crate::schema::field_type_from_tag(tag[0])?;

        let scale = if field_type == FieldType::F64 {
            let mut s = [0u8; 1];
            reader.read_exact(&mut s).map_err(|_| Error::TruncatedInput)?;
            Some(s[0])
        } else {
            None
        };

        let name = varint::read_len_bytes(reader)?;
        let field = match scale {
            Some(s) => SchemaField::new_f64(name, s as u32)?,
            None => SchemaField::new(name, field_type)?,
        };
        fields.push(field);
        column_sizes.push(varint::read_u64(reader)?);
    }

    Ok(SectionHeader {
        encoding_tag: encoding_tag[0],
        rows,
        data_size,
        schema: Schema::new(fields)?,
        column_sizes,
    })
}

/// A decoded section: present-only column values, aligned with the
/// trimmed schema, plus the presence bitmap needed to rebuild rows.
pub(crate) struct ParsedSection {
    presence: PresenceBitmap,
    columns: Vec<Vec<Value>>,
}

fn decode_column(field_type: FieldType, scale: Option<u8>, bytes: &[u8], count: usize) -> Result<Vec<Value>> {
    let mut cursor = Cursor::new(bytes);
    let values = match field_type {
        FieldType::I64 => field_codec::decode_i64(&mut cursor, count)?.into_iter().map(Value::I64).collect(),
        FieldType::U64 => field_codec::decode_u64(&mut cursor, count)?.into_iter().map(Value::U64).collect(),
        FieldType::F64 => {
            let scale = scale.unwrap_or(0);
            let factor = 10f64.powi(-(scale as i32));
            field_codec::decode_f64_scaled(&mut cursor, count)?
                .into_iter()
                .map(|q| Value::F64(q as f64 * factor))
                .collect()
        }
        FieldType::Bool => field_codec::decode_bool(&mut cursor, count)?.into_iter().map(Value::Bool).collect(),
        FieldType::String => field_codec::decode_bytes(&mut cursor, count)?
            .into_iter()
            .map(|b| match String::from_utf8(b) {
                Ok(s) => Value::String(s),
                Err(e) => Value::Bytes(e.into_bytes()),
            })
            .collect(),
        FieldType::ByteArray => field_codec::decode_bytes(&mut cursor, count)?.into_iter().map(Value::Bytes).collect(),
        FieldType::BoolArray => field_codec::decode_bool_array(&mut cursor, count)?.into_iter().map(Value::BoolArray).collect(),
        FieldType::U64Array => field_codec::decode_u64_array(&mut cursor, count)?.into_iter().map(Value::U64Array).collect(),
    };
    if cursor.position() as usize != bytes.len() {
        return Err(Error::BadSchema("column body has trailing bytes after decode".into()));
    }
    Ok(values)
}

fn verify_and_strip_crc(bytes: &[u8], region: &'static str) -> Result<&[u8]> {
    if bytes.len() < 4 {
        return Err(Error::TruncatedInput);
    }
    let (body, crc_bytes) = bytes.split_at(bytes.len() - 4);
    let stored = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
    if crc::crc32(body) != stored {
        return Err(Error::CrcMismatch { region });
    }
    Ok(body)
}

/// Parses a standard (unencrypted) section body: presence bitmap followed
/// by one CRC-framed column per schema field.
pub(crate) fn parse_standard_body(schema: &Schema, rows: usize, column_sizes: &[u64], body: &[u8]) -> Result<ParsedSection> {
    let row_bytes = crate::utils::div_ceil(schema.len() as u32, 8) as usize;
    let presence_len = rows * row_bytes;

    let framed_presence_len = presence_len + 4;
    if body.len() < framed_presence_len {
        return Err(Error::TruncatedInput);
    }
    let presence_bytes = verify_and_strip_crc(&body[..framed_presence_len], "presence")?;
    let presence = PresenceBitmap::from_bytes(rows, schema.len(), presence_bytes.to_vec());

    let mut offset = framed_presence_len;
    let mut columns = Vec::with_capacity(schema.len());
    for (f, (field, &column_size)) in schema.fields().iter().zip(column_sizes).enumerate() {
        let column_size = column_size as usize;
        let framed_len = column_size + 4;
        let chunk = body.get(offset..offset + framed_len).ok_or(Error::TruncatedInput)?;
        let bytes = verify_and_strip_crc(chunk, "column")?;

        let count = (0..rows).filter(|&r| presence.get(r, f)).count();
        columns.push(decode_column(field.field_type, field.scale, bytes, count)?);
        offset += framed_len;
    }

    Ok(ParsedSection { presence, columns })
}

/// Parses an encrypted section body: decrypt under `key`, then the
/// plaintext is a standard body.
pub(crate) fn parse_encrypted_body(
    schema: &Schema,
    rows: usize,
    column_sizes: &[u64],
    envelope: &[u8],
    key: &[u8],
) -> Result<ParsedSection> {
    let key = crypto::load_key(key)?;
    let plaintext = crypto::open(&key, envelope)?;
    parse_standard_body(schema, rows, column_sizes, &plaintext)
}

pub(crate) fn rebuild_rows(schema: &Schema, parsed: &ParsedSection) -> Vec<Row> {
    let mut cursors = vec![0usize; schema.len()];
    let mut rows = Vec::with_capacity(parsed.presence.rows());
    for r in 0..parsed.presence.rows() {
        let mut row = Row::new();
        for (f, field) in schema.fields().iter().enumerate() {
            if parsed.presence.get(r, f) {
                let value = parsed.columns[f][cursors[f]].clone();
                cursors[f] += 1;
                let name = String::from_utf8_lossy(&field.name).into_owned();
                row.insert(name, value);
            }
        }
        rows.push(row);
    }
    rows
}

/// `None` if `name` is unknown to the stored schema; `Some` of an
/// all-`None` column if `expected_type` is given and disagrees with the
/// stored type (spec.md §4.3, §8 boundary behaviors).
pub(crate) fn column_values(
    schema: &Schema,
    parsed: &ParsedSection,
    name: &[u8],
    expected_type: Option<FieldType>,
) -> Option<Vec<Option<Value>>> {
    let f = schema.position_of(name)?;
    let field = &schema.fields()[f];
    if let Some(expected) = expected_type {
        if expected != field.field_type {
            return Some(vec![None; parsed.presence.rows()]);
        }
    }

    let mut cursor = 0usize;
    let mut out = Vec::with_capacity(parsed.presence.rows());
    for r in 0..parsed.presence.rows() {
        if parsed.presence.get(r, f) {
            out.push(Some(parsed.columns[f][cursor].clone()));
            cursor += 1;
        } else {
            out.push(None);
        }
    }
    Some(out)
}
