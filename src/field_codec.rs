//! Per-field-type column codecs: the delta / varint / length-prefixed
//! encodings described in spec §4.2. Each function operates purely on an
//! in-memory byte buffer — no framing, no CRC; that is `section.rs`'s job.

use std::io::Read;

use crate::result::{Error, Result};
use crate::varint;

/// Delta-codes a `u64` stream (used directly by `U64`, and by `I64`/`F64`
/// via bit-reinterpretation of their values as `u64`). The first value is
/// written raw; each following value is `wrapping_sub` of its predecessor,
/// both interpreted at `u64` width, written as signed LEB128.
fn encode_u64_delta(buf: &mut Vec<u8>, values: &[u64]) -> Result<()> {
    let mut prev = 0u64;
    for (i, &v) in values.iter().enumerate() {
        let word = if i == 0 { v } else { v.wrapping_sub(prev) };
        varint::write_i64(buf, word as i64)?;
        prev = v;
    }
    Ok(())
}

fn decode_u64_delta<R: Read>(reader: &mut R, count: usize) -> Result<Vec<u64>> {
    let mut out = Vec::with_capacity(count);
    let mut prev = 0u64;
    for _ in 0..count {
        let word = varint::read_i64(reader)? as u64;
        let v = if out.is_empty() { word } else { prev.wrapping_add(word) };
        out.push(v);
        prev = v;
    }
    Ok(out)
}

pub(crate) fn encode_i64(values: &[i64]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let as_u64: Vec<u64> = values.iter().map(|&v| v as u64).collect();
    encode_u64_delta(&mut buf, &as_u64)?;
    Ok(buf)
}

pub(crate) fn decode_i64<R: Read>(reader: &mut R, count: usize) -> Result<Vec<i64>> {
    Ok(decode_u64_delta(reader, count)?.into_iter().map(|v| v as i64).collect())
}

pub(crate) fn encode_u64(values: &[u64]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_u64_delta(&mut buf, values)?;
    Ok(buf)
}

pub(crate) fn decode_u64<R: Read>(reader: &mut R, count: usize) -> Result<Vec<u64>> {
    decode_u64_delta(reader, count)
}

/// `F64@scale`: the delta-coded integer stream of the already-scaled
/// values (`Coerced::F64Scaled`), identical machinery to `I64`.
pub(crate) fn encode_f64_scaled(values: &[i64]) -> Result<Vec<u8>> {
    encode_i64(values)
}

pub(crate) fn decode_f64_scaled<R: Read>(reader: &mut R, count: usize) -> Result<Vec<i64>> {
    decode_i64(reader, count)
}

pub(crate) fn encode_bool(values: &[bool]) -> Result<Vec<u8>> {
    Ok(values.iter().map(|&b| u8::from(b)).collect())
}

pub(crate) fn decode_bool<R: Read>(reader: &mut R, count: usize) -> Result<Vec<bool>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte).map_err(|_| Error::TruncatedInput)?;
        match byte[0] {
            0x00 => out.push(false),
            0x01 => out.push(true),
            other => return Err(Error::BadSchema(format!("invalid bool byte {other:#04x}"))),
        }
    }
    Ok(out)
}

/// Shared by `String` and `ByteArray`: LEB128 length followed by raw bytes.
pub(crate) fn encode_bytes(values: &[Vec<u8>]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for v in values {
        varint::write_len_bytes(&mut buf, v)?;
    }
    Ok(buf)
}

pub(crate) fn decode_bytes<R: Read>(reader: &mut R, count: usize) -> Result<Vec<Vec<u8>>> {
    (0..count).map(|_| varint::read_len_bytes(reader)).collect()
}

pub(crate) fn encode_bool_array(values: &[Vec<bool>]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for arr in values {
        varint::write_u64(&mut buf, arr.len() as u64)?;
        for &b in arr {
            buf.push(u8::from(b));
        }
    }
    Ok(buf)
}

pub(crate) fn decode_bool_array<R: Read>(reader: &mut R, count: usize) -> Result<Vec<Vec<bool>>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let len = varint::read_u64(reader)? as usize;
        let mut bytes = vec![0u8; len];
        reader.read_exact(&mut bytes).map_err(|_| Error::TruncatedInput)?;
        let arr = bytes
            .into_iter()
            .map(|b| match b {
                0x00 => Ok(false),
                0x01 => Ok(true),
                other => Err(Error::BadSchema(format!("invalid bool byte {other:#04x}"))),
            })
            .collect::<Result<Vec<bool>>>()?;
        out.push(arr);
    }
    Ok(out)
}

/// Deltas reset at every array boundary.
pub(crate) fn encode_u64_array(values: &[Vec<u64>]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for arr in values {
        varint::write_u64(&mut buf, arr.len() as u64)?;
        encode_u64_delta(&mut buf, arr)?;
    }
    Ok(buf)
}

pub(crate) fn decode_u64_array<R: Read>(reader: &mut R, count: usize) -> Result<Vec<Vec<u64>>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let len = varint::read_u64(reader)? as usize;
        out.push(decode_u64_delta(reader, len)?);
    }
    Ok(out)
}
