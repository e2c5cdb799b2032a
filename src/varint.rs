//! LEB128 varint primitives shared by lengths, counts, and delta-coded
//! numeric columns. Built on the `leb128` crate, which accepts any
//! encoding that fits within the target width — the same posture the
//! format requires ("any byte sequence fitting in 10 bytes is accepted").

use std::io::{Read, Write};

use crate::result::{Error, Result};

/// Reads an unsigned LEB128 varint (used for lengths and counts).
pub(crate) fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    leb128::read::unsigned(reader).map_err(map_leb128_err)
}

/// Writes an unsigned LEB128 varint.
pub(crate) fn write_u64<W: Write>(writer: &mut W, val: u64) -> Result<()> {
    leb128::write::unsigned(writer, val)?;
    Ok(())
}

/// Reads a signed LEB128 varint (used for deltas and first-value seeds).
pub(crate) fn read_i64<R: Read>(reader: &mut R) -> Result<i64> {
    leb128::read::signed(reader).map_err(map_leb128_err)
}

/// Writes a signed LEB128 varint.
pub(crate) fn write_i64<W: Write>(writer: &mut W, val: i64) -> Result<()> {
    leb128::write::signed(writer, val)?;
    Ok(())
}

fn map_leb128_err(err: leb128::read::Error) -> Error {
    match err {
        leb128::read::Error::IoError(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            Error::TruncatedInput
        }
        leb128::read::Error::IoError(io) => Error::IoFailed(io),
        leb128::read::Error::Overflow => Error::OutOfRange("varint overflowed target width".into()),
    }
}

/// Reads a length-prefixed (LEB128 count) run of raw bytes.
pub(crate) fn read_len_bytes<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let len = read_u64(reader)?;
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::TruncatedInput
        } else {
            Error::IoFailed(e)
        }
    })?;
    Ok(buf)
}

/// Writes a length-prefixed (LEB128 count) run of raw bytes.
pub(crate) fn write_len_bytes<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<()> {
    write_u64(writer, bytes.len() as u64)?;
    writer.write_all(bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_roundtrip() {
        for val in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
            let mut buf = vec![];
            write_u64(&mut buf, val).unwrap();
            let mut cur = &buf[..];
            assert_eq!(read_u64(&mut cur).unwrap(), val);
            assert!(cur.is_empty());
        }
    }

    #[test]
    fn signed_roundtrip() {
        for val in [0i64, 1, -1, 40, -40, i64::MIN, i64::MAX] {
            let mut buf = vec![];
            write_i64(&mut buf, val).unwrap();
            let mut cur = &buf[..];
            assert_eq!(read_i64(&mut cur).unwrap(), val);
            assert!(cur.is_empty());
        }
    }

    #[test]
    fn truncated_input_is_reported() {
        let mut cur: &[u8] = &[0x80]; // continuation bit set, no following byte
        assert!(matches!(read_u64(&mut cur), Err(Error::TruncatedInput)));
    }
}
