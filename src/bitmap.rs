//! Presence bitmap: row-major, field-aligned. For `N` rows and `F` fields
//! it is `N` rows of `ceil(F/8)` bytes; bit `b` of byte `floor(f/8)` in
//! row `r` is set iff field `f` is present-and-non-null in row `r`. The
//! bit-packing itself mirrors the teacher's `BitVector` helper (word-count
//! header plus a flat byte buffer with byte/bit indexing), generalized
//! here to row-major indexing instead of a single flat run.

use crate::utils::div_ceil;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PresenceBitmap {
    rows: usize,
    fields: usize,
    row_bytes: usize,
    buf: Vec<u8>,
}

impl PresenceBitmap {
    pub fn new(rows: usize, fields: usize) -> Self {
        let row_bytes = div_ceil(fields as u32, 8) as usize;
        Self {
            rows,
            fields,
            row_bytes,
            buf: vec![0u8; rows * row_bytes],
        }
    }

    pub fn from_bytes(rows: usize, fields: usize, buf: Vec<u8>) -> Self {
        let row_bytes = div_ceil(fields as u32, 8) as usize;
        debug_assert_eq!(buf.len(), rows * row_bytes);
        Self { rows, fields, row_bytes, buf }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn row_bytes(&self) -> usize {
        self.row_bytes
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn set(&mut self, row: usize, field: usize) {
        debug_assert!(field < self.fields);
        let byte = row * self.row_bytes + field / 8;
        self.buf[byte] |= 1 << (field % 8);
    }

    pub fn get(&self, row: usize, field: usize) -> bool {
        debug_assert!(field < self.fields);
        let byte = row * self.row_bytes + field / 8;
        self.buf[byte] & (1 << (field % 8)) != 0
    }
}
