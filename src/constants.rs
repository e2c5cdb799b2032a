use declio::ctx::Endian;

pub const ENDIANESS: Endian = Endian::Little;

/// `0x89 'R' 'W' 'T' 'F' 0x0A 0x1A 0x0A`.
pub const MAGIC: &[u8; 8] = b"\x89RWTF\x0a\x1a\x0a";

/// Currently-written file format version.
pub const FILE_VERSION: u16 = 1;

/// Byte length of the fixed file header body (before its CRC-16).
pub const HEADER_BODY_SIZE: u16 = 22;
/// Byte length of the file header including its trailing CRC-16.
pub const HEADER_TOTAL_SIZE: u16 = 24;

/// Maximum allowed F64 scale exponent. The spec requires out-of-range
/// scales to reject at schema construction; practical scales never need
/// more than a handful of decimal digits, so anything above 18 (the limit
/// at which `10^s` would itself overflow an `i64`) is rejected.
pub const MAX_F64_SCALE: u8 = 18;

/// Byte length of an XChaCha20-Poly1305 key.
pub const AEAD_KEY_SIZE: usize = 32;
/// Byte length of an XChaCha20-Poly1305 nonce.
pub const AEAD_NONCE_SIZE: usize = 24;
/// Byte length of the Poly1305 authentication tag.
pub const AEAD_TAG_SIZE: usize = 16;
