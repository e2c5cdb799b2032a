use thiserror::Error;

pub type Result<A, E = Error> = std::result::Result<A, E>;

/// The single abstract failure kind the codec surfaces: one variant per
/// kind in the error taxonomy, not per call site.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    IoFailed(#[from] std::io::Error),
    #[error("encoding error: {0}")]
    EncodingFailed(#[from] declio::Error),
    #[error("bad magic bytes")]
    BadMagic,
    #[error("unsupported file_version {0}")]
    BadVersion(u16),
    #[error("CRC mismatch in region: {region}")]
    CrcMismatch { region: &'static str },
    #[error("bad schema: {0}")]
    BadSchema(String),
    #[error("truncated input")]
    TruncatedInput,
    #[error("decryption failed")]
    DecryptFail,
    #[error("value out of range: {0}")]
    OutOfRange(String),
    #[error("bad metadata: {0}")]
    BadMetadata(String),
    #[error("section index {index} out of range (have {len})")]
    SectionIndex { index: usize, len: usize },
    #[error("value could not be coerced: {0}")]
    BadValue(String),
}
