//! XChaCha20-Poly1305 envelope for encrypted sections: `nonce(24) ||
//! ciphertext || tag(16)`, the same layout the teacher's whole-file
//! encryption tool uses (`chacha20poly1305.rs`), adapted to per-section
//! framing and this crate's own error type.

use chacha20poly1305::aead::{Aead, KeyInit, OsRng};
use chacha20poly1305::{AeadCore, XChaCha20Poly1305, XNonce};
use secrecy::{ExposeSecret, SecretBox};

use crate::constants;
use crate::result::{Error, Result};

/// Validates `key`'s length and wraps it for storage on a `Section`.
pub(crate) fn load_key(key: &[u8]) -> Result<SecretBox<[u8; constants::AEAD_KEY_SIZE]>> {
    let array: [u8; constants::AEAD_KEY_SIZE] = key.try_into().map_err(|_| {
        Error::OutOfRange(format!(
            "AEAD key must be exactly {} bytes, got {}",
            constants::AEAD_KEY_SIZE,
            key.len()
        ))
    })?;
    Ok(SecretBox::new(Box::new(array)))
}

/// Encrypts `plaintext` (a fully-framed standard section body) under
/// `key`, returning `nonce || ciphertext || tag`.
pub(crate) fn seal(key: &SecretBox<[u8; constants::AEAD_KEY_SIZE]>, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new_from_slice(key.expose_secret())
        .map_err(|_| Error::OutOfRange("invalid AEAD key".into()))?;
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
    let mut out = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| Error::DecryptFail)?;
    out.splice(0..0, nonce.iter().copied());
    Ok(out)
}

/// Decrypts an envelope produced by `seal`, returning the plaintext
/// standard section body.
pub(crate) fn open(key: &SecretBox<[u8; constants::AEAD_KEY_SIZE]>, envelope: &[u8]) -> Result<Vec<u8>> {
    if envelope.len() < constants::AEAD_NONCE_SIZE + constants::AEAD_TAG_SIZE {
        return Err(Error::TruncatedInput);
    }
    let (nonce_bytes, data) = envelope.split_at(constants::AEAD_NONCE_SIZE);
    let cipher = XChaCha20Poly1305::new_from_slice(key.expose_secret())
        .map_err(|_| Error::OutOfRange("invalid AEAD key".into()))?;
    cipher
        .decrypt(XNonce::from_slice(nonce_bytes), data)
        .map_err(|_| Error::DecryptFail)
}
