//! Digest helpers for deterministic identifiers

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of `data`
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(data.as_ref()))
}

/// First `len` hex characters of the SHA-256 digest of `input`.
///
/// `len` is capped at the full digest length (64).
pub fn short_digest(input: &str, len: usize) -> String {
    let mut digest = sha256_hex(input);
    digest.truncate(len.min(digest.len()));
    digest
}
