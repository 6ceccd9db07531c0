//! Deterministic hashing utilities for Chamberlain.
//!
//! All hashes are SHA-256, lowercase hex encoded, and domain-separated where
//! they identify a record kind.

use sha2::{Digest, Sha256};

/// SHA-256 of raw bytes.
pub fn hash_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut h = Sha256::new();
    h.update(bytes);
    h.finalize().to_vec()
}

/// Hash raw bytes and return lowercase hex string.
pub fn hash_bytes_hex(bytes: &[u8]) -> String {
    hex::encode(hash_bytes(bytes))
}

/// Domain-separated hash of a storage key, used to derive file names.
pub fn hash_key_hex(domain: &str, key: &str) -> String {
    let mut buf = Vec::with_capacity(domain.len() + 1 + key.len());
    buf.extend_from_slice(domain.as_bytes());
    buf.push(0);
    buf.extend_from_slice(key.as_bytes());
    hash_bytes_hex(&buf)
}
