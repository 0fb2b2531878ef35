//! # Hashing Utilities
//!
//! SHA-256 only. It is what `Content-Digest` (RFC 9530) expects and what
//! every HTTP peer can reproduce; there is no internal hashing need that
//! would justify a second function.

use sha2::{Digest, Sha256};

/// SHA-256 of `data` as a fixed-size array.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// SHA-256 of `data`, hex encoded. Handy for log correlation of payloads
/// without logging the payload itself.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}
