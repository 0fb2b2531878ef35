//! # Cryptographic Primitives
//!
//! Ed25519 for every signature in the crate (mandates, consensus votes,
//! HTTP messages) and SHA-256 for content digests. Everything here is a
//! thin, typed wrapper around `ed25519-dalek` and `sha2`; nothing is
//! hand-rolled.

pub mod hash;
pub mod keys;

pub use hash::{sha256, sha256_hex};
pub use keys::{AgentPublicKey, AgentSignature, KeyError};
