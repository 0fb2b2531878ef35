//! # Derived Identifiers (`did:key`)
//!
//! An agent is named by a string computed from its public key, so a signer
//! can be identified without any central registry:
//!
//! ```text
//! did:key:z<base58btc(0xed 0x01 || public_key)>
//! ```
//!
//! `0xed 0x01` is the varint multicodec tag for an Ed25519 public key and
//! `z` is the multibase prefix for base58btc. The mapping is a pure
//! function of the key: same key, same DID, on every platform.
//!
//! This module derives and shape-checks identifiers. It does not resolve
//! them; that is the job of an external credential registry.

use crate::config::{DID_KEY_PREFIX, ED25519_MULTICODEC, VERIFYING_KEY_LENGTH};
use crate::crypto::keys::AgentPublicKey;

/// Derive the `did:key` identifier for a public key.
pub fn derive_did(public_key: &AgentPublicKey) -> String {
    let mut multicodec_bytes = Vec::with_capacity(ED25519_MULTICODEC.len() + VERIFYING_KEY_LENGTH);
    multicodec_bytes.extend_from_slice(&ED25519_MULTICODEC);
    multicodec_bytes.extend_from_slice(public_key.as_bytes());
    format!(
        "{}z{}",
        DID_KEY_PREFIX,
        bs58::encode(&multicodec_bytes).into_string()
    )
}

/// Structural check: `did:key:z` prefix, valid base58btc body carrying the
/// Ed25519 multicodec tag and 32 key bytes.
pub fn is_did_key(candidate: &str) -> bool {
    let Some(rest) = candidate.strip_prefix(DID_KEY_PREFIX) else {
        return false;
    };
    let Some(body) = rest.strip_prefix('z') else {
        return false;
    };
    match bs58::decode(body).into_vec() {
        Ok(decoded) => {
            decoded.len() == ED25519_MULTICODEC.len() + VERIFYING_KEY_LENGTH
                && decoded[..2] == ED25519_MULTICODEC
        }
        Err(_) => false,
    }
}
