//! # Key Material
//!
//! Public halves of agent identities and the signatures they produce.
//! The private half lives in [`crate::identity::AgentIdentity`] and never
//! leaves it except through an explicit export call.
//!
//! Both types here are plain byte wrappers. A public key is *not* checked
//! for curve validity by [`AgentPublicKey::from_bytes`]; that happens in
//! [`AgentPublicKey::try_from_slice`] (import path) and, lazily, on every
//! verification. A key that is not a valid point simply fails to verify.

use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

use crate::config::{SIGNATURE_LENGTH, VERIFYING_KEY_LENGTH};
use crate::error::ErrorCode;

/// Errors for key and signature parsing.
///
/// Nothing about the offending bytes is echoed back.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: expected {expected} bytes")]
    InvalidSecretKey { expected: usize },

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,

    #[error("invalid signature bytes: expected {expected} bytes")]
    InvalidSignature { expected: usize },
}

impl KeyError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::InvalidKeyFormat
    }
}

// ---------------------------------------------------------------------------
// AgentPublicKey
// ---------------------------------------------------------------------------

/// A 32-byte Ed25519 public key. Safe to share, log and serialize.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPublicKey {
    bytes: [u8; VERIFYING_KEY_LENGTH],
}

impl AgentPublicKey {
    /// Wrap raw bytes without validation.
    pub fn from_bytes(bytes: [u8; VERIFYING_KEY_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Import a public key, checking length and that it decodes to a curve
    /// point.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; VERIFYING_KEY_LENGTH] =
            slice.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// Parse a hex-encoded public key (validated like `try_from_slice`).
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::try_from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; VERIFYING_KEY_LENGTH] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Verify `signature` over `message`. Any failure, including a key that
    /// is not a curve point, is a plain `false`.
    pub fn verify(&self, message: &[u8], signature: &AgentSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let Some(sig) = signature.to_dalek_signature() else {
            return false;
        };
        verifying_key.verify(message, &sig).is_ok()
    }
}

impl Hash for AgentPublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Display for AgentPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for AgentPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentPublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// AgentSignature
// ---------------------------------------------------------------------------

/// An Ed25519 signature.
///
/// Held as a `Vec<u8>` so that a signature decoded from untrusted input can
/// be represented even when its length is wrong; such a signature simply
/// never verifies.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSignature {
    bytes: Vec<u8>,
}

impl AgentSignature {
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Import raw signature bytes, rejecting anything that is not 64 bytes.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        if slice.len() != SIGNATURE_LENGTH {
            return Err(KeyError::InvalidSignature {
                expected: SIGNATURE_LENGTH,
            });
        }
        Ok(Self {
            bytes: slice.to_vec(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_dalek_signature(&self) -> Option<DalekSignature> {
        let arr: [u8; SIGNATURE_LENGTH] = self.bytes.as_slice().try_into().ok()?;
        Some(DalekSignature::from_bytes(&arr))
    }

    /// Lowercase hex, 128 characters for a well-formed signature.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidSignature {
            expected: SIGNATURE_LENGTH,
        })?;
        Self::try_from_slice(&bytes)
    }
}

impl fmt::Display for AgentSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for AgentSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() >= 128 {
            write!(f, "AgentSignature({}...{})", &hex_str[..8], &hex_str[120..])
        } else {
            write!(f, "AgentSignature({})", hex_str)
        }
    }
}
