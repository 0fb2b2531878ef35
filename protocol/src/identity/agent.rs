//! # Agent Identity
//!
//! An [`AgentIdentity`] is an Ed25519 keypair plus the `did:key` identifier
//! derived from its public half. It is created once (generated or imported)
//! and never mutated afterwards.
//!
//! ## Security considerations
//!
//! - Keys are generated from `OsRng`. An RNG failure is reported as
//!   `KEY_GENERATION_FAILED`, not papered over with a weaker source.
//! - `AgentIdentity` does not implement `Serialize`. Exporting the secret is
//!   an explicit call to [`AgentIdentity::secret_key_bytes`].
//! - `Debug` prints the DID only. Key bytes are never logged.

use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use super::did::derive_did;
use crate::config::SIGNING_KEY_LENGTH;
use crate::crypto::keys::{AgentPublicKey, AgentSignature, KeyError};
use crate::error::ErrorCode;

/// Identity-layer failures. All of them are fatal for the operation that
/// raised them; retrying with the same input will not help.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("key generation failed: system RNG unavailable")]
    KeyGenerationFailed,

    #[error("invalid key format: {0}")]
    InvalidKeyFormat(#[from] KeyError),

    #[error("signing failed")]
    SignatureFailed,
}

impl IdentityError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::KeyGenerationFailed => ErrorCode::KeyGenerationFailed,
            Self::InvalidKeyFormat(_) => ErrorCode::InvalidKeyFormat,
            Self::SignatureFailed => ErrorCode::SignatureFailed,
        }
    }
}

/// An agent's signing identity.
///
/// # Examples
///
/// ```
/// use mandate_protocol::identity::AgentIdentity;
///
/// let agent = AgentIdentity::generate().unwrap();
/// let sig = agent.sign(b"cart:42").unwrap();
/// assert!(AgentIdentity::verify(&sig, b"cart:42", &agent.public_key()));
/// ```
pub struct AgentIdentity {
    signing_key: SigningKey,
    public_key: AgentPublicKey,
    did: String,
}

impl AgentIdentity {
    /// Generate a fresh identity from the OS RNG.
    pub fn generate() -> Result<Self, IdentityError> {
        let mut seed = [0u8; SIGNING_KEY_LENGTH];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|_| IdentityError::KeyGenerationFailed)?;
        let identity = Self::from_signing_key(SigningKey::from_bytes(&seed));
        debug!(did = %identity.did, "generated agent identity");
        Ok(identity)
    }

    /// Import an identity from raw 32-byte secret key material.
    pub fn from_secret_bytes(secret: &[u8]) -> Result<Self, IdentityError> {
        let seed: [u8; SIGNING_KEY_LENGTH] =
            secret.try_into().map_err(|_| KeyError::InvalidSecretKey {
                expected: SIGNING_KEY_LENGTH,
            })?;
        Ok(Self::from_signing_key(SigningKey::from_bytes(&seed)))
    }

    /// Import an identity from a hex-encoded secret key.
    pub fn from_hex(hex_str: &str) -> Result<Self, IdentityError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidSecretKey {
            expected: SIGNING_KEY_LENGTH,
        })?;
        Self::from_secret_bytes(&bytes)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let public_key = AgentPublicKey::from_bytes(signing_key.verifying_key().to_bytes());
        let did = derive_did(&public_key);
        Self {
            signing_key,
            public_key,
            did,
        }
    }

    /// The derived `did:key` identifier.
    pub fn did(&self) -> &str {
        &self.did
    }

    pub fn public_key(&self) -> AgentPublicKey {
        self.public_key.clone()
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        *self.public_key.as_bytes()
    }

    pub fn public_key_hex(&self) -> String {
        self.public_key.to_hex()
    }

    /// Export the raw secret key. Handle with extreme care.
    pub fn secret_key_bytes(&self) -> [u8; SIGNING_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }

    /// Sign `message`. Ed25519 is deterministic: same key, same message,
    /// same signature.
    pub fn sign(&self, message: &[u8]) -> Result<AgentSignature, IdentityError> {
        let sig = self
            .signing_key
            .try_sign(message)
            .map_err(|_| IdentityError::SignatureFailed)?;
        Ok(AgentSignature::from_bytes(sig.to_bytes()))
    }

    /// Verify `signature` over `message` under an arbitrary public key.
    /// Never errors; any failure is `false`.
    pub fn verify(signature: &AgentSignature, message: &[u8], public_key: &AgentPublicKey) -> bool {
        public_key.verify(message, signature)
    }

    /// Verify a signature against this identity's own public key.
    pub fn verify_own(&self, signature: &AgentSignature, message: &[u8]) -> bool {
        Self::verify(signature, message, &self.public_key)
    }
}

impl Clone for AgentIdentity {
    fn clone(&self) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(&self.signing_key.to_bytes()))
    }
}

impl fmt::Debug for AgentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentIdentity({})", self.did)
    }
}

impl PartialEq for AgentIdentity {
    /// Compares public keys only.
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key
    }
}

impl Eq for AgentIdentity {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_usable_identity() {
        let id = AgentIdentity::generate().unwrap();
        assert_eq!(id.public_key_bytes().len(), 32);
        assert!(id.did().starts_with("did:key:z"));
    }

    #[test]
    fn sign_verify_roundtrip() {
        let id = AgentIdentity::generate().unwrap();
        let sig = id.sign(b"intent:buy shoes").unwrap();
        assert!(AgentIdentity::verify(&sig, b"intent:buy shoes", &id.public_key()));
        assert!(id.verify_own(&sig, b"intent:buy shoes"));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let a = AgentIdentity::generate().unwrap();
        let b = AgentIdentity::generate().unwrap();
        let sig = a.sign(b"message").unwrap();
        assert!(!AgentIdentity::verify(&sig, b"message", &b.public_key()));
    }

    #[test]
    fn import_roundtrip_preserves_identity() {
        let id = AgentIdentity::generate().unwrap();
        let restored = AgentIdentity::from_secret_bytes(&id.secret_key_bytes()).unwrap();
        assert_eq!(id, restored);
        assert_eq!(id.did(), restored.did());

        let from_hex = AgentIdentity::from_hex(&hex::encode(id.secret_key_bytes())).unwrap();
        assert_eq!(id.public_key(), from_hex.public_key());
    }

    #[test]
    fn malformed_key_material_is_invalid_key_format() {
        let err = AgentIdentity::from_secret_bytes(&[1u8; 31]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidKeyFormat);

        let err = AgentIdentity::from_hex("not-hex-at-all").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidKeyFormat);
    }

    #[test]
    fn deterministic_signatures() {
        let id = AgentIdentity::from_secret_bytes(&[7u8; 32]).unwrap();
        let s1 = id.sign(b"same").unwrap();
        let s2 = id.sign(b"same").unwrap();
        assert_eq!(s1, s2);
    }

    #[test]
    fn two_generated_identities_differ() {
        let a = AgentIdentity::generate().unwrap();
        let b = AgentIdentity::generate().unwrap();
        assert_ne!(a.public_key_bytes(), b.public_key_bytes());
        assert_ne!(a.did(), b.did());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let id = AgentIdentity::generate().unwrap();
        let debug_str = format!("{:?}", id);
        assert!(debug_str.starts_with("AgentIdentity(did:key:"));
        assert!(!debug_str.contains(&hex::encode(id.secret_key_bytes())));
    }

    #[test]
    fn clone_preserves_key() {
        let id = AgentIdentity::generate().unwrap();
        let cloned = id.clone();
        assert_eq!(id.secret_key_bytes(), cloned.secret_key_bytes());
    }
}
