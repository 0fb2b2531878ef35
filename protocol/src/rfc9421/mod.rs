//! # HTTP Message Signatures (RFC 9421)
//!
//! Agents that call merchant endpoints sign each request with their Ed25519
//! identity. The signature covers:
//!
//! - `@method`, `@authority`, `@path`
//! - `content-digest` (RFC 9530, SHA-256 of the body) when a body exists
//! - any extra headers the caller chooses
//!
//! plus a `@signature-params` line carrying `created`, a random `nonce` and
//! the `keyid`. The verifier enforces a freshness window on `created`
//! (default five minutes) before doing any cryptography.
//!
//! Replay *within* the window is not detected here: nonce uniqueness is the
//! caller's job, and this module keeps no nonce cache.

pub mod components;
pub mod signer;

pub use components::RequestComponents;
pub use signer::{HttpMessageSigner, HttpMessageVerifier, HttpSignatureConfig, SignedHttpMessage};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

use crate::config::CONTENT_DIGEST_ALGORITHM;
use crate::crypto::hash::sha256;
use crate::error::ErrorCode;
use crate::identity::IdentityError;

#[derive(Debug, Error)]
pub enum Rfc9421Error {
    #[error("invalid request component: {0}")]
    InvalidComponent(String),

    #[error("invalid key id: {0}")]
    InvalidKeyId(&'static str),

    #[error("nonce generation failed: system RNG unavailable")]
    NonceGeneration,

    #[error("signing failed: {0}")]
    Signing(#[from] IdentityError),
}

impl Rfc9421Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidComponent(_) | Self::InvalidKeyId(_) => ErrorCode::ValidationFailed,
            Self::NonceGeneration => ErrorCode::SystemError,
            Self::Signing(e) => e.code(),
        }
    }
}

/// `sha-256=:<base64(sha256(body))>:`
pub fn compute_content_digest(body: &[u8]) -> String {
    format!("{}=:{}:", CONTENT_DIGEST_ALGORITHM, STANDARD.encode(sha256(body)))
}
