//! # Mandates
//!
//! A mandate is a signed, bounded spending authorization. Three kinds exist:
//!
//! 1. **Intent** ([`IntentMandate`]) — "this customer may spend up to N at
//!    this merchant, for this purpose".
//! 2. **Cart** ([`CartMandate`]) — a concrete item list whose total is
//!    derived, never set.
//! 3. **Payment** ([`PaymentMandate`]) — a concrete charge with a lifecycle
//!    status.
//!
//! All three share the [`Mandate`] trait: canonical bytes, signing,
//! verification and structural validation. Signing covers the canonical
//! bytes only (see [`canonical`]); lifecycle fields such as a payment's
//! status are not signed.
//!
//! Structural validity (`validate`) and cryptographic validity (`verify`)
//! are independent checks. A caller that needs both must ask for both.

pub mod canonical;
pub mod cart;
pub mod intent;
pub mod payment;
pub mod types;
pub mod validation;

pub use canonical::CanonicalEncoder;
pub use cart::CartMandate;
pub use intent::IntentMandate;
pub use payment::PaymentMandate;
pub use types::{CartItem, PaymentResponse, PaymentStatus};
pub use validation::{ValidationIssue, ValidationReport};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::config::DEFAULT_MANDATE_TTL;
use crate::crypto::keys::{AgentPublicKey, AgentSignature};
use crate::error::ErrorCode;
use crate::identity::{derive_did, AgentIdentity, IdentityError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum MandateError {
    #[error("signing failed: {0}")]
    Signing(#[from] IdentityError),

    #[error("mandate is not signed")]
    MissingSignature,

    #[error("stored signature is malformed")]
    MalformedSignature,

    #[error("mandate signer {claimed} does not match the verifying key")]
    SignerMismatch { claimed: String },

    #[error("illegal status transition: {from} -> {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("payment response does not match mandate: {0}")]
    ResponseMismatch(&'static str),

    #[error("invalid mandate JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl MandateError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Signing(e) => e.code(),
            Self::MissingSignature | Self::MalformedSignature | Self::SignerMismatch { .. } => {
                ErrorCode::ValidationFailed
            }
            Self::InvalidTransition { .. } | Self::ResponseMismatch(_) | Self::Json(_) => {
                ErrorCode::InvalidMandate
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MandateKind / MandateProof
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MandateKind {
    Intent,
    Cart,
    Payment,
}

impl MandateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intent => "intent",
            Self::Cart => "cart",
            Self::Payment => "payment",
        }
    }
}

impl fmt::Display for MandateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signature over the canonical bytes plus the DID of whoever produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MandateProof {
    /// Lowercase hex Ed25519 signature.
    pub signature: String,
    /// `did:key` of the signer.
    pub signer: String,
}

// ---------------------------------------------------------------------------
// Mandate trait
// ---------------------------------------------------------------------------

/// Behaviour shared by every mandate kind.
pub trait Mandate {
    fn kind(&self) -> MandateKind;

    fn id(&self) -> &str;

    fn expires_at(&self) -> DateTime<Utc>;

    /// Deterministic byte encoding of the signed fields.
    fn canonical_bytes(&self) -> Vec<u8>;

    fn proof(&self) -> Option<&MandateProof>;

    fn set_proof(&mut self, proof: MandateProof);

    /// Structural checks against an explicit clock.
    fn validate_at(&self, now: DateTime<Utc>) -> ValidationReport;

    /// Structural checks against the wall clock. Never cryptographic.
    fn validate(&self) -> ValidationReport {
        self.validate_at(Utc::now())
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at() <= now
    }

    /// Sign the current canonical bytes and store the proof. Any later field
    /// change invalidates it; sign again after editing.
    fn sign(&mut self, identity: &AgentIdentity) -> Result<(), MandateError> {
        let signature = identity.sign(&self.canonical_bytes())?;
        self.set_proof(MandateProof {
            signature: signature.to_hex(),
            signer: identity.did().to_string(),
        });
        debug!(kind = %self.kind(), mandate_id = %self.id(), signer = %identity.did(), "mandate signed");
        Ok(())
    }

    /// Decode the stored signature.
    fn signature(&self) -> Result<AgentSignature, MandateError> {
        let proof = self.proof().ok_or(MandateError::MissingSignature)?;
        AgentSignature::from_hex(&proof.signature).map_err(|_| MandateError::MalformedSignature)
    }

    /// Decode the stored signature, requiring the recorded signer to be the
    /// DID of `public_key`.
    fn signature_for(&self, public_key: &AgentPublicKey) -> Result<AgentSignature, MandateError> {
        let signature = self.signature()?;
        let claimed = self.proof().map(|p| p.signer.as_str()).unwrap_or_default();
        if claimed != derive_did(public_key) {
            return Err(MandateError::SignerMismatch {
                claimed: claimed.to_string(),
            });
        }
        Ok(signature)
    }

    fn verify(&self, identity: &AgentIdentity) -> bool {
        self.verify_with_key(&identity.public_key())
    }

    /// Recompute canonical bytes from the current fields and check the stored
    /// signature and signer. `false` on any parse or crypto failure.
    fn verify_with_key(&self, public_key: &AgentPublicKey) -> bool {
        match self.signature_for(public_key) {
            Ok(signature) => public_key.verify(&self.canonical_bytes(), &signature),
            Err(_) => false,
        }
    }

    fn to_json(&self) -> Result<String, MandateError>
    where
        Self: Serialize + Sized,
    {
        Ok(serde_json::to_string(self)?)
    }

    fn from_json(json: &str) -> Result<Self, MandateError>
    where
        Self: DeserializeOwned + Sized,
    {
        Ok(serde_json::from_str(json)?)
    }
}

/// Default expiry for a mandate created now.
pub(crate) fn default_expiry() -> DateTime<Utc> {
    let ttl = chrono::Duration::from_std(DEFAULT_MANDATE_TTL).unwrap_or_else(|_| chrono::Duration::hours(1));
    Utc::now() + ttl
}

pub(crate) fn new_mandate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
