//! # Error Taxonomy
//!
//! Every fallible operation in this crate returns a module-specific error
//! enum (`KeyError`, `IdentityError`, `MandateError`, `ConsensusError`,
//! `Rfc9421Error`, `AuthorizationError`). Each of them maps onto a stable,
//! machine-readable [`ErrorCode`] so that a remote caller can branch on the
//! failure class without parsing message strings.
//!
//! Two rules hold across the board:
//!
//! - A *failed verification* is never an error. It is a `false` vote or a
//!   `false` return value. Errors are reserved for malformed input, misuse
//!   and orchestration failures.
//! - Messages never carry key material or internal state dumps. They are
//!   safe to hand to an untrusted caller.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::authorization::AuthorizationError;
use crate::consensus::ConsensusError;
use crate::crypto::keys::KeyError;
use crate::identity::IdentityError;
use crate::mandate::MandateError;
use crate::rfc9421::Rfc9421Error;

/// Stable error classes exposed across the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Key generation failed (RNG unavailable). Fatal.
    KeyGenerationFailed,
    /// Imported key material is malformed. Fatal.
    InvalidKeyFormat,
    /// A signing attempt failed. Fatal.
    SignatureFailed,
    /// Consensus orchestration failed, or the pool was too small at call time.
    ConsensusError,
    /// Not enough agents registered to build a verification system.
    InsufficientAgents,
    /// A structural business rule failed.
    ValidationFailed,
    /// The mandate is malformed, revoked, or in the wrong lifecycle state.
    InvalidMandate,
    /// The mandate is past its expiry.
    ExpiredMandate,
    /// An amount exceeds its cap or overflows.
    AmountExceeded,
    /// Programmer misuse (e.g. registering past pool capacity).
    SystemError,
    /// Invalid configuration.
    ConfigurationError,
}

impl ErrorCode {
    /// The wire representation, e.g. `"CONSENSUS_ERROR"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeyGenerationFailed => "KEY_GENERATION_FAILED",
            Self::InvalidKeyFormat => "INVALID_KEY_FORMAT",
            Self::SignatureFailed => "SIGNATURE_FAILED",
            Self::ConsensusError => "CONSENSUS_ERROR",
            Self::InsufficientAgents => "INSUFFICIENT_AGENTS",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InvalidMandate => "INVALID_MANDATE",
            Self::ExpiredMandate => "EXPIRED_MANDATE",
            Self::AmountExceeded => "AMOUNT_EXCEEDED",
            Self::SystemError => "SYSTEM_ERROR",
            Self::ConfigurationError => "CONFIGURATION_ERROR",
        }
    }

    /// Fatal errors are not worth retrying with the same input.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::KeyGenerationFailed
                | Self::InvalidKeyFormat
                | Self::SignatureFailed
                | Self::SystemError
                | Self::ConfigurationError
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Crate-level error, for callers that drive several subsystems and want a
/// single `?`-compatible type.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Mandate(#[from] MandateError),

    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    #[error(transparent)]
    HttpSignature(#[from] Rfc9421Error),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
}

impl ProtocolError {
    /// The stable error class of the wrapped error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Key(e) => e.code(),
            Self::Identity(e) => e.code(),
            Self::Mandate(e) => e.code(),
            Self::Consensus(e) => e.code(),
            Self::HttpSignature(e) => e.code(),
            Self::Authorization(e) => e.code(),
        }
    }
}
