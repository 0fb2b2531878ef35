//! # Execution Guard
//!
//! The last gate before a payment is handed to an executor. It combines
//! checks that are deliberately kept apart elsewhere:
//!
//! 1. **Revocation**: the mandate (and its intent, if given) is not revoked.
//! 2. **Structure**: the mandate passes `validate()`.
//! 3. **Lifecycle**: the payment is still `Pending`.
//! 4. **Intent bounds**: same currency and merchant, amount within the cap.
//! 5. **Consensus**: the verification result is valid.
//!
//! The guard never executes anything. It returns a [`PaymentAuthorization`]
//! the caller can pass on, or the first failed check.
//!
//! The verification result must come from
//! [`VerificationSystem::verify_mandate`] on the same payment mandate; the
//! guard has no way to tell otherwise.
//!
//! [`VerificationSystem::verify_mandate`]: crate::consensus::VerificationSystem::verify_mandate

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::consensus::VerificationResult;
use crate::error::ErrorCode;
use crate::mandate::{IntentMandate, Mandate, PaymentMandate, PaymentStatus, ValidationIssue};
use crate::revocation::RevocationStore;

#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("mandate {mandate_id} has been revoked")]
    Revoked { mandate_id: String },

    #[error("mandate {mandate_id} failed validation ({code})")]
    Validation {
        mandate_id: String,
        code: ErrorCode,
        issues: Vec<ValidationIssue>,
    },

    #[error("payment is {status}, only pending payments can be authorized")]
    NotPending { status: PaymentStatus },

    #[error("payment {field} does not match intent")]
    IntentMismatch { field: &'static str },

    #[error("payment amount {amount} exceeds intent cap {cap}")]
    AmountExceeded { amount: u64, cap: u64 },

    #[error("consensus rejected the mandate signature ({percentage:.2} of votes)")]
    ConsensusRejected { percentage: f64 },
}

impl AuthorizationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Revoked { .. } | Self::NotPending { .. } | Self::IntentMismatch { .. } => {
                ErrorCode::InvalidMandate
            }
            Self::Validation { code, .. } => *code,
            Self::AmountExceeded { .. } => ErrorCode::AmountExceeded,
            Self::ConsensusRejected { .. } => ErrorCode::ConsensusError,
        }
    }
}

/// Permission to execute one payment. Carries no secrets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAuthorization {
    pub mandate_id: String,
    pub amount: u64,
    pub currency: String,
    pub consensus_percentage: f64,
    pub authorized_at: DateTime<Utc>,
}

pub struct ExecutionGuard {
    revocations: Arc<RevocationStore>,
}

impl ExecutionGuard {
    pub fn new(revocations: Arc<RevocationStore>) -> Self {
        Self { revocations }
    }

    pub fn authorize(
        &self,
        payment: &PaymentMandate,
        result: &VerificationResult,
    ) -> Result<PaymentAuthorization, AuthorizationError> {
        self.check_payment(payment)
            .and_then(|_| check_consensus(result))
            .map(|_| grant(payment, result))
            .map_err(|e| deny(payment, e))
    }

    /// As [`authorize`](Self::authorize), and additionally require the
    /// payment to stay within `intent`.
    pub fn authorize_within_intent(
        &self,
        payment: &PaymentMandate,
        intent: &IntentMandate,
        result: &VerificationResult,
    ) -> Result<PaymentAuthorization, AuthorizationError> {
        self.check_payment(payment)
            .and_then(|_| self.check_intent(payment, intent))
            .and_then(|_| check_consensus(result))
            .map(|_| grant(payment, result))
            .map_err(|e| deny(payment, e))
    }

    fn check_payment(&self, payment: &PaymentMandate) -> Result<(), AuthorizationError> {
        self.check_not_revoked(&payment.id)?;
        check_structure(payment)?;
        if payment.status() != PaymentStatus::Pending {
            return Err(AuthorizationError::NotPending {
                status: payment.status(),
            });
        }
        Ok(())
    }

    fn check_intent(&self, payment: &PaymentMandate, intent: &IntentMandate) -> Result<(), AuthorizationError> {
        self.check_not_revoked(&intent.id)?;
        check_structure(intent)?;
        if payment.currency != intent.currency {
            return Err(AuthorizationError::IntentMismatch { field: "currency" });
        }
        if payment.merchant != intent.merchant {
            return Err(AuthorizationError::IntentMismatch { field: "merchant" });
        }
        if payment.amount > intent.max_amount {
            return Err(AuthorizationError::AmountExceeded {
                amount: payment.amount,
                cap: intent.max_amount,
            });
        }
        Ok(())
    }

    fn check_not_revoked(&self, mandate_id: &str) -> Result<(), AuthorizationError> {
        if self.revocations.is_revoked(mandate_id) {
            return Err(AuthorizationError::Revoked {
                mandate_id: mandate_id.to_string(),
            });
        }
        Ok(())
    }
}

fn check_structure(mandate: &dyn Mandate) -> Result<(), AuthorizationError> {
    let report = mandate.validate();
    match report.summary_code() {
        None => Ok(()),
        Some(code) => Err(AuthorizationError::Validation {
            mandate_id: mandate.id().to_string(),
            code,
            issues: report.issues().to_vec(),
        }),
    }
}

fn check_consensus(result: &VerificationResult) -> Result<(), AuthorizationError> {
    if result.is_valid {
        Ok(())
    } else {
        Err(AuthorizationError::ConsensusRejected {
            percentage: result.consensus_percentage,
        })
    }
}

fn grant(payment: &PaymentMandate, result: &VerificationResult) -> PaymentAuthorization {
    info!(
        mandate_id = %payment.id,
        amount = payment.amount,
        currency = %payment.currency,
        consensus = result.consensus_percentage,
        "payment authorized"
    );
    PaymentAuthorization {
        mandate_id: payment.id.clone(),
        amount: payment.amount,
        currency: payment.currency.clone(),
        consensus_percentage: result.consensus_percentage,
        authorized_at: Utc::now(),
    }
}

fn deny(payment: &PaymentMandate, err: AuthorizationError) -> AuthorizationError {
    warn!(mandate_id = %payment.id, code = %err.code(), error = %err, "payment authorization denied");
    err
}
