//! Structural validation.
//!
//! Validation never touches cryptography and never returns `Err`. It walks
//! every rule and collects each failure as a [`ValidationIssue`], so a caller
//! sees all problems at once instead of the first one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MandateProof;
use crate::config::{CURRENCY_CODE_LENGTH, SIGNATURE_HEX_LENGTH};
use crate::error::ErrorCode;

/// A single failed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: ErrorCode,
    pub field: String,
    pub message: String,
}

/// Outcome of `Mandate::validate`. Empty means structurally valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, code: ErrorCode, field: &str, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            code,
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }

    pub fn has_issue_for(&self, field: &str) -> bool {
        self.issues.iter().any(|i| i.field == field)
    }

    /// The single code that best summarises the report: `EXPIRED_MANDATE`
    /// when expiry is the only problem, `AMOUNT_EXCEEDED` when an amount
    /// overflowed, `VALIDATION_FAILED` otherwise. `None` when valid.
    pub fn summary_code(&self) -> Option<ErrorCode> {
        if self.is_valid() {
            return None;
        }
        if self.issues.iter().all(|i| i.code == ErrorCode::ExpiredMandate) {
            return Some(ErrorCode::ExpiredMandate);
        }
        if self.has_code(ErrorCode::AmountExceeded) {
            return Some(ErrorCode::AmountExceeded);
        }
        Some(ErrorCode::ValidationFailed)
    }
}

// ---------------------------------------------------------------------------
// Shared rules
// ---------------------------------------------------------------------------

pub(crate) fn require_non_empty(report: &mut ValidationReport, field: &str, value: &str) {
    if value.trim().is_empty() {
        report.push(ErrorCode::ValidationFailed, field, format!("{} must not be empty", field));
    }
}

pub(crate) fn require_positive(report: &mut ValidationReport, field: &str, amount: u64) {
    if amount == 0 {
        report.push(ErrorCode::ValidationFailed, field, format!("{} must be greater than zero", field));
    }
}

/// Three uppercase ASCII letters (ISO 4217 shape; not checked against the
/// registry).
pub fn is_currency_code(currency: &str) -> bool {
    currency.len() == CURRENCY_CODE_LENGTH && currency.bytes().all(|b| b.is_ascii_uppercase())
}

pub(crate) fn require_currency(report: &mut ValidationReport, currency: &str) {
    if !is_currency_code(currency) {
        report.push(
            ErrorCode::ValidationFailed,
            "currency",
            "currency must be a 3-letter uppercase code",
        );
    }
}

pub(crate) fn require_future(report: &mut ValidationReport, expires_at: &DateTime<Utc>, now: DateTime<Utc>) {
    if *expires_at <= now {
        report.push(ErrorCode::ExpiredMandate, "expires_at", "mandate has expired");
    }
}

/// Signature present and shaped as 128 lowercase hex chars; signer present.
/// Shape only. Whether the signature verifies is a separate question.
pub(crate) fn require_proof(report: &mut ValidationReport, proof: Option<&MandateProof>) {
    let Some(proof) = proof else {
        report.push(ErrorCode::ValidationFailed, "signature", "mandate is not signed");
        return;
    };
    let well_formed = proof.signature.len() == SIGNATURE_HEX_LENGTH
        && proof
            .signature
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !well_formed {
        report.push(
            ErrorCode::ValidationFailed,
            "signature",
            "signature must be 128 lowercase hex characters",
        );
    }
    if proof.signer.trim().is_empty() {
        report.push(ErrorCode::ValidationFailed, "signer", "signer must not be empty");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn empty_report_is_valid() {
        let report = ValidationReport::new();
        assert!(report.is_valid());
        assert_eq!(report.summary_code(), None);
    }

    #[test]
    fn currency_shape() {
        assert!(is_currency_code("USD"));
        assert!(!is_currency_code("usd"));
        assert!(!is_currency_code("US"));
        assert!(!is_currency_code("USDT"));
        assert!(!is_currency_code("U$D"));
    }

    #[test]
    fn expiry_alone_summarises_as_expired() {
        let now = Utc::now();
        let mut report = ValidationReport::new();
        require_future(&mut report, &(now - Duration::seconds(1)), now);
        assert_eq!(report.summary_code(), Some(ErrorCode::ExpiredMandate));

        require_positive(&mut report, "amount", 0);
        assert_eq!(report.summary_code(), Some(ErrorCode::ValidationFailed));
    }

    #[test]
    fn expiry_boundary_is_expired() {
        let now = Utc::now();
        let mut report = ValidationReport::new();
        require_future(&mut report, &now, now);
        assert!(report.has_code(ErrorCode::ExpiredMandate));
    }

    #[test]
    fn proof_shape_checks() {
        let mut report = ValidationReport::new();
        require_proof(&mut report, None);
        assert!(report.has_issue_for("signature"));

        let mut report = ValidationReport::new();
        require_proof(
            &mut report,
            Some(&MandateProof {
                signature: "AB".repeat(64),
                signer: String::new(),
            }),
        );
        assert!(report.has_issue_for("signature"));
        assert!(report.has_issue_for("signer"));

        let mut report = ValidationReport::new();
        require_proof(
            &mut report,
            Some(&MandateProof {
                signature: "ab".repeat(64),
                signer: "did:key:z6Mk".into(),
            }),
        );
        assert!(report.is_valid());
    }

    #[test]
    fn whitespace_only_is_empty() {
        let mut report = ValidationReport::new();
        require_non_empty(&mut report, "merchant", "   ");
        assert!(report.has_issue_for("merchant"));
    }
}
