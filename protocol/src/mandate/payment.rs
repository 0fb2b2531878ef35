//! Payment mandates: a concrete charge with a lifecycle.
//!
//! `status` and `processed_at` are lifecycle fields. They change after the
//! holder signs (an executor reports progress), so they are excluded from
//! the canonical bytes and a status change never invalidates the proof.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::canonical::CanonicalEncoder;
use super::types::{PaymentResponse, PaymentStatus};
use super::validation::{self, ValidationReport};
use super::{default_expiry, new_mandate_id, Mandate, MandateError, MandateKind, MandateProof};

/// Signed field order.
pub const PAYMENT_FIELDS: &[&str] = &[
    "id",
    "cart_mandate_id",
    "holder",
    "source",
    "merchant",
    "amount",
    "currency",
    "expires_at",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMandate {
    pub id: String,
    /// Cart this payment settles, when there is one.
    #[serde(default)]
    pub cart_mandate_id: Option<String>,
    pub holder: String,
    /// Funding source (card token, account reference).
    pub source: String,
    pub merchant: String,
    pub amount: u64,
    pub currency: String,
    pub expires_at: DateTime<Utc>,
    status: PaymentStatus,
    #[serde(default)]
    processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub proof: Option<MandateProof>,
}

impl PaymentMandate {
    pub fn new(
        holder: impl Into<String>,
        source: impl Into<String>,
        merchant: impl Into<String>,
        amount: u64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: new_mandate_id(),
            cart_mandate_id: None,
            holder: holder.into(),
            source: source.into(),
            merchant: merchant.into(),
            amount,
            currency: currency.into(),
            expires_at: default_expiry(),
            status: PaymentStatus::Pending,
            processed_at: None,
            proof: None,
        }
    }

    pub fn with_cart(mut self, cart_mandate_id: impl Into<String>) -> Self {
        self.cart_mandate_id = Some(cart_mandate_id.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    /// When the mandate first left `Pending`.
    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn transition(&mut self, to: PaymentStatus) -> Result<(), MandateError> {
        self.transition_at(to, Utc::now())
    }

    /// Move to `to` if the state machine allows it. The first move out of
    /// `Pending` stamps `processed_at`.
    pub fn transition_at(&mut self, to: PaymentStatus, now: DateTime<Utc>) -> Result<(), MandateError> {
        if !self.status.can_transition_to(to) {
            warn!(mandate_id = %self.id, from = %self.status, to = %to, "rejected payment status transition");
            return Err(MandateError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        if self.status == PaymentStatus::Pending && self.processed_at.is_none() {
            self.processed_at = Some(now);
        }
        debug!(mandate_id = %self.id, from = %self.status, to = %to, "payment status changed");
        self.status = to;
        Ok(())
    }

    /// Fold a transport response into the lifecycle. A response repeating
    /// the current status is a no-op. Amount and currency must match the
    /// mandate.
    pub fn apply_response(&mut self, response: &PaymentResponse) -> Result<(), MandateError> {
        if response.amount != self.amount {
            return Err(MandateError::ResponseMismatch("amount"));
        }
        if response.currency != self.currency {
            return Err(MandateError::ResponseMismatch("currency"));
        }
        if response.status == self.status {
            return Ok(());
        }
        self.transition_at(response.status, response.timestamp)
    }
}

impl Mandate for PaymentMandate {
    fn kind(&self) -> MandateKind {
        MandateKind::Payment
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    fn canonical_bytes(&self) -> Vec<u8> {
        let mut enc = CanonicalEncoder::new(MandateKind::Payment, PAYMENT_FIELDS);
        enc.str("id", &self.id)
            .opt_str("cart_mandate_id", self.cart_mandate_id.as_deref())
            .str("holder", &self.holder)
            .str("source", &self.source)
            .str("merchant", &self.merchant)
            .u64("amount", self.amount)
            .str("currency", &self.currency)
            .timestamp("expires_at", &self.expires_at);
        enc.finish()
    }

    fn proof(&self) -> Option<&MandateProof> {
        self.proof.as_ref()
    }

    fn set_proof(&mut self, proof: MandateProof) {
        self.proof = Some(proof);
    }

    fn validate_at(&self, now: DateTime<Utc>) -> ValidationReport {
        let mut report = ValidationReport::new();
        validation::require_non_empty(&mut report, "id", &self.id);
        validation::require_non_empty(&mut report, "holder", &self.holder);
        validation::require_non_empty(&mut report, "source", &self.source);
        validation::require_non_empty(&mut report, "merchant", &self.merchant);
        if let Some(cart_id) = &self.cart_mandate_id {
            validation::require_non_empty(&mut report, "cart_mandate_id", cart_id);
        }
        validation::require_positive(&mut report, "amount", self.amount);
        validation::require_currency(&mut report, &self.currency);
        validation::require_future(&mut report, &self.expires_at, now);
        validation::require_proof(&mut report, self.proof.as_ref());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::identity::AgentIdentity;
    use chrono::{Duration, TimeZone};

    fn sample() -> PaymentMandate {
        PaymentMandate::new("holder-1", "card:tok_123", "merchant-1", 9_900, "USD")
    }

    #[test]
    fn starts_pending_and_unprocessed() {
        let p = sample();
        assert_eq!(p.status(), PaymentStatus::Pending);
        assert!(p.processed_at().is_none());
        assert!(!p.is_complete());
    }

    #[test]
    fn first_transition_stamps_processed_at_once() {
        let mut p = sample();
        let t1 = Utc.timestamp_millis_opt(1_800_000_000_000).unwrap();
        let t2 = t1 + Duration::seconds(30);

        p.transition_at(PaymentStatus::Submitted, t1).unwrap();
        assert_eq!(p.processed_at(), Some(t1));

        p.transition_at(PaymentStatus::Captured, t2).unwrap();
        assert_eq!(p.processed_at(), Some(t1));
        assert!(p.is_complete());
    }

    #[test]
    fn illegal_transition_is_invalid_mandate() {
        let mut p = sample();
        let err = p.transition(PaymentStatus::Refunded).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidMandate);
        assert_eq!(p.status(), PaymentStatus::Pending);
        assert!(p.processed_at().is_none());
    }

    #[test]
    fn refund_after_capture() {
        let mut p = sample();
        p.transition(PaymentStatus::Submitted).unwrap();
        p.transition(PaymentStatus::Captured).unwrap();
        p.transition(PaymentStatus::Refunded).unwrap();
        assert!(p.is_complete());
        assert!(p.transition(PaymentStatus::Captured).is_err());
    }

    #[test]
    fn lifecycle_does_not_touch_signature() {
        let holder = AgentIdentity::generate().unwrap();
        let mut p = sample();
        p.sign(&holder).unwrap();
        p.transition(PaymentStatus::Submitted).unwrap();
        assert!(p.verify(&holder));
    }

    #[test]
    fn amount_edit_breaks_signature() {
        let holder = AgentIdentity::generate().unwrap();
        let mut p = sample();
        p.sign(&holder).unwrap();
        p.amount = 1;
        assert!(!p.verify(&holder));
    }

    #[test]
    fn cart_link_is_signed() {
        let a = sample();
        let b = a.clone().with_cart("cart-1");
        assert_ne!(a.canonical_bytes(), b.canonical_bytes());
    }

    #[test]
    fn apply_response_drives_lifecycle() {
        let mut p = sample();
        let at = Utc.timestamp_millis_opt(1_800_000_000_000).unwrap();
        let resp = PaymentResponse {
            transaction_id: "tx-9".into(),
            status: PaymentStatus::Submitted,
            amount: 9_900,
            currency: "USD".into(),
            timestamp: at,
        };
        p.apply_response(&resp).unwrap();
        p.apply_response(&resp).unwrap();
        assert_eq!(p.status(), PaymentStatus::Submitted);
        assert_eq!(p.processed_at(), Some(at));
    }

    #[test]
    fn apply_response_rejects_mismatch() {
        let mut p = sample();
        let resp = PaymentResponse {
            transaction_id: "tx-9".into(),
            status: PaymentStatus::Submitted,
            amount: 1,
            currency: "USD".into(),
            timestamp: Utc::now(),
        };
        let err = p.apply_response(&resp).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidMandate);
        assert_eq!(p.status(), PaymentStatus::Pending);
    }

    #[test]
    fn validation_collects_every_issue() {
        let mut p = PaymentMandate::new("", "src", "m", 0, "usd");
        p.expires_at = Utc::now() - Duration::hours(1);
        let report = p.validate();
        for field in ["holder", "amount", "currency", "expires_at", "signature"] {
            assert!(report.has_issue_for(field), "missing issue for {}", field);
        }
    }

    #[test]
    fn json_roundtrip_preserves_lifecycle() {
        let mut p = sample();
        p.transition(PaymentStatus::Submitted).unwrap();
        let restored = PaymentMandate::from_json(&p.to_json().unwrap()).unwrap();
        assert_eq!(restored.status(), PaymentStatus::Submitted);
        assert_eq!(restored.processed_at(), p.processed_at());
    }
}
