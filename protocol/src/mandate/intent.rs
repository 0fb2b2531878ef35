//! Intent mandates: a spending cap for a described purpose.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::canonical::CanonicalEncoder;
use super::validation::{self, ValidationReport};
use super::{default_expiry, new_mandate_id, Mandate, MandateKind, MandateProof};

/// Signed field order. Changing it breaks every existing signature.
pub const INTENT_FIELDS: &[&str] = &[
    "id",
    "customer",
    "merchant",
    "description",
    "max_amount",
    "currency",
    "expires_at",
];

/// "`customer` may spend up to `max_amount` at `merchant` for
/// `description`, until `expires_at`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentMandate {
    pub id: String,
    pub customer: String,
    pub merchant: String,
    pub description: String,
    /// Spending cap, smallest currency unit.
    pub max_amount: u64,
    pub currency: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub proof: Option<MandateProof>,
}

impl IntentMandate {
    /// New unsigned intent with a fresh id and the default expiry.
    pub fn new(
        customer: impl Into<String>,
        merchant: impl Into<String>,
        description: impl Into<String>,
        max_amount: u64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: new_mandate_id(),
            customer: customer.into(),
            merchant: merchant.into(),
            description: description.into(),
            max_amount,
            currency: currency.into(),
            expires_at: default_expiry(),
            proof: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = expires_at;
        self
    }
}

impl Mandate for IntentMandate {
    fn kind(&self) -> MandateKind {
        MandateKind::Intent
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    fn canonical_bytes(&self) -> Vec<u8> {
        let mut enc = CanonicalEncoder::new(MandateKind::Intent, INTENT_FIELDS);
        enc.str("id", &self.id)
            .str("customer", &self.customer)
            .str("merchant", &self.merchant)
            .str("description", &self.description)
            .u64("max_amount", self.max_amount)
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
        validation::require_non_empty(&mut report, "customer", &self.customer);
        validation::require_non_empty(&mut report, "merchant", &self.merchant);
        validation::require_positive(&mut report, "max_amount", self.max_amount);
        validation::require_currency(&mut report, &self.currency);
        validation::require_future(&mut report, &self.expires_at, now);
        validation::require_proof(&mut report, self.proof.as_ref());
        report
    }
}
