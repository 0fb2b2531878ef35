//! Cart mandates: a concrete item list with a derived total.
//!
//! The total is never settable. It is computed from the items at
//! construction, after every item change, and on deserialization (an
//! incoming `total` field is ignored). Items are reachable only through a
//! shared slice, so the list and its total cannot drift apart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::canonical::CanonicalEncoder;
use super::types::{checked_cart_total, CartItem};
use super::validation::{self, ValidationReport};
use super::{default_expiry, new_mandate_id, Mandate, MandateKind, MandateProof};
use crate::error::ErrorCode;

/// Signed field order. The total is derived, so it is not signed on its own.
pub const CART_FIELDS: &[&str] = &["id", "customer", "merchant", "items", "currency", "expires_at"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CartMandateWire")]
pub struct CartMandate {
    pub id: String,
    pub customer: String,
    pub merchant: String,
    items: Vec<CartItem>,
    total: u64,
    pub currency: String,
    pub expires_at: DateTime<Utc>,
    pub proof: Option<MandateProof>,
}

/// Inbound JSON shape. `total` is accepted and dropped.
#[derive(Deserialize)]
struct CartMandateWire {
    id: String,
    customer: String,
    merchant: String,
    #[serde(default)]
    items: Vec<CartItem>,
    #[serde(default)]
    #[allow(dead_code)]
    total: Option<u64>,
    currency: String,
    expires_at: DateTime<Utc>,
    #[serde(default)]
    proof: Option<MandateProof>,
}

impl From<CartMandateWire> for CartMandate {
    fn from(wire: CartMandateWire) -> Self {
        let total = derive_total(&wire.items);
        Self {
            id: wire.id,
            customer: wire.customer,
            merchant: wire.merchant,
            items: wire.items,
            total,
            currency: wire.currency,
            expires_at: wire.expires_at,
            proof: wire.proof,
        }
    }
}

/// Overflow saturates; `validate` reports it as `AMOUNT_EXCEEDED`.
fn derive_total(items: &[CartItem]) -> u64 {
    checked_cart_total(items).unwrap_or(u64::MAX)
}

impl CartMandate {
    pub fn new(
        customer: impl Into<String>,
        merchant: impl Into<String>,
        items: Vec<CartItem>,
        currency: impl Into<String>,
    ) -> Self {
        let total = derive_total(&items);
        Self {
            id: new_mandate_id(),
            customer: customer.into(),
            merchant: merchant.into(),
            items,
            total,
            currency: currency.into(),
            expires_at: default_expiry(),
            proof: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Σ(quantity × unit_price). `u64::MAX` if the sum overflowed.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn add_item(&mut self, item: CartItem) {
        self.items.push(item);
        self.total = derive_total(&self.items);
    }

    pub fn set_items(&mut self, items: Vec<CartItem>) {
        self.total = derive_total(&items);
        self.items = items;
    }
}

impl Mandate for CartMandate {
    fn kind(&self) -> MandateKind {
        MandateKind::Cart
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    fn canonical_bytes(&self) -> Vec<u8> {
        let mut enc = CanonicalEncoder::new(MandateKind::Cart, CART_FIELDS);
        enc.str("id", &self.id)
            .str("customer", &self.customer)
            .str("merchant", &self.merchant)
            .items("items", &self.items)
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

        if self.items.is_empty() {
            report.push(ErrorCode::ValidationFailed, "items", "cart must contain at least one item");
        }
        for (i, item) in self.items.iter().enumerate() {
            if item.quantity == 0 {
                report.push(
                    ErrorCode::ValidationFailed,
                    &format!("items[{}].quantity", i),
                    "quantity must be greater than zero",
                );
            }
            if item.sku.trim().is_empty() {
                report.push(ErrorCode::ValidationFailed, &format!("items[{}].sku", i), "sku must not be empty");
            }
            if item.name.trim().is_empty() {
                report.push(ErrorCode::ValidationFailed, &format!("items[{}].name", i), "name must not be empty");
            }
        }

        match checked_cart_total(&self.items) {
            None => report.push(ErrorCode::AmountExceeded, "total", "cart total overflows"),
            Some(total) if !self.items.is_empty() => {
                validation::require_positive(&mut report, "total", total)
            }
            Some(_) => {}
        }

        validation::require_currency(&mut report, &self.currency);
        validation::require_future(&mut report, &self.expires_at, now);
        validation::require_proof(&mut report, self.proof.as_ref());
        report
    }
}
