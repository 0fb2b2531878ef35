//! Value types shared by the mandate variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// CartItem
// ---------------------------------------------------------------------------

/// One line of a cart. Prices are in the smallest currency unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub sku: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: u64,
}

impl CartItem {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, quantity: u32, unit_price: u64) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            quantity,
            unit_price,
        }
    }

    /// `quantity × unit_price`, or `None` on overflow.
    pub fn line_total(&self) -> Option<u64> {
        self.unit_price.checked_mul(u64::from(self.quantity))
    }
}

/// Σ(quantity × unit_price) over `items`, or `None` if any step overflows.
pub fn checked_cart_total(items: &[CartItem]) -> Option<u64> {
    items
        .iter()
        .try_fold(0u64, |acc, item| acc.checked_add(item.line_total()?))
}

// ---------------------------------------------------------------------------
// PaymentStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a payment mandate.
///
/// ```text
/// Pending ──► Submitted ──► Captured ──► Refunded
///    │            │
///    ├──► Failed ◄┤
///    └─► Cancelled◄┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Created, not yet handed to an executor.
    Pending,
    /// Handed to an executor, outcome unknown.
    Submitted,
    Captured,
    Failed,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    /// Terminal set: `Captured`, `Failed`, `Cancelled`, `Refunded`.
    ///
    /// `Captured` is terminal for the purpose of completion even though a
    /// later refund is still a legal transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Captured | Self::Failed | Self::Cancelled | Self::Refunded
        )
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Submitted)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Submitted, Captured)
                | (Submitted, Failed)
                | (Submitted, Cancelled)
                | (Captured, Refunded)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Submitted => write!(f, "submitted"),
            Self::Captured => write!(f, "captured"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}

// ---------------------------------------------------------------------------
// PaymentResponse
// ---------------------------------------------------------------------------

/// What a transport collaborator hands back after attempting a payment.
/// Field names follow that collaborator's camelCase JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub transaction_id: String,
    pub status: PaymentStatus,
    pub amount: u64,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
}
