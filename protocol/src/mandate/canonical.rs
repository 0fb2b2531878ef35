//! Canonical byte encoding of mandates.
//!
//! Signer and verifier must produce identical bytes or verification fails
//! silently, so the encoding never depends on struct layout, map ordering
//! or serde settings. Layout:
//!
//! ```text
//! u32 LE len || "ap2.mandate.<kind>.v<CANONICAL_VERSION>"
//! repeated, in the kind's fixed field order:
//!     u32 LE len || key bytes
//!     u32 LE len || value bytes
//! ```
//!
//! Values: strings as UTF-8, amounts as u64 LE, timestamps as i64 LE Unix
//! seconds followed by u32 LE subsecond nanoseconds, quantities as u32 LE. An optional value starts with a
//! presence byte (`0x00` absent, `0x01` present). A cart item list is a u32
//! LE count followed by each item's sku, name, quantity and unit price, the
//! strings themselves length-prefixed.
//!
//! Each mandate module declares its field order as a constant slice and the
//! encoder checks every key against it in debug builds.

use chrono::{DateTime, Utc};

use super::types::CartItem;
use super::MandateKind;
use crate::config::CANONICAL_VERSION;

/// Builds the canonical byte string of one mandate.
pub struct CanonicalEncoder {
    buf: Vec<u8>,
    order: &'static [&'static str],
    next: usize,
}

impl CanonicalEncoder {
    /// Start an encoding for `kind`. `order` is the kind's field order; keys
    /// written later must follow it exactly.
    pub fn new(kind: MandateKind, order: &'static [&'static str]) -> Self {
        let mut encoder = Self {
            buf: Vec::with_capacity(256),
            order,
            next: 0,
        };
        let tag = domain_tag(kind);
        write_chunk(&mut encoder.buf, tag.as_bytes());
        encoder
    }

    pub fn str(&mut self, key: &'static str, value: &str) -> &mut Self {
        self.field(key, value.as_bytes())
    }

    pub fn opt_str(&mut self, key: &'static str, value: Option<&str>) -> &mut Self {
        match value {
            Some(v) => {
                let mut bytes = Vec::with_capacity(v.len() + 1);
                bytes.push(0x01);
                bytes.extend_from_slice(v.as_bytes());
                self.field(key, &bytes)
            }
            None => self.field(key, &[0x00]),
        }
    }

    pub fn u64(&mut self, key: &'static str, value: u64) -> &mut Self {
        self.field(key, &value.to_le_bytes())
    }

    /// Full precision: two instants that differ by a nanosecond encode
    /// differently.
    pub fn timestamp(&mut self, key: &'static str, value: &DateTime<Utc>) -> &mut Self {
        let mut bytes = [0u8; 12];
        bytes[..8].copy_from_slice(&value.timestamp().to_le_bytes());
        bytes[8..].copy_from_slice(&value.timestamp_subsec_nanos().to_le_bytes());
        self.field(key, &bytes)
    }

    pub fn items(&mut self, key: &'static str, items: &[CartItem]) -> &mut Self {
        let mut bytes = Vec::with_capacity(4 + items.len() * 48);
        bytes.extend_from_slice(&(items.len() as u32).to_le_bytes());
        for item in items {
            write_chunk(&mut bytes, item.sku.as_bytes());
            write_chunk(&mut bytes, item.name.as_bytes());
            bytes.extend_from_slice(&item.quantity.to_le_bytes());
            bytes.extend_from_slice(&item.unit_price.to_le_bytes());
        }
        self.field(key, &bytes)
    }

    pub fn finish(self) -> Vec<u8> {
        debug_assert_eq!(
            self.next,
            self.order.len(),
            "canonical encoding ended before all fields were written"
        );
        self.buf
    }

    fn field(&mut self, key: &'static str, value: &[u8]) -> &mut Self {
        debug_assert_eq!(
            self.order.get(self.next).copied(),
            Some(key),
            "canonical field written out of order"
        );
        self.next += 1;
        write_chunk(&mut self.buf, key.as_bytes());
        write_chunk(&mut self.buf, value);
        self
    }
}

/// `ap2.mandate.<kind>.v<version>`
pub fn domain_tag(kind: MandateKind) -> String {
    format!("ap2.mandate.{}.v{}", kind.as_str(), CANONICAL_VERSION)
}

fn write_chunk(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}
