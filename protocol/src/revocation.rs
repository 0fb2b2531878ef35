//! # Revocation Store
//!
//! Process-scoped map from mandate id to [`RevocationRecord`]. Revocation is
//! terminal: re-revoking overwrites the reason and timestamp but nothing
//! ever un-revokes, and nothing expires.
//!
//! The consensus system does not consult this store. Callers check it
//! explicitly (directly, or through [`crate::authorization::ExecutionGuard`]).
//! Share one instance via `Arc`; `DashMap` gives concurrent reads and an
//! atomic per-key overwrite.
//!
//! State lives only as long as the process. A deployment that needs
//! revocations to survive restarts backs this with a durable store.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRecord {
    pub mandate_id: String,
    pub revoked_at: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct RevocationStore {
    records: DashMap<String, RevocationRecord>,
}

impl RevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revoke `mandate_id`, replacing any earlier record for it.
    pub fn revoke(&self, mandate_id: &str, reason: &str) -> RevocationRecord {
        let record = RevocationRecord {
            mandate_id: mandate_id.to_string(),
            revoked_at: Utc::now(),
            reason: reason.to_string(),
        };
        let previous = self.records.insert(mandate_id.to_string(), record.clone());
        info!(
            mandate_id,
            reason,
            overwrite = previous.is_some(),
            "mandate revoked"
        );
        record
    }

    pub fn is_revoked(&self, mandate_id: &str) -> bool {
        self.records.contains_key(mandate_id)
    }

    pub fn get(&self, mandate_id: &str) -> Option<RevocationRecord> {
        self.records.get(mandate_id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn revoke_then_lookup() {
        let store = RevocationStore::new();
        assert!(!store.is_revoked("m-1"));

        let record = store.revoke("m-1", "card reported stolen");
        assert!(store.is_revoked("m-1"));
        assert_eq!(store.get("m-1"), Some(record));
        assert!(!store.is_revoked("m-2"));
    }

    #[test]
    fn re_revoking_overwrites_but_stays_revoked() {
        let store = RevocationStore::new();
        let first = store.revoke("m-1", "first");
        let second = store.revoke("m-1", "second");

        assert!(store.is_revoked("m-1"));
        assert_eq!(store.len(), 1);
        let stored = store.get("m-1").unwrap();
        assert_eq!(stored.reason, "second");
        assert!(stored.revoked_at >= first.revoked_at);
        assert_eq!(stored, second);
    }

    #[test]
    fn unknown_id_has_no_record() {
        let store = RevocationStore::new();
        assert!(store.get("nope").is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn concurrent_revocations_are_all_visible() {
        let store = Arc::new(RevocationStore::new());
        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store.revoke(&format!("m-{}", i % 8), &format!("reason {}", i));
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.len(), 8);
        for i in 0..8 {
            assert!(store.is_revoked(&format!("m-{}", i)));
        }
    }
}
