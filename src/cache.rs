// ⏱️ Snapshot Cache - Short-lived memo of computed records
//
// Keyed by (entity_id, scope) where scope is a pathway for ledger units or
// the entity type for identities. Every hit renews the expiry. Callers must
// invalidate after each successful mutation; stale entries only cost
// latency, never correctness.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct CachedSnapshot<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SnapshotCache<T> {
    entries: HashMap<(String, String), CachedSnapshot<T>>,
    ttl: Duration,
}

impl<T: Clone> SnapshotCache<T> {
    /// TTLs beyond what chrono can represent saturate to the maximum
    pub fn new(ttl_secs: u64) -> Self {
        let ttl = i64::try_from(ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        SnapshotCache {
            entries: HashMap::new(),
            ttl,
        }
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn put(&mut self, entity_id: &str, scope: &str, value: T) {
        self.put_at(entity_id, scope, value, Utc::now());
    }

    pub fn put_at(&mut self, entity_id: &str, scope: &str, value: T, now: DateTime<Utc>) {
        self.entries.insert(
            (entity_id.to_string(), scope.to_string()),
            CachedSnapshot {
                value,
                expires_at: self.expiry_from(now),
            },
        );
    }

    pub fn get(&mut self, entity_id: &str, scope: &str) -> Option<T> {
        self.get_at(entity_id, scope, Utc::now())
    }

    /// Fresh value, renewing its expiry; expired entries are dropped
    pub fn get_at(&mut self, entity_id: &str, scope: &str, now: DateTime<Utc>) -> Option<T> {
        let key = (entity_id.to_string(), scope.to_string());
        let renewed = self.expiry_from(now);
        let expired = match self.entries.get_mut(&key) {
            None => return None,
            Some(entry) if entry.expires_at > now => {
                entry.expires_at = renewed;
                return Some(entry.value.clone());
            }
            Some(_) => true,
        };
        if expired {
            self.entries.remove(&key);
        }
        None
    }

    pub fn invalidate(&mut self, entity_id: &str, scope: &str) {
        self.entries
            .remove(&(entity_id.to_string(), scope.to_string()));
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
