//! In-memory session store with expiry

use crate::StoreError;
use carehero_domain::{now_secs, PatientRecord, SessionStore};
use std::collections::HashMap;
use tracing::debug;

struct Entry {
    record: PatientRecord,
    touched_at: u64,
}

/// Process-wide session map
///
/// Entries expire `ttl_secs` after their last `put`. Expired entries are
/// invisible to `get` and are purged on the next write. When `max_sessions`
/// is reached, inserting a new session evicts the least recently written one.
pub struct InMemorySessionStore {
    entries: HashMap<String, Entry>,
    ttl_secs: Option<u64>,
    max_sessions: Option<usize>,
}

impl InMemorySessionStore {
    /// Create an unbounded store
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            ttl_secs: None,
            max_sessions: None,
        }
    }

    /// Create a store with expiry and a capacity bound
    pub fn with_limits(ttl_secs: Option<u64>, max_sessions: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            ttl_secs,
            max_sessions: max_sessions.map(|m| m.max(1)),
        }
    }

    /// Number of stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &Entry, now: u64) -> bool {
        match self.ttl_secs {
            Some(ttl) => now.saturating_sub(entry.touched_at) > ttl,
            None => false,
        }
    }

    /// Drop every entry that is expired at `now`; returns how many were dropped
    pub fn purge_expired_at(&mut self, now: u64) -> usize {
        let Some(ttl) = self.ttl_secs else {
            return 0;
        };
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.saturating_sub(e.touched_at) <= ttl);
        let purged = before - self.entries.len();
        if purged > 0 {
            debug!(purged, "Expired sessions purged");
        }
        purged
    }

    /// Drop every entry that is expired now
    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(now_secs())
    }

    /// Insert with an explicit write time
    pub fn put_at(&mut self, record: PatientRecord, now: u64) {
        self.purge_expired_at(now);

        let id = record.session_id().to_string();
        if let Some(max) = self.max_sessions {
            if !self.entries.contains_key(&id) && self.entries.len() >= max {
                let oldest = self
                    .entries
                    .iter()
                    .min_by_key(|(_, e)| e.touched_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    debug!(session_id = %oldest, "Session evicted at capacity");
                    self.entries.remove(&oldest);
                }
            }
        }

        self.entries.insert(
            id,
            Entry {
                record,
                touched_at: now,
            },
        );
    }

    /// Lookup with an explicit read time
    pub fn get_at(&self, session_id: &str, now: u64) -> Option<PatientRecord> {
        self.entries
            .get(session_id)
            .filter(|e| !self.is_expired(e, now))
            .map(|e| e.record.clone())
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemorySessionStore {
    type Error = StoreError;

    fn get(&self, session_id: &str) -> Result<Option<PatientRecord>, Self::Error> {
        Ok(self.get_at(session_id, now_secs()))
    }

    fn put(&mut self, record: PatientRecord) -> Result<(), Self::Error> {
        self.put_at(record, now_secs());
        Ok(())
    }

    fn delete(&mut self, session_id: &str) -> Result<bool, Self::Error> {
        Ok(self.entries.remove(session_id).is_some())
    }

    fn session_ids(&self) -> Result<Vec<String>, Self::Error> {
        let now = now_secs();
        let mut ids: Vec<(u64, String)> = self
            .entries
            .iter()
            .filter(|(_, e)| !self.is_expired(e, now))
            .map(|(k, e)| (e.touched_at, k.clone()))
            .collect();
        ids.sort();
        Ok(ids.into_iter().map(|(_, k)| k).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let mut store = InMemorySessionStore::new();
        store.put(PatientRecord::new("a")).unwrap();
        assert_eq!(store.get("a").unwrap().unwrap().session_id(), "a");
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_put_replaces() {
        let mut store = InMemorySessionStore::new();
        let mut record = PatientRecord::new("a");
        store.put(record.clone()).unwrap();
        record.add_symptom("fever");
        store.put(record).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().unwrap().symptoms().len(), 1);
    }

    #[test]
    fn test_ttl_hides_and_purges() {
        let mut store = InMemorySessionStore::with_limits(Some(60), None);
        store.put_at(PatientRecord::new("old"), 1_000);
        store.put_at(PatientRecord::new("new"), 1_050);

        assert!(store.get_at("old", 1_060).is_some());
        assert!(store.get_at("old", 1_061).is_none());

        assert_eq!(store.purge_expired_at(1_061), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut store = InMemorySessionStore::with_limits(None, Some(2));
        store.put_at(PatientRecord::new("a"), 1);
        store.put_at(PatientRecord::new("b"), 2);
        store.put_at(PatientRecord::new("a"), 3);
        store.put_at(PatientRecord::new("c"), 4);

        assert!(store.get_at("b", 5).is_none());
        assert!(store.get_at("a", 5).is_some());
        assert!(store.get_at("c", 5).is_some());
    }

    #[test]
    fn test_delete() {
        let mut store = InMemorySessionStore::new();
        store.put(PatientRecord::new("a")).unwrap();
        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
    }
}
