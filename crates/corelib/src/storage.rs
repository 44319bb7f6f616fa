//! In-memory storage engine.
//!
//! A concurrent map from key to value that also remembers each key's token,
//! so migration and replication can enumerate a hash range without
//! rehashing every key.

use crate::partitioner::{Md5Partitioner, Partitioner};
use crate::ring::HashRange;
use crate::token::Md5Token;
use dashmap::DashMap;

#[derive(Clone, Debug)]
struct StoredValue {
    token: Md5Token,
    value: String,
}

/// Result of a write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutOutcome {
    Inserted,
    Updated,
}

/// Thread-safe key-value map. Single-key operations are atomic.
#[derive(Debug, Default)]
pub struct Storage {
    entries: DashMap<String, StoredValue>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|stored| stored.value.clone())
    }

    pub fn put(&self, key: &str, value: &str) -> PutOutcome {
        let stored = StoredValue {
            token: Md5Partitioner.key_token(key),
            value: value.to_string(),
        };
        match self.entries.insert(key.to_string(), stored) {
            Some(_) => PutOutcome::Updated,
            None => PutOutcome::Inserted,
        }
    }

    /// Removes `key`, returning its previous value.
    pub fn delete(&self, key: &str) -> Option<String> {
        self.entries.remove(key).map(|(_, stored)| stored.value)
    }

    /// Snapshot of every pair whose key hashes into `range`, sorted by key.
    pub fn entries_in(&self, range: &HashRange) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .entries
            .iter()
            .filter(|entry| range.contains(entry.value().token))
            .map(|entry| (entry.key().clone(), entry.value().value.clone()))
            .collect();
        pairs.sort();
        pairs
    }

    /// Drops every key whose hash falls in `range`. Returns how many went.
    pub fn remove_range(&self, range: &HashRange) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, stored| !range.contains(stored.token));
        before.saturating_sub(self.entries.len())
    }

    pub fn remove_keys<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> usize {
        keys.into_iter()
            .filter(|key| self.entries.remove(*key).is_some())
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token;

    #[test]
    fn test_put_get_delete() {
        let storage = Storage::new();
        assert_eq!(storage.put("foo", "bar"), PutOutcome::Inserted);
        assert_eq!(storage.put("foo", "baz"), PutOutcome::Updated);
        assert_eq!(storage.get("foo").as_deref(), Some("baz"));
        assert_eq!(storage.delete("foo").as_deref(), Some("baz"));
        assert_eq!(storage.get("foo"), None);
        assert_eq!(storage.delete("foo"), None);
    }

    #[test]
    fn test_range_queries() {
        let storage = Storage::new();
        for i in 0..50 {
            storage.put(&format!("key-{}", i), "v");
        }
        let pivot = Md5Token::from_key("key-7");
        let low = HashRange::new(Md5Token::zero(), pivot);
        let high = HashRange::new(pivot.successor(), Md5Token::MAX);

        let low_count = storage.entries_in(&low).len();
        let high_count = storage.entries_in(&high).len();
        assert_eq!(low_count + high_count, 50);
        assert!(storage.entries_in(&low).iter().any(|(k, _)| k == "key-7"));

        assert_eq!(storage.remove_range(&low), low_count);
        assert_eq!(storage.len(), high_count);
        assert!(storage.entries_in(&low).is_empty());
    }

    #[test]
    fn test_remove_keys_counts_hits() {
        let storage = Storage::new();
        storage.put("a", "1");
        storage.put("b", "2");
        assert_eq!(storage.remove_keys(["a", "missing"]), 1);
        assert_eq!(storage.len(), 1);
    }
}
