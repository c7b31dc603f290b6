//! Installation-wide record of passages already shown, used to avoid repeats across races.

use crate::error::StoreError;
use crate::store::KeyValueStore;
use std::collections::HashSet;
use tracing::warn;

pub const USED_TEXTS_KEY: &str = "used_texts";

/// Thin wrapper over a [`KeyValueStore`] holding the used-text set as a JSON array.
///
/// Every operation is best-effort: a failing store degrades to "nothing used yet"
/// and writes are dropped with a warning.
pub struct UsedTextRegistry;

impl UsedTextRegistry {
    pub fn try_load(store: &dyn KeyValueStore) -> Result<HashSet<String>, StoreError> {
        match store.get(USED_TEXTS_KEY)? {
            Some(raw) => {
                let texts: Vec<String> = serde_json::from_str(&raw)?;
                Ok(texts.into_iter().collect())
            }
            None => Ok(HashSet::new()),
        }
    }

    pub fn load(store: &dyn KeyValueStore) -> HashSet<String> {
        Self::try_load(store).unwrap_or_else(|err| {
            warn!("unable to read used text registry: {err}");
            HashSet::new()
        })
    }

    pub fn try_save(store: &mut dyn KeyValueStore, texts: &HashSet<String>) -> Result<(), StoreError> {
        let mut sorted: Vec<&String> = texts.iter().collect();
        sorted.sort();
        let raw = serde_json::to_string(&sorted)?;
        store.set(USED_TEXTS_KEY, &raw)
    }

    pub fn save(store: &mut dyn KeyValueStore, texts: &HashSet<String>) {
        if let Err(err) = Self::try_save(store, texts) {
            warn!("unable to write used text registry: {err}");
        }
    }

    pub fn clear(store: &mut dyn KeyValueStore) {
        if let Err(err) = store.remove(USED_TEXTS_KEY) {
            warn!("unable to clear used text registry: {err}");
        }
    }

    /// Add one passage and persist immediately
    pub fn record(store: &mut dyn KeyValueStore, mut known: HashSet<String>, text: &str) -> HashSet<String> {
        known.insert(text.to_string());
        Self::save(store, &known);
        known
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FailingStore, MemoryStore};

    #[test]
    fn test_load_empty_store() {
        let store = MemoryStore::new();
        assert!(UsedTextRegistry::load(&store).is_empty());
    }

    #[test]
    fn test_record_persists() {
        let mut store = MemoryStore::new();
        let known = UsedTextRegistry::record(&mut store, HashSet::new(), "first passage");
        let known = UsedTextRegistry::record(&mut store, known, "second passage");
        assert_eq!(known.len(), 2);

        let loaded = UsedTextRegistry::load(&store);
        assert!(loaded.contains("first passage"));
        assert!(loaded.contains("second passage"));
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut store = MemoryStore::new();
        UsedTextRegistry::record(&mut store, HashSet::new(), "text");
        UsedTextRegistry::clear(&mut store);
        assert!(UsedTextRegistry::load(&store).is_empty());
    }

    #[test]
    fn test_corrupt_value_degrades_to_empty() {
        let mut store = MemoryStore::new();
        store.set(USED_TEXTS_KEY, "{not json").unwrap();
        assert!(UsedTextRegistry::try_load(&store).is_err());
        assert!(UsedTextRegistry::load(&store).is_empty());
    }

    #[test]
    fn test_failing_store_is_not_fatal() {
        let mut store = FailingStore;
        assert!(UsedTextRegistry::load(&store).is_empty());
        let known = UsedTextRegistry::record(&mut store, HashSet::new(), "text");
        assert!(known.contains("text"));
        UsedTextRegistry::clear(&mut store);
    }
}
