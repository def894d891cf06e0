use tracing::{debug, error};

use crate::storage::{KeyValueStore, decode_history, encode_history, title_history_key};

pub const HISTORY_CAPACITY: usize = 30;
pub const SUGGESTION_LIMIT: usize = 20;

/// Recently used task titles for one category, most recent first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleHistory {
    category: String,
    entries: Vec<String>,
}

impl TitleHistory {
    #[tracing::instrument(skip(storage))]
    pub fn load<S: KeyValueStore + ?Sized>(storage: &S, category: &str) -> Self {
        let raw = storage.load(&title_history_key(category));
        let mut entries = decode_history(raw.as_deref());
        entries.truncate(HISTORY_CAPACITY);
        debug!(count = entries.len(), "loaded title history");
        Self {
            category: category.to_string(),
            entries,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[tracing::instrument(skip(self, storage), fields(category = %self.category))]
    pub fn push<S: KeyValueStore + ?Sized>(&mut self, storage: &mut S, title: &str) {
        self.entries.retain(|entry| entry != title);
        self.entries.insert(0, title.to_string());
        self.entries.truncate(HISTORY_CAPACITY);
        self.persist(storage);
    }

    /// Entries containing `filter` (case-insensitive), in recency order. An
    /// empty filter matches everything.
    pub fn suggestions(&self, filter: &str) -> Vec<String> {
        let needle = filter.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|entry| needle.is_empty() || entry.to_lowercase().contains(&needle))
            .take(SUGGESTION_LIMIT)
            .cloned()
            .collect()
    }

    fn persist<S: KeyValueStore + ?Sized>(&self, storage: &mut S) {
        let key = title_history_key(&self.category);
        let result = encode_history(&self.entries).and_then(|raw| storage.save(&key, &raw));
        if let Err(err) = result {
            error!(key = %key, error = %err, "failed saving title history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn history(store: &MemoryStore) -> TitleHistory {
        TitleHistory::load(store, "dcard")
    }

    #[test]
    fn push_moves_existing_title_to_front() {
        let mut store = MemoryStore::new();
        let mut h = history(&store);
        h.push(&mut store, "Buy milk");
        h.push(&mut store, "Buy eggs");
        h.push(&mut store, "Buy milk");
        assert_eq!(h.entries(), ["Buy milk", "Buy eggs"]);

        let reloaded = history(&store);
        assert_eq!(reloaded, h);
    }

    #[test]
    fn dedup_is_case_sensitive() {
        let mut store = MemoryStore::new();
        let mut h = history(&store);
        h.push(&mut store, "milk");
        h.push(&mut store, "Milk");
        assert_eq!(h.entries(), ["Milk", "milk"]);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut store = MemoryStore::new();
        let mut h = history(&store);
        for i in 0..31 {
            h.push(&mut store, &format!("task {i}"));
        }
        assert_eq!(h.entries().len(), HISTORY_CAPACITY);
        assert_eq!(h.entries()[0], "task 30");
        assert_eq!(h.entries()[29], "task 1");
        assert!(!h.entries().iter().any(|e| e == "task 0"));
        assert_eq!(history(&store).entries().len(), HISTORY_CAPACITY);
    }

    #[test]
    fn suggestions_filter_case_insensitively_and_cap_results() {
        let mut store = MemoryStore::new();
        let mut h = history(&store);
        for i in 0..25 {
            h.push(&mut store, &format!("Report {i}"));
        }
        h.push(&mut store, "Call mom");

        assert_eq!(h.suggestions("").len(), SUGGESTION_LIMIT);
        assert_eq!(h.suggestions("")[0], "Call mom");
        assert_eq!(h.suggestions("MOM"), vec!["Call mom".to_string()]);
        assert_eq!(h.suggestions("  mom "), vec!["Call mom".to_string()]);
        assert_eq!(h.suggestions("report 2").first().map(String::as_str), Some("Report 24"));
        assert!(h.suggestions("nothing").is_empty());
    }

    #[test]
    fn history_is_scoped_per_category() {
        let mut store = MemoryStore::new();
        let mut a = TitleHistory::load(&store, "a");
        a.push(&mut store, "only in a");
        let b = TitleHistory::load(&store, "b");
        assert!(b.entries().is_empty());
        assert_eq!(b.category(), "b");
    }
}
