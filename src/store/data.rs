//! In-memory key/value state with dirty tracking.

use serde_json::Value;

use super::ConfigData;

/// The in-memory document plus its persistence bookkeeping.
///
/// # Dirty Tracking
///
/// `dirty` is set by every mutation and cleared once the document is known
/// to match the file. Every mutation also bumps `generation`; a flush
/// remembers the generation it encoded and only clears `dirty` if no
/// mutation slipped in while the write was in flight.
#[derive(Debug, Default)]
pub(crate) struct Store {
    data: ConfigData,
    dirty: bool,
    generation: u64,
}

impl Store {
    pub(crate) fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub(crate) fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub(crate) const fn data(&self) -> &ConfigData {
        &self.data
    }

    pub(crate) const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) const fn generation(&self) -> u64 {
        self.generation
    }

    /// Inserts or overwrites `key`, returning the previous value.
    pub(crate) fn set(&mut self, key: String, value: Value) -> Option<Value> {
        let previous = self.data.insert(key, value);
        self.touch();
        previous
    }

    /// Removes `key`, returning its value.
    ///
    /// Removing an absent key changes nothing and leaves the dirty flag alone.
    pub(crate) fn delete(&mut self, key: &str) -> Option<Value> {
        let previous = self.data.remove(key)?;
        self.touch();
        Some(previous)
    }

    /// Swaps the whole document, returning the previous one.
    pub(crate) fn replace(&mut self, data: ConfigData) -> ConfigData {
        let previous = std::mem::replace(&mut self.data, data);
        self.touch();
        previous
    }

    /// Installs a document read from the file.
    ///
    /// The result matches the file, so the store is clean afterwards.
    pub(crate) fn load(&mut self, data: ConfigData) -> ConfigData {
        let previous = std::mem::replace(&mut self.data, data);
        self.generation += 1;
        self.dirty = false;
        previous
    }

    /// Clears the dirty flag if nothing changed since `generation` was read.
    ///
    /// Returns whether the flag was cleared.
    pub(crate) fn mark_clean(&mut self, generation: u64) -> bool {
        if self.generation == generation {
            self.dirty = false;
        }
        !self.dirty
    }

    fn touch(&mut self) {
        self.generation += 1;
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_store_is_clean_and_empty() {
        let store = Store::default();

        assert!(!store.is_dirty());
        assert!(store.data().is_empty());
    }

    #[test]
    fn set_returns_previous_and_marks_dirty() {
        let mut store = Store::default();

        assert_eq!(store.set("a".into(), json!(1)), None);
        assert_eq!(store.set("a".into(), json!(2)), Some(json!(1)));
        assert_eq!(store.get("a"), Some(&json!(2)));
        assert!(store.is_dirty());
    }

    #[test]
    fn delete_returns_previous_and_marks_dirty() {
        let mut store = Store::default();
        store.load(ConfigData::from_iter([("a".to_string(), json!(1))]));

        assert_eq!(store.delete("a"), Some(json!(1)));
        assert!(!store.contains_key("a"));
        assert!(store.is_dirty());
    }

    #[test]
    fn delete_absent_key_is_noop() {
        let mut store = Store::default();
        let generation = store.generation();

        assert_eq!(store.delete("missing"), None);
        assert!(!store.is_dirty());
        assert_eq!(store.generation(), generation);
    }

    #[test]
    fn replace_swaps_document() {
        let mut store = Store::default();
        store.set("a".into(), json!(1));

        let previous = store.replace(ConfigData::from_iter([("x".to_string(), json!(true))]));

        assert_eq!(previous.get("a"), Some(&json!(1)));
        assert_eq!(store.get("x"), Some(&json!(true)));
        assert!(!store.contains_key("a"));
        assert!(store.is_dirty());
    }

    #[test]
    fn load_leaves_store_clean() {
        let mut store = Store::default();
        store.set("a".into(), json!(1));

        let previous = store.load(ConfigData::new());

        assert_eq!(previous.get("a"), Some(&json!(1)));
        assert!(!store.is_dirty());
    }

    #[test]
    fn mark_clean_with_current_generation_clears_dirty() {
        let mut store = Store::default();
        store.set("a".into(), json!(1));

        assert!(store.mark_clean(store.generation()));
        assert!(!store.is_dirty());
    }

    #[test]
    fn mark_clean_with_stale_generation_keeps_dirty() {
        let mut store = Store::default();
        store.set("a".into(), json!(1));
        let encoded_at = store.generation();
        store.set("a".into(), json!(2));

        assert!(!store.mark_clean(encoded_at));
        assert!(store.is_dirty());
    }
}
