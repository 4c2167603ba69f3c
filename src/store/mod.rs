//! Durable key-value storage for engine-owned state.
//!
//! The engine persists three documents: the dedup ledger, the preferences,
//! and the alert feed. Each is a JSON string under a fixed key. Keys are
//! namespaced per installation by the store implementation.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

pub mod json_file;
pub mod memory;
pub mod sqlite;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub const LEDGER_KEY: &str = "ledger";
pub const PREFERENCES_KEY: &str = "preferences";
pub const FEED_KEY: &str = "feed";

/// A string-valued key-value store. Implementations must be safe to share
/// between the engine tick and the host's read paths.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Read and deserialize a JSON document. A missing key is `Ok(None)`.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize and write a JSON document.
pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let content = serde_json::to_string(value)?;
    store.put(key, &content)
}

/// Store doubles shared by tests across the crate.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Reads succeed with nothing stored; every write fails.
    pub struct BrokenStore;

    impl KvStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn put(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_key_is_none() {
        let store = MemoryStore::new();
        let value: Option<Vec<String>> = load_json(&store, "absent").expect("load");
        assert!(value.is_none());
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        save_json(&store, PREFERENCES_KEY, &vec![1u32, 2, 3]).expect("save");
        let value: Option<Vec<u32>> = load_json(&store, PREFERENCES_KEY).expect("load");
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_corrupt_document_is_serialization_error() {
        let store = MemoryStore::new();
        store.put(LEDGER_KEY, "{not json").expect("put");
        let result: Result<Option<Vec<u32>>, _> = load_json(&store, LEDGER_KEY);
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
