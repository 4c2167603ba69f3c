//! One JSON file per key under the state directory (`~/.bidwatch` by
//! default), named `<namespace>.<key>.json`.

use std::fs;
use std::path::{Path, PathBuf};

use super::KvStore;
use crate::error::StoreError;

pub struct JsonFileStore {
    dir: PathBuf,
    namespace: String,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>, namespace: &str) -> Result<Self, StoreError> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        if fs::metadata(&dir)?.permissions().readonly() {
            return Err(StoreError::NotWritable(dir));
        }
        Ok(Self {
            dir,
            namespace: namespace.to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}.json", self.namespace, key))
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    /// Write via a temp file + rename so a crash mid-write never leaves a
    /// truncated document behind.
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Default state directory (`~/.bidwatch`).
pub fn default_state_dir() -> Result<PathBuf, StoreError> {
    let home = dirs::home_dir().ok_or(StoreError::NoHomeDir)?;
    Ok(home.join(".bidwatch"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_roundtrip_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::open(dir.path(), "default").expect("open");
        store.put("ledger", "[]").expect("put");
        assert_eq!(store.get("ledger").expect("get"), Some("[]".to_string()));
        assert!(dir.path().join("default.ledger.json").exists());
        assert!(!dir.path().join("default.ledger.json.tmp").exists());
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = JsonFileStore::open(dir.path(), "install-a").expect("open");
        let b = JsonFileStore::open(dir.path(), "install-b").expect("open");
        a.put("preferences", "{}").expect("put");
        assert_eq!(b.get("preferences").expect("get"), None);
    }

    #[test]
    fn test_open_creates_missing_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("state").join("bidwatch");
        let store = JsonFileStore::open(&nested, "default").expect("open");
        assert!(store.dir().exists());
    }
}
