//! Key-value persistence medium: trait plus in-memory and directory-backed
//! implementations.
//!
//! Values are UTF-8 JSON text addressed by short fixed keys, mirroring the
//! browser local storage the web client writes to.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

/// Errors from the key-value medium.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("Storage quota exceeded: {needed} bytes requested, limit is {limit}")]
    QuotaExceeded { needed: usize, limit: usize },

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A synchronous string key-value store with a single writer.
pub trait KeyValueStore {
    /// Read a value, `None` if the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Write a value, replacing any previous one.
    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError>;

    /// Remove a key. Removing an absent key succeeds.
    fn remove(&mut self, key: &str) -> Result<(), KvError>;
}

fn check_quota(quota: Option<usize>, value: &str) -> Result<(), KvError> {
    match quota {
        Some(limit) if value.len() > limit => Err(KvError::QuotaExceeded {
            needed: value.len(),
            limit,
        }),
        _ => Ok(()),
    }
}

/// In-memory store, used for tests and ephemeral runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryKv {
    values: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject values larger than `bytes`.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        check_quota(self.quota, value)?;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), KvError> {
        self.values.remove(key);
        Ok(())
    }
}

/// File-system backed store.
///
/// Each key is one JSON file under the root directory:
/// ```text
/// {root}/
///   codebreaker_sessions.json
///   codebreaker_preferences.json
/// ```
///
/// Writes go to a temporary file that is then renamed over the target,
/// so a crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileKv {
    root: PathBuf,
    quota: Option<usize>,
}

impl FileKv {
    /// Create a new store rooted at the given directory.
    /// Creates the directory if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, KvError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root, quota: None })
    }

    /// Reject values larger than `bytes`.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, KvError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(KvError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        check_quota(self.quota, value)?;
        let path = self.key_path(key)?;
        if !self.root.is_dir() {
            return Err(KvError::Unavailable(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }

        let tmp_path = self.root.join(format!(".{key}.json.tmp"));
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(value.as_bytes())?;
        tmp.sync_all()?;
        drop(tmp);
        fs::rename(&tmp_path, &path)?;

        tracing::trace!(key, bytes = value.len(), path = %path.display(), "Value written");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), KvError> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_set_get_remove() {
        let mut kv = MemoryKv::new();
        assert_eq!(kv.get("a").unwrap(), None);

        kv.set("a", "[1]").unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("[1]"));

        kv.remove("a").unwrap();
        kv.remove("a").unwrap();
        assert!(kv.is_empty());
    }

    #[test]
    fn memory_quota_rejects_large_values() {
        let mut kv = MemoryKv::new().with_quota(4);
        kv.set("a", "1234").unwrap();

        let err = kv.set("a", "12345").unwrap_err();
        assert!(matches!(err, KvError::QuotaExceeded { needed: 5, limit: 4 }));
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("1234"));
    }

    #[test]
    fn file_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mut kv = FileKv::new(dir.path().join("data")).unwrap();

        assert_eq!(kv.get("codebreaker_sessions").unwrap(), None);
        kv.set("codebreaker_sessions", "[]").unwrap();
        assert_eq!(
            kv.get("codebreaker_sessions").unwrap().as_deref(),
            Some("[]")
        );
        assert!(kv.root().join("codebreaker_sessions.json").is_file());

        kv.remove("codebreaker_sessions").unwrap();
        assert_eq!(kv.get("codebreaker_sessions").unwrap(), None);
        kv.remove("codebreaker_sessions").unwrap();
    }

    #[test]
    fn file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut kv = FileKv::new(dir.path()).unwrap();
            kv.set("prefs", r#"{"theme":"light"}"#).unwrap();
        }
        let kv = FileKv::new(dir.path()).unwrap();
        assert_eq!(
            kv.get("prefs").unwrap().as_deref(),
            Some(r#"{"theme":"light"}"#)
        );
    }

    #[test]
    fn file_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut kv = FileKv::new(dir.path()).unwrap();
        assert!(matches!(
            kv.set("../escape", "x"),
            Err(KvError::InvalidKey(_))
        ));
        assert!(matches!(kv.get(""), Err(KvError::InvalidKey(_))));
    }

    #[test]
    fn file_quota_leaves_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let mut kv = FileKv::new(dir.path()).unwrap().with_quota(8);
        kv.set("k", "short").unwrap();
        assert!(kv.set("k", "much too long").is_err());
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("short"));
    }
}
