//! Key-value persistence backends
//!
//! Provides:
//! - A session-scoped in-memory backend living as long as the process
//! - A durable file backend storing one file per key, written atomically

use crate::config::Config;
use crate::error::{ConfigResult, StorageError, StorageResult};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A key-value text store
pub trait Backend: Send + Sync {
    /// Read the text stored at `key`, `None` when absent
    fn read(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write `value` at `key`, replacing any previous value
    fn write(&self, key: &str, value: &str) -> StorageResult<()>;
}

/// Session-scoped backend
///
/// Clones share the same contents, so a single instance can be handed to
/// several stores for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Backend for MemoryBackend {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Durable backend storing each key as a JSON file under a root directory
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at `root` (created lazily on first write)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a backend in the default data directory
    pub fn in_data_dir() -> ConfigResult<Self> {
        Config::storage_dir().map(Self::new)
    }

    /// Root directory of this backend
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        Ok(self.root.join(format!("{}.json", file_name_for(key)?)))
    }
}

impl Backend for FileBackend {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key)?;

        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadError {
                key: key.to_string(),
                source: e,
            }),
        }
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;

        std::fs::create_dir_all(&self.root).map_err(|e| StorageError::WriteError {
            key: key.to_string(),
            source: e,
        })?;

        write_atomic(key, &path, value)
    }
}

/// Map a storage key to a file name
///
/// Bytes outside `[A-Za-z0-9._-]`, `%` and a leading `.` are written as `%XX`,
/// so distinct keys never share a file and no key names a hidden file or a
/// parent directory.
fn file_name_for(key: &str) -> StorageResult<String> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey(key.to_string()));
    }

    let mut name = String::with_capacity(key.len());
    for (index, byte) in key.bytes().enumerate() {
        let plain = byte.is_ascii_alphanumeric()
            || matches!(byte, b'_' | b'-')
            || (byte == b'.' && index > 0);
        if plain {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("%{:02X}", byte));
        }
    }
    Ok(name)
}

/// Replace `path` with `content` through a sibling temp file and a rename
fn write_atomic(key: &str, path: &Path, content: &str) -> StorageResult<()> {
    static SEQUENCE: AtomicU64 = AtomicU64::new(0);

    let mut temp = path.as_os_str().to_owned();
    temp.push(format!(
        ".tmp-{}-{}",
        std::process::id(),
        SEQUENCE.fetch_add(1, Ordering::Relaxed)
    ));
    let temp = PathBuf::from(temp);

    let result = std::fs::File::create(&temp)
        .and_then(|mut file| {
            file.write_all(content.as_bytes())?;
            file.sync_all()
        })
        .and_then(|()| std::fs::rename(&temp, path));

    result.map_err(|source| {
        // Leftover temp file from a failed write
        let _ = std::fs::remove_file(&temp);
        StorageError::WriteError {
            key: key.to_string(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_backend_clones_share_contents() {
        let backend = MemoryBackend::new();
        let other = backend.clone();

        backend.write("app", "{}").unwrap();
        assert_eq!(other.read("app").unwrap().as_deref(), Some("{}"));
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn test_memory_backend_missing_key() {
        let backend = MemoryBackend::new();
        assert!(backend.read("nothing").unwrap().is_none());
        assert!(backend.is_empty());
    }

    #[test]
    fn test_file_backend_round_trip() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("storage"));

        assert!(backend.read("my.app").unwrap().is_none());
        backend.write("my.app", r#"{"locale":"en"}"#).unwrap();
        backend.write("my.app", r#"{"locale":"fr"}"#).unwrap();

        assert_eq!(
            backend.read("my.app").unwrap().as_deref(),
            Some(r#"{"locale":"fr"}"#)
        );
    }

    #[test]
    fn test_file_backend_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path());

        backend.write("key", "value").unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["key.json".to_string()]);
    }

    #[test]
    fn test_file_name_escapes_unsafe_bytes() {
        assert_eq!(file_name_for("a/b\\c d").unwrap(), "a%2Fb%5Cc%20d");
        assert_eq!(file_name_for("my-app.i18n").unwrap(), "my-app.i18n");
        assert_eq!(file_name_for("100%").unwrap(), "100%25");
        assert_eq!(file_name_for("..").unwrap(), "%2E.");
        assert!(file_name_for("").is_err());
    }

    #[test]
    fn test_file_backend_keeps_similar_keys_apart() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path());

        backend.write("app/one", "A").unwrap();
        backend.write("app_one", "B").unwrap();
        backend.write("app%2Fone", "C").unwrap();

        assert_eq!(backend.read("app/one").unwrap().as_deref(), Some("A"));
        assert_eq!(backend.read("app_one").unwrap().as_deref(), Some("B"));
        assert_eq!(backend.read("app%2Fone").unwrap().as_deref(), Some("C"));
    }

    #[test]
    fn test_file_backend_stays_inside_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("storage");
        let backend = FileBackend::new(&root);

        backend.write("../escape", "x").unwrap();

        assert!(backend.path_for("../escape").unwrap().starts_with(&root));
        assert!(!dir.path().join("escape.json").exists());
        assert_eq!(backend.read("../escape").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_failed_write_reports_key() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file").unwrap();
        let backend = FileBackend::new(blocker.join("storage"));

        let err = backend.write("app", "{}").unwrap_err();
        assert!(matches!(err, StorageError::WriteError { ref key, .. } if key == "app"));
    }
}
