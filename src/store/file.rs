//! Filesystem storage backend.
//!
//! Each key is one file, `<root>/<key>.json`, holding the raw value. Writes go
//! to a temporary sibling and are renamed into place, so readers never see a
//! half-written document. Conditional writes are serialized within the process
//! by an async mutex; the etag is recomputed from the file on every check.
//!
//! Separate processes sharing one root are not coordinated.

use super::storage::{Etag, Precondition, Storage, StorageError, Versioned};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Store values under `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    async fn read(&self, path: &Path) -> Result<Option<Versioned>, StorageError> {
        match tokio::fs::read_to_string(path).await {
            Ok(value) => Ok(Some(Versioned::new(value))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(unavailable(path, e)),
        }
    }
}

fn unavailable(path: &Path, err: std::io::Error) -> StorageError {
    StorageError::Unavailable(format!("{}: {}", path.display(), err))
}

/// Write `value` to a `.tmp` sibling of `path`, then rename it over `path`.
/// A failed rename removes the temporary file.
async fn replace_file(path: &Path, value: String) -> Result<(), StorageError> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, value)
        .await
        .map_err(|e| unavailable(&tmp, e))?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        // Best effort; the rename error is the one worth reporting.
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(unavailable(path, e));
    }
    Ok(())
}

#[async_trait]
impl Storage for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Versioned>, StorageError> {
        let path = self.key_path(key)?;
        self.read(&path).await
    }

    async fn put(
        &self,
        key: &str,
        value: String,
        condition: Precondition,
    ) -> Result<Etag, StorageError> {
        let path = self.key_path(key)?;
        let _guard = self.write_lock.lock().await;

        let current = self.read(&path).await?;
        if !condition.allows(current.as_ref().map(|v| &v.etag)) {
            return Err(StorageError::Conflict {
                key: key.to_string(),
            });
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| unavailable(&self.root, e))?;
        let etag = Etag::of(&value);
        replace_file(&path, value).await?;
        Ok(etag)
    }

    fn describe(&self) -> String {
        format!("file:{}", self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("ns"));
        assert_eq!(store.get("photos").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_creates_directory_and_file() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("ns");
        let store = FileStore::new(&root);

        store
            .put("photos", "[]".into(), Precondition::Absent)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(root.join("photos.json")).unwrap(), "[]");
        assert!(!root.join("photos.json.tmp").exists());
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let tag = FileStore::new(tmp.path())
            .put("k", "hello".into(), Precondition::Any)
            .await
            .unwrap();

        let reopened = FileStore::new(tmp.path());
        let got = reopened.get("k").await.unwrap().unwrap();
        assert_eq!(got.value, "hello");
        assert_eq!(got.etag, tag);
    }

    #[tokio::test]
    async fn stale_etag_conflicts() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path());
        let first = store.put("k", "1".into(), Precondition::Any).await.unwrap();
        store
            .put("k", "2".into(), Precondition::Matches(first.clone()))
            .await
            .unwrap();

        let err = store
            .put("k", "3".into(), Precondition::Matches(first))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));
        assert_eq!(store.get("k").await.unwrap().unwrap().value, "2");
    }

    #[tokio::test]
    async fn rejects_path_traversal_keys() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path());
        for key in ["../escape", "a/b", "", ".hidden"] {
            assert!(matches!(
                store.get(key).await,
                Err(StorageError::InvalidKey(_))
            ));
        }
    }

    #[tokio::test]
    async fn unreadable_root_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        // A regular file where the root directory should be
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let store = FileStore::new(&blocker);

        assert!(matches!(
            store.put("k", "v".into(), Precondition::Any).await,
            Err(StorageError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn failed_rename_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file
        let target = tmp.path().join("k.json");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("inner"), "x").unwrap();

        let err = replace_file(&target, "v".into()).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
        assert!(!tmp.path().join("k.json.tmp").exists());
        assert!(target.is_dir());
    }
}
