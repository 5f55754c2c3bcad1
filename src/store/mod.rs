//! Photo persistence.
//!
//! - **Storage**: [`Storage`] trait, a versioned key-value capability
//! - **Backends**: [`FileStore`] (on disk) and [`InMemoryStore`]
//! - **Photos**: [`PhotoStore`], the gallery document on top of a backend
//!
//! The backend is picked once from configuration by [`open`] and shared
//! behind an `Arc`.

pub mod file;
pub mod memory;
pub mod photos;
pub mod storage;

pub use file::FileStore;
pub use memory::InMemoryStore;
pub use photos::{DEFAULT_MAX_ATTEMPTS, PHOTOS_KEY, PhotoStore, StoreError, WritePolicy};
pub use storage::{Etag, Precondition, Storage, StorageError, Versioned};

use crate::config::{AppConfig, StorageBackend};
use std::sync::Arc;
use tracing::info;

/// Build the photo store described by `config`.
pub fn open(config: &AppConfig) -> PhotoStore {
    let storage: Arc<dyn Storage> = match config.storage.backend {
        StorageBackend::File => Arc::new(FileStore::new(config.storage_root())),
        StorageBackend::Memory => Arc::new(InMemoryStore::new()),
    };
    info!(
        backend = %storage.describe(),
        key = %config.storage.key,
        policy = ?config.storage.write_policy,
        "Opened photo storage"
    );
    PhotoStore::new(storage)
        .with_key(config.storage.key.clone())
        .with_policy(config.storage.write_policy)
        .with_max_attempts(config.storage.max_write_attempts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::photo;
    use tempfile::TempDir;

    #[tokio::test]
    async fn open_file_backend_persists_under_namespace() {
        let tmp = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.storage.path = tmp.path().display().to_string();

        open(&config).insert(photo("a")).await.unwrap();

        let doc = tmp
            .path()
            .join("family-photos")
            .join("family-photos-list.json");
        assert!(doc.exists());
        // A fresh handle sees the same gallery
        assert_eq!(open(&config).list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn open_memory_backend() {
        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::Memory;
        config.storage.write_policy = WritePolicy::LastWriteWins;

        let store = open(&config);
        assert_eq!(store.describe(), "memory");
        assert_eq!(store.policy(), WritePolicy::LastWriteWins);
        store.insert(photo("a")).await.unwrap();
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }
}
