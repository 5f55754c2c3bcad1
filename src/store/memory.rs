//! Process-local storage backend.
//!
//! Values live in a mutex-guarded map for the lifetime of the process. Used
//! for development, tests, and deployments that accept losing the gallery on
//! restart.

use super::storage::{Etag, Precondition, Storage, StorageError, Versioned};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Versioned>>,
    available: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the backend going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable("in-memory store offline".into()))
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Versioned>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Versioned>, StorageError> {
        self.check_available()?;
        Ok(self.lock().get(key).cloned())
    }

    async fn put(
        &self,
        key: &str,
        value: String,
        condition: Precondition,
    ) -> Result<Etag, StorageError> {
        self.check_available()?;
        let mut entries = self.lock();
        let current = entries.get(key).map(|v| &v.etag);
        if !condition.allows(current) {
            return Err(StorageError::Conflict {
                key: key.to_string(),
            });
        }
        let versioned = Versioned::new(value);
        let etag = versioned.etag.clone();
        entries.insert(key.to_string(), versioned);
        Ok(etag)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
