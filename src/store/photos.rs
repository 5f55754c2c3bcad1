//! The photo collection, stored as a single JSON document.
//!
//! The whole gallery is one array of [`Photo`] records under one storage key,
//! newest first. Every mutation reads the document, edits it in memory, and
//! writes it back whole.
//!
//! ## Write policies
//!
//! Under [`WritePolicy::Optimistic`] (the default) the write is conditional on
//! the etag that was read. If another writer got there first, the
//! read-modify-write is repeated, up to `max_attempts` times in total.
//!
//! [`WritePolicy::LastWriteWins`] writes unconditionally. Two concurrent
//! inserts can then lose one of the photos; this mode exists to match older
//! deployments that relied on it.
//!
//! ## Degradation
//!
//! [`PhotoStore::list`] never fails: an unreachable or unreadable document is
//! logged and served as an empty page. Mutations surface the error instead.

use super::storage::{Precondition, Storage, StorageError};
use crate::types::{PageRequest, Photo, PhotoPage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Storage key of the photo document when none is configured.
pub const PHOTOS_KEY: &str = "family-photos-list";

/// Total attempts for one conditional mutation before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Stored photo list is not valid JSON: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error("Photo list changed concurrently; gave up after {attempts} attempts")]
    Conflict { attempts: u32 },
    #[error("Failed to serialize photo list: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl StoreError {
    /// Whether the failure was lost write races rather than a broken backend.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::Conflict { .. } | StoreError::Storage(StorageError::Conflict { .. })
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WritePolicy {
    #[default]
    Optimistic,
    LastWriteWins,
}

/// Shared handle to the gallery document.
#[derive(Clone)]
pub struct PhotoStore {
    storage: Arc<dyn Storage>,
    key: String,
    policy: WritePolicy,
    max_attempts: u32,
}

impl std::fmt::Debug for PhotoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoStore")
            .field("storage", &self.storage.describe())
            .field("key", &self.key)
            .field("policy", &self.policy)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl PhotoStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            key: PHOTOS_KEY.to_string(),
            policy: WritePolicy::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the attempt bound for optimistic writes (at least 1).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    pub fn describe(&self) -> String {
        self.storage.describe()
    }

    /// The full collection, newest first. Absent document is empty.
    pub async fn list_all(&self) -> Result<Vec<Photo>, StoreError> {
        match self.storage.get(&self.key).await? {
            Some(doc) => parse(&doc.value),
            None => Ok(Vec::new()),
        }
    }

    /// One page of the gallery. Read failures degrade to an empty page.
    pub async fn list(&self, request: PageRequest) -> PhotoPage {
        match self.list_all().await {
            Ok(all) => PhotoPage::slice(&all, request),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Photo list unavailable, serving empty page");
                PhotoPage::empty(request)
            }
        }
    }

    /// First record with `id`, if any.
    pub async fn get(&self, id: &str) -> Result<Option<Photo>, StoreError> {
        Ok(self.list_all().await?.into_iter().find(|p| p.id == id))
    }

    /// Prepend `photo` to the collection. Ids are not checked for uniqueness.
    pub async fn insert(&self, photo: Photo) -> Result<Photo, StoreError> {
        self.mutate(|photos| photos.insert(0, photo.clone())).await?;
        Ok(photo)
    }

    /// Remove every record with `id`, returning how many were removed.
    pub async fn delete(&self, id: &str) -> Result<usize, StoreError> {
        self.mutate(|photos| {
            let before = photos.len();
            photos.retain(|p| p.id != id);
            before - photos.len()
        })
        .await
    }

    async fn mutate<T, F>(&self, mut apply: F) -> Result<T, StoreError>
    where
        F: FnMut(&mut Vec<Photo>) -> T + Send,
        T: Send,
    {
        for attempt in 1..=self.max_attempts {
            let current = self.storage.get(&self.key).await?;
            let (mut photos, condition) = match current {
                Some(doc) => (parse(&doc.value)?, Precondition::Matches(doc.etag)),
                None => (Vec::new(), Precondition::Absent),
            };
            let condition = match self.policy {
                WritePolicy::Optimistic => condition,
                WritePolicy::LastWriteWins => Precondition::Any,
            };

            let result = apply(&mut photos);
            let body = serde_json::to_string(&photos).map_err(StoreError::Serialize)?;

            match self.storage.put(&self.key, body, condition).await {
                Ok(_) => return Ok(result),
                Err(StorageError::Conflict { .. }) => {
                    debug!(key = %self.key, attempt, "Photo list changed underneath write, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        warn!(key = %self.key, attempts = self.max_attempts, "Giving up on contended photo list write");
        Err(StoreError::Conflict {
            attempts: self.max_attempts,
        })
    }
}

fn parse(document: &str) -> Result<Vec<Photo>, StoreError> {
    serde_json::from_str(document).map_err(StoreError::Corrupt)
}
