//! Key-value storage capability used by the photo store.
//!
//! A [`Storage`] holds opaque string values under string keys. Every value
//! carries an [`Etag`] so writers can make their update conditional on the
//! value they read ([`Precondition`]). Backends are chosen once at start-up
//! and shared behind an `Arc<dyn Storage>`.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Write conflict on key '{key}'")]
    Conflict { key: String },
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),
}

/// Opaque version token for a stored value.
///
/// Computed as the SHA-256 of the value, so two writers that produce identical
/// documents also produce identical tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Etag(String);

impl Etag {
    pub fn of(value: &str) -> Self {
        Self(format!("{:x}", Sha256::digest(value.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored value plus its current version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub value: String,
    pub etag: Etag,
}

impl Versioned {
    pub fn new(value: String) -> Self {
        let etag = Etag::of(&value);
        Self { value, etag }
    }
}

/// Condition a write must satisfy to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// Unconditional overwrite.
    Any,
    /// Only if the key does not exist yet.
    Absent,
    /// Only if the current value still has this tag.
    Matches(Etag),
}

impl Precondition {
    /// Whether a write is allowed given the key's current tag.
    pub fn allows(&self, current: Option<&Etag>) -> bool {
        match (self, current) {
            (Precondition::Any, _) => true,
            (Precondition::Absent, None) => true,
            (Precondition::Absent, Some(_)) => false,
            (Precondition::Matches(expected), Some(actual)) => expected == actual,
            (Precondition::Matches(_), None) => false,
        }
    }
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a key. Absent keys are `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<Versioned>, StorageError>;

    /// Write a key if `condition` holds, returning the new tag.
    ///
    /// Fails with [`StorageError::Conflict`] when the condition does not hold.
    async fn put(
        &self,
        key: &str,
        value: String,
        condition: Precondition,
    ) -> Result<Etag, StorageError>;

    /// Human-readable description of the backend and its location.
    fn describe(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn etag_is_content_hash() {
        assert_eq!(Etag::of("[]"), Etag::of("[]"));
        assert_ne!(Etag::of("[]"), Etag::of("[{}]"));
        assert_eq!(Etag::of("x").as_str().len(), 64);
    }

    #[test]
    fn precondition_any_always_allows() {
        assert!(Precondition::Any.allows(None));
        assert!(Precondition::Any.allows(Some(&Etag::of("a"))));
    }

    #[test]
    fn precondition_absent() {
        assert!(Precondition::Absent.allows(None));
        assert!(!Precondition::Absent.allows(Some(&Etag::of("a"))));
    }

    #[test]
    fn precondition_matches() {
        let tag = Etag::of("a");
        assert!(Precondition::Matches(tag.clone()).allows(Some(&tag)));
        assert!(!Precondition::Matches(tag.clone()).allows(Some(&Etag::of("b"))));
        assert!(!Precondition::Matches(tag).allows(None));
    }
}
