//! Seiir Artifact
//!
//! This crate provides the artifact storage trait and implementations for the
//! seiir pipeline. Artifacts are the per-location, per-draw tables one stage
//! produces and the next stage reads.
//!
//! The [`Store`] trait treats the storage backend as a key-value store with
//! containers (directories). Keys are `/`-separated paths relative to the
//! store root. Two contracts hold for every implementation:
//!
//! - **write-once**: [`Store::write_atomic`] never replaces an existing key,
//!   and [`Store::create_once`] never reuses an existing container.
//! - **no torn reads**: a reader observes either no artifact or the complete
//!   artifact, never a partially written one.
//!
//! [`FsStore`] backs the store with a directory tree; [`InMemoryStore`] keeps
//! everything in memory and is what tests use.

mod fs;
mod key;
mod memory;

pub use fs::FsStore;
pub use key::{join_key, validate_key};
pub use memory::InMemoryStore;

use async_trait::async_trait;
use bytes::Bytes;

/// Error type for artifact storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested artifact or container was not found.
  #[error("artifact not found: {0}")]
  NotFound(String),

  /// The artifact or container already exists and will not be replaced.
  #[error("artifact already exists: {0}")]
  AlreadyExists(String),

  /// The key is not a valid relative path.
  #[error("invalid artifact key '{key}': {reason}")]
  InvalidKey { key: String, reason: &'static str },

  /// An I/O error occurred.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Kind of a listed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
  Container,
  Object,
}

/// A direct child of a listed container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
  pub name: String,
  pub kind: EntryKind,
}

impl Entry {
  pub fn is_container(&self) -> bool {
    self.kind == EntryKind::Container
  }
}

/// Result of a write that tolerates an existing artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
  Written,
  AlreadyExists,
}

/// Artifact storage trait.
///
/// Implementations provide the actual storage backend. Callers compute keys
/// (see `seiir-paths`); the store never interprets them beyond validation.
#[async_trait]
pub trait Store: Send + Sync {
  /// Whether an artifact or container exists at `key`. The empty key is the root.
  async fn exists(&self, key: &str) -> Result<bool, Error>;

  /// Create a container at `key`, creating missing parents.
  ///
  /// Fails with [`Error::AlreadyExists`] if `key` is already present.
  async fn create_once(&self, key: &str) -> Result<(), Error>;

  /// List the direct children of the container at `key`, sorted by name.
  async fn list(&self, key: &str) -> Result<Vec<Entry>, Error>;

  /// Read a complete artifact.
  async fn read(&self, key: &str) -> Result<Bytes, Error>;

  /// Store an artifact, creating missing parent containers.
  ///
  /// The artifact becomes visible all at once. Fails with
  /// [`Error::AlreadyExists`] if `key` is already present.
  async fn write_atomic(&self, key: &str, data: Bytes) -> Result<(), Error>;

  /// Store an artifact unless one is already present.
  async fn write_if_absent(&self, key: &str, data: Bytes) -> Result<WriteOutcome, Error> {
    match self.write_atomic(key, data).await {
      Ok(()) => Ok(WriteOutcome::Written),
      Err(Error::AlreadyExists(_)) => Ok(WriteOutcome::AlreadyExists),
      Err(e) => Err(e),
    }
  }
}
