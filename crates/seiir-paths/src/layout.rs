use std::collections::BTreeSet;

use async_trait::async_trait;
use seiir_artifact::{Error as ArtifactError, Store};
use seiir_config::LocationId;
use tracing::debug;

use crate::error::PathsError;

/// Location ids of the numerically named containers below `key`, ascending.
pub(crate) async fn location_containers(
  store: &dyn Store,
  key: &str,
) -> Result<Vec<LocationId>, PathsError> {
  let mut ids: Vec<LocationId> = store
    .list(key)
    .await?
    .into_iter()
    .filter(|entry| entry.is_container())
    .filter_map(|entry| entry.name.parse().ok())
    .collect();
  ids.sort_unstable();
  Ok(ids)
}

/// Directory structure of one stage's output root.
#[async_trait]
pub trait StageLayout: Send + Sync {
  /// Store rooted at the stage's output root.
  fn store(&self) -> &dyn Store;

  /// Containers created once per run, independent of location.
  fn run_dirs(&self) -> Vec<String> {
    Vec::new()
  }

  /// Containers holding one location's artifacts.
  fn location_dirs(&self, location_id: LocationId) -> Vec<String>;

  /// Create the run and per-location containers.
  ///
  /// Every target is checked before anything is created, so a conflicting
  /// location aborts the whole call without touching existing output. Fails
  /// with [`PathsError::Conflict`] when a location already has output.
  /// Repeated location ids are created once.
  async fn make_dirs(&self, location_ids: &[LocationId]) -> Result<(), PathsError> {
    let store = self.store();
    let location_ids: BTreeSet<LocationId> = location_ids.iter().copied().collect();

    for key in self.run_dirs() {
      if store.exists(&key).await? {
        return Err(PathsError::RunConflict { key });
      }
    }
    for &location_id in &location_ids {
      for key in self.location_dirs(location_id) {
        if store.exists(&key).await? {
          return Err(PathsError::Conflict { location_id, key });
        }
      }
    }

    for key in self.run_dirs() {
      match store.create_once(&key).await {
        Ok(()) => {}
        Err(ArtifactError::AlreadyExists(_)) => return Err(PathsError::RunConflict { key }),
        Err(e) => return Err(e.into()),
      }
    }
    for &location_id in &location_ids {
      for key in self.location_dirs(location_id) {
        match store.create_once(&key).await {
          Ok(()) => {}
          Err(ArtifactError::AlreadyExists(_)) => {
            return Err(PathsError::Conflict { location_id, key });
          }
          Err(e) => return Err(e.into()),
        }
      }
    }

    debug!(locations = location_ids.len(), "created stage directories");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use seiir_artifact::InMemoryStore;

  struct BetaLayout(InMemoryStore);

  impl StageLayout for BetaLayout {
    fn store(&self) -> &dyn Store {
      &self.0
    }

    fn run_dirs(&self) -> Vec<String> {
      vec!["info".to_string()]
    }

    fn location_dirs(&self, location_id: LocationId) -> Vec<String> {
      vec![format!("beta/{location_id}"), format!("draws/{location_id}")]
    }
  }

  #[tokio::test]
  async fn test_repeated_location_ids_created_once() {
    let layout = BetaLayout(InMemoryStore::new());

    layout.make_dirs(&[102, 523, 102]).await.unwrap();
    assert_eq!(location_containers(&layout.0, "beta").await.unwrap(), vec![102, 523]);
    assert_eq!(location_containers(&layout.0, "draws").await.unwrap(), vec![102, 523]);
  }

  #[tokio::test]
  async fn test_existing_location_creates_nothing() {
    let layout = BetaLayout(InMemoryStore::new());
    layout.0.create_once("beta/523").await.unwrap();

    let err = layout.make_dirs(&[102, 523, 630]).await.unwrap_err();
    match &err {
      PathsError::Conflict { location_id, key } => {
        assert_eq!(*location_id, 523);
        assert_eq!(key, "beta/523");
      }
      other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_conflict());

    assert!(!layout.0.exists("info").await.unwrap());
    assert!(!layout.0.exists("draws").await.unwrap());
    assert_eq!(location_containers(&layout.0, "beta").await.unwrap(), vec![523]);
  }

  #[tokio::test]
  async fn test_existing_run_dir_creates_nothing() {
    let layout = BetaLayout(InMemoryStore::new());
    layout.0.create_once("info").await.unwrap();

    let err = layout.make_dirs(&[102]).await.unwrap_err();
    assert!(matches!(err, PathsError::RunConflict { .. }));
    assert!(!layout.0.exists("beta").await.unwrap());
  }
}
