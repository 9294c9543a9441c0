//! Infectionator layout and the stages that share it.
//!
//! The infectionator writes one folder per location, named with the location
//! id as its last `_`-separated component, holding one file per draw:
//! ```text
//! {root}/
//! └── kinshasa_170/
//!     ├── draw0000_prepped_deaths_and_cases_all_age.csv
//!     └── draw0001_prepped_deaths_and_cases_all_age.csv
//! ```
//! The holdout stage reproduces this layout in its own root and adds a
//! `VALIDATION_`-prefixed sibling for every draw file.

use std::collections::BTreeMap;
use std::sync::Arc;

use seiir_artifact::{Store, join_key};
use seiir_config::{DrawId, LocationId};

use crate::error::PathsError;
use crate::layout::{StageLayout, location_containers};

/// Prefix of a draw file's validation partition.
const VALIDATION_PREFIX: &str = "VALIDATION_";

/// A draw file found in a location folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawFile {
  pub draw_id: DrawId,
  pub file_name: String,
}

/// Infectionator output root.
#[derive(Clone)]
pub struct InfectionPaths {
  store: Arc<dyn Store>,
}

impl InfectionPaths {
  pub fn new(store: Arc<dyn Store>) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &Arc<dyn Store> {
    &self.store
  }

  /// Location id encoded in a folder name. Example: "kinshasa_170" -> 170
  pub fn folder_location_id(folder: &str) -> Option<LocationId> {
    folder.rsplit('_').next()?.parse().ok()
  }

  /// Draw id encoded in a file name. Example: "draw0007_prepped.csv" -> 7
  pub fn file_draw_id(file_name: &str) -> Option<DrawId> {
    let head = file_name.split('_').next()?;
    head.strip_prefix("draw")?.parse().ok()
  }

  pub fn draw_file(folder: &str, file_name: &str) -> String {
    join_key([folder, file_name])
  }

  pub fn validation_file(folder: &str, file_name: &str) -> String {
    join_key([folder, &format!("{VALIDATION_PREFIX}{file_name}")])
  }

  /// Find the single folder whose numeric suffix is `location_id`.
  ///
  /// Zero or several matches is an error; the caller cannot tell which run the
  /// data belongs to.
  pub async fn resolve_location_folder(&self, location_id: LocationId) -> Result<String, PathsError> {
    let mut matches: Vec<String> = self
      .store
      .list("")
      .await?
      .into_iter()
      .filter(|entry| entry.is_container())
      .filter(|entry| Self::folder_location_id(&entry.name) == Some(location_id))
      .map(|entry| entry.name)
      .collect();

    match matches.len() {
      0 => Err(PathsError::NoLocationFolder { location_id }),
      1 => Ok(matches.remove(0)),
      _ => Err(PathsError::AmbiguousLocationFolder {
        location_id,
        folders: matches,
      }),
    }
  }

  /// Resolve the folder of every location present in the root.
  ///
  /// Fails if any location id is claimed by more than one folder.
  pub async fn location_folders(&self) -> Result<BTreeMap<LocationId, String>, PathsError> {
    let mut grouped: BTreeMap<LocationId, Vec<String>> = BTreeMap::new();
    for entry in self.store.list("").await? {
      if !entry.is_container() {
        continue;
      }
      if let Some(location_id) = Self::folder_location_id(&entry.name) {
        grouped.entry(location_id).or_default().push(entry.name);
      }
    }

    grouped
      .into_iter()
      .map(|(location_id, mut folders)| {
        if folders.len() == 1 {
          Ok((location_id, folders.remove(0)))
        } else {
          Err(PathsError::AmbiguousLocationFolder {
            location_id,
            folders,
          })
        }
      })
      .collect()
  }

  /// Draw files in a location folder, ordered by draw id.
  ///
  /// Entries whose names carry no draw id (validation partitions, stray
  /// files) are left out.
  pub async fn draw_files(&self, folder: &str) -> Result<Vec<DrawFile>, PathsError> {
    let mut files: Vec<DrawFile> = self
      .store
      .list(folder)
      .await?
      .into_iter()
      .filter(|entry| !entry.is_container())
      .filter_map(|entry| {
        Self::file_draw_id(&entry.name).map(|draw_id| DrawFile {
          draw_id,
          file_name: entry.name,
        })
      })
      .collect();
    files.sort_by_key(|f| f.draw_id);
    Ok(files)
  }
}

/// Output root of a holdout split.
///
/// Location folders are named after the input folders they were split from,
/// so the layout is built from an already resolved folder map.
#[derive(Clone)]
pub struct HoldoutPaths {
  store: Arc<dyn Store>,
  folders: BTreeMap<LocationId, String>,
}

impl HoldoutPaths {
  pub fn new(store: Arc<dyn Store>, folders: BTreeMap<LocationId, String>) -> Self {
    Self { store, folders }
  }

  pub fn folder(&self, location_id: LocationId) -> Option<&str> {
    self.folders.get(&location_id).map(String::as_str)
  }

  pub fn location_ids(&self) -> Vec<LocationId> {
    self.folders.keys().copied().collect()
  }
}

impl StageLayout for HoldoutPaths {
  fn store(&self) -> &dyn Store {
    self.store.as_ref()
  }

  fn location_dirs(&self, location_id: LocationId) -> Vec<String> {
    self.folder(location_id).map(str::to_string).into_iter().collect()
  }
}

/// Output root of an ODE fit.
///
/// ```text
/// {root}/
/// └── betas/
///     └── {location_id}/
///         └── fit_draw_{draw_id}.csv
/// ```
#[derive(Clone)]
pub struct FitPaths {
  store: Arc<dyn Store>,
}

impl FitPaths {
  pub const BETA_FIT_DIR: &'static str = "betas";

  pub fn new(store: Arc<dyn Store>) -> Self {
    Self { store }
  }

  pub fn beta_fit_file(location_id: LocationId, draw_id: DrawId) -> String {
    join_key([
      Self::BETA_FIT_DIR,
      &location_id.to_string(),
      &format!("fit_draw_{draw_id}.csv"),
    ])
  }

  /// Locations the fit produced output for, ascending.
  pub async fn location_ids(&self) -> Result<Vec<LocationId>, PathsError> {
    location_containers(self.store.as_ref(), Self::BETA_FIT_DIR).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use bytes::Bytes;
  use seiir_artifact::InMemoryStore;

  #[test]
  fn test_folder_location_id() {
    assert_eq!(InfectionPaths::folder_location_id("kinshasa_170"), Some(170));
    assert_eq!(InfectionPaths::folder_location_id("new_york_555"), Some(555));
    assert_eq!(InfectionPaths::folder_location_id("170"), Some(170));
    assert_eq!(InfectionPaths::folder_location_id("notes"), None);
  }

  #[test]
  fn test_file_draw_id() {
    assert_eq!(
      InfectionPaths::file_draw_id("draw0007_prepped_deaths_and_cases_all_age.csv"),
      Some(7)
    );
    assert_eq!(
      InfectionPaths::file_draw_id("VALIDATION_draw0007_prepped.csv"),
      None
    );
    assert_eq!(InfectionPaths::file_draw_id("readme.txt"), None);
  }

  #[test]
  fn test_keys_are_deterministic() {
    assert_eq!(
      InfectionPaths::validation_file("kinshasa_170", "draw0001_x.csv"),
      "kinshasa_170/VALIDATION_draw0001_x.csv"
    );
    assert_eq!(
      FitPaths::beta_fit_file(170, 3),
      FitPaths::beta_fit_file(170, 3)
    );
    assert_eq!(FitPaths::beta_fit_file(170, 3), "betas/170/fit_draw_3.csv");
  }

  async fn store_with(keys: &[&str]) -> Arc<dyn Store> {
    let store = InMemoryStore::new();
    for key in keys {
      store.write_atomic(key, Bytes::new()).await.unwrap();
    }
    Arc::new(store)
  }

  #[tokio::test]
  async fn test_resolve_location_folder() {
    let store = store_with(&["kinshasa_170/draw0000_x.csv", "lagos_214/draw0000_x.csv"]).await;
    let paths = InfectionPaths::new(store);

    assert_eq!(
      paths.resolve_location_folder(170).await.unwrap(),
      "kinshasa_170"
    );
    let err = paths.resolve_location_folder(999).await.unwrap_err();
    assert!(matches!(err, PathsError::NoLocationFolder { location_id: 999 }));
    assert!(err.is_configuration());
  }

  #[tokio::test]
  async fn test_resolve_ambiguous_location_folder() {
    let store = store_with(&["old_170/draw0000_x.csv", "new_170/draw0000_x.csv"]).await;
    let paths = InfectionPaths::new(store);

    let err = paths.resolve_location_folder(170).await.unwrap_err();
    match err {
      PathsError::AmbiguousLocationFolder { folders, .. } => {
        assert_eq!(folders, vec!["new_170", "old_170"]);
      }
      other => panic!("unexpected error: {other}"),
    }
    assert!(paths.location_folders().await.is_err());
  }

  #[tokio::test]
  async fn test_draw_files_sorted_and_filtered() {
    let store = store_with(&[
      "kinshasa_170/draw0002_x.csv",
      "kinshasa_170/draw0000_x.csv",
      "kinshasa_170/VALIDATION_draw0000_x.csv",
      "kinshasa_170/notes.txt",
    ])
    .await;
    let paths = InfectionPaths::new(store);

    let files = paths.draw_files("kinshasa_170").await.unwrap();
    let draws: Vec<_> = files.iter().map(|f| f.draw_id).collect();
    assert_eq!(draws, vec![0, 2]);
    assert_eq!(files[1].file_name, "draw0002_x.csv");
  }

  #[tokio::test]
  async fn test_fit_location_ids() {
    let store = store_with(&[
      "betas/214/fit_draw_0.csv",
      "betas/170/fit_draw_0.csv",
      "betas/summary.csv",
    ])
    .await;
    let paths = FitPaths::new(store);

    assert_eq!(paths.location_ids().await.unwrap(), vec![170, 214]);
  }
}
