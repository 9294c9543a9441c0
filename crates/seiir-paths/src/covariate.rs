use std::sync::Arc;

use seiir_artifact::{Store, join_key};

use crate::error::PathsError;

/// Covariate input root. Each covariate has a folder named after it; its
/// metadata files are the ones whose name starts with `<covariate>_info`.
#[derive(Clone)]
pub struct CovariatePaths {
  store: Arc<dyn Store>,
}

impl CovariatePaths {
  pub fn new(store: Arc<dyn Store>) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &Arc<dyn Store> {
    &self.store
  }

  /// Keys of the metadata files for one covariate, sorted.
  pub async fn info_files(&self, covariate: &str) -> Result<Vec<String>, PathsError> {
    let prefix = format!("{covariate}_info");
    Ok(
      self
        .store
        .list(covariate)
        .await?
        .into_iter()
        .filter(|entry| !entry.is_container() && entry.name.starts_with(&prefix))
        .map(|entry| join_key([covariate, &entry.name]))
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use bytes::Bytes;
  use seiir_artifact::InMemoryStore;

  #[tokio::test]
  async fn test_info_files() {
    let store = InMemoryStore::new();
    for key in [
      "mobility/mobility_info.csv",
      "mobility/mobility_info_sources.txt",
      "mobility/mobility_reference.csv",
    ] {
      store.write_atomic(key, Bytes::new()).await.unwrap();
    }
    let paths = CovariatePaths::new(Arc::new(store));

    assert_eq!(
      paths.info_files("mobility").await.unwrap(),
      vec![
        "mobility/mobility_info.csv".to_string(),
        "mobility/mobility_info_sources.txt".to_string(),
      ]
    );
    assert!(paths.info_files("testing").await.is_err());
  }
}
