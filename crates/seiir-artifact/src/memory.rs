use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::key::{split_parent, validate_key};
use crate::{Entry, EntryKind, Error, Store};

/// In-memory artifact store.
///
/// Honours the same write-once contract as [`crate::FsStore`]. Suitable for
/// tests and for dry runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
  state: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
  objects: BTreeMap<String, Bytes>,
  containers: BTreeSet<String>,
}

impl State {
  fn contains(&self, key: &str) -> bool {
    key.is_empty() || self.objects.contains_key(key) || self.containers.contains(key)
  }

  /// Register every ancestor of `key` as a container.
  fn add_parents(&mut self, key: &str) {
    let mut parent = split_parent(key).0;
    while !parent.is_empty() {
      self.containers.insert(parent.to_string());
      parent = split_parent(parent).0;
    }
  }
}

impl InMemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for InMemoryStore {
  async fn exists(&self, key: &str) -> Result<bool, Error> {
    validate_key(key)?;
    Ok(self.state.read().await.contains(key))
  }

  async fn create_once(&self, key: &str) -> Result<(), Error> {
    validate_key(key)?;
    let mut state = self.state.write().await;
    if state.contains(key) {
      return Err(Error::AlreadyExists(key.to_string()));
    }
    state.add_parents(key);
    state.containers.insert(key.to_string());
    Ok(())
  }

  async fn list(&self, key: &str) -> Result<Vec<Entry>, Error> {
    validate_key(key)?;
    let state = self.state.read().await;
    if !key.is_empty() && !state.containers.contains(key) {
      return Err(Error::NotFound(key.to_string()));
    }

    let is_child = |candidate: &str| split_parent(candidate).0 == key;
    let mut listed: Vec<Entry> = state
      .containers
      .iter()
      .filter(|c| is_child(c.as_str()))
      .map(|c| Entry {
        name: split_parent(c).1.to_string(),
        kind: EntryKind::Container,
      })
      .chain(state.objects.keys().filter(|o| is_child(o.as_str())).map(|o| Entry {
        name: split_parent(o).1.to_string(),
        kind: EntryKind::Object,
      }))
      .collect();

    listed.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(listed)
  }

  async fn read(&self, key: &str) -> Result<Bytes, Error> {
    validate_key(key)?;
    self
      .state
      .read()
      .await
      .objects
      .get(key)
      .cloned()
      .ok_or_else(|| Error::NotFound(key.to_string()))
  }

  async fn write_atomic(&self, key: &str, data: Bytes) -> Result<(), Error> {
    validate_key(key)?;
    if key.is_empty() {
      return Err(Error::InvalidKey {
        key: String::new(),
        reason: "cannot write to the store root",
      });
    }

    let mut state = self.state.write().await;
    if state.contains(key) {
      return Err(Error::AlreadyExists(key.to_string()));
    }
    state.add_parents(key);
    state.objects.insert(key.to_string(), data);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::WriteOutcome;

  #[tokio::test]
  async fn test_in_memory_write_once() {
    let store = InMemoryStore::new();

    assert!(!store.exists("a/b.csv").await.unwrap());

    store
      .write_atomic("a/b.csv", Bytes::from_static(b"one"))
      .await
      .unwrap();
    assert!(store.exists("a").await.unwrap());
    assert_eq!(&store.read("a/b.csv").await.unwrap()[..], b"one");

    let outcome = store
      .write_if_absent("a/b.csv", Bytes::from_static(b"two"))
      .await
      .unwrap();
    assert_eq!(outcome, WriteOutcome::AlreadyExists);
    assert_eq!(&store.read("a/b.csv").await.unwrap()[..], b"one");
  }

  #[tokio::test]
  async fn test_in_memory_create_once() {
    let store = InMemoryStore::new();

    store.create_once("beta/102").await.unwrap();
    assert!(store.exists("beta").await.unwrap());
    assert!(matches!(
      store.create_once("beta/102").await,
      Err(Error::AlreadyExists(_))
    ));
    // Implicit parents count as existing too.
    assert!(matches!(
      store.create_once("beta").await,
      Err(Error::AlreadyExists(_))
    ));
  }

  #[tokio::test]
  async fn test_in_memory_list() {
    let store = InMemoryStore::new();
    store.create_once("loc_2").await.unwrap();
    store
      .write_atomic("loc_1/draw0000_x.csv", Bytes::new())
      .await
      .unwrap();
    store
      .write_atomic("loc_1/nested/deep.csv", Bytes::new())
      .await
      .unwrap();

    let root: Vec<_> = store
      .list("")
      .await
      .unwrap()
      .into_iter()
      .map(|e| e.name)
      .collect();
    assert_eq!(root, vec!["loc_1", "loc_2"]);

    let loc_1 = store.list("loc_1").await.unwrap();
    assert_eq!(loc_1.len(), 2);
    assert_eq!(loc_1[0].name, "draw0000_x.csv");
    assert!(!loc_1[0].is_container());
    assert!(loc_1[1].is_container());

    assert!(matches!(store.list("missing").await, Err(Error::NotFound(_))));
  }
}
