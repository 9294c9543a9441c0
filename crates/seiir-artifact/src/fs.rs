use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::key::{split_parent, validate_key};
use crate::{Entry, EntryKind, Error, Store};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Filesystem-backed artifact store.
///
/// Keys map onto paths below the root:
/// ```text
/// {root}/
/// ├── info/
/// │   └── mobility_info.csv
/// └── beta/
///     └── 102/
///         └── regression_draw_0.csv
/// ```
///
/// Writes go to a hidden temporary file in the target directory which is then
/// hard-linked into place. Linking fails if the target exists, so an existing
/// artifact is never replaced and readers never see a partial file.
#[derive(Debug, Clone)]
pub struct FsStore {
  root: PathBuf,
}

impl FsStore {
  /// Create a store rooted at `root`. The directory does not have to exist yet.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Get the root directory of the store.
  pub fn root(&self) -> &Path {
    &self.root
  }

  fn resolve(&self, key: &str) -> Result<PathBuf, Error> {
    validate_key(key)?;
    if key.is_empty() {
      Ok(self.root.clone())
    } else {
      Ok(self.root.join(key))
    }
  }

  fn temp_path(&self, key: &str) -> Result<PathBuf, Error> {
    let (parent, name) = split_parent(key);
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let temp_name = format!(".{}.tmp.{}.{}", name, std::process::id(), n);
    Ok(self.resolve(parent)?.join(temp_name))
  }
}

fn is_temp_name(name: &str) -> bool {
  name.starts_with('.') && name.contains(".tmp.")
}

fn map_io(key: &str, e: std::io::Error) -> Error {
  match e.kind() {
    ErrorKind::NotFound => Error::NotFound(key.to_string()),
    ErrorKind::AlreadyExists => Error::AlreadyExists(key.to_string()),
    _ => Error::Io(e),
  }
}

#[async_trait]
impl Store for FsStore {
  async fn exists(&self, key: &str) -> Result<bool, Error> {
    let path = self.resolve(key)?;
    Ok(fs::try_exists(&path).await?)
  }

  async fn create_once(&self, key: &str) -> Result<(), Error> {
    let path = self.resolve(key)?;
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).await?;
    }
    // create_dir (not create_dir_all) so an existing directory is an error.
    fs::create_dir(&path).await.map_err(|e| map_io(key, e))
  }

  async fn list(&self, key: &str) -> Result<Vec<Entry>, Error> {
    let path = self.resolve(key)?;
    let mut entries = fs::read_dir(&path).await.map_err(|e| map_io(key, e))?;
    let mut listed = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
      let name = match entry.file_name().into_string() {
        Ok(n) => n,
        Err(_) => continue,
      };
      if is_temp_name(&name) {
        continue;
      }
      let kind = if entry.file_type().await?.is_dir() {
        EntryKind::Container
      } else {
        EntryKind::Object
      };
      listed.push(Entry { name, kind });
    }

    listed.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(listed)
  }

  async fn read(&self, key: &str) -> Result<Bytes, Error> {
    let path = self.resolve(key)?;
    let data = fs::read(&path).await.map_err(|e| map_io(key, e))?;
    Ok(Bytes::from(data))
  }

  async fn write_atomic(&self, key: &str, data: Bytes) -> Result<(), Error> {
    if key.is_empty() {
      return Err(Error::InvalidKey {
        key: String::new(),
        reason: "cannot write to the store root",
      });
    }
    let target = self.resolve(key)?;
    if fs::try_exists(&target).await? {
      return Err(Error::AlreadyExists(key.to_string()));
    }
    if let Some(parent) = target.parent() {
      fs::create_dir_all(parent).await?;
    }

    let temp = self.temp_path(key)?;
    let mut file = fs::OpenOptions::new()
      .write(true)
      .create_new(true)
      .open(&temp)
      .await?;
    let written = async {
      file.write_all(&data).await?;
      file.sync_all().await
    }
    .await;
    drop(file);
    if let Err(e) = written {
      let _ = fs::remove_file(&temp).await;
      return Err(Error::Io(e));
    }

    let linked = fs::hard_link(&temp, &target).await;
    let _ = fs::remove_file(&temp).await;
    linked.map_err(|e| map_io(key, e))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_write_then_read() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());

    store
      .write_atomic("beta/102/draw_0.csv", Bytes::from_static(b"a,b\n1,2\n"))
      .await
      .unwrap();

    assert!(store.exists("beta/102").await.unwrap());
    let data = store.read("beta/102/draw_0.csv").await.unwrap();
    assert_eq!(&data[..], b"a,b\n1,2\n");
  }

  #[tokio::test]
  async fn test_write_never_replaces() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());

    store
      .write_atomic("x.csv", Bytes::from_static(b"first"))
      .await
      .unwrap();
    let err = store
      .write_atomic("x.csv", Bytes::from_static(b"second"))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));
    assert_eq!(&store.read("x.csv").await.unwrap()[..], b"first");

    // No temporary files are left behind.
    let names: Vec<_> = std::fs::read_dir(dir.path())
      .unwrap()
      .map(|e| e.unwrap().file_name().into_string().unwrap())
      .collect();
    assert_eq!(names, vec!["x.csv".to_string()]);
  }

  #[tokio::test]
  async fn test_create_once_conflict_leaves_contents() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());

    store.create_once("loc_102").await.unwrap();
    store
      .write_atomic("loc_102/keep.csv", Bytes::from_static(b"keep"))
      .await
      .unwrap();

    let err = store.create_once("loc_102").await.unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));
    assert_eq!(&store.read("loc_102/keep.csv").await.unwrap()[..], b"keep");
  }

  #[tokio::test]
  async fn test_list_sorted_with_kinds() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());

    store.create_once("b_dir").await.unwrap();
    store
      .write_atomic("a_file.csv", Bytes::from_static(b""))
      .await
      .unwrap();

    let entries = store.list("").await.unwrap();
    assert_eq!(
      entries,
      vec![
        Entry {
          name: "a_file.csv".to_string(),
          kind: EntryKind::Object
        },
        Entry {
          name: "b_dir".to_string(),
          kind: EntryKind::Container
        },
      ]
    );
  }

  #[tokio::test]
  async fn test_missing_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());

    assert!(!store.exists("nope.csv").await.unwrap());
    assert!(matches!(
      store.read("nope.csv").await,
      Err(Error::NotFound(_))
    ));
    assert!(matches!(store.list("nope").await, Err(Error::NotFound(_))));
  }
}
