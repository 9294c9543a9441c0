//! Loading and saving of specification files.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SpecError;

/// Common behaviour of every stage specification.
///
/// Implementors only supply the canonical file name and a validation rule;
/// reading, format detection and reference resolution are shared.
pub trait Specification: Serialize + DeserializeOwned + Sized {
  /// File name the stage writes its specification under, inside its output root.
  const FILE_NAME: &'static str;

  /// Check invariants that serde cannot express.
  fn validate(&self) -> Result<(), SpecError>;

  /// The stage's own output root.
  fn output_root(&self) -> &Path;

  /// Load and validate a specification file.
  fn from_path(path: impl AsRef<Path>) -> Result<Self, SpecError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| SpecError::Io {
      path: path.to_path_buf(),
      source,
    })?;

    let spec: Self = match Format::of(path)? {
      Format::Yaml => serde_yaml::from_str(&content).map_err(|e| SpecError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
      })?,
      Format::Json => serde_json::from_str(&content).map_err(|e| SpecError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
      })?,
    };

    spec.validate()?;
    Ok(spec)
  }

  /// Load the specification a previous stage wrote into its output root.
  fn from_version_root(root: impl AsRef<Path>) -> Result<Self, SpecError> {
    let root = root.as_ref();
    if root.as_os_str().is_empty() {
      return Err(SpecError::Invalid(format!(
        "empty reference to {}",
        Self::FILE_NAME
      )));
    }

    let path = root.join(Self::FILE_NAME);
    if !path.is_file() {
      return Err(SpecError::MissingReference {
        reference: root.to_path_buf(),
        file_name: Self::FILE_NAME,
      });
    }
    Self::from_path(path)
  }

  /// Serialize to YAML, the format stages record their own specification in.
  fn to_yaml(&self) -> Result<String, SpecError> {
    serde_yaml::to_string(self).map_err(|e| SpecError::Serialize(e.to_string()))
  }
}

enum Format {
  Yaml,
  Json,
}

impl Format {
  fn of(path: &Path) -> Result<Self, SpecError> {
    match path.extension().and_then(|e| e.to_str()) {
      Some("yaml") | Some("yml") => Ok(Format::Yaml),
      Some("json") => Ok(Format::Json),
      _ => Err(SpecError::UnsupportedFormat(path.to_path_buf())),
    }
  }
}

/// Shared validation helper: a path field must not be empty.
pub(crate) fn require_path(field: &str, path: &Path) -> Result<(), SpecError> {
  if path.as_os_str().is_empty() {
    return Err(SpecError::Invalid(format!("{field} must not be empty")));
  }
  Ok(())
}

/// Shared validation helper: a draw count must be positive.
pub(crate) fn require_draws(field: &str, n_draws: u32) -> Result<(), SpecError> {
  if n_draws == 0 {
    return Err(SpecError::Invalid(format!("{field} must be at least 1")));
  }
  Ok(())
}
