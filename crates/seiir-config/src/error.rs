use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
  #[error("failed to read specification '{path}'")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse specification '{path}': {message}")]
  Parse { path: PathBuf, message: String },

  #[error("unsupported specification format: '{0}' (expected .yaml, .yml or .json)")]
  UnsupportedFormat(PathBuf),

  #[error("specification reference '{reference}' does not contain {file_name}")]
  MissingReference {
    reference: PathBuf,
    file_name: &'static str,
  },

  #[error("invalid specification: {0}")]
  Invalid(String),

  #[error("failed to serialize specification: {0}")]
  Serialize(String),
}
