use crate::Error;

/// Check that `key` is a relative, normalized `/`-separated path.
///
/// The empty key names the store root.
pub fn validate_key(key: &str) -> Result<(), Error> {
  if key.is_empty() {
    return Ok(());
  }

  let invalid = |reason| Error::InvalidKey {
    key: key.to_string(),
    reason,
  };

  if key.starts_with('/') {
    return Err(invalid("must be relative"));
  }
  if key.contains('\\') {
    return Err(invalid("must use '/' separators"));
  }
  for segment in key.split('/') {
    match segment {
      "" => return Err(invalid("empty path segment")),
      "." | ".." => return Err(invalid("relative path segment")),
      _ => {}
    }
  }
  Ok(())
}

/// Join key segments with `/`, skipping empty ones.
pub fn join_key<I, S>(segments: I) -> String
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  segments
    .into_iter()
    .filter(|s| !s.as_ref().is_empty())
    .map(|s| s.as_ref().to_string())
    .collect::<Vec<_>>()
    .join("/")
}

/// Split a key into its parent and final segment.
pub(crate) fn split_parent(key: &str) -> (&str, &str) {
  match key.rfind('/') {
    Some(i) => (&key[..i], &key[i + 1..]),
    None => ("", key),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_valid_keys() {
    assert!(validate_key("").is_ok());
    assert!(validate_key("beta/102/regression_draw_0.csv").is_ok());
  }

  #[test]
  fn test_invalid_keys() {
    for key in ["/abs", "a//b", "a/../b", "./a", "a/", "a\\b"] {
      assert!(
        matches!(validate_key(key), Err(Error::InvalidKey { .. })),
        "{key} should be rejected"
      );
    }
  }

  #[test]
  fn test_join_key_skips_empty() {
    assert_eq!(join_key(["", "info", "file.csv"]), "info/file.csv");
    assert_eq!(join_key(Vec::<String>::new()), "");
  }

  #[test]
  fn test_split_parent() {
    assert_eq!(split_parent("a/b/c.csv"), ("a/b", "c.csv"));
    assert_eq!(split_parent("c.csv"), ("", "c.csv"));
  }
}
