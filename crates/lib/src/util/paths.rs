use std::path::{Path, PathBuf};

/// Resolve `path` against `root` unless it is already absolute.
pub fn resolve_under(root: &Path, path: &Path) -> PathBuf {
  if path.is_absolute() {
    path.to_path_buf()
  } else {
    root.join(path)
  }
}

/// Canonicalize an existing directory without the `\\?\` prefix on Windows.
///
/// Falls back to the path as given when it cannot be canonicalized (it may not
/// exist yet).
pub fn normalize(path: &Path) -> PathBuf {
  dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn relative_paths_join_root() {
    assert_eq!(
      resolve_under(Path::new("/proj"), Path::new("build")),
      PathBuf::from("/proj/build")
    );
  }

  #[test]
  #[cfg(unix)]
  fn absolute_paths_are_kept() {
    assert_eq!(
      resolve_under(Path::new("/proj"), Path::new("/tmp/out")),
      PathBuf::from("/tmp/out")
    );
  }

  #[test]
  fn normalize_missing_path_is_identity() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("not-yet");
    assert_eq!(normalize(&missing), missing);
  }

  #[test]
  fn normalize_existing_path_is_absolute() {
    let temp = TempDir::new().unwrap();
    assert!(normalize(temp.path()).is_absolute());
  }
}
