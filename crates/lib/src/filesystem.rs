//! Filesystem access for the pipeline.
//!
//! Provisioning keeps no state record of its own: "bootstrapped" means the
//! package-manager executable exists, "installed" means the backend's receipts
//! exist. Every such check, and every mutation the pipeline performs, goes
//! through [`FileSystem`] so it lives in one place and tests can swap in an
//! in-memory implementation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

pub trait FileSystem {
  fn exists(&self, path: &Path) -> bool;

  fn is_dir(&self, path: &Path) -> bool;

  /// Create `path` and any missing parents. Succeeds if it already exists.
  fn create_dir_all(&self, path: &Path) -> io::Result<()>;

  /// Recursively delete a directory.
  fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

  /// Regular files below `dir`, sorted. With `recursive` false only direct
  /// children are returned.
  fn list_files(&self, dir: &Path, recursive: bool) -> io::Result<Vec<PathBuf>>;

  /// Copy one file, creating the destination's parent directories.
  fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()>;

  fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// The host filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostFileSystem;

impl FileSystem for HostFileSystem {
  fn exists(&self, path: &Path) -> bool {
    path.exists()
  }

  fn is_dir(&self, path: &Path) -> bool {
    path.is_dir()
  }

  fn create_dir_all(&self, path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
  }

  fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
    debug!(path = %path.display(), "removing directory");
    fs::remove_dir_all(path)
  }

  fn list_files(&self, dir: &Path, recursive: bool) -> io::Result<Vec<PathBuf>> {
    let mut walker = WalkDir::new(dir).min_depth(1);
    if !recursive {
      walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
      let entry = entry.map_err(io::Error::from)?;
      if entry.file_type().is_file() {
        files.push(entry.into_path());
      }
    }
    files.sort();
    Ok(files)
  }

  fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::copy(from, to).map(|_| ())
  }

  fn read_to_string(&self, path: &Path) -> io::Result<String> {
    fs::read_to_string(path)
  }
}
