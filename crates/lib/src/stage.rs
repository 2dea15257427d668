//! Artifact staging.
//!
//! After resolution the backend hands over its view of the dependency graph as
//! [`ResolvedDependency`] values. Staging copies two kinds of artifacts out of
//! it:
//!
//! - binding sources a dependency ships as source (ImGui's GLFW/OpenGL
//!   backends), vendored into the application tree so they compile as
//!   first-party code; relative paths below the filter's `from` are kept
//! - shared libraries, flattened into the application's output directory on
//!   targets whose loader only looks beside the executable
//!
//! Nothing matching a pattern is normal and never an error. Copies overwrite,
//! so staging twice gives the same tree.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::filesystem::FileSystem;

#[derive(Debug, Error)]
pub enum StageError {
  #[error("invalid pattern '{pattern}': {source}")]
  InvalidPattern {
    pattern: String,
    #[source]
    source: glob::PatternError,
  },

  #[error("failed to list '{path}': {source}")]
  List {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to copy '{from}' to '{to}': {source}")]
  Copy {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// A package as installed by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
  pub name: String,
  pub version: Option<String>,
  pub install_prefix: PathBuf,
  pub is_shared_library: bool,
  pub binary_dir: PathBuf,
  /// File names in `binary_dir` that belong to this package, when the
  /// directory is shared with other packages.
  pub owned_binaries: Option<BTreeSet<String>>,
}

/// Source files to vendor from a dependency into the project tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingFilter {
  /// Dependency name.
  pub package: String,
  /// Directory under the dependency's install prefix.
  pub from: PathBuf,
  /// Glob matched against file names.
  pub pattern: String,
  /// Destination relative to the project root.
  pub to: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedFile {
  pub dependency: String,
  pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
  pub bindings: Vec<StagedFile>,
  pub binaries: Vec<StagedFile>,
}

const NAME_MATCH: MatchOptions = MatchOptions {
  case_sensitive: true,
  require_literal_separator: false,
  require_literal_leading_dot: false,
};

const BINARY_MATCH: MatchOptions = MatchOptions {
  case_sensitive: false,
  require_literal_separator: false,
  require_literal_leading_dot: false,
};

fn compile(pattern: &str) -> Result<Pattern, StageError> {
  Pattern::new(pattern).map_err(|source| StageError::InvalidPattern {
    pattern: pattern.to_string(),
    source,
  })
}

fn file_name(path: &Path) -> Option<&str> {
  path.file_name().and_then(|n| n.to_str())
}

pub struct Stager<'a> {
  fs: &'a dyn FileSystem,
  project_root: PathBuf,
  shared_libraries: Option<Pattern>,
}

impl<'a> Stager<'a> {
  /// `shared_library_pattern` is `None` when the target does not need shared
  /// libraries beside the executable; only bindings are staged then.
  pub fn new(
    fs: &'a dyn FileSystem,
    project_root: &Path,
    shared_library_pattern: Option<&str>,
  ) -> Result<Self, StageError> {
    Ok(Self {
      fs,
      project_root: project_root.to_path_buf(),
      shared_libraries: shared_library_pattern.map(compile).transpose()?,
    })
  }

  pub fn stage(
    &self,
    deps: &[ResolvedDependency],
    output_dir: &Path,
    bindings: &[BindingFilter],
  ) -> Result<StageReport, StageError> {
    let mut report = StageReport::default();

    for filter in bindings {
      self.stage_binding(deps, filter, &mut report)?;
    }

    if let Some(pattern) = &self.shared_libraries {
      for dep in deps.iter().filter(|d| d.is_shared_library) {
        self.stage_binaries(dep, pattern, output_dir, &mut report)?;
      }
    }

    Ok(report)
  }

  fn list(&self, dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, StageError> {
    self.fs.list_files(dir, recursive).map_err(|source| StageError::List {
      path: dir.to_path_buf(),
      source,
    })
  }

  fn copy(&self, from: &Path, to: &Path) -> Result<(), StageError> {
    self.fs.copy_file(from, to).map_err(|source| StageError::Copy {
      from: from.to_path_buf(),
      to: to.to_path_buf(),
      source,
    })
  }

  fn stage_binding(
    &self,
    deps: &[ResolvedDependency],
    filter: &BindingFilter,
    report: &mut StageReport,
  ) -> Result<(), StageError> {
    let Some(dep) = deps.iter().find(|d| d.name == filter.package) else {
      debug!(package = %filter.package, "binding source package not resolved, skipping");
      return Ok(());
    };

    let source_dir = dep.install_prefix.join(&filter.from);
    if !self.fs.is_dir(&source_dir) {
      debug!(dir = %source_dir.display(), "binding source directory missing, skipping");
      return Ok(());
    }

    let pattern = compile(&filter.pattern)?;
    let dest_dir = self.project_root.join(&filter.to);

    let mut copied = 0;
    for file in self.list(&source_dir, true)? {
      if !file_name(&file).is_some_and(|n| pattern.matches_with(n, NAME_MATCH)) {
        continue;
      }
      let Ok(relative) = file.strip_prefix(&source_dir) else {
        continue;
      };
      let dest = dest_dir.join(relative);
      self.copy(&file, &dest)?;
      report.bindings.push(StagedFile {
        dependency: dep.name.clone(),
        path: dest,
      });
      copied += 1;
    }

    if copied > 0 {
      info!(
        dependency = %dep.name,
        pattern = %filter.pattern,
        destination = %dest_dir.display(),
        count = copied,
        "copied binding sources"
      );
    } else {
      debug!(dependency = %dep.name, pattern = %filter.pattern, "no binding sources matched");
    }
    Ok(())
  }

  fn stage_binaries(
    &self,
    dep: &ResolvedDependency,
    pattern: &Pattern,
    output_dir: &Path,
    report: &mut StageReport,
  ) -> Result<(), StageError> {
    if !self.fs.is_dir(&dep.binary_dir) {
      debug!(dependency = %dep.name, dir = %dep.binary_dir.display(), "no binary directory");
      return Ok(());
    }

    let mut copied = 0;
    for file in self.list(&dep.binary_dir, false)? {
      let Some(name) = file_name(&file) else {
        continue;
      };
      if !pattern.matches_with(name, BINARY_MATCH) {
        continue;
      }
      if dep.owned_binaries.as_ref().is_some_and(|owned| !owned.contains(name)) {
        continue;
      }
      let dest = output_dir.join(name);
      self.copy(&file, &dest)?;
      report.binaries.push(StagedFile {
        dependency: dep.name.clone(),
        path: dest,
      });
      copied += 1;
    }

    if copied > 0 {
      info!(
        dependency = %dep.name,
        destination = %output_dir.display(),
        count = copied,
        "copied shared libraries"
      );
    }
    Ok(())
  }
}
