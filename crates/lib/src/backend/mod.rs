//! Package-management backends.
//!
//! Both backends drive the same pipeline (bootstrap, install, configure,
//! stage); they differ in how the tool is acquired, how packages are named and
//! where the resolved graph comes from. The provisioner only talks to
//! [`PackageBackend`].

pub mod conan;
pub mod vcpkg;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bootstrap::BootstrapPlan;
use crate::config::Settings;
use crate::consts::{DEFAULT_CONAN_DIR, DEFAULT_VCPKG_DIR};
use crate::filesystem::FileSystem;
use crate::manifest::ManifestError;
use crate::process::{CommandSpec, ProcessError};
use crate::stage::{BindingFilter, ResolvedDependency};
use crate::triplet::TripletError;

pub use conan::ConanBackend;
pub use vcpkg::VcpkgBackend;

#[derive(Debug, Error)]
pub enum BackendError {
  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Triplet(#[from] TripletError),

  #[error(transparent)]
  Command(#[from] ProcessError),

  #[error("failed to read '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("could not parse dependency graph: {0}")]
  Graph(#[from] serde_json::Error),
}

impl BackendError {
  pub fn exit_code(&self) -> i32 {
    match self {
      BackendError::Command(e) => e.exit_code(),
      _ => 1,
    }
  }
}

/// Where a run's paths and target live, as seen by a backend.
#[derive(Debug, Clone, Copy)]
pub struct BackendContext<'a> {
  pub project_root: &'a Path,
  pub toolchain_dir: &'a Path,
  pub build_dir: &'a Path,
  pub triplet: &'a crate::triplet::Triplet,
  pub build_type: &'a str,
}

/// When a backend runs the artifact stager relative to the CMake configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingPhase {
  /// Staging is part of the backend's own generate step, before CMake.
  BeforeConfigure,
  AfterConfigure,
}

pub trait PackageBackend {
  fn kind(&self) -> BackendKind;

  fn bootstrap_plan(&self, ctx: &BackendContext<'_>) -> BootstrapPlan;

  /// Directories `--fresh` removes to force a full reinstall.
  fn cache_dirs(&self, ctx: &BackendContext<'_>) -> Vec<PathBuf>;

  /// The install command, or `None` when there is nothing to install.
  fn install_command(&self, executable: &Path, ctx: &BackendContext<'_>) -> Result<Option<CommandSpec>, BackendError>;

  /// Toolchain-integration file handed to CMake.
  fn toolchain_file(&self, ctx: &BackendContext<'_>) -> PathBuf;

  fn staging_phase(&self) -> StagingPhase;

  /// Binding sources to vendor into the project tree.
  fn bindings(&self) -> &[BindingFilter];

  /// Whether the install command prints the installed graph on stdout.
  ///
  /// When it does, the provisioner captures that output and hands it to
  /// [`PackageBackend::resolve`].
  fn install_reports_graph(&self) -> bool {
    false
  }

  /// The installed dependency set, read from the backend's own records or
  /// from the captured install output.
  fn resolve(
    &self,
    fs: &dyn FileSystem,
    install_output: Option<&str>,
    ctx: &BackendContext<'_>,
  ) -> Result<Vec<ResolvedDependency>, BackendError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
  #[default]
  Vcpkg,
  Conan,
}

impl BackendKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      BackendKind::Vcpkg => "vcpkg",
      BackendKind::Conan => "conan",
    }
  }

  /// Toolchain directory used when none is given, relative to the project root.
  pub fn default_toolchain_dir(&self) -> &'static str {
    match self {
      BackendKind::Vcpkg => DEFAULT_VCPKG_DIR,
      BackendKind::Conan => DEFAULT_CONAN_DIR,
    }
  }
}

impl fmt::Display for BackendKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for BackendKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "vcpkg" => Ok(BackendKind::Vcpkg),
      "conan" => Ok(BackendKind::Conan),
      other => Err(format!("unknown backend '{}', expected vcpkg or conan", other)),
    }
  }
}

/// Build the backend selected by `kind` from the loaded settings.
pub fn create_backend(kind: BackendKind, settings: &Settings) -> Box<dyn PackageBackend> {
  match kind {
    BackendKind::Vcpkg => Box::new(VcpkgBackend::from_settings(&settings.vcpkg)),
    BackendKind::Conan => Box::new(ConanBackend::from_settings(&settings.conan)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn backend_kind_parses_case_insensitively() {
    assert_eq!("vcpkg".parse::<BackendKind>(), Ok(BackendKind::Vcpkg));
    assert_eq!("Conan".parse::<BackendKind>(), Ok(BackendKind::Conan));
    assert!("cpm".parse::<BackendKind>().is_err());
  }

  #[test]
  fn default_toolchain_dirs() {
    assert_eq!(BackendKind::Vcpkg.default_toolchain_dir(), "vcpkg");
    assert_eq!(BackendKind::Conan.default_toolchain_dir(), ".conan");
  }

  #[test]
  fn create_backend_honours_kind() {
    let settings = Settings::default();
    assert_eq!(create_backend(BackendKind::Vcpkg, &settings).kind(), BackendKind::Vcpkg);
    assert_eq!(create_backend(BackendKind::Conan, &settings).kind(), BackendKind::Conan);
  }
}
