//! One-time acquisition of the package-manager executable.
//!
//! The executable's presence is the only "bootstrapped" marker. When it is
//! present, [`ensure`] returns straight away; when absent, it runs the fetch,
//! bootstrap and integrate steps in order. A failed step leaves whatever the
//! step left behind; recovery is `--fresh` or deleting the toolchain directory.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::filesystem::FileSystem;
use crate::process::{CommandRunner, CommandSpec, ProcessError};

#[derive(Debug, Error)]
pub enum BootstrapError {
  #[error("failed to create '{path}': {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{step} step failed: {source}")]
  Step {
    step: &'static str,
    #[source]
    source: ProcessError,
  },

  #[error("bootstrap finished but '{0}' does not exist")]
  Incomplete(PathBuf),
}

impl BootstrapError {
  pub fn exit_code(&self) -> i32 {
    match self {
      BootstrapError::Step { source, .. } => source.exit_code(),
      BootstrapError::CreateDir { .. } | BootstrapError::Incomplete(_) => 1,
    }
  }
}

/// How a backend acquires its tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPlan {
  pub toolchain_dir: PathBuf,
  pub executable: PathBuf,
  /// Populates `toolchain_dir` (clone, virtualenv creation).
  pub fetch: CommandSpec,
  /// Produces `executable`; runs inside `toolchain_dir`.
  pub bootstrap: CommandSpec,
  /// Makes the tool discoverable by the ambient build environment.
  pub integrate: CommandSpec,
}

/// Make sure the plan's executable exists and return its path.
pub fn ensure(fs: &dyn FileSystem, runner: &dyn CommandRunner, plan: &BootstrapPlan) -> Result<PathBuf, BootstrapError> {
  if fs.exists(&plan.executable) {
    debug!(path = %plan.executable.display(), "package manager already bootstrapped");
    return Ok(plan.executable.clone());
  }

  info!(dir = %plan.toolchain_dir.display(), "bootstrapping package manager");

  if let Some(parent) = plan.toolchain_dir.parent().filter(|p| !p.as_os_str().is_empty()) {
    create_dir(fs, parent)?;
  }

  let steps = [
    ("fetch", &plan.fetch),
    ("bootstrap", &plan.bootstrap),
    ("integrate", &plan.integrate),
  ];
  for (step, command) in steps {
    debug!(step, "running bootstrap step");
    runner
      .run(command)
      .map_err(|source| BootstrapError::Step { step, source })?;
  }

  if !fs.exists(&plan.executable) {
    return Err(BootstrapError::Incomplete(plan.executable.clone()));
  }

  info!(path = %plan.executable.display(), "package manager ready");
  Ok(plan.executable.clone())
}

fn create_dir(fs: &dyn FileSystem, path: &Path) -> Result<(), BootstrapError> {
  fs.create_dir_all(path).map_err(|source| BootstrapError::CreateDir {
    path: path.to_path_buf(),
    source,
  })
}
