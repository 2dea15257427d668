//! The provisioning pipeline.
//!
//! A run goes through these steps, strictly in order, stopping at the first
//! failure without rolling anything back:
//!
//! 1. `--clean`: remove the build directory
//! 2. `--fresh`: remove the backend's package caches
//! 3. bootstrap the package manager if its executable is missing
//! 4. install the manifest for the active triplet
//! 5. create the build directory
//! 6. configure with CMake
//!
//! Staging runs either before or after step 6 depending on the backend (see
//! [`StagingPhase`]). Nothing is recorded beyond what the tools themselves
//! leave on disk, so re-running with the same inputs only re-verifies.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::{BackendContext, BackendError, BackendKind, PackageBackend, StagingPhase};
use crate::bootstrap::{self, BootstrapError};
use crate::config::Settings;
use crate::consts::{DEFAULT_BUILD_DIR, DEFAULT_BUILD_TYPE};
use crate::filesystem::FileSystem;
use crate::generate::{self, BuildConfig};
use crate::platform::os::Os;
use crate::process::{CommandRunner, ProcessError};
use crate::stage::{StageError, StageReport, Stager};
use crate::triplet::Triplet;

#[derive(Debug, Error)]
pub enum ProvisionError {
  #[error("failed to remove '{path}': {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to create '{path}': {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Bootstrap(#[from] BootstrapError),

  #[error(transparent)]
  Backend(#[from] BackendError),

  #[error(transparent)]
  Command(#[from] ProcessError),

  #[error(transparent)]
  Stage(#[from] StageError),
}

impl ProvisionError {
  /// Exit code for the process: the failing child's code where there is one.
  pub fn exit_code(&self) -> i32 {
    match self {
      ProvisionError::Bootstrap(e) => e.exit_code(),
      ProvisionError::Backend(e) => e.exit_code(),
      ProvisionError::Command(e) => e.exit_code(),
      ProvisionError::Remove { .. } | ProvisionError::CreateDir { .. } | ProvisionError::Stage(_) => 1,
    }
  }
}

/// Inputs for one run. Paths are absolute or relative to the process cwd.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionOptions {
  pub project_root: PathBuf,
  pub build_dir: PathBuf,
  pub toolchain_dir: PathBuf,
  pub triplet: Triplet,
  pub build_type: String,
  pub clean: bool,
  pub fresh: bool,
  pub stage: bool,
  /// `-G` value; overrides the configured one.
  pub generator: Option<String>,
  /// `-T` value; overrides the configured one and applies to any triplet.
  pub toolset: Option<String>,
  pub settings: Settings,
}

impl ProvisionOptions {
  /// Defaults for `project_root`: `build/`, the backend's toolchain directory,
  /// `x64-windows`, Release.
  pub fn new(project_root: impl Into<PathBuf>, kind: BackendKind, settings: Settings) -> Self {
    let project_root = project_root.into();
    Self {
      build_dir: project_root.join(DEFAULT_BUILD_DIR),
      toolchain_dir: project_root.join(kind.default_toolchain_dir()),
      triplet: Triplet::default(),
      build_type: DEFAULT_BUILD_TYPE.to_string(),
      clean: false,
      fresh: false,
      stage: settings.staging.enabled,
      generator: None,
      toolset: None,
      settings,
      project_root,
    }
  }

  fn context(&self) -> BackendContext<'_> {
    BackendContext {
      project_root: &self.project_root,
      toolchain_dir: &self.toolchain_dir,
      build_dir: &self.build_dir,
      triplet: &self.triplet,
      build_type: &self.build_type,
    }
  }

  /// An explicit toolset always applies; the configured one only for MSVC
  /// triplets.
  fn effective_toolset(&self) -> Option<String> {
    if self.toolset.is_some() {
      return self.toolset.clone();
    }
    match self.triplet.os() {
      Some(Os::Windows | Os::Uwp) => self.settings.generator.toolset.clone(),
      _ => None,
    }
  }

  fn build_config(&self, toolchain_file: PathBuf) -> BuildConfig {
    let generator = &self.settings.generator;
    BuildConfig {
      program: generator.program.clone(),
      source_root: self.project_root.clone(),
      build_dir: self.build_dir.clone(),
      toolchain_file,
      generator_name: self.generator.clone().or_else(|| generator.name.clone()),
      toolset_version: self.effective_toolset(),
      extra_args: generator.args.clone(),
    }
  }

  /// Shared-library pattern for the active triplet, if its executables need
  /// their libraries beside them.
  fn shared_library_pattern(&self) -> Option<String> {
    if let Some(pattern) = &self.settings.staging.shared_library_pattern {
      return Some(pattern.clone());
    }
    if !self.triplet.needs_colocated_shared_libs() {
      return None;
    }
    self.triplet.os().map(|os| os.shared_library_pattern().to_string())
  }

  /// Where the application's executable lands for the active configuration.
  pub fn output_dir(&self) -> PathBuf {
    self
      .build_dir
      .join(&self.settings.project.app_dir)
      .join(&self.build_type)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionSummary {
  pub backend: BackendKind,
  pub triplet: String,
  pub build_dir: PathBuf,
  pub toolchain_file: PathBuf,
  /// `<build_dir>/<project>.sln`, when the generator produced one.
  pub solution: Option<PathBuf>,
  pub staged: StageReport,
  #[serde(skip)]
  pub elapsed: Duration,
}

pub struct Provisioner<'a> {
  fs: &'a dyn FileSystem,
  runner: &'a dyn CommandRunner,
  backend: &'a dyn PackageBackend,
}

impl<'a> Provisioner<'a> {
  pub fn new(fs: &'a dyn FileSystem, runner: &'a dyn CommandRunner, backend: &'a dyn PackageBackend) -> Self {
    Self { fs, runner, backend }
  }

  pub fn run(&self, options: &ProvisionOptions) -> Result<ProvisionSummary, ProvisionError> {
    let started = Instant::now();
    let ctx = options.context();
    let plan = self.backend.bootstrap_plan(&ctx);
    // Manifest and triplet errors must surface before any command runs.
    let install = self.backend.install_command(&plan.executable, &ctx)?;

    info!(
      backend = %self.backend.kind(),
      triplet = %options.triplet,
      root = %options.project_root.display(),
      "provisioning"
    );

    if options.clean {
      info!(dir = %options.build_dir.display(), "cleaning build directory");
      self.remove_if_present(&options.build_dir)?;
    }

    if options.fresh {
      info!(dir = %options.toolchain_dir.display(), "purging package caches");
      for dir in self.backend.cache_dirs(&ctx) {
        self.remove_if_present(&dir)?;
      }
      if self.fs.is_dir(&options.toolchain_dir) && !self.fs.exists(&plan.executable) {
        debug!("toolchain directory has no executable, removing it");
        self.remove_if_present(&options.toolchain_dir)?;
      }
    }

    bootstrap::ensure(self.fs, self.runner, &plan)?;

    let install_output = match install {
      Some(command) if self.backend.install_reports_graph() => {
        info!("installing packages");
        Some(self.runner.capture(&command)?)
      }
      Some(command) => {
        info!("installing packages");
        self.runner.run(&command)?;
        None
      }
      None => {
        warn!("package manifest is empty, nothing to install");
        None
      }
    };

    if !self.fs.is_dir(&options.build_dir) {
      debug!(dir = %options.build_dir.display(), "creating build directory");
      self
        .fs
        .create_dir_all(&options.build_dir)
        .map_err(|source| ProvisionError::CreateDir {
          path: options.build_dir.clone(),
          source,
        })?;
    }

    let mut staged = StageReport::default();
    let phase = self.backend.staging_phase();

    if phase == StagingPhase::BeforeConfigure {
      staged = self.stage(install_output.as_deref(), options)?;
    }

    let toolchain_file = self.backend.toolchain_file(&ctx);
    generate::invoke(self.runner, &options.build_config(toolchain_file.clone()))?;

    if phase == StagingPhase::AfterConfigure {
      staged = self.stage(install_output.as_deref(), options)?;
    }

    let solution = options
      .build_dir
      .join(format!("{}.sln", options.settings.project.name));

    Ok(ProvisionSummary {
      backend: self.backend.kind(),
      triplet: options.triplet.to_string(),
      build_dir: options.build_dir.clone(),
      toolchain_file,
      solution: self.fs.exists(&solution).then_some(solution),
      staged,
      elapsed: started.elapsed(),
    })
  }

  fn stage(&self, install_output: Option<&str>, options: &ProvisionOptions) -> Result<StageReport, ProvisionError> {
    if !options.stage {
      debug!("staging disabled");
      return Ok(StageReport::default());
    }

    let deps = self
      .backend
      .resolve(self.fs, install_output, &options.context())?;
    let pattern = options.shared_library_pattern();
    let stager = Stager::new(self.fs, &options.project_root, pattern.as_deref())?;
    let report = stager.stage(&deps, &options.output_dir(), self.backend.bindings())?;

    info!(
      binaries = report.binaries.len(),
      bindings = report.bindings.len(),
      "staging complete"
    );
    Ok(report)
  }

  fn remove_if_present(&self, path: &Path) -> Result<(), ProvisionError> {
    if !self.fs.is_dir(path) {
      return Ok(());
    }
    debug!(path = %path.display(), "removing");
    self.fs.remove_dir_all(path).map_err(|source| ProvisionError::Remove {
      path: path.to_path_buf(),
      source,
    })
  }
}
