//! CMake configure step.
//!
//! One command points CMake at the source tree, the build directory and the
//! backend's toolchain-integration file. Re-running it against an existing
//! build directory just re-configures.

use std::path::PathBuf;

use tracing::info;

use crate::process::{CommandRunner, CommandSpec, ProcessError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
  pub program: String,
  pub source_root: PathBuf,
  pub build_dir: PathBuf,
  pub toolchain_file: PathBuf,
  pub generator_name: Option<String>,
  pub toolset_version: Option<String>,
  pub extra_args: Vec<String>,
}

impl BuildConfig {
  pub fn command(&self) -> CommandSpec {
    let mut command = CommandSpec::new(&self.program)
      .arg("-S")
      .path_arg(&self.source_root)
      .arg("-B")
      .path_arg(&self.build_dir)
      .arg(format!("-DCMAKE_TOOLCHAIN_FILE={}", self.toolchain_file.display()));

    if let Some(toolset) = &self.toolset_version {
      command = command.args(["-T", toolset.as_str()]);
    }
    if let Some(generator) = &self.generator_name {
      command = command.args(["-G", generator.as_str()]);
    }
    command.args(self.extra_args.iter().cloned())
  }
}

pub fn invoke(runner: &dyn CommandRunner, config: &BuildConfig) -> Result<(), ProcessError> {
  info!(
    build_dir = %config.build_dir.display(),
    toolchain = %config.toolchain_file.display(),
    "configuring build system"
  );
  runner.run(&config.command())
}
