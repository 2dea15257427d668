//! External command execution.
//!
//! Every tool the pipeline drives (git, the vcpkg bootstrap script, vcpkg,
//! python/pip, conan, cmake) goes through a [`CommandRunner`]. The production
//! runner echoes the command, inherits stdout/stderr and blocks until the child
//! exits. With [`Console::Stderr`] both the echo and the child's stdout go to
//! stderr, leaving stdout to the caller. A nonzero exit is surfaced as [`ProcessError::Failed`] carrying the
//! child's exit code so the binary can exit with it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::debug;

/// Exit code used when a command could not be started at all.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// Environment variables layered on top of the inherited environment for a
/// single command.
pub type EnvOverlay = BTreeMap<String, String>;

/// Errors produced while running an external command.
#[derive(Debug, Error)]
pub enum ProcessError {
  /// The program could not be started.
  #[error("failed to start '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// The program ran and exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {command}")]
  Failed { command: String, code: Option<i32> },

  /// Captured stdout was not valid UTF-8.
  #[error("output of '{command}' is not valid UTF-8")]
  InvalidOutput { command: String },
}

impl ProcessError {
  /// Exit code the orchestrator should terminate with.
  ///
  /// A child killed by a signal has no code and maps to 1.
  pub fn exit_code(&self) -> i32 {
    match self {
      ProcessError::Spawn { .. } => SPAWN_FAILURE_EXIT_CODE,
      ProcessError::Failed { code, .. } => code.unwrap_or(1),
      ProcessError::InvalidOutput { .. } => 1,
    }
  }
}

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: Option<PathBuf>,
  pub env: EnvOverlay,
}

impl CommandSpec {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: None,
      env: EnvOverlay::new(),
    }
  }

  /// Command whose program is a path on disk (a bootstrapped executable).
  pub fn for_path(program: &Path) -> Self {
    Self::new(program.display().to_string())
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn path_arg(self, path: &Path) -> Self {
    self.arg(path.display().to_string())
  }

  pub fn current_dir(mut self, dir: &Path) -> Self {
    self.cwd = Some(dir.to_path_buf());
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  pub fn envs(mut self, overlay: &EnvOverlay) -> Self {
    self.env.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    self
  }

  fn to_command(&self) -> Command {
    let mut command = Command::new(&self.program);
    command.args(&self.args);
    if let Some(cwd) = &self.cwd {
      command.current_dir(cwd);
    }
    for (key, value) in &self.env {
      command.env(key, value);
    }
    command
  }
}

impl fmt::Display for CommandSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program)?;
    for arg in &self.args {
      if arg.is_empty() || arg.contains(char::is_whitespace) {
        write!(f, " \"{}\"", arg)?;
      } else {
        write!(f, " {}", arg)?;
      }
    }
    Ok(())
  }
}

/// Runs external commands on behalf of the pipeline.
pub trait CommandRunner {
  /// Run a command with inherited stdio, failing on nonzero exit.
  fn run(&self, command: &CommandSpec) -> Result<(), ProcessError>;

  /// Run a command and return its stdout. stderr still streams through.
  fn capture(&self, command: &CommandSpec) -> Result<String, ProcessError>;
}

/// Stream that receives command echoes and inherited child stdout.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Console {
  #[default]
  Stdout,
  Stderr,
}

/// Runs commands on the host with `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner {
  console: Console,
}

impl SystemRunner {
  pub fn new(console: Console) -> Self {
    Self { console }
  }

  fn echo(&self, command: &CommandSpec) {
    match self.console {
      Console::Stdout => println!("> {}", command),
      Console::Stderr => eprintln!("> {}", command),
    }
    debug!(cwd = ?command.cwd, env = ?command.env, "spawning process");
  }

  fn spawn_error(command: &CommandSpec, source: std::io::Error) -> ProcessError {
    ProcessError::Spawn {
      program: command.program.clone(),
      source,
    }
  }
}

impl CommandRunner for SystemRunner {
  fn run(&self, command: &CommandSpec) -> Result<(), ProcessError> {
    self.echo(command);

    let mut child = command.to_command();
    if self.console == Console::Stderr {
      child.stdout(Stdio::from(std::io::stderr()));
    }
    let status = child
      .status()
      .map_err(|e| Self::spawn_error(command, e))?;

    if !status.success() {
      return Err(ProcessError::Failed {
        command: command.to_string(),
        code: status.code(),
      });
    }
    Ok(())
  }

  fn capture(&self, command: &CommandSpec) -> Result<String, ProcessError> {
    self.echo(command);

    let output = command
      .to_command()
      .stdout(Stdio::piped())
      .stderr(Stdio::inherit())
      .output()
      .map_err(|e| Self::spawn_error(command, e))?;

    if !output.status.success() {
      return Err(ProcessError::Failed {
        command: command.to_string(),
        code: output.status.code(),
      });
    }

    String::from_utf8(output.stdout).map_err(|_| ProcessError::InvalidOutput {
      command: command.to_string(),
    })
  }
}
