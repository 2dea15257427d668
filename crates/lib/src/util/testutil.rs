//! Test utilities for snowprov-lib.
//!
//! Cross-platform shell helpers for tests that spawn real processes, plus two
//! fakes: [`MemFileSystem`] and [`RecordingRunner`]. Hooks registered on the
//! runner let a test simulate a command's filesystem effects (a bootstrap
//! script producing the executable, for instance).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::filesystem::FileSystem;
use crate::process::{CommandRunner, CommandSpec, ProcessError};

/// Returns the shell command and args to echo an environment variable.
#[cfg(unix)]
pub fn shell_echo_env(var: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), format!("echo \"${}\"", var)])
}

#[cfg(windows)]
pub fn shell_echo_env(var: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), format!("echo %{}%", var)])
}

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

#[derive(Debug, Clone)]
enum Node {
  Dir,
  File(String),
}

/// In-memory filesystem keyed by path.
#[derive(Debug, Default)]
pub struct MemFileSystem {
  nodes: RefCell<BTreeMap<PathBuf, Node>>,
}

impl MemFileSystem {
  pub fn new() -> Rc<Self> {
    Rc::new(Self::default())
  }

  pub fn add_dir(&self, path: impl AsRef<Path>) {
    let mut nodes = self.nodes.borrow_mut();
    for ancestor in path.as_ref().ancestors() {
      if ancestor.as_os_str().is_empty() {
        continue;
      }
      nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
    }
  }

  pub fn add_file(&self, path: impl AsRef<Path>, content: &str) {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
      self.add_dir(parent);
    }
    self
      .nodes
      .borrow_mut()
      .insert(path.to_path_buf(), Node::File(content.to_string()));
  }

  /// File names (not paths) directly inside `dir`.
  pub fn file_names(&self, dir: impl AsRef<Path>) -> Vec<String> {
    self
      .list_files(dir.as_ref(), false)
      .unwrap_or_default()
      .iter()
      .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
      .collect()
  }

  pub fn content(&self, path: impl AsRef<Path>) -> Option<String> {
    match self.nodes.borrow().get(path.as_ref()) {
      Some(Node::File(content)) => Some(content.clone()),
      _ => None,
    }
  }
}

fn not_found(path: &Path) -> io::Error {
  io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
}

impl FileSystem for MemFileSystem {
  fn exists(&self, path: &Path) -> bool {
    self.nodes.borrow().contains_key(path)
  }

  fn is_dir(&self, path: &Path) -> bool {
    matches!(self.nodes.borrow().get(path), Some(Node::Dir))
  }

  fn create_dir_all(&self, path: &Path) -> io::Result<()> {
    self.add_dir(path);
    Ok(())
  }

  fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
    if !self.is_dir(path) {
      return Err(not_found(path));
    }
    self.nodes.borrow_mut().retain(|p, _| !p.starts_with(path));
    Ok(())
  }

  fn list_files(&self, dir: &Path, recursive: bool) -> io::Result<Vec<PathBuf>> {
    if !self.is_dir(dir) {
      return Err(not_found(dir));
    }
    Ok(
      self
        .nodes
        .borrow()
        .iter()
        .filter(|(p, node)| matches!(node, Node::File(_)) && p.starts_with(dir))
        .filter(|(p, _)| recursive || p.parent() == Some(dir))
        .map(|(p, _)| p.clone())
        .collect(),
    )
  }

  fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()> {
    let content = self.content(from).ok_or_else(|| not_found(from))?;
    self.add_file(to, &content);
    Ok(())
  }

  fn read_to_string(&self, path: &Path) -> io::Result<String> {
    self.content(path).ok_or_else(|| not_found(path))
  }
}

type Hook = Box<dyn Fn(&CommandSpec)>;

/// Runner that records every command instead of executing it.
///
/// Matching is by substring of the rendered command line.
#[derive(Default)]
pub struct RecordingRunner {
  calls: RefCell<Vec<CommandSpec>>,
  failures: RefCell<Vec<(String, i32)>>,
  outputs: RefCell<Vec<(String, String)>>,
  hooks: RefCell<Vec<(String, Hook)>>,
}

impl RecordingRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Make any command whose line contains `needle` exit with `code`.
  pub fn fail_when(&self, needle: &str, code: i32) {
    self.failures.borrow_mut().push((needle.to_string(), code));
  }

  /// Stdout returned by `capture` for commands containing `needle`.
  pub fn respond(&self, needle: &str, stdout: &str) {
    self.outputs.borrow_mut().push((needle.to_string(), stdout.to_string()));
  }

  /// Run `hook` after a successful command containing `needle`.
  pub fn on_command(&self, needle: &str, hook: impl Fn(&CommandSpec) + 'static) {
    self.hooks.borrow_mut().push((needle.to_string(), Box::new(hook)));
  }

  pub fn calls(&self) -> Vec<CommandSpec> {
    self.calls.borrow().clone()
  }

  pub fn lines(&self) -> Vec<String> {
    self.calls.borrow().iter().map(ToString::to_string).collect()
  }

  /// Number of recorded commands whose line contains `needle`.
  pub fn count(&self, needle: &str) -> usize {
    self.lines().iter().filter(|l| l.contains(needle)).count()
  }

  fn record(&self, command: &CommandSpec) -> Result<(), ProcessError> {
    self.calls.borrow_mut().push(command.clone());
    let line = command.to_string();

    if let Some((_, code)) = self.failures.borrow().iter().find(|(n, _)| line.contains(n.as_str())) {
      return Err(ProcessError::Failed {
        command: line,
        code: Some(*code),
      });
    }

    for (needle, hook) in self.hooks.borrow().iter() {
      if line.contains(needle.as_str()) {
        hook(command);
      }
    }
    Ok(())
  }
}

impl CommandRunner for RecordingRunner {
  fn run(&self, command: &CommandSpec) -> Result<(), ProcessError> {
    self.record(command)
  }

  fn capture(&self, command: &CommandSpec) -> Result<String, ProcessError> {
    self.record(command)?;
    let line = command.to_string();
    Ok(
      self
        .outputs
        .borrow()
        .iter()
        .find(|(n, _)| line.contains(n.as_str()))
        .map(|(_, out)| out.clone())
        .unwrap_or_default(),
    )
  }
}
