//! Conan 2, installed with pip into a virtualenv inside the project.
//!
//! ```text
//! .conan/                 # the virtualenv
//! ├── bin/conan           # Scripts\conan.exe on Windows hosts
//! └── home/               # CONAN_HOME, so the user's cache is never touched
//!     └── p/              # package cache
//! ```
//!
//! Settings come from the triplet, so an unrecognised triplet is an error here
//! even though vcpkg would accept it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{BackendContext, BackendError, BackendKind, PackageBackend, StagingPhase};
use crate::bootstrap::BootstrapPlan;
use crate::config::ConanSettings;
use crate::consts::CONAN_HOME_VAR;
use crate::filesystem::FileSystem;
use crate::manifest::Manifest;
use crate::platform::exe_name;
use crate::process::{CommandSpec, EnvOverlay};
use crate::stage::{BindingFilter, ResolvedDependency};

#[derive(Debug, Clone)]
pub struct ConanBackend {
  manifest: Manifest,
  requirement: String,
  python: String,
  generators: Vec<String>,
  options: Vec<String>,
  build_policy: String,
  bindings: Vec<BindingFilter>,
}

impl ConanBackend {
  pub fn from_settings(settings: &ConanSettings) -> Self {
    Self {
      manifest: settings.packages.clone(),
      requirement: settings.requirement.clone(),
      python: settings.python.clone(),
      generators: settings.generators.clone(),
      options: settings.options.clone(),
      build_policy: settings.build_policy.clone(),
      bindings: settings.bindings.clone(),
    }
  }

  fn scripts_dir(venv: &Path) -> PathBuf {
    if cfg!(windows) {
      venv.join("Scripts")
    } else {
      venv.join("bin")
    }
  }

  pub fn executable(toolchain_dir: &Path) -> PathBuf {
    Self::scripts_dir(toolchain_dir).join(exe_name("conan"))
  }

  fn home(toolchain_dir: &Path) -> PathBuf {
    toolchain_dir.join("home")
  }

  fn home_env(toolchain_dir: &Path) -> EnvOverlay {
    let mut env = EnvOverlay::new();
    env.insert(CONAN_HOME_VAR.to_string(), Self::home(toolchain_dir).display().to_string());
    env
  }

  /// Requirements, settings and options for `install`.
  fn graph_args(&self, ctx: &BackendContext<'_>) -> Result<Vec<String>, BackendError> {
    let (arch, os) = ctx.triplet.require_parts()?;

    let mut args: Vec<String> = self
      .manifest
      .conan_references()?
      .into_iter()
      .map(|reference| format!("--requires={}", reference))
      .collect();

    args.extend([
      "-s".to_string(),
      format!("build_type={}", ctx.build_type),
      "-s".to_string(),
      format!("arch={}", arch.conan_setting()),
      "-s".to_string(),
      format!("os={}", os.conan_setting()),
    ]);
    for option in &self.options {
      args.push("-o".to_string());
      args.push(option.clone());
    }
    Ok(args)
  }

  fn conan(&self, executable: &Path, ctx: &BackendContext<'_>) -> CommandSpec {
    CommandSpec::for_path(executable)
      .current_dir(ctx.project_root)
      .envs(&Self::home_env(ctx.toolchain_dir))
  }
}

impl PackageBackend for ConanBackend {
  fn kind(&self) -> BackendKind {
    BackendKind::Conan
  }

  fn bootstrap_plan(&self, ctx: &BackendContext<'_>) -> BootstrapPlan {
    let dir = ctx.toolchain_dir;
    let executable = Self::executable(dir);

    BootstrapPlan {
      toolchain_dir: dir.to_path_buf(),
      executable: executable.clone(),
      fetch: CommandSpec::new(self.python.as_str()).args(["-m", "venv"]).path_arg(dir),
      bootstrap: CommandSpec::for_path(&Self::scripts_dir(dir).join(exe_name("pip")))
        .arg("install")
        .arg(self.requirement.as_str())
        .current_dir(dir),
      integrate: CommandSpec::for_path(&executable)
        .args(["profile", "detect", "--exist-ok"])
        .current_dir(dir)
        .envs(&Self::home_env(dir)),
    }
  }

  fn cache_dirs(&self, ctx: &BackendContext<'_>) -> Vec<PathBuf> {
    vec![Self::home(ctx.toolchain_dir).join("p")]
  }

  fn install_command(&self, executable: &Path, ctx: &BackendContext<'_>) -> Result<Option<CommandSpec>, BackendError> {
    if self.manifest.is_empty() {
      return Ok(None);
    }

    let graph_args = self.graph_args(ctx)?;
    let mut command = self.conan(executable, ctx).arg("install");
    for generator in &self.generators {
      command = command.args(["-g", generator.as_str()]);
    }
    Ok(Some(
      command
        .arg(format!("--output-folder={}", ctx.build_dir.display()))
        .arg(format!("--build={}", self.build_policy))
        .arg("--format=json")
        .args(graph_args),
    ))
  }

  fn toolchain_file(&self, ctx: &BackendContext<'_>) -> PathBuf {
    ctx.build_dir.join("conan_toolchain.cmake")
  }

  fn staging_phase(&self) -> StagingPhase {
    StagingPhase::BeforeConfigure
  }

  fn bindings(&self) -> &[BindingFilter] {
    &self.bindings
  }

  fn install_reports_graph(&self) -> bool {
    true
  }

  fn resolve(
    &self,
    _fs: &dyn FileSystem,
    install_output: Option<&str>,
    _ctx: &BackendContext<'_>,
  ) -> Result<Vec<ResolvedDependency>, BackendError> {
    match install_output {
      Some(output) if !output.trim().is_empty() => parse_graph(output),
      _ => {
        debug!("no install graph to read");
        Ok(Vec::new())
      }
    }
  }
}

#[derive(Debug, Deserialize)]
struct GraphDocument {
  graph: Graph,
}

#[derive(Debug, Deserialize)]
struct Graph {
  #[serde(default)]
  nodes: BTreeMap<String, GraphNode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GraphNode {
  name: Option<String>,
  version: Option<String>,
  recipe: Option<String>,
  context: Option<String>,
  package_folder: Option<PathBuf>,
  options: BTreeMap<String, Value>,
  cpp_info: Value,
}

impl GraphNode {
  fn is_shared(&self) -> bool {
    match self.options.get("shared") {
      Some(Value::Bool(shared)) => *shared,
      Some(Value::String(shared)) => shared.eq_ignore_ascii_case("true"),
      _ => false,
    }
  }

  fn bindir(&self, package_folder: &Path) -> PathBuf {
    let declared = self
      .cpp_info
      .pointer("/root/bindirs/0")
      .and_then(Value::as_str)
      .map(PathBuf::from);
    match declared {
      Some(dir) if dir.is_absolute() => dir,
      Some(dir) => package_folder.join(dir),
      None => package_folder.join("bin"),
    }
  }
}

/// Host-context packages from `conan install --format=json`, in node order.
///
/// Only the installer assigns `package_folder`; nodes without one are skipped.
fn parse_graph(json: &str) -> Result<Vec<ResolvedDependency>, BackendError> {
  let document: GraphDocument = serde_json::from_str(json)?;

  let mut nodes: Vec<(u64, GraphNode)> = document
    .graph
    .nodes
    .into_iter()
    .map(|(id, node)| (id.parse().unwrap_or(u64::MAX), node))
    .collect();
  nodes.sort_by_key(|(id, _)| *id);

  let mut deps = Vec::new();
  for (_, node) in nodes {
    if matches!(node.recipe.as_deref(), Some("Cli" | "Consumer")) {
      continue;
    }
    if node.context.as_deref() == Some("build") {
      continue;
    }
    let (Some(name), Some(package_folder)) = (node.name.clone(), node.package_folder.clone()) else {
      continue;
    };

    debug!(package = %name, folder = %package_folder.display(), "resolved conan package");
    deps.push(ResolvedDependency {
      is_shared_library: node.is_shared(),
      binary_dir: node.bindir(&package_folder),
      name,
      version: node.version,
      install_prefix: package_folder,
      owned_binaries: None,
    });
  }
  Ok(deps)
}
