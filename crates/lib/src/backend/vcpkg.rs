//! vcpkg in classic mode, cloned into the project.
//!
//! # Layout
//!
//! ```text
//! vcpkg/
//! ├── vcpkg(.exe)                     # present once bootstrapped
//! ├── bootstrap-vcpkg.{bat,sh}
//! ├── scripts/buildsystems/vcpkg.cmake
//! ├── installed/
//! │   ├── <triplet>/{bin,debug/bin}   # shared libraries of every package
//! │   └── vcpkg/info/<name>_<version>_<triplet>.list
//! ├── buildtrees/
//! └── packages/
//! ```
//!
//! The `.list` receipts name every file a package installed; they are what
//! staging uses to attribute DLLs in the shared `bin` directory to packages.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{BackendContext, BackendError, BackendKind, PackageBackend, StagingPhase};
use crate::bootstrap::BootstrapPlan;
use crate::config::VcpkgSettings;
use crate::consts::LAYER_PATH_VAR;
use crate::filesystem::FileSystem;
use crate::manifest::Manifest;
use crate::platform::exe_name;
use crate::process::{CommandSpec, EnvOverlay};
use crate::stage::{BindingFilter, ResolvedDependency};

#[derive(Debug, Clone)]
pub struct VcpkgBackend {
  repository: String,
  manifest: Manifest,
  bootstrap_args: Vec<String>,
}

impl VcpkgBackend {
  pub fn new(repository: impl Into<String>, manifest: Manifest) -> Self {
    Self {
      repository: repository.into(),
      manifest,
      bootstrap_args: Vec::new(),
    }
  }

  pub fn from_settings(settings: &VcpkgSettings) -> Self {
    Self {
      repository: settings.repository.clone(),
      manifest: settings.packages.clone(),
      bootstrap_args: settings.bootstrap_args.clone(),
    }
  }

  pub fn executable(toolchain_dir: &Path) -> PathBuf {
    toolchain_dir.join(exe_name("vcpkg"))
  }

  fn bootstrap_script(toolchain_dir: &Path) -> PathBuf {
    let script = if cfg!(windows) {
      "bootstrap-vcpkg.bat"
    } else {
      "bootstrap-vcpkg.sh"
    };
    toolchain_dir.join(script)
  }

  fn installed_dir(toolchain_dir: &Path) -> PathBuf {
    toolchain_dir.join("installed")
  }

  fn triplet_prefix(ctx: &BackendContext<'_>) -> PathBuf {
    Self::installed_dir(ctx.toolchain_dir).join(ctx.triplet.as_str())
  }

  /// Overlay for `vcpkg install`: the triplet's `bin` directory on the
  /// Vulkan loader's layer path.
  fn install_env(ctx: &BackendContext<'_>) -> EnvOverlay {
    let mut env = EnvOverlay::new();
    env.insert(
      LAYER_PATH_VAR.to_string(),
      Self::triplet_prefix(ctx).join("bin").display().to_string(),
    );
    env
  }

  /// Where a build type's shared libraries live, relative to the triplet prefix.
  fn bin_subdir(build_type: &str) -> &'static str {
    if build_type.eq_ignore_ascii_case("debug") {
      "debug/bin"
    } else {
      "bin"
    }
  }
}

/// Split a receipt file stem `<name>_<version>_<triplet>`.
fn parse_receipt_name(stem: &str) -> Option<(&str, &str, &str)> {
  let mut parts = stem.rsplitn(3, '_');
  let triplet = parts.next()?;
  let version = parts.next()?;
  let name = parts.next()?;
  if name.is_empty() || version.is_empty() || triplet.is_empty() {
    return None;
  }
  Some((name, version, triplet))
}

/// File names a receipt lists directly under `<triplet>/<bin_subdir>/`.
fn receipt_binaries(receipt: &str, triplet: &str, bin_subdir: &str) -> BTreeSet<String> {
  let prefix = format!("{}/{}/", triplet, bin_subdir);
  receipt
    .lines()
    .map(str::trim)
    .filter_map(|line| line.strip_prefix(prefix.as_str()))
    .filter(|rest| !rest.is_empty() && !rest.contains('/'))
    .map(str::to_string)
    .collect()
}

impl PackageBackend for VcpkgBackend {
  fn kind(&self) -> BackendKind {
    BackendKind::Vcpkg
  }

  fn bootstrap_plan(&self, ctx: &BackendContext<'_>) -> BootstrapPlan {
    let dir = ctx.toolchain_dir;
    let executable = Self::executable(dir);

    BootstrapPlan {
      toolchain_dir: dir.to_path_buf(),
      executable: executable.clone(),
      fetch: CommandSpec::new("git")
        .arg("clone")
        .arg(self.repository.as_str())
        .path_arg(dir),
      bootstrap: CommandSpec::for_path(&Self::bootstrap_script(dir))
        .args(self.bootstrap_args.iter().cloned())
        .current_dir(dir),
      integrate: CommandSpec::for_path(&executable)
        .args(["integrate", "install"])
        .current_dir(dir),
    }
  }

  fn cache_dirs(&self, ctx: &BackendContext<'_>) -> Vec<PathBuf> {
    ["installed", "buildtrees", "packages"]
      .iter()
      .map(|d| ctx.toolchain_dir.join(d))
      .collect()
  }

  fn install_command(&self, executable: &Path, ctx: &BackendContext<'_>) -> Result<Option<CommandSpec>, BackendError> {
    if self.manifest.is_empty() {
      return Ok(None);
    }

    Ok(Some(
      CommandSpec::for_path(executable)
        .arg("install")
        .args(self.manifest.vcpkg_args())
        .args(["--recurse", "--triplet", ctx.triplet.as_str()])
        .current_dir(ctx.project_root)
        .envs(&Self::install_env(ctx)),
    ))
  }

  fn toolchain_file(&self, ctx: &BackendContext<'_>) -> PathBuf {
    ctx
      .toolchain_dir
      .join("scripts")
      .join("buildsystems")
      .join("vcpkg.cmake")
  }

  fn staging_phase(&self) -> StagingPhase {
    StagingPhase::AfterConfigure
  }

  fn bindings(&self) -> &[BindingFilter] {
    &[]
  }

  fn resolve(
    &self,
    fs: &dyn FileSystem,
    _install_output: Option<&str>,
    ctx: &BackendContext<'_>,
  ) -> Result<Vec<ResolvedDependency>, BackendError> {
    let info_dir = Self::installed_dir(ctx.toolchain_dir).join("vcpkg").join("info");
    if !fs.is_dir(&info_dir) {
      debug!(dir = %info_dir.display(), "no install receipts");
      return Ok(Vec::new());
    }

    let receipts = fs.list_files(&info_dir, false).map_err(|source| BackendError::Read {
      path: info_dir.clone(),
      source,
    })?;

    let prefix = Self::triplet_prefix(ctx);
    let bin_subdir = Self::bin_subdir(ctx.build_type);
    let binary_dir = prefix.join(bin_subdir);

    let mut deps = Vec::new();
    for receipt in receipts {
      if receipt.extension().and_then(|e| e.to_str()) != Some("list") {
        continue;
      }
      let Some(stem) = receipt.file_stem().and_then(|s| s.to_str()) else {
        continue;
      };
      let Some((name, version, triplet)) = parse_receipt_name(stem) else {
        debug!(file = %receipt.display(), "unrecognised receipt name");
        continue;
      };
      if triplet != ctx.triplet.as_str() {
        continue;
      }

      let content = fs.read_to_string(&receipt).map_err(|source| BackendError::Read {
        path: receipt.clone(),
        source,
      })?;
      let owned = receipt_binaries(&content, triplet, bin_subdir);

      deps.push(ResolvedDependency {
        name: name.to_string(),
        version: Some(version.to_string()),
        install_prefix: prefix.clone(),
        is_shared_library: !owned.is_empty(),
        binary_dir: binary_dir.clone(),
        owned_binaries: Some(owned),
      });
    }

    debug!(count = deps.len(), "resolved installed packages");
    Ok(deps)
  }
}
