//! Project configuration (`snowprov.toml`).
//!
//! Everything has a built-in default describing the Snowstorm tree, so the
//! file is optional; when present it overrides individual fields.
//!
//! ```toml
//! backend = "vcpkg"
//!
//! [project]
//! name = "Snowstorm"
//! app_dir = "Snowstorm-Editor"
//!
//! [vcpkg]
//! packages = ["glfw3", "imgui[docking-experimental]"]
//!
//! [generator]
//! toolset = "v143"
//!
//! [[conan.bindings]]
//! package = "imgui"
//! from = "res/bindings"
//! pattern = "*glfw*"
//! to = "Snowstorm-Editor/Source/ImGui"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::backend::BackendKind;
use crate::consts::{CONFIG_FILE_NAME, VCPKG_REPOSITORY};
use crate::manifest::{Manifest, SNOWSTORM_CONAN_PACKAGES, SNOWSTORM_VCPKG_PACKAGES};
use crate::stage::BindingFilter;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid config '{path}': {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: Box<toml::de::Error>,
  },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
  /// Used when `--backend` is not given.
  pub backend: BackendKind,
  pub project: ProjectSettings,
  pub vcpkg: VcpkgSettings,
  pub conan: ConanSettings,
  pub generator: GeneratorSettings,
  pub staging: StagingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectSettings {
  /// CMake project name; `<name>.sln` is reported when it exists.
  pub name: String,
  /// Directory (under the build dir) holding the application's per-configuration output.
  pub app_dir: PathBuf,
}

impl Default for ProjectSettings {
  fn default() -> Self {
    Self {
      name: "Snowstorm".to_string(),
      app_dir: PathBuf::from("Snowstorm-Editor"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VcpkgSettings {
  pub repository: String,
  pub packages: Manifest,
  /// Extra arguments for the bootstrap script.
  pub bootstrap_args: Vec<String>,
}

impl Default for VcpkgSettings {
  fn default() -> Self {
    Self {
      repository: VCPKG_REPOSITORY.to_string(),
      packages: Manifest::parse(SNOWSTORM_VCPKG_PACKAGES).unwrap_or_default(),
      bootstrap_args: vec!["-disableMetrics".to_string()],
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConanSettings {
  pub packages: Manifest,
  /// pip requirement used to install Conan into the toolchain virtualenv.
  pub requirement: String,
  /// Interpreter used to create the virtualenv.
  pub python: String,
  pub generators: Vec<String>,
  /// `-o` values, applied in order.
  pub options: Vec<String>,
  /// Value of `--build`.
  pub build_policy: String,
  pub bindings: Vec<BindingFilter>,
}

impl Default for ConanSettings {
  fn default() -> Self {
    let imgui_binding = |pattern: &str| BindingFilter {
      package: "imgui".to_string(),
      from: PathBuf::from("res").join("bindings"),
      pattern: pattern.to_string(),
      to: PathBuf::from("Snowstorm-Editor").join("Source").join("ImGui"),
    };

    Self {
      packages: Manifest::parse(SNOWSTORM_CONAN_PACKAGES).unwrap_or_default(),
      requirement: "conan>=2,<3".to_string(),
      python: if cfg!(windows) { "python" } else { "python3" }.to_string(),
      generators: vec![
        "CMakeDeps".to_string(),
        "CMakeToolchain".to_string(),
        "VirtualRunEnv".to_string(),
      ],
      options: vec!["*:shared=True".to_string(), "spirv-tools/*:shared=False".to_string()],
      build_policy: "missing".to_string(),
      bindings: vec![imgui_binding("*glfw*"), imgui_binding("*opengl3*")],
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorSettings {
  pub program: String,
  /// `-G` value. Platform auto-detection when unset.
  pub name: Option<String>,
  /// `-T` value, applied for Windows triplets.
  pub toolset: Option<String>,
  /// Appended verbatim after the generated arguments.
  pub args: Vec<String>,
}

impl Default for GeneratorSettings {
  fn default() -> Self {
    Self {
      program: "cmake".to_string(),
      name: None,
      toolset: Some("v143".to_string()),
      args: Vec::new(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StagingSettings {
  pub enabled: bool,
  /// Overrides the target OS's shared-library pattern.
  pub shared_library_pattern: Option<String>,
}

impl Default for StagingSettings {
  fn default() -> Self {
    Self {
      enabled: true,
      shared_library_pattern: None,
    }
  }
}

impl Settings {
  pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse {
      path: path.to_path_buf(),
      source: Box::new(e),
    })
  }

  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
      path: path.to_path_buf(),
      source: e,
    })?;
    Self::from_toml(&content, path)
  }

  /// Load `explicit` if given, else `<project_root>/snowprov.toml` if it
  /// exists, else the built-in defaults.
  pub fn discover(project_root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
    if let Some(path) = explicit {
      debug!(path = %path.display(), "loading config");
      return Self::load(path);
    }

    let candidate = project_root.join(CONFIG_FILE_NAME);
    if candidate.is_file() {
      debug!(path = %candidate.display(), "loading config");
      Self::load(&candidate)
    } else {
      debug!("no config file, using built-in defaults");
      Ok(Self::default())
    }
  }
}
