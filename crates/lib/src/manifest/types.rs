//! Manifest types for snowprov.
//!
//! # Package syntax
//!
//! ```text
//! glfw3                      name only (vcpkg)
//! imgui[docking-experimental,glfw-binding]
//! glfw/3.4                   name and version (conan)
//! ```
//!
//! Features are a set: repeating one is harmless and they render sorted.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
  #[error("package name must not be empty in '{0}'")]
  EmptyName(String),

  #[error("invalid character '{ch}' in package '{spec}'")]
  InvalidChar { spec: String, ch: char },

  #[error("unterminated feature list in '{0}'")]
  UnterminatedFeatures(String),

  #[error("empty feature in '{0}'")]
  EmptyFeature(String),

  #[error("empty version in '{0}'")]
  EmptyVersion(String),

  #[error("package '{0}' appears more than once in the manifest")]
  Duplicate(String),

  #[error("package '{0}' needs a version for this backend (write it as '{0}/<version>')")]
  MissingVersion(String),
}

fn is_name_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+')
}

/// One manifest entry. Identity is the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageSpec {
  pub name: String,
  pub version: Option<String>,
  pub features: BTreeSet<String>,
}

impl PackageSpec {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      version: None,
      features: BTreeSet::new(),
    }
  }

  /// `name[f1,f2]`, the form `vcpkg install` takes. Any version is dropped;
  /// classic-mode vcpkg installs whatever its checkout provides.
  pub fn vcpkg_arg(&self) -> String {
    if self.features.is_empty() {
      self.name.clone()
    } else {
      let features: Vec<&str> = self.features.iter().map(String::as_str).collect();
      format!("{}[{}]", self.name, features.join(","))
    }
  }

  /// `name/version`, the reference `conan install --requires` takes.
  pub fn conan_reference(&self) -> Result<String, ManifestError> {
    match &self.version {
      Some(version) => Ok(format!("{}/{}", self.name, version)),
      None => Err(ManifestError::MissingVersion(self.name.clone())),
    }
  }
}

impl FromStr for PackageSpec {
  type Err = ManifestError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let spec = s.trim();

    let (head, features) = match spec.find('[') {
      Some(open) => {
        let rest = &spec[open + 1..];
        let body = rest
          .strip_suffix(']')
          .ok_or_else(|| ManifestError::UnterminatedFeatures(spec.to_string()))?;
        (&spec[..open], Some(body))
      }
      None => (spec, None),
    };

    let (name, version) = match head.split_once('/') {
      Some((name, version)) => (name, Some(version)),
      None => (head, None),
    };

    if name.is_empty() {
      return Err(ManifestError::EmptyName(spec.to_string()));
    }
    if let Some(ch) = name.chars().find(|c| !is_name_char(*c)) {
      return Err(ManifestError::InvalidChar {
        spec: spec.to_string(),
        ch,
      });
    }

    let mut package = PackageSpec::new(name);

    if let Some(version) = version {
      if version.is_empty() {
        return Err(ManifestError::EmptyVersion(spec.to_string()));
      }
      if let Some(ch) = version.chars().find(|c| c.is_whitespace() || matches!(c, '[' | ']' | '/')) {
        return Err(ManifestError::InvalidChar {
          spec: spec.to_string(),
          ch,
        });
      }
      package.version = Some(version.to_string());
    }

    if let Some(body) = features {
      for feature in body.split(',').map(str::trim) {
        if feature.is_empty() {
          return Err(ManifestError::EmptyFeature(spec.to_string()));
        }
        if let Some(ch) = feature.chars().find(|c| !is_name_char(*c)) {
          return Err(ManifestError::InvalidChar {
            spec: spec.to_string(),
            ch,
          });
        }
        package.features.insert(feature.to_string());
      }
    }

    Ok(package)
  }
}

impl TryFrom<String> for PackageSpec {
  type Error = ManifestError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<PackageSpec> for String {
  fn from(value: PackageSpec) -> Self {
    value.to_string()
  }
}

impl fmt::Display for PackageSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.name)?;
    if let Some(version) = &self.version {
      write!(f, "/{}", version)?;
    }
    if !self.features.is_empty() {
      let features: Vec<&str> = self.features.iter().map(String::as_str).collect();
      write!(f, "[{}]", features.join(","))?;
    }
    Ok(())
  }
}

/// Ordered, name-unique list of packages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PackageSpec>", into = "Vec<PackageSpec>")]
pub struct Manifest {
  packages: Vec<PackageSpec>,
}

impl Manifest {
  pub fn new(packages: Vec<PackageSpec>) -> Result<Self, ManifestError> {
    let mut seen = HashSet::new();
    for package in &packages {
      if !seen.insert(package.name.as_str()) {
        return Err(ManifestError::Duplicate(package.name.clone()));
      }
    }
    Ok(Self { packages })
  }

  /// Parse each entry with [`PackageSpec::from_str`].
  pub fn parse<I, S>(entries: I) -> Result<Self, ManifestError>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let packages = entries
      .into_iter()
      .map(|entry| entry.as_ref().parse())
      .collect::<Result<Vec<_>, _>>()?;
    Self::new(packages)
  }

  pub fn iter(&self) -> impl Iterator<Item = &PackageSpec> {
    self.packages.iter()
  }

  pub fn get(&self, name: &str) -> Option<&PackageSpec> {
    self.packages.iter().find(|p| p.name == name)
  }

  pub fn len(&self) -> usize {
    self.packages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.packages.is_empty()
  }

  /// Arguments for `vcpkg install`, in manifest order.
  pub fn vcpkg_args(&self) -> Vec<String> {
    self.packages.iter().map(PackageSpec::vcpkg_arg).collect()
  }

  /// References for `conan install --requires`, in manifest order.
  pub fn conan_references(&self) -> Result<Vec<String>, ManifestError> {
    self.packages.iter().map(PackageSpec::conan_reference).collect()
  }
}

impl TryFrom<Vec<PackageSpec>> for Manifest {
  type Error = ManifestError;

  fn try_from(value: Vec<PackageSpec>) -> Result<Self, Self::Error> {
    Self::new(value)
  }
}

impl From<Manifest> for Vec<PackageSpec> {
  fn from(value: Manifest) -> Self {
    value.packages
  }
}

/// Packages the Snowstorm engine and editor build against through vcpkg.
pub const SNOWSTORM_VCPKG_PACKAGES: &[&str] = &[
  "vulkan",
  "vulkan-validationlayers",
  "glfw3",
  "glew",
  "spdlog",
  "fmt",
  "assimp",
  "glm",
  "stb",
  "entt",
  "imgui[vulkan-binding,glfw-binding,docking-experimental]",
  "rttr",
  "gli",
  "volk",
  "vulkan-memory-allocator",
  "spirv-reflect",
  "nlohmann-json",
];

/// Packages the Snowstorm engine and editor build against through Conan.
pub const SNOWSTORM_CONAN_PACKAGES: &[&str] = &[
  "vulkan-headers/1.3.239.0",
  "vulkan-loader/1.3.239.0",
  "vulkan-validationlayers/1.3.239.0",
  "glfw/3.4",
  "glew/2.2.0",
  "spdlog/1.15.0",
  "fmt/11.0.2",
  "assimp/5.4.3",
  "glm/cci.20230113",
  "stb/cci.20230920",
  "entt/3.14.0",
  "imgui/cci.20230105+1.89.2.docking",
  "rttr/0.9.6",
];
