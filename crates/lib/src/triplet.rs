//! Target platform identifiers.
//!
//! A triplet (`x64-windows`, `x64-linux-dynamic`, `arm64-osx`) is opaque to
//! vcpkg, which owns its meaning. The orchestrator only validates its shape and
//! parses it best-effort when it needs the target OS (shared-library staging)
//! or has to translate it into Conan settings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::DEFAULT_TRIPLET;
use crate::platform::arch::Arch;
use crate::platform::os::Os;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TripletError {
  #[error("triplet must not be empty")]
  Empty,

  #[error("invalid character '{ch}' in triplet '{triplet}'")]
  InvalidChar { triplet: String, ch: char },

  #[error("triplet '{0}' has no recognised architecture and OS")]
  Unrecognised(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
  Dynamic,
  Static,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Triplet(String);

impl Triplet {
  pub fn new(value: impl Into<String>) -> Result<Self, TripletError> {
    let value = value.into();
    if value.is_empty() {
      return Err(TripletError::Empty);
    }
    if let Some(ch) = value.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '-')) {
      return Err(TripletError::InvalidChar { triplet: value, ch });
    }
    Ok(Self(value))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn arch(&self) -> Option<Arch> {
    self.0.split('-').next().and_then(Arch::from_triplet_part)
  }

  pub fn os(&self) -> Option<Os> {
    self.0.split('-').nth(1).and_then(Os::from_triplet_part)
  }

  /// Linkage from the suffix (`-static`, `-static-md`, `-dynamic`), falling
  /// back to the OS default. Unknown OS defaults to static.
  pub fn linkage(&self) -> Linkage {
    let suffix: Vec<&str> = self.0.split('-').skip(2).collect();
    if suffix.contains(&"static") {
      Linkage::Static
    } else if suffix.contains(&"dynamic") {
      Linkage::Dynamic
    } else if self.os().is_some_and(|os| os.links_dynamically_by_default()) {
      Linkage::Dynamic
    } else {
      Linkage::Static
    }
  }

  /// Both components, or an error for backends that cannot treat the triplet
  /// as opaque.
  pub fn require_parts(&self) -> Result<(Arch, Os), TripletError> {
    match (self.arch(), self.os()) {
      (Some(arch), Some(os)) => Ok((arch, os)),
      _ => Err(TripletError::Unrecognised(self.0.clone())),
    }
  }

  /// Whether built executables need their shared libraries copied beside them:
  /// a dynamically linked target whose loader has no rpath.
  pub fn needs_colocated_shared_libs(&self) -> bool {
    self.os().is_some_and(|os| os.needs_colocated_shared_libs()) && self.linkage() == Linkage::Dynamic
  }
}

impl Default for Triplet {
  fn default() -> Self {
    Self(DEFAULT_TRIPLET.to_string())
  }
}

impl FromStr for Triplet {
  type Err = TripletError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::new(s)
  }
}

impl TryFrom<String> for Triplet {
  type Error = TripletError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Self::new(value)
  }
}

impl From<Triplet> for String {
  fn from(value: Triplet) -> Self {
    value.0
  }
}

impl fmt::Display for Triplet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_common_triplets() {
    let t: Triplet = "x64-windows".parse().unwrap();
    assert_eq!(t.arch(), Some(Arch::X64));
    assert_eq!(t.os(), Some(Os::Windows));
    assert_eq!(t.linkage(), Linkage::Dynamic);
    assert!(t.needs_colocated_shared_libs());

    let t: Triplet = "x64-linux".parse().unwrap();
    assert_eq!(t.linkage(), Linkage::Static);
    assert!(!t.needs_colocated_shared_libs());
  }

  #[test]
  fn linkage_suffix_overrides_default() {
    assert_eq!(Triplet::new("x64-windows-static").unwrap().linkage(), Linkage::Static);
    assert_eq!(Triplet::new("x64-windows-static-md").unwrap().linkage(), Linkage::Static);
    assert_eq!(Triplet::new("x64-linux-dynamic").unwrap().linkage(), Linkage::Dynamic);
  }

  #[test]
  fn static_windows_triplets_have_nothing_to_colocate() {
    assert!(!Triplet::new("x64-windows-static").unwrap().needs_colocated_shared_libs());
    assert!(Triplet::new("x64-mingw-dynamic").unwrap().needs_colocated_shared_libs());
    assert!(!Triplet::new("x64-mingw-static").unwrap().needs_colocated_shared_libs());
  }

  #[test]
  fn custom_triplets_stay_opaque() {
    let t = Triplet::new("snowstorm-custom").unwrap();
    assert_eq!(t.as_str(), "snowstorm-custom");
    assert!(!t.needs_colocated_shared_libs());
    assert_eq!(t.require_parts(), Err(TripletError::Unrecognised("snowstorm-custom".to_string())));
  }

  #[test]
  fn rejects_empty_and_odd_characters() {
    assert_eq!(Triplet::new(""), Err(TripletError::Empty));
    assert!(matches!(
      Triplet::new("x64 windows"),
      Err(TripletError::InvalidChar { ch: ' ', .. })
    ));
    assert!(matches!(Triplet::new("x64/windows"), Err(TripletError::InvalidChar { .. })));
  }
}
