use std::fmt;

/// Target CPU architectures, named the way vcpkg triplets name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
  X64,
  X86,
  Arm64,
  Arm,
  Wasm32,
}

impl Arch {
  /// Parse the architecture component of a triplet
  pub fn from_triplet_part(part: &str) -> Option<Self> {
    match part {
      "x64" => Some(Self::X64),
      "x86" => Some(Self::X86),
      "arm64" => Some(Self::Arm64),
      "arm" => Some(Self::Arm),
      "wasm32" => Some(Self::Wasm32),
      _ => None,
    }
  }

  /// Returns the triplet identifier for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X64 => "x64",
      Self::X86 => "x86",
      Self::Arm64 => "arm64",
      Self::Arm => "arm",
      Self::Wasm32 => "wasm32",
    }
  }

  /// Value of Conan's `arch` setting
  pub fn conan_setting(&self) -> &'static str {
    match self {
      Self::X64 => "x86_64",
      Self::X86 => "x86",
      Self::Arm64 => "armv8",
      Self::Arm => "armv7",
      Self::Wasm32 => "wasm",
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn triplet_names_round_trip() {
    for arch in [Arch::X64, Arch::X86, Arch::Arm64, Arch::Arm, Arch::Wasm32] {
      assert_eq!(Arch::from_triplet_part(arch.as_str()), Some(arch));
    }
  }

  #[test]
  fn conan_uses_its_own_arch_names() {
    assert_eq!(Arch::X64.conan_setting(), "x86_64");
    assert_eq!(Arch::Arm64.conan_setting(), "armv8");
  }
}
