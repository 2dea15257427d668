use std::fmt;

/// Target operating systems, named the way vcpkg triplets name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
  Windows,
  Uwp,
  MinGw,
  Linux,
  Osx,
  Android,
}

impl Os {
  pub fn from_triplet_part(part: &str) -> Option<Self> {
    match part {
      "windows" => Some(Self::Windows),
      "uwp" => Some(Self::Uwp),
      "mingw" => Some(Self::MinGw),
      "linux" => Some(Self::Linux),
      "osx" => Some(Self::Osx),
      "android" => Some(Self::Android),
      _ => None,
    }
  }

  /// Returns the triplet identifier for this OS
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Windows => "windows",
      Self::Uwp => "uwp",
      Self::MinGw => "mingw",
      Self::Linux => "linux",
      Self::Osx => "osx",
      Self::Android => "android",
    }
  }

  /// Value of Conan's `os` setting
  pub fn conan_setting(&self) -> &'static str {
    match self {
      Self::Windows | Self::MinGw => "Windows",
      Self::Uwp => "WindowsStore",
      Self::Linux => "Linux",
      Self::Osx => "Macos",
      Self::Android => "Android",
    }
  }

  /// Whether the loader only finds shared libraries placed next to the
  /// executable (no rpath).
  pub fn needs_colocated_shared_libs(&self) -> bool {
    matches!(self, Self::Windows | Self::Uwp | Self::MinGw)
  }

  /// Default linkage when the triplet has no linkage suffix
  pub fn links_dynamically_by_default(&self) -> bool {
    matches!(self, Self::Windows | Self::Uwp)
  }

  /// File-name pattern of shared libraries on this OS
  pub fn shared_library_pattern(&self) -> &'static str {
    match self {
      Self::Windows | Self::Uwp | Self::MinGw => "*.dll",
      Self::Osx => "*.dylib",
      Self::Linux | Self::Android => "*.so*",
    }
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
