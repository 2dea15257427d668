//! Target platform pieces parsed out of triplets, plus host naming helpers.

pub mod arch;
pub mod os;

/// Executable file name on the host (`vcpkg` → `vcpkg.exe` on Windows)
pub fn exe_name(stem: &str) -> String {
  if cfg!(windows) {
    format!("{}.exe", stem)
  } else {
    stem.to_string()
  }
}
