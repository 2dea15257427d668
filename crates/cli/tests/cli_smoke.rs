//! CLI smoke tests for snowprov.
//!
//! The end-to-end cases stand in shell scripts for vcpkg and cmake, so they
//! only run on Unix hosts.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::TempDir;

fn snowprov_cmd() -> Command {
  cargo_bin_cmd!("snowprov")
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  snowprov_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"))
    .stdout(predicate::str::contains("--triplet"))
    .stdout(predicate::str::contains("--vcpkg-dir"));
}

#[test]
fn version_flag_works() {
  snowprov_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("snowprov"));
}

// =============================================================================
// Argument & config errors
// =============================================================================

#[test]
fn unknown_backend_is_a_usage_error() {
  snowprov_cmd().args(["--backend", "cpm"]).assert().code(2);
}

#[test]
fn invalid_triplet_exits_one() {
  let temp = TempDir::new().unwrap();

  snowprov_cmd()
    .arg("--project-root")
    .arg(temp.path())
    .args(["--triplet", "x64/windows"])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("triplet"));
}

#[test]
fn invalid_config_exits_one() {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("snowprov.toml"), "[vcpkg]\nrepo = \"x\"\n").unwrap();

  snowprov_cmd()
    .arg("--project-root")
    .arg(temp.path())
    .assert()
    .code(1)
    .stderr(predicate::str::contains("snowprov.toml"));
}

// =============================================================================
// Provisioning with stand-in tools
// =============================================================================

#[cfg(unix)]
mod fake_tools {
  use super::*;
  use std::os::unix::fs::PermissionsExt;
  use std::path::{Path, PathBuf};

  fn write_script(path: &Path, body: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
  }

  /// A project whose vcpkg is already bootstrapped and whose cmake records its
  /// arguments in `cmake.args`.
  struct Project {
    temp: TempDir,
  }

  impl Project {
    fn new(install_exit: i32) -> Self {
      let temp = TempDir::new().unwrap();
      let root = temp.path();

      write_script(
        &root.join("vcpkg").join("vcpkg"),
        &format!("echo \"layer path: $VK_ADD_LAYER_PATH\"\nexit {}", install_exit),
      );
      let cmake = root.join("tools").join("cmake");
      write_script(&cmake, &format!("echo \"$@\" > \"{}\"", root.join("cmake.args").display()));

      std::fs::write(
        root.join("snowprov.toml"),
        format!(
          "[vcpkg]\npackages = [\"libfoo\"]\n\n[generator]\nprogram = \"{}\"\n",
          cmake.display()
        ),
      )
      .unwrap();

      Self { temp }
    }

    fn root(&self) -> &Path {
      self.temp.path()
    }

    fn cmake_args(&self) -> Option<String> {
      std::fs::read_to_string(self.root().join("cmake.args")).ok()
    }

    fn build_dir(&self) -> PathBuf {
      self.root().join("build")
    }

    fn cmd(&self) -> Command {
      let mut cmd = snowprov_cmd();
      cmd.arg("--project-root").arg(self.root()).args(["--triplet", "x64-linux"]);
      cmd
    }
  }

  #[test]
  #[serial]
  fn provisions_and_configures() {
    let project = Project::new(0);

    project
      .cmd()
      .assert()
      .success()
      .stdout(predicate::str::contains("install libfoo --recurse --triplet x64-linux"))
      .stdout(predicate::str::contains("layer path: "))
      .stdout(predicate::str::contains("installed/x64-linux/bin"));

    assert!(project.build_dir().is_dir());
    let args = project.cmake_args().unwrap();
    assert!(args.contains("-B"));
    assert!(args.contains("scripts/buildsystems/vcpkg.cmake"));
    assert!(!args.contains("-T"));
  }

  #[test]
  #[serial]
  fn failing_install_exit_code_is_propagated() {
    let project = Project::new(3);

    project.cmd().assert().code(3);

    assert!(project.cmake_args().is_none());
    assert!(!project.build_dir().exists());
  }

  #[test]
  #[serial]
  fn clean_removes_previous_build_output() {
    let project = Project::new(0);
    std::fs::create_dir_all(project.build_dir()).unwrap();
    std::fs::write(project.build_dir().join("stale.txt"), "old").unwrap();

    project.cmd().arg("--clean").assert().success();

    assert!(project.build_dir().is_dir());
    assert!(!project.build_dir().join("stale.txt").exists());
  }

  #[test]
  #[serial]
  fn json_summary_names_the_toolchain_file() {
    let project = Project::new(0);

    project
      .cmd()
      .arg("--json")
      .assert()
      .success()
      .stdout(predicate::str::contains("\"toolchain_file\""))
      .stdout(predicate::str::contains("\"elapsed\""));
  }

  #[test]
  #[serial]
  fn json_stdout_is_a_single_document() {
    let project = Project::new(0);

    let output = project.cmd().arg("--json").output().unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["backend"], "vcpkg");
    assert_eq!(summary["triplet"], "x64-linux");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("> "));
    assert!(stderr.contains("layer path: "));
  }

  #[test]
  #[serial]
  fn missing_tool_exits_127() {
    let project = Project::new(0);
    std::fs::write(
      project.root().join("snowprov.toml"),
      "[vcpkg]\npackages = [\"libfoo\"]\n\n[generator]\nprogram = \"snowprov-no-such-cmake\"\n",
    )
    .unwrap();

    project.cmd().assert().code(127);
  }
}
