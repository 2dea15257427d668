//! The provisioning run behind `snowprov`.
//!
//! Resolves paths against the project root, loads configuration, builds the
//! selected backend and hands everything to the library's [`Provisioner`].

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use snowprov_lib::backend::create_backend;
use snowprov_lib::config::Settings;
use snowprov_lib::filesystem::HostFileSystem;
use snowprov_lib::process::{Console, SystemRunner};
use snowprov_lib::provision::{ProvisionError, ProvisionOptions, ProvisionSummary, Provisioner};
use snowprov_lib::triplet::Triplet;
use snowprov_lib::util::paths::{normalize, resolve_under};

use crate::Cli;
use crate::output::{print_info, print_json, print_stat, print_success};

#[derive(Serialize)]
struct JsonSummary<'a> {
  #[serde(flatten)]
  summary: &'a ProvisionSummary,
  elapsed: String,
}

/// Build [`ProvisionOptions`] from the command line and the loaded settings.
pub fn options_from_cli(cli: &Cli) -> Result<ProvisionOptions> {
  let cwd = std::env::current_dir().context("Failed to determine current directory")?;
  let project_root = normalize(&match &cli.project_root {
    Some(root) => resolve_under(&cwd, root),
    None => cwd.clone(),
  });

  let config = cli.config.as_ref().map(|c| resolve_under(&cwd, c));
  let settings = Settings::discover(&project_root, config.as_deref())?;
  let kind = cli.backend.unwrap_or(settings.backend);
  let triplet = Triplet::new(cli.triplet.as_str())?;

  let mut options = ProvisionOptions::new(project_root.clone(), kind, settings);
  options.build_dir = resolve_under(&project_root, &cli.build_dir);
  if let Some(dir) = &cli.toolchain_dir {
    options.toolchain_dir = resolve_under(&project_root, dir);
  }
  options.triplet = triplet;
  options.build_type = cli.build_type.clone();
  options.clean = cli.clean;
  options.fresh = cli.fresh;
  options.stage = options.stage && !cli.no_stage;
  options.generator = cli.generator.clone();
  options.toolset = cli.toolset.clone();

  debug!(?options, "resolved options");
  Ok(options)
}

pub fn cmd_provision(cli: &Cli) -> Result<()> {
  let options = options_from_cli(cli)?;
  let backend = create_backend(cli.backend.unwrap_or(options.settings.backend), &options.settings);

  let fs = HostFileSystem;
  // JSON mode keeps stdout for the summary alone.
  let runner = SystemRunner::new(if cli.json { Console::Stderr } else { Console::Stdout });
  let summary = Provisioner::new(&fs, &runner, backend.as_ref()).run(&options)?;

  if cli.json {
    print_json(&JsonSummary {
      summary: &summary,
      elapsed: format_elapsed(summary.elapsed),
    })?;
  } else {
    print_summary(&summary);
  }
  Ok(())
}

fn format_elapsed(elapsed: Duration) -> String {
  // Truncated to milliseconds.
  humantime::format_duration(Duration::from_millis(elapsed.as_millis() as u64)).to_string()
}

fn print_summary(summary: &ProvisionSummary) {
  println!();
  print_success(&format!(
    "Provisioned {} for {} in {}",
    summary.backend,
    summary.triplet,
    format_elapsed(summary.elapsed)
  ));
  print_stat("Build directory", &summary.build_dir.display().to_string());
  print_stat("Toolchain file", &summary.toolchain_file.display().to_string());
  print_stat("Shared libraries staged", &summary.staged.binaries.len().to_string());
  print_stat("Binding sources staged", &summary.staged.bindings.len().to_string());

  if let Some(solution) = &summary.solution {
    println!();
    print_info(&format!("Open {} to build", solution.display()));
  }
}

/// Process exit code for a failed run.
///
/// A failing child's own code is passed through; everything else is 1. Unix
/// only carries 1..=255, Windows carries the full 32-bit status.
pub fn exit_code(err: &anyhow::Error) -> i32 {
  let code = err
    .downcast_ref::<ProvisionError>()
    .map(ProvisionError::exit_code)
    .unwrap_or(1);
  if code == 0 || (cfg!(unix) && !(1..=255).contains(&code)) {
    1
  } else {
    code
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;
  use snowprov_lib::backend::BackendKind;
  use snowprov_lib::process::ProcessError;
  use std::path::PathBuf;
  use tempfile::TempDir;

  fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("snowprov").chain(args.iter().copied())).unwrap()
  }

  #[test]
  fn defaults_resolve_under_project_root() {
    let temp = TempDir::new().unwrap();
    let root = normalize(temp.path());
    let root_arg = root.display().to_string();

    let options = options_from_cli(&parse(&["--project-root", &root_arg])).unwrap();

    assert_eq!(options.project_root, root);
    assert_eq!(options.build_dir, root.join("build"));
    assert_eq!(options.toolchain_dir, root.join("vcpkg"));
    assert_eq!(options.triplet.as_str(), "x64-windows");
    assert_eq!(options.build_type, "Release");
    assert!(options.stage);
    assert!(!options.clean && !options.fresh);
  }

  #[test]
  fn flags_override_defaults() {
    let temp = TempDir::new().unwrap();
    let root = normalize(temp.path());
    let root_arg = root.display().to_string();

    let options = options_from_cli(&parse(&[
      "--project-root",
      &root_arg,
      "--backend",
      "conan",
      "--vcpkg-dir",
      "tools/pm",
      "--triplet",
      "x64-linux",
      "--no-stage",
      "--clean",
      "--generator",
      "Ninja",
    ]))
    .unwrap();

    assert_eq!(options.toolchain_dir, root.join(PathBuf::from("tools").join("pm")));
    assert_eq!(options.triplet.as_str(), "x64-linux");
    assert!(!options.stage);
    assert!(options.clean);
    assert_eq!(options.generator.as_deref(), Some("Ninja"));
  }

  #[test]
  fn backend_from_config_picks_its_toolchain_dir() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("snowprov.toml"), "backend = \"conan\"\n").unwrap();
    let root = normalize(temp.path());
    let root_arg = root.display().to_string();

    let cli = parse(&["--project-root", &root_arg]);
    let options = options_from_cli(&cli).unwrap();

    assert_eq!(options.settings.backend, BackendKind::Conan);
    assert_eq!(options.toolchain_dir, root.join(".conan"));
  }

  #[test]
  fn invalid_triplet_is_rejected() {
    let temp = TempDir::new().unwrap();
    let root_arg = temp.path().display().to_string();
    let err = options_from_cli(&parse(&["--project-root", &root_arg, "--triplet", "x64 windows"])).unwrap_err();
    assert_eq!(exit_code(&err), 1);
  }

  #[test]
  fn child_exit_codes_pass_through() {
    let err: anyhow::Error = ProvisionError::Command(ProcessError::Failed {
      command: "vcpkg install".to_string(),
      code: Some(3),
    })
    .into();
    assert_eq!(exit_code(&err), 3);

    let err: anyhow::Error = ProvisionError::Command(ProcessError::Failed {
      command: "cmake".to_string(),
      code: Some(0),
    })
    .into();
    assert_eq!(exit_code(&err), 1);
  }

  #[test]
  fn wide_exit_codes_follow_the_host() {
    let err: anyhow::Error = ProvisionError::Command(ProcessError::Failed {
      command: "cmake".to_string(),
      code: Some(-1073741819),
    })
    .into();
    let expected = if cfg!(windows) { -1073741819 } else { 1 };
    assert_eq!(exit_code(&err), expected);

    let err: anyhow::Error = ProvisionError::Command(ProcessError::Failed {
      command: "vcpkg install".to_string(),
      code: Some(256),
    })
    .into();
    let expected = if cfg!(windows) { 256 } else { 1 };
    assert_eq!(exit_code(&err), expected);
  }

  #[test]
  fn elapsed_is_human_readable() {
    assert_eq!(format_elapsed(Duration::from_millis(61_500)), "1m 1s 500ms");
  }
}
