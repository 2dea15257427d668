mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use snowprov_lib::backend::BackendKind;
use snowprov_lib::consts::{DEFAULT_BUILD_DIR, DEFAULT_BUILD_TYPE, DEFAULT_TRIPLET};

use crate::output::print_error;

/// Provision Snowstorm's native dependencies and configure its CMake build
#[derive(Parser, Debug)]
#[command(name = "snowprov")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
  /// Target platform triplet
  #[arg(long, default_value = DEFAULT_TRIPLET)]
  pub triplet: String,

  /// Build directory, relative to the project root
  #[arg(long, default_value = DEFAULT_BUILD_DIR)]
  pub build_dir: PathBuf,

  /// Package-manager directory, relative to the project root [default: vcpkg or .conan]
  #[arg(long, visible_alias = "vcpkg-dir")]
  pub toolchain_dir: Option<PathBuf>,

  /// Delete the build directory before configuring
  #[arg(long)]
  pub clean: bool,

  /// Delete the package manager's installed packages and build caches
  #[arg(long)]
  pub fresh: bool,

  /// CMake generator (e.g. "Visual Studio 17 2022", "Ninja")
  #[arg(long)]
  pub generator: Option<String>,

  /// CMake toolset, applied for any triplet
  #[arg(long)]
  pub toolset: Option<String>,

  /// Package backend [default: from config, else vcpkg]
  #[arg(long)]
  pub backend: Option<BackendKind>,

  /// Build configuration used for staging and Conan settings
  #[arg(long, default_value = DEFAULT_BUILD_TYPE)]
  pub build_type: String,

  /// Project root [default: current directory]
  #[arg(long)]
  pub project_root: Option<PathBuf>,

  /// Configuration file [default: <project-root>/snowprov.toml if present]
  #[arg(long)]
  pub config: Option<PathBuf>,

  /// Skip copying shared libraries and binding sources
  #[arg(long)]
  pub no_stage: bool,

  /// Print the run summary as JSON
  #[arg(long)]
  pub json: bool,

  /// Enable debug logging
  #[arg(short, long)]
  pub verbose: bool,
}

fn init_tracing(verbose: bool) {
  let default = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  match cmd::cmd_provision(&cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{:#}", err));
      std::process::exit(cmd::exit_code(&err))
    }
  }
}
