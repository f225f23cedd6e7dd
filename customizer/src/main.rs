//! Customize a Cherry Studio checkout and build its installers.
//!
//! Edits a fixed set of source and packaging files (backing each one up
//! first), then drives the project's package manager to build installers.
//! `--restore` puts every backed-up file back.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use customizer::customize::{CustomizeOptions, run_customize, run_restore};
use customizer::exit_codes;
use customizer::io::build::PackageManagerRunner;
use customizer::io::paths::{DEFAULT_CONFIG_FILE, ProjectPaths};
use customizer::io::run_log::RunLog;
use customizer::logging;

#[derive(Parser)]
#[command(
    name = "customize-and-build",
    version,
    about = "Cherry Studio customization and build script"
)]
struct Cli {
    /// Config file path (relative paths resolve against --project-dir).
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Root of the Cherry Studio checkout.
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,

    /// Show what would be done without writing any file.
    #[arg(long)]
    dry_run: bool,

    /// Restore all customized files from backup.
    #[arg(long)]
    restore: bool,
}

fn main() {
    logging::init();
    let code = match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::FAILED
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    if !cli.project_dir.is_dir() {
        eprintln!(
            "project directory not found: {}",
            cli.project_dir.display()
        );
        return Ok(exit_codes::INVALID);
    }
    let paths = ProjectPaths::new(&cli.project_dir);
    let mut log = if cli.dry_run {
        RunLog::console_only()
    } else {
        RunLog::deferred(&paths.log_path)
    };

    if cli.restore {
        let report = run_restore(&paths, cli.dry_run, &mut log)?;
        return Ok(report.exit_code());
    }

    let options = CustomizeOptions {
        config_path: paths.resolve_config(&cli.config),
        paths,
        dry_run: cli.dry_run,
    };
    let report = run_customize(&options, &PackageManagerRunner, &mut log)?;
    Ok(report.exit_code())
}
