//! Orchestration for `customize-and-build` and `customize-and-build --restore`.
//!
//! A run is linear: load config, back up targets, apply patches, build. Any
//! failure after the backup step rolls every file back from the backup.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, instrument};

use crate::core::types::BuildStep;
use crate::exit_codes;
use crate::io::backup::{BackupManager, BackupStatus, RestoredFile};
use crate::io::build::{BuildOutcome, BuildRequest, BuildRunner};
use crate::io::config::{CustomizeConfig, load_config};
use crate::io::patcher::{PatchResult, apply_patch};
use crate::io::paths::ProjectPaths;
use crate::io::run_log::RunLog;
use crate::plan::{plan_build, plan_patches};

const TITLE: &str = "Cherry Studio Customization and Build Script";

#[derive(Debug, Clone)]
pub struct CustomizeOptions {
    pub paths: ProjectPaths,
    /// Resolved path of the JSON config file.
    pub config_path: PathBuf,
    /// Report planned actions without writing any file.
    pub dry_run: bool,
}

/// Phase in which a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Backup,
    Patch,
    Build,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomizeStop {
    Completed,
    /// Config could not be loaded; nothing in the project was touched.
    InvalidConfig(String),
    Failed {
        stage: Stage,
        reason: String,
        /// Whether the rollback from backup succeeded.
        restored: bool,
    },
}

#[derive(Debug, Clone)]
pub struct CustomizeReport {
    pub stop: CustomizeStop,
    /// Per-target result of every patch that ran, in order.
    pub patches: Vec<(String, PatchResult)>,
    /// Build steps that were started (or, in a dry run, planned).
    pub build_steps: Vec<BuildStep>,
}

impl CustomizeReport {
    fn stopped(stop: CustomizeStop) -> Self {
        Self {
            stop,
            patches: Vec::new(),
            build_steps: Vec::new(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.stop {
            CustomizeStop::Completed => exit_codes::OK,
            CustomizeStop::InvalidConfig(_) => exit_codes::INVALID,
            CustomizeStop::Failed { .. } => exit_codes::FAILED,
        }
    }
}

/// Customize the project and, if configured, build installers.
#[instrument(skip_all, fields(root = %options.paths.root.display(), dry_run = options.dry_run))]
pub fn run_customize<B: BuildRunner>(
    options: &CustomizeOptions,
    build_runner: &B,
    log: &mut RunLog,
) -> Result<CustomizeReport> {
    let dry_run = options.dry_run;
    log.banner();
    log.info(TITLE);
    log.banner();
    if dry_run {
        log.info("[DRY RUN] No files will be written");
    }

    let config = match load_config(&options.config_path) {
        Ok(config) => {
            log.info(format!(
                "Configuration loaded from {}",
                options.config_path.display()
            ));
            config
        }
        Err(err) => {
            let reason = format!("{err:#}");
            log.error(format!("Failed to load configuration: {reason}"));
            log.error("Exiting without modifying any file.");
            return Ok(CustomizeReport::stopped(CustomizeStop::InvalidConfig(
                reason,
            )));
        }
    };

    if !dry_run {
        log.persist()?;
    }

    let backups = BackupManager::new(&options.paths.root, &options.paths.backup_dir);
    let patches = plan_patches(&config);
    let mut report = CustomizeReport::stopped(CustomizeStop::Completed);

    log.info("Backing up files...");
    for patch in &patches {
        let target = patch.target();
        if dry_run {
            log.info(format!("[DRY RUN] Would back up: {target}"));
            continue;
        }
        match backups.backup_file(target) {
            Ok(BackupStatus::Saved(path)) => {
                log.info(format!("Backed up: {target} -> {}", path.display()));
            }
            Ok(BackupStatus::AlreadySaved(path)) => {
                log.info(format!("Backup already present: {}", path.display()));
            }
            Ok(BackupStatus::SourceMissing) => {
                log.warn(format!("File not found, skipping backup: {target}"));
            }
            Err(err) => {
                let reason = format!("{err:#}");
                log.error(format!("Failed to back up {target}: {reason}"));
                report.stop = CustomizeStop::Failed {
                    stage: Stage::Backup,
                    reason,
                    restored: false,
                };
                return Ok(report);
            }
        }
    }

    let mut failures = Vec::new();
    for patch in &patches {
        let target = patch.target();
        log.info(format!("{}...", patch.name()));
        match apply_patch(&options.paths.root, patch.as_ref(), dry_run) {
            Ok(result) => {
                match result {
                    PatchResult::Written => log.success(format!("Modified: {target}")),
                    PatchResult::WouldWrite => {
                        log.info(format!("[DRY RUN] Would modify: {target}"));
                    }
                    PatchResult::AlreadyApplied => {
                        log.info(format!("{target} already customized - skipping"));
                    }
                }
                report.patches.push((target.to_string(), result));
            }
            Err(err) => {
                log.error(format!("{err:#}"));
                failures.push(target.to_string());
            }
        }
    }

    if !failures.is_empty() {
        log.error("Some modifications failed. Check the log for details.");
        let restored = !dry_run && rollback(&backups, log);
        report.stop = CustomizeStop::Failed {
            stage: Stage::Patch,
            reason: format!("failed to modify: {}", failures.join(", ")),
            restored,
        };
        return Ok(report);
    }

    if !dry_run {
        for (target, _) in &report.patches {
            if let Err(err) = backups.record_customized(target) {
                log.warn(format!("Could not record customized state of {target}: {err:#}"));
            }
        }
    }

    if let Some(stop) = run_build(options, &config, build_runner, &backups, log, &mut report) {
        report.stop = stop;
        return Ok(report);
    }

    log.banner();
    log.success("Customization completed successfully!");
    log.banner();
    info!(patches = report.patches.len(), builds = report.build_steps.len(), "customization complete");
    Ok(report)
}

/// Run the planned build steps. Returns the stop reason on failure.
fn run_build<B: BuildRunner>(
    options: &CustomizeOptions,
    config: &CustomizeConfig,
    build_runner: &B,
    backups: &BackupManager,
    log: &mut RunLog,
    report: &mut CustomizeReport,
) -> Option<CustomizeStop> {
    if !config.auto_build {
        log.info("autoBuild disabled - skipping build");
        return None;
    }

    let steps = plan_build(config);
    for step in steps {
        let request = BuildRequest {
            workdir: options.paths.root.clone(),
            program: config.package_manager.clone(),
            step,
            timeout: Duration::from_secs(config.command_timeout_secs),
        };
        let description = step.description();
        log.info(format!("{description}..."));
        report.build_steps.push(step);
        if options.dry_run {
            log.info(format!("[DRY RUN] Would run: {}", request.display()));
            continue;
        }

        let reason = match build_runner.run(&request) {
            Ok(BuildOutcome::Success) => {
                log.success(format!("{description} completed"));
                continue;
            }
            Ok(BuildOutcome::Failed {
                exit_code,
                timed_out,
                stdout_tail,
                stderr_tail,
            }) => {
                if !stdout_tail.is_empty() {
                    log.error(format!("Output: {stdout_tail}"));
                }
                if !stderr_tail.is_empty() {
                    log.error(format!("Error output: {stderr_tail}"));
                }
                if timed_out {
                    format!(
                        "`{}` timed out after {}s",
                        request.display(),
                        config.command_timeout_secs
                    )
                } else {
                    format!("`{}` exited with {exit_code:?}", request.display())
                }
            }
            Err(err) => format!("{err:#}"),
        };

        log.error(format!("{description} failed: {reason}"));
        let restored = rollback(backups, log);
        return Some(CustomizeStop::Failed {
            stage: Stage::Build,
            reason,
            restored,
        });
    }

    if !options.dry_run && !report.build_steps.is_empty() {
        log.success("Build completed successfully!");
        log.info("Installation packages are in the 'dist/' directory");
    }
    None
}

fn rollback(backups: &BackupManager, log: &mut RunLog) -> bool {
    log.info("Restoring from backup...");
    match backups.restore_all() {
        Ok(files) => {
            for file in &files {
                log_restored(log, file);
            }
            true
        }
        Err(err) => {
            log.error(format!("Failed to restore files: {err:#}"));
            false
        }
    }
}

fn log_restored(log: &mut RunLog, file: &RestoredFile) {
    if file.changed_since_customized {
        log.warn(format!(
            "{} changed after customization (upstream update?); those changes were replaced by the backup",
            file.path
        ));
    }
    log.info(format!(
        "Restored: {} -> {}",
        file.backup.display(),
        file.path
    ));
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: Vec<String>,
    pub ok: bool,
}

impl RestoreReport {
    pub fn exit_code(&self) -> i32 {
        if self.ok {
            exit_codes::OK
        } else {
            exit_codes::FAILED
        }
    }
}

/// Restore every backed-up file. In a dry run only the plan is reported.
#[instrument(skip_all, fields(root = %paths.root.display(), dry_run = dry_run))]
pub fn run_restore(paths: &ProjectPaths, dry_run: bool, log: &mut RunLog) -> Result<RestoreReport> {
    log.banner();
    log.info(TITLE);
    log.banner();
    log.info("Restoring files from backup...");
    if !dry_run {
        log.persist()?;
    }

    let backups = BackupManager::new(&paths.root, &paths.backup_dir);
    let manifest = match backups.load_manifest() {
        Ok(manifest) => manifest,
        Err(err) => {
            log.error(format!("Failed to read backup manifest: {err:#}"));
            return Ok(RestoreReport {
                restored: Vec::new(),
                ok: false,
            });
        }
    };
    if manifest.entries.is_empty() {
        log.warn(format!(
            "No backups found in {}",
            paths.backup_dir.display()
        ));
        return Ok(RestoreReport {
            restored: Vec::new(),
            ok: true,
        });
    }

    if dry_run {
        let planned: Vec<String> = manifest
            .entries
            .iter()
            .map(|entry| entry.path.clone())
            .collect();
        for path in &planned {
            log.info(format!("[DRY RUN] Would restore: {path}"));
        }
        return Ok(RestoreReport {
            restored: planned,
            ok: true,
        });
    }

    match backups.restore_all() {
        Ok(files) => {
            for file in &files {
                log_restored(log, file);
            }
            log.success("All files restored successfully");
            Ok(RestoreReport {
                restored: files.into_iter().map(|file| file.path).collect(),
                ok: true,
            })
        }
        Err(err) => {
            log.error(format!("Failed to restore files: {err:#}"));
            Ok(RestoreReport {
                restored: Vec::new(),
                ok: false,
            })
        }
    }
}
