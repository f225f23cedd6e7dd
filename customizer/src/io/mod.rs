//! I/O helpers: configuration, backups, patch application, subprocesses and the run log.

pub mod backup;
pub mod build;
pub mod config;
pub mod patcher;
pub mod paths;
pub mod process;
pub mod run_log;
