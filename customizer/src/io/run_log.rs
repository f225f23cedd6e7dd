//! Append-only run log (`customize-build.log`).
//!
//! Every line is echoed to stdout and appended to the log file as
//! `[YYYY-MM-DD HH:MM:SS] [LEVEL] message`. This is a product artifact and is
//! independent of `RUST_LOG`; see [`crate::logging`] for developer tracing.
//!
//! A deferred log holds lines in memory until [`RunLog::persist`] is called,
//! so a run rejected during config validation leaves no file behind.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::warn;

pub const DEFAULT_LOG_FILE: &str = "customize-build.log";

const BANNER_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Success,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Success => "SUCCESS",
        })
    }
}

enum Sink {
    Console,
    /// Formatted lines waiting for `persist`.
    Pending { path: PathBuf, lines: Vec<String> },
    File(File),
}

pub struct RunLog {
    sink: Sink,
    entries: Vec<(Level, String)>,
}

impl RunLog {
    /// Open (or create) `path` for appending.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            sink: Sink::File(open_append(path)?),
            entries: Vec::new(),
        })
    }

    /// Buffer lines for `path` without creating it until [`RunLog::persist`].
    pub fn deferred(path: impl Into<PathBuf>) -> Self {
        Self {
            sink: Sink::Pending {
                path: path.into(),
                lines: Vec::new(),
            },
            entries: Vec::new(),
        }
    }

    /// Log to stdout only. Used for dry runs, which must not touch the disk.
    pub fn console_only() -> Self {
        Self {
            sink: Sink::Console,
            entries: Vec::new(),
        }
    }

    /// Open the file of a deferred log and flush the buffered lines into it.
    /// A no-op for console-only logs and logs already on disk.
    pub fn persist(&mut self) -> Result<()> {
        let Sink::Pending { path, lines } = &self.sink else {
            return Ok(());
        };
        let mut file = open_append(path)?;
        for line in lines {
            writeln!(file, "{line}").with_context(|| format!("write {}", path.display()))?;
        }
        file.flush()
            .with_context(|| format!("flush {}", path.display()))?;
        self.sink = Sink::File(file);
        Ok(())
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(Level::Info, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.log(Level::Warn, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(Level::Error, message.into());
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.log(Level::Success, message.into());
    }

    pub fn banner(&mut self) {
        self.info("=".repeat(BANNER_WIDTH));
    }

    /// Everything logged so far, in order.
    pub fn entries(&self) -> &[(Level, String)] {
        &self.entries
    }

    fn log(&mut self, level: Level, message: String) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let line = format_line(&timestamp, level, &message);
        println!("{line}");
        match &mut self.sink {
            Sink::Console => {}
            Sink::Pending { lines, .. } => lines.push(line),
            Sink::File(file) => {
                if let Err(err) = writeln!(file, "{line}").and_then(|()| file.flush()) {
                    warn!(err = %err, "failed to append to run log");
                }
            }
        }
        self.entries.push((level, message));
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

pub fn format_line(timestamp: &str, level: Level, message: &str) -> String {
    format!("[{timestamp}] [{level}] {message}")
}
