//! Shared types for patches and build planning.

use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Result of running a transform over a file's contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The transform changed the contents; holds the new text.
    Applied(String),
    /// The file already carries the customization; nothing to write.
    AlreadyApplied,
}

/// A deterministic, idempotent text transform bound to one project file.
///
/// Implementations never touch the filesystem. `apply` must return
/// [`PatchOutcome::AlreadyApplied`] when fed its own output.
pub trait Patch {
    /// Human-readable label used in the run log.
    fn name(&self) -> &str;

    /// Target path relative to the project root (forward slashes).
    fn target(&self) -> &str;

    fn apply(&self, contents: &str) -> Result<PatchOutcome>;
}

/// Installer platform selectable in `buildPlatforms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Mac,
    Windows,
}

impl Platform {
    /// Project script that packages this platform.
    pub fn script(self) -> &'static str {
        match self {
            Platform::Mac => "build:mac",
            Platform::Windows => "build:win",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Mac => f.write_str("Mac"),
            Platform::Windows => f.write_str("Windows"),
        }
    }
}

/// One package-manager invocation in the build pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    Install,
    Format,
    BuildCheck,
    Package(Platform),
}

impl BuildStep {
    /// Arguments passed to the package manager.
    pub fn args(self) -> Vec<&'static str> {
        match self {
            BuildStep::Install => vec!["install"],
            BuildStep::Format => vec!["format"],
            BuildStep::BuildCheck => vec!["build:check"],
            BuildStep::Package(platform) => vec![platform.script()],
        }
    }

    pub fn description(self) -> String {
        match self {
            BuildStep::Install => "Installing dependencies".to_string(),
            BuildStep::Format => "Formatting code".to_string(),
            BuildStep::BuildCheck => "Running build check".to_string(),
            BuildStep::Package(platform) => format!("Building {platform} package"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_deserializes_lowercase() {
        let platforms: Vec<Platform> =
            serde_json::from_str(r#"["mac","windows"]"#).expect("parse platforms");
        assert_eq!(platforms, vec![Platform::Mac, Platform::Windows]);
        assert!(serde_json::from_str::<Platform>(r#""linux""#).is_err());
    }

    #[test]
    fn package_steps_map_to_project_scripts() {
        assert_eq!(BuildStep::Package(Platform::Mac).args(), vec!["build:mac"]);
        assert_eq!(
            BuildStep::Package(Platform::Windows).args(),
            vec!["build:win"]
        );
        assert_eq!(
            BuildStep::Package(Platform::Windows).description(),
            "Building Windows package"
        );
    }
}
