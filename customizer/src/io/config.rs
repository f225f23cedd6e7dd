//! Customization configuration stored in `customize-config.json`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use jsonschema::Draft;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::types::Platform;

const CONFIG_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/customize-config.v1.schema.json"
));

/// Customization configuration (JSON, camelCase keys).
///
/// The four identity fields are required. Feature toggles default to the
/// full customization with an automatic build for no platforms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CustomizeConfig {
    /// Written to `appId` in `electron-builder.yml`.
    pub app_id: String,

    /// Written to `productName` in both `electron-builder.yml` and `package.json`.
    pub product_name: String,

    /// Written to `name` in `package.json`.
    pub package_name: String,

    /// Written to `version` in `package.json`.
    pub version: String,

    #[serde(default = "enabled")]
    pub hide_data_settings: bool,

    #[serde(default = "enabled")]
    pub apply_bailian_fix: bool,

    #[serde(default = "enabled", rename = "hideUpdateUI")]
    pub hide_update_ui: bool,

    #[serde(default)]
    pub build_platforms: Vec<Platform>,

    #[serde(default = "enabled")]
    pub auto_build: bool,

    #[serde(default)]
    pub skip_build_check: bool,

    #[serde(default)]
    pub skip_install: bool,

    #[serde(default)]
    pub skip_format: bool,

    /// Executable used for every build step (e.g. `pnpm`).
    #[serde(default = "default_package_manager")]
    pub package_manager: String,

    /// Per-command wall-clock limit in seconds.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

fn enabled() -> bool {
    true
}

fn default_package_manager() -> String {
    "pnpm".to_string()
}

fn default_command_timeout_secs() -> u64 {
    60 * 60
}

impl CustomizeConfig {
    /// Config with the given identity and every other field at its default.
    pub fn with_identity(
        app_id: impl Into<String>,
        product_name: impl Into<String>,
        package_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            product_name: product_name.into(),
            package_name: package_name.into(),
            version: version.into(),
            hide_data_settings: true,
            apply_bailian_fix: true,
            hide_update_ui: true,
            build_platforms: Vec::new(),
            auto_build: true,
            skip_build_check: false,
            skip_install: false,
            skip_format: false,
            package_manager: default_package_manager(),
            command_timeout_secs: default_command_timeout_secs(),
        }
    }

    /// Report every semantic violation at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        for (field, value) in [
            ("appId", &self.app_id),
            ("productName", &self.product_name),
            ("packageName", &self.package_name),
            ("version", &self.version),
            ("packageManager", &self.package_manager),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("{field} must be a non-empty string"));
            }
        }
        if self.command_timeout_secs == 0 {
            errors.push("commandTimeoutSecs must be > 0".to_string());
        }
        if !errors.is_empty() {
            bail!("invalid configuration:\n- {}", errors.join("\n- "));
        }
        Ok(())
    }
}

/// Load, schema-check and validate a config file.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_config(path: &Path) -> Result<CustomizeConfig> {
    if !path.is_file() {
        bail!("config file not found: {}", path.display());
    }
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg = parse_config(&raw).with_context(|| format!("load {}", path.display()))?;
    debug!(app_id = %cfg.app_id, platforms = cfg.build_platforms.len(), "config loaded");
    Ok(cfg)
}

/// Parse config JSON text: schema conformance, then semantic validation.
pub fn parse_config(raw: &str) -> Result<CustomizeConfig> {
    let instance: Value = serde_json::from_str(raw).context("invalid JSON in config")?;
    validate_schema(&instance)?;
    let cfg: CustomizeConfig =
        serde_json::from_value(instance).context("parse config fields")?;
    cfg.validate()?;
    Ok(cfg)
}

/// Validate a config instance against the bundled JSON Schema (Draft 2020-12).
fn validate_schema(instance: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(CONFIG_SCHEMA).context("parse config schema")?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .context("compile config schema")?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("config schema validation failed:\n- {}", messages.join("\n- "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
  "appId": "com.acme.studio",
  "productName": "Acme Studio",
  "packageName": "acme-studio",
  "version": "1.0.0"
}"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = parse_config(MINIMAL).expect("parse");
        assert_eq!(
            cfg,
            CustomizeConfig::with_identity("com.acme.studio", "Acme Studio", "acme-studio", "1.0.0")
        );
    }

    #[test]
    fn full_config_parses_every_field() {
        let raw = r#"{
  "_comment": "ignored",
  "appId": "com.acme.studio",
  "productName": "Acme Studio",
  "packageName": "acme-studio",
  "version": "1.0.0",
  "hideDataSettings": false,
  "applyBailianFix": false,
  "hideUpdateUI": false,
  "buildPlatforms": ["windows", "mac"],
  "autoBuild": false,
  "skipBuildCheck": true,
  "skipInstall": true,
  "skipFormat": true,
  "packageManager": "npm",
  "commandTimeoutSecs": 90
}"#;
        let cfg = parse_config(raw).expect("parse");
        assert!(!cfg.hide_data_settings);
        assert!(!cfg.apply_bailian_fix);
        assert!(!cfg.hide_update_ui);
        assert_eq!(cfg.build_platforms, vec![Platform::Windows, Platform::Mac]);
        assert!(!cfg.auto_build);
        assert!(cfg.skip_build_check);
        assert!(cfg.skip_install);
        assert!(cfg.skip_format);
        assert_eq!(cfg.package_manager, "npm");
        assert_eq!(cfg.command_timeout_secs, 90);
    }

    #[test]
    fn example_config_is_valid() {
        let raw = include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/customize-config.example.json"
        ));
        let cfg = parse_config(raw).expect("parse example");
        assert_eq!(cfg.build_platforms, vec![Platform::Mac, Platform::Windows]);
        assert_eq!(cfg.command_timeout_secs, default_command_timeout_secs());
    }

    #[test]
    fn missing_required_field_fails_schema() {
        let raw = r#"{ "appId": "com.acme.studio", "productName": "Acme", "version": "1.0.0" }"#;
        let err = parse_config(raw).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("schema validation failed"), "{msg}");
        assert!(msg.contains("packageName"), "{msg}");
    }

    #[test]
    fn unknown_platform_fails_schema() {
        let raw = r#"{
  "appId": "a", "productName": "b", "packageName": "c", "version": "1",
  "buildPlatforms": ["linux"]
}"#;
        let err = parse_config(raw).unwrap_err();
        assert!(format!("{err:#}").contains("schema validation failed"));
    }

    #[test]
    fn blank_identity_is_reported() {
        let raw = r#"{ "appId": "  ", "productName": "b", "packageName": "c", "version": "1" }"#;
        let err = parse_config(raw).unwrap_err();
        assert!(format!("{err:#}").contains("appId must be a non-empty string"));
    }

    #[test]
    fn invalid_json_is_reported() {
        let err = parse_config("{ not json").unwrap_err();
        assert!(format!("{err:#}").contains("invalid JSON in config"));
    }

    #[test]
    fn missing_file_is_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_config(&temp.path().join("customize-config.json")).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }
}
