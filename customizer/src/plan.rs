//! Turns a configuration into the ordered list of patches and build steps.

use crate::core::bailian::BailianBaseUrl;
use crate::core::builder_yml::ElectronBuilderIdentity;
use crate::core::package_json::PackageIdentity;
use crate::core::settings_page::HideDataSettings;
use crate::core::types::{BuildStep, Patch, Platform};
use crate::core::update_ui::{DisableAutoCheckUpdate, HideAboutUpdateControls, HideUpdateButton};
use crate::io::config::CustomizeConfig;

/// Enabled patches in application order. Identity patches always run.
pub fn plan_patches(config: &CustomizeConfig) -> Vec<Box<dyn Patch>> {
    let mut patches: Vec<Box<dyn Patch>> = Vec::new();
    if config.hide_data_settings {
        patches.push(Box::new(HideDataSettings));
    }
    if config.apply_bailian_fix {
        patches.push(Box::new(BailianBaseUrl));
    }
    if config.hide_update_ui {
        patches.push(Box::new(HideUpdateButton));
        patches.push(Box::new(HideAboutUpdateControls));
        patches.push(Box::new(DisableAutoCheckUpdate));
    }
    patches.push(Box::new(ElectronBuilderIdentity {
        app_id: config.app_id.clone(),
        product_name: config.product_name.clone(),
    }));
    patches.push(Box::new(PackageIdentity {
        package_name: config.package_name.clone(),
        product_name: config.product_name.clone(),
        version: config.version.clone(),
    }));
    patches
}

/// Build steps for `autoBuild`. Platforms are packaged once each, Mac first.
pub fn plan_build(config: &CustomizeConfig) -> Vec<BuildStep> {
    if !config.auto_build {
        return Vec::new();
    }
    let mut steps = Vec::new();
    if !config.skip_install {
        steps.push(BuildStep::Install);
    }
    if !config.skip_format {
        steps.push(BuildStep::Format);
    }
    if !config.skip_build_check {
        steps.push(BuildStep::BuildCheck);
    }
    let mut platforms: Vec<Platform> = config.build_platforms.clone();
    platforms.sort();
    platforms.dedup();
    steps.extend(platforms.into_iter().map(BuildStep::Package));
    steps
}
