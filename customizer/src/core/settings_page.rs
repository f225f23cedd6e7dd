//! Removes the "Data Settings" page from `SettingsPage.tsx`.

use std::sync::LazyLock;

use anyhow::{Result, bail};
use regex::Regex;

use super::targets::SETTINGS_PAGE;
use super::types::{Patch, PatchOutcome};

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"import DataSettings from '\./DataSettings/DataSettings'\r?\n").expect("import regex")
});

static ICON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\n\s*HardDrive").expect("icon regex"));

static MENU_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"[ \t]*<MenuItemLink to="/settings/data">\s*\n"#,
        r"\s*<MenuItem className=\{isRoute\('/settings/data'\)\}>\s*\n",
        r"\s*<HardDrive size=\{18\} />\s*\n",
        r"\s*\{t\('settings\.data\.title'\)\}\s*\n",
        r"\s*</MenuItem>\s*\n",
        r"\s*</MenuItemLink>\s*\n",
    ))
    .expect("menu item regex")
});

static ROUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[ \t]*<Route path="data" element=\{<DataSettings />\} />\s*\n"#).expect("route regex")
});

/// Drops the `DataSettings` import, its `HardDrive` icon, menu entry and route.
#[derive(Debug, Default)]
pub struct HideDataSettings;

impl Patch for HideDataSettings {
    fn name(&self) -> &str {
        "Remove DataSettings module"
    }

    fn target(&self) -> &str {
        SETTINGS_PAGE
    }

    fn apply(&self, contents: &str) -> Result<PatchOutcome> {
        if !contents.contains("DataSettings") {
            return Ok(PatchOutcome::AlreadyApplied);
        }
        // All four edits or none: a partial removal leaves TSX that no longer compiles.
        let edits: [(&str, &Regex); 4] = [
            ("import", &*IMPORT_RE),
            ("HardDrive icon", &*ICON_RE),
            ("menu item", &*MENU_ITEM_RE),
            ("route", &*ROUTE_RE),
        ];
        let unmatched: Vec<&str> = edits
            .iter()
            .filter(|(_, re)| !re.is_match(contents))
            .map(|(label, _)| *label)
            .collect();
        if !unmatched.is_empty() {
            bail!(
                "{SETTINGS_PAGE}: DataSettings layout not recognized, unmatched: {}",
                unmatched.join(", ")
            );
        }

        let mut patched = contents.to_string();
        for (_, re) in edits {
            patched = re.replace_all(&patched, "").into_owned();
        }
        Ok(PatchOutcome::Applied(patched))
    }
}
