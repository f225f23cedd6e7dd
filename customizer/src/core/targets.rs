//! Project-relative paths of every file the customizer edits.

pub const SETTINGS_PAGE: &str = "src/renderer/src/pages/settings/SettingsPage.tsx";
pub const BAILIAN_STRATEGY: &str = "src/main/knowledge/reranker/strategies/BailianStrategy.ts";
pub const UPDATE_APP_BUTTON: &str = "src/renderer/src/pages/home/components/UpdateAppButton.tsx";
pub const ABOUT_SETTINGS: &str = "src/renderer/src/pages/settings/AboutSettings.tsx";
pub const SETTINGS_STORE: &str = "src/renderer/src/store/settings.ts";
pub const ELECTRON_BUILDER: &str = "electron-builder.yml";
pub const PACKAGE_JSON: &str = "package.json";
