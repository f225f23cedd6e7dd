//! Pure customization logic: text transforms and shared types. No I/O.

pub mod bailian;
pub mod builder_yml;
pub mod line_endings;
pub mod package_json;
pub mod settings_page;
pub mod targets;
pub mod types;
pub mod update_ui;
