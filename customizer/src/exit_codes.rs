//! Stable exit codes for `customize-and-build`.

/// Customization (and build, if enabled) succeeded, or a restore completed.
pub const OK: i32 = 0;
/// A patch, build step or restore failed. Files were rolled back where possible.
pub const FAILED: i32 = 1;
/// Configuration or command-line input was invalid; nothing was modified.
pub const INVALID: i32 = 2;
