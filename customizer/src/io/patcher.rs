//! Applies a [`Patch`] to its target file on disk.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, instrument};

use crate::core::line_endings::LineEndings;
use crate::core::types::{Patch, PatchOutcome};

/// What happened to a patch's target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchResult {
    Written,
    /// Dry run: the file would have been rewritten.
    WouldWrite,
    AlreadyApplied,
}

/// Read the target, transform it, and write it back unless `dry_run`.
///
/// CRLF files are patched as LF and written back with CRLF.
#[instrument(skip_all, fields(patch = patch.name(), target = patch.target(), dry_run = dry_run))]
pub fn apply_patch(root: &Path, patch: &dyn Patch, dry_run: bool) -> Result<PatchResult> {
    let path = root.join(patch.target());
    if !path.is_file() {
        bail!("target file not found: {}", path.display());
    }
    let contents = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;

    let endings = LineEndings::detect(&contents);
    let outcome = patch
        .apply(&endings.to_lf(&contents))
        .with_context(|| format!("{} failed", patch.name()))?;
    let patched = match outcome {
        PatchOutcome::AlreadyApplied => {
            debug!("already applied");
            return Ok(PatchResult::AlreadyApplied);
        }
        PatchOutcome::Applied(patched) => patched,
    };

    if dry_run {
        return Ok(PatchResult::WouldWrite);
    }
    fs::write(&path, endings.restore(&patched)).with_context(|| format!("write {}", path.display()))?;
    Ok(PatchResult::Written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::targets::{ABOUT_SETTINGS, SETTINGS_STORE};
    use crate::core::update_ui::{DisableAutoCheckUpdate, HideAboutUpdateControls};
    use crate::test_support::{ABOUT_SETTINGS_FIXTURE, SETTINGS_STORE_FIXTURE};

    fn write_store(root: &Path) -> std::path::PathBuf {
        let path = root.join(SETTINGS_STORE);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, SETTINGS_STORE_FIXTURE).expect("write fixture");
        path
    }

    #[test]
    fn writes_then_reports_already_applied() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_store(temp.path());

        let first = apply_patch(temp.path(), &DisableAutoCheckUpdate, false).expect("apply");
        assert_eq!(first, PatchResult::Written);
        let after_first = fs::read(&path).expect("read");

        let second = apply_patch(temp.path(), &DisableAutoCheckUpdate, false).expect("apply");
        assert_eq!(second, PatchResult::AlreadyApplied);
        assert_eq!(fs::read(&path).expect("read"), after_first);
    }

    #[test]
    fn dry_run_leaves_file_untouched() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_store(temp.path());

        let result = apply_patch(temp.path(), &DisableAutoCheckUpdate, true).expect("apply");
        assert_eq!(result, PatchResult::WouldWrite);
        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            SETTINGS_STORE_FIXTURE
        );
    }

    #[test]
    fn crlf_about_page_keeps_crlf_and_is_idempotent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(ABOUT_SETTINGS);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, ABOUT_SETTINGS_FIXTURE.replace('\n', "\r\n")).expect("write fixture");

        let first = apply_patch(temp.path(), &HideAboutUpdateControls, false).expect("apply");
        assert_eq!(first, PatchResult::Written);
        let patched = fs::read_to_string(&path).expect("read");
        assert!(!patched.contains("CheckUpdateButton"));
        assert_eq!(LineEndings::detect(&patched), LineEndings::Crlf);

        let second = apply_patch(temp.path(), &HideAboutUpdateControls, false).expect("apply");
        assert_eq!(second, PatchResult::AlreadyApplied);
        assert_eq!(fs::read_to_string(&path).expect("read"), patched);
    }

    #[test]
    fn missing_target_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = apply_patch(temp.path(), &DisableAutoCheckUpdate, false).unwrap_err();
        assert!(err.to_string().contains("target file not found"));
    }
}
