//! Backup and restore of customized files.
//!
//! Each tracked file is copied to `<backup_dir>/<relative path>.bak` and
//! recorded in `<backup_dir>/manifest.json` with the sha256 of its bytes. An
//! entry, once recorded, is never overwritten, so the backup keeps the
//! pre-customization contents across reruns. The hash of the customized file
//! is recorded too, so a restore can tell when a file changed after the tool
//! last wrote it (e.g. an upstream pull) and is about to be reverted.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

pub const DEFAULT_BACKUP_DIR: &str = ".customize-backup";
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupManifest {
    pub entries: Vec<BackupEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    /// Original path relative to the project root.
    pub path: String,
    /// Backup path relative to the backup directory.
    pub backup: String,
    pub sha256: String,
    /// Hash of the file as the tool last left it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customized_sha256: Option<String>,
}

impl BackupManifest {
    pub fn find(&self, path: &str) -> Option<&BackupEntry> {
        self.entries.iter().find(|entry| entry.path == path)
    }

    fn find_mut(&mut self, path: &str) -> Option<&mut BackupEntry> {
        self.entries.iter_mut().find(|entry| entry.path == path)
    }
}

/// What `backup_file` did for a given path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupStatus {
    /// A fresh copy was written to this path.
    Saved(PathBuf),
    /// The manifest already holds a backup for this file.
    AlreadySaved(PathBuf),
    /// The source file does not exist; nothing was saved.
    SourceMissing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredFile {
    pub path: String,
    pub backup: PathBuf,
    /// The file no longer matched what the tool wrote; those changes were
    /// overwritten by the backup.
    pub changed_since_customized: bool,
}

/// Owns the backup directory of one project root.
#[derive(Debug, Clone)]
pub struct BackupManager {
    root: PathBuf,
    backup_dir: PathBuf,
}

impl BackupManager {
    pub fn new(root: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            backup_dir: backup_dir.into(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.backup_dir.join(MANIFEST_FILE)
    }

    /// Load the manifest; an absent manifest is empty.
    pub fn load_manifest(&self) -> Result<BackupManifest> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(BackupManifest::default());
        }
        let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
    }

    pub fn has_backups(&self) -> Result<bool> {
        Ok(!self.load_manifest()?.entries.is_empty())
    }

    /// Copy `rel_path` into the backup directory and record it.
    #[instrument(skip(self))]
    pub fn backup_file(&self, rel_path: &str) -> Result<BackupStatus> {
        let source = self.root.join(rel_path);
        if !source.is_file() {
            warn!(path = %source.display(), "backup source missing");
            return Ok(BackupStatus::SourceMissing);
        }

        let mut manifest = self.load_manifest()?;
        if let Some(entry) = manifest.find(rel_path) {
            let existing = self.backup_dir.join(&entry.backup);
            if existing.is_file() {
                debug!(backup = %existing.display(), "backup already recorded");
                return Ok(BackupStatus::AlreadySaved(existing));
            }
            // Recorded but gone from disk: drop the stale entry and take a fresh copy.
            manifest.entries.retain(|entry| entry.path != rel_path);
        }

        let backup_rel = format!("{rel_path}.bak");
        let backup_path = self.backup_dir.join(&backup_rel);
        if let Some(parent) = backup_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create backup dir {}", parent.display()))?;
        }
        fs::copy(&source, &backup_path).with_context(|| {
            format!("copy {} -> {}", source.display(), backup_path.display())
        })?;

        manifest.entries.push(BackupEntry {
            path: rel_path.to_string(),
            backup: backup_rel,
            sha256: file_sha256(&backup_path)?,
            customized_sha256: None,
        });
        self.write_manifest(&manifest)?;
        Ok(BackupStatus::Saved(backup_path))
    }

    /// Record the current hash of `rel_path` as the tool's output.
    /// Files without a backup entry are ignored.
    #[instrument(skip(self))]
    pub fn record_customized(&self, rel_path: &str) -> Result<()> {
        let mut manifest = self.load_manifest()?;
        let Some(entry) = manifest.find_mut(rel_path) else {
            return Ok(());
        };
        let current = file_sha256(&self.root.join(rel_path))?;
        if entry.customized_sha256.as_deref() == Some(current.as_str()) {
            return Ok(());
        }
        entry.customized_sha256 = Some(current);
        self.write_manifest(&manifest)
    }

    /// Copy every recorded backup over its original.
    ///
    /// Backups whose checksum no longer matches the manifest are not restored.
    /// When every entry succeeds the backup directory is removed so the next
    /// run starts from the restored files.
    #[instrument(skip(self))]
    pub fn restore_all(&self) -> Result<Vec<RestoredFile>> {
        let manifest = self.load_manifest()?;
        let mut restored = Vec::new();
        let mut failures = Vec::new();

        for entry in &manifest.entries {
            match self.restore_entry(entry) {
                Ok(file) => restored.push(file),
                Err(err) => {
                    warn!(path = %entry.path, err = %err, "restore failed");
                    failures.push(format!("{}: {err:#}", entry.path));
                }
            }
        }

        if !failures.is_empty() {
            bail!("restore failed for:\n- {}", failures.join("\n- "));
        }
        if self.backup_dir.exists() {
            fs::remove_dir_all(&self.backup_dir)
                .with_context(|| format!("remove {}", self.backup_dir.display()))?;
        }
        Ok(restored)
    }

    fn restore_entry(&self, entry: &BackupEntry) -> Result<RestoredFile> {
        let backup_path = self.backup_dir.join(&entry.backup);
        if !backup_path.is_file() {
            bail!("backup missing at {}", backup_path.display());
        }
        let actual = file_sha256(&backup_path)?;
        if actual != entry.sha256 {
            bail!(
                "checksum mismatch for {} (expected {}, found {actual})",
                backup_path.display(),
                entry.sha256
            );
        }
        let target = self.root.join(&entry.path);
        let changed_since_customized = match &entry.customized_sha256 {
            Some(expected) if target.is_file() => file_sha256(&target)? != *expected,
            _ => false,
        };
        if changed_since_customized {
            warn!(path = %entry.path, "file changed after customization, reverting to backup");
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::copy(&backup_path, &target)
            .with_context(|| format!("copy {} -> {}", backup_path.display(), target.display()))?;
        Ok(RestoredFile {
            path: entry.path.clone(),
            backup: backup_path,
            changed_since_customized,
        })
    }

    /// Atomically write the manifest (temp file + rename).
    fn write_manifest(&self, manifest: &BackupManifest) -> Result<()> {
        let path = self.manifest_path();
        fs::create_dir_all(&self.backup_dir)
            .with_context(|| format!("create directory {}", self.backup_dir.display()))?;
        let mut buf = serde_json::to_string_pretty(manifest).context("serialize manifest")?;
        buf.push('\n');
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, buf)
            .with_context(|| format!("write temp manifest {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .with_context(|| format!("replace manifest {}", path.display()))?;
        Ok(())
    }
}

fn file_sha256(path: &Path) -> Result<String> {
    let contents = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(contents);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(root: &Path) -> BackupManager {
        BackupManager::new(root, root.join(DEFAULT_BACKUP_DIR))
    }

    fn write(root: &Path, rel: &str, contents: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, contents).expect("write");
    }

    #[test]
    fn restore_returns_original_bytes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        let original = "{\n  \"name\": \"cherry\"\n}\r\n\u{feff}".as_bytes();
        write(root, "package.json", original);
        write(root, "src/store/settings.ts", b"autoCheckUpdate: true,\n");

        let backups = manager(root);
        assert!(matches!(
            backups.backup_file("package.json").expect("backup"),
            BackupStatus::Saved(_)
        ));
        backups.backup_file("src/store/settings.ts").expect("backup");

        write(root, "package.json", b"mutated");
        write(root, "src/store/settings.ts", b"mutated");

        let restored = backups.restore_all().expect("restore");
        assert_eq!(restored.len(), 2);
        assert_eq!(fs::read(root.join("package.json")).expect("read"), original);
        assert_eq!(
            fs::read(root.join("src/store/settings.ts")).expect("read"),
            b"autoCheckUpdate: true,\n"
        );
        assert!(!backups.backup_dir().exists());
    }

    #[test]
    fn second_backup_keeps_first_copy() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        write(root, "package.json", b"pristine");

        let backups = manager(root);
        backups.backup_file("package.json").expect("first backup");
        write(root, "package.json", b"customized");
        let status = backups.backup_file("package.json").expect("second backup");
        assert!(matches!(status, BackupStatus::AlreadySaved(_)));

        backups.restore_all().expect("restore");
        assert_eq!(fs::read(root.join("package.json")).expect("read"), b"pristine");
    }

    #[test]
    fn restore_flags_files_changed_after_customization() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        write(root, "package.json", b"pristine");
        write(root, "electron-builder.yml", b"appId: old\n");

        let backups = manager(root);
        backups.backup_file("package.json").expect("backup");
        backups.backup_file("electron-builder.yml").expect("backup");
        write(root, "package.json", b"customized");
        write(root, "electron-builder.yml", b"appId: new\n");
        backups.record_customized("package.json").expect("record");
        backups.record_customized("electron-builder.yml").expect("record");

        write(root, "package.json", b"upstream update");

        let restored = backups.restore_all().expect("restore");
        let changed: Vec<(&str, bool)> = restored
            .iter()
            .map(|file| (file.path.as_str(), file.changed_since_customized))
            .collect();
        assert_eq!(
            changed,
            vec![("package.json", true), ("electron-builder.yml", false)]
        );
        assert_eq!(fs::read(root.join("package.json")).expect("read"), b"pristine");
    }

    #[test]
    fn manifest_without_customized_hash_still_loads() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        write(
            root,
            ".customize-backup/manifest.json",
            br#"{"entries":[{"path":"a.txt","backup":"a.txt.bak","sha256":"00"}]}"#,
        );
        let manifest = manager(root).load_manifest().expect("load");
        assert_eq!(manifest.entries[0].customized_sha256, None);
    }

    #[test]
    fn missing_source_is_skipped() {
        let temp = tempfile::tempdir().expect("tempdir");
        let backups = manager(temp.path());
        assert_eq!(
            backups.backup_file("electron-builder.yml").expect("backup"),
            BackupStatus::SourceMissing
        );
        assert!(!backups.has_backups().expect("manifest"));
    }

    #[test]
    fn restore_without_manifest_is_a_no_op() {
        let temp = tempfile::tempdir().expect("tempdir");
        let restored = manager(temp.path()).restore_all().expect("restore");
        assert!(restored.is_empty());
    }

    #[test]
    fn tampered_backup_is_not_restored() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        write(root, "package.json", b"pristine");

        let backups = manager(root);
        let BackupStatus::Saved(backup_path) = backups.backup_file("package.json").expect("backup")
        else {
            panic!("expected fresh backup");
        };
        fs::write(&backup_path, b"tampered").expect("tamper");
        write(root, "package.json", b"customized");

        let err = backups.restore_all().unwrap_err();
        assert!(err.to_string().contains("restore failed"));
        assert!(format!("{err:#}").contains("checksum mismatch"));
        assert_eq!(fs::read(root.join("package.json")).expect("read"), b"customized");
        assert!(backups.has_backups().expect("manifest kept"));
    }
}
