//! Staged filesystem for generation output
//!
//! Rendering, patching, and lifecycle commands all run inside a private
//! temporary directory. Nothing touches the real target until [`StagedDir::commit`],
//! which is the single mutation point; dropping an uncommitted staging
//! directory removes it, so cleanup is unconditional on both success and
//! failure paths.

use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

use crate::error::{PacksmithError, Result};

/// `env::temp_dir()` can come back relative when TMPDIR is set to a relative
/// path. Staging must never land inside the target being generated, so fall
/// back to a known absolute location instead.
fn staging_base() -> PathBuf {
    let base = std::env::temp_dir();
    if base.is_absolute() {
        return base;
    }

    #[cfg(windows)]
    {
        std::env::var("TEMP")
            .or_else(|_| std::env::var("TMP"))
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Windows\\Temp"))
    }
    #[cfg(not(windows))]
    {
        PathBuf::from("/tmp")
    }
}

/// A private working copy that becomes the target only on commit
#[derive(Debug)]
pub struct StagedDir {
    temp: TempDir,
}

impl StagedDir {
    /// Create an empty staging directory.
    pub fn stage() -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix("packsmith-staging-")
            .tempdir_in(staging_base())
            .map_err(|e| PacksmithError::IoError {
                message: format!("Failed to create staging directory: {e}"),
            })?;
        Ok(Self { temp })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Copy a pre-existing target file into staging, preserving its relative
    /// path, so patches operate on a staged copy instead of the live file.
    /// A file already staged (e.g. just rendered) is left alone.
    pub fn import(&self, target_dir: &Path, rel: &Path) -> Result<bool> {
        // Manifest validation already rejects these; refuse here too so a
        // crafted rel path can never read or stage anything outside the
        // target.
        let escapes = rel.is_absolute()
            || rel.components().any(|c| {
                matches!(
                    c,
                    Component::ParentDir | Component::RootDir | Component::Prefix(_)
                )
            });
        if escapes {
            return Err(PacksmithError::PatchApplicationFailed {
                path: rel.display().to_string(),
                reason: "path escapes the target directory".to_string(),
            });
        }

        let staged = self.temp.path().join(rel);
        if staged.exists() {
            return Ok(false);
        }

        let source = target_dir.join(rel);
        if !source.is_file() {
            return Ok(false);
        }

        if let Some(parent) = staged.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&source, &staged).map_err(|e| PacksmithError::FileReadFailed {
            path: source.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(true)
    }

    /// Move the fully-prepared staging tree into the target directory.
    ///
    /// Files are renamed individually (copy fallback across filesystems);
    /// this is the only operation that mutates the real target. Returns the
    /// committed file paths relative to the target.
    pub fn commit(self, target_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(target_dir)?;
        let mut committed = Vec::new();

        for entry in WalkDir::new(self.temp.path())
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let staged = entry.path();
            let rel = staged
                .strip_prefix(self.temp.path())
                .unwrap_or(staged)
                .to_path_buf();
            let dest = target_dir.join(&rel);

            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }

            if std::fs::rename(staged, &dest).is_err() {
                std::fs::copy(staged, &dest).map_err(|e| PacksmithError::FileWriteFailed {
                    path: dest.display().to_string(),
                    reason: e.to_string(),
                })?;
            }

            committed.push(rel);
        }

        // TempDir drop removes whatever the renames left behind
        Ok(committed)
    }

    /// Discard the staging directory without touching the target.
    pub fn rollback(self) {
        drop(self);
    }
}
