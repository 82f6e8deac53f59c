//! Content-addressed pack store
//!
//! Installed packs live under the store root, keyed by sanitized pack id and
//! the BLAKE3 hash of their canonical manifest bytes:
//!
//! ```text
//! <packs_root>/
//! ├── registry.json
//! └── <sanitized-id>/
//!     └── <manifest-hash>/
//!         └── <pack-contents>
//! ```
//!
//! Stored pack content is never mutated after creation: any content change
//! produces a new hash and a new directory. Installation copies into a
//! private staging directory first and renames it into place, so a partial
//! install is never visible; the registry is only updated after the rename
//! succeeds.

pub mod registry;

use std::path::{Path, PathBuf};

use crate::common::fs::{CopyOptions, copy_dir_recursive};
use crate::error::{PacksmithError, Result};
use crate::hash::hash_manifest_file;
use crate::manifest::{MANIFEST_FILE, Manifest};
use registry::Registry;

/// Environment variable overriding the pack store location
pub const HOME_ENV: &str = "PACKSMITH_HOME";

/// Result status of an install
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    /// A new content hash was copied into the store
    Installed,
    /// This exact content was already present; nothing was written
    AlreadyInstalled,
}

/// Outcome of [`PackStore::install`]
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub pack_id: String,
    pub version: String,
    pub hash: String,
    pub dest_dir: PathBuf,
    pub status: InstallStatus,
}

/// The on-disk pack store
#[derive(Debug, Clone)]
pub struct PackStore {
    packs_root: PathBuf,
}

impl PackStore {
    /// Open a store at an explicit root. The root need not exist yet;
    /// install creates it on first use.
    pub fn open(packs_root: impl Into<PathBuf>) -> Self {
        Self {
            packs_root: packs_root.into(),
        }
    }

    /// Default store root: `PACKSMITH_HOME` verbatim, else under the user
    /// data directory.
    pub fn default_root() -> Result<PathBuf> {
        if let Ok(home) = std::env::var(HOME_ENV) {
            return Ok(PathBuf::from(home));
        }

        let base = dirs::data_dir().ok_or_else(|| PacksmithError::IoError {
            message: "Could not determine user data directory".to_string(),
        })?;

        Ok(base.join("packsmith").join("packs"))
    }

    pub fn packs_root(&self) -> &Path {
        &self.packs_root
    }

    /// Flatten a pack id into a single path component.
    ///
    /// Path separators and other characters that are unsafe or ambiguous in
    /// a directory name become `__`; the original id is preserved in the
    /// registry entry.
    pub fn sanitize_id(id: &str) -> String {
        id.chars()
            .map(|c| match c {
                '/' | '\\' | ':' => "__".to_string(),
                c if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@') => {
                    c.to_string()
                }
                _ => "_".to_string(),
            })
            .collect()
    }

    /// Directory of a stored pack instance.
    pub fn pack_dir(&self, id: &str, hash: &str) -> PathBuf {
        self.packs_root.join(Self::sanitize_id(id)).join(hash)
    }

    /// Load the registry for this store.
    pub fn registry(&self) -> Result<Registry> {
        Registry::load(&self.packs_root)
    }

    /// Install a pack from a local directory.
    ///
    /// Idempotent by construction: the destination is derived from the
    /// manifest hash, and an existing destination short-circuits without
    /// copying or touching the registry.
    pub fn install(&self, source_dir: &Path) -> Result<InstallOutcome> {
        let manifest = Manifest::load(source_dir)?;
        let hash = hash_manifest_file(&source_dir.join(MANIFEST_FILE))?;

        let pack_id = manifest.pack.name.clone();
        let version = manifest.pack.version.clone();
        let dest_dir = self.pack_dir(&pack_id, &hash);

        if dest_dir.exists() {
            // Heal a registry missing this install (crash between the
            // rename and the registry save)
            let mut registry = Registry::load(&self.packs_root)?;
            if !registry.has_install(&pack_id, &hash) {
                registry.record_install(
                    &pack_id,
                    &version,
                    &hash,
                    &format!("local:{}", source_dir.display()),
                );
                registry.save(&self.packs_root)?;
            }

            return Ok(InstallOutcome {
                pack_id,
                version,
                hash,
                dest_dir,
                status: InstallStatus::AlreadyInstalled,
            });
        }

        std::fs::create_dir_all(&self.packs_root)?;

        // Stage under the store root so the final rename stays on one filesystem
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.packs_root)
            .map_err(|e| PacksmithError::IoError {
                message: format!("Failed to create staging directory: {e}"),
            })?;

        copy_dir_recursive(source_dir, staging.path(), CopyOptions::exclude_noise()).map_err(
            |e| PacksmithError::FileWriteFailed {
                path: staging.path().display().to_string(),
                reason: e.to_string(),
            },
        )?;

        if let Some(parent) = dest_dir.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match std::fs::rename(staging.path(), &dest_dir) {
            Ok(()) => {}
            // Lost a race with a concurrent install of the same content;
            // the winner's copy is byte-identical, so this is a no-op
            Err(_) if dest_dir.exists() => {
                return Ok(InstallOutcome {
                    pack_id,
                    version,
                    hash,
                    dest_dir,
                    status: InstallStatus::AlreadyInstalled,
                });
            }
            Err(e) => {
                return Err(PacksmithError::FileWriteFailed {
                    path: dest_dir.display().to_string(),
                    reason: e.to_string(),
                });
            }
        }

        let mut registry = Registry::load(&self.packs_root)?;
        registry.record_install(
            &pack_id,
            &version,
            &hash,
            &format!("local:{}", source_dir.display()),
        );
        registry.save(&self.packs_root)?;

        Ok(InstallOutcome {
            pack_id,
            version,
            hash,
            dest_dir,
            status: InstallStatus::Installed,
        })
    }

    /// Load and validate the manifest of a stored pack instance.
    pub fn load_manifest(&self, id: &str, hash: &str) -> Result<Manifest> {
        if !self.packs_root.is_dir() {
            return Err(PacksmithError::PackStoreMissing {
                path: self.packs_root.display().to_string(),
            });
        }

        let dir = self.pack_dir(id, hash);
        if !dir.is_dir() {
            return Err(PacksmithError::PackNotFound { id: id.to_string() });
        }

        Manifest::load(&dir)
    }
}
