//! Pack registry (registry.json) persistence
//!
//! The registry lives at the root of the pack store and records every
//! installed pack with its full version history. Entries are append-only:
//! installing a hash that is already present is a no-op at the store layer
//! and never reaches the registry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PacksmithError, Result};
use crate::resolver::Version;

/// Registry file name at the pack store root
pub const REGISTRY_FILE: &str = "registry.json";

/// Current registry schema version
pub const REGISTRY_SCHEMA_VERSION: u32 = 1;

/// Registry structure (registry.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    /// Schema version for forward migrations
    pub schema_version: u32,

    /// Installed packs keyed by original (unsanitized) pack id
    #[serde(default)]
    pub packs: BTreeMap<String, PackRegistryEntry>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            schema_version: REGISTRY_SCHEMA_VERSION,
            packs: BTreeMap::new(),
        }
    }
}

/// One installed pack with its version history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackRegistryEntry {
    /// Original pack id (may contain path separators)
    pub id: String,

    /// Highest parsed version across installs
    pub current_version: String,

    /// Hash of the install holding the current version
    pub current_hash: String,

    /// Origin of the most recent install
    pub origin: String,

    /// Every install of a new content hash, in install order
    pub installs: Vec<InstallRecord>,

    /// When the entry was first created
    pub installed_at: DateTime<Utc>,
}

/// One content-addressed install of a pack
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallRecord {
    pub version: String,
    pub hash: String,
    pub origin: String,
    pub installed_at: DateTime<Utc>,
}

impl Registry {
    /// Path of the registry file under a pack store root.
    pub fn path(packs_root: &Path) -> PathBuf {
        packs_root.join(REGISTRY_FILE)
    }

    /// Load the registry, returning an empty one when the file is absent.
    pub fn load(packs_root: &Path) -> Result<Self> {
        let path = Self::path(packs_root);
        if !path.is_file() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path).map_err(|e| PacksmithError::FileReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| PacksmithError::RegistryInvalidJson {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let registry: Registry = serde_json::from_value(value).map_err(|e| {
            PacksmithError::RegistryInvalidSchema {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        if registry.schema_version > REGISTRY_SCHEMA_VERSION {
            return Err(PacksmithError::RegistryInvalidSchema {
                path: path.display().to_string(),
                reason: format!(
                    "schema version {} is newer than supported version {}",
                    registry.schema_version, REGISTRY_SCHEMA_VERSION
                ),
            });
        }

        Ok(registry)
    }

    /// Persist the registry via a temp file and atomic rename.
    pub fn save(&self, packs_root: &Path) -> Result<()> {
        let path = Self::path(packs_root);
        let json =
            serde_json::to_string_pretty(self).map_err(|e| PacksmithError::FileWriteFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| PacksmithError::FileWriteFailed {
            path: tmp.display().to_string(),
            reason: e.to_string(),
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| PacksmithError::FileWriteFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(())
    }

    /// Record an install of a new content hash.
    ///
    /// Creates the entry on first install, appends afterwards, and refreshes
    /// `current_version`/`current_hash` to mirror the highest parsed version
    /// in the install history.
    pub fn record_install(&mut self, id: &str, version: &str, hash: &str, origin: &str) {
        let now = Utc::now();
        let record = InstallRecord {
            version: version.to_string(),
            hash: hash.to_string(),
            origin: origin.to_string(),
            installed_at: now,
        };

        let entry = self
            .packs
            .entry(id.to_string())
            .or_insert_with(|| PackRegistryEntry {
                id: id.to_string(),
                current_version: version.to_string(),
                current_hash: hash.to_string(),
                origin: origin.to_string(),
                installs: Vec::new(),
                installed_at: now,
            });

        entry.installs.push(record);
        entry.origin = origin.to_string();

        if let Some(best) = entry
            .installs
            .iter()
            .max_by_key(|i| Version::parse_lossy(&i.version))
        {
            entry.current_version = best.version.clone();
            entry.current_hash = best.hash.clone();
        }
    }

    /// Whether a given content hash of a pack is already recorded.
    pub fn has_install(&self, id: &str, hash: &str) -> bool {
        self.packs
            .get(id)
            .is_some_and(|entry| entry.installs.iter().any(|i| i.hash == hash))
    }
}
