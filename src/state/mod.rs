//! Per-target generation history
//!
//! Each generated project carries a schema-versioned state file under a
//! hidden directory:
//!
//! ```text
//! <target>/.packsmith/state.json
//! ```
//!
//! Records are append-only and only written after a fully successful commit;
//! a failed generation never touches the file. `lastGeneration` mirrors the
//! final element of `generations` for backward-compatible readers. Older
//! schema versions are migrated on read through a linear chain (see
//! [`migrate`]).

pub mod migrate;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PacksmithError, Result};

/// Project-local hidden directory
pub const STATE_DIR: &str = ".packsmith";

/// State file name inside [`STATE_DIR`]
pub const STATE_FILE: &str = "state.json";

/// Current state schema version
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

/// Terminal status of a generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Success,
    Failed,
}

/// One completed generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub pack_id: String,
    pub pack_version: String,
    pub archetype_id: String,

    /// Data values the generation was invoked with
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,

    pub status: GenerationStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patches_summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hooks_summary: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checks_summary: Option<Vec<String>>,
}

/// Persisted per-target history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectState {
    pub schema_version: u32,

    #[serde(default)]
    pub generations: Vec<GenerationRecord>,

    /// Mirror of the final generation, kept for older readers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_generation: Option<GenerationRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for ProjectState {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            generations: Vec::new(),
            last_generation: None,
            updated_at: None,
        }
    }
}

/// Path of the state file for a target directory.
pub fn state_path(target_dir: &Path) -> PathBuf {
    target_dir.join(STATE_DIR).join(STATE_FILE)
}

/// Read the project state, migrating older schema versions in memory.
///
/// Returns `None` when the target has no state file. A schema version newer
/// than [`CURRENT_SCHEMA_VERSION`] is a fatal error: this manager refuses to
/// guess forward compatibility.
pub fn read(target_dir: &Path) -> Result<Option<ProjectState>> {
    let path = state_path(target_dir);
    if !path.is_file() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(&path).map_err(|e| PacksmithError::FileReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| PacksmithError::StateInvalidJson {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let migrated = migrate::run(value)?;

    let state: ProjectState =
        serde_json::from_value(migrated).map_err(|e| PacksmithError::StateInvalidJson {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    Ok(Some(state))
}

/// Append a generation record, creating the state file on first use.
///
/// The stored file is re-read and migrated first, so appending to a legacy
/// file upgrades it to the current schema in the same write.
pub fn append_generation(target_dir: &Path, record: GenerationRecord) -> Result<()> {
    let mut state = read(target_dir)?.unwrap_or_default();

    state.schema_version = CURRENT_SCHEMA_VERSION;
    state.last_generation = Some(record.clone());
    state.updated_at = Some(record.timestamp);
    state.generations.push(record);

    write(target_dir, &state)
}

/// Build a record id unique within one target's history.
pub fn next_record_id(existing: usize) -> String {
    format!("gen-{}-{}", Utc::now().timestamp_millis(), existing + 1)
}

fn write(target_dir: &Path, state: &ProjectState) -> Result<()> {
    let path = state_path(target_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json =
        serde_json::to_string_pretty(state).map_err(|e| PacksmithError::FileWriteFailed {
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str) -> GenerationRecord {
        GenerationRecord {
            id: id.to_string(),
            timestamp: Utc::now(),
            pack_id: "@demo/web".to_string(),
            pack_version: "1.0.0".to_string(),
            archetype_id: "default".to_string(),
            inputs: BTreeMap::new(),
            status: GenerationStatus::Success,
            patches_summary: None,
            hooks_summary: None,
            checks_summary: None,
        }
    }

    #[test]
    fn test_read_missing_state_is_none() {
        let temp = TempDir::new().unwrap();
        assert!(read(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_append_creates_and_mirrors_last() {
        let temp = TempDir::new().unwrap();
        append_generation(temp.path(), record("gen-1")).unwrap();
        append_generation(temp.path(), record("gen-2")).unwrap();

        let state = read(temp.path()).unwrap().unwrap();
        assert_eq!(state.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(state.generations.len(), 2);
        assert_eq!(state.last_generation.unwrap().id, "gen-2");
        assert!(state.updated_at.is_some());
    }

    #[test]
    fn test_read_invalid_json() {
        let temp = TempDir::new().unwrap();
        let path = state_path(temp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{broken").unwrap();

        let err = read(temp.path()).unwrap_err();
        assert!(matches!(err, PacksmithError::StateInvalidJson { .. }));
    }

    #[test]
    fn test_read_future_schema_version_is_fatal() {
        let temp = TempDir::new().unwrap();
        let path = state_path(temp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"schemaVersion": 99, "generations": []}"#).unwrap();

        let err = read(temp.path()).unwrap_err();
        assert!(matches!(
            err,
            PacksmithError::StateVersionUnsupported { found: 99, .. }
        ));
    }

    #[test]
    fn test_append_upgrades_legacy_file() {
        let temp = TempDir::new().unwrap();
        let path = state_path(temp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        // Legacy unversioned file, schema version 1 by convention
        std::fs::write(&path, r#"{"generations": []}"#).unwrap();

        append_generation(temp.path(), record("gen-1")).unwrap();

        let state = read(temp.path()).unwrap().unwrap();
        assert_eq!(state.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(state.generations.len(), 1);
    }

    #[test]
    fn test_next_record_id_embeds_sequence() {
        let id = next_record_id(2);
        assert!(id.starts_with("gen-"));
        assert!(id.ends_with("-3"));
    }
}
