//! Linear migration chain for project state files
//!
//! Each step is a pure function upgrading exactly one schema version. A file
//! with no `schemaVersion` field is treated as version 1. Running the chain
//! on an already-current document is a no-op, so re-reads are idempotent.
//!
//! History:
//! - v1: `{ generations: [...] }`, unversioned in the earliest releases
//! - v2: adds `lastGeneration`, a mirror of the final generation
//! - v3: adds `updatedAt`, copied from the last generation's timestamp

use serde_json::{Value, json};

use crate::error::{PacksmithError, Result};

use super::CURRENT_SCHEMA_VERSION;

/// Migrate a raw state document to the current schema version.
pub fn run(mut value: Value) -> Result<Value> {
    let mut version = value
        .get("schemaVersion")
        .and_then(Value::as_u64)
        .map_or(1, |v| v as u32);

    if version > CURRENT_SCHEMA_VERSION {
        return Err(PacksmithError::StateVersionUnsupported {
            found: version,
            current: CURRENT_SCHEMA_VERSION,
        });
    }

    while version < CURRENT_SCHEMA_VERSION {
        value = match version {
            1 => v1_to_v2(value),
            2 => v2_to_v3(value),
            // The loop bound keeps this unreachable; kept explicit so a new
            // version without a migration step fails loudly
            other => {
                return Err(PacksmithError::StateVersionUnsupported {
                    found: other,
                    current: CURRENT_SCHEMA_VERSION,
                });
            }
        };
        version += 1;
    }

    Ok(value)
}

/// v1 → v2: mirror the final generation into `lastGeneration`.
fn v1_to_v2(mut value: Value) -> Value {
    let last = value
        .get("generations")
        .and_then(Value::as_array)
        .and_then(|g| g.last())
        .cloned();

    if let Some(obj) = value.as_object_mut() {
        obj.insert("schemaVersion".to_string(), json!(2));
        if let Some(last) = last {
            obj.insert("lastGeneration".to_string(), last);
        }
    }
    value
}

/// v2 → v3: stamp `updatedAt` from the last generation's timestamp.
fn v2_to_v3(mut value: Value) -> Value {
    let updated_at = value
        .get("lastGeneration")
        .and_then(|g| g.get("timestamp"))
        .cloned();

    if let Some(obj) = value.as_object_mut() {
        obj.insert("schemaVersion".to_string(), json!(3));
        if let Some(ts) = updated_at {
            obj.insert("updatedAt".to_string(), ts);
        }
    }
    value
}
