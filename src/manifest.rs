//! Pack manifest (pack.yaml) data structures
//!
//! The manifest is consumed, not owned: packsmith validates the shape it
//! depends on (patch kinds, marker rules, content sources) and treats the
//! rest as opaque pack-author territory.

use std::collections::BTreeMap;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::error::{PacksmithError, Result};

/// Manifest file name at the root of every pack
pub const MANIFEST_FILE: &str = "pack.yaml";

/// Top-level pack manifest (pack.yaml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Pack identity
    pub pack: PackMeta,

    /// Named template configurations
    #[serde(default)]
    pub archetypes: Vec<Archetype>,

    /// Tool compatibility constraints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<Compatibility>,
}

/// Pack identity block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackMeta {
    /// Pack identifier (may contain path separators, e.g. "@scope/name")
    pub name: String,

    /// Pack version string
    pub version: String,

    /// Human description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Tool compatibility constraints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compatibility {
    /// Minimum packsmith version this pack requires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_tool_version: Option<String>,
}

/// One named template configuration within a pack
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Archetype {
    /// Archetype identifier
    pub id: String,

    /// Template directory, relative to the pack root
    pub template_root: String,

    /// Patch operations applied to pre-existing target files
    #[serde(default)]
    pub patches: Vec<PatchSpec>,

    /// Shell commands run after rendering and patching, in declared order
    #[serde(default, rename = "postGenerate")]
    pub post_generate: Vec<String>,

    /// Shell commands that verify the staged result, in declared order
    #[serde(default)]
    pub checks: Vec<String>,
}

/// Patch kinds supported by the patch engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchKind {
    MarkerInsert,
    MarkerReplace,
    AppendIfMissing,
}

/// One patch declaration in a manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchSpec {
    /// Patch kind
    pub kind: PatchKind,

    /// Target file, relative to the generation target directory
    pub file: String,

    /// Key embedded in the idempotency stamp
    pub idempotency_key: String,

    /// Start marker (marker-based kinds only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_start: Option<String>,

    /// End marker (marker-based kinds only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_end: Option<String>,

    /// Inline patch content with {{key}} substitution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_template: Option<String>,

    /// Patch content read from a file relative to the pack root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Human description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Strict patches fail the generation on missing markers or files;
    /// non-strict patches skip instead. Defaults to strict.
    #[serde(default = "default_strict")]
    pub strict: bool,
}

fn default_strict() -> bool {
    true
}

impl Manifest {
    /// Load and validate the manifest of a pack directory.
    pub fn load(pack_dir: &Path) -> Result<Self> {
        let path = pack_dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(PacksmithError::ManifestNotFound {
                path: path.display().to_string(),
            });
        }

        let raw = std::fs::read_to_string(&path).map_err(|e| PacksmithError::FileReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let manifest: Manifest =
            serde_yaml::from_str(&raw).map_err(|e| PacksmithError::ManifestYamlError {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        manifest.validate(&path)?;
        Ok(manifest)
    }

    /// Validate the shape packsmith depends on.
    fn validate(&self, path: &Path) -> Result<()> {
        let schema_err = |reason: String| PacksmithError::ManifestSchemaError {
            path: path.display().to_string(),
            reason,
        };

        if self.pack.name.trim().is_empty() {
            return Err(schema_err("pack.name must not be empty".to_string()));
        }
        if self.pack.version.trim().is_empty() {
            return Err(schema_err("pack.version must not be empty".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for archetype in &self.archetypes {
            if !seen.insert(archetype.id.as_str()) {
                return Err(schema_err(format!(
                    "duplicate archetype id '{}'",
                    archetype.id
                )));
            }

            for patch in &archetype.patches {
                patch.validate().map_err(&schema_err)?;
            }
        }

        Ok(())
    }

    /// Find an archetype by id, with a helpful error listing what exists.
    pub fn archetype(&self, id: &str) -> Result<&Archetype> {
        self.archetypes
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| PacksmithError::ArchetypeNotFound {
                pack: self.pack.name.clone(),
                archetype: id.to_string(),
                available: self
                    .archetypes
                    .iter()
                    .map(|a| a.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

impl PatchSpec {
    /// Per-patch invariants: marker kinds carry both markers,
    /// append_if_missing carries neither, and exactly one content source
    /// is present.
    fn validate(&self) -> std::result::Result<(), String> {
        let ctx = format!("patch '{}' on {}", self.idempotency_key, self.file);

        match self.kind {
            PatchKind::MarkerInsert | PatchKind::MarkerReplace => {
                if self.marker_start.is_none() || self.marker_end.is_none() {
                    return Err(format!("{ctx}: marker kinds require markerStart and markerEnd"));
                }
            }
            PatchKind::AppendIfMissing => {
                if self.marker_start.is_some() || self.marker_end.is_some() {
                    return Err(format!("{ctx}: append_if_missing must omit markers"));
                }
            }
        }

        if path_escapes(&self.file) {
            return Err(format!(
                "{ctx}: file must be a relative path inside the target directory"
            ));
        }
        if let Some(content_path) = &self.path {
            if path_escapes(content_path) {
                return Err(format!(
                    "{ctx}: path must be a relative path inside the pack directory"
                ));
            }
        }

        match (&self.content_template, &self.path) {
            (Some(_), Some(_)) => Err(format!(
                "{ctx}: contentTemplate and path are mutually exclusive"
            )),
            (None, None) => Err(format!("{ctx}: one of contentTemplate or path is required")),
            _ => Ok(()),
        }
    }
}

/// A patch path is always resolved by joining onto a base directory, so
/// absolute paths and `..` components would let a pack name files outside it.
fn path_escapes(raw: &str) -> bool {
    let p = Path::new(raw);
    p.is_absolute()
        || p.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        })
}

/// Substitute `{{key}}` placeholders from a data map.
///
/// Shared between the default renderer and inline patch content. Unknown
/// placeholders are left untouched so pack authors can spot them in output.
pub fn substitute(template: &str, data: &BTreeMap<String, String>) -> String {
    let mut out = template.to_string();
    for (key, value) in data {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(dir: &Path, content: &str) {
        std::fs::write(dir.join(MANIFEST_FILE), content).unwrap();
    }

    #[test]
    fn test_load_minimal_manifest() {
        let temp = TempDir::new().unwrap();
        write_manifest(
            temp.path(),
            "pack:\n  name: demo\n  version: 1.0.0\narchetypes:\n  - id: default\n    templateRoot: templates/default\n",
        );

        let manifest = Manifest::load(temp.path()).unwrap();
        assert_eq!(manifest.pack.name, "demo");
        assert_eq!(manifest.archetypes.len(), 1);
        assert_eq!(manifest.archetypes[0].template_root, "templates/default");
    }

    #[test]
    fn test_load_missing_manifest() {
        let temp = TempDir::new().unwrap();
        let err = Manifest::load(temp.path()).unwrap_err();
        assert!(matches!(err, PacksmithError::ManifestNotFound { .. }));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), "pack: [unclosed");
        let err = Manifest::load(temp.path()).unwrap_err();
        assert!(matches!(err, PacksmithError::ManifestYamlError { .. }));
    }

    #[test]
    fn test_append_if_missing_rejects_markers() {
        let temp = TempDir::new().unwrap();
        write_manifest(
            temp.path(),
            "pack:\n  name: demo\n  version: 1.0.0\narchetypes:\n  - id: default\n    templateRoot: t\n    patches:\n      - kind: append_if_missing\n        file: README.md\n        idempotencyKey: k1\n        markerStart: '<s>'\n        markerEnd: '<e>'\n        contentTemplate: hello\n",
        );
        let err = Manifest::load(temp.path()).unwrap_err();
        assert!(matches!(err, PacksmithError::ManifestSchemaError { .. }));
        assert!(err.to_string().contains("append_if_missing"));
    }

    #[test]
    fn test_marker_kind_requires_both_markers() {
        let temp = TempDir::new().unwrap();
        write_manifest(
            temp.path(),
            "pack:\n  name: demo\n  version: 1.0.0\narchetypes:\n  - id: default\n    templateRoot: t\n    patches:\n      - kind: marker_insert\n        file: main.rs\n        idempotencyKey: k1\n        markerStart: '<s>'\n        contentTemplate: hello\n",
        );
        let err = Manifest::load(temp.path()).unwrap_err();
        assert!(matches!(err, PacksmithError::ManifestSchemaError { .. }));
    }

    #[test]
    fn test_exactly_one_content_source() {
        let temp = TempDir::new().unwrap();
        write_manifest(
            temp.path(),
            "pack:\n  name: demo\n  version: 1.0.0\narchetypes:\n  - id: default\n    templateRoot: t\n    patches:\n      - kind: append_if_missing\n        file: README.md\n        idempotencyKey: k1\n        contentTemplate: hello\n        path: snippets/readme.md\n",
        );
        let err = Manifest::load(temp.path()).unwrap_err();
        assert!(matches!(err, PacksmithError::ManifestSchemaError { .. }));
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_patch_file_rejects_absolute_path() {
        let temp = TempDir::new().unwrap();
        write_manifest(
            temp.path(),
            "pack:\n  name: demo\n  version: 1.0.0\narchetypes:\n  - id: default\n    templateRoot: t\n    patches:\n      - kind: append_if_missing\n        file: /etc/hosts\n        idempotencyKey: k1\n        contentTemplate: payload\n",
        );
        let err = Manifest::load(temp.path()).unwrap_err();
        assert!(matches!(err, PacksmithError::ManifestSchemaError { .. }));
        assert!(err.to_string().contains("relative path"));
    }

    #[test]
    fn test_patch_file_rejects_parent_traversal() {
        let temp = TempDir::new().unwrap();
        write_manifest(
            temp.path(),
            "pack:\n  name: demo\n  version: 1.0.0\narchetypes:\n  - id: default\n    templateRoot: t\n    patches:\n      - kind: append_if_missing\n        file: ../victim.txt\n        idempotencyKey: k1\n        contentTemplate: payload\n",
        );
        let err = Manifest::load(temp.path()).unwrap_err();
        assert!(matches!(err, PacksmithError::ManifestSchemaError { .. }));
    }

    #[test]
    fn test_patch_content_path_rejects_parent_traversal() {
        let temp = TempDir::new().unwrap();
        write_manifest(
            temp.path(),
            "pack:\n  name: demo\n  version: 1.0.0\narchetypes:\n  - id: default\n    templateRoot: t\n    patches:\n      - kind: append_if_missing\n        file: README.md\n        idempotencyKey: k1\n        path: ../../outside/snippet.md\n",
        );
        let err = Manifest::load(temp.path()).unwrap_err();
        assert!(matches!(err, PacksmithError::ManifestSchemaError { .. }));
        assert!(err.to_string().contains("pack directory"));
    }

    #[test]
    fn test_patch_file_accepts_nested_relative_path() {
        let temp = TempDir::new().unwrap();
        write_manifest(
            temp.path(),
            "pack:\n  name: demo\n  version: 1.0.0\narchetypes:\n  - id: default\n    templateRoot: t\n    patches:\n      - kind: append_if_missing\n        file: docs/notes/README.md\n        idempotencyKey: k1\n        contentTemplate: payload\n",
        );
        assert!(Manifest::load(temp.path()).is_ok());
    }

    #[test]
    fn test_archetype_lookup() {
        let temp = TempDir::new().unwrap();
        write_manifest(
            temp.path(),
            "pack:\n  name: demo\n  version: 1.0.0\narchetypes:\n  - id: lib\n    templateRoot: t/lib\n  - id: bin\n    templateRoot: t/bin\n",
        );
        let manifest = Manifest::load(temp.path()).unwrap();
        assert_eq!(manifest.archetype("bin").unwrap().template_root, "t/bin");

        let err = manifest.archetype("service").unwrap_err();
        match err {
            PacksmithError::ArchetypeNotFound { available, .. } => {
                assert_eq!(available, "lib, bin");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_substitute() {
        let mut data = BTreeMap::new();
        data.insert("name".to_string(), "svc".to_string());
        assert_eq!(substitute("hello {{name}}", &data), "hello svc");
        assert_eq!(substitute("no placeholders", &data), "no placeholders");
        assert_eq!(substitute("{{unknown}}", &data), "{{unknown}}");
    }
}
