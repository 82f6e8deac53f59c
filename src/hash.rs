//! BLAKE3 hashing for content-addressed pack storage
//!
//! A stored pack is keyed by the hash of its canonical manifest bytes, so
//! identical pack content always maps to the same store directory. The hash
//! is plain lowercase hex because it doubles as a directory name.

use std::path::Path;

use blake3::Hasher;

use crate::error::{PacksmithError, Result};

/// Hash the canonical manifest bytes of a pack.
///
/// The bytes are hashed exactly as stored on disk; any change to the
/// manifest (including formatting) produces a new hash and therefore a new
/// store directory.
pub fn hash_manifest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize().to_hex().to_string()
}

/// Hash a manifest file on disk. Manifests are small, so the whole file is
/// read at once rather than streamed.
pub fn hash_manifest_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| PacksmithError::FileReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(hash_manifest_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hash_is_hex() {
        let hash = hash_manifest_bytes(b"pack:\n  name: demo\n");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_deterministic() {
        let a = hash_manifest_bytes(b"same content");
        let b = hash_manifest_bytes(b"same content");
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_changes_with_content() {
        let a = hash_manifest_bytes(b"version: 1.0.0");
        let b = hash_manifest_bytes(b"version: 1.0.1");
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_file_matches_bytes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pack.yaml");
        std::fs::write(&path, "pack:\n  name: demo\n").unwrap();

        let from_file = hash_manifest_file(&path).unwrap();
        let from_bytes = hash_manifest_bytes(b"pack:\n  name: demo\n");
        assert_eq!(from_file, from_bytes);
    }

    #[test]
    fn test_hash_file_not_found() {
        let result = hash_manifest_file(Path::new("/nonexistent/pack.yaml"));
        assert!(result.is_err());
    }
}
