//! Common test utilities for Packsmith integration tests

use std::path::PathBuf;
use tempfile::TempDir;

/// A test environment with an isolated pack store and a target directory
#[allow(dead_code)]
pub struct TestProject {
    /// Temporary directory holding everything
    #[allow(dead_code)]
    pub temp: TempDir,
    /// Pack store root, passed via --packs-root
    pub store: PathBuf,
    /// Generation target directory
    pub target: PathBuf,
}

#[allow(dead_code)]
impl TestProject {
    /// Create a new isolated test environment
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let store = temp.path().join("store");
        let target = temp.path().join("target");
        std::fs::create_dir_all(&target).expect("Failed to create target directory");
        Self {
            temp,
            store,
            target,
        }
    }

    /// Write a file under the target directory
    pub fn write_target_file(&self, path: &str, content: &str) {
        let file_path = self.target.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
    }

    /// Read a file from the target directory
    pub fn read_target_file(&self, path: &str) -> String {
        std::fs::read_to_string(self.target.join(path)).expect("Failed to read file")
    }

    /// Check if a file exists in the target directory
    pub fn target_file_exists(&self, path: &str) -> bool {
        self.target.join(path).exists()
    }

    /// Create a pack source directory with a manifest and a simple
    /// `default` archetype rendering `hello.txt` from `{{name}}`.
    pub fn create_pack(&self, name: &str, version: &str) -> PathBuf {
        self.create_pack_with_manifest(
            name,
            &format!(
                "pack:\n  name: \"{name}\"\n  version: {version}\narchetypes:\n  - id: default\n    templateRoot: templates/default\n"
            ),
        )
    }

    /// Create a pack source directory with an explicit manifest. Always
    /// writes the default archetype's template tree.
    pub fn create_pack_with_manifest(&self, name: &str, manifest: &str) -> PathBuf {
        let dir_name = name.replace(['@', '/'], "_");
        let pack_dir = self.temp.path().join("packs-src").join(dir_name);
        let templates = pack_dir.join("templates/default");
        std::fs::create_dir_all(&templates).expect("Failed to create pack directory");

        std::fs::write(pack_dir.join("pack.yaml"), manifest).expect("Failed to write manifest");
        std::fs::write(templates.join("hello.txt.tmpl"), "hello {{name}}\n")
            .expect("Failed to write template");
        std::fs::write(templates.join("logo.bin"), b"\x00binary\xff")
            .expect("Failed to write binary file");

        pack_dir
    }
}
