//! Conflict detection between a render plan and the live target directory
//!
//! Runs strictly before any write: every planned path is classified as
//! CREATE (absent in the target) or MODIFY (already present). The default
//! policy aborts a generation on any MODIFY unless the caller forces it;
//! in dry-run the report becomes part of the preview instead.

use std::path::{Path, PathBuf};

use crate::render::RenderedFile;

/// Classification of one render plan against a target directory
#[derive(Debug, Clone, Default)]
pub struct ConflictReport {
    pub creates: Vec<PathBuf>,
    pub modifies: Vec<PathBuf>,
}

impl ConflictReport {
    pub fn has_conflicts(&self) -> bool {
        !self.modifies.is_empty()
    }

    /// Number of files that would be overwritten.
    pub fn count(&self) -> usize {
        self.modifies.len()
    }

    /// Conflicting paths joined for error payloads.
    pub fn modified_paths(&self) -> String {
        self.modifies
            .iter()
            .map(|p| format!("  {}", p.display()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Classify each planned file as CREATE or MODIFY. Read-only.
pub fn detect(planned: &[RenderedFile], target_dir: &Path) -> ConflictReport {
    let mut report = ConflictReport::default();

    for file in planned {
        if target_dir.join(&file.dest_rel).exists() {
            report.modifies.push(file.dest_rel.clone());
        } else {
            report.creates.push(file.dest_rel.clone());
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderMode;
    use tempfile::TempDir;

    fn planned(paths: &[&str]) -> Vec<RenderedFile> {
        paths
            .iter()
            .map(|p| RenderedFile {
                src_rel: PathBuf::from(p),
                dest_rel: PathBuf::from(p),
                mode: RenderMode::Copied,
            })
            .collect()
    }

    #[test]
    fn test_empty_target_is_all_creates() {
        let target = TempDir::new().unwrap();
        let report = detect(&planned(&["a.txt", "b/c.txt"]), target.path());

        assert!(!report.has_conflicts());
        assert_eq!(report.count(), 0);
        assert_eq!(report.creates.len(), 2);
    }

    #[test]
    fn test_existing_files_are_modifies() {
        let target = TempDir::new().unwrap();
        std::fs::write(target.path().join("a.txt"), "existing").unwrap();

        let report = detect(&planned(&["a.txt", "b.txt"]), target.path());

        assert!(report.has_conflicts());
        assert_eq!(report.count(), 1);
        assert_eq!(report.modifies, vec![PathBuf::from("a.txt")]);
        assert_eq!(report.creates, vec![PathBuf::from("b.txt")]);
    }

    #[test]
    fn test_every_path_classified_exactly_once() {
        let target = TempDir::new().unwrap();
        std::fs::create_dir_all(target.path().join("nested")).unwrap();
        std::fs::write(target.path().join("nested/x.rs"), "x").unwrap();

        let plan = planned(&["nested/x.rs", "nested/y.rs", "z.rs"]);
        let report = detect(&plan, target.path());

        assert_eq!(report.creates.len() + report.modifies.len(), plan.len());
        assert_eq!(report.count(), report.modifies.len());
    }

    #[test]
    fn test_detection_does_not_write() {
        let target = TempDir::new().unwrap();
        detect(&planned(&["new.txt"]), target.path());
        assert!(!target.path().join("new.txt").exists());
    }
}
