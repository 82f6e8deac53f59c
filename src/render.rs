//! Template rendering capability
//!
//! The orchestrator treats rendering as a black box behind the [`Renderer`]
//! trait so tests can substitute a fake. The default [`TemplateRenderer`]
//! walks a template root, substitutes `{{key}}` placeholders in `.tmpl`
//! files (stripping the extension), byte-copies everything else, and
//! rewrites `__key__` tokens in destination paths.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{PacksmithError, Result};
use crate::manifest::substitute;

/// Extension marking a file for placeholder substitution
const TEMPLATE_EXT: &str = "tmpl";

/// How one planned file is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Placeholder-substituted from a `.tmpl` source
    Rendered,
    /// Byte-for-byte copy
    Copied,
}

/// One file a render plan would produce
#[derive(Debug, Clone)]
pub struct RenderedFile {
    /// Source path relative to the template root
    pub src_rel: PathBuf,
    /// Destination path relative to the target directory
    pub dest_rel: PathBuf,
    pub mode: RenderMode,
}

/// A render invocation
pub struct RenderRequest<'a> {
    pub template_root: &'a Path,
    pub target_dir: &'a Path,
    pub data: &'a BTreeMap<String, String>,
    /// `__token__` replacements applied to destination paths
    pub rename_rules: &'a BTreeMap<String, String>,
    /// Plan without writing anything
    pub dry_run: bool,
}

/// Rendering capability consumed by the generation orchestrator
pub trait Renderer {
    fn render(&self, req: &RenderRequest<'_>) -> Result<Vec<RenderedFile>>;
}

/// Default renderer: `{{key}}` substitution plus path token rewriting
#[derive(Debug, Default)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    fn dest_rel(&self, src_rel: &Path, rename_rules: &BTreeMap<String, String>) -> PathBuf {
        let mut rel = src_rel.to_string_lossy().to_string();
        for (token, value) in rename_rules {
            rel = rel.replace(&format!("__{token}__"), value);
        }

        let mut dest = PathBuf::from(rel);
        if dest.extension().and_then(|e| e.to_str()) == Some(TEMPLATE_EXT) {
            dest.set_extension("");
        }
        dest
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, req: &RenderRequest<'_>) -> Result<Vec<RenderedFile>> {
        if !req.template_root.is_dir() {
            return Err(PacksmithError::TemplateDirNotFound {
                path: req.template_root.display().to_string(),
            });
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(req.template_root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let src = entry.path();
            let src_rel = src
                .strip_prefix(req.template_root)
                .unwrap_or(src)
                .to_path_buf();

            let is_template = src_rel.extension().and_then(|e| e.to_str()) == Some(TEMPLATE_EXT);
            let dest_rel = self.dest_rel(&src_rel, req.rename_rules);

            if !req.dry_run {
                let dest = req.target_dir.join(&dest_rel);
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }

                if is_template {
                    let raw =
                        std::fs::read_to_string(src).map_err(|e| PacksmithError::FileReadFailed {
                            path: src.display().to_string(),
                            reason: e.to_string(),
                        })?;
                    std::fs::write(&dest, substitute(&raw, req.data)).map_err(|e| {
                        PacksmithError::FileWriteFailed {
                            path: dest.display().to_string(),
                            reason: e.to_string(),
                        }
                    })?;
                } else {
                    std::fs::copy(src, &dest).map_err(|e| PacksmithError::FileWriteFailed {
                        path: dest.display().to_string(),
                        reason: e.to_string(),
                    })?;
                }
            }

            files.push(RenderedFile {
                src_rel,
                dest_rel,
                mode: if is_template {
                    RenderMode::Rendered
                } else {
                    RenderMode::Copied
                },
            });
        }

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request<'a>(
        template_root: &'a Path,
        target_dir: &'a Path,
        data: &'a BTreeMap<String, String>,
        rename_rules: &'a BTreeMap<String, String>,
        dry_run: bool,
    ) -> RenderRequest<'a> {
        RenderRequest {
            template_root,
            target_dir,
            data,
            rename_rules,
            dry_run,
        }
    }

    #[test]
    fn test_render_substitutes_templates_and_copies_rest() {
        let templates = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        std::fs::write(templates.path().join("hello.txt.tmpl"), "hi {{name}}").unwrap();
        std::fs::write(templates.path().join("static.md"), "# {{name}} untouched").unwrap();

        let mut data = BTreeMap::new();
        data.insert("name".to_string(), "svc".to_string());
        let rules = BTreeMap::new();

        let files = TemplateRenderer
            .render(&request(
                templates.path(),
                target.path(),
                &data,
                &rules,
                false,
            ))
            .unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(
            std::fs::read_to_string(target.path().join("hello.txt")).unwrap(),
            "hi svc"
        );
        // Non-template files are copied verbatim
        assert_eq!(
            std::fs::read_to_string(target.path().join("static.md")).unwrap(),
            "# {{name}} untouched"
        );
    }

    #[test]
    fn test_dry_run_plans_without_writing() {
        let templates = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        std::fs::write(templates.path().join("a.txt.tmpl"), "x").unwrap();

        let data = BTreeMap::new();
        let rules = BTreeMap::new();
        let files = TemplateRenderer
            .render(&request(
                templates.path(),
                target.path(),
                &data,
                &rules,
                true,
            ))
            .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].dest_rel, PathBuf::from("a.txt"));
        assert_eq!(files[0].mode, RenderMode::Rendered);
        assert!(std::fs::read_dir(target.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_rename_rules_rewrite_paths() {
        let templates = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        std::fs::create_dir_all(templates.path().join("src/__name__")).unwrap();
        std::fs::write(templates.path().join("src/__name__/mod.rs"), "// mod").unwrap();

        let data = BTreeMap::new();
        let mut rules = BTreeMap::new();
        rules.insert("name".to_string(), "billing".to_string());

        let files = TemplateRenderer
            .render(&request(
                templates.path(),
                target.path(),
                &data,
                &rules,
                false,
            ))
            .unwrap();

        assert_eq!(files[0].dest_rel, PathBuf::from("src/billing/mod.rs"));
        assert!(target.path().join("src/billing/mod.rs").exists());
    }

    #[test]
    fn test_missing_template_root() {
        let target = TempDir::new().unwrap();
        let data = BTreeMap::new();
        let rules = BTreeMap::new();
        let err = TemplateRenderer
            .render(&request(
                Path::new("/nonexistent/templates"),
                target.path(),
                &data,
                &rules,
                true,
            ))
            .unwrap_err();
        assert!(matches!(err, PacksmithError::TemplateDirNotFound { .. }));
    }
}
