//! Generation orchestrator
//!
//! The staging/commit state machine, strictly sequential:
//!
//! ```text
//! ResolvePack → LoadManifest → CheckCompatibility → ComputeRenderPlan
//!   → DetectConflicts → [dry-run: Preview, stop]
//!   → StageRender → StagePatches → RunPostGenerateCommands
//!   → RunCheckCommands → CommitStaging → PersistState
//! ```
//!
//! Every arrow is a hard barrier: failure anywhere aborts the generation,
//! leaves the real target byte-for-byte as it was, and drops the staging
//! directory. `CommitStaging` is the only step that mutates the target;
//! `PersistState` runs only after a fully successful commit, so a failed
//! generation never appends a history record.

pub mod context;
pub mod staging;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;

use crate::conflict::{self, ConflictReport};
use crate::error::{PacksmithError, Result};
use crate::hooks::{CommandRunner, HookKind, run_sequence};
use crate::manifest::{Archetype, Manifest};
use crate::patch::{PatchBatchReport, PatchEngine, PatchOperation};
use crate::render::{RenderRequest, RenderedFile, Renderer};
use crate::resolver::{self, ResolvedPack, Version};
use crate::state::{self, GenerationRecord, GenerationStatus};
use crate::store::PackStore;
use context::{GenerationContext, Phase, PhaseTiming};
use staging::StagedDir;

/// Advisory lock file name under the target's hidden state directory
const LOCK_FILE: &str = "generate.lock";

/// One generation invocation
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub pack_id: String,
    pub version: Option<String>,
    pub archetype_id: String,
    pub data: BTreeMap<String, String>,
    pub target_dir: PathBuf,
    pub force: bool,
    pub dry_run: bool,
    pub hook_timeout: Option<Duration>,
}

/// Dry-run output: the plan that would execute, conflicts included
#[derive(Debug)]
pub struct Preview {
    pub resolved: ResolvedPack,
    pub files: Vec<RenderedFile>,
    pub conflicts: ConflictReport,
    pub patches: Vec<String>,
    pub post_generate: Vec<String>,
    pub checks: Vec<String>,
}

/// Result of a committed generation
#[derive(Debug)]
pub struct GenerateSummary {
    pub resolved: ResolvedPack,
    pub files: Vec<RenderedFile>,
    pub conflicts: ConflictReport,
    pub patch_report: PatchBatchReport,
    pub hooks_summary: Vec<String>,
    pub checks_summary: Vec<String>,
    pub record_id: String,
    pub timings: Vec<PhaseTiming>,
}

/// Outcome of [`Generator::generate`]
#[derive(Debug)]
pub enum GenerateOutcome {
    Preview(Preview),
    Committed(GenerateSummary),
}

/// The orchestrator, parameterized over its collaborators
pub struct Generator<'a> {
    store: &'a PackStore,
    renderer: &'a dyn Renderer,
    runner: &'a dyn CommandRunner,
}

impl<'a> Generator<'a> {
    pub fn new(
        store: &'a PackStore,
        renderer: &'a dyn Renderer,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            store,
            renderer,
            runner,
        }
    }

    /// Run the state machine for one request.
    pub fn generate(&self, req: &GenerateRequest) -> Result<GenerateOutcome> {
        let mut ctx = GenerationContext::new();

        let registry = self.store.registry()?;
        let resolved = ctx.time(Phase::ResolvePack, || {
            resolver::resolve(&registry, &req.pack_id, req.version.as_deref())
        })?;

        let manifest = ctx.time(Phase::LoadManifest, || {
            self.store.load_manifest(&resolved.pack_id, &resolved.hash)
        })?;

        ctx.time(Phase::CheckCompatibility, || {
            check_compatibility(&manifest)
        })?;

        let archetype = manifest.archetype(&req.archetype_id)?.clone();
        let pack_dir = self.store.pack_dir(&resolved.pack_id, &resolved.hash);
        let template_root = pack_dir.join(&archetype.template_root);
        if !template_root.is_dir() {
            return Err(PacksmithError::TemplateDirNotFound {
                path: template_root.display().to_string(),
            });
        }

        let plan = ctx.time(Phase::ComputeRenderPlan, || {
            self.renderer.render(&RenderRequest {
                template_root: &template_root,
                target_dir: &req.target_dir,
                data: &req.data,
                rename_rules: &req.data,
                dry_run: true,
            })
        })?;

        let conflicts = ctx.time(Phase::DetectConflicts, || {
            Ok(conflict::detect(&plan, &req.target_dir))
        })?;

        if req.dry_run {
            // Conflicts are part of the preview, never an error here
            return Ok(GenerateOutcome::Preview(Preview {
                resolved,
                files: plan,
                conflicts,
                patches: archetype
                    .patches
                    .iter()
                    .map(|p| format!("{:?} {} ({})", p.kind, p.file, p.idempotency_key))
                    .collect(),
                post_generate: archetype.post_generate.clone(),
                checks: archetype.checks.clone(),
            }));
        }

        if conflicts.has_conflicts() && !req.force {
            return Err(PacksmithError::GenerateConflict {
                count: conflicts.count(),
                paths: conflicts.modified_paths(),
            });
        }

        let _lock = LockGuard::acquire(&req.target_dir)?;

        let staging = StagedDir::stage()?;

        ctx.time(Phase::StageRender, || {
            self.renderer
                .render(&RenderRequest {
                    template_root: &template_root,
                    target_dir: staging.path(),
                    data: &req.data,
                    rename_rules: &req.data,
                    dry_run: false,
                })
                .map(|_| ())
        })?;

        let patch_report = ctx.time(Phase::StagePatches, || {
            self.stage_patches(&archetype, &pack_dir, &staging, req)
        })?;

        let hooks_summary = ctx.time(Phase::RunPostGenerateCommands, || {
            run_sequence(
                self.runner,
                &archetype.post_generate,
                staging.path(),
                HookKind::PostGenerate,
            )
        })?;

        let checks_summary = ctx.time(Phase::RunCheckCommands, || {
            run_sequence(self.runner, &archetype.checks, staging.path(), HookKind::Check)
        })?;

        ctx.time(Phase::CommitStaging, || {
            staging.commit(&req.target_dir).map(|_| ())
        })?;

        let record_id = ctx.time(Phase::PersistState, || {
            self.persist_state(req, &resolved, &patch_report, &hooks_summary, &checks_summary)
        })?;

        Ok(GenerateOutcome::Committed(GenerateSummary {
            resolved,
            files: plan,
            conflicts,
            patch_report,
            hooks_summary,
            checks_summary,
            record_id,
            timings: ctx.into_timings(),
        }))
    }

    /// Apply the archetype's patches against staged copies of their targets.
    fn stage_patches(
        &self,
        archetype: &Archetype,
        pack_dir: &Path,
        staging: &StagedDir,
        req: &GenerateRequest,
    ) -> Result<PatchBatchReport> {
        // Pre-existing target files are patched on copies inside staging
        for spec in &archetype.patches {
            staging.import(&req.target_dir, Path::new(&spec.file))?;
        }

        let ops: Vec<PatchOperation> = archetype
            .patches
            .iter()
            .map(|spec| PatchOperation::from_spec(spec, pack_dir, staging.path(), &req.data))
            .collect::<Result<_>>()?;

        let report = PatchEngine.apply_all(&ops);
        if report.failed() > 0 {
            return Err(report.into_error().unwrap_or_else(|| {
                PacksmithError::PatchApplicationFailed {
                    path: String::new(),
                    reason: "patch batch failed".to_string(),
                }
            }));
        }

        Ok(report)
    }

    fn persist_state(
        &self,
        req: &GenerateRequest,
        resolved: &ResolvedPack,
        patch_report: &PatchBatchReport,
        hooks_summary: &[String],
        checks_summary: &[String],
    ) -> Result<String> {
        let existing = state::read(&req.target_dir)?
            .map(|s| s.generations.len())
            .unwrap_or(0);
        let id = state::next_record_id(existing);

        let record = GenerationRecord {
            id: id.clone(),
            timestamp: Utc::now(),
            pack_id: resolved.pack_id.clone(),
            pack_version: resolved.version.clone(),
            archetype_id: req.archetype_id.clone(),
            inputs: req.data.clone(),
            status: GenerationStatus::Success,
            patches_summary: (!patch_report.results.is_empty())
                .then(|| patch_report.summary()),
            hooks_summary: (!hooks_summary.is_empty()).then(|| hooks_summary.to_vec()),
            checks_summary: (!checks_summary.is_empty()).then(|| checks_summary.to_vec()),
        };

        state::append_generation(&req.target_dir, record)?;
        Ok(id)
    }
}

fn check_compatibility(manifest: &Manifest) -> Result<()> {
    let Some(min) = manifest
        .compatibility
        .as_ref()
        .and_then(|c| c.min_tool_version.as_deref())
    else {
        return Ok(());
    };

    let current = env!("CARGO_PKG_VERSION");
    if Version::parse_lossy(current) < Version::parse_lossy(min) {
        return Err(PacksmithError::PackIncompatible {
            pack: manifest.pack.name.clone(),
            required: min.to_string(),
            current: current.to_string(),
        });
    }
    Ok(())
}

/// Advisory lock against concurrent generations into one target.
///
/// Held for the write phases only; released (and the lock file removed) on
/// drop, success or failure. A pre-existing lock fails fast instead of
/// risking interleaved staging commits.
struct LockGuard {
    lock_path: PathBuf,
    created_state_dir: bool,
}

impl LockGuard {
    fn acquire(target_dir: &Path) -> Result<Self> {
        let state_dir = target_dir.join(state::STATE_DIR);
        let created_state_dir = !state_dir.exists();
        std::fs::create_dir_all(&state_dir)?;

        let lock_path = state_dir.join(LOCK_FILE);
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(_) => Ok(Self {
                lock_path,
                created_state_dir,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(PacksmithError::GenerationInProgress {
                    lock_path: lock_path.display().to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.lock_path);
        if self.created_state_dir {
            // Only succeeds when no state file was written (failed run on a
            // fresh target), restoring the target byte-for-byte
            if let Some(dir) = self.lock_path.parent() {
                let _ = std::fs::remove_dir(dir);
            }
        }
    }
}
