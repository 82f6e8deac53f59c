//! Idempotent, marker-delimited patching of already-materialized files
//!
//! Every applied patch leaves a single-line idempotency stamp embedding its
//! key; the mere textual presence of that stamp is the sole signal that the
//! patch already ran, so re-applying is always a safe skip. Each patch runs
//! as a small state machine: stamp check, marker location, apply, then an
//! atomic per-file commit (temp file + rename in the same directory).
//!
//! Batches apply strictly in list order. A fatal failure stops the batch at
//! that point; operations already applied stay applied — atomicity is
//! per-file, not cross-file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{PacksmithError, Result};
use crate::manifest::{PatchKind, PatchSpec, substitute};

/// Literal marker embedded in every stamp line
pub const STAMP_MARKER: &str = "packsmith:applied";

/// The idempotency stamp for a patch key.
pub fn stamp_for(key: &str) -> String {
    format!("{STAMP_MARKER}:{key}")
}

/// A fully-resolved patch operation, ready to run against one file
#[derive(Debug, Clone)]
pub enum PatchOperation {
    MarkerInsert {
        target: PathBuf,
        key: String,
        content: String,
        marker_start: String,
        marker_end: String,
        strict: bool,
    },
    MarkerReplace {
        target: PathBuf,
        key: String,
        content: String,
        marker_start: String,
        marker_end: String,
        strict: bool,
    },
    AppendIfMissing {
        target: PathBuf,
        key: String,
        content: String,
        strict: bool,
    },
}

impl PatchOperation {
    /// Resolve a manifest patch declaration against a pack root and target
    /// directory: loads file-sourced content, substitutes data into inline
    /// content, and anchors the target path.
    pub fn from_spec(
        spec: &PatchSpec,
        pack_root: &Path,
        target_dir: &Path,
        data: &BTreeMap<String, String>,
    ) -> Result<Self> {
        let content = match (&spec.content_template, &spec.path) {
            (Some(template), None) => substitute(template, data),
            (None, Some(rel)) => {
                let path = pack_root.join(rel);
                std::fs::read_to_string(&path).map_err(|e| PacksmithError::FileReadFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?
            }
            // Exclusivity is enforced at manifest validation
            _ => {
                return Err(PacksmithError::PatchApplicationFailed {
                    path: spec.file.clone(),
                    reason: "patch has no usable content source".to_string(),
                });
            }
        };

        let target = target_dir.join(&spec.file);
        let key = spec.idempotency_key.clone();
        let strict = spec.strict;

        Ok(match spec.kind {
            PatchKind::MarkerInsert => PatchOperation::MarkerInsert {
                target,
                key,
                content,
                marker_start: spec.marker_start.clone().unwrap_or_default(),
                marker_end: spec.marker_end.clone().unwrap_or_default(),
                strict,
            },
            PatchKind::MarkerReplace => PatchOperation::MarkerReplace {
                target,
                key,
                content,
                marker_start: spec.marker_start.clone().unwrap_or_default(),
                marker_end: spec.marker_end.clone().unwrap_or_default(),
                strict,
            },
            PatchKind::AppendIfMissing => PatchOperation::AppendIfMissing {
                target,
                key,
                content,
                strict,
            },
        })
    }

    pub fn target(&self) -> &Path {
        match self {
            PatchOperation::MarkerInsert { target, .. }
            | PatchOperation::MarkerReplace { target, .. }
            | PatchOperation::AppendIfMissing { target, .. } => target,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            PatchOperation::MarkerInsert { key, .. }
            | PatchOperation::MarkerReplace { key, .. }
            | PatchOperation::AppendIfMissing { key, .. } => key,
        }
    }
}

/// Why a patch was skipped rather than applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The idempotency stamp is already present
    AlreadyApplied,
    /// A marker is missing and the patch is non-strict
    MarkerMissing,
}

/// Terminal state of one patch
#[derive(Debug)]
pub enum PatchOutcome {
    Applied,
    Skipped(SkipReason),
    Failed(PacksmithError),
}

/// Result of one patch operation
#[derive(Debug)]
pub struct PatchResult {
    pub target: PathBuf,
    pub key: String,
    pub outcome: PatchOutcome,
}

/// Batch application report
#[derive(Debug, Default)]
pub struct PatchBatchReport {
    pub results: Vec<PatchResult>,
}

impl PatchBatchReport {
    pub fn applied(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, PatchOutcome::Applied))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, PatchOutcome::Skipped(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, PatchOutcome::Failed(_)))
            .count()
    }

    /// Extract the first fatal error, if any.
    pub fn into_error(self) -> Option<PacksmithError> {
        self.results.into_iter().find_map(|r| match r.outcome {
            PatchOutcome::Failed(e) => Some(e),
            _ => None,
        })
    }

    /// One-line summary for generation records.
    pub fn summary(&self) -> String {
        format!(
            "{} applied, {} skipped, {} failed",
            self.applied(),
            self.skipped(),
            self.failed()
        )
    }
}

/// Detected line-ending convention of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    fn detect(content: &str) -> Self {
        if content.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }

    /// Normalize text to this convention.
    fn normalize(self, text: &str) -> String {
        let lf = text.replace("\r\n", "\n");
        match self {
            LineEnding::Lf => lf,
            LineEnding::CrLf => lf.replace('\n', "\r\n"),
        }
    }
}

/// The patch engine
#[derive(Debug, Default)]
pub struct PatchEngine;

impl PatchEngine {
    /// Apply one patch, returning its terminal state. Only I/O faults and
    /// strict-mode violations surface as `Failed`.
    pub fn apply(&self, op: &PatchOperation) -> PatchResult {
        let outcome = self.run(op);
        PatchResult {
            target: op.target().to_path_buf(),
            key: op.key().to_string(),
            outcome,
        }
    }

    /// Apply operations strictly in list order, stopping at the first fatal
    /// failure. Already-applied operations are not rolled back.
    pub fn apply_all(&self, ops: &[PatchOperation]) -> PatchBatchReport {
        let mut report = PatchBatchReport::default();

        for op in ops {
            let result = self.apply(op);
            let fatal = matches!(result.outcome, PatchOutcome::Failed(_));
            report.results.push(result);
            if fatal {
                break;
            }
        }

        report
    }

    fn run(&self, op: &PatchOperation) -> PatchOutcome {
        match self.try_run(op) {
            Ok(outcome) => outcome,
            Err(e) => PatchOutcome::Failed(e),
        }
    }

    fn try_run(&self, op: &PatchOperation) -> Result<PatchOutcome> {
        let target = op.target();

        let existing = match std::fs::read_to_string(target) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(PacksmithError::FileReadFailed {
                    path: target.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        // StampCheck: textual presence of the stamp is the sole signal
        if let Some(content) = &existing {
            if content.contains(&stamp_for(op.key())) {
                return Ok(PatchOutcome::Skipped(SkipReason::AlreadyApplied));
            }
        }

        match op {
            PatchOperation::MarkerInsert {
                target,
                key,
                content,
                marker_start,
                marker_end,
                strict,
            }
            | PatchOperation::MarkerReplace {
                target,
                key,
                content,
                marker_start,
                marker_end,
                strict,
            } => {
                let Some(original) = existing else {
                    if *strict {
                        return Err(PacksmithError::PatchFileNotFound {
                            path: target.display().to_string(),
                        });
                    }
                    return Ok(PatchOutcome::Skipped(SkipReason::MarkerMissing));
                };

                let span = match locate_markers(&original, marker_start, marker_end, target)? {
                    Located::Found(span) => span,
                    Located::Missing(marker) => {
                        if *strict {
                            return Err(PacksmithError::PatchMarkerNotFound {
                                file: target.display().to_string(),
                                marker,
                            });
                        }
                        return Ok(PatchOutcome::Skipped(SkipReason::MarkerMissing));
                    }
                };

                let eol = LineEnding::detect(&original);
                let replace = matches!(op, PatchOperation::MarkerReplace { .. });
                let patched = splice(&original, span, content, key, eol, replace);
                write_atomic(target, &patched)?;
                Ok(PatchOutcome::Applied)
            }
            PatchOperation::AppendIfMissing {
                target,
                key,
                content,
                strict,
            } => {
                let Some(original) = existing else {
                    if *strict {
                        return Err(PacksmithError::PatchFileNotFound {
                            path: target.display().to_string(),
                        });
                    }
                    // Non-strict append creates the file
                    let eol = LineEnding::detect(content);
                    let block = append_block("", content, key, eol);
                    write_atomic(target, &block)?;
                    return Ok(PatchOutcome::Applied);
                };

                let eol = LineEnding::detect(&original);
                let patched = append_block(&original, content, key, eol);
                write_atomic(target, &patched)?;
                Ok(PatchOutcome::Applied)
            }
        }
    }
}

/// Byte span between the end of the start marker and the start of the end
/// marker.
struct Span {
    after_start: usize,
    before_end: usize,
}

enum Located {
    Found(Span),
    Missing(String),
}

fn locate_markers(
    content: &str,
    marker_start: &str,
    marker_end: &str,
    target: &Path,
) -> Result<Located> {
    let Some(start_idx) = content.find(marker_start) else {
        return Ok(Located::Missing(marker_start.to_string()));
    };

    let after_start = start_idx + marker_start.len();
    match content[after_start..].find(marker_end) {
        Some(rel) => Ok(Located::Found(Span {
            after_start,
            before_end: after_start + rel,
        })),
        // An end marker somewhere before the start marker is an ordering
        // violation, fatal regardless of strictness
        None if content[..start_idx].contains(marker_end) => {
            Err(PacksmithError::PatchMarkerOrder {
                file: target.display().to_string(),
                marker_start: marker_start.to_string(),
                marker_end: marker_end.to_string(),
            })
        }
        None => Ok(Located::Missing(marker_end.to_string())),
    }
}

/// Build the patched file content for the marker kinds.
///
/// Insert places the new content immediately after the start marker, before
/// any existing content; replace substitutes everything strictly between the
/// markers. Both are followed by the single-line stamp.
fn splice(
    original: &str,
    span: Span,
    content: &str,
    key: &str,
    eol: LineEnding,
    replace: bool,
) -> String {
    let nl = eol.as_str();
    let body = eol.normalize(content.trim_end_matches(['\n', '\r']));
    let block = format!("{nl}{body}{nl}# {}{nl}", stamp_for(key));

    let mut out = String::with_capacity(original.len() + block.len());
    out.push_str(&original[..span.after_start]);
    out.push_str(&block);
    if replace {
        // Skip everything strictly between the markers
        out.push_str(&original[span.before_end..]);
    } else {
        out.push_str(&original[span.after_start..]);
    }
    out
}

/// Build the appended file content for append_if_missing.
fn append_block(original: &str, content: &str, key: &str, eol: LineEnding) -> String {
    let nl = eol.as_str();
    let body = eol.normalize(content.trim_end_matches(['\n', '\r']));

    let mut out = original.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push_str(nl);
    }
    out.push_str(&format!("{body}{nl}# {}{nl}", stamp_for(key)));
    out
}

/// Write via a temp file in the same directory plus atomic rename, so a
/// crash mid-write never leaves a half-written target.
fn write_atomic(target: &Path, content: &str) -> Result<()> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp =
        tempfile::NamedTempFile::new_in(dir).map_err(|e| PacksmithError::PatchApplicationFailed {
            path: target.display().to_string(),
            reason: format!("failed to create temp file: {e}"),
        })?;

    tmp.write_all(content.as_bytes())
        .map_err(|e| PacksmithError::PatchApplicationFailed {
            path: target.display().to_string(),
            reason: e.to_string(),
        })?;

    tmp.persist(target)
        .map_err(|e| PacksmithError::PatchApplicationFailed {
            path: target.display().to_string(),
            reason: e.to_string(),
        })?;

    Ok(())
}
