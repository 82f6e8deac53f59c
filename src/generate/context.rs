//! Explicit per-generation context
//!
//! Collects phase start/end timings as the orchestrator walks its state
//! machine. Threaded through every step instead of any ambient mutable
//! singleton, so a generation's trace is owned by its invocation.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::Result;

/// The orchestrator's sequential phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ResolvePack,
    LoadManifest,
    CheckCompatibility,
    ComputeRenderPlan,
    DetectConflicts,
    StageRender,
    StagePatches,
    RunPostGenerateCommands,
    RunCheckCommands,
    CommitStaging,
    PersistState,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::ResolvePack => "resolve-pack",
            Phase::LoadManifest => "load-manifest",
            Phase::CheckCompatibility => "check-compatibility",
            Phase::ComputeRenderPlan => "compute-render-plan",
            Phase::DetectConflicts => "detect-conflicts",
            Phase::StageRender => "stage-render",
            Phase::StagePatches => "stage-patches",
            Phase::RunPostGenerateCommands => "run-post-generate",
            Phase::RunCheckCommands => "run-checks",
            Phase::CommitStaging => "commit-staging",
            Phase::PersistState => "persist-state",
        };
        f.write_str(name)
    }
}

/// Elapsed time of one completed phase
#[derive(Debug, Clone)]
pub struct PhaseTiming {
    pub phase: Phase,
    pub duration: Duration,
}

/// Context object threaded through every orchestrator step
#[derive(Debug)]
pub struct GenerationContext {
    timings: Vec<PhaseTiming>,
}

impl GenerationContext {
    pub fn new() -> Self {
        Self {
            timings: Vec::new(),
        }
    }

    /// Run one phase, recording its duration whether it succeeds or fails.
    pub fn time<T>(&mut self, phase: Phase, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let start = Instant::now();
        let result = f();
        self.timings.push(PhaseTiming {
            phase,
            duration: start.elapsed(),
        });
        result
    }

    pub fn timings(&self) -> &[PhaseTiming] {
        &self.timings
    }

    pub fn into_timings(self) -> Vec<PhaseTiming> {
        self.timings
    }
}

impl Default for GenerationContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PacksmithError;

    #[test]
    fn test_timings_recorded_in_order() {
        let mut ctx = GenerationContext::new();
        ctx.time(Phase::ResolvePack, || Ok(())).unwrap();
        ctx.time(Phase::LoadManifest, || Ok(())).unwrap();

        let phases: Vec<Phase> = ctx.timings().iter().map(|t| t.phase).collect();
        assert_eq!(phases, vec![Phase::ResolvePack, Phase::LoadManifest]);
    }

    #[test]
    fn test_failed_phase_still_timed() {
        let mut ctx = GenerationContext::new();
        let result: Result<()> = ctx.time(Phase::DetectConflicts, || {
            Err(PacksmithError::GenerateConflict {
                count: 1,
                paths: "a.txt".to_string(),
            })
        });
        assert!(result.is_err());
        assert_eq!(ctx.timings().len(), 1);
        assert_eq!(ctx.timings()[0].phase, Phase::DetectConflicts);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::StagePatches.to_string(), "stage-patches");
    }
}
