//! Startup recovery: verify persisted state and find safe resumption points.
//!
//! Because the commit in the transition protocol is the only place state
//! mutates, an interruption anywhere before it leaves the store already in
//! the pre-transition state. Recovery is therefore a verification pass:
//! confirm the current stage is backed by a committed artifact, re-verify
//! artifact checksums, and report orphaned executor output.

use crate::core::{PipelineState, Stage};
use crate::errors::PipelineError;
use crate::store::StateStore;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// What recovery decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPlan {
    /// The stage the project can safely resume from.
    pub resume_at: Stage,
    /// Files in the handoff directory with no committed counterpart,
    /// typically output spilled by an aborted executor run.
    pub stale_artifacts: Vec<PathBuf>,
    /// True when the persisted current stage had to be reset.
    pub repaired: bool,
}

/// Inspects persisted state on startup and determines a safe resume point.
#[derive(Debug)]
pub struct RecoveryManager {
    store: Arc<dyn StateStore>,
    handoffs_dir: Option<PathBuf>,
}

impl RecoveryManager {
    /// Creates a manager over `store` without stale-artifact scanning.
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            handoffs_dir: None,
        }
    }

    /// Enables stale-artifact scanning over `dir`.
    #[must_use]
    pub fn with_handoffs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.handoffs_dir = Some(dir.into());
        self
    }

    /// Runs the verification pass.
    ///
    /// # Errors
    ///
    /// [`PipelineError::NotFound`] when no project exists;
    /// [`PipelineError::CorruptState`] when a committed artifact fails its
    /// checksum; store and I/O errors otherwise.
    pub fn recover(&self) -> Result<RecoveryPlan, PipelineError> {
        let state = self.store.load()?;

        for (stage, artifact) in &state.artifacts {
            if !artifact.verify_checksum() {
                return Err(PipelineError::CorruptState(format!(
                    "committed artifact for '{stage}' fails checksum verification"
                )));
            }
        }

        let backed = state.last_backed_stage();
        let mut repaired = false;
        let resume_at = if state.current_stage != Stage::Init
            && state.artifact(state.current_stage).is_none()
        {
            // The recorded current stage has no committed artifact: an
            // interrupted writer advanced the pointer without the payload.
            // Reset to the last fully committed stage.
            let next = state.rolled_back_to(backed);
            self.store.commit_rollback(&next)?;
            warn!(
                dangling = %state.current_stage,
                resume_at = %backed,
                "reset dangling current stage"
            );
            repaired = true;
            backed
        } else {
            state.current_stage
        };

        let stale_artifacts = self.scan_stale(&state)?;
        if stale_artifacts.is_empty() {
            info!(resume_at = %resume_at, "recovery verification passed");
        } else {
            warn!(
                resume_at = %resume_at,
                stale = stale_artifacts.len(),
                "orphaned handoff files found"
            );
        }

        Ok(RecoveryPlan {
            resume_at,
            stale_artifacts,
            repaired,
        })
    }

    fn scan_stale(&self, state: &PipelineState) -> Result<Vec<PathBuf>, PipelineError> {
        let Some(dir) = &self.handoffs_dir else {
            return Ok(Vec::new());
        };
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut stale = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(OsStr::to_str) != Some("json") {
                continue;
            }
            let stem = path
                .file_stem()
                .and_then(OsStr::to_str)
                .unwrap_or_default();
            let committed = stem
                .parse::<Stage>()
                .is_ok_and(|stage| state.artifacts.contains_key(&stage));
            if !committed {
                stale.push(path);
            }
        }
        stale.sort();
        Ok(stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{HandoffArtifact, ProjectMetadata};
    use crate::store::MemoryStateStore;
    use serde_json::json;
    use tempfile::tempdir;

    fn artifact(stage: Stage) -> HandoffArtifact {
        let mut payload = serde_json::Map::new();
        payload.insert("marker".to_string(), json!(stage.as_str()));
        HandoffArtifact::new(stage, payload)
    }

    fn seeded_store(last: Stage) -> Arc<MemoryStateStore> {
        let mut state = PipelineState::new(ProjectMetadata::new("frogspot"));
        for stage in crate::core::STAGE_ORDER.iter().skip(1).copied() {
            state.record_completion(stage, artifact(stage));
            if stage == last {
                break;
            }
        }
        Arc::new(MemoryStateStore::with_state(state))
    }

    #[test]
    fn test_consistent_state_is_a_noop() {
        let store = seeded_store(Stage::Validate);
        let plan = RecoveryManager::new(store.clone()).recover().unwrap();

        assert_eq!(plan.resume_at, Stage::Validate);
        assert!(!plan.repaired);
        assert!(plan.stale_artifacts.is_empty());
        // Verification must not mutate the store.
        assert_eq!(store.load().unwrap().stages_completed.len(), 2);
    }

    #[test]
    fn test_not_found_propagates() {
        let store = Arc::new(MemoryStateStore::new());
        let err = RecoveryManager::new(store).recover().unwrap_err();
        assert!(matches!(err, PipelineError::NotFound));
    }

    #[test]
    fn test_dangling_current_stage_is_reset() {
        let store = seeded_store(Stage::Validate);
        let mut state = store.load().unwrap();
        // Simulate an interrupted writer: pointer advanced, no artifact.
        state.current_stage = Stage::Annotate;
        store.commit(&state).unwrap();

        let plan = RecoveryManager::new(store.clone()).recover().unwrap();
        assert!(plan.repaired);
        assert_eq!(plan.resume_at, Stage::Validate);

        let repaired = store.load().unwrap();
        assert_eq!(repaired.current_stage, Stage::Validate);
        assert!(repaired.is_well_formed());
    }

    #[test]
    fn test_checksum_mismatch_is_corrupt() {
        let store = seeded_store(Stage::Scan);
        let mut state = store.load().unwrap();
        if let Some(a) = state.artifacts.get_mut(&Stage::Scan) {
            a.payload.insert("marker".to_string(), json!("tampered"));
        }
        store.commit(&state).unwrap();

        let err = RecoveryManager::new(store).recover().unwrap_err();
        assert!(matches!(err, PipelineError::CorruptState(_)));
    }

    #[test]
    fn test_stale_handoffs_reported() {
        let dir = tempdir().unwrap();
        let handoffs = dir.path().join("handoffs");
        fs::create_dir_all(&handoffs).unwrap();
        // Committed stage spill: fine. Uncommitted stage spill: stale.
        fs::write(handoffs.join("scan.json"), "{}").unwrap();
        fs::write(handoffs.join("train_exec.json"), "{}").unwrap();
        fs::write(handoffs.join("notes.txt"), "ignored").unwrap();

        let store = seeded_store(Stage::Scan);
        let plan = RecoveryManager::new(store)
            .with_handoffs_dir(&handoffs)
            .recover()
            .unwrap();

        assert_eq!(plan.stale_artifacts, vec![handoffs.join("train_exec.json")]);
    }
}
