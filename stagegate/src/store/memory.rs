//! In-memory state store for tests and ephemeral runs.

use super::{check_monotonic, StateStore};
use crate::core::{PipelineState, ProjectMetadata};
use crate::errors::PipelineError;
use parking_lot::RwLock;
use tracing::warn;

/// A [`StateStore`] holding the document in process memory.
///
/// Commit semantics mirror [`super::JsonStateStore`], including the
/// monotonic-history guard, so controller tests exercise the same contract.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: RwLock<Option<PipelineState>>,
}

impl MemoryStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with an existing state document.
    #[must_use]
    pub fn with_state(state: PipelineState) -> Self {
        Self {
            state: RwLock::new(Some(state)),
        }
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<PipelineState, PipelineError> {
        self.state.read().clone().ok_or(PipelineError::NotFound)
    }

    fn init(&self, project: ProjectMetadata) -> Result<PipelineState, PipelineError> {
        let mut guard = self.state.write();
        if guard.is_some() {
            return Err(PipelineError::AlreadyInitialized);
        }
        let state = PipelineState::new(project);
        *guard = Some(state.clone());
        Ok(state)
    }

    fn commit(&self, state: &PipelineState) -> Result<(), PipelineError> {
        let mut guard = self.state.write();
        let previous = guard.as_ref().ok_or(PipelineError::NotFound)?;
        check_monotonic(previous, state)?;
        *guard = Some(state.clone());
        Ok(())
    }

    fn commit_rollback(&self, state: &PipelineState) -> Result<(), PipelineError> {
        let mut guard = self.state.write();
        if guard.is_none() {
            return Err(PipelineError::NotFound);
        }
        warn!(
            project = %state.project.name,
            to = %state.current_stage,
            "rollback committed"
        );
        *guard = Some(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{HandoffArtifact, Stage};
    use serde_json::json;

    fn artifact(stage: Stage) -> HandoffArtifact {
        let mut payload = serde_json::Map::new();
        payload.insert("marker".to_string(), json!(stage.as_str()));
        HandoffArtifact::new(stage, payload)
    }

    #[test]
    fn test_same_contract_as_file_store() {
        let store = MemoryStateStore::new();
        assert!(matches!(store.load(), Err(PipelineError::NotFound)));

        let mut state = store.init(ProjectMetadata::new("frogspot")).unwrap();
        assert!(matches!(
            store.init(ProjectMetadata::new("frogspot")),
            Err(PipelineError::AlreadyInitialized)
        ));

        let fresh = state.clone();
        state.record_completion(Stage::Scan, artifact(Stage::Scan));
        store.commit(&state).unwrap();

        assert!(matches!(
            store.commit(&fresh),
            Err(PipelineError::NonMonotonicCommit)
        ));

        let rolled = state.rolled_back_to(Stage::Init);
        store.commit_rollback(&rolled).unwrap();
        assert_eq!(store.load().unwrap().stages_completed, Vec::<Stage>::new());
    }
}
