//! JSON file-backed state store.

use super::{check_monotonic, StateStore};
use crate::core::{PipelineState, ProjectMetadata, STATE_SCHEMA_VERSION};
use crate::errors::PipelineError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Persists the state document as pretty-printed JSON at a fixed path.
///
/// Writes go to a temporary sibling file first and are renamed into place,
/// so an interrupted commit leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    /// Creates a store persisting to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path of the persisted document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomic(&self, state: &PipelineState) -> Result<(), PipelineError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = serde_json::to_vec_pretty(state)?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "state.json".to_string());
        let tmp = self.path.with_file_name(format!("{file_name}.tmp"));

        fs::write(&tmp, rendered)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> Result<PipelineState, PipelineError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::NotFound)
            }
            Err(e) => return Err(PipelineError::Io(e)),
        };

        let document: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| PipelineError::CorruptState(format!("unparseable document: {e}")))?;

        let version = document
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| PipelineError::CorruptState("missing version field".to_string()))?;
        if version != u64::from(STATE_SCHEMA_VERSION) {
            return Err(PipelineError::CorruptState(format!(
                "unsupported schema version {version} (expected {STATE_SCHEMA_VERSION})"
            )));
        }

        serde_json::from_value(document)
            .map_err(|e| PipelineError::CorruptState(format!("malformed state document: {e}")))
    }

    fn init(&self, project: ProjectMetadata) -> Result<PipelineState, PipelineError> {
        if self.path.exists() {
            return Err(PipelineError::AlreadyInitialized);
        }

        let state = PipelineState::new(project);
        self.write_atomic(&state)?;
        debug!(path = %self.path.display(), project = %state.project.name, "state initialized");
        Ok(state)
    }

    fn commit(&self, state: &PipelineState) -> Result<(), PipelineError> {
        let previous = self.load()?;
        check_monotonic(&previous, state)?;
        self.write_atomic(state)?;
        debug!(
            project = %state.project.name,
            stage = %state.current_stage,
            "state committed"
        );
        Ok(())
    }

    fn commit_rollback(&self, state: &PipelineState) -> Result<(), PipelineError> {
        let previous = self.load()?;
        let removed: Vec<String> = previous
            .stages_completed
            .iter()
            .filter(|s| !state.stages_completed.contains(s))
            .map(ToString::to_string)
            .collect();

        self.write_atomic(state)?;
        warn!(
            project = %state.project.name,
            to = %state.current_stage,
            removed = removed.join(","),
            "rollback committed"
        );
        Ok(())
    }
}
