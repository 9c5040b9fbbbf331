//! Durable pipeline state storage.
//!
//! All mutation of a project's state funnels through a [`StateStore`]
//! commit; readers always observe either the pre-commit or post-commit
//! document, never a torn write.

mod file;
mod memory;

pub use file::JsonStateStore;
pub use memory::MemoryStateStore;

use crate::core::{PipelineState, ProjectMetadata};
use crate::errors::PipelineError;

/// Durable, versioned storage for a single project's pipeline state.
pub trait StateStore: Send + Sync + std::fmt::Debug {
    /// Loads the committed state.
    ///
    /// # Errors
    ///
    /// [`PipelineError::NotFound`] when the project was never initialized,
    /// [`PipelineError::CorruptState`] when the document fails
    /// schema-version validation or cannot be parsed.
    fn load(&self) -> Result<PipelineState, PipelineError>;

    /// Creates the initial state document for a new project.
    ///
    /// # Errors
    ///
    /// [`PipelineError::AlreadyInitialized`] when state already exists.
    fn init(&self, project: ProjectMetadata) -> Result<PipelineState, PipelineError>;

    /// Atomically replaces the committed state with `state`.
    ///
    /// Stage completion is monotonic here: the new document must extend the
    /// previous history and preserve every committed artifact.
    ///
    /// # Errors
    ///
    /// [`PipelineError::NonMonotonicCommit`] when the new state rewrites
    /// history; storage errors otherwise.
    fn commit(&self, state: &PipelineState) -> Result<(), PipelineError>;

    /// Atomically replaces the committed state as part of an explicit,
    /// audited rollback. The monotonic-history check is waived; the
    /// regression is logged as a distinct mutation.
    ///
    /// # Errors
    ///
    /// Storage errors; [`PipelineError::NotFound`] when nothing was ever
    /// initialized.
    fn commit_rollback(&self, state: &PipelineState) -> Result<(), PipelineError>;
}

/// Shared monotonicity guard used by store implementations.
pub(crate) fn check_monotonic(
    previous: &PipelineState,
    next: &PipelineState,
) -> Result<(), PipelineError> {
    if next.extends(previous) {
        Ok(())
    } else {
        Err(PipelineError::NonMonotonicCommit)
    }
}
