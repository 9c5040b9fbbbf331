//! Multi-project controller registry.
//!
//! One controller per project root; each owns its own critical section, so
//! a long-running executor in one project never blocks another project's
//! transitions or status queries.

use crate::config::ProjectConfig;
use crate::store::JsonStateStore;
use crate::transition::TransitionController;
use dashmap::DashMap;
use std::path::Path;
use std::sync::Arc;

/// Concurrent registry of per-project transition controllers.
#[derive(Debug, Default)]
pub struct ProjectManager {
    projects: DashMap<String, Arc<TransitionController>>,
}

impl ProjectManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the controller for the configured project, creating it (with
    /// a file-backed store) on first access.
    #[must_use]
    pub fn open(&self, config: &ProjectConfig) -> Arc<TransitionController> {
        let key = Self::key(config.root());
        self.projects
            .entry(key)
            .or_insert_with(|| {
                let store = Arc::new(JsonStateStore::new(config.state_path()));
                Arc::new(TransitionController::new(store))
            })
            .value()
            .clone()
    }

    /// Drops the cached controller for a project root. Returns true if one
    /// was present.
    pub fn close(&self, root: &Path) -> bool {
        self.projects.remove(&Self::key(root)).is_some()
    }

    /// Number of open projects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    /// Returns true when no projects are open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    fn key(root: &Path) -> String {
        root.display().to_string()
    }
}
