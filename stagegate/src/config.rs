//! Per-project configuration and path conventions.

use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the optional per-project config file at the project root.
pub const CONFIG_FILE: &str = "stagegate.json";

/// Directory under the project root holding pipeline bookkeeping.
pub const STATE_DIR: &str = ".stagegate";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    executor_timeout_secs: Option<u64>,
}

/// Resolved configuration for one project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    /// The project root directory.
    pub root: PathBuf,
    /// Default executor timeout applied when the caller supplies none.
    pub executor_timeout_secs: Option<u64>,
}

impl ProjectConfig {
    /// Creates a default configuration for `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            executor_timeout_secs: None,
        }
    }

    /// Loads configuration for `root`, reading `stagegate.json` when it
    /// exists and falling back to defaults otherwise.
    ///
    /// # Errors
    ///
    /// I/O errors reading the file; [`PipelineError::Serialization`] when
    /// the file exists but is not valid JSON.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let root = root.into();
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::new(root));
        }

        let raw = fs::read_to_string(&path)?;
        let file: ConfigFile = serde_json::from_str(&raw)?;
        Ok(Self {
            root,
            executor_timeout_secs: file.executor_timeout_secs,
        })
    }

    /// Path of the persisted state document.
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.root.join(STATE_DIR).join("state.json")
    }

    /// Directory where executors spill handoff output.
    #[must_use]
    pub fn handoffs_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR).join("handoffs")
    }

    /// The default executor timeout, if configured.
    #[must_use]
    pub fn executor_timeout(&self) -> Option<Duration> {
        self.executor_timeout_secs.map(Duration::from_secs)
    }

    /// The project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_config_file() {
        let dir = tempdir().unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap();

        assert_eq!(config.executor_timeout(), None);
        assert_eq!(
            config.state_path(),
            dir.path().join(".stagegate").join("state.json")
        );
        assert_eq!(
            config.handoffs_dir(),
            dir.path().join(".stagegate").join("handoffs")
        );
    }

    #[test]
    fn test_loads_timeout_from_file() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"executor_timeout_secs": 7200}"#,
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.executor_timeout(), Some(Duration::from_secs(7200)));
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{").unwrap();

        assert!(matches!(
            ProjectConfig::load(dir.path()),
            Err(PipelineError::Serialization(_))
        ));
    }
}
