//! Handoff artifacts: the typed contract a stage commits for its successor.

use super::Stage;
use crate::utils::{now_utc, payload_digest, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The validated output contract of a completed stage.
///
/// Artifacts are immutable once committed to the pipeline state; a stage is
/// only re-run through an explicit rollback, never by overwriting its
/// artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffArtifact {
    /// The stage that produced this artifact.
    pub source_stage: Stage,

    /// The stage intended to consume it; `None` for the terminal stage.
    pub target_stage: Option<Stage>,

    /// Named fields, validated against the schema registry before commit.
    pub payload: serde_json::Map<String, Value>,

    /// Lowercase hex SHA-256 of the canonical payload, re-verified on
    /// recovery.
    pub checksum: String,

    /// When the artifact was built.
    pub created_at: Timestamp,
}

impl HandoffArtifact {
    /// Builds an artifact for `source_stage` from an already-validated
    /// payload, stamping the checksum and creation time.
    #[must_use]
    pub fn new(source_stage: Stage, payload: serde_json::Map<String, Value>) -> Self {
        let checksum = payload_digest(&payload);
        Self {
            source_stage,
            target_stage: source_stage.successor(),
            payload,
            checksum,
            created_at: now_utc(),
        }
    }

    /// Looks up a payload field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    /// Recomputes the payload digest and compares it to the stored checksum.
    #[must_use]
    pub fn verify_checksum(&self) -> bool {
        payload_digest(&self.payload) == self.checksum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> serde_json::Map<String, Value> {
        let mut map = serde_json::Map::new();
        map.insert("image_dir".to_string(), json!("data/raw"));
        map.insert("image_count".to_string(), json!(412));
        map
    }

    #[test]
    fn test_artifact_targets_successor() {
        let artifact = HandoffArtifact::new(Stage::Scan, payload());
        assert_eq!(artifact.source_stage, Stage::Scan);
        assert_eq!(artifact.target_stage, Some(Stage::Validate));
    }

    #[test]
    fn test_terminal_artifact_has_no_target() {
        let artifact = HandoffArtifact::new(Stage::Deploy, payload());
        assert_eq!(artifact.target_stage, None);
    }

    #[test]
    fn test_checksum_round_trip() {
        let artifact = HandoffArtifact::new(Stage::Scan, payload());
        assert!(artifact.verify_checksum());
    }

    #[test]
    fn test_tampered_payload_fails_checksum() {
        let mut artifact = HandoffArtifact::new(Stage::Scan, payload());
        artifact
            .payload
            .insert("image_count".to_string(), json!(9000));
        assert!(!artifact.verify_checksum());
    }

    #[test]
    fn test_serde_round_trip() {
        let artifact = HandoffArtifact::new(Stage::Scan, payload());
        let json = serde_json::to_string(&artifact).unwrap();
        let back: HandoffArtifact = serde_json::from_str(&json).unwrap();
        assert_eq!(artifact, back);
    }
}
