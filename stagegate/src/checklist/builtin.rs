//! Standard entry and exit gates for the built-in stage set.

use super::{Checklist, ChecklistItem};
use crate::core::{HandoffArtifact, PipelineState, Stage};
use serde_json::Value;
use std::collections::HashMap;

fn committed_field(state: &PipelineState, stage: Stage, field: &str) -> Result<Value, String> {
    let artifact = state
        .artifact(stage)
        .ok_or_else(|| format!("no committed artifact for '{stage}'"))?;
    artifact
        .field(field)
        .cloned()
        .ok_or_else(|| format!("field '{field}' missing from '{stage}' artifact"))
}

fn committed_number(state: &PipelineState, stage: Stage, field: &str) -> Result<f64, String> {
    committed_field(state, stage, field)?
        .as_f64()
        .ok_or_else(|| format!("field '{field}' on '{stage}' artifact is not numeric"))
}

fn candidate<'a>(artifact: Option<&'a HandoffArtifact>) -> Result<&'a HandoffArtifact, String> {
    artifact.ok_or_else(|| "no candidate artifact supplied".to_string())
}

fn candidate_field(artifact: Option<&HandoffArtifact>, field: &str) -> Result<Value, String> {
    candidate(artifact)?
        .field(field)
        .cloned()
        .ok_or_else(|| format!("field '{field}' missing from candidate artifact"))
}

fn nonempty_string(value: &Value) -> bool {
    value.as_str().is_some_and(|s| !s.trim().is_empty())
}

/// Entry and exit checklists for each stage.
///
/// Entry checklists gate a transition before the executor runs and see only
/// the committed state; exit checklists additionally see the candidate
/// artifact.
#[derive(Debug, Default)]
pub struct GateSet {
    entry: HashMap<Stage, Checklist>,
    exit: HashMap<Stage, Checklist>,
}

impl GateSet {
    /// Creates an empty gate set: every stage passes trivially.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the entry checklist for a stage.
    pub fn set_entry(&mut self, stage: Stage, checklist: Checklist) {
        self.entry.insert(stage, checklist);
    }

    /// Replaces the exit checklist for a stage.
    pub fn set_exit(&mut self, stage: Stage, checklist: Checklist) {
        self.exit.insert(stage, checklist);
    }

    /// Returns the entry checklist for a stage, if one is declared.
    #[must_use]
    pub fn entry(&self, stage: Stage) -> Option<&Checklist> {
        self.entry.get(&stage)
    }

    /// Returns the exit checklist for a stage, if one is declared.
    #[must_use]
    pub fn exit(&self, stage: Stage) -> Option<&Checklist> {
        self.exit.get(&stage)
    }

    /// The standard gates for the built-in pipeline.
    #[must_use]
    pub fn standard() -> Self {
        let mut gates = Self::new();

        gates.set_entry(
            Stage::Scan,
            Checklist::new("scan.entry").with_item(ChecklistItem::blocking(
                "state_well_formed",
                "pipeline state passes structural self-check",
                |state, _| Ok(state.is_well_formed()),
            )),
        );
        gates.set_exit(
            Stage::Scan,
            Checklist::new("scan.exit").with_item(ChecklistItem::warning(
                "images_found",
                "scan discovered at least one image",
                |_, artifact| Ok(candidate_field(artifact, "image_count")?
                    .as_f64()
                    .is_some_and(|n| n >= 1.0)),
            )),
        );

        gates.set_entry(
            Stage::Validate,
            Checklist::new("validate.entry").with_item(ChecklistItem::blocking(
                "images_discovered",
                "images discovered >= 1",
                |state, _| Ok(committed_number(state, Stage::Scan, "image_count")? >= 1.0),
            )),
        );
        gates.set_exit(
            Stage::Validate,
            Checklist::new("validate.exit").with_item(ChecklistItem::warning(
                "reject_rate_reasonable",
                "rejected images do not outnumber valid ones",
                |_, artifact| {
                    let valid = candidate_field(artifact, "images_valid")?
                        .as_f64()
                        .unwrap_or(0.0);
                    let rejected = candidate_field(artifact, "images_rejected")?
                        .as_f64()
                        .unwrap_or(f64::MAX);
                    Ok(rejected <= valid)
                },
            )),
        );

        gates.set_entry(
            Stage::Annotate,
            Checklist::new("annotate.entry").with_item(ChecklistItem::blocking(
                "valid_images_present",
                "validation kept at least one image",
                |state, _| Ok(committed_number(state, Stage::Validate, "images_valid")? >= 1.0),
            )),
        );
        gates.set_exit(
            Stage::Annotate,
            Checklist::new("annotate.exit").with_item(ChecklistItem::blocking(
                "labels_produced",
                "annotation produced at least one label",
                |_, artifact| Ok(candidate_field(artifact, "labeled_count")?
                    .as_f64()
                    .is_some_and(|n| n >= 1.0)),
            )),
        );

        gates.set_entry(
            Stage::Split,
            Checklist::new("split.entry").with_item(ChecklistItem::blocking(
                "labels_committed",
                "annotation artifact reports labeled images",
                |state, _| Ok(committed_number(state, Stage::Annotate, "labeled_count")? >= 1.0),
            )),
        );
        gates.set_exit(
            Stage::Split,
            Checklist::new("split.exit")
                .with_item(ChecklistItem::blocking(
                    "train_split_nonempty",
                    "train split contains at least one image",
                    |_, artifact| {
                        let splits = candidate_field(artifact, "splits")?;
                        Ok(splits
                            .get("train")
                            .and_then(Value::as_f64)
                            .is_some_and(|n| n >= 1.0))
                    },
                ))
                .with_item(ChecklistItem::blocking(
                    "classes_defined",
                    "class list is non-empty",
                    |_, artifact| Ok(candidate_field(artifact, "classes")?
                        .as_array()
                        .is_some_and(|c| !c.is_empty())),
                ))
                .with_item(ChecklistItem::warning(
                    "val_split_present",
                    "validation split is non-empty",
                    |_, artifact| {
                        let splits = candidate_field(artifact, "splits")?;
                        Ok(splits
                            .get("val")
                            .and_then(Value::as_f64)
                            .is_some_and(|n| n >= 1.0))
                    },
                )),
        );

        gates.set_entry(
            Stage::TrainConfig,
            Checklist::new("train_config.entry").with_item(ChecklistItem::blocking(
                "dataset_materialized",
                "split artifact records a dataset path",
                |state, _| {
                    Ok(nonempty_string(&committed_field(
                        state,
                        Stage::Split,
                        "dataset_path",
                    )?))
                },
            )),
        );
        gates.set_exit(
            Stage::TrainConfig,
            Checklist::new("train_config.exit").with_item(ChecklistItem::blocking(
                "experiment_registered",
                "an experiment id was assigned",
                |_, artifact| Ok(nonempty_string(&candidate_field(artifact, "experiment_id")?)),
            )),
        );

        gates.set_entry(
            Stage::TrainExec,
            Checklist::new("train_exec.entry").with_item(ChecklistItem::blocking(
                "config_committed",
                "training configuration carries an experiment id",
                |state, _| {
                    Ok(nonempty_string(&committed_field(
                        state,
                        Stage::TrainConfig,
                        "experiment_id",
                    )?))
                },
            )),
        );
        gates.set_exit(
            Stage::TrainExec,
            Checklist::new("train_exec.exit")
                .with_item(ChecklistItem::blocking(
                    "weights_path_set",
                    "training reported a model weights path",
                    |_, artifact| Ok(nonempty_string(&candidate_field(artifact, "model_path")?)),
                ))
                .with_item(ChecklistItem::warning(
                    "metrics_reported",
                    "training reported final metrics",
                    |_, artifact| Ok(candidate_field(artifact, "training_metrics")?
                        .as_object()
                        .is_some_and(|m| !m.is_empty())),
                )),
        );

        gates.set_entry(
            Stage::Evaluate,
            Checklist::new("evaluate.entry").with_item(ChecklistItem::blocking(
                "model_weights_present",
                "a trained model path is committed",
                |state, _| {
                    Ok(nonempty_string(&committed_field(
                        state,
                        Stage::TrainExec,
                        "model_path",
                    )?))
                },
            )),
        );
        gates.set_exit(
            Stage::Evaluate,
            Checklist::new("evaluate.exit").with_item(ChecklistItem::warning(
                "threshold_calibrated",
                "recommended confidence threshold is within (0, 1)",
                |_, artifact| Ok(candidate_field(artifact, "recommended_threshold")?
                    .as_f64()
                    .is_some_and(|t| t > 0.0 && t < 1.0)),
            )),
        );

        gates.set_entry(
            Stage::Deploy,
            Checklist::new("deploy.entry")
                .with_item(ChecklistItem::blocking(
                    "evaluation_signed_off",
                    "evaluation marked the model deployment-ready",
                    |state, _| {
                        Ok(committed_field(state, Stage::Evaluate, "deployment_ready")?
                            .as_bool()
                            .unwrap_or(false))
                    },
                ))
                .with_item(ChecklistItem::warning(
                    "threshold_recommended",
                    "evaluation recommended a confidence threshold",
                    |state, _| {
                        Ok(
                            committed_number(state, Stage::Evaluate, "recommended_threshold")
                                .is_ok(),
                        )
                    },
                )),
        );
        gates.set_exit(
            Stage::Deploy,
            Checklist::new("deploy.exit").with_item(ChecklistItem::blocking(
                "endpoint_recorded",
                "deployment recorded a serving endpoint",
                |_, artifact| Ok(nonempty_string(&candidate_field(artifact, "endpoint")?)),
            )),
        );

        gates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{HandoffArtifact, ProjectMetadata, STAGE_ORDER};
    use serde_json::json;

    fn scan_state(image_count: i64) -> PipelineState {
        let mut state = PipelineState::new(ProjectMetadata::new("frogspot"));
        let mut payload = serde_json::Map::new();
        payload.insert("image_dir".to_string(), json!("data/raw"));
        payload.insert("image_count".to_string(), json!(image_count));
        payload.insert("formats_detected".to_string(), json!(["jpg"]));
        state.record_completion(Stage::Scan, HandoffArtifact::new(Stage::Scan, payload));
        state
    }

    #[test]
    fn test_standard_gates_cover_all_post_init_stages() {
        let gates = GateSet::standard();
        for stage in STAGE_ORDER.iter().skip(1) {
            assert!(gates.entry(*stage).is_some(), "no entry gate for {stage}");
            assert!(gates.exit(*stage).is_some(), "no exit gate for {stage}");
        }
    }

    #[test]
    fn test_validate_entry_requires_images() {
        let gates = GateSet::standard();
        let checklist = gates.entry(Stage::Validate).unwrap();

        let report = checklist.evaluate(&scan_state(0), None);
        assert!(!report.passed());
        assert_eq!(report.blocking_failures, vec!["images_discovered".to_string()]);

        let report = checklist.evaluate(&scan_state(412), None);
        assert!(report.passed());
    }

    #[test]
    fn test_validate_entry_fails_closed_without_scan_artifact() {
        let gates = GateSet::standard();
        let state = PipelineState::new(ProjectMetadata::new("frogspot"));

        let report = gates.entry(Stage::Validate).unwrap().evaluate(&state, None);
        assert!(!report.passed());
        assert!(report.items[0]
            .detail
            .as_deref()
            .is_some_and(|d| d.contains("no committed artifact")));
    }

    #[test]
    fn test_scan_exit_zero_images_is_only_a_warning() {
        let gates = GateSet::standard();
        let state = PipelineState::new(ProjectMetadata::new("frogspot"));

        let mut payload = serde_json::Map::new();
        payload.insert("image_dir".to_string(), json!("data/raw"));
        payload.insert("image_count".to_string(), json!(0));
        payload.insert("formats_detected".to_string(), json!([]));
        let candidate = HandoffArtifact::new(Stage::Scan, payload);

        let report = gates
            .exit(Stage::Scan)
            .unwrap()
            .evaluate(&state, Some(&candidate));
        assert!(report.passed());
        assert_eq!(report.warnings().len(), 1);
    }

    #[test]
    fn test_deploy_entry_blocks_without_sign_off() {
        let gates = GateSet::standard();
        let mut state = PipelineState::new(ProjectMetadata::new("frogspot"));

        let mut payload = serde_json::Map::new();
        payload.insert("report_path".to_string(), json!("reports/eval.json"));
        payload.insert("metrics".to_string(), json!({"map50": 0.42}));
        payload.insert("deployment_ready".to_string(), json!(false));
        payload.insert("recommended_threshold".to_string(), json!(0.25));
        state.record_completion(
            Stage::Evaluate,
            HandoffArtifact::new(Stage::Evaluate, payload),
        );

        let report = gates.entry(Stage::Deploy).unwrap().evaluate(&state, None);
        assert!(!report.passed());
        assert!(report
            .blocking_failures
            .contains(&"evaluation_signed_off".to_string()));
    }
}
