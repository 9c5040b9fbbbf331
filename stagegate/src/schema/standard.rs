//! Built-in artifact schemas for the standard pipeline stages.

use super::{ArtifactSchema, FieldSpec, FieldType};
use crate::core::Stage;

fn string_enum(values: &[&str]) -> FieldType {
    FieldType::Enum(values.iter().map(ToString::to_string).collect())
}

/// The standard schema set, one per artifact-producing stage.
///
/// `init` produces no artifact and is absent by design.
#[must_use]
pub fn standard_schemas() -> Vec<ArtifactSchema> {
    vec![
        ArtifactSchema::new(Stage::Scan)
            .with_field(FieldSpec::required("image_dir", FieldType::String))
            .with_field(FieldSpec::required("image_count", FieldType::Number))
            .with_field(FieldSpec::required("formats_detected", FieldType::List)),
        ArtifactSchema::new(Stage::Validate)
            .with_field(FieldSpec::required("images_valid", FieldType::Number))
            .with_field(FieldSpec::required("images_rejected", FieldType::Number))
            .with_field(FieldSpec::required("quality_report_path", FieldType::String)),
        ArtifactSchema::new(Stage::Annotate)
            .with_field(FieldSpec::required(
                "annotation_source",
                string_enum(&["managed", "classic"]),
            ))
            .with_field(FieldSpec::required(
                "annotation_format",
                string_enum(&["yolo", "coco", "voc"]),
            ))
            .with_field(FieldSpec::required("labeled_count", FieldType::Number)),
        ArtifactSchema::new(Stage::Split)
            .with_field(FieldSpec::required("dataset_path", FieldType::String))
            .with_field(FieldSpec::required("data_config_path", FieldType::String))
            .with_field(FieldSpec::required("splits", FieldType::Object))
            .with_field(FieldSpec::required("classes", FieldType::List)),
        ArtifactSchema::new(Stage::TrainConfig)
            .with_field(FieldSpec::required("architecture", FieldType::String))
            .with_field(FieldSpec::required("hyperparameters", FieldType::Object))
            .with_field(FieldSpec::required("experiment_id", FieldType::String)),
        ArtifactSchema::new(Stage::TrainExec)
            .with_field(FieldSpec::required("model_path", FieldType::String))
            .with_field(FieldSpec::required("training_metrics", FieldType::Object))
            .with_field(FieldSpec::required("dataset_hash", FieldType::String))
            .with_field(FieldSpec::required("random_seed", FieldType::Number)),
        ArtifactSchema::new(Stage::Evaluate)
            .with_field(FieldSpec::required("report_path", FieldType::String))
            .with_field(FieldSpec::required("metrics", FieldType::Object))
            .with_field(FieldSpec::required("deployment_ready", FieldType::Bool))
            .with_field(FieldSpec::required("recommended_threshold", FieldType::Number)),
        ArtifactSchema::new(Stage::Deploy)
            .with_field(FieldSpec::required("target", string_enum(&["cloud", "edge"])))
            .with_field(FieldSpec::required("endpoint", FieldType::String))
            .with_field(FieldSpec::optional("benchmark", FieldType::Object)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::STAGE_ORDER;
    use crate::schema::SchemaRegistry;
    use serde_json::json;

    #[test]
    fn test_every_post_init_stage_has_a_schema() {
        let registry = SchemaRegistry::standard();
        for stage in STAGE_ORDER.iter().skip(1) {
            assert!(registry.get(*stage).is_some(), "missing schema for {stage}");
        }
    }

    #[test]
    fn test_scan_schema_accepts_typical_payload() {
        let registry = SchemaRegistry::standard();
        let mut payload = serde_json::Map::new();
        payload.insert("image_dir".to_string(), json!("data/raw"));
        payload.insert("image_count".to_string(), json!(412));
        payload.insert("formats_detected".to_string(), json!(["jpg", "png"]));

        assert!(registry.validate(Stage::Scan, &payload).ok);
    }

    #[test]
    fn test_deploy_target_is_constrained() {
        let registry = SchemaRegistry::standard();
        let mut payload = serde_json::Map::new();
        payload.insert("target".to_string(), json!("mainframe"));
        payload.insert("endpoint".to_string(), json!("https://models.example"));

        let report = registry.validate(Stage::Deploy, &payload);
        assert!(!report.ok);
        assert_eq!(report.type_errors[0].field, "target");
    }
}
