//! Fixture payloads satisfying the standard per-stage schemas.

use crate::core::Stage;
use crate::executor::RawResult;
use serde_json::json;

/// A payload for `stage` that passes the standard schema and the standard
/// exit gates. `init` has no artifact; its payload is empty.
#[must_use]
pub fn sample_payload(stage: Stage) -> RawResult {
    let value = match stage {
        Stage::Init => json!({}),
        Stage::Scan => json!({
            "image_dir": "data/raw",
            "image_count": 412,
            "formats_detected": ["jpg", "png"],
        }),
        Stage::Validate => json!({
            "images_valid": 400,
            "images_rejected": 12,
            "quality_report_path": "reports/quality.json",
        }),
        Stage::Annotate => json!({
            "annotation_source": "classic",
            "annotation_format": "yolo",
            "labeled_count": 400,
        }),
        Stage::Split => json!({
            "dataset_path": "data/processed",
            "data_config_path": "data/processed/data.json",
            "splits": {"train": 280, "val": 80, "test": 40},
            "classes": ["frog", "toad"],
        }),
        Stage::TrainConfig => json!({
            "architecture": "yolov8n",
            "hyperparameters": {"epochs": 100, "batch": 16, "imgsz": 640},
            "experiment_id": "exp-001",
        }),
        Stage::TrainExec => json!({
            "model_path": "runs/exp-001/weights/best.pt",
            "training_metrics": {"map50": 0.81, "box_loss": 0.42},
            "dataset_hash": "9c4f1d2a",
            "random_seed": 42,
        }),
        Stage::Evaluate => json!({
            "report_path": "reports/evaluation.json",
            "metrics": {"map50": 0.79, "precision": 0.82, "recall": 0.74},
            "deployment_ready": true,
            "recommended_threshold": 0.25,
        }),
        Stage::Deploy => json!({
            "target": "cloud",
            "endpoint": "https://models.example/frogspot/v1",
            "benchmark": {"latency_ms": 34.0},
        }),
    };

    match value {
        serde_json::Value::Object(map) => map,
        _ => RawResult::new(),
    }
}
