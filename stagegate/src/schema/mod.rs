//! Artifact schema registry.
//!
//! Declares, per producing stage, the required payload fields and their
//! expected shapes, and validates candidate payloads structurally before
//! they can become committed handoff artifacts. Validation is pure: no
//! business-logic checks live here (those belong to checklists).

mod standard;

pub use standard::standard_schemas;

use crate::core::{HandoffArtifact, Stage};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Expected shape of a payload field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// A JSON string.
    String,
    /// A JSON number.
    Number,
    /// A JSON boolean.
    Bool,
    /// A string restricted to the given values.
    Enum(Vec<String>),
    /// A nested JSON object.
    Object,
    /// A JSON array.
    List,
}

impl FieldType {
    /// Returns true if `value` has this shape.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::Enum(allowed) => value
                .as_str()
                .is_some_and(|s| allowed.iter().any(|a| a == s)),
            Self::Object => value.is_object(),
            Self::List => value.is_array(),
        }
    }

    fn describe(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "list",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Number => f.write_str("number"),
            Self::Bool => f.write_str("bool"),
            Self::Enum(allowed) => write!(f, "enum({})", allowed.join("|")),
            Self::Object => f.write_str("object"),
            Self::List => f.write_str("list"),
        }
    }
}

/// One declared payload field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name in the payload.
    pub name: String,
    /// Expected shape.
    pub field_type: FieldType,
    /// Whether the field must be present and non-null.
    pub required: bool,
}

impl FieldSpec {
    /// Declares a required field.
    #[must_use]
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
        }
    }

    /// Declares an optional field (type-checked only when present).
    #[must_use]
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
        }
    }
}

/// Declared schema for the artifact a stage must produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSchema {
    /// The producing stage.
    pub stage: Stage,
    /// Declared fields, required subset first by convention.
    pub fields: Vec<FieldSpec>,
}

impl ArtifactSchema {
    /// Creates an empty schema for `stage`.
    #[must_use]
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            fields: Vec::new(),
        }
    }

    /// Adds a field declaration.
    #[must_use]
    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Validates a candidate payload against this schema.
    ///
    /// Missing and null required fields are reported as missing; present
    /// fields of the wrong shape are reported as type errors. There is no
    /// partial acceptance.
    #[must_use]
    pub fn validate(&self, payload: &serde_json::Map<String, Value>) -> ValidationReport {
        let mut missing_fields = Vec::new();
        let mut type_errors = Vec::new();

        for spec in &self.fields {
            match payload.get(&spec.name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        missing_fields.push(spec.name.clone());
                    }
                }
                Some(value) => {
                    if !spec.field_type.matches(value) {
                        type_errors.push(TypeMismatch {
                            field: spec.name.clone(),
                            expected: spec.field_type.to_string(),
                            found: FieldType::describe(value).to_string(),
                        });
                    }
                }
            }
        }

        let ok = missing_fields.is_empty() && type_errors.is_empty();
        ValidationReport {
            stage: self.stage,
            ok,
            missing_fields,
            type_errors,
        }
    }
}

/// A field present with the wrong shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeMismatch {
    /// Offending field name.
    pub field: String,
    /// Declared type.
    pub expected: String,
    /// Observed type.
    pub found: String,
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, found {}",
            self.field, self.expected, self.found
        )
    }
}

/// Itemized result of validating a payload against a stage schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// The stage whose schema was applied.
    pub stage: Stage,
    /// True when the payload satisfies every declared field.
    pub ok: bool,
    /// Required fields absent or null.
    pub missing_fields: Vec<String>,
    /// Fields present with the wrong shape.
    pub type_errors: Vec<TypeMismatch>,
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ok {
            return write!(f, "payload for '{}' is valid", self.stage);
        }
        let mut parts = Vec::new();
        if !self.missing_fields.is_empty() {
            parts.push(format!("missing: {}", self.missing_fields.join(", ")));
        }
        if !self.type_errors.is_empty() {
            let errors: Vec<String> = self.type_errors.iter().map(ToString::to_string).collect();
            parts.push(format!("type errors: {}", errors.join("; ")));
        }
        write!(f, "payload for '{}' invalid ({})", self.stage, parts.join("; "))
    }
}

/// Registry of artifact schemas, keyed by producing stage.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    entries: RwLock<HashMap<Stage, ArtifactSchema>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry preloaded with the standard per-stage schemas.
    #[must_use]
    pub fn standard() -> Self {
        let registry = Self::new();
        for schema in standard_schemas() {
            registry.register(schema);
        }
        registry
    }

    /// Registers or replaces the schema for a stage.
    pub fn register(&self, schema: ArtifactSchema) {
        self.entries.write().insert(schema.stage, schema);
    }

    /// Returns a copy of the schema registered for `stage`.
    #[must_use]
    pub fn get(&self, stage: Stage) -> Option<ArtifactSchema> {
        self.entries.read().get(&stage).cloned()
    }

    /// Validates a candidate payload for `stage`.
    ///
    /// A stage with no registered schema fails closed: its payloads cannot
    /// be accepted until a schema is declared.
    #[must_use]
    pub fn validate(
        &self,
        stage: Stage,
        payload: &serde_json::Map<String, Value>,
    ) -> ValidationReport {
        match self.get(stage) {
            Some(schema) => schema.validate(payload),
            None => ValidationReport {
                stage,
                ok: false,
                missing_fields: vec![format!("<no schema registered for '{stage}'>")],
                type_errors: Vec::new(),
            },
        }
    }

    /// Validates `payload` and, on success, builds the typed handoff
    /// artifact for `stage`.
    ///
    /// # Errors
    ///
    /// Returns the itemized report when the payload is structurally invalid.
    pub fn build_artifact(
        &self,
        stage: Stage,
        payload: serde_json::Map<String, Value>,
    ) -> Result<HandoffArtifact, ValidationReport> {
        let report = self.validate(stage, &payload);
        if !report.ok {
            return Err(report);
        }
        Ok(HandoffArtifact::new(stage, payload))
    }

    /// Number of registered schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true when no schemas are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scan_schema() -> ArtifactSchema {
        ArtifactSchema::new(Stage::Scan)
            .with_field(FieldSpec::required("image_dir", FieldType::String))
            .with_field(FieldSpec::required("image_count", FieldType::Number))
            .with_field(FieldSpec::optional("formats_detected", FieldType::List))
    }

    fn payload(entries: &[(&str, Value)]) -> serde_json::Map<String, Value> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_valid_payload() {
        let report = scan_schema().validate(&payload(&[
            ("image_dir", json!("data/raw")),
            ("image_count", json!(42)),
        ]));
        assert!(report.ok);
        assert!(report.missing_fields.is_empty());
        assert!(report.type_errors.is_empty());
    }

    #[test]
    fn test_missing_required_field() {
        let report = scan_schema().validate(&payload(&[("image_dir", json!("data/raw"))]));
        assert!(!report.ok);
        assert_eq!(report.missing_fields, vec!["image_count".to_string()]);
    }

    #[test]
    fn test_null_counts_as_missing() {
        let report = scan_schema().validate(&payload(&[
            ("image_dir", json!("data/raw")),
            ("image_count", Value::Null),
        ]));
        assert!(!report.ok);
        assert_eq!(report.missing_fields, vec!["image_count".to_string()]);
    }

    #[test]
    fn test_wrong_type_itemized() {
        let report = scan_schema().validate(&payload(&[
            ("image_dir", json!(7)),
            ("image_count", json!("many")),
        ]));
        assert!(!report.ok);
        assert_eq!(report.type_errors.len(), 2);
        assert_eq!(report.type_errors[0].field, "image_dir");
        assert_eq!(report.type_errors[0].expected, "string");
        assert_eq!(report.type_errors[0].found, "number");
    }

    #[test]
    fn test_optional_field_type_checked_when_present() {
        let report = scan_schema().validate(&payload(&[
            ("image_dir", json!("data/raw")),
            ("image_count", json!(42)),
            ("formats_detected", json!("jpg")),
        ]));
        assert!(!report.ok);
        assert_eq!(report.type_errors[0].field, "formats_detected");
    }

    #[test]
    fn test_enum_membership() {
        let schema = ArtifactSchema::new(Stage::Annotate).with_field(FieldSpec::required(
            "annotation_format",
            FieldType::Enum(vec!["yolo".into(), "coco".into(), "voc".into()]),
        ));

        let ok = schema.validate(&payload(&[("annotation_format", json!("coco"))]));
        assert!(ok.ok);

        let bad = schema.validate(&payload(&[("annotation_format", json!("pascal"))]));
        assert!(!bad.ok);
    }

    #[test]
    fn test_registry_fails_closed_without_schema() {
        let registry = SchemaRegistry::new();
        let report = registry.validate(Stage::Scan, &payload(&[]));
        assert!(!report.ok);
    }

    #[test]
    fn test_build_artifact_rejects_invalid() {
        let registry = SchemaRegistry::new();
        registry.register(scan_schema());

        let err = registry
            .build_artifact(Stage::Scan, payload(&[("image_dir", json!("x"))]))
            .unwrap_err();
        assert_eq!(err.missing_fields, vec!["image_count".to_string()]);

        let artifact = registry
            .build_artifact(
                Stage::Scan,
                payload(&[("image_dir", json!("x")), ("image_count", json!(3))]),
            )
            .unwrap();
        assert_eq!(artifact.source_stage, Stage::Scan);
        assert!(artifact.verify_checksum());
    }

    #[test]
    fn test_report_display() {
        let report = scan_schema().validate(&payload(&[("image_dir", json!(7))]));
        let rendered = report.to_string();
        assert!(rendered.contains("missing: image_count"));
        assert!(rendered.contains("image_dir: expected string, found number"));
    }
}
