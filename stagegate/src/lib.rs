//! # Stagegate
//!
//! A durable, stage-gated orchestration core for multi-stage ML project
//! pipelines (data preparation, training, evaluation, deployment).
//!
//! Stagegate does not train models or process images; it decides *when*
//! stage logic may run and *what* it must produce before the next stage may
//! begin:
//!
//! - **Stage gating**: declarative entry/exit checklists with blocking and
//!   warning severities, evaluated fail-closed
//! - **Typed handoffs**: per-stage artifact schemas validated structurally
//!   before anything is committed
//! - **Durable state**: a versioned state document mutated only through
//!   atomic commits, so no partial transition is ever observable
//! - **Recovery**: startup verification with safe-resume detection and
//!   orphaned-output reporting
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagegate::prelude::*;
//! use std::sync::Arc;
//!
//! let store = Arc::new(JsonStateStore::new(".stagegate/state.json"));
//! let controller = TransitionController::new(store);
//!
//! controller.init(ProjectMetadata::new("frogspot"))?;
//! let result = controller
//!     .advance(Stage::Scan, &scanner, TransitionOptions::new())
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod checklist;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod executor;
pub mod observability;
pub mod projects;
pub mod recovery;
pub mod schema;
pub mod store;
pub mod testing;
pub mod transition;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancelToken;
    pub use crate::checklist::{
        Checklist, ChecklistItem, EvaluationReport, GateSet, ItemOutcome, Severity,
    };
    pub use crate::config::ProjectConfig;
    pub use crate::core::{
        HandoffArtifact, PipelinePhase, PipelineState, ProjectMetadata, Stage, STAGE_ORDER,
    };
    pub use crate::errors::PipelineError;
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink, PipelineEvent};
    pub use crate::executor::{ExecutionInput, FixedExecutor, FnExecutor, RawResult, StageExecutor};
    pub use crate::projects::ProjectManager;
    pub use crate::recovery::{RecoveryManager, RecoveryPlan};
    pub use crate::schema::{ArtifactSchema, FieldSpec, FieldType, SchemaRegistry, ValidationReport};
    pub use crate::store::{JsonStateStore, MemoryStateStore, StateStore};
    pub use crate::transition::{TransitionController, TransitionOptions, TransitionResult};
    pub use crate::utils::{generate_uuid, iso_timestamp, Timestamp};
}
