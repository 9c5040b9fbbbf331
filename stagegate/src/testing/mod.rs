//! Test support: scripted executors and fixture payloads.
//!
//! Public so downstream crates can exercise their own gates and executors
//! against the same harness the crate's tests use.

mod fixtures;
mod mocks;

pub use fixtures::sample_payload;
pub use mocks::{MockBehavior, MockExecutor};
