//! Hearth - home-automation engine
//!
//! Ingests events from heterogeneous device integrations, normalizes them
//! into a canonical event model, maintains an in-memory state snapshot for
//! every entity, evaluates user-defined automations against the stream,
//! and dispatches service calls back through integrations with retries,
//! timeouts, and per-automation sequencing.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod integrations;
pub mod services;

// Re-export key types for convenience
pub use application::{Engine, Repositories};
pub use domain::{EngineError, EngineResult};
pub use infrastructure::database::DatabaseConnection;
