//! Domain layer: models, errors, and the ports the engine consumes.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{EngineError, EngineResult};
