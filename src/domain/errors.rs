//! Domain errors for the hearth engine.

use std::time::Duration;

use thiserror::Error;

/// Engine-level errors, tagged by failure kind.
///
/// Anything recoverable within a bounded scope (a single event, a single
/// automation, a single service call) is handled locally by the component
/// that hit it; these variants exist so the log line and the caller can
/// tell the kinds apart.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("integration {0} is not registered")]
    UnknownIntegration(String),

    #[error("integration {0} is not loaded")]
    IntegrationNotLoaded(String),

    #[error("service {0} is not registered")]
    UnknownService(String),

    #[error("entity {0} is not in the registry")]
    UnknownEntity(String),

    #[error("no state cached for entity {0}")]
    MissingState(String),

    #[error("entity {entity_id} has no attribute {attribute}")]
    MissingAttribute {
        entity_id: String,
        attribute: String,
    },

    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    #[error("translation failed: {0}")]
    Translation(String),

    #[error("event source failed: {0}")]
    Source(String),

    #[error("discovery failed: {0}")]
    Discovery(String),

    #[error("discovery timed out after {0:?}")]
    DiscoveryTimeout(Duration),

    #[error("service call failed: {0}")]
    ServiceCall(String),

    #[error("service call timed out after {0:?}")]
    ServiceCallTimeout(Duration),

    #[error("missing param: {0}")]
    MissingParam(String),

    #[error("param {key} must be {expected}")]
    InvalidParam { key: String, expected: &'static str },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("shutting down")]
    Cancelled,
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        EngineError::Http(err.to_string())
    }
}
