//! Read/write handles handed to integrations.
//!
//! Translators need the current state snapshot and the external-id mapping
//! to build complete `state_changed` events; these traits are the narrow
//! views they get, implemented by the engine-owned cache and registry.

use crate::domain::models::State;

/// Snapshot access to the engine's state cache.
pub trait StateStore: Send + Sync {
    fn get(&self, entity_id: &str) -> Option<State>;

    fn set(&self, entity_id: &str, state: State);

    fn get_all(&self) -> Vec<State>;
}

/// Mapping between integration-local external ids and canonical entity
/// ids.
pub trait EntityResolver: Send + Sync {
    fn register(&self, external_id: &str, entity_id: &str);

    fn resolve(&self, external_id: &str) -> Option<String>;

    fn resolve_external(&self, entity_id: &str) -> Option<String>;
}
