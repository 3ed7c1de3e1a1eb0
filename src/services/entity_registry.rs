//! Bidirectional mapping between integration-local external ids and
//! canonical entity ids.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::ports::EntityResolver;

/// Safe for concurrent readers during translation and concurrent writers
/// during discovery. The reverse lookup is a scan; discovery is infrequent
/// enough that an inverse index isn't worth carrying.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    mapping: RwLock<HashMap<String, String>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, external_id: &str, entity_id: &str) {
        self.mapping
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(external_id.to_string(), entity_id.to_string());
    }

    pub fn resolve(&self, external_id: &str) -> Option<String> {
        self.mapping
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(external_id)
            .cloned()
    }

    pub fn resolve_external(&self, entity_id: &str) -> Option<String> {
        self.mapping
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .find(|(_, ent)| ent.as_str() == entity_id)
            .map(|(ext, _)| ext.clone())
    }

    pub fn len(&self) -> usize {
        self.mapping
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntityResolver for EntityRegistry {
    fn register(&self, external_id: &str, entity_id: &str) {
        EntityRegistry::register(self, external_id, entity_id);
    }

    fn resolve(&self, external_id: &str) -> Option<String> {
        EntityRegistry::resolve(self, external_id)
    }

    fn resolve_external(&self, entity_id: &str) -> Option<String> {
        EntityRegistry::resolve_external(self, entity_id)
    }
}
