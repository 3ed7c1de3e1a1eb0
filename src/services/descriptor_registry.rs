//! Registry of available integration descriptors.
//!
//! Built inside the engine and injected where needed; nothing here is a
//! process global.

use std::collections::HashMap;

use crate::domain::ports::IntegrationDescriptor;

#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    available: HashMap<String, IntegrationDescriptor>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: IntegrationDescriptor) {
        self.available.insert(descriptor.name.clone(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&IntegrationDescriptor> {
        self.available.get(name)
    }

    pub fn list(&self) -> Vec<&IntegrationDescriptor> {
        self.available.values().collect()
    }
}
