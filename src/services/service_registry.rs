//! Service registry: `"domain.service"` to spec.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{ServiceInvocation, ServiceSpec};

#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, ServiceSpec>>,
}

fn key(domain: &str, service: &str) -> String {
    format!("{domain}.{service}")
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, domain: &str, service: &str, spec: ServiceSpec) {
        self.services
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key(domain, service), spec);
    }

    pub fn unregister(&self, domain: &str, service: &str) {
        self.services
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&key(domain, service));
    }

    pub fn get(&self, domain: &str, service: &str) -> Option<ServiceSpec> {
        self.services
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&key(domain, service))
            .cloned()
    }

    /// Look up and invoke the handler. An unregistered service is an
    /// error, not a silent drop. The caller owns the deadline.
    pub async fn call(&self, invocation: &ServiceInvocation) -> EngineResult<()> {
        let spec = self
            .get(&invocation.domain, &invocation.service)
            .ok_or_else(|| EngineError::UnknownService(invocation.qualified_name()))?;
        spec.handler.call(invocation).await
    }

    /// Snapshot of every registered service, for the API surface.
    pub fn get_all(&self) -> Vec<(String, ServiceSpec)> {
        self.services
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|(name, spec)| (name.clone(), spec.clone()))
            .collect()
    }
}
