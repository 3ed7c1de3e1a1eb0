//! Service model: specs registered by integrations and the resolved
//! invocation handed to their handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::entity::EntityType;
use crate::domain::models::event::Context;

/// Kind of target a service accepts. Only entities for now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Entity,
}

/// Which targets a service accepts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetSpec {
    #[serde(default)]
    pub types: Vec<TargetType>,
    #[serde(default)]
    pub entity_types: Vec<EntityType>,
}

/// Schema metadata for one required service parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamMetadata {
    pub data_type: String,
    pub description: String,
}

/// One target of a service invocation, carrying both the canonical id and
/// the integration-local id the handler actually needs.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub entity_id: String,
    pub external_id: String,
}

/// A fully resolved service call: templates substituted, targets mapped to
/// external ids, context threaded from the causing event.
#[derive(Debug, Clone)]
pub struct ServiceInvocation {
    pub domain: String,
    pub service: String,
    pub targets: Vec<ResolvedTarget>,
    pub params: Map<String, Value>,
    pub blocking: bool,
    pub context: Context,
}

impl ServiceInvocation {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.domain, self.service)
    }

    pub fn float_param(&self, key: &str) -> EngineResult<f64> {
        self.params
            .get(key)
            .ok_or_else(|| EngineError::MissingParam(key.to_string()))?
            .as_f64()
            .ok_or(EngineError::InvalidParam {
                key: key.to_string(),
                expected: "a number",
            })
    }

    pub fn int_param(&self, key: &str) -> EngineResult<i64> {
        self.params
            .get(key)
            .ok_or_else(|| EngineError::MissingParam(key.to_string()))?
            .as_i64()
            .ok_or(EngineError::InvalidParam {
                key: key.to_string(),
                expected: "an integer",
            })
    }

    pub fn bool_param(&self, key: &str) -> EngineResult<bool> {
        self.params
            .get(key)
            .ok_or_else(|| EngineError::MissingParam(key.to_string()))?
            .as_bool()
            .ok_or(EngineError::InvalidParam {
                key: key.to_string(),
                expected: "a boolean",
            })
    }

    pub fn str_param(&self, key: &str) -> EngineResult<&str> {
        self.params
            .get(key)
            .ok_or_else(|| EngineError::MissingParam(key.to_string()))?
            .as_str()
            .ok_or(EngineError::InvalidParam {
                key: key.to_string(),
                expected: "a string",
            })
    }
}

/// Implemented by integrations for each service they expose. Handlers may
/// do network I/O; the worker pool wraps every call in the action deadline.
#[async_trait]
pub trait ServiceHandler: Send + Sync {
    async fn call(&self, invocation: &ServiceInvocation) -> EngineResult<()>;
}

/// A registered service: its handler plus the schema the API surface
/// exposes.
#[derive(Clone)]
pub struct ServiceSpec {
    pub handler: Arc<dyn ServiceHandler>,
    pub required_params: HashMap<String, ParamMetadata>,
    pub allowed_targets: TargetSpec,
}

impl std::fmt::Debug for ServiceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceSpec")
            .field("required_params", &self.required_params)
            .field("allowed_targets", &self.allowed_targets)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invocation(params: Map<String, Value>) -> ServiceInvocation {
        ServiceInvocation {
            domain: "hue".into(),
            service: "set_brightness".into(),
            targets: vec![],
            params,
            blocking: true,
            context: Context::new(),
        }
    }

    #[test]
    fn test_param_accessors() {
        let mut params = Map::new();
        params.insert("brightness".into(), json!(70.5));
        params.insert("on".into(), json!(true));
        params.insert("scene".into(), json!("movie"));
        let inv = invocation(params);

        assert!((inv.float_param("brightness").unwrap() - 70.5).abs() < f64::EPSILON);
        assert!(inv.bool_param("on").unwrap());
        assert_eq!(inv.str_param("scene").unwrap(), "movie");
        assert!(matches!(
            inv.float_param("missing"),
            Err(EngineError::MissingParam(_))
        ));
        assert!(matches!(
            inv.int_param("scene"),
            Err(EngineError::InvalidParam { .. })
        ));
    }
}
