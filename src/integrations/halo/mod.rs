//! Bang & Olufsen Beoremote Halo integration: websocket client, event
//! source, translator, wheel aggregator, services, and discovery.

pub mod aggregator;
pub mod client;
pub mod config;
pub mod discovery;
pub mod event_source;
pub mod services;
pub mod translator;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::ports::integration::{
    ConfigField, ConfigFieldType, IntegrationDescriptor, IntegrationFactory, IntegrationHandles,
    IntegrationInstance, CAPABILITY_CONTROL, CAPABILITY_DISCOVERY,
};

use aggregator::WheelAggregator;
use client::HaloClient;
use config::HaloConfig;
use discovery::HaloDiscovery;
use event_source::HaloEventSource;
use translator::HaloTranslator;

struct HaloFactory;

#[async_trait]
impl IntegrationFactory for HaloFactory {
    async fn create(
        &self,
        user_config: &Map<String, Value>,
        handles: IntegrationHandles,
    ) -> EngineResult<IntegrationInstance> {
        let ip = user_config
            .get("ip")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| EngineError::InvalidConfig("halo config missing ip".into()))?;
        let port = user_config
            .get("port")
            .and_then(Value::as_u64)
            .unwrap_or(8080);
        let port = u16::try_from(port)
            .map_err(|_| EngineError::InvalidConfig(format!("invalid halo port: {port}")))?;
        let halo_config = HaloConfig::from_user_config(user_config)?;

        let client = Arc::new(HaloClient::new(ip, port, halo_config.clone()));

        Ok(IntegrationInstance {
            source: Box::new(HaloEventSource::new(ip, port, halo_config.clone())),
            translator: Box::new(HaloTranslator::new(handles.state, handles.entities)),
            aggregator: Box::new(WheelAggregator::new()),
            discovery: Arc::new(HaloDiscovery::new(halo_config)),
            services: services::export_services(&client),
        })
    }
}

/// Descriptor for registration with the engine.
pub fn descriptor() -> IntegrationDescriptor {
    let mut config_schema = HashMap::new();
    config_schema.insert(
        "ip".to_string(),
        ConfigField {
            label: "Controller IP".to_string(),
            description: "IP address of the Beoremote Halo".to_string(),
            field_type: ConfigFieldType::Text,
            required: true,
            default: None,
        },
    );
    config_schema.insert(
        "port".to_string(),
        ConfigField {
            label: "Port".to_string(),
            description: "Websocket port".to_string(),
            field_type: ConfigFieldType::Text,
            required: false,
            default: Some(json!(8080)),
        },
    );
    config_schema.insert(
        "configuration".to_string(),
        ConfigField {
            label: "Button configuration".to_string(),
            description: "Pages and buttons deployed to the controller".to_string(),
            field_type: ConfigFieldType::Text,
            required: true,
            default: None,
        },
    );

    IntegrationDescriptor {
        name: "halo".to_string(),
        display_name: "Beoremote Halo".to_string(),
        description: "Bang & Olufsen Beoremote Halo remote controller".to_string(),
        version: "1.0.0".to_string(),
        capabilities: vec![CAPABILITY_CONTROL, CAPABILITY_DISCOVERY],
        config_schema,
        factory: Arc::new(HaloFactory),
    }
}
