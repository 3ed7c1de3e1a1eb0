//! Philips Hue integration: bridge client, SSE event source, translator,
//! services, and discovery.

pub mod client;
pub mod discovery;
pub mod event_source;
pub mod resources;
pub mod services;
pub mod translator;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::ports::integration::{
    ConfigField, ConfigFieldType, IntegrationDescriptor, IntegrationFactory, IntegrationHandles,
    IntegrationInstance, PassthroughAggregator, CAPABILITY_CONTROL, CAPABILITY_DISCOVERY,
    CAPABILITY_LIGHTING,
};

use client::HueClient;
use discovery::HueDiscovery;
use event_source::HueEventSource;
use resources::HueResourceIndex;
use translator::HueTranslator;

struct HueFactory;

fn required_str<'a>(config: &'a Map<String, Value>, key: &str) -> EngineResult<&'a str> {
    config
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EngineError::InvalidConfig(format!("hue config missing {key}")))
}

#[async_trait]
impl IntegrationFactory for HueFactory {
    async fn create(
        &self,
        user_config: &Map<String, Value>,
        handles: IntegrationHandles,
    ) -> EngineResult<IntegrationInstance> {
        let ip = required_str(user_config, "bridge_ip")?;
        let app_key = required_str(user_config, "app_key")?;

        let client = Arc::new(HueClient::new(ip, app_key)?);
        let resources = HueResourceIndex::load(&client).await?;

        Ok(IntegrationInstance {
            source: Box::new(HueEventSource::new(ip, app_key)?),
            translator: Box::new(HueTranslator::new(
                handles.state,
                handles.entities,
                resources,
            )),
            aggregator: Box::new(PassthroughAggregator),
            discovery: Arc::new(HueDiscovery::new(client.clone())),
            services: services::export_services(&client),
        })
    }
}

/// Descriptor for registration with the engine.
pub fn descriptor() -> IntegrationDescriptor {
    let mut config_schema = HashMap::new();
    config_schema.insert(
        "bridge_ip".to_string(),
        ConfigField {
            label: "Bridge IP".to_string(),
            description: "IP address of the Hue bridge".to_string(),
            field_type: ConfigFieldType::Text,
            required: true,
            default: None,
        },
    );
    config_schema.insert(
        "app_key".to_string(),
        ConfigField {
            label: "Application key".to_string(),
            description: "Key generated by pressing the bridge link button".to_string(),
            field_type: ConfigFieldType::Text,
            required: true,
            default: None,
        },
    );

    IntegrationDescriptor {
        name: "hue".to_string(),
        display_name: "Philips Hue".to_string(),
        description: "Philips Hue bridge: lights, grouped lights, and scenes".to_string(),
        version: "1.0.0".to_string(),
        capabilities: vec![CAPABILITY_LIGHTING, CAPABILITY_CONTROL, CAPABILITY_DISCOVERY],
        config_schema,
        factory: Arc::new(HueFactory),
    }
}
