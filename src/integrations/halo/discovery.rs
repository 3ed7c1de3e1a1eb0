//! Halo discovery: the configured pages define what exists.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Map;

use crate::domain::errors::EngineResult;
use crate::domain::models::{normalize_name, Device, DeviceType, Entity, EntityType};
use crate::domain::ports::DiscoveryClient;

use super::config::HaloConfig;

pub struct HaloDiscovery {
    config: HaloConfig,
}

impl HaloDiscovery {
    pub fn new(config: HaloConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DiscoveryClient for HaloDiscovery {
    async fn discover(&self) -> EngineResult<(Vec<Device>, Vec<Entity>)> {
        let now = Utc::now();

        let device = Device {
            id: self.config.id.clone(),
            integration_id: 0,
            device_type: DeviceType::Remote,
            name: "Beoremote Halo".to_string(),
            metadata: Map::new(),
            enabled: true,
            available: true,
            created_at: now,
        };

        let entities = self
            .config
            .buttons()
            .map(|button| Entity {
                external_id: button.id.clone(),
                device_id: self.config.id.clone(),
                entity_id: format!(
                    "{}.halo_{}",
                    EntityType::Button.as_str(),
                    normalize_name(&button.title)
                ),
                entity_type: EntityType::Button,
                name: button.title.clone(),
                enabled: true,
                available: true,
                created_at: now,
            })
            .collect();

        Ok((vec![device], entities))
    }
}
