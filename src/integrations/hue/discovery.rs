//! Hue discovery: bridge resources to engine devices and entities.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map};
use tracing::debug;

use crate::domain::errors::EngineResult;
use crate::domain::models::{entity_id_for, normalize_name, Device, DeviceType, Entity, EntityType};
use crate::domain::ports::DiscoveryClient;

use super::client::HueClient;
use super::resources::HueResourceIndex;

pub struct HueDiscovery {
    client: Arc<HueClient>,
}

impl HueDiscovery {
    pub fn new(client: Arc<HueClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DiscoveryClient for HueDiscovery {
    async fn discover(&self) -> EngineResult<(Vec<Device>, Vec<Entity>)> {
        let index = HueResourceIndex::load(&self.client).await?;
        let now = Utc::now();

        let mut devices = Vec::new();
        let mut entities = Vec::new();

        for light in self.client.lights().await? {
            let mut metadata = Map::new();
            if let Some(archetype) = &light.metadata.archetype {
                metadata.insert("archetype".to_string(), json!(archetype));
            }
            metadata.insert("owner_rid".to_string(), json!(light.owner.rid));
            metadata.insert("owner_rtype".to_string(), json!(light.owner.rtype));

            devices.push(Device {
                id: light.id.clone(),
                integration_id: 0,
                device_type: DeviceType::Light,
                name: light.metadata.name.clone(),
                metadata,
                enabled: true,
                available: true,
                created_at: now,
            });
            entities.push(Entity {
                external_id: light.id.clone(),
                device_id: light.id.clone(),
                entity_id: entity_id_for(EntityType::Light, &light.metadata.name),
                entity_type: EntityType::Light,
                name: light.metadata.name,
                enabled: true,
                available: true,
                created_at: now,
            });
        }

        for grouped in self.client.grouped_lights().await? {
            let Some(name) = index.grouped_light_name(&grouped.id).map(str::to_string) else {
                debug!(grouped_light = %grouped.id, "no owner name for grouped light, skipping");
                continue;
            };
            devices.push(Device {
                id: grouped.id.clone(),
                integration_id: 0,
                device_type: DeviceType::GroupedLight,
                name: name.clone(),
                metadata: Map::new(),
                enabled: false,
                available: true,
                created_at: now,
            });
            entities.push(Entity {
                external_id: grouped.id.clone(),
                device_id: grouped.id.clone(),
                entity_id: entity_id_for(EntityType::Light, &name),
                entity_type: EntityType::Light,
                name,
                enabled: true,
                available: true,
                created_at: now,
            });
        }

        for scene in self.client.scenes().await? {
            // Scenes attach to the grouped light of their room.
            let Some(owner) = index.scene_owner(&scene.id).map(str::to_string) else {
                debug!(scene = %scene.id, "no grouped_light owner for scene, skipping");
                continue;
            };
            let room = index.grouped_light_name(&owner).unwrap_or_default();
            entities.push(Entity {
                external_id: scene.id.clone(),
                device_id: owner,
                entity_id: format!(
                    "{}.{}_{}",
                    EntityType::Scene.as_str(),
                    normalize_name(room),
                    normalize_name(&scene.metadata.name)
                ),
                entity_type: EntityType::Scene,
                name: scene.metadata.name,
                enabled: false,
                available: true,
                created_at: now,
            });
        }

        Ok((devices, entities))
    }
}
