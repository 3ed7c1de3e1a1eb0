//! Discovery orchestration.
//!
//! One-shot per call: ask the integration what exists, upsert it
//! (preserving user intent on `enabled` and the original `created_at`),
//! flip anything that vanished to unavailable, and refresh the entity
//! registry.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::ports::{DeviceRepository, DiscoveryClient, EntityRepository};
use crate::services::entity_registry::EntityRegistry;

pub struct DiscoveryOrchestrator {
    pub device_repo: Arc<dyn DeviceRepository>,
    pub entity_repo: Arc<dyn EntityRepository>,
    pub entity_registry: Arc<EntityRegistry>,
    pub timeout: Duration,
}

impl DiscoveryOrchestrator {
    /// Run discovery for one integration and reconcile the result.
    pub async fn discover(
        &self,
        integration_name: &str,
        integration_id: i64,
        client: &dyn DiscoveryClient,
    ) -> EngineResult<()> {
        let (devices, entities) = tokio::time::timeout(self.timeout, client.discover())
            .await
            .map_err(|_| EngineError::DiscoveryTimeout(self.timeout))??;

        let mut discovered_devices = HashSet::new();
        for mut device in devices {
            device.available = true;
            device.integration_id = integration_id;
            discovered_devices.insert(device.id.clone());

            match self.device_repo.get(&device.id).await? {
                Some(existing) => {
                    device.enabled = existing.enabled;
                    device.created_at = existing.created_at;
                    self.device_repo.update(&device).await?;
                }
                None => {
                    info!(integration = integration_name, device = %device.name, "adding new device");
                    self.device_repo.add(&device).await?;
                }
            }
        }

        let mut discovered_entities = HashSet::new();
        for mut entity in entities {
            entity.available = true;
            discovered_entities.insert(entity.external_id.clone());

            match self.entity_repo.get(&entity.external_id).await? {
                Some(existing) => {
                    entity.enabled = existing.enabled;
                    entity.created_at = existing.created_at;
                    self.entity_repo.update(&entity).await?;
                }
                None => {
                    info!(integration = integration_name, entity = %entity.name, "adding new entity");
                    self.entity_repo.add(&entity).await?;
                }
            }
        }

        self.mark_unavailable(integration_id, &discovered_devices, &discovered_entities)
            .await?;
        self.refresh_registry().await?;

        info!(integration = integration_name, "discovery completed");
        Ok(())
    }

    /// Anything this integration owns that discovery didn't return and
    /// that is currently available gets flipped to unavailable.
    async fn mark_unavailable(
        &self,
        integration_id: i64,
        discovered_devices: &HashSet<String>,
        discovered_entities: &HashSet<String>,
    ) -> EngineResult<()> {
        let all_devices = self.device_repo.get_by_integration(integration_id).await?;
        if all_devices.is_empty() {
            return Ok(());
        }

        let device_ids: Vec<String> = all_devices.iter().map(|d| d.id.clone()).collect();
        let all_entities = self.entity_repo.get_by_device_ids(&device_ids).await?;

        for mut device in all_devices {
            if device.available && !discovered_devices.contains(&device.id) {
                device.available = false;
                if let Err(err) = self.device_repo.update(&device).await {
                    warn!(device = %device.name, error = %err, "failed to mark device unavailable");
                }
            }
        }

        for mut entity in all_entities {
            if entity.available && !discovered_entities.contains(&entity.external_id) {
                entity.available = false;
                if let Err(err) = self.entity_repo.update(&entity).await {
                    warn!(entity = %entity.name, error = %err, "failed to mark entity unavailable");
                }
            }
        }
        Ok(())
    }

    /// Re-register every known entity's external-id mapping.
    pub async fn refresh_registry(&self) -> EngineResult<()> {
        let entities = self.entity_repo.get_all().await?;
        let count = entities.len();
        for entity in entities {
            self.entity_registry
                .register(&entity.external_id, &entity.entity_id);
        }
        info!(entity_count = count, "refreshed entity registry");
        Ok(())
    }
}
