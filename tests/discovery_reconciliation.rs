//! Discovery reconciliation: repeated runs are idempotent, vanished
//! hardware flips to unavailable, user intent on `enabled` survives.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Map;

use common::{InMemoryDeviceRepo, InMemoryEntityRepo};
use hearth::domain::errors::EngineResult;
use hearth::domain::models::{Device, DeviceType, Entity, EntityType};
use hearth::domain::ports::{DeviceRepository, DiscoveryClient, EntityRepository};
use hearth::services::discovery::DiscoveryOrchestrator;
use hearth::services::entity_registry::EntityRegistry;

struct ScriptedDiscovery {
    result: Mutex<(Vec<Device>, Vec<Entity>)>,
}

#[async_trait]
impl DiscoveryClient for ScriptedDiscovery {
    async fn discover(&self) -> EngineResult<(Vec<Device>, Vec<Entity>)> {
        Ok(self.result.lock().unwrap().clone())
    }
}

fn device(id: &str) -> Device {
    Device {
        id: id.into(),
        integration_id: 0,
        device_type: DeviceType::Light,
        name: id.into(),
        metadata: Map::new(),
        enabled: true,
        available: true,
        created_at: Utc::now(),
    }
}

fn entity(external_id: &str, device_id: &str) -> Entity {
    Entity {
        external_id: external_id.into(),
        device_id: device_id.into(),
        entity_id: format!("light.{external_id}"),
        entity_type: EntityType::Light,
        name: external_id.into(),
        enabled: true,
        available: true,
        created_at: Utc::now(),
    }
}

fn orchestrator(
    device_repo: Arc<InMemoryDeviceRepo>,
    entity_repo: Arc<InMemoryEntityRepo>,
    registry: Arc<EntityRegistry>,
) -> DiscoveryOrchestrator {
    DiscoveryOrchestrator {
        device_repo,
        entity_repo,
        entity_registry: registry,
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_vanished_device_marked_unavailable() {
    let device_repo = Arc::new(InMemoryDeviceRepo::default());
    let entity_repo = Arc::new(InMemoryEntityRepo::default());
    let registry = Arc::new(EntityRegistry::new());
    let orch = orchestrator(device_repo.clone(), entity_repo.clone(), registry.clone());

    let client = ScriptedDiscovery {
        result: Mutex::new((
            vec![device("a"), device("b")],
            vec![entity("ea", "a"), entity("eb", "b")],
        )),
    };

    orch.discover("test", 1, &client).await.unwrap();
    assert_eq!(device_repo.get_all().await.unwrap().len(), 2);
    assert_eq!(registry.resolve("ea").as_deref(), Some("light.ea"));

    // Second run only returns device A.
    *client.result.lock().unwrap() = (vec![device("a")], vec![entity("ea", "a")]);
    orch.discover("test", 1, &client).await.unwrap();

    let a = device_repo.get("a").await.unwrap().unwrap();
    let b = device_repo.get("b").await.unwrap().unwrap();
    assert!(a.available);
    assert!(!b.available, "vanished device flips to unavailable");
    assert!(a.enabled && b.enabled, "enabled untouched");

    let eb = entity_repo.get("eb").await.unwrap().unwrap();
    assert!(!eb.available, "vanished entity flips to unavailable");
}

#[tokio::test]
async fn test_discovery_is_idempotent_and_preserves_enabled() {
    let device_repo = Arc::new(InMemoryDeviceRepo::default());
    let entity_repo = Arc::new(InMemoryEntityRepo::default());
    let registry = Arc::new(EntityRegistry::new());
    let orch = orchestrator(device_repo.clone(), entity_repo.clone(), registry);

    let client = ScriptedDiscovery {
        result: Mutex::new((vec![device("a")], vec![entity("ea", "a")])),
    };

    orch.discover("test", 1, &client).await.unwrap();
    let first = device_repo.get("a").await.unwrap().unwrap();

    // The user disables the device between runs.
    let mut disabled = first.clone();
    disabled.enabled = false;
    device_repo.update(&disabled).await.unwrap();

    orch.discover("test", 1, &client).await.unwrap();
    let second = device_repo.get("a").await.unwrap().unwrap();

    assert!(!second.enabled, "user's enabled choice survives rediscovery");
    assert_eq!(second.created_at, first.created_at);
    assert!(second.available);
    assert_eq!(device_repo.get_all().await.unwrap().len(), 1, "no duplicates");
}

#[tokio::test]
async fn test_discovery_timeout_is_bounded() {
    struct HangingDiscovery;

    #[async_trait]
    impl DiscoveryClient for HangingDiscovery {
        async fn discover(&self) -> EngineResult<(Vec<Device>, Vec<Entity>)> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok((vec![], vec![]))
        }
    }

    let orch = DiscoveryOrchestrator {
        device_repo: Arc::new(InMemoryDeviceRepo::default()),
        entity_repo: Arc::new(InMemoryEntityRepo::default()),
        entity_registry: Arc::new(EntityRegistry::new()),
        timeout: Duration::from_millis(50),
    };

    let err = orch.discover("test", 1, &HangingDiscovery).await.unwrap_err();
    assert!(matches!(
        err,
        hearth::domain::errors::EngineError::DiscoveryTimeout(_)
    ));
}
