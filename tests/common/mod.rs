//! Shared fakes for the end-to-end suites: in-memory repositories and a
//! counting service handler.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use hearth::domain::errors::{EngineError, EngineResult};
use hearth::domain::models::{
    Automation, Device, Entity, Event, IntegrationConfig, ServiceHandler, ServiceInvocation,
    ServiceSpec, TargetSpec,
};
use hearth::domain::ports::{
    AutomationRepository, DeviceRepository, EntityRepository, EventRepository,
    IntegrationConfigRepository,
};

#[derive(Default)]
pub struct InMemoryAutomationRepo {
    pub automations: Mutex<Vec<Automation>>,
    pub last_triggered: Mutex<HashMap<i64, DateTime<Utc>>>,
}

#[async_trait]
impl AutomationRepository for InMemoryAutomationRepo {
    async fn load_all(&self) -> EngineResult<Vec<Automation>> {
        Ok(self.automations.lock().unwrap().clone())
    }

    async fn update_last_triggered(&self, id: i64, when: DateTime<Utc>) -> EngineResult<()> {
        self.last_triggered.lock().unwrap().insert(id, when);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryEventRepo {
    pub saved: Mutex<Vec<Event>>,
}

#[async_trait]
impl EventRepository for InMemoryEventRepo {
    async fn save(&self, event: &Event) -> EngineResult<()> {
        self.saved.lock().unwrap().push(event.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryDeviceRepo {
    pub devices: Mutex<HashMap<String, Device>>,
}

#[async_trait]
impl DeviceRepository for InMemoryDeviceRepo {
    async fn add(&self, device: &Device) -> EngineResult<()> {
        self.devices
            .lock()
            .unwrap()
            .insert(device.id.clone(), device.clone());
        Ok(())
    }

    async fn update(&self, device: &Device) -> EngineResult<()> {
        self.devices
            .lock()
            .unwrap()
            .insert(device.id.clone(), device.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> EngineResult<Option<Device>> {
        Ok(self.devices.lock().unwrap().get(id).cloned())
    }

    async fn get_all(&self) -> EngineResult<Vec<Device>> {
        Ok(self.devices.lock().unwrap().values().cloned().collect())
    }

    async fn get_by_integration(&self, integration_id: i64) -> EngineResult<Vec<Device>> {
        Ok(self
            .devices
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.integration_id == integration_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &str) -> EngineResult<()> {
        self.devices.lock().unwrap().remove(id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryEntityRepo {
    pub entities: Mutex<HashMap<String, Entity>>,
}

#[async_trait]
impl EntityRepository for InMemoryEntityRepo {
    async fn add(&self, entity: &Entity) -> EngineResult<()> {
        self.entities
            .lock()
            .unwrap()
            .insert(entity.external_id.clone(), entity.clone());
        Ok(())
    }

    async fn update(&self, entity: &Entity) -> EngineResult<()> {
        self.entities
            .lock()
            .unwrap()
            .insert(entity.external_id.clone(), entity.clone());
        Ok(())
    }

    async fn get(&self, external_id: &str) -> EngineResult<Option<Entity>> {
        Ok(self.entities.lock().unwrap().get(external_id).cloned())
    }

    async fn get_all(&self) -> EngineResult<Vec<Entity>> {
        Ok(self.entities.lock().unwrap().values().cloned().collect())
    }

    async fn get_by_device(&self, device_id: &str) -> EngineResult<Vec<Entity>> {
        Ok(self
            .entities
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.device_id == device_id)
            .cloned()
            .collect())
    }

    async fn get_by_device_ids(&self, device_ids: &[String]) -> EngineResult<Vec<Entity>> {
        Ok(self
            .entities
            .lock()
            .unwrap()
            .values()
            .filter(|e| device_ids.contains(&e.device_id))
            .cloned()
            .collect())
    }

    async fn delete(&self, external_id: &str) -> EngineResult<()> {
        self.entities.lock().unwrap().remove(external_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryIntegrationConfigRepo {
    pub configs: Mutex<Vec<IntegrationConfig>>,
}

#[async_trait]
impl IntegrationConfigRepository for InMemoryIntegrationConfigRepo {
    async fn save(&self, config: &IntegrationConfig) -> EngineResult<i64> {
        let mut configs = self.configs.lock().unwrap();
        if let Some(existing) = configs
            .iter_mut()
            .find(|c| c.integration_name == config.integration_name)
        {
            let id = existing.id;
            *existing = config.clone();
            existing.id = id;
            return Ok(id);
        }
        let id = configs.len() as i64 + 1;
        let mut stored = config.clone();
        stored.id = id;
        configs.push(stored);
        Ok(id)
    }

    async fn load_all(&self) -> EngineResult<Vec<IntegrationConfig>> {
        Ok(self.configs.lock().unwrap().clone())
    }

    async fn load_by_name(&self, name: &str) -> EngineResult<Option<IntegrationConfig>> {
        Ok(self
            .configs
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.integration_name == name)
            .cloned())
    }

    async fn delete(&self, id: i64) -> EngineResult<()> {
        self.configs.lock().unwrap().retain(|c| c.id != id);
        Ok(())
    }
}

/// Records every invocation; optionally sleeps or fails.
pub struct RecordingHandler {
    pub calls: Arc<AtomicU32>,
    pub invocations: Arc<Mutex<Vec<ServiceInvocation>>>,
    pub delay: Option<Duration>,
    pub fail: bool,
}

impl RecordingHandler {
    pub fn new() -> (Arc<AtomicU32>, Arc<Mutex<Vec<ServiceInvocation>>>, Self) {
        let calls = Arc::new(AtomicU32::new(0));
        let invocations = Arc::new(Mutex::new(Vec::new()));
        (
            calls.clone(),
            invocations.clone(),
            Self {
                calls,
                invocations,
                delay: None,
                fail: false,
            },
        )
    }
}

#[async_trait]
impl ServiceHandler for RecordingHandler {
    async fn call(&self, invocation: &ServiceInvocation) -> EngineResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.invocations.lock().unwrap().push(invocation.clone());
        if self.fail {
            return Err(EngineError::ServiceCall("scripted failure".into()));
        }
        Ok(())
    }
}

pub fn spec_for(handler: impl ServiceHandler + 'static) -> ServiceSpec {
    ServiceSpec {
        handler: Arc::new(handler),
        required_params: HashMap::new(),
        allowed_targets: TargetSpec::default(),
    }
}
