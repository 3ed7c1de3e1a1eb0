//! Engine façade: wiring, integration lifecycle, and shutdown.
//!
//! Owns the state cache, registries, bus, channels, and every long-lived
//! task. Repositories and integration descriptors are injected at
//! construction; nothing in here reaches for process globals.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{Config, Event, IntegrationConfig};
use crate::domain::ports::{
    AutomationRepository, DeviceRepository, DiscoveryClient, EntityRepository, EventRepository,
    IntegrationConfigRepository, IntegrationDescriptor, IntegrationHandles,
};
use crate::services::descriptor_registry::DescriptorRegistry;
use crate::services::discovery::DiscoveryOrchestrator;
use crate::services::entity_registry::EntityRegistry;
use crate::services::evaluator::AutomationEvaluator;
use crate::services::event_bus::{ProcessedEventBus, SubscriberId};
use crate::services::pipeline::EventPipeline;
use crate::services::processor::EventProcessor;
use crate::services::service_registry::ServiceRegistry;
use crate::services::state_cache::StateCache;
use crate::services::task_queue::{task_channel, WorkerPool};

/// The persistence interfaces the engine consumes.
#[derive(Clone)]
pub struct Repositories {
    pub automations: Arc<dyn AutomationRepository>,
    pub events: Arc<dyn EventRepository>,
    pub devices: Arc<dyn DeviceRepository>,
    pub entities: Arc<dyn EntityRepository>,
    pub integration_configs: Arc<dyn IntegrationConfigRepository>,
}

struct LoadedIntegration {
    config_id: i64,
    discovery: Arc<dyn DiscoveryClient>,
    service_names: Vec<String>,
    cancel: CancellationToken,
}

pub struct Engine {
    config: Config,
    repos: Repositories,
    descriptors: DescriptorRegistry,

    state_cache: Arc<StateCache>,
    entity_registry: Arc<EntityRegistry>,
    service_registry: Arc<ServiceRegistry>,
    bus: Arc<ProcessedEventBus>,
    evaluator: Arc<AutomationEvaluator>,

    event_tx: mpsc::Sender<Event>,
    event_rx: Mutex<Option<mpsc::Receiver<Event>>>,

    integrations: Mutex<HashMap<String, LoadedIntegration>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl Engine {
    pub fn new(config: Config, repos: Repositories, descriptors: DescriptorRegistry) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
        Self {
            config,
            repos,
            descriptors,
            state_cache: Arc::new(StateCache::new()),
            entity_registry: Arc::new(EntityRegistry::new()),
            service_registry: Arc::new(ServiceRegistry::new()),
            bus: Arc::new(ProcessedEventBus::new()),
            evaluator: Arc::new(AutomationEvaluator::new()),
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            integrations: Mutex::new(HashMap::new()),
            handles: Mutex::new(Vec::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Load automations and the entity registry from storage. Called once
    /// before `start`.
    pub async fn init(&self) -> EngineResult<()> {
        self.reload_automations().await?;
        self.refresh_entity_registry().await?;
        Ok(())
    }

    /// Spawn the event processor and the worker pool.
    pub fn start(&self) {
        let event_rx = self
            .event_rx
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        let Some(event_rx) = event_rx else {
            warn!("engine already started");
            return;
        };

        let (task_tx, task_rx) = task_channel();

        let pool = WorkerPool::new(
            self.service_registry.clone(),
            self.config.actions.clone(),
            self.cancel.clone(),
        );
        let mut handles = pool.spawn(self.config.workers, task_rx);

        let processor = EventProcessor {
            state_cache: self.state_cache.clone(),
            entity_registry: self.entity_registry.clone(),
            evaluator: self.evaluator.clone(),
            bus: self.bus.clone(),
            automation_repo: self.repos.automations.clone(),
            event_repo: self.repos.events.clone(),
            task_tx,
            cancel: self.cancel.clone(),
        };
        handles.push(tokio::spawn(async move {
            processor.run(event_rx).await;
        }));

        // Time ticker so time_changed triggers have something to fire on.
        let ticker_tx = self.event_tx.clone();
        let ticker_cancel = self.cancel.clone();
        handles.push(tokio::spawn(async move {
            let period = Duration::from_secs(60);
            let mut tick = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = ticker_cancel.cancelled() => return,
                    _ = tick.tick() => {
                        let event = Event::time_changed(chrono::Utc::now());
                        if ticker_tx.try_send(event).is_err() {
                            warn!("engine channel full, dropping time_changed event");
                        }
                    }
                }
            }
        }));

        self.handles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .extend(handles);
        info!(workers = self.config.workers, "engine started");
    }

    /// Swap in the current automation set from storage.
    pub async fn reload_automations(&self) -> EngineResult<()> {
        let automations = self.repos.automations.load_all().await?;
        info!(count = automations.len(), "automations loaded");
        self.evaluator.swap(automations);
        Ok(())
    }

    /// Re-register every persisted entity's external-id mapping.
    pub async fn refresh_entity_registry(&self) -> EngineResult<()> {
        self.discovery_orchestrator().refresh_registry().await
    }

    /// Enable an integration with the given user config. The integration
    /// is not loaded; call `load_integration` for that.
    pub async fn add_integration(
        &self,
        name: &str,
        user_config: Map<String, Value>,
    ) -> EngineResult<i64> {
        let descriptor = self
            .descriptors
            .get(name)
            .ok_or_else(|| EngineError::UnknownIntegration(name.to_string()))?;
        let user_config = validate_user_config(descriptor, user_config)?;

        let config = IntegrationConfig {
            id: 0,
            integration_name: descriptor.name.clone(),
            display_name: descriptor.display_name.clone(),
            user_config,
            enabled: true,
            created_at: chrono::Utc::now(),
        };
        self.repos.integration_configs.save(&config).await
    }

    /// Instantiate a persisted integration: create the instance, register
    /// its services, and start its pipeline.
    pub async fn load_integration(&self, name: &str) -> EngineResult<()> {
        let config = self
            .repos
            .integration_configs
            .load_by_name(name)
            .await?
            .ok_or_else(|| EngineError::UnknownIntegration(name.to_string()))?;
        let descriptor = self
            .descriptors
            .get(name)
            .ok_or_else(|| EngineError::UnknownIntegration(name.to_string()))?;

        let handles = IntegrationHandles {
            state: self.state_cache.clone(),
            entities: self.entity_registry.clone(),
        };
        let instance = descriptor
            .factory
            .create(&config.user_config, handles)
            .await?;

        let mut service_names = Vec::with_capacity(instance.services.len());
        for (service_name, spec) in &instance.services {
            self.service_registry
                .register(&descriptor.name, service_name, spec.clone());
            service_names.push(service_name.clone());
        }

        let pipeline_cancel = self.cancel.child_token();
        let pipeline = EventPipeline {
            integration: name.to_string(),
            source: instance.source,
            translator: instance.translator,
            aggregator: instance.aggregator,
            engine_tx: self.event_tx.clone(),
            config: self.config.pipeline.clone(),
            cancel: pipeline_cancel.clone(),
        };
        let pipeline_name = name.to_string();
        let handle = tokio::spawn(async move {
            if let Err(err) = pipeline.run().await {
                error!(integration = %pipeline_name, error = %err, "event pipeline exited with error");
            }
        });
        self.handles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(handle);

        self.integrations
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(
                name.to_string(),
                LoadedIntegration {
                    config_id: config.id,
                    discovery: instance.discovery,
                    service_names,
                    cancel: pipeline_cancel,
                },
            );

        info!(integration = %descriptor.display_name, "integration loaded");
        Ok(())
    }

    /// Stop an integration's pipeline and unregister its services.
    /// Best-effort: in-flight service calls finish on their own deadline.
    pub fn unload_integration(&self, name: &str) -> EngineResult<()> {
        let loaded = self
            .integrations
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(name)
            .ok_or_else(|| EngineError::IntegrationNotLoaded(name.to_string()))?;

        loaded.cancel.cancel();
        for service_name in &loaded.service_names {
            self.service_registry.unregister(name, service_name);
        }
        info!(integration = name, "integration unloaded");
        Ok(())
    }

    /// Run discovery for a loaded integration (§ one-shot, not periodic).
    pub async fn discover_devices(&self, name: &str) -> EngineResult<()> {
        let (config_id, discovery) = {
            let integrations = self
                .integrations
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let loaded = integrations
                .get(name)
                .ok_or_else(|| EngineError::IntegrationNotLoaded(name.to_string()))?;
            (loaded.config_id, loaded.discovery.clone())
        };

        self.discovery_orchestrator()
            .discover(name, config_id, discovery.as_ref())
            .await
    }

    fn discovery_orchestrator(&self) -> DiscoveryOrchestrator {
        DiscoveryOrchestrator {
            device_repo: self.repos.devices.clone(),
            entity_repo: self.repos.entities.clone(),
            entity_registry: self.entity_registry.clone(),
            timeout: Duration::from_secs(self.config.discovery_timeout_secs),
        }
    }

    /// Sender side of the engine event channel (pipelines and tests).
    pub fn event_sender(&self) -> mpsc::Sender<Event> {
        self.event_tx.clone()
    }

    pub fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<Event>) {
        self.bus.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.bus.unsubscribe(id);
    }

    pub fn state_cache(&self) -> &Arc<StateCache> {
        &self.state_cache
    }

    pub fn entity_registry(&self) -> &Arc<EntityRegistry> {
        &self.entity_registry
    }

    pub fn service_registry(&self) -> &Arc<ServiceRegistry> {
        &self.service_registry
    }

    pub fn descriptors(&self) -> &DescriptorRegistry {
        &self.descriptors
    }

    /// Cancel everything and wait for the long-lived tasks to finish.
    /// Pipelines return at their next select, the processor exits and
    /// closes the task channel, and workers drain before terminating.
    pub async fn shutdown(&self) {
        info!("engine shutting down");
        self.cancel.cancel();
        let handles: Vec<JoinHandle<()>> = self
            .handles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in handles {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    warn!(error = %err, "task ended abnormally during shutdown");
                }
            }
        }
        info!("engine stopped");
    }
}

/// Check the user config against the descriptor's schema and fill in
/// declared defaults for missing optional fields.
fn validate_user_config(
    descriptor: &IntegrationDescriptor,
    mut user_config: Map<String, Value>,
) -> EngineResult<Map<String, Value>> {
    for (key, field) in &descriptor.config_schema {
        if user_config.contains_key(key) {
            continue;
        }
        if let Some(default) = &field.default {
            user_config.insert(key.clone(), default.clone());
        } else if field.required {
            return Err(EngineError::InvalidConfig(format!(
                "missing required field {key} for integration {}",
                descriptor.name
            )));
        }
    }
    Ok(user_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::integration::{ConfigField, ConfigFieldType};
    use crate::domain::ports::{IntegrationFactory, IntegrationInstance};
    use async_trait::async_trait;
    use serde_json::json;

    struct NeverFactory;

    #[async_trait]
    impl IntegrationFactory for NeverFactory {
        async fn create(
            &self,
            _user_config: &Map<String, Value>,
            _handles: IntegrationHandles,
        ) -> EngineResult<IntegrationInstance> {
            Err(EngineError::InvalidConfig("not under test".into()))
        }
    }

    fn descriptor_with_schema() -> IntegrationDescriptor {
        let mut schema = HashMap::new();
        schema.insert(
            "bridge_ip".to_string(),
            ConfigField {
                label: "Bridge IP".into(),
                description: String::new(),
                field_type: ConfigFieldType::Text,
                required: true,
                default: None,
            },
        );
        schema.insert(
            "port".to_string(),
            ConfigField {
                label: "Port".into(),
                description: String::new(),
                field_type: ConfigFieldType::Text,
                required: false,
                default: Some(json!("8080")),
            },
        );
        IntegrationDescriptor {
            name: "test".into(),
            display_name: "Test".into(),
            description: String::new(),
            version: "1.0".into(),
            capabilities: vec![],
            config_schema: schema,
            factory: Arc::new(NeverFactory),
        }
    }

    #[test]
    fn test_validate_user_config_fills_defaults() {
        let descriptor = descriptor_with_schema();
        let mut config = Map::new();
        config.insert("bridge_ip".into(), json!("10.0.0.2"));

        let validated = validate_user_config(&descriptor, config).unwrap();
        assert_eq!(validated["bridge_ip"], json!("10.0.0.2"));
        assert_eq!(validated["port"], json!("8080"));
    }

    #[test]
    fn test_validate_user_config_rejects_missing_required() {
        let descriptor = descriptor_with_schema();
        let err = validate_user_config(&descriptor, Map::new()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }
}
