//! Ports: abstract interfaces the engine consumes.

pub mod automation_repository;
pub mod device_repository;
pub mod entity_repository;
pub mod event_repository;
pub mod integration;
pub mod integration_config_repository;
pub mod state;

pub use automation_repository::AutomationRepository;
pub use device_repository::DeviceRepository;
pub use entity_repository::EntityRepository;
pub use event_repository::EventRepository;
pub use integration::{
    ConfigField, ConfigFieldType, DiscoveryClient, EventAggregator, EventSource, EventTranslator,
    IntegrationDescriptor, IntegrationFactory, IntegrationHandles, IntegrationInstance,
    PassthroughAggregator, CAPABILITY_AUDIO, CAPABILITY_CONTROL, CAPABILITY_DISCOVERY,
    CAPABILITY_LIGHTING,
};
pub use integration_config_repository::IntegrationConfigRepository;
pub use state::{EntityResolver, StateStore};
