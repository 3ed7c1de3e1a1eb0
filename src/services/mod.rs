//! Core engine services.

pub mod descriptor_registry;
pub mod discovery;
pub mod entity_registry;
pub mod evaluator;
pub mod event_bus;
pub mod pipeline;
pub mod processor;
pub mod service_registry;
pub mod state_cache;
pub mod task_queue;
pub mod template;

pub use descriptor_registry::DescriptorRegistry;
pub use discovery::DiscoveryOrchestrator;
pub use entity_registry::EntityRegistry;
pub use evaluator::AutomationEvaluator;
pub use event_bus::{ProcessedEventBus, SubscriberId};
pub use pipeline::EventPipeline;
pub use processor::EventProcessor;
pub use service_registry::ServiceRegistry;
pub use state_cache::StateCache;
pub use task_queue::{task_channel, AutomationTask, TaskReceiver, WorkerPool};
pub use template::TemplateResolver;
