//! Domain models.

pub mod automation;
pub mod config;
pub mod device;
pub mod entity;
pub mod event;
pub mod integration;
pub mod service;

pub use automation::{Action, Automation, Condition, EventTrigger, StateTrigger, Target, TriggerSpec};
pub use config::{ActionConfig, Config, DatabaseConfig, LoggingConfig, PipelineConfig, RetryConfig};
pub use device::{Device, DeviceType};
pub use entity::{entity_id_for, normalize_name, Entity, EntityType};
pub use event::{
    opt_value_eq, value_eq, CallServiceData, Context, Event, EventData, EventKind, State,
    StateChangedData, TimeChangedData,
};
pub use integration::IntegrationConfig;
pub use service::{
    ParamMetadata, ResolvedTarget, ServiceHandler, ServiceInvocation, ServiceSpec, TargetSpec,
    TargetType,
};
