//! Integration contracts.
//!
//! An integration bridges one external device ecosystem into the engine.
//! Its descriptor carries static metadata plus a factory; the factory,
//! given the user config and injected engine handles, produces an
//! [`IntegrationInstance`] whose parts the engine wires into a pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::EngineResult;
use crate::domain::models::{Device, Entity, Event, ServiceSpec};
use crate::domain::ports::state::{EntityResolver, StateStore};

/// Produces the raw byte stream of one integration. The source owns its
/// connection and reconnects on failure; it returns only on cancellation
/// or a terminal error.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn run(&self, cancel: CancellationToken, out: mpsc::Sender<Vec<u8>>)
        -> EngineResult<()>;
}

/// Parses one raw message into zero or more canonical events. Translators
/// are pure: no I/O, reads only the injected state store and entity
/// resolver. Each emitted event must be self-contained.
pub trait EventTranslator: Send + Sync {
    fn translate(&self, raw: &[u8]) -> EngineResult<Vec<Event>>;
}

/// Coalesces bursty events on the pipeline task. `aggregate` may buffer
/// (returning `None`) or emit immediately; `flush` is called periodically
/// and on shutdown and must eventually surface or drop everything that
/// was buffered. Aggregators must not block.
pub trait EventAggregator: Send + Sync {
    fn aggregate(&mut self, event: Event) -> Option<Event>;

    fn flush(&mut self) -> Option<Event>;
}

/// Default aggregator: emits immediately, never buffers.
#[derive(Debug, Default)]
pub struct PassthroughAggregator;

impl EventAggregator for PassthroughAggregator {
    fn aggregate(&mut self, event: Event) -> Option<Event> {
        Some(event)
    }

    fn flush(&mut self) -> Option<Event> {
        None
    }
}

/// Enumerates the devices and entities an integration currently exposes.
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    async fn discover(&self) -> EngineResult<(Vec<Device>, Vec<Entity>)>;
}

/// Field type in an integration's config schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigFieldType {
    Text,
}

/// One field of an integration's user-config schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigField {
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub field_type: ConfigFieldType,
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
}

/// Capabilities an integration may advertise.
pub const CAPABILITY_LIGHTING: &str = "lighting";
pub const CAPABILITY_AUDIO: &str = "audio";
pub const CAPABILITY_CONTROL: &str = "control";
pub const CAPABILITY_DISCOVERY: &str = "discovery";

/// Engine handles injected into integration factories.
#[derive(Clone)]
pub struct IntegrationHandles {
    pub state: Arc<dyn StateStore>,
    pub entities: Arc<dyn EntityResolver>,
}

/// Builds an [`IntegrationInstance`] from a validated user config.
#[async_trait]
pub trait IntegrationFactory: Send + Sync {
    async fn create(
        &self,
        user_config: &Map<String, Value>,
        handles: IntegrationHandles,
    ) -> EngineResult<IntegrationInstance>;
}

/// Static metadata about an integration, registered before any instance
/// exists.
#[derive(Clone)]
pub struct IntegrationDescriptor {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub version: String,
    pub capabilities: Vec<&'static str>,
    pub config_schema: HashMap<String, ConfigField>,
    pub factory: Arc<dyn IntegrationFactory>,
}

impl std::fmt::Debug for IntegrationDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationDescriptor")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("version", &self.version)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// A live integration as produced by its factory. The engine takes the
/// pipeline parts by value and keeps discovery and the service specs.
pub struct IntegrationInstance {
    pub source: Box<dyn EventSource>,
    pub translator: Box<dyn EventTranslator>,
    pub aggregator: Box<dyn EventAggregator>,
    pub discovery: Arc<dyn DiscoveryClient>,
    /// Service name (without the domain prefix) to spec.
    pub services: HashMap<String, ServiceSpec>,
}
