//! Canonical event model.
//!
//! Every integration translates its wire format into these types; the
//! engine, the automation evaluator, and the processed-event bus only ever
//! see this shape. Events and states are treated as immutable snapshots
//! once published.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Correlation record attached to an event and propagated to every state
/// and service call derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: None,
        }
    }

    /// Derive a child context that points back to this one.
    pub fn child(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: Some(self.id),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// An entity's authoritative in-memory snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub entity_id: String,
    pub state: Value,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Last time the primary `state` value changed.
    pub last_changed: DateTime<Utc>,
    /// Last time the primary state or any attribute was applied.
    pub last_updated: DateTime<Utc>,
    pub context: Context,
}

impl State {
    pub fn new(entity_id: impl Into<String>, state: Value, context: Context) -> Self {
        let now = Utc::now();
        Self {
            entity_id: entity_id.into(),
            state,
            attributes: Map::new(),
            last_changed: now,
            last_updated: now,
            context,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// The closed set of event kinds the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    StateChanged,
    CallService,
    TimeChanged,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StateChanged => write!(f, "state_changed"),
            Self::CallService => write!(f, "call_service"),
            Self::TimeChanged => write!(f, "time_changed"),
        }
    }
}

/// Data for a `state_changed` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChangedData {
    pub entity_id: String,
    pub old_state: Option<State>,
    pub new_state: Option<State>,
}

/// Data for a `call_service` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallServiceData {
    pub domain: String,
    pub service: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    pub entity_id: String,
}

/// Data for a `time_changed` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeChangedData {
    pub now: DateTime<Utc>,
}

/// Event payload, discriminated by the event kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventData {
    StateChanged(StateChangedData),
    CallService(CallServiceData),
    TimeChanged(TimeChangedData),
}

impl EventData {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::StateChanged(_) => EventKind::StateChanged,
            Self::CallService(_) => EventKind::CallService,
            Self::TimeChanged(_) => EventKind::TimeChanged,
        }
    }
}

/// A typed message representing something that happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub data: EventData,
    pub context: Context,
    pub time_fired: DateTime<Utc>,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        self.data.kind()
    }

    pub fn state_changed(
        entity_id: impl Into<String>,
        old_state: Option<State>,
        new_state: Option<State>,
        context: Context,
    ) -> Self {
        Self {
            data: EventData::StateChanged(StateChangedData {
                entity_id: entity_id.into(),
                old_state,
                new_state,
            }),
            context,
            time_fired: Utc::now(),
        }
    }

    pub fn time_changed(now: DateTime<Utc>) -> Self {
        Self {
            data: EventData::TimeChanged(TimeChangedData { now }),
            context: Context::new(),
            time_fired: Utc::now(),
        }
    }

    /// Shorthand for the `state_changed` payload, if this is one.
    pub fn as_state_changed(&self) -> Option<&StateChangedData> {
        match &self.data {
            EventData::StateChanged(data) => Some(data),
            _ => None,
        }
    }
}

/// Value equality with numeric coercion.
///
/// JSON integers and floats compare as floats, so a trigger written with
/// `to: 70` matches a state carrying `70.0`. Everything else falls back to
/// strict `Value` equality.
pub fn value_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
        _ => a == b,
    }
}

/// Optional-value equality used by trigger from/to matching.
pub fn opt_value_eq(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => value_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}
