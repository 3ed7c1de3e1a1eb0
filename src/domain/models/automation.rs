//! Automation model: triggers, conditions, actions.
//!
//! Triggers are a discriminated union decoded in one pass; the JSON shape
//! is `{"type": "state", "data": {...}}`, which is also how they are stored
//! in the automations table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::event::{opt_value_eq, value_eq, Event, EventData, EventKind, State};

/// A user-defined rule: when a trigger fires and the conditions hold,
/// execute the actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Automation {
    pub id: i64,
    pub alias: String,
    #[serde(default)]
    pub description: String,
    pub triggers: Vec<TriggerSpec>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
    pub enabled: bool,
    #[serde(default)]
    pub last_triggered: Option<DateTime<Utc>>,
}

/// Trigger variants. Any one matching is enough to fire the automation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TriggerSpec {
    State(StateTrigger),
    Event(EventTrigger),
}

impl TriggerSpec {
    /// Whether this trigger matches the given event.
    pub fn evaluate(&self, event: &Event) -> bool {
        match self {
            Self::State(t) => t.evaluate(event),
            Self::Event(t) => t.evaluate(event),
        }
    }
}

/// Matches a `state_changed` event whose primary state (or a named
/// attribute) actually changed, optionally constrained to from/to values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTrigger {
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Value>,
}

impl StateTrigger {
    pub fn evaluate(&self, event: &Event) -> bool {
        let EventData::StateChanged(data) = &event.data else {
            return false;
        };
        if data.entity_id != self.entity_id {
            return false;
        }

        let pick = |state: Option<&State>| -> Option<Value> {
            let state = state?;
            match &self.attribute {
                Some(attr) => state.attributes.get(attr).cloned(),
                None => Some(state.state.clone()),
            }
        };
        let old_val = pick(data.old_state.as_ref());
        let new_val = pick(data.new_state.as_ref());

        // No delta on the watched value means no trigger.
        if opt_value_eq(old_val.as_ref(), new_val.as_ref()) {
            return false;
        }

        if let Some(from) = &self.from {
            if !matches!(&old_val, Some(v) if value_eq(v, from)) {
                return false;
            }
        }
        if let Some(to) = &self.to {
            if !matches!(&new_val, Some(v) if value_eq(v, to)) {
                return false;
            }
        }
        true
    }
}

/// Matches any event of the given kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventTrigger {
    pub event_type: EventKind,
}

impl EventTrigger {
    pub fn evaluate(&self, event: &Event) -> bool {
        event.kind() == self.event_type
    }
}

/// A single comparison against a field of an entity's cached state. All
/// operators present must succeed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub entity: String,
    /// `state` reads the primary state value, anything else an attribute.
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_equals: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
}

impl Condition {
    /// Evaluate against the entity's state snapshot. A missing state or
    /// field never matches.
    pub fn matches(&self, state: Option<&State>) -> bool {
        let Some(state) = state else { return false };

        let value = if self.field == "state" {
            Some(&state.state)
        } else {
            state.attributes.get(&self.field)
        };
        let Some(value) = value else { return false };

        if let Some(expected) = &self.equals {
            if !value_eq(value, expected) {
                return false;
            }
        }
        if let Some(expected) = &self.not_equals {
            if value_eq(value, expected) {
                return false;
            }
        }
        if let Some(gt) = self.gt {
            match value.as_f64() {
                Some(num) if num > gt => {}
                _ => return false,
            }
        }
        if let Some(lt) = self.lt {
            match value.as_f64() {
                Some(num) if num < lt => {}
                _ => return false,
            }
        }
        true
    }
}

/// An entity targeted by an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub entity_id: String,
}

/// One service call inside an automation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Fully-qualified service name, `domain.service`.
    pub service: String,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub blocking: bool,
}

impl Action {
    /// Split `service` into its `(domain, service)` halves.
    pub fn service_parts(&self) -> Option<(&str, &str)> {
        self.service.split_once('.')
    }
}
