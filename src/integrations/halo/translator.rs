//! Halo event translation.
//!
//! The controller wraps every report in `{"event": {...}}` with a `type`
//! discriminator. Button presses become `state_changed` events on the
//! button entity; wheel rotation accumulates into a rolling step counter
//! so the newest event always carries the total of the current burst
//! (the wheel aggregator then keeps only that newest one).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{Context, Event, EventData, State, StateChangedData};
use crate::domain::ports::{EntityResolver, EventTranslator, StateStore};

/// A burst of wheel ticks older than this starts a new accumulation.
const WHEEL_BURST_GAP: Duration = Duration::from_secs(1);

/// Attribute marking wheel events for the aggregator.
pub const WHEEL_STEP_ATTR: &str = "wheel_step";

#[derive(Debug, Deserialize)]
struct RawEvent {
    event: Value,
}

#[derive(Debug, Deserialize)]
struct ButtonEvent {
    id: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct WheelEvent {
    id: String,
    counts: i64,
}

#[derive(Debug, Deserialize)]
struct SystemEvent {
    state: String,
}

struct WheelAccumulator {
    total: i64,
    last_tick: Instant,
}

pub struct HaloTranslator {
    state: Arc<dyn StateStore>,
    entities: Arc<dyn EntityResolver>,
    /// Per-entity rolling wheel totals.
    wheel: Mutex<HashMap<String, WheelAccumulator>>,
}

impl HaloTranslator {
    pub fn new(state: Arc<dyn StateStore>, entities: Arc<dyn EntityResolver>) -> Self {
        Self {
            state,
            entities,
            wheel: Mutex::new(HashMap::new()),
        }
    }

    fn translate_button(&self, raw: &Value) -> EngineResult<Vec<Event>> {
        let event: ButtonEvent = serde_json::from_value(raw.clone())?;
        let entity_id = self
            .entities
            .resolve(&event.id)
            .ok_or_else(|| EngineError::UnknownEntity(event.id.clone()))?;

        let context = Context::new();
        let old_state = self.state.get(&entity_id);
        let mut new_state = match &old_state {
            Some(state) => {
                let mut copy = state.clone();
                copy.context = context.clone();
                copy
            }
            None => State::new(&entity_id, Value::Null, context.clone()),
        };
        new_state.state = json!(event.state);

        Ok(vec![Event {
            data: EventData::StateChanged(StateChangedData {
                entity_id,
                old_state,
                new_state: Some(new_state),
            }),
            context,
            time_fired: chrono::Utc::now(),
        }])
    }

    fn translate_wheel(&self, raw: &Value) -> EngineResult<Vec<Event>> {
        let event: WheelEvent = serde_json::from_value(raw.clone())?;
        let entity_id = self
            .entities
            .resolve(&event.id)
            .ok_or_else(|| EngineError::UnknownEntity(event.id.clone()))?;

        let total = {
            let mut wheel = self
                .wheel
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let now = Instant::now();
            let acc = wheel.entry(entity_id.clone()).or_insert(WheelAccumulator {
                total: 0,
                last_tick: now,
            });
            if now.duration_since(acc.last_tick) > WHEEL_BURST_GAP {
                acc.total = 0;
            }
            acc.total += event.counts;
            acc.last_tick = now;
            acc.total
        };

        let context = Context::new();
        let old_state = self.state.get(&entity_id);
        let mut new_state = match &old_state {
            Some(state) => {
                let mut copy = state.clone();
                copy.context = context.clone();
                copy
            }
            None => State::new(&entity_id, Value::Null, context.clone()),
        };
        new_state
            .attributes
            .insert(WHEEL_STEP_ATTR.to_string(), json!(total));

        Ok(vec![Event {
            data: EventData::StateChanged(StateChangedData {
                entity_id,
                old_state,
                new_state: Some(new_state),
            }),
            context,
            time_fired: chrono::Utc::now(),
        }])
    }
}

impl EventTranslator for HaloTranslator {
    fn translate(&self, raw: &[u8]) -> EngineResult<Vec<Event>> {
        let wrapper: RawEvent = serde_json::from_slice(raw)
            .map_err(|err| EngineError::Translation(err.to_string()))?;
        let Some(kind) = wrapper.event.get("type").and_then(Value::as_str) else {
            return Err(EngineError::Translation("halo event missing type".into()));
        };

        match kind {
            "button" => self.translate_button(&wrapper.event),
            "wheel" => self.translate_wheel(&wrapper.event),
            "system" => {
                // State reports for the device itself; nothing to track.
                let event: SystemEvent = serde_json::from_value(wrapper.event.clone())?;
                debug!(state = %event.state, "halo system event, skipping");
                Ok(Vec::new())
            }
            other => {
                debug!(kind = other, "unsupported halo event type, skipping");
                Ok(Vec::new())
            }
        }
    }
}
