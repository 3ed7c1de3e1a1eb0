//! Hue event translation.
//!
//! Parses the bridge's SSE envelopes and shapes resource updates into
//! canonical `state_changed` events. Every tracked field that appears in
//! an update (power, brightness, color_xy, mirek) yields exactly one
//! event, built against the cached state so old and new snapshots are
//! both present. Handlers are registered per source event type; adding a
//! resource type is one entry in the registry.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{Context, Event, EventData, State, StateChangedData};
use crate::domain::ports::{EntityResolver, EventTranslator, StateStore};

use super::client::{ColorState, ColorTemperature, Dimming, OnState};
use super::resources::HueResourceIndex;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct LightUpdate {
    id: String,
    #[serde(default)]
    on: Option<OnState>,
    #[serde(default)]
    dimming: Option<Dimming>,
    #[serde(default)]
    color: Option<ColorState>,
    #[serde(default)]
    color_temperature: Option<ColorTemperature>,
}

#[derive(Debug, Deserialize)]
struct GroupedLightUpdate {
    id: String,
    #[serde(default)]
    on: Option<OnState>,
    #[serde(default)]
    dimming: Option<Dimming>,
}

#[derive(Debug, Deserialize)]
struct SceneStatus {
    active: String,
}

#[derive(Debug, Deserialize)]
struct SceneUpdate {
    id: String,
    #[serde(default)]
    status: Option<SceneStatus>,
}

/// One tracked-field change extracted from a source update.
enum Delta {
    Power(bool),
    Brightness(f64),
    ColorXy(f64, f64),
    Mirek(i64),
}

type UpdateHandler = fn(&HueTranslator, &Value) -> EngineResult<Vec<Event>>;

pub struct HueTranslator {
    state: Arc<dyn StateStore>,
    entities: Arc<dyn EntityResolver>,
    resources: HueResourceIndex,
    registry: HashMap<&'static str, UpdateHandler>,
}

impl HueTranslator {
    pub fn new(
        state: Arc<dyn StateStore>,
        entities: Arc<dyn EntityResolver>,
        resources: HueResourceIndex,
    ) -> Self {
        let mut registry: HashMap<&'static str, UpdateHandler> = HashMap::new();
        registry.insert("light", Self::translate_light);
        registry.insert("grouped_light", Self::translate_grouped_light);
        registry.insert("scene", Self::translate_scene);
        Self {
            state,
            entities,
            resources,
            registry,
        }
    }

    fn translate_light(&self, raw: &Value) -> EngineResult<Vec<Event>> {
        let update: LightUpdate = serde_json::from_value(raw.clone())?;
        let deltas = collect_light_deltas(
            update.on.as_ref(),
            update.dimming.as_ref(),
            update.color.as_ref(),
            update.color_temperature.as_ref(),
        );
        self.state_events(&update.id, deltas)
    }

    fn translate_grouped_light(&self, raw: &Value) -> EngineResult<Vec<Event>> {
        let update: GroupedLightUpdate = serde_json::from_value(raw.clone())?;
        let deltas = collect_light_deltas(update.on.as_ref(), update.dimming.as_ref(), None, None);
        self.state_events(&update.id, deltas)
    }

    /// Scene activation produces the scene entity's own event plus a
    /// synthetic one on the owning grouped light carrying `active_scene`,
    /// keeping the cache free of scene-specific knowledge.
    fn translate_scene(&self, raw: &Value) -> EngineResult<Vec<Event>> {
        let update: SceneUpdate = serde_json::from_value(raw.clone())?;
        let Some(status) = update.status else {
            return Ok(Vec::new());
        };
        let active = status.active != "inactive";

        let entity_id = self
            .entities
            .resolve(&update.id)
            .ok_or_else(|| EngineError::UnknownEntity(update.id.clone()))?;

        let mut events = Vec::new();
        let context = Context::new();
        let old_state = self.state.get(&entity_id);
        let mut new_state = rebased(old_state.as_ref(), &entity_id, &context);
        new_state.state = json!(if active { "active" } else { "inactive" });
        events.push(Event {
            data: EventData::StateChanged(
                StateChangedData {
                    entity_id: entity_id.clone(),
                    old_state,
                    new_state: Some(new_state),
                },
            ),
            context,
            time_fired: chrono::Utc::now(),
        });

        if active {
            if let Some(grouped_external) = self.resources.scene_owner(&update.id) {
                let scene_name = self
                    .resources
                    .name(&update.id)
                    .unwrap_or(&update.id)
                    .to_string();
                match self.entities.resolve(grouped_external) {
                    Some(grouped_entity) => {
                        let context = Context::new();
                        let old_state = self.state.get(&grouped_entity);
                        let mut new_state = rebased(old_state.as_ref(), &grouped_entity, &context);
                        new_state
                            .attributes
                            .insert("active_scene".to_string(), json!(scene_name));
                        events.push(Event {
                            data: EventData::StateChanged(StateChangedData {
                                entity_id: grouped_entity.clone(),
                                old_state,
                                new_state: Some(new_state),
                            }),
                            context,
                            time_fired: chrono::Utc::now(),
                        });
                    }
                    None => {
                        warn!(grouped_light = grouped_external, "grouped light not in registry, skipping scene propagation");
                    }
                }
            }
        }
        Ok(events)
    }

    /// Build one self-contained `state_changed` event per delta, chaining
    /// so each event's old state includes the previous deltas.
    fn state_events(&self, external_id: &str, deltas: Vec<Delta>) -> EngineResult<Vec<Event>> {
        if deltas.is_empty() {
            return Ok(Vec::new());
        }
        let entity_id = self
            .entities
            .resolve(external_id)
            .ok_or_else(|| EngineError::UnknownEntity(external_id.to_string()))?;

        let mut prev = self.state.get(&entity_id);
        let mut events = Vec::with_capacity(deltas.len());
        for delta in deltas {
            let context = Context::new();
            let mut new_state = rebased(prev.as_ref(), &entity_id, &context);
            match delta {
                Delta::Power(on) => {
                    new_state.state = json!(if on { "on" } else { "off" });
                }
                Delta::Brightness(brightness) => {
                    new_state
                        .attributes
                        .insert("brightness".to_string(), json!(brightness));
                }
                Delta::ColorXy(x, y) => {
                    new_state
                        .attributes
                        .insert("color_xy".to_string(), json!([x, y]));
                }
                Delta::Mirek(mirek) => {
                    new_state.attributes.insert("mirek".to_string(), json!(mirek));
                }
            }
            events.push(Event {
                data: EventData::StateChanged(StateChangedData {
                    entity_id: entity_id.clone(),
                    old_state: prev.clone(),
                    new_state: Some(new_state.clone()),
                }),
                context,
                time_fired: chrono::Utc::now(),
            });
            prev = Some(new_state);
        }
        Ok(events)
    }
}

fn collect_light_deltas(
    on: Option<&OnState>,
    dimming: Option<&Dimming>,
    color: Option<&ColorState>,
    color_temperature: Option<&ColorTemperature>,
) -> Vec<Delta> {
    let mut deltas = Vec::new();
    if let Some(on) = on {
        deltas.push(Delta::Power(on.on));
    }
    if let Some(dimming) = dimming {
        deltas.push(Delta::Brightness(dimming.brightness));
    }
    if let Some(color) = color {
        deltas.push(Delta::ColorXy(color.xy.x, color.xy.y));
    }
    if let Some(ct) = color_temperature {
        if let Some(mirek) = ct.mirek {
            deltas.push(Delta::Mirek(mirek));
        }
    }
    deltas
}

/// Deep-copy the old state with a fresh context, or start empty when the
/// entity was never seen.
fn rebased(old: Option<&State>, entity_id: &str, context: &Context) -> State {
    match old {
        Some(state) => {
            let mut copy = state.clone();
            copy.context = context.clone();
            copy
        }
        None => State::new(entity_id, Value::Null, context.clone()),
    }
}

impl EventTranslator for HueTranslator {
    fn translate(&self, raw: &[u8]) -> EngineResult<Vec<Event>> {
        // The stream carries either one envelope or a batch.
        let envelopes: Vec<Envelope> = match serde_json::from_slice(raw) {
            Ok(batch) => batch,
            Err(_) => {
                let single: Envelope = serde_json::from_slice(raw)
                    .map_err(|err| EngineError::Translation(err.to_string()))?;
                vec![single]
            }
        };

        let mut events = Vec::new();
        for envelope in &envelopes {
            if envelope.kind != "update" {
                debug!(kind = %envelope.kind, "ignoring event envelope");
                continue;
            }
            for item in &envelope.data {
                let Some(item_type) = item.get("type").and_then(Value::as_str) else {
                    warn!("source event missing type, skipping");
                    continue;
                };
                let Some(handler) = self.registry.get(item_type) else {
                    debug!(item_type, "unsupported source event type, skipping");
                    continue;
                };
                match handler(self, item) {
                    Ok(translated) => events.extend(translated),
                    Err(err) => {
                        warn!(item_type, error = %err, "failed to translate source event, dropping");
                    }
                }
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::entity_registry::EntityRegistry;
    use crate::services::state_cache::StateCache;

    fn wired() -> (Arc<StateCache>, Arc<EntityRegistry>, HueTranslator) {
        let cache = Arc::new(StateCache::new());
        let registry = Arc::new(EntityRegistry::new());
        registry.register("light-1", "light.flower_pot");
        registry.register("grouped-1", "light.living_room");
        registry.register("scene-1", "scene.living_room_movie");

        let resources = HueResourceIndex::for_tests(
            &[("scene-1", "Movie"), ("light-1", "Flower Pot")],
            &[("grouped-1", "Living Room")],
            &[("scene-1", "grouped-1")],
        );
        let translator = HueTranslator::new(cache.clone(), registry.clone(), resources);
        (cache, registry, translator)
    }

    fn envelope(data: Value) -> Vec<u8> {
        json!([{ "id": "env-1", "type": "update", "data": [data] }])
            .to_string()
            .into_bytes()
    }

    #[test]
    fn test_brightness_update_builds_old_and_new_state() {
        let (cache, _registry, translator) = wired();
        cache.set(
            "light.flower_pot",
            State::new("light.flower_pot", json!("on"), Context::new())
                .with_attribute("brightness", json!(50.0)),
        );

        let events = translator
            .translate(&envelope(json!({
                "id": "light-1",
                "type": "light",
                "dimming": {"brightness": 70.0}
            })))
            .unwrap();

        assert_eq!(events.len(), 1);
        let data = events[0].as_state_changed().unwrap();
        assert_eq!(data.entity_id, "light.flower_pot");
        assert_eq!(
            data.old_state.as_ref().unwrap().attribute("brightness"),
            Some(&json!(50.0))
        );
        assert_eq!(
            data.new_state.as_ref().unwrap().attribute("brightness"),
            Some(&json!(70.0))
        );
        // State context matches the event's context.
        assert_eq!(
            data.new_state.as_ref().unwrap().context,
            events[0].context
        );
    }

    #[test]
    fn test_multiple_deltas_chain_into_separate_events() {
        let (cache, _registry, translator) = wired();
        cache.set(
            "light.flower_pot",
            State::new("light.flower_pot", json!("off"), Context::new()),
        );

        let events = translator
            .translate(&envelope(json!({
                "id": "light-1",
                "type": "light",
                "on": {"on": true},
                "dimming": {"brightness": 35.0}
            })))
            .unwrap();

        assert_eq!(events.len(), 2);
        let power = events[0].as_state_changed().unwrap();
        assert_eq!(power.new_state.as_ref().unwrap().state, json!("on"));

        let brightness = events[1].as_state_changed().unwrap();
        // The second event's old state already has the power change.
        assert_eq!(brightness.old_state.as_ref().unwrap().state, json!("on"));
        assert_eq!(
            brightness.new_state.as_ref().unwrap().attribute("brightness"),
            Some(&json!(35.0))
        );
    }

    #[test]
    fn test_unknown_external_id_drops_event() {
        let (_cache, _registry, translator) = wired();
        let events = translator
            .translate(&envelope(json!({
                "id": "mystery",
                "type": "light",
                "on": {"on": true}
            })))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_no_tracked_delta_yields_no_event() {
        let (_cache, _registry, translator) = wired();
        let events = translator
            .translate(&envelope(json!({
                "id": "light-1",
                "type": "light"
            })))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_scene_activation_propagates_to_grouped_light() {
        let (cache, _registry, translator) = wired();
        cache.set(
            "light.living_room",
            State::new("light.living_room", json!("on"), Context::new()),
        );

        let events = translator
            .translate(&envelope(json!({
                "id": "scene-1",
                "type": "scene",
                "status": {"active": "static"}
            })))
            .unwrap();

        assert_eq!(events.len(), 2);
        let scene = events[0].as_state_changed().unwrap();
        assert_eq!(scene.entity_id, "scene.living_room_movie");
        assert_eq!(scene.new_state.as_ref().unwrap().state, json!("active"));

        let grouped = events[1].as_state_changed().unwrap();
        assert_eq!(grouped.entity_id, "light.living_room");
        assert_eq!(
            grouped.new_state.as_ref().unwrap().attribute("active_scene"),
            Some(&json!("Movie"))
        );
    }

    #[test]
    fn test_non_update_envelope_ignored() {
        let (_cache, _registry, translator) = wired();
        let raw = json!([{ "id": "env-1", "type": "add", "data": [] }])
            .to_string()
            .into_bytes();
        assert!(translator.translate(&raw).unwrap().is_empty());
    }

    #[test]
    fn test_garbage_is_a_translation_error() {
        let (_cache, _registry, translator) = wired();
        assert!(translator.translate(b"not json").is_err());
    }
}
