//! Action-param template resolution.
//!
//! Recognized forms inside action params:
//!
//! - `{{ state('<entity_id>') }}`: the entity's primary state value
//! - `{{ state_attr('<entity_id>', '<attribute>') }}`: a named attribute
//!
//! Templates are resolved at task-build time against the cache snapshot,
//! pinning each action to the state that caused the trigger. A param whose
//! entire value is one template keeps the resolved value's JSON type;
//! templates embedded in a longer string are substituted as text.
//!
//! Resolution is a pure function of `(template, cache snapshot)`; failures
//! (unknown entity, missing attribute) surface as errors so the caller can
//! skip the affected automation.

use regex::Regex;
use serde_json::{Map, Value};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::ports::StateStore;

pub struct TemplateResolver {
    template: Regex,
}

impl TemplateResolver {
    pub fn new() -> Self {
        // state_attr first so the alternation can't stop at `state`.
        let template = Regex::new(
            r"\{\{\s*(?:state_attr\(\s*'(?P<attr_entity>[^']+)'\s*,\s*'(?P<attr_name>[^']+)'\s*\)|state\(\s*'(?P<state_entity>[^']+)'\s*\))\s*\}\}",
        )
        .expect("static template regex");
        Self { template }
    }

    /// Resolve every template in the given params map.
    pub fn resolve_params(
        &self,
        params: &Map<String, Value>,
        cache: &dyn StateStore,
    ) -> EngineResult<Map<String, Value>> {
        let mut resolved = Map::with_capacity(params.len());
        for (key, value) in params {
            resolved.insert(key.clone(), self.resolve_value(value, cache)?);
        }
        Ok(resolved)
    }

    fn resolve_value(&self, value: &Value, cache: &dyn StateStore) -> EngineResult<Value> {
        match value {
            Value::String(s) => self.resolve_string(s, cache),
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_value(item, cache))
                .collect::<EngineResult<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), self.resolve_value(v, cache)?);
                }
                Ok(Value::Object(out))
            }
            other => Ok(other.clone()),
        }
    }

    fn resolve_string(&self, raw: &str, cache: &dyn StateStore) -> EngineResult<Value> {
        let trimmed = raw.trim();

        // Whole-string template: keep the resolved value's type.
        if let Some(m) = self.template.find(trimmed) {
            if m.start() == 0 && m.end() == trimmed.len() {
                let caps = self.template.captures(trimmed).expect("find matched");
                return self.eval(&caps, cache);
            }
        } else {
            return Ok(Value::String(raw.to_string()));
        }

        // Embedded templates: substitute as text.
        let mut out = String::with_capacity(raw.len());
        let mut last = 0;
        for caps in self.template.captures_iter(raw) {
            let m = caps.get(0).expect("group 0 always present");
            out.push_str(&raw[last..m.start()]);
            let value = self.eval(&caps, cache)?;
            match value {
                Value::String(s) => out.push_str(&s),
                other => out.push_str(&other.to_string()),
            }
            last = m.end();
        }
        out.push_str(&raw[last..]);
        Ok(Value::String(out))
    }

    fn eval(&self, caps: &regex::Captures<'_>, cache: &dyn StateStore) -> EngineResult<Value> {
        if let Some(entity_id) = caps.name("state_entity") {
            let entity_id = entity_id.as_str();
            let state = cache
                .get(entity_id)
                .ok_or_else(|| EngineError::MissingState(entity_id.to_string()))?;
            return Ok(state.state);
        }

        let entity_id = caps
            .name("attr_entity")
            .map(|m| m.as_str())
            .expect("alternation covers both branches");
        let attribute = caps
            .name("attr_name")
            .map(|m| m.as_str())
            .expect("attr_name present with attr_entity");
        let state = cache
            .get(entity_id)
            .ok_or_else(|| EngineError::MissingState(entity_id.to_string()))?;
        state
            .attributes
            .get(attribute)
            .cloned()
            .ok_or_else(|| EngineError::MissingAttribute {
                entity_id: entity_id.to_string(),
                attribute: attribute.to_string(),
            })
    }
}

impl Default for TemplateResolver {
    fn default() -> Self {
        Self::new()
    }
}
