//! Thread-safe in-memory state cache.
//!
//! The authoritative `entity_id -> State` snapshot. Writers come from the
//! event processor, readers from translators, the evaluator, and the API
//! surface; none of the operations touch I/O or await.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use crate::domain::models::{Event, EventData, State};
use crate::domain::ports::StateStore;

#[derive(Debug, Default)]
pub struct StateCache {
    cache: RwLock<HashMap<String, State>>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity_id: &str) -> Option<State> {
        self.cache
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(entity_id)
            .cloned()
    }

    pub fn get_all(&self) -> Vec<State> {
        self.cache
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Insert or replace the state for an entity.
    ///
    /// `last_changed` advances only when the primary state value differs
    /// from the previous one; `last_updated` advances on every set.
    pub fn set(&self, entity_id: &str, mut new_state: State) {
        let now = Utc::now();
        let mut cache = self
            .cache
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        match cache.get(entity_id) {
            Some(existing) if existing.state == new_state.state => {
                new_state.last_changed = existing.last_changed;
            }
            _ => {
                new_state.last_changed = now;
            }
        }
        new_state.last_updated = now;
        cache.insert(entity_id.to_string(), new_state);
    }

    /// Write the new state of a `state_changed` event into the cache.
    /// Other event kinds are ignored.
    pub fn apply(&self, event: &Event) {
        if let EventData::StateChanged(data) = &event.data {
            if let Some(new_state) = &data.new_state {
                self.set(&data.entity_id, new_state.clone());
            }
        }
    }
}

impl StateStore for StateCache {
    fn get(&self, entity_id: &str) -> Option<State> {
        StateCache::get(self, entity_id)
    }

    fn set(&self, entity_id: &str, state: State) {
        StateCache::set(self, entity_id, state);
    }

    fn get_all(&self) -> Vec<State> {
        StateCache::get_all(self)
    }
}
