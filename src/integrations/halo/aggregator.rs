//! Wheel aggregator.
//!
//! Rapid wheel rotation floods the pipeline with near-identical events;
//! only the newest matters because the translator accumulates the burst
//! total into each one. Wheel events are buffered and the newest is
//! emitted on flush; everything else passes through untouched.

use crate::domain::models::{Event, EventData};
use crate::domain::ports::EventAggregator;

use super::translator::WHEEL_STEP_ATTR;

#[derive(Debug, Default)]
pub struct WheelAggregator {
    buffer: Vec<Event>,
}

impl WheelAggregator {
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_wheel_event(event: &Event) -> bool {
    match &event.data {
        EventData::StateChanged(data) => data
            .new_state
            .as_ref()
            .is_some_and(|state| state.attributes.contains_key(WHEEL_STEP_ATTR)),
        _ => false,
    }
}

impl EventAggregator for WheelAggregator {
    fn aggregate(&mut self, event: Event) -> Option<Event> {
        if !is_wheel_event(&event) {
            return Some(event);
        }
        self.buffer.push(event);
        None
    }

    fn flush(&mut self) -> Option<Event> {
        // The newest buffered event carries the up-to-date total.
        let newest = self.buffer.pop();
        self.buffer.clear();
        newest
    }
}
