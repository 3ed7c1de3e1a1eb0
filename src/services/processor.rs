//! Top-level event processor.
//!
//! Drains the shared engine channel. Per event: apply to the state cache,
//! evaluate automations and enqueue their tasks, persist (best-effort),
//! publish on the processed-event bus. A per-event failure never
//! terminates the loop.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::models::Event;
use crate::domain::ports::{AutomationRepository, EventRepository};
use crate::services::entity_registry::EntityRegistry;
use crate::services::evaluator::AutomationEvaluator;
use crate::services::event_bus::ProcessedEventBus;
use crate::services::state_cache::StateCache;
use crate::services::task_queue::AutomationTask;

pub struct EventProcessor {
    pub state_cache: Arc<StateCache>,
    pub entity_registry: Arc<EntityRegistry>,
    pub evaluator: Arc<AutomationEvaluator>,
    pub bus: Arc<ProcessedEventBus>,
    pub automation_repo: Arc<dyn AutomationRepository>,
    pub event_repo: Arc<dyn EventRepository>,
    pub task_tx: mpsc::Sender<AutomationTask>,
    pub cancel: CancellationToken,
}

impl EventProcessor {
    /// Run until cancellation or until the engine channel closes.
    pub async fn run(self, mut events: mpsc::Receiver<Event>) {
        info!("event processor started");
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    info!("event processor stopping");
                    return;
                }
                maybe_event = events.recv() => {
                    let Some(event) = maybe_event else {
                        info!("engine channel closed, event processor stopping");
                        return;
                    };
                    self.process(event).await;
                }
            }
        }
    }

    async fn process(&self, event: Event) {
        debug!(kind = %event.kind(), "processing event");

        self.state_cache.apply(&event);

        let tasks = self
            .evaluator
            .evaluate(&event, self.state_cache.as_ref(), self.entity_registry.as_ref());
        for task in tasks {
            let automation_id = task.automation_id;
            let alias = task.alias.clone();
            // Enqueueing applies backpressure when workers are saturated;
            // cancellation still wins.
            tokio::select! {
                () = self.cancel.cancelled() => return,
                sent = self.task_tx.send(task) => {
                    if sent.is_err() {
                        warn!(automation = %alias, "task channel closed, dropping task");
                        continue;
                    }
                }
            }
            if let Err(err) = self
                .automation_repo
                .update_last_triggered(automation_id, Utc::now())
                .await
            {
                warn!(automation = %alias, error = %err, "failed to record last_triggered");
            }
        }

        if let Err(err) = self.event_repo.save(&event).await {
            warn!(error = %err, "failed to persist event");
        }

        self.bus.publish(&event);
    }
}
