//! Per-integration event pipeline.
//!
//! Runs one source, translator, and aggregator as a unit: raw bytes come
//! off the source's channel, translation fans them into canonical events,
//! the aggregator decides what surfaces, and surviving events go into the
//! shared engine channel. The engine send never blocks: when the channel
//! is full the event is dropped with a warning, so one slow consumer
//! can't stall every pipeline (newest-wins per integration).

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::domain::errors::EngineResult;
use crate::domain::models::{Event, PipelineConfig};
use crate::domain::ports::{EventAggregator, EventSource, EventTranslator};

pub struct EventPipeline {
    pub integration: String,
    pub source: Box<dyn EventSource>,
    pub translator: Box<dyn EventTranslator>,
    pub aggregator: Box<dyn EventAggregator>,
    pub engine_tx: mpsc::Sender<Event>,
    pub config: PipelineConfig,
    pub cancel: CancellationToken,
}

impl EventPipeline {
    /// Drive the pipeline until cancellation or source exhaustion. Always
    /// performs a final aggregator flush on the way out.
    pub async fn run(self) -> EngineResult<()> {
        let EventPipeline {
            integration,
            source,
            translator,
            mut aggregator,
            engine_tx,
            config,
            cancel,
        } = self;

        let (raw_tx, mut raw_rx) = mpsc::channel::<Vec<u8>>(config.raw_channel_capacity);

        let source_cancel = cancel.clone();
        let source_integration = integration.clone();
        let source_handle = tokio::spawn(async move {
            if let Err(err) = source.run(source_cancel, raw_tx).await {
                error!(integration = %source_integration, error = %err, "event source exited");
            }
        });

        let mut flush_tick = tokio::time::interval(Duration::from_millis(config.flush_interval_ms));
        flush_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    if let Some(event) = aggregator.flush() {
                        emit(&integration, &engine_tx, event);
                    }
                    source_handle.abort();
                    return Ok(());
                }
                maybe_raw = raw_rx.recv() => {
                    let Some(raw) = maybe_raw else {
                        // Source closed its channel; drain what's buffered.
                        if let Some(event) = aggregator.flush() {
                            emit(&integration, &engine_tx, event);
                        }
                        return Ok(());
                    };
                    match translator.translate(&raw) {
                        Ok(events) => {
                            for event in events {
                                if let Some(event) = aggregator.aggregate(event) {
                                    emit(&integration, &engine_tx, event);
                                }
                            }
                        }
                        Err(err) => {
                            warn!(integration = %integration, error = %err, "failed to translate raw message");
                        }
                    }
                }
                _ = flush_tick.tick() => {
                    if let Some(event) = aggregator.flush() {
                        debug!(integration = %integration, "flushing aggregated event");
                        emit(&integration, &engine_tx, event);
                    }
                }
            }
        }
    }
}

fn emit(integration: &str, engine_tx: &mpsc::Sender<Event>, event: Event) {
    if let Err(err) = engine_tx.try_send(event) {
        match err {
            mpsc::error::TrySendError::Full(event) => {
                warn!(integration, kind = %event.kind(), "engine channel full, dropping event");
            }
            mpsc::error::TrySendError::Closed(_) => {
                warn!(integration, "engine channel closed, dropping event");
            }
        }
    }
}
