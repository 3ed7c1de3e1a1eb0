//! Wheel burst aggregation through a real pipeline: the halo translator
//! and wheel aggregator wired to a scripted source.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use hearth::domain::errors::EngineResult;
use hearth::domain::models::PipelineConfig;
use hearth::domain::ports::EventSource;
use hearth::integrations::halo::aggregator::WheelAggregator;
use hearth::integrations::halo::translator::{HaloTranslator, WHEEL_STEP_ATTR};
use hearth::services::entity_registry::EntityRegistry;
use hearth::services::pipeline::EventPipeline;
use hearth::services::state_cache::StateCache;

/// Emits four wheel ticks in quick succession, then idles until cancel.
struct BurstSource;

#[async_trait]
impl EventSource for BurstSource {
    async fn run(
        &self,
        cancel: CancellationToken,
        out: mpsc::Sender<Vec<u8>>,
    ) -> EngineResult<()> {
        for _ in 0..4 {
            let frame = json!({"event": {"type": "wheel", "id": "btn-1", "counts": 1}})
                .to_string()
                .into_bytes();
            if out.send(frame).await.is_err() {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancelled().await;
        Ok(())
    }
}

#[tokio::test]
async fn test_wheel_burst_aggregates_to_single_event() {
    let cache = Arc::new(StateCache::new());
    let registry = Arc::new(EntityRegistry::new());
    registry.register("btn-1", "button.halo_lights");

    let (engine_tx, mut engine_rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    let pipeline = EventPipeline {
        integration: "halo".into(),
        source: Box::new(BurstSource),
        translator: Box::new(HaloTranslator::new(cache, registry)),
        aggregator: Box::new(WheelAggregator::new()),
        engine_tx,
        config: PipelineConfig {
            raw_channel_capacity: 16,
            flush_interval_ms: 300,
        },
        cancel: cancel.clone(),
    };
    let handle = tokio::spawn(pipeline.run());

    // Exactly one aggregated event arrives within a flush period, and it
    // carries the burst total.
    let event = tokio::time::timeout(Duration::from_millis(700), engine_rx.recv())
        .await
        .expect("aggregated event within flush window")
        .expect("open channel");
    let data = event.as_state_changed().unwrap();
    assert_eq!(data.entity_id, "button.halo_lights");
    assert_eq!(
        data.new_state.as_ref().unwrap().attribute(WHEEL_STEP_ATTR),
        Some(&json!(4))
    );

    // No duplicates on subsequent flushes.
    let extra = tokio::time::timeout(Duration::from_millis(400), engine_rx.recv()).await;
    assert!(extra.is_err(), "burst produced exactly one event");

    cancel.cancel();
    handle.await.unwrap().unwrap();
}
