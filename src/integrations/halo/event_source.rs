//! Read-side websocket connection to the Halo controller.
//!
//! Deploys the configured pages on connect (the device only reports
//! events for a deployed configuration), then forwards each text message
//! as one raw frame. Reconnects with exponential backoff.

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::ports::EventSource;

use super::config::{ConfigWrapper, HaloConfig};

pub struct HaloEventSource {
    url: String,
    config: HaloConfig,
}

impl HaloEventSource {
    pub fn new(ip: &str, port: u16, config: HaloConfig) -> Self {
        Self {
            url: format!("ws://{ip}:{port}"),
            config,
        }
    }

    async fn read_once(
        &self,
        cancel: &CancellationToken,
        out: &mpsc::Sender<Vec<u8>>,
        backoff: &mut ExponentialBackoff,
    ) -> EngineResult<()> {
        let (mut stream, _) = connect_async(&self.url)
            .await
            .map_err(|err| EngineError::Source(format!("halo connect failed: {err}")))?;
        info!(url = %self.url, "connected to halo websocket");
        backoff.reset();

        let deploy = serde_json::to_string(&ConfigWrapper {
            configuration: &self.config,
        })?;
        stream
            .send(Message::Text(deploy))
            .await
            .map_err(|err| EngineError::Source(format!("halo config deploy failed: {err}")))?;

        loop {
            let message = tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                message = stream.next() => message,
            };
            let Some(message) = message else {
                return Err(EngineError::Source("halo websocket closed".into()));
            };
            match message {
                Ok(Message::Text(text)) => {
                    if out.send(text.into_bytes()).await.is_err() {
                        return Ok(());
                    }
                }
                Ok(Message::Binary(bytes)) => {
                    if out.send(bytes).await.is_err() {
                        return Ok(());
                    }
                }
                Ok(Message::Close(_)) => {
                    return Err(EngineError::Source("halo websocket closed".into()));
                }
                Ok(_) => {}
                Err(err) => {
                    return Err(EngineError::Source(format!("halo read failed: {err}")));
                }
            }
        }
    }
}

#[async_trait]
impl EventSource for HaloEventSource {
    async fn run(
        &self,
        cancel: CancellationToken,
        out: mpsc::Sender<Vec<u8>>,
    ) -> EngineResult<()> {
        let mut backoff = ExponentialBackoff {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };

        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }
            match self.read_once(&cancel, &out, &mut backoff).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    let delay = backoff.next_backoff().unwrap_or(Duration::from_secs(30));
                    warn!(error = %err, delay = ?delay, "halo websocket failed, reconnecting");
                    tokio::select! {
                        () = cancel.cancelled() => return Ok(()),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}
