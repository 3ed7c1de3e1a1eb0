//! Hue bridge event stream.
//!
//! Consumes the bridge's server-sent-events endpoint and forwards each
//! complete `data:` payload as one raw frame. The source owns its
//! connection: stream errors reconnect with exponential backoff, and a
//! successful connection resets the backoff.

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::ports::EventSource;

pub struct HueEventSource {
    ip: String,
    app_key: String,
    http: reqwest::Client,
}

impl HueEventSource {
    pub fn new(ip: impl Into<String>, app_key: impl Into<String>) -> EngineResult<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self {
            ip: ip.into(),
            app_key: app_key.into(),
            http,
        })
    }

    async fn stream_once(
        &self,
        cancel: &CancellationToken,
        out: &mpsc::Sender<Vec<u8>>,
        backoff: &mut ExponentialBackoff,
    ) -> EngineResult<()> {
        let url = format!("https://{}/eventstream/clip/v2", self.ip);
        let response = self
            .http
            .get(&url)
            .header("hue-application-key", &self.app_key)
            .header("Accept", "text/event-stream")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(EngineError::Source(format!(
                "event stream returned {}",
                response.status()
            )));
        }
        info!("connected to hue event stream");
        backoff.reset();

        let mut stream = response.bytes_stream();
        let mut pending = String::new();
        let mut data = String::new();

        loop {
            let chunk = tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                chunk = stream.next() => chunk,
            };
            let Some(chunk) = chunk else {
                return Err(EngineError::Source("event stream closed".into()));
            };
            let chunk = chunk.map_err(|err| EngineError::Source(err.to_string()))?;
            pending.push_str(&String::from_utf8_lossy(&chunk));

            // SSE frames: data lines accumulate until a blank line.
            while let Some(newline) = pending.find('\n') {
                let line: String = pending.drain(..=newline).collect();
                let line = line.trim_end();
                if line.is_empty() {
                    if !data.is_empty() {
                        debug!(bytes = data.len(), "forwarding hue event frame");
                        if out.send(data.clone().into_bytes()).await.is_err() {
                            return Ok(());
                        }
                        data.clear();
                    }
                } else if let Some(payload) = line.strip_prefix("data: ") {
                    data.push_str(payload);
                }
            }
        }
    }
}

#[async_trait]
impl EventSource for HueEventSource {
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
            match self.stream_once(&cancel, &out, &mut backoff).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    let delay = backoff.next_backoff().unwrap_or(Duration::from_secs(30));
                    warn!(error = %err, delay = ?delay, "hue event stream failed, reconnecting");
                    tokio::select! {
                        () = cancel.cancelled() => return Ok(()),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}
