//! Write-side websocket client for the Halo controller.
//!
//! Connects lazily, reconnects on the next send after a failure. The read
//! side lives in the event source on its own connection.

use futures::SinkExt;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::domain::errors::{EngineError, EngineResult};

use super::config::{ConfigWrapper, HaloConfig};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Serialize)]
struct UpdateCommand<T: Serialize> {
    update: T,
}

#[derive(Debug, Serialize)]
pub struct ButtonUpdate {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
    pub value: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ButtonContent>,
}

#[derive(Debug, Serialize)]
pub struct ButtonContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Serialize)]
struct NotificationUpdate {
    #[serde(rename = "type")]
    kind: &'static str,
    title: String,
    subtitle: String,
}

pub struct HaloClient {
    url: String,
    config: HaloConfig,
    stream: Mutex<Option<WsStream>>,
}

impl HaloClient {
    pub fn new(ip: &str, port: u16, config: HaloConfig) -> Self {
        Self {
            url: format!("ws://{ip}:{port}"),
            config,
            stream: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &HaloConfig {
        &self.config
    }

    async fn send_json<T: Serialize>(&self, payload: &T) -> EngineResult<()> {
        let text = serde_json::to_string(payload)?;
        let mut guard = self.stream.lock().await;

        if guard.is_none() {
            let (stream, _) = connect_async(&self.url)
                .await
                .map_err(|err| EngineError::ServiceCall(format!("halo connect failed: {err}")))?;
            debug!(url = %self.url, "connected to halo websocket");
            *guard = Some(stream);
        }

        let Some(stream) = guard.as_mut() else {
            return Err(EngineError::ServiceCall("halo connection unavailable".into()));
        };
        if let Err(err) = stream.send(Message::Text(text)).await {
            // Drop the broken connection; the next send redials.
            *guard = None;
            warn!(error = %err, "halo send failed, connection dropped");
            return Err(EngineError::ServiceCall(format!("halo send failed: {err}")));
        }
        Ok(())
    }

    /// Push the configured pages to the device.
    pub async fn deploy_config(&self) -> EngineResult<()> {
        self.send_json(&ConfigWrapper {
            configuration: &self.config,
        })
        .await
    }

    pub async fn update_button_value(&self, button_id: &str, value: i64) -> EngineResult<()> {
        self.send_json(&UpdateCommand {
            update: ButtonUpdate {
                kind: "button",
                id: button_id.to_string(),
                value,
                content: None,
            },
        })
        .await
    }

    pub async fn display_notification(&self, title: &str, subtitle: &str) -> EngineResult<()> {
        self.send_json(&UpdateCommand {
            update: NotificationUpdate {
                kind: "notification",
                title: title.to_string(),
                subtitle: subtitle.to_string(),
            },
        })
        .await
    }
}
