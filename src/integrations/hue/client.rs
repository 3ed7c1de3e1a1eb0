//! HTTP client for the Hue bridge CLIP v2 API.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::errors::{EngineError, EngineResult};

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceRef {
    pub rid: String,
    pub rtype: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceMetadata {
    pub name: String,
    #[serde(default)]
    pub archetype: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OnState {
    pub on: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dimming {
    pub brightness: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColorXy {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColorState {
    pub xy: ColorXy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColorTemperature {
    #[serde(default)]
    pub mirek: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LightGet {
    pub id: String,
    pub owner: ResourceRef,
    pub metadata: ResourceMetadata,
    #[serde(default)]
    pub on: Option<OnState>,
    #[serde(default)]
    pub dimming: Option<Dimming>,
    #[serde(default)]
    pub color: Option<ColorState>,
    #[serde(default)]
    pub color_temperature: Option<ColorTemperature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupedLightGet {
    pub id: String,
    pub owner: ResourceRef,
    #[serde(default)]
    pub on: Option<OnState>,
    #[serde(default)]
    pub dimming: Option<Dimming>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneGet {
    pub id: String,
    pub metadata: ResourceMetadata,
    /// The room or zone the scene belongs to.
    pub group: ResourceRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomGet {
    pub id: String,
    pub metadata: ResourceMetadata,
    /// Services exposed by the room, including its grouped_light.
    #[serde(default)]
    pub services: Vec<ResourceRef>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Serialize)]
struct OnPut {
    on: OnBody,
}

#[derive(Debug, Serialize)]
struct OnBody {
    on: bool,
}

#[derive(Debug, Serialize)]
struct DimmingPut {
    dimming: DimmingBody,
}

#[derive(Debug, Serialize)]
struct DimmingBody {
    brightness: f64,
}

#[derive(Debug, Serialize)]
struct DimmingDeltaPut {
    dimming_delta: DimmingDeltaBody,
}

#[derive(Debug, Serialize)]
struct DimmingDeltaBody {
    action: String,
    brightness_delta: f64,
}

#[derive(Debug, Serialize)]
struct RecallPut {
    recall: RecallBody,
}

#[derive(Debug, Serialize)]
struct RecallBody {
    action: String,
}

pub struct HueClient {
    ip: String,
    app_key: String,
    http: reqwest::Client,
}

impl HueClient {
    pub fn new(ip: impl Into<String>, app_key: impl Into<String>) -> EngineResult<Self> {
        let app_key = app_key.into();
        if app_key.is_empty() {
            return Err(EngineError::InvalidConfig("missing hue app key".into()));
        }
        // The bridge serves a self-signed certificate.
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self {
            ip: ip.into(),
            app_key,
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("https://{}/clip/v2/{path}", self.ip)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> EngineResult<Vec<T>> {
        let response = self
            .http
            .get(self.url(path))
            .header("hue-application-key", &self.app_key)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(EngineError::Http(format!(
                "GET {path} returned {}",
                response.status()
            )));
        }
        let body: ApiResponse<T> = response.json().await?;
        Ok(body.data)
    }

    async fn put<B: Serialize>(&self, path: &str, body: &B) -> EngineResult<()> {
        let response = self
            .http
            .put(self.url(path))
            .header("hue-application-key", &self.app_key)
            .json(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(EngineError::Http(format!(
                "PUT {path} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    pub async fn lights(&self) -> EngineResult<Vec<LightGet>> {
        self.get("resource/light").await
    }

    pub async fn grouped_lights(&self) -> EngineResult<Vec<GroupedLightGet>> {
        self.get("resource/grouped_light").await
    }

    pub async fn scenes(&self) -> EngineResult<Vec<SceneGet>> {
        self.get("resource/scene").await
    }

    pub async fn rooms(&self) -> EngineResult<Vec<RoomGet>> {
        self.get("resource/room").await
    }

    pub async fn set_light_on(&self, id: &str, on: bool) -> EngineResult<()> {
        self.put(
            &format!("resource/light/{id}"),
            &OnPut {
                on: OnBody { on },
            },
        )
        .await
    }

    /// Brightness is a percentage; the bridge clamps 0 to its minimum.
    pub async fn set_light_brightness(&self, id: &str, brightness: f64) -> EngineResult<()> {
        self.put(
            &format!("resource/light/{id}"),
            &DimmingPut {
                dimming: DimmingBody { brightness },
            },
        )
        .await
    }

    pub async fn step_light_brightness(
        &self,
        id: &str,
        delta: f64,
        direction: &str,
    ) -> EngineResult<()> {
        let action = match direction {
            "down" => "down",
            _ => "up",
        };
        self.put(
            &format!("resource/light/{id}"),
            &DimmingDeltaPut {
                dimming_delta: DimmingDeltaBody {
                    action: action.to_string(),
                    brightness_delta: delta.abs(),
                },
            },
        )
        .await
    }

    pub async fn recall_scene(&self, id: &str) -> EngineResult<()> {
        self.put(
            &format!("resource/scene/{id}"),
            &RecallPut {
                recall: RecallBody {
                    action: "active".to_string(),
                },
            },
        )
        .await
    }
}
