//! Halo controller configuration: pages of buttons, deployed to the
//! device over its websocket.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::errors::{EngineError, EngineResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HaloConfig {
    pub version: String,
    pub id: String,
    #[serde(default)]
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub title: String,
    pub id: String,
    #[serde(default)]
    pub buttons: Vec<Button>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Button {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub value: i64,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub content: Content,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub icon: String,
}

/// Wire wrapper the device expects when a configuration is deployed.
#[derive(Debug, Serialize)]
pub struct ConfigWrapper<'a> {
    pub configuration: &'a HaloConfig,
}

impl HaloConfig {
    /// Extract the `configuration` object from the integration's user
    /// config.
    pub fn from_user_config(user_config: &Map<String, Value>) -> EngineResult<Self> {
        let raw = user_config
            .get("configuration")
            .ok_or_else(|| EngineError::InvalidConfig("halo config missing configuration".into()))?;
        serde_json::from_value(raw.clone())
            .map_err(|err| EngineError::InvalidConfig(format!("invalid halo configuration: {err}")))
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.pages.iter().flat_map(|page| page.buttons.iter())
    }

    pub fn button_id_by_title(&self, title: &str) -> Option<&str> {
        self.buttons()
            .find(|button| button.title == title)
            .map(|button| button.id.as_str())
    }
}
