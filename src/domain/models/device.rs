//! Device model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of physical or logical unit a device represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Light,
    GroupedLight,
    Remote,
    Speaker,
    Bridge,
    Unknown,
}

impl DeviceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::GroupedLight => "grouped_light",
            Self::Remote => "remote",
            Self::Speaker => "speaker",
            Self::Bridge => "bridge",
            Self::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "grouped_light" => Ok(Self::GroupedLight),
            "remote" => Ok(Self::Remote),
            "speaker" => Ok(Self::Speaker),
            "bridge" => Ok(Self::Bridge),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown device type: {other}")),
        }
    }
}

/// Grouping of entities exposed by one physical or logical unit, owned by
/// exactly one integration instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Integration-local device identifier.
    pub id: String,
    /// Row id of the owning integration config.
    pub integration_id: i64,
    pub device_type: DeviceType,
    pub name: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub enabled: bool,
    pub available: bool,
    pub created_at: DateTime<Utc>,
}
