//! Entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Semantic type of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Light,
    Scene,
    Speaker,
    Button,
    Wheel,
    Unknown,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Scene => "scene",
            Self::Speaker => "speaker",
            Self::Button => "button",
            Self::Wheel => "wheel",
            Self::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "scene" => Ok(Self::Scene),
            "speaker" => Ok(Self::Speaker),
            "button" => Ok(Self::Button),
            "wheel" => Ok(Self::Wheel),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown entity type: {other}")),
        }
    }
}

/// A single controllable or observable unit exposed by an integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// The integration's own identifier, opaque to the engine.
    pub external_id: String,
    /// External id of the device exposing this entity.
    pub device_id: String,
    /// Canonical engine identifier, e.g. `light.living_room`.
    pub entity_id: String,
    pub entity_type: EntityType,
    pub name: String,
    pub enabled: bool,
    pub available: bool,
    pub created_at: DateTime<Utc>,
}

/// Normalize a human-supplied name into an entity-id segment: lowercase,
/// runs of non-alphanumerics collapsed to a single underscore.
pub fn normalize_name(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_sep = true;
    for c in s.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Build a canonical entity id from a type and a display name.
pub fn entity_id_for(entity_type: EntityType, name: &str) -> String {
    format!("{}.{}", entity_type.as_str(), normalize_name(name))
}
