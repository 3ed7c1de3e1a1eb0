//! Persisted integration configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A user-added integration instance as stored by the config repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationConfig {
    pub id: i64,
    pub integration_name: String,
    pub display_name: String,
    #[serde(default)]
    pub user_config: Map<String, Value>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}
