//! Automation repository port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::EngineResult;
use crate::domain::models::Automation;

/// Repository interface for persisted automations.
#[async_trait]
pub trait AutomationRepository: Send + Sync {
    /// Load every stored automation, enabled or not.
    async fn load_all(&self) -> EngineResult<Vec<Automation>>;

    /// Record when an automation last fired.
    async fn update_last_triggered(&self, id: i64, when: DateTime<Utc>) -> EngineResult<()>;
}
