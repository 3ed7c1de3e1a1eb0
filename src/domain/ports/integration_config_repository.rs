//! Integration config repository port.

use async_trait::async_trait;

use crate::domain::errors::EngineResult;
use crate::domain::models::IntegrationConfig;

/// Repository interface for persisted integration configs.
#[async_trait]
pub trait IntegrationConfigRepository: Send + Sync {
    /// Insert or update; returns the row id.
    async fn save(&self, config: &IntegrationConfig) -> EngineResult<i64>;

    async fn load_all(&self) -> EngineResult<Vec<IntegrationConfig>>;

    async fn load_by_name(&self, name: &str) -> EngineResult<Option<IntegrationConfig>>;

    async fn delete(&self, id: i64) -> EngineResult<()>;
}
