//! Entity repository port.

use async_trait::async_trait;

use crate::domain::errors::EngineResult;
use crate::domain::models::Entity;

/// Repository interface for entity persistence. Entities are keyed by
/// their integration-local external id.
#[async_trait]
pub trait EntityRepository: Send + Sync {
    async fn add(&self, entity: &Entity) -> EngineResult<()>;

    async fn update(&self, entity: &Entity) -> EngineResult<()>;

    async fn get(&self, external_id: &str) -> EngineResult<Option<Entity>>;

    async fn get_all(&self) -> EngineResult<Vec<Entity>>;

    async fn get_by_device(&self, device_id: &str) -> EngineResult<Vec<Entity>>;

    async fn get_by_device_ids(&self, device_ids: &[String]) -> EngineResult<Vec<Entity>>;

    async fn delete(&self, external_id: &str) -> EngineResult<()>;
}
