//! Device repository port.

use async_trait::async_trait;

use crate::domain::errors::EngineResult;
use crate::domain::models::Device;

/// Repository interface for device persistence.
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn add(&self, device: &Device) -> EngineResult<()>;

    async fn update(&self, device: &Device) -> EngineResult<()>;

    async fn get(&self, id: &str) -> EngineResult<Option<Device>>;

    async fn get_all(&self) -> EngineResult<Vec<Device>>;

    /// All devices owned by one integration config.
    async fn get_by_integration(&self, integration_id: i64) -> EngineResult<Vec<Device>>;

    async fn delete(&self, id: &str) -> EngineResult<()>;
}
