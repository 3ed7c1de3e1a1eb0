//! Event repository port.

use async_trait::async_trait;

use crate::domain::errors::EngineResult;
use crate::domain::models::Event;

/// Repository interface for processed-event persistence. Saving is
/// best-effort from the processor's point of view; a failure is logged and
/// never stalls the pipeline.
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn save(&self, event: &Event) -> EngineResult<()>;
}
