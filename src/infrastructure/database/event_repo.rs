//! SQLite implementation of the event repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::Event;
use crate::domain::ports::EventRepository;

pub struct EventRepositoryImpl {
    pool: SqlitePool,
}

impl EventRepositoryImpl {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for EventRepositoryImpl {
    /// Persist the event and its context in one transaction. The context
    /// row is shared by every event carrying the same context id.
    async fn save(&self, event: &Event) -> EngineResult<()> {
        let tagged = serde_json::to_value(&event.data)?;
        let data = tagged
            .get("data")
            .ok_or_else(|| EngineError::Serialization("event data missing payload".into()))?
            .to_string();
        let event_type = event.kind().to_string();
        let context_id = event.context.id.to_string();
        let parent_id = event.context.parent_id.map(|id| id.to_string());
        let time_fired = event.time_fired.to_rfc3339();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT OR IGNORE INTO contexts (id, parent_id, created_at) VALUES (?1, ?2, ?3)")
            .bind(&context_id)
            .bind(&parent_id)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO events (event_type, data, context_id, time_fired, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&event_type)
        .bind(&data)
        .bind(&context_id)
        .bind(&time_fired)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }
}
