//! SQLite implementation of the entity repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, SqlitePool};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::Entity;
use crate::domain::ports::EntityRepository;
use crate::infrastructure::database::utils::parse_datetime;

pub struct EntityRepositoryImpl {
    pool: SqlitePool,
}

impl EntityRepositoryImpl {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_entity(row: &sqlx::sqlite::SqliteRow) -> EngineResult<Entity> {
        Ok(Entity {
            external_id: row.get("external_id"),
            device_id: row.get("device_id"),
            entity_id: row.get("entity_id"),
            entity_type: row
                .get::<String, _>("entity_type")
                .parse()
                .map_err(EngineError::Storage)?,
            name: row.get("name"),
            enabled: row.get::<i64, _>("enabled") != 0,
            available: row.get::<i64, _>("available") != 0,
            created_at: parse_datetime(&row.get::<String, _>("created_at"))?,
        })
    }
}

const ENTITY_COLUMNS: &str =
    "external_id, device_id, entity_id, entity_type, name, enabled, available, created_at";

#[async_trait]
impl EntityRepository for EntityRepositoryImpl {
    async fn add(&self, entity: &Entity) -> EngineResult<()> {
        let created_at = entity.created_at.to_rfc3339();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO entities (external_id, device_id, entity_id, entity_type, name, enabled, available, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&entity.external_id)
        .bind(&entity.device_id)
        .bind(&entity.entity_id)
        .bind(entity.entity_type.as_str())
        .bind(&entity.name)
        .bind(i64::from(entity.enabled))
        .bind(i64::from(entity.available))
        .bind(&created_at)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, entity: &Entity) -> EngineResult<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE entities SET device_id = ?2, entity_id = ?3, entity_type = ?4, name = ?5,
             enabled = ?6, available = ?7, updated_at = ?8 WHERE external_id = ?1",
        )
        .bind(&entity.external_id)
        .bind(&entity.device_id)
        .bind(&entity.entity_id)
        .bind(entity.entity_type.as_str())
        .bind(&entity.name)
        .bind(i64::from(entity.enabled))
        .bind(i64::from(entity.available))
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, external_id: &str) -> EngineResult<Option<Entity>> {
        let row = sqlx::query(&format!(
            "SELECT {ENTITY_COLUMNS} FROM entities WHERE external_id = ?1"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_entity).transpose()
    }

    async fn get_all(&self) -> EngineResult<Vec<Entity>> {
        let rows = sqlx::query(&format!("SELECT {ENTITY_COLUMNS} FROM entities"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_entity).collect()
    }

    async fn get_by_device(&self, device_id: &str) -> EngineResult<Vec<Entity>> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTITY_COLUMNS} FROM entities WHERE device_id = ?1"
        ))
        .bind(device_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_entity).collect()
    }

    async fn get_by_device_ids(&self, device_ids: &[String]) -> EngineResult<Vec<Entity>> {
        if device_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::new(format!(
            "SELECT {ENTITY_COLUMNS} FROM entities WHERE device_id IN ("
        ));
        let mut separated = builder.separated(", ");
        for device_id in device_ids {
            separated.push_bind(device_id);
        }
        separated.push_unseparated(")");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_entity).collect()
    }

    async fn delete(&self, external_id: &str) -> EngineResult<()> {
        sqlx::query("DELETE FROM entities WHERE external_id = ?1")
            .bind(external_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
