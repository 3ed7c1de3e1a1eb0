//! SQLite implementation of the integration config repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::domain::errors::EngineResult;
use crate::domain::models::IntegrationConfig;
use crate::domain::ports::IntegrationConfigRepository;
use crate::infrastructure::database::utils::{parse_datetime, parse_json_or};

pub struct IntegrationConfigRepositoryImpl {
    pool: SqlitePool,
}

impl IntegrationConfigRepositoryImpl {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_config(row: &sqlx::sqlite::SqliteRow) -> EngineResult<IntegrationConfig> {
        Ok(IntegrationConfig {
            id: row.get("id"),
            integration_name: row.get("integration_name"),
            display_name: row.get("display_name"),
            user_config: parse_json_or(
                &row.get::<String, _>("user_config"),
                serde_json::Map::new(),
            )?,
            enabled: row.get::<i64, _>("enabled") != 0,
            created_at: parse_datetime(&row.get::<String, _>("created_at"))?,
        })
    }
}

#[async_trait]
impl IntegrationConfigRepository for IntegrationConfigRepositoryImpl {
    async fn save(&self, config: &IntegrationConfig) -> EngineResult<i64> {
        let user_config = serde_json::to_string(&config.user_config)?;
        let created_at = config.created_at.to_rfc3339();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO integration_configs (integration_name, display_name, user_config, enabled, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(integration_name) DO UPDATE SET
                 display_name = excluded.display_name,
                 user_config = excluded.user_config,
                 enabled = excluded.enabled,
                 updated_at = excluded.updated_at",
        )
        .bind(&config.integration_name)
        .bind(&config.display_name)
        .bind(&user_config)
        .bind(i64::from(config.enabled))
        .bind(&created_at)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        // last_insert_rowid is unreliable on the update path of an upsert.
        let row = sqlx::query("SELECT id FROM integration_configs WHERE integration_name = ?1")
            .bind(&config.integration_name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("id"))
    }

    async fn load_all(&self) -> EngineResult<Vec<IntegrationConfig>> {
        let rows = sqlx::query(
            "SELECT id, integration_name, display_name, user_config, enabled, created_at
             FROM integration_configs",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_config).collect()
    }

    async fn load_by_name(&self, name: &str) -> EngineResult<Option<IntegrationConfig>> {
        let row = sqlx::query(
            "SELECT id, integration_name, display_name, user_config, enabled, created_at
             FROM integration_configs WHERE integration_name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_config).transpose()
    }

    async fn delete(&self, id: i64) -> EngineResult<()> {
        sqlx::query("DELETE FROM integration_configs WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
