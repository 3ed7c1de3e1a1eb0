//! SQLite implementation of the device repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::Device;
use crate::domain::ports::DeviceRepository;
use crate::infrastructure::database::utils::{parse_datetime, parse_json_or};

pub struct DeviceRepositoryImpl {
    pool: SqlitePool,
}

impl DeviceRepositoryImpl {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_device(row: &sqlx::sqlite::SqliteRow) -> EngineResult<Device> {
        Ok(Device {
            id: row.get("id"),
            integration_id: row.get("integration_id"),
            device_type: row
                .get::<String, _>("device_type")
                .parse()
                .map_err(EngineError::Storage)?,
            name: row.get("name"),
            metadata: parse_json_or(&row.get::<String, _>("metadata"), serde_json::Map::new())?,
            enabled: row.get::<i64, _>("enabled") != 0,
            available: row.get::<i64, _>("available") != 0,
            created_at: parse_datetime(&row.get::<String, _>("created_at"))?,
        })
    }
}

const DEVICE_COLUMNS: &str =
    "id, integration_id, device_type, name, metadata, enabled, available, created_at";

#[async_trait]
impl DeviceRepository for DeviceRepositoryImpl {
    async fn add(&self, device: &Device) -> EngineResult<()> {
        let metadata = serde_json::to_string(&device.metadata)?;
        let created_at = device.created_at.to_rfc3339();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO devices (id, integration_id, device_type, name, metadata, enabled, available, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&device.id)
        .bind(device.integration_id)
        .bind(device.device_type.as_str())
        .bind(&device.name)
        .bind(&metadata)
        .bind(i64::from(device.enabled))
        .bind(i64::from(device.available))
        .bind(&created_at)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, device: &Device) -> EngineResult<()> {
        let metadata = serde_json::to_string(&device.metadata)?;
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE devices SET integration_id = ?2, device_type = ?3, name = ?4, metadata = ?5,
             enabled = ?6, available = ?7, updated_at = ?8 WHERE id = ?1",
        )
        .bind(&device.id)
        .bind(device.integration_id)
        .bind(device.device_type.as_str())
        .bind(&device.name)
        .bind(&metadata)
        .bind(i64::from(device.enabled))
        .bind(i64::from(device.available))
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> EngineResult<Option<Device>> {
        let row = sqlx::query(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_device).transpose()
    }

    async fn get_all(&self) -> EngineResult<Vec<Device>> {
        let rows = sqlx::query(&format!("SELECT {DEVICE_COLUMNS} FROM devices"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_device).collect()
    }

    async fn get_by_integration(&self, integration_id: i64) -> EngineResult<Vec<Device>> {
        let rows = sqlx::query(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE integration_id = ?1"
        ))
        .bind(integration_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_device).collect()
    }

    async fn delete(&self, id: &str) -> EngineResult<()> {
        sqlx::query("DELETE FROM devices WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
