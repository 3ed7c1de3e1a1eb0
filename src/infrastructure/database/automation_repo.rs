//! SQLite implementation of the automation repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::warn;

use crate::domain::errors::EngineResult;
use crate::domain::models::{Action, Automation, Condition, TriggerSpec};
use crate::domain::ports::AutomationRepository;
use crate::infrastructure::database::utils::{parse_datetime, parse_json_or};

pub struct AutomationRepositoryImpl {
    pool: SqlitePool,
}

impl AutomationRepositoryImpl {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_automation(row: &sqlx::sqlite::SqliteRow) -> EngineResult<Automation> {
        let triggers: Vec<TriggerSpec> =
            parse_json_or(&row.get::<String, _>("triggers"), Vec::new())?;
        let conditions: Vec<Condition> =
            parse_json_or(&row.get::<String, _>("conditions"), Vec::new())?;
        let actions: Vec<Action> = parse_json_or(&row.get::<String, _>("actions"), Vec::new())?;
        let last_triggered = row
            .get::<Option<String>, _>("last_triggered")
            .as_deref()
            .map(parse_datetime)
            .transpose()?;

        Ok(Automation {
            id: row.get("id"),
            alias: row.get("alias"),
            description: row.get("description"),
            triggers,
            conditions,
            actions,
            enabled: row.get::<i64, _>("enabled") != 0,
            last_triggered,
        })
    }
}

#[async_trait]
impl AutomationRepository for AutomationRepositoryImpl {
    async fn load_all(&self) -> EngineResult<Vec<Automation>> {
        let rows = sqlx::query(
            "SELECT id, alias, description, triggers, conditions, actions, enabled, last_triggered
             FROM automations ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        // A malformed row is skipped rather than blocking startup.
        let mut automations = Vec::with_capacity(rows.len());
        for row in &rows {
            match Self::row_to_automation(row) {
                Ok(automation) => automations.push(automation),
                Err(err) => {
                    warn!(error = %err, "skipping malformed automation row");
                }
            }
        }
        Ok(automations)
    }

    async fn update_last_triggered(&self, id: i64, when: DateTime<Utc>) -> EngineResult<()> {
        let when = when.to_rfc3339();
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE automations SET last_triggered = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(&when)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl AutomationRepositoryImpl {
    /// Insert an automation (used by tests and tooling; the engine itself
    /// only reads).
    pub async fn insert(&self, automation: &Automation) -> EngineResult<i64> {
        let triggers = serde_json::to_string(&automation.triggers)?;
        let conditions = serde_json::to_string(&automation.conditions)?;
        let actions = serde_json::to_string(&automation.actions)?;
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO automations (alias, description, triggers, conditions, actions, enabled, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        )
        .bind(&automation.alias)
        .bind(&automation.description)
        .bind(&triggers)
        .bind(&conditions)
        .bind(&actions)
        .bind(i64::from(automation.enabled))
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{EventTrigger, EventKind, StateTrigger, Target};
    use crate::infrastructure::database::connection::DatabaseConnection;
    use serde_json::Map;

    async fn repo() -> (DatabaseConnection, AutomationRepositoryImpl) {
        let db = DatabaseConnection::new("sqlite::memory:", 2).await.unwrap();
        db.migrate().await.unwrap();
        let repo = AutomationRepositoryImpl::new(db.pool().clone());
        (db, repo)
    }

    fn sample() -> Automation {
        Automation {
            id: 0,
            alias: "dim-on-press".into(),
            description: "dim lights on button press".into(),
            triggers: vec![
                TriggerSpec::State(StateTrigger {
                    entity_id: "button.kitchen".into(),
                    attribute: None,
                    from: None,
                    to: Some(serde_json::json!("pressed")),
                }),
                TriggerSpec::Event(EventTrigger {
                    event_type: EventKind::TimeChanged,
                }),
            ],
            conditions: vec![],
            actions: vec![Action {
                service: "hue.set_brightness".into(),
                targets: vec![Target {
                    entity_id: "light.kitchen".into(),
                }],
                params: Map::new(),
                blocking: true,
            }],
            enabled: true,
            last_triggered: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_load_round_trip() {
        let (_db, repo) = repo().await;
        repo.insert(&sample()).await.unwrap();

        let loaded = repo.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].alias, "dim-on-press");
        assert_eq!(loaded[0].triggers.len(), 2);
        assert!(loaded[0].enabled);
        assert!(loaded[0].last_triggered.is_none());
    }

    #[tokio::test]
    async fn test_update_last_triggered() {
        let (_db, repo) = repo().await;
        let id = repo.insert(&sample()).await.unwrap();

        let when = Utc::now();
        repo.update_last_triggered(id, when).await.unwrap();

        let loaded = repo.load_all().await.unwrap();
        let triggered = loaded[0].last_triggered.unwrap();
        assert!((triggered - when).num_seconds().abs() < 2);
    }
}
