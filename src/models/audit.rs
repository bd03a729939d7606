//! Audit models - admin action trail and per-organization activity log

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminAction {
    pub id: i64,
    pub admin_id: Option<Uuid>,
    pub org_id: Option<Uuid>,
    pub action: String,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl AdminAction {
    /// Append to the super-admin audit trail. Every state-mutating admin
    /// operation must call this inside its transaction.
    pub async fn log<'e, E>(
        executor: E,
        admin_id: Uuid,
        org_id: Option<Uuid>,
        action: &str,
        details: serde_json::Value,
    ) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query(
            "INSERT INTO admin_actions (admin_id, org_id, action, details) VALUES ($1, $2, $3, $4)"
        )
        .bind(admin_id)
        .bind(org_id)
        .bind(action)
        .bind(details)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AdminAction>(
            "SELECT * FROM admin_actions ORDER BY created_at DESC LIMIT $1"
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

/// Per-organization activity trail written by lifecycle flows
pub async fn log_activity<'e, E>(
    executor: E,
    org_id: Uuid,
    user_id: Uuid,
    action: &str,
    entity_type: &str,
    entity_id: Uuid,
    details: serde_json::Value,
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO activity_logs (org_id, user_id, action, entity_type, entity_id, details)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#
    )
    .bind(org_id)
    .bind(user_id)
    .bind(action)
    .bind(entity_type)
    .bind(entity_id)
    .bind(details)
    .execute(executor)
    .await?;
    Ok(())
}
