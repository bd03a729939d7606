//! Notification model
//!
//! Reminders are deduplicated on a structured key
//! (org, recipient, type, entity, day) backed by a partial unique index,
//! so a batch run can insert blindly with ON CONFLICT DO NOTHING.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub notification_type: String,
    pub title: String,
    pub message: Option<String>,
    pub entity_id: Option<Uuid>,
    pub dedup_date: Option<NaiveDate>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Insert a deduplicated notification. Returns false when an identical
    /// (type, entity, recipient, day) notification already exists today.
    pub async fn raise<'e, E>(
        executor: E,
        org_id: Uuid,
        user_id: Uuid,
        notification_type: &str,
        title: &str,
        message: &str,
        entity_id: Uuid,
        dedup_date: NaiveDate,
    ) -> Result<bool, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications
                (org_id, user_id, notification_type, title, message, entity_id, dedup_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (org_id, user_id, notification_type, entity_id, dedup_date)
                WHERE entity_id IS NOT NULL AND dedup_date IS NOT NULL
                DO NOTHING
            "#
        )
        .bind(org_id)
        .bind(user_id)
        .bind(notification_type)
        .bind(title)
        .bind(message)
        .bind(entity_id)
        .bind(dedup_date)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_for_user(pool: &PgPool, user_id: Uuid, org_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1 AND org_id = $2
            ORDER BY created_at DESC
            LIMIT 100
            "#
        )
        .bind(user_id)
        .bind(org_id)
        .fetch_all(pool)
        .await
    }

    pub async fn mark_read(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true WHERE id = $1 AND user_id = $2"
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
