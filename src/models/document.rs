//! Document metadata model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub doc_type: Option<String>,
    pub file_path: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDocument {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub doc_type: Option<String>,
    pub file_path: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
}

impl Document {
    pub async fn create(pool: &PgPool, org_id: Uuid, data: CreateDocument) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (org_id, name, doc_type, file_path, entity_type, entity_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#
        )
        .bind(org_id)
        .bind(&data.name)
        .bind(&data.doc_type)
        .bind(&data.file_path)
        .bind(&data.entity_type)
        .bind(data.entity_id)
        .fetch_one(pool)
        .await
    }

    pub async fn list_by_org(pool: &PgPool, org_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE org_id = $1 AND is_active = true ORDER BY created_at DESC"
        )
        .bind(org_id)
        .fetch_all(pool)
        .await
    }

    pub async fn deactivate(pool: &PgPool, id: Uuid, org_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE documents SET is_active = false WHERE id = $1 AND org_id = $2"
        )
        .bind(id)
        .bind(org_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
