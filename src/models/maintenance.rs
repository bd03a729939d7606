//! Maintenance request model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MaintenanceRequest {
    pub id: Uuid,
    pub org_id: Uuid,
    pub property_id: Uuid,
    pub unit_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub status: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMaintenanceRequest {
    pub property_id: Uuid,
    pub unit_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMaintenanceRequest {
    pub status: Option<String>,
    pub priority: Option<String>,
}

impl MaintenanceRequest {
    pub async fn create(
        pool: &PgPool,
        org_id: Uuid,
        data: CreateMaintenanceRequest,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceRequest>(
            r#"
            INSERT INTO maintenance_requests
                (org_id, property_id, unit_id, tenant_id, title, description, priority)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#
        )
        .bind(org_id)
        .bind(data.property_id)
        .bind(data.unit_id)
        .bind(data.tenant_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.priority.unwrap_or_else(|| "medium".to_string()))
        .fetch_one(pool)
        .await
    }

    pub async fn list_by_org(pool: &PgPool, org_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceRequest>(
            r#"
            SELECT * FROM maintenance_requests
            WHERE org_id = $1 AND is_active = true
            ORDER BY created_at DESC
            "#
        )
        .bind(org_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        org_id: Uuid,
        data: UpdateMaintenanceRequest,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceRequest>(
            r#"
            UPDATE maintenance_requests
            SET status = COALESCE($3, status),
                priority = COALESCE($4, priority),
                updated_at = NOW()
            WHERE id = $1 AND org_id = $2 AND is_active = true
            RETURNING *
            "#
        )
        .bind(id)
        .bind(org_id)
        .bind(&data.status)
        .bind(&data.priority)
        .fetch_optional(pool)
        .await
    }
}
