//! Tenant (renter) model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub org_id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub id_number: Option<String>,
    pub agent_name: Option<String>,
    pub agent_phone: Option<String>,
    pub is_active: bool,
    pub termination_date: Option<NaiveDate>,
    pub termination_reason: Option<String>,
    pub termination_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTenant {
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub id_number: Option<String>,
    pub agent_name: Option<String>,
    pub agent_phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTenant {
    #[validate(length(min = 1, max = 255))]
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub agent_name: Option<String>,
    pub agent_phone: Option<String>,
}

impl Tenant {
    pub async fn create(pool: &PgPool, org_id: Uuid, data: CreateTenant) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (org_id, full_name, email, phone, id_number, agent_name, agent_phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#
        )
        .bind(org_id)
        .bind(&data.full_name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.id_number)
        .bind(&data.agent_name)
        .bind(&data.agent_phone)
        .fetch_one(pool)
        .await
    }

    pub async fn find_owned(pool: &PgPool, id: Uuid, org_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1 AND org_id = $2")
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_org(pool: &PgPool, org_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tenant>(
            "SELECT * FROM tenants WHERE org_id = $1 AND is_active = true ORDER BY created_at DESC"
        )
        .bind(org_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list_terminated(pool: &PgPool, org_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tenant>(
            r#"
            SELECT * FROM tenants
            WHERE org_id = $1 AND termination_date IS NOT NULL
            ORDER BY termination_date DESC
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
        data: UpdateTenant,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tenant>(
            r#"
            UPDATE tenants
            SET full_name = COALESCE($3, full_name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                agent_name = COALESCE($6, agent_name),
                agent_phone = COALESCE($7, agent_phone),
                updated_at = NOW()
            WHERE id = $1 AND org_id = $2 AND is_active = true
            RETURNING *
            "#
        )
        .bind(id)
        .bind(org_id)
        .bind(&data.full_name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.agent_name)
        .bind(&data.agent_phone)
        .fetch_optional(pool)
        .await
    }

    pub async fn deactivate(pool: &PgPool, id: Uuid, org_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tenants SET is_active = false, updated_at = NOW() WHERE id = $1 AND org_id = $2"
        )
        .bind(id)
        .bind(org_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
