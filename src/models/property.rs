//! Property and Unit models

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Property {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub property_type: Option<String>,
    pub total_units: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProperty {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub address: Option<String>,
    pub property_type: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProperty {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub address: Option<String>,
    pub property_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Unit {
    pub id: Uuid,
    pub property_id: Uuid,
    pub org_id: Uuid,
    pub unit_number: String,
    pub floor: Option<String>,
    pub is_occupied: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUnit {
    #[validate(length(min = 1, max = 50))]
    pub unit_number: String,
    pub floor: Option<String>,
}

impl Property {
    pub async fn create(pool: &PgPool, org_id: Uuid, data: CreateProperty) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Property>(
            r#"
            INSERT INTO properties (org_id, name, address, property_type)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#
        )
        .bind(org_id)
        .bind(&data.name)
        .bind(&data.address)
        .bind(&data.property_type)
        .fetch_one(pool)
        .await
    }

    pub async fn find_owned(pool: &PgPool, id: Uuid, org_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Property>(
            "SELECT * FROM properties WHERE id = $1 AND org_id = $2 AND is_active = true"
        )
        .bind(id)
        .bind(org_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_by_org(pool: &PgPool, org_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Property>(
            "SELECT * FROM properties WHERE org_id = $1 AND is_active = true ORDER BY created_at DESC"
        )
        .bind(org_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        org_id: Uuid,
        data: UpdateProperty,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Property>(
            r#"
            UPDATE properties
            SET name = COALESCE($3, name),
                address = COALESCE($4, address),
                property_type = COALESCE($5, property_type),
                updated_at = NOW()
            WHERE id = $1 AND org_id = $2 AND is_active = true
            RETURNING *
            "#
        )
        .bind(id)
        .bind(org_id)
        .bind(&data.name)
        .bind(&data.address)
        .bind(&data.property_type)
        .fetch_optional(pool)
        .await
    }

    /// Soft delete; units cascade via org-scoped deactivation
    pub async fn deactivate(pool: &PgPool, id: Uuid, org_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE properties SET is_active = false, updated_at = NOW() WHERE id = $1 AND org_id = $2"
        )
        .bind(id)
        .bind(org_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl Unit {
    /// Create a unit and bump the property's denormalized counter in one transaction
    pub async fn create(pool: &PgPool, org_id: Uuid, property_id: Uuid, data: CreateUnit) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let unit = sqlx::query_as::<_, Unit>(
            r#"
            INSERT INTO units (property_id, org_id, unit_number, floor)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#
        )
        .bind(property_id)
        .bind(org_id)
        .bind(&data.unit_number)
        .bind(&data.floor)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE properties SET total_units = total_units + 1, updated_at = NOW() WHERE id = $1")
            .bind(property_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(unit)
    }

    pub async fn find_owned(pool: &PgPool, id: Uuid, org_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Unit>(
            "SELECT * FROM units WHERE id = $1 AND org_id = $2 AND is_active = true"
        )
        .bind(id)
        .bind(org_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_by_property(pool: &PgPool, property_id: Uuid, org_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Unit>(
            r#"
            SELECT * FROM units
            WHERE property_id = $1 AND org_id = $2 AND is_active = true
            ORDER BY unit_number
            "#
        )
        .bind(property_id)
        .bind(org_id)
        .fetch_all(pool)
        .await
    }
}
