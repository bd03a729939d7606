//! Subscription history model - append-only ledger of plan changes

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubscriptionHistory {
    pub id: Uuid,
    pub org_id: Uuid,
    pub plan: String,
    pub billing_cycle: String,
    pub price: f64,
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub payment_proof: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpgradeRequest {
    #[validate(length(min = 1))]
    pub plan: String,
    pub billing_cycle: String,
    pub payment_proof: Option<String>,
}

impl SubscriptionHistory {
    pub async fn append_pending(
        tx: &mut Transaction<'_, Postgres>,
        org_id: Uuid,
        plan: &str,
        billing_cycle: &str,
        price: f64,
        payment_proof: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionHistory>(
            r#"
            INSERT INTO subscription_history (org_id, plan, billing_cycle, price, status, payment_proof)
            VALUES ($1, $2, $3, $4, 'pending_verification', $5)
            RETURNING *
            "#
        )
        .bind(org_id)
        .bind(plan)
        .bind(billing_cycle)
        .bind(price)
        .bind(payment_proof)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn append_active(
        tx: &mut Transaction<'_, Postgres>,
        org_id: Uuid,
        plan: &str,
        billing_cycle: &str,
        price: f64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionHistory>(
            r#"
            INSERT INTO subscription_history
                (org_id, plan, billing_cycle, price, status, start_date, end_date)
            VALUES ($1, $2, $3, $4, 'active', $5, $6)
            RETURNING *
            "#
        )
        .bind(org_id)
        .bind(plan)
        .bind(billing_cycle)
        .bind(price)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionHistory>("SELECT * FROM subscription_history WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_pending(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionHistory>(
            r#"
            SELECT * FROM subscription_history
            WHERE status = 'pending_verification'
            ORDER BY requested_at ASC
            "#
        )
        .fetch_all(pool)
        .await
    }

    pub async fn list_by_org(pool: &PgPool, org_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionHistory>(
            "SELECT * FROM subscription_history WHERE org_id = $1 ORDER BY created_at DESC"
        )
        .bind(org_id)
        .fetch_all(pool)
        .await
    }

    /// Resolve a pending row: 'active' on approve, 'rejected' on reject
    pub async fn decide(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: &str,
        decided_by: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionHistory>(
            r#"
            UPDATE subscription_history
            SET status = $2, decided_at = NOW(), decided_by = $3,
                start_date = COALESCE($4, start_date),
                end_date = COALESCE($5, end_date)
            WHERE id = $1 AND status = 'pending_verification'
            RETURNING *
            "#
        )
        .bind(id)
        .bind(status)
        .bind(decided_by)
        .bind(start_date)
        .bind(end_date)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Close out the current active ledger row on admin cancellation
    pub async fn cancel_active(
        tx: &mut Transaction<'_, Postgres>,
        org_id: Uuid,
        today: NaiveDate,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE subscription_history
            SET status = 'cancelled', end_date = $2, decided_at = NOW()
            WHERE org_id = $1 AND status = 'active'
            "#
        )
        .bind(org_id)
        .bind(today)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}
