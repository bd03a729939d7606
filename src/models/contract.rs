//! Rental contract model and lifecycle queries

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contract {
    pub id: Uuid,
    pub org_id: Uuid,
    pub property_id: Uuid,
    pub unit_id: Uuid,
    pub tenant_id: Uuid,
    pub landlord_id: Option<Uuid>,
    pub lease_duration_months: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub actual_end_date: Option<NaiveDate>,
    pub monthly_rent: f64,
    pub deposit: f64,
    pub eeu_payment: f64,
    pub water_payment: f64,
    pub generator_payment: f64,
    pub total_amount: f64,
    pub payment_term: Option<String>,
    pub rent_due_day: i32,
    pub status: String,
    pub termination_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateContract {
    pub property_id: Uuid,
    pub unit_id: Uuid,
    pub tenant_id: Uuid,
    #[validate(range(min = 1, max = 120))]
    pub lease_duration_months: i32,
    pub start_date: NaiveDate,
    #[validate(range(min = 0.01))]
    pub monthly_rent: f64,
    #[validate(range(min = 0.0))]
    pub deposit: f64,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub eeu_payment: f64,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub water_payment: f64,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub generator_payment: f64,
    pub payment_term: Option<String>,
    #[validate(range(min = 1, max = 28))]
    pub rent_due_day: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RenewContract {
    pub new_end_date: NaiveDate,
    #[validate(range(min = 0.01))]
    pub monthly_rent: Option<f64>,
    #[validate(range(min = 0.0))]
    pub deposit: Option<f64>,
}

impl RenewContract {
    /// A renewal has to push the end date forward: past the contract's
    /// start date and into the future.
    pub fn extends_contract(&self, start_date: NaiveDate, today: NaiveDate) -> bool {
        self.new_end_date > start_date && self.new_end_date > today
    }
}

impl CreateContract {
    /// Full contract value: rent over the lease term plus one-time utility payments
    pub fn total_amount(&self) -> f64 {
        self.monthly_rent * self.lease_duration_months as f64
            + self.eeu_payment
            + self.water_payment
            + self.generator_payment
    }
}

impl Contract {
    pub async fn find_owned(pool: &PgPool, id: Uuid, org_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contract>(
            "SELECT * FROM rental_contracts WHERE id = $1 AND org_id = $2"
        )
        .bind(id)
        .bind(org_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_by_org(pool: &PgPool, org_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contract>(
            "SELECT * FROM rental_contracts WHERE org_id = $1 ORDER BY created_at DESC"
        )
        .bind(org_id)
        .fetch_all(pool)
        .await
    }

    /// Active contract currently in force for a tenant, if any
    pub async fn find_active_for_tenant(
        pool: &PgPool,
        tenant_id: Uuid,
        org_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contract>(
            r#"
            SELECT * FROM rental_contracts
            WHERE tenant_id = $1 AND org_id = $2 AND status = 'active'
            "#
        )
        .bind(tenant_id)
        .bind(org_id)
        .fetch_optional(pool)
        .await
    }

    /// In-transaction occupancy re-check. The partial unique index on
    /// (unit_id) WHERE status = 'active' is the backstop for the race this
    /// check cannot close on its own.
    pub async fn unit_has_active_contract(
        tx: &mut Transaction<'_, Postgres>,
        unit_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let existing: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM rental_contracts WHERE unit_id = $1 AND status = 'active'"
        )
        .bind(unit_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(existing.is_some())
    }

    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        org_id: Uuid,
        landlord_id: Uuid,
        data: &CreateContract,
        end_date: NaiveDate,
        total_amount: f64,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Contract>(
            r#"
            INSERT INTO rental_contracts
                (org_id, property_id, unit_id, tenant_id, landlord_id,
                 lease_duration_months, start_date, end_date,
                 monthly_rent, deposit, eeu_payment, water_payment, generator_payment,
                 total_amount, payment_term, rent_due_day, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, 'active')
            RETURNING *
            "#
        )
        .bind(org_id)
        .bind(data.property_id)
        .bind(data.unit_id)
        .bind(data.tenant_id)
        .bind(landlord_id)
        .bind(data.lease_duration_months)
        .bind(data.start_date)
        .bind(end_date)
        .bind(data.monthly_rent)
        .bind(data.deposit)
        .bind(data.eeu_payment)
        .bind(data.water_payment)
        .bind(data.generator_payment)
        .bind(total_amount)
        .bind(&data.payment_term)
        .bind(data.rent_due_day.unwrap_or(1))
        .fetch_one(&mut **tx)
        .await
    }

    /// Same-row renewal: new end date and optionally new rent/deposit
    pub async fn renew(
        pool: &PgPool,
        id: Uuid,
        org_id: Uuid,
        data: &RenewContract,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contract>(
            r#"
            UPDATE rental_contracts
            SET end_date = $3,
                monthly_rent = COALESCE($4, monthly_rent),
                deposit = COALESCE($5, deposit),
                updated_at = NOW()
            WHERE id = $1 AND org_id = $2 AND status = 'active'
            RETURNING *
            "#
        )
        .bind(id)
        .bind(org_id)
        .bind(data.new_end_date)
        .bind(data.monthly_rent)
        .bind(data.deposit)
        .fetch_optional(pool)
        .await
    }

    pub async fn mark_terminated(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        termination_date: NaiveDate,
        reason: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE rental_contracts
            SET status = 'terminated', actual_end_date = $2, termination_reason = $3, updated_at = NOW()
            WHERE id = $1
            "#
        )
        .bind(id)
        .bind(termination_date)
        .bind(reason)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn set_unit_occupied(
        tx: &mut Transaction<'_, Postgres>,
        unit_id: Uuid,
        occupied: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE units SET is_occupied = $2, updated_at = NOW() WHERE id = $1")
            .bind(unit_id)
            .bind(occupied)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> CreateContract {
        CreateContract {
            property_id: Uuid::new_v4(),
            unit_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            lease_duration_months: 12,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            monthly_rent: 5000.0,
            deposit: 10000.0,
            eeu_payment: 300.0,
            water_payment: 200.0,
            generator_payment: 0.0,
            payment_term: None,
            rent_due_day: Some(1),
        }
    }

    #[test]
    fn total_amount_includes_one_time_utilities() {
        let req = base_request();
        // 5000 * 12 + 300 + 200 + 0
        assert_eq!(req.total_amount(), 60500.0);
    }

    #[test]
    fn total_amount_without_utilities_is_rent_times_duration() {
        let mut req = base_request();
        req.eeu_payment = 0.0;
        req.water_payment = 0.0;
        assert_eq!(req.total_amount(), 60000.0);
    }

    #[test]
    fn negative_rent_is_rejected_by_validation() {
        use validator::Validate;
        let mut req = base_request();
        req.monthly_rent = -1.0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn zero_duration_is_rejected_by_validation() {
        use validator::Validate;
        let mut req = base_request();
        req.lease_duration_months = 0;
        assert!(req.validate().is_err());
    }

    fn renewal_to(year: i32, month: u32, day: u32) -> RenewContract {
        RenewContract {
            new_end_date: NaiveDate::from_ymd_opt(year, month, day).unwrap(),
            monthly_rent: None,
            deposit: None,
        }
    }

    #[test]
    fn renewal_into_the_future_extends_contract() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        assert!(renewal_to(2027, 1, 1).extends_contract(start, today));
    }

    #[test]
    fn renewal_before_start_date_is_rejected() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        assert!(!renewal_to(2025, 12, 31).extends_contract(start, today));
    }

    #[test]
    fn renewal_ending_in_the_past_is_rejected() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        // after start but already elapsed
        assert!(!renewal_to(2026, 6, 1).extends_contract(start, today));
    }
}
