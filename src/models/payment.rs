//! Payment model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub org_id: Uuid,
    pub contract_id: Uuid,
    pub tenant_id: Uuid,
    pub amount: f64,
    pub payment_type: String,
    pub status: String,
    pub due_date: Option<NaiveDate>,
    pub paid_date: Option<NaiveDate>,
    pub period_month: Option<i32>,
    pub period_year: Option<i32>,
    pub auto_generated: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPayment {
    pub contract_id: Uuid,
    #[validate(range(min = 0.01))]
    pub amount: f64,
    pub paid_date: Option<NaiveDate>,
    pub period_month: Option<i32>,
    pub period_year: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PaymentFilter {
    pub status: Option<String>,
    pub contract_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// What recording a manual rent payment should do, given the non-cancelled
/// rent rows already present for the contract/period. At most one row per
/// period may end up `paid`.
#[derive(Debug, PartialEq, Eq)]
enum RentAction {
    /// No row for the period yet: insert a paid row
    Insert,
    /// An auto-generated pending row exists: settle it in place
    SettlePending,
    /// An auto-generated overdue row exists: replace it with a paid row
    ReplaceOverdue,
    /// A paid row (manual or settled auto) already covers the period
    Duplicate,
}

fn classify_rent_rows(existing: &[(String, bool)]) -> RentAction {
    // Any paid row, or any manual row regardless of status, settles the
    // period; a second insert would double-book the month.
    if existing
        .iter()
        .any(|(status, auto)| status == "paid" || !auto)
    {
        return RentAction::Duplicate;
    }
    if existing
        .iter()
        .any(|(status, auto)| status == "pending" && *auto)
    {
        return RentAction::SettlePending;
    }
    if existing
        .iter()
        .any(|(status, auto)| status == "overdue" && *auto)
    {
        return RentAction::ReplaceOverdue;
    }
    RentAction::Insert
}

impl Payment {
    pub async fn list_by_org(
        pool: &PgPool,
        org_id: Uuid,
        filter: PaymentFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let limit = filter.limit.unwrap_or(50);
        let offset = filter.offset.unwrap_or(0);

        sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE org_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR contract_id = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#
        )
        .bind(org_id)
        .bind(&filter.status)
        .bind(filter.contract_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Record a manual rent payment. Settles an auto-generated pending row
    /// in place, replaces an auto-generated overdue placeholder, and refuses
    /// a period that already carries a paid or manual rent row. Returns
    /// `None` for that duplicate case so the caller can reject it.
    pub async fn record_rent(
        tx: &mut Transaction<'_, Postgres>,
        org_id: Uuid,
        tenant_id: Uuid,
        data: &RecordPayment,
        period_month: i32,
        period_year: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        let existing: Vec<(String, bool)> = sqlx::query_as(
            r#"
            SELECT status, auto_generated FROM payments
            WHERE contract_id = $1 AND period_month = $2 AND period_year = $3
              AND payment_type = 'rent' AND status <> 'cancelled'
            "#
        )
        .bind(data.contract_id)
        .bind(period_month)
        .bind(period_year)
        .fetch_all(&mut **tx)
        .await?;

        match classify_rent_rows(&existing) {
            RentAction::Duplicate => return Ok(None),
            RentAction::SettlePending => {
                let settled = sqlx::query_as::<_, Payment>(
                    r#"
                    UPDATE payments
                    SET status = 'paid', amount = $4, paid_date = $5,
                        notes = COALESCE($6, notes), updated_at = NOW()
                    WHERE contract_id = $1 AND period_month = $2 AND period_year = $3
                      AND payment_type = 'rent' AND status = 'pending' AND auto_generated
                    RETURNING *
                    "#
                )
                .bind(data.contract_id)
                .bind(period_month)
                .bind(period_year)
                .bind(data.amount)
                .bind(data.paid_date.unwrap_or_else(|| Utc::now().date_naive()))
                .bind(&data.notes)
                .fetch_optional(&mut **tx)
                .await?;

                if let Some(payment) = settled {
                    return Ok(Some(payment));
                }
                // Row vanished between the read and the update; fall through
                // to a fresh insert.
            }
            RentAction::ReplaceOverdue => {
                sqlx::query(
                    r#"
                    DELETE FROM payments
                    WHERE contract_id = $1 AND period_month = $2 AND period_year = $3
                      AND payment_type = 'rent' AND status = 'overdue' AND auto_generated
                    "#
                )
                .bind(data.contract_id)
                .bind(period_month)
                .bind(period_year)
                .execute(&mut **tx)
                .await?;
            }
            RentAction::Insert => {}
        }

        sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments
                (org_id, contract_id, tenant_id, amount, payment_type, status,
                 paid_date, period_month, period_year, notes)
            VALUES ($1, $2, $3, $4, 'rent', 'paid', $5, $6, $7, $8)
            RETURNING *
            "#
        )
        .bind(org_id)
        .bind(data.contract_id)
        .bind(tenant_id)
        .bind(data.amount)
        .bind(data.paid_date.unwrap_or_else(|| Utc::now().date_naive()))
        .bind(period_month)
        .bind(period_year)
        .bind(&data.notes)
        .fetch_one(&mut **tx)
        .await
        .map(Some)
    }

    /// Refund or charge rows written during tenant termination
    pub async fn insert_termination_entry(
        tx: &mut Transaction<'_, Postgres>,
        org_id: Uuid,
        contract_id: Uuid,
        tenant_id: Uuid,
        amount: f64,
        payment_type: &str,
        notes: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments
                (org_id, contract_id, tenant_id, amount, payment_type, status, paid_date, notes)
            VALUES ($1, $2, $3, $4, $5, 'paid', $6, $7)
            RETURNING *
            "#
        )
        .bind(org_id)
        .bind(contract_id)
        .bind(tenant_id)
        .bind(amount)
        .bind(payment_type)
        .bind(Utc::now().date_naive())
        .bind(notes)
        .fetch_one(&mut **tx)
        .await
    }

    /// Cancel future-dated pending payments on a contract, keeping the rows
    /// for the audit trail
    pub async fn cancel_future_pending(
        tx: &mut Transaction<'_, Postgres>,
        contract_id: Uuid,
        after: NaiveDate,
        note: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = 'cancelled',
                notes = COALESCE(notes || ' | ', '') || $3,
                updated_at = NOW()
            WHERE contract_id = $1 AND status = 'pending' AND due_date > $2
            "#
        )
        .bind(contract_id)
        .bind(after)
        .bind(note)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(specs: &[(&str, bool)]) -> Vec<(String, bool)> {
        specs.iter().map(|(s, a)| (s.to_string(), *a)).collect()
    }

    #[test]
    fn empty_period_inserts() {
        assert_eq!(classify_rent_rows(&rows(&[])), RentAction::Insert);
    }

    #[test]
    fn auto_pending_row_is_settled_in_place() {
        assert_eq!(
            classify_rent_rows(&rows(&[("pending", true)])),
            RentAction::SettlePending
        );
    }

    #[test]
    fn auto_overdue_row_is_replaced() {
        assert_eq!(
            classify_rent_rows(&rows(&[("overdue", true)])),
            RentAction::ReplaceOverdue
        );
    }

    #[test]
    fn manual_paid_row_blocks_second_payment() {
        assert_eq!(
            classify_rent_rows(&rows(&[("paid", false)])),
            RentAction::Duplicate
        );
    }

    #[test]
    fn settled_auto_row_blocks_second_payment() {
        assert_eq!(
            classify_rent_rows(&rows(&[("paid", true)])),
            RentAction::Duplicate
        );
    }

    #[test]
    fn paid_row_wins_over_leftover_overdue() {
        assert_eq!(
            classify_rent_rows(&rows(&[("overdue", true), ("paid", false)])),
            RentAction::Duplicate
        );
    }
}
