//! Background batch jobs
//!
//! Two recurring loops run against the database: a daily pass that generates
//! the current month's rent obligations (and expires finished trials), and an
//! hourly pass that raises reminder notifications and sweeps past-due
//! payments to overdue. Both run once at startup. A failure in one
//! organization is logged and skipped; it never aborts the run for others.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::Notification;
use crate::AppState;

/// Days before contract end at which lease-renewal reminders fire
const LEASE_REMINDER_OFFSETS: [i64; 3] = [60, 30, 7];

/// Days before payment due date at which due reminders fire (0 = due today)
const PAYMENT_REMINDER_OFFSETS: [i64; 4] = [7, 3, 1, 0];

/// Spawn the recurring batch loops. Each runs once immediately.
pub fn spawn(state: AppState) {
    let daily_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(24 * 60 * 60));
        loop {
            interval.tick().await;
            let today = Utc::now().date_naive();
            run_daily(&daily_state.pool, today).await;
        }
    });

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60 * 60));
        loop {
            interval.tick().await;
            let today = Utc::now().date_naive();
            run_hourly(&state.pool, today).await;
        }
    });
}

/// Daily pass: expire finished trials, then generate rent rows per org
pub async fn run_daily(pool: &PgPool, today: NaiveDate) {
    if let Err(e) = expire_trials(pool, today).await {
        tracing::error!("Trial expiry sweep failed: {}", e);
    }

    let org_ids = match organization_ids(pool).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!("Daily job could not list organizations: {}", e);
            return;
        }
    };

    for org_id in org_ids {
        match generate_monthly_rent_for_org(pool, org_id, today).await {
            Ok(generated) if generated > 0 => {
                tracing::info!("Generated {} rent payments for org {}", generated, org_id);
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Rent generation failed for org {}: {}", org_id, e),
        }
    }
}

/// Hourly pass: reminders and the overdue sweep, per organization
pub async fn run_hourly(pool: &PgPool, today: NaiveDate) {
    let org_ids = match organization_ids(pool).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!("Hourly job could not list organizations: {}", e);
            return;
        }
    };

    for org_id in org_ids {
        if let Err(e) = lease_renewal_reminders(pool, org_id, today).await {
            tracing::error!("Lease reminders failed for org {}: {}", org_id, e);
        }
        if let Err(e) = payment_due_reminders(pool, org_id, today).await {
            tracing::error!("Payment reminders failed for org {}: {}", org_id, e);
        }
        if let Err(e) = sweep_overdue_for_org(pool, org_id, today).await {
            tracing::error!("Overdue sweep failed for org {}: {}", org_id, e);
        }
    }
}

async fn organization_ids(pool: &PgPool) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM organizations")
        .fetch_all(pool)
        .await
}

async fn expire_trials(pool: &PgPool, today: NaiveDate) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE organizations
        SET subscription_status = 'expired_trial', updated_at = NOW()
        WHERE subscription_status = 'trial' AND trial_end_date < $1
        "#
    )
    .bind(today)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Rent due date for a contract in the given month; the configured due day
/// clamps to the month's length.
pub fn rent_due_date(year: i32, month: u32, due_day: u32) -> NaiveDate {
    let last = days_in_month(year, month);
    NaiveDate::from_ymd_opt(year, month, due_day.clamp(1, last))
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 1).unwrap())
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1).unwrap()
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1).unwrap()
    };
    (next - first).num_days() as u32
}

/// Generate the current month's pending rent payment per active contract,
/// exactly once. Idempotent through the existence check; the partial unique
/// index on auto-generated rent rows makes overlapping runs safe too.
pub async fn generate_monthly_rent_for_org(
    pool: &PgPool,
    org_id: Uuid,
    today: NaiveDate,
) -> Result<u64, sqlx::Error> {
    let contracts = sqlx::query(
        r#"
        SELECT id, tenant_id, monthly_rent, rent_due_day, start_date, end_date
        FROM rental_contracts
        WHERE org_id = $1 AND status = 'active'
        "#
    )
    .bind(org_id)
    .fetch_all(pool)
    .await?;

    let mut generated = 0u64;

    for row in contracts {
        let contract_id: Uuid = row.get("id");
        let tenant_id: Uuid = row.get("tenant_id");
        let monthly_rent: f64 = row.get("monthly_rent");
        let due_day: i32 = row.get("rent_due_day");
        let start_date: NaiveDate = row.get("start_date");
        let end_date: NaiveDate = row.get("end_date");

        let due_date = rent_due_date(today.year(), today.month(), due_day as u32);
        if due_date < start_date || due_date > end_date {
            continue;
        }

        let exists: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM payments
            WHERE contract_id = $1 AND period_month = $2 AND period_year = $3
              AND payment_type = 'rent' AND status <> 'cancelled'
            LIMIT 1
            "#
        )
        .bind(contract_id)
        .bind(today.month() as i32)
        .bind(today.year())
        .fetch_optional(pool)
        .await?;

        if exists.is_some() {
            continue;
        }

        let result = sqlx::query(
            r#"
            INSERT INTO payments
                (org_id, contract_id, tenant_id, amount, payment_type, status,
                 due_date, period_month, period_year, auto_generated)
            VALUES ($1, $2, $3, $4, 'rent', 'pending', $5, $6, $7, true)
            ON CONFLICT (contract_id, period_year, period_month)
                WHERE payment_type = 'rent' AND auto_generated
                DO NOTHING
            "#
        )
        .bind(org_id)
        .bind(contract_id)
        .bind(tenant_id)
        .bind(monthly_rent)
        .bind(due_date)
        .bind(today.month() as i32)
        .bind(today.year())
        .execute(pool)
        .await?;

        generated += result.rows_affected();
    }

    Ok(generated)
}

/// Raise lease-renewal reminders for contracts ending at the fixed offsets
async fn lease_renewal_reminders(
    pool: &PgPool,
    org_id: Uuid,
    today: NaiveDate,
) -> Result<(), sqlx::Error> {
    for offset in LEASE_REMINDER_OFFSETS {
        let target = today + Duration::days(offset);

        let rows = sqlx::query(
            r#"
            SELECT c.id, c.landlord_id, c.end_date, t.full_name
            FROM rental_contracts c
            JOIN tenants t ON t.id = c.tenant_id
            WHERE c.org_id = $1 AND c.status = 'active' AND c.end_date = $2
            "#
        )
        .bind(org_id)
        .bind(target)
        .fetch_all(pool)
        .await?;

        for row in rows {
            let contract_id: Uuid = row.get("id");
            let landlord_id: Option<Uuid> = row.get("landlord_id");
            let tenant_name: String = row.get("full_name");
            let Some(landlord_id) = landlord_id else { continue };

            Notification::raise(
                pool,
                org_id,
                landlord_id,
                &format!("lease_renewal_{}d", offset),
                "Lease ending soon",
                &format!("{}'s lease ends in {} days ({})", tenant_name, offset, target),
                contract_id,
                today,
            )
            .await?;
        }
    }
    Ok(())
}

/// Raise payment-due reminders at the fixed offsets, plus due-today
async fn payment_due_reminders(
    pool: &PgPool,
    org_id: Uuid,
    today: NaiveDate,
) -> Result<(), sqlx::Error> {
    for offset in PAYMENT_REMINDER_OFFSETS {
        let target = today + Duration::days(offset);

        let rows = sqlx::query(
            r#"
            SELECT p.id, p.amount, c.landlord_id, t.full_name
            FROM payments p
            JOIN rental_contracts c ON c.id = p.contract_id
            JOIN tenants t ON t.id = p.tenant_id
            WHERE p.org_id = $1 AND p.status = 'pending'
              AND p.payment_type = 'rent' AND p.due_date = $2
            "#
        )
        .bind(org_id)
        .bind(target)
        .fetch_all(pool)
        .await?;

        for row in rows {
            let payment_id: Uuid = row.get("id");
            let amount: f64 = row.get("amount");
            let landlord_id: Option<Uuid> = row.get("landlord_id");
            let tenant_name: String = row.get("full_name");
            let Some(landlord_id) = landlord_id else { continue };

            let (notification_type, title) = if offset == 0 {
                ("payment_due_today".to_string(), "Rent due today")
            } else {
                (format!("payment_due_{}d", offset), "Rent due soon")
            };

            Notification::raise(
                pool,
                org_id,
                landlord_id,
                &notification_type,
                title,
                &format!("{} owes {:.2} due {}", tenant_name, amount, target),
                payment_id,
                today,
            )
            .await?;
        }
    }
    Ok(())
}

/// Flip past-due pending payments to overdue and notify once per day
pub async fn sweep_overdue_for_org(
    pool: &PgPool,
    org_id: Uuid,
    today: NaiveDate,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE payments
        SET status = 'overdue', updated_at = NOW()
        WHERE org_id = $1 AND status = 'pending' AND due_date < $2
        "#
    )
    .bind(org_id)
    .bind(today)
    .execute(pool)
    .await?;
    let flipped = result.rows_affected();

    let rows = sqlx::query(
        r#"
        SELECT p.tenant_id, c.landlord_id, t.full_name,
               SUM(p.amount) AS total_overdue
        FROM payments p
        JOIN rental_contracts c ON c.id = p.contract_id
        JOIN tenants t ON t.id = p.tenant_id
        WHERE p.org_id = $1 AND p.status = 'overdue'
        GROUP BY p.tenant_id, c.landlord_id, t.full_name
        "#
    )
    .bind(org_id)
    .fetch_all(pool)
    .await?;

    for row in rows {
        let tenant_id: Uuid = row.get("tenant_id");
        let landlord_id: Option<Uuid> = row.get("landlord_id");
        let tenant_name: String = row.get("full_name");
        let total: f64 = row.get("total_overdue");
        let Some(landlord_id) = landlord_id else { continue };

        // Dedup key is (type, tenant, day): one overdue notice per tenant per day
        Notification::raise(
            pool,
            org_id,
            landlord_id,
            "payment_overdue",
            "Overdue rent",
            &format!("{} has {:.2} overdue", tenant_name, total),
            tenant_id,
            today,
        )
        .await?;
    }

    Ok(flipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_day_clamps_to_short_months() {
        assert_eq!(rent_due_date(2026, 2, 31), NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
        assert_eq!(rent_due_date(2028, 2, 30), NaiveDate::from_ymd_opt(2028, 2, 29).unwrap());
    }

    #[test]
    fn due_day_passes_through_when_valid() {
        assert_eq!(rent_due_date(2026, 4, 15), NaiveDate::from_ymd_opt(2026, 4, 15).unwrap());
    }

    #[test]
    fn due_day_zero_clamps_to_first() {
        assert_eq!(rent_due_date(2026, 4, 0), NaiveDate::from_ymd_opt(2026, 4, 1).unwrap());
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2026, 1), 31);
        assert_eq!(days_in_month(2026, 2), 28);
        assert_eq!(days_in_month(2028, 2), 29);
        assert_eq!(days_in_month(2026, 12), 31);
    }

    #[test]
    fn reminder_offsets_match_policy() {
        assert_eq!(LEASE_REMINDER_OFFSETS, [60, 30, 7]);
        assert_eq!(PAYMENT_REMINDER_OFFSETS, [7, 3, 1, 0]);
    }
}
