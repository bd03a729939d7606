//! Reporting handlers - read-only aggregation for the dashboard

use axum::{extract::State, Json};
use chrono::{Datelike, Utc};
use serde::Serialize;
use sqlx::Row;

use crate::{AppResult, AppState};
use crate::middleware::auth::AuthedUser;

#[derive(Debug, Serialize)]
pub struct DashboardReport {
    pub total_properties: i64,
    pub total_units: i64,
    pub occupied_units: i64,
    pub active_tenants: i64,
    pub active_contracts: i64,
    pub expected_rent_this_month: f64,
    pub collected_rent_this_month: f64,
    pub overdue_amount: f64,
    pub open_maintenance: i64,
}

pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthedUser,
) -> AppResult<Json<DashboardReport>> {
    let org_id = user.org_id();
    let now = Utc::now();

    let counts = sqlx::query(
        r#"
        SELECT
            (SELECT COUNT(*) FROM properties WHERE org_id = $1 AND is_active = true) AS properties,
            (SELECT COUNT(*) FROM units WHERE org_id = $1 AND is_active = true) AS units,
            (SELECT COUNT(*) FROM units WHERE org_id = $1 AND is_active = true AND is_occupied) AS occupied,
            (SELECT COUNT(*) FROM tenants WHERE org_id = $1 AND is_active = true) AS tenants,
            (SELECT COUNT(*) FROM rental_contracts WHERE org_id = $1 AND status = 'active') AS contracts,
            (SELECT COUNT(*) FROM maintenance_requests
                WHERE org_id = $1 AND is_active = true AND status <> 'resolved') AS maintenance
        "#
    )
    .bind(org_id)
    .fetch_one(&state.pool)
    .await?;

    let money = sqlx::query(
        r#"
        SELECT
            COALESCE(SUM(amount) FILTER (
                WHERE payment_type = 'rent' AND status <> 'cancelled'
                  AND period_month = $2 AND period_year = $3), 0) AS expected,
            COALESCE(SUM(amount) FILTER (
                WHERE payment_type = 'rent' AND status = 'paid'
                  AND period_month = $2 AND period_year = $3), 0) AS collected,
            COALESCE(SUM(amount) FILTER (WHERE status = 'overdue'), 0) AS overdue
        FROM payments
        WHERE org_id = $1
        "#
    )
    .bind(org_id)
    .bind(now.month() as i32)
    .bind(now.year())
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(DashboardReport {
        total_properties: counts.get("properties"),
        total_units: counts.get("units"),
        occupied_units: counts.get("occupied"),
        active_tenants: counts.get("tenants"),
        active_contracts: counts.get("contracts"),
        expected_rent_this_month: money.get("expected"),
        collected_rent_this_month: money.get("collected"),
        overdue_amount: money.get("overdue"),
        open_maintenance: counts.get("maintenance"),
    }))
}
