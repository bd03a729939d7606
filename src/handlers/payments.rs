//! Payment handlers

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Datelike, Utc};
use serde::Serialize;
use validator::Validate;

use crate::{AppError, AppResult, AppState};
use crate::jobs;
use crate::middleware::auth::AuthedUser;
use crate::models::{Contract, Payment, PaymentFilter, RecordPayment};

pub async fn list(
    State(state): State<AppState>,
    user: AuthedUser,
    Query(filter): Query<PaymentFilter>,
) -> AppResult<Json<Vec<Payment>>> {
    let payments = Payment::list_by_org(&state.pool, user.org_id(), filter).await?;
    Ok(Json(payments))
}

/// Record a rent payment against a contract
pub async fn record(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(req): Json<RecordPayment>,
) -> AppResult<Json<Payment>> {
    req.validate()?;

    let contract = Contract::find_owned(&state.pool, req.contract_id, user.org_id())
        .await?
        .ok_or_else(|| AppError::NotFound("Contract not found".to_string()))?;

    let paid_date = req.paid_date.unwrap_or_else(|| Utc::now().date_naive());
    let period_month = req.period_month.unwrap_or(paid_date.month() as i32);
    let period_year = req.period_year.unwrap_or(paid_date.year());

    if !(1..=12).contains(&period_month) {
        return Err(AppError::ValidationError("period_month must be 1-12".to_string()));
    }

    let mut tx = state.pool.begin().await?;
    let payment = Payment::record_rent(
        &mut tx,
        user.org_id(),
        contract.tenant_id,
        &req,
        period_month,
        period_year,
    )
    .await?
    .ok_or_else(|| {
        AppError::Conflict(format!(
            "Rent for {period_year}-{period_month:02} is already recorded for this contract"
        ))
    })?;
    tx.commit().await?;

    tracing::info!(
        "Payment {} recorded for contract {} ({}-{})",
        payment.id, contract.id, period_year, period_month
    );
    Ok(Json(payment))
}

#[derive(Debug, Serialize)]
pub struct GenerateOverdueResponse {
    pub generated: u64,
    pub swept_overdue: u64,
}

/// Manual backfill: generate the current month's rent rows for this
/// organization and sweep past-due pending payments to overdue.
pub async fn generate_overdue(
    State(state): State<AppState>,
    user: AuthedUser,
) -> AppResult<Json<GenerateOverdueResponse>> {
    let today = Utc::now().date_naive();

    let generated = jobs::generate_monthly_rent_for_org(&state.pool, user.org_id(), today)
        .await
        .map_err(AppError::from)?;
    let swept_overdue = jobs::sweep_overdue_for_org(&state.pool, user.org_id(), today)
        .await
        .map_err(AppError::from)?;

    tracing::info!(
        "Manual overdue backfill for org {}: {} generated, {} swept",
        user.org_id(), generated, swept_overdue
    );

    Ok(Json(GenerateOverdueResponse { generated, swept_overdue }))
}
