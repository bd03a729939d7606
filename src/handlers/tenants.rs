//! Tenant handlers, including the termination lifecycle

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{AppError, AppResult, AppState};
use crate::limits::{self, Feature};
use crate::middleware::auth::{require_roles, AuthedUser};
use crate::models::{
    audit, Contract, CreateTenant, Notification, Payment, Tenant, UpdateTenant, UserRole,
};

/// Create a tenant, gated by the plan limit for `tenants`
pub async fn create(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(req): Json<CreateTenant>,
) -> AppResult<Json<Tenant>> {
    req.validate()?;
    limits::enforce_limit(&state.pool, &user.org, Feature::Tenants).await?;

    let tenant = Tenant::create(&state.pool, user.org_id(), req).await?;
    tracing::info!("Tenant created: {} by user {}", tenant.id, user.user_id);
    Ok(Json(tenant))
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthedUser,
) -> AppResult<Json<Vec<Tenant>>> {
    let tenants = Tenant::list_by_org(&state.pool, user.org_id()).await?;
    Ok(Json(tenants))
}

pub async fn list_terminated(
    State(state): State<AppState>,
    user: AuthedUser,
) -> AppResult<Json<Vec<Tenant>>> {
    let tenants = Tenant::list_terminated(&state.pool, user.org_id()).await?;
    Ok(Json(tenants))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Tenant>> {
    let tenant = Tenant::find_owned(&state.pool, id, user.org_id())
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;
    Ok(Json(tenant))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTenant>,
) -> AppResult<Json<Tenant>> {
    req.validate()?;

    let tenant = Tenant::update(&state.pool, id, user.org_id(), req)
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;
    Ok(Json(tenant))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    require_roles(&user, &[UserRole::Landlord, UserRole::Admin])?;
    if Contract::find_active_for_tenant(&state.pool, id, user.org_id()).await?.is_some() {
        return Err(AppError::Conflict(
            "Tenant has an active contract; terminate it first".to_string(),
        ));
    }

    let deleted = Tenant::deactivate(&state.pool, id, user.org_id()).await?;
    if !deleted {
        return Err(AppError::NotFound("Tenant not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Tenant deleted" })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeductionItem {
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    #[validate(range(min = 0.01))]
    pub amount: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TerminateTenantRequest {
    pub termination_date: NaiveDate,
    #[validate(length(min = 1))]
    pub reason: String,
    /// return_full | return_partial | keep_full
    pub security_deposit_action: String,
    #[validate(range(min = 0.0))]
    pub return_amount: Option<f64>,
    #[serde(default)]
    #[validate(nested)]
    pub deductions: Vec<DeductionItem>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TerminateTenantResponse {
    pub tenant_id: Uuid,
    pub contract_id: Uuid,
    pub deposit_returned: f64,
    pub deductions_charged: f64,
    pub payments_cancelled: u64,
}

/// Terminate a tenant: all-or-nothing across contract, payments, tenant and
/// unit state. Any failure rolls the whole transaction back.
pub async fn terminate(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<TerminateTenantRequest>,
) -> AppResult<Json<TerminateTenantResponse>> {
    require_roles(&user, &[UserRole::Landlord, UserRole::Admin])?;
    req.validate()?;

    let tenant = Tenant::find_owned(&state.pool, id, user.org_id())
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;

    let contract = Contract::find_active_for_tenant(&state.pool, id, user.org_id())
        .await?
        .ok_or_else(|| AppError::NotFound("No active contract for this tenant".to_string()))?;

    let refund = match req.security_deposit_action.as_str() {
        "return_full" => contract.deposit,
        "return_partial" => {
            let amount = req.return_amount.ok_or_else(|| {
                AppError::ValidationError("return_amount is required for return_partial".to_string())
            })?;
            if amount > contract.deposit {
                return Err(AppError::ValidationError(
                    "return_amount exceeds the deposit".to_string(),
                ));
            }
            amount
        }
        "keep_full" => 0.0,
        other => {
            return Err(AppError::ValidationError(format!(
                "Unknown security_deposit_action '{other}'"
            )))
        }
    };

    let mut tx = state.pool.begin().await?;

    Contract::mark_terminated(&mut tx, contract.id, req.termination_date, &req.reason).await?;

    let mut deposit_returned = 0.0;
    if refund > 0.0 {
        // Refunds are negative-amount rows in the payment ledger
        Payment::insert_termination_entry(
            &mut tx,
            user.org_id(),
            contract.id,
            tenant.id,
            -refund,
            "deposit_return",
            "Security deposit refund on termination",
        )
        .await?;
        deposit_returned = refund;
    }

    let mut deductions_charged = 0.0;
    for deduction in &req.deductions {
        Payment::insert_termination_entry(
            &mut tx,
            user.org_id(),
            contract.id,
            tenant.id,
            deduction.amount,
            "deduction",
            &deduction.description,
        )
        .await?;
        deductions_charged += deduction.amount;
    }

    let payments_cancelled = Payment::cancel_future_pending(
        &mut tx,
        contract.id,
        req.termination_date,
        "Cancelled: contract terminated",
    )
    .await?;

    sqlx::query(
        r#"
        UPDATE tenants
        SET is_active = false, termination_date = $2, termination_reason = $3,
            termination_notes = $4, updated_at = NOW()
        WHERE id = $1
        "#
    )
    .bind(tenant.id)
    .bind(req.termination_date)
    .bind(&req.reason)
    .bind(&req.notes)
    .execute(&mut *tx)
    .await?;

    if let Some(landlord_id) = contract.landlord_id {
        Notification::raise(
            &mut *tx,
            user.org_id(),
            landlord_id,
            "tenant_terminated",
            "Tenant terminated",
            &format!("{} was terminated effective {}", tenant.full_name, req.termination_date),
            tenant.id,
            req.termination_date,
        )
        .await?;
    }

    Contract::set_unit_occupied(&mut tx, contract.unit_id, false).await?;

    audit::log_activity(
        &mut *tx,
        user.org_id(),
        user.user_id,
        "tenant_terminated",
        "tenant",
        tenant.id,
        serde_json::json!({
            "contract_id": contract.id,
            "deposit_returned": deposit_returned,
            "deductions_charged": deductions_charged,
        }),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        "Tenant {} terminated by user {} (contract {})",
        tenant.id, user.user_id, contract.id
    );

    Ok(Json(TerminateTenantResponse {
        tenant_id: tenant.id,
        contract_id: contract.id,
        deposit_returned,
        deductions_charged,
        payments_cancelled,
    }))
}
