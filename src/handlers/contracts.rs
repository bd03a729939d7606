//! Contract lifecycle handlers

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Months;
use uuid::Uuid;
use validator::Validate;

use crate::{AppError, AppResult, AppState};
use crate::middleware::auth::AuthedUser;
use crate::models::{
    audit, Contract, CreateContract, Notification, RenewContract, Tenant, Unit,
};

/// Create a rental contract and occupy the unit, in one transaction
pub async fn create(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(req): Json<CreateContract>,
) -> AppResult<Json<Contract>> {
    req.validate()?;

    let unit = Unit::find_owned(&state.pool, req.unit_id, user.org_id())
        .await?
        .ok_or_else(|| AppError::NotFound("Unit not found".to_string()))?;

    if unit.property_id != req.property_id {
        return Err(AppError::ValidationError(
            "Unit does not belong to the given property".to_string(),
        ));
    }

    if unit.is_occupied {
        return Err(AppError::Conflict("Unit is already occupied".to_string()));
    }

    Tenant::find_owned(&state.pool, req.tenant_id, user.org_id())
        .await?
        .filter(|t| t.is_active)
        .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;

    let end_date = req.start_date + Months::new(req.lease_duration_months as u32);
    let total_amount = req.total_amount();

    let mut tx = state.pool.begin().await?;

    // Re-check inside the transaction; the partial unique index on active
    // contracts catches whatever slips through concurrently.
    if Contract::unit_has_active_contract(&mut tx, req.unit_id).await? {
        return Err(AppError::Conflict("Unit is already occupied".to_string()));
    }

    let contract = match Contract::insert(&mut tx, user.org_id(), user.user_id, &req, end_date, total_amount).await {
        Ok(contract) => contract,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(AppError::Conflict("Unit is already occupied".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    Contract::set_unit_occupied(&mut tx, req.unit_id, true).await?;

    audit::log_activity(
        &mut *tx,
        user.org_id(),
        user.user_id,
        "contract_created",
        "contract",
        contract.id,
        serde_json::json!({
            "unit_id": req.unit_id,
            "tenant_id": req.tenant_id,
            "total_amount": total_amount,
        }),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        "Contract {} created for unit {} by user {}",
        contract.id, req.unit_id, user.user_id
    );
    Ok(Json(contract))
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthedUser,
) -> AppResult<Json<Vec<Contract>>> {
    let contracts = Contract::list_by_org(&state.pool, user.org_id()).await?;
    Ok(Json(contracts))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Contract>> {
    let contract = Contract::find_owned(&state.pool, id, user.org_id())
        .await?
        .ok_or_else(|| AppError::NotFound("Contract not found".to_string()))?;
    Ok(Json(contract))
}

/// Renew a contract in place. The unit stays occupied by this contract, so
/// neither occupancy nor plan limits are re-checked.
pub async fn renew(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RenewContract>,
) -> AppResult<Json<Contract>> {
    req.validate()?;

    let existing = Contract::find_owned(&state.pool, id, user.org_id())
        .await?
        .ok_or_else(|| AppError::NotFound("Contract not found".to_string()))?;
    let today = chrono::Utc::now().date_naive();
    if !req.extends_contract(existing.start_date, today) {
        return Err(AppError::ValidationError(
            "new_end_date must be later than the contract start date and today".to_string(),
        ));
    }

    let contract = Contract::renew(&state.pool, id, user.org_id(), &req)
        .await?
        .ok_or_else(|| AppError::NotFound("Active contract not found".to_string()))?;

    audit::log_activity(
        &state.pool,
        user.org_id(),
        user.user_id,
        "contract_renewed",
        "contract",
        contract.id,
        serde_json::json!({
            "new_end_date": req.new_end_date,
            "monthly_rent": contract.monthly_rent,
        }),
    )
    .await?;

    if let Some(landlord_id) = contract.landlord_id {
        Notification::raise(
            &state.pool,
            user.org_id(),
            landlord_id,
            "contract_renewed",
            "Contract renewed",
            &format!("Contract extended to {}", req.new_end_date),
            contract.id,
            chrono::Utc::now().date_naive(),
        )
        .await?;
    }

    tracing::info!("Contract {} renewed by user {}", contract.id, user.user_id);
    Ok(Json(contract))
}
