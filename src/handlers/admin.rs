//! Super-admin console handlers
//!
//! Every state-mutating operation here appends to the admin_actions audit
//! trail inside the same transaction as the change itself.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::Row;
use uuid::Uuid;

use crate::{billing, AppError, AppResult, AppState};
use crate::handlers::auth::issue_jwt;
use crate::middleware::auth::AuthedUser;
use crate::models::{
    AdminAction, BillingCycle, Organization, SubscriptionHistory, SubscriptionPlan, User,
};

pub async fn list_organizations(
    State(state): State<AppState>,
    _admin: AuthedUser,
) -> AppResult<Json<Vec<Organization>>> {
    let orgs = sqlx::query_as::<_, Organization>(
        "SELECT * FROM organizations ORDER BY created_at DESC"
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(orgs))
}

pub async fn get_organization(
    State(state): State<AppState>,
    _admin: AuthedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Organization>> {
    let org = Organization::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
    Ok(Json(org))
}

/// Hard-delete an organization; everything it owns cascades
pub async fn delete_organization(
    State(state): State<AppState>,
    admin: AuthedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let org = Organization::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;

    let mut tx = state.pool.begin().await?;

    AdminAction::log(
        &mut *tx,
        admin.user_id,
        None,
        "organization_deleted",
        json!({ "org_id": org.id, "name": org.name }),
    )
    .await?;

    sqlx::query("DELETE FROM organizations WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::warn!("Organization {} deleted by admin {}", id, admin.user_id);
    Ok(Json(json!({ "message": "Organization deleted" })))
}

pub async fn pending_subscriptions(
    State(state): State<AppState>,
    _admin: AuthedUser,
) -> AppResult<Json<Vec<SubscriptionHistory>>> {
    let pending = SubscriptionHistory::list_pending(&state.pool).await?;
    Ok(Json(pending))
}

/// Approve a pending subscription change. The cycle end date is anchored at
/// approval time, not at request time.
pub async fn approve_subscription(
    State(state): State<AppState>,
    admin: AuthedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SubscriptionHistory>> {
    let entry = SubscriptionHistory::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Subscription request not found".to_string()))?;

    let today = Utc::now().date_naive();
    let cycle = BillingCycle::from_str(&entry.billing_cycle);
    let end_date = billing::cycle_end(today, cycle);

    let mut tx = state.pool.begin().await?;

    let decided = SubscriptionHistory::decide(&mut tx, id, "active", admin.user_id, Some(today), Some(end_date))
        .await?
        .ok_or_else(|| AppError::Conflict("Subscription request is not pending".to_string()))?;

    sqlx::query(
        r#"
        UPDATE organizations
        SET subscription_plan = $2, subscription_status = 'active', billing_cycle = $3,
            next_renewal_date = $4, overdue_since = NULL, updated_at = NOW()
        WHERE id = $1
        "#
    )
    .bind(entry.org_id)
    .bind(&entry.plan)
    .bind(&entry.billing_cycle)
    .bind(end_date)
    .execute(&mut *tx)
    .await?;

    AdminAction::log(
        &mut *tx,
        admin.user_id,
        Some(entry.org_id),
        "subscription_approved",
        json!({
            "history_id": id,
            "plan": entry.plan,
            "billing_cycle": entry.billing_cycle,
            "price": entry.price,
            "end_date": end_date,
        }),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        "Subscription {} approved for org {} by admin {}",
        id, entry.org_id, admin.user_id
    );
    Ok(Json(decided))
}

/// Reject a pending subscription change; the organization is left untouched
pub async fn reject_subscription(
    State(state): State<AppState>,
    admin: AuthedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SubscriptionHistory>> {
    let entry = SubscriptionHistory::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Subscription request not found".to_string()))?;

    let mut tx = state.pool.begin().await?;

    let decided = SubscriptionHistory::decide(&mut tx, id, "rejected", admin.user_id, None, None)
        .await?
        .ok_or_else(|| AppError::Conflict("Subscription request is not pending".to_string()))?;

    AdminAction::log(
        &mut *tx,
        admin.user_id,
        Some(entry.org_id),
        "subscription_rejected",
        json!({ "history_id": id, "plan": entry.plan }),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        "Subscription {} rejected for org {} by admin {}",
        id, entry.org_id, admin.user_id
    );
    Ok(Json(decided))
}

/// Cancel an organization's subscription: ledger closed out today, plan
/// reset to free
pub async fn cancel_subscription(
    State(state): State<AppState>,
    admin: AuthedUser,
    Path(org_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    Organization::find_by_id(&state.pool, org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;

    let today = Utc::now().date_naive();
    let mut tx = state.pool.begin().await?;

    SubscriptionHistory::cancel_active(&mut tx, org_id, today).await?;

    sqlx::query(
        r#"
        UPDATE organizations
        SET subscription_status = 'cancelled', subscription_plan = $2, updated_at = NOW()
        WHERE id = $1
        "#
    )
    .bind(org_id)
    .bind(SubscriptionPlan::Free.as_str())
    .execute(&mut *tx)
    .await?;

    AdminAction::log(
        &mut *tx,
        admin.user_id,
        Some(org_id),
        "subscription_cancelled",
        json!({ "effective": today }),
    )
    .await?;

    tx.commit().await?;

    tracing::info!("Subscription cancelled for org {} by admin {}", org_id, admin.user_id);
    Ok(Json(json!({ "message": "Subscription cancelled" })))
}

#[derive(Debug, Serialize)]
pub struct PlatformAnalytics {
    pub total_organizations: i64,
    pub trial_organizations: i64,
    pub active_organizations: i64,
    pub overdue_organizations: i64,
    pub total_properties: i64,
    pub total_tenants: i64,
    pub active_contracts: i64,
    pub pending_verifications: i64,
}

pub async fn analytics(
    State(state): State<AppState>,
    _admin: AuthedUser,
) -> AppResult<Json<PlatformAnalytics>> {
    let org_row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE subscription_status = 'trial') AS trial,
            COUNT(*) FILTER (WHERE subscription_status = 'active') AS active,
            COUNT(*) FILTER (WHERE subscription_status = 'overdue') AS overdue
        FROM organizations
        "#
    )
    .fetch_one(&state.pool)
    .await?;

    let total_properties: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM properties WHERE is_active = true")
            .fetch_one(&state.pool)
            .await?;
    let total_tenants: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM tenants WHERE is_active = true")
            .fetch_one(&state.pool)
            .await?;
    let active_contracts: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM rental_contracts WHERE status = 'active'")
            .fetch_one(&state.pool)
            .await?;
    let pending_verifications: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM subscription_history WHERE status = 'pending_verification'"
    )
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(PlatformAnalytics {
        total_organizations: org_row.get("total"),
        trial_organizations: org_row.get("trial"),
        active_organizations: org_row.get("active"),
        overdue_organizations: org_row.get("overdue"),
        total_properties,
        total_tenants,
        active_contracts,
        pending_verifications,
    }))
}

pub async fn list_actions(
    State(state): State<AppState>,
    _admin: AuthedUser,
) -> AppResult<Json<Vec<AdminAction>>> {
    let actions = AdminAction::list_recent(&state.pool, 200).await?;
    Ok(Json(actions))
}

#[derive(Debug, Serialize)]
pub struct ImpersonateResponse {
    pub token: String,
    pub user_id: Uuid,
    pub org_id: Uuid,
    pub expires_in_minutes: u64,
    pub is_impersonation: bool,
}

/// Issue a short-lived token acting as another user, with an audit
/// back-reference to the issuing admin baked into the claims
pub async fn impersonate(
    State(state): State<AppState>,
    admin: AuthedUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ImpersonateResponse>> {
    let target = User::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !target.is_active {
        return Err(AppError::ValidationError("Cannot impersonate an inactive user".to_string()));
    }

    let token = issue_jwt(
        target.id,
        target.org_id,
        &target.role,
        Some(admin.user_id),
        &state.config.jwt_secret,
        Duration::minutes(state.config.impersonation_minutes as i64),
    )?;

    AdminAction::log(
        &state.pool,
        admin.user_id,
        Some(target.org_id),
        "user_impersonated",
        json!({ "target_user": target.id, "target_email": target.email }),
    )
    .await?;

    tracing::warn!(
        "Admin {} issued impersonation token for user {}",
        admin.user_id, target.id
    );

    Ok(Json(ImpersonateResponse {
        token,
        user_id: target.id,
        org_id: target.org_id,
        expires_in_minutes: state.config.impersonation_minutes,
        is_impersonation: true,
    }))
}
