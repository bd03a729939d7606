//! Subscription self-service handlers

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use validator::Validate;

use crate::{billing, AppError, AppResult, AppState};
use crate::limits::{self, Feature, LimitStatus};
use crate::middleware::auth::{require_roles, AuthedUser};
use crate::models::{
    BillingCycle, Organization, SubscriptionHistory, SubscriptionPlan, SubscriptionStatus,
    UpgradeRequest, UserRole,
};

#[derive(Debug, Serialize)]
pub struct SubscriptionStatusResponse {
    pub organization: Organization,
    pub effective_plan: &'static str,
    pub history: Vec<SubscriptionHistory>,
}

pub async fn status(
    State(state): State<AppState>,
    user: AuthedUser,
) -> AppResult<Json<SubscriptionStatusResponse>> {
    let history = SubscriptionHistory::list_by_org(&state.pool, user.org_id()).await?;
    let effective_plan = limits::effective_plan(&user.org).as_str();

    Ok(Json(SubscriptionStatusResponse {
        organization: user.org,
        effective_plan,
        history,
    }))
}

#[derive(Debug, Serialize)]
pub struct PlanInfo {
    pub plan: &'static str,
    pub monthly_price: f64,
    pub properties: Option<i64>,
    pub tenants: Option<i64>,
    pub documents: Option<i64>,
    pub maintenance_requests: Option<i64>,
}

/// Plan catalogue for the upgrade prompt
pub async fn plans() -> Json<Vec<PlanInfo>> {
    let all = [
        SubscriptionPlan::Basic,
        SubscriptionPlan::Professional,
        SubscriptionPlan::Enterprise,
    ];

    Json(
        all.iter()
            .map(|&plan| PlanInfo {
                plan: plan.as_str(),
                monthly_price: plan.monthly_price(),
                properties: limits::plan_limit(plan, Feature::Properties),
                tenants: limits::plan_limit(plan, Feature::Tenants),
                documents: limits::plan_limit(plan, Feature::Documents),
                maintenance_requests: limits::plan_limit(plan, Feature::MaintenanceRequests),
            })
            .collect(),
    )
}

/// Request a plan change: organization goes to pending_verification and a
/// matching ledger row is appended, awaiting admin review.
pub async fn upgrade(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(req): Json<UpgradeRequest>,
) -> AppResult<Json<SubscriptionHistory>> {
    // Billing changes are the account owner's call
    require_roles(&user, &[UserRole::Landlord])?;
    req.validate()?;

    let plan = match req.plan.as_str() {
        "basic" | "professional" | "enterprise" => SubscriptionPlan::from_str(&req.plan),
        other => {
            return Err(AppError::ValidationError(format!("Unknown plan '{other}'")));
        }
    };
    let cycle = match req.billing_cycle.as_str() {
        "monthly" | "semi_annual" | "annual" => BillingCycle::from_str(&req.billing_cycle),
        other => {
            return Err(AppError::ValidationError(format!("Unknown billing cycle '{other}'")));
        }
    };

    let price = billing::cycle_price(plan, cycle);

    let mut tx = state.pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE organizations
        SET subscription_status = 'pending_verification', updated_at = NOW()
        WHERE id = $1
        "#
    )
    .bind(user.org_id())
    .execute(&mut *tx)
    .await?;

    let entry = SubscriptionHistory::append_pending(
        &mut tx,
        user.org_id(),
        plan.as_str(),
        cycle.as_str(),
        price,
        req.payment_proof.as_deref(),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        "Upgrade requested: org {} -> {} ({})",
        user.org_id(), plan.as_str(), cycle.as_str()
    );
    Ok(Json(entry))
}

#[derive(Debug, Serialize)]
pub struct RenewResponse {
    pub next_renewal_date: chrono::NaiveDate,
    pub entry: SubscriptionHistory,
}

/// Renew the current subscription for one more billing cycle. The new
/// renewal date advances from the previous one, not from today.
pub async fn renew(
    State(state): State<AppState>,
    user: AuthedUser,
) -> AppResult<Json<RenewResponse>> {
    require_roles(&user, &[UserRole::Landlord])?;
    let org = &user.org;

    match org.status() {
        SubscriptionStatus::Active | SubscriptionStatus::Overdue => {}
        _ => {
            return Err(AppError::ValidationError(
                "Only active or overdue subscriptions can be renewed".to_string(),
            ));
        }
    }

    let today = Utc::now().date_naive();
    let cycle = org.cycle();
    let plan = org.plan();
    let next_renewal = billing::next_renewal_from(org.next_renewal_date, today, cycle);
    let start = org.next_renewal_date.unwrap_or(today);

    let mut tx = state.pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE organizations
        SET subscription_status = 'active', next_renewal_date = $2,
            overdue_since = NULL, updated_at = NOW()
        WHERE id = $1
        "#
    )
    .bind(org.id)
    .bind(next_renewal)
    .execute(&mut *tx)
    .await?;

    let entry = SubscriptionHistory::append_active(
        &mut tx,
        org.id,
        plan.as_str(),
        cycle.as_str(),
        billing::cycle_price(plan, cycle),
        start,
        next_renewal,
    )
    .await?;

    tx.commit().await?;

    tracing::info!("Subscription renewed: org {} until {}", org.id, next_renewal);
    Ok(Json(RenewResponse {
        next_renewal_date: next_renewal,
        entry,
    }))
}

/// Self-service view of a feature's usage against its ceiling
pub async fn check_limits(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(feature): Path<String>,
) -> AppResult<Json<LimitStatus>> {
    let feature = Feature::from_str(&feature)
        .ok_or_else(|| AppError::ValidationError(format!("Unknown feature '{feature}'")))?;

    let status = limits::check_limit(&state.pool, &user.org, feature).await?;
    Ok(Json(status))
}
