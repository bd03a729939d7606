//! Plan-limit gate
//!
//! A pure read-then-decide check run before every gated create. It never
//! mutates state; the insert it guards is backstopped by database
//! constraints where atomicity matters.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Organization, SubscriptionPlan, SubscriptionStatus};

/// Feature families with per-plan ceilings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Properties,
    Tenants,
    Documents,
    MaintenanceRequests,
}

impl Feature {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "properties" => Some(Feature::Properties),
            "tenants" => Some(Feature::Tenants),
            "documents" => Some(Feature::Documents),
            "maintenance_requests" => Some(Feature::MaintenanceRequests),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Properties => "properties",
            Feature::Tenants => "tenants",
            Feature::Documents => "documents",
            Feature::MaintenanceRequests => "maintenance_requests",
        }
    }

    fn table(&self) -> &'static str {
        match self {
            Feature::Properties => "properties",
            Feature::Tenants => "tenants",
            Feature::Documents => "documents",
            Feature::MaintenanceRequests => "maintenance_requests",
        }
    }
}

/// Per-feature ceiling for a plan. None = unlimited.
pub fn plan_limit(plan: SubscriptionPlan, feature: Feature) -> Option<i64> {
    match plan {
        SubscriptionPlan::Free => Some(match feature {
            Feature::Properties => 1,
            Feature::Tenants => 2,
            Feature::Documents => 5,
            Feature::MaintenanceRequests => 5,
        }),
        SubscriptionPlan::Basic => Some(match feature {
            Feature::Properties => 3,
            Feature::Tenants => 10,
            Feature::Documents => 20,
            Feature::MaintenanceRequests => 20,
        }),
        SubscriptionPlan::Professional => Some(match feature {
            Feature::Properties => 20,
            Feature::Tenants => 100,
            Feature::Documents => 200,
            Feature::MaintenanceRequests => 200,
        }),
        SubscriptionPlan::Enterprise => None,
    }
}

/// Expired trials and overdue subscriptions keep working but are degraded
/// to basic ceilings rather than locked out.
pub fn effective_plan(org: &Organization) -> SubscriptionPlan {
    match org.status() {
        SubscriptionStatus::ExpiredTrial | SubscriptionStatus::Overdue => SubscriptionPlan::Basic,
        _ => org.plan(),
    }
}

/// Current live-row usage for a feature, scoped to the organization
pub async fn current_usage(pool: &PgPool, org_id: Uuid, feature: Feature) -> Result<i64, sqlx::Error> {
    let query = format!(
        "SELECT COUNT(*) FROM {} WHERE org_id = $1 AND is_active = true",
        feature.table()
    );
    sqlx::query_scalar::<_, i64>(&query)
        .bind(org_id)
        .fetch_one(pool)
        .await
}

/// Usage snapshot for the self-service check-limits endpoint
#[derive(Debug, serde::Serialize)]
pub struct LimitStatus {
    pub feature: &'static str,
    pub plan: &'static str,
    pub current_usage: i64,
    pub limit: Option<i64>,
    pub allowed: bool,
}

pub async fn check_limit(pool: &PgPool, org: &Organization, feature: Feature) -> AppResult<LimitStatus> {
    let plan = effective_plan(org);
    let limit = plan_limit(plan, feature);

    let (usage, allowed) = match limit {
        None => (current_usage(pool, org.id, feature).await?, true),
        Some(max) => {
            let usage = current_usage(pool, org.id, feature).await?;
            (usage, usage < max)
        }
    };

    Ok(LimitStatus {
        feature: feature.as_str(),
        plan: plan.as_str(),
        current_usage: usage,
        limit,
        allowed,
    })
}

/// Gate a mutating create: Ok(()) to proceed, structured rejection otherwise
pub async fn enforce_limit(pool: &PgPool, org: &Organization, feature: Feature) -> AppResult<()> {
    let status = check_limit(pool, org, feature).await?;
    if status.allowed {
        return Ok(());
    }

    tracing::info!(
        "Plan limit hit for org {}: {} {}/{:?} on plan {}",
        org.id, status.feature, status.current_usage, status.limit, status.plan
    );

    Err(AppError::PlanLimitExceeded {
        feature: status.feature,
        current_usage: status.current_usage,
        limit: status.limit.unwrap_or(0),
        plan: status.plan.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Organization, SubscriptionPlan};
    use chrono::Utc;
    use uuid::Uuid;

    fn org(plan: &str, status: &str) -> Organization {
        Organization {
            id: Uuid::new_v4(),
            name: "Test Landlords".to_string(),
            email: None,
            phone: None,
            address: None,
            subscription_plan: plan.to_string(),
            subscription_status: status.to_string(),
            billing_cycle: "monthly".to_string(),
            trial_end_date: None,
            next_renewal_date: None,
            overdue_since: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn basic_plan_caps_properties_at_three() {
        assert_eq!(plan_limit(SubscriptionPlan::Basic, Feature::Properties), Some(3));
    }

    #[test]
    fn enterprise_is_unlimited_for_every_feature() {
        for feature in [
            Feature::Properties,
            Feature::Tenants,
            Feature::Documents,
            Feature::MaintenanceRequests,
        ] {
            assert_eq!(plan_limit(SubscriptionPlan::Enterprise, feature), None);
        }
    }

    #[test]
    fn overdue_org_is_degraded_to_basic() {
        let org = org("enterprise", "overdue");
        assert_eq!(effective_plan(&org), SubscriptionPlan::Basic);
    }

    #[test]
    fn expired_trial_is_degraded_to_basic() {
        let org = org("professional", "expired_trial");
        assert_eq!(effective_plan(&org), SubscriptionPlan::Basic);
    }

    #[test]
    fn active_org_keeps_its_plan() {
        let org = org("professional", "active");
        assert_eq!(effective_plan(&org), SubscriptionPlan::Professional);
    }

    #[test]
    fn feature_names_parse() {
        assert_eq!(Feature::from_str("properties"), Some(Feature::Properties));
        assert_eq!(Feature::from_str("maintenance_requests"), Some(Feature::MaintenanceRequests));
        assert_eq!(Feature::from_str("units"), None);
    }
}
