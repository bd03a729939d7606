//! Organization model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};

/// Subscription plan tier - determines feature ceilings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubscriptionPlan {
    /// Fallback tier after cancellation
    Free,
    Basic,
    Professional,
    Enterprise,
}

impl SubscriptionPlan {
    /// Parse plan string from database
    pub fn from_str(s: &str) -> Self {
        match s {
            "free" => SubscriptionPlan::Free,
            "professional" => SubscriptionPlan::Professional,
            "enterprise" => SubscriptionPlan::Enterprise,
            _ => SubscriptionPlan::Basic,
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => "free",
            SubscriptionPlan::Basic => "basic",
            SubscriptionPlan::Professional => "professional",
            SubscriptionPlan::Enterprise => "enterprise",
        }
    }

    /// Monthly price in birr
    pub fn monthly_price(&self) -> f64 {
        match self {
            SubscriptionPlan::Free => 0.0,
            SubscriptionPlan::Basic => 500.0,
            SubscriptionPlan::Professional => 1500.0,
            SubscriptionPlan::Enterprise => 4000.0,
        }
    }
}

/// Subscription lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubscriptionStatus {
    Trial,
    ExpiredTrial,
    Active,
    Overdue,
    Suspended,
    Cancelled,
    PendingVerification,
}

impl SubscriptionStatus {
    pub fn from_str(s: &str) -> Self {
        match s {
            "active" => SubscriptionStatus::Active,
            "expired_trial" => SubscriptionStatus::ExpiredTrial,
            "overdue" => SubscriptionStatus::Overdue,
            "suspended" => SubscriptionStatus::Suspended,
            "cancelled" => SubscriptionStatus::Cancelled,
            "pending_verification" => SubscriptionStatus::PendingVerification,
            _ => SubscriptionStatus::Trial,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::ExpiredTrial => "expired_trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Overdue => "overdue",
            SubscriptionStatus::Suspended => "suspended",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::PendingVerification => "pending_verification",
        }
    }
}

/// Billing cycle for subscription renewals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    SemiAnnual,
    Annual,
}

impl BillingCycle {
    pub fn from_str(s: &str) -> Self {
        match s {
            "semi_annual" => BillingCycle::SemiAnnual,
            "annual" => BillingCycle::Annual,
            _ => BillingCycle::Monthly,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::SemiAnnual => "semi_annual",
            BillingCycle::Annual => "annual",
        }
    }

    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::SemiAnnual => 6,
            BillingCycle::Annual => 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub subscription_plan: String,
    pub subscription_status: String,
    pub billing_cycle: String,
    pub trial_end_date: Option<NaiveDate>,
    pub next_renewal_date: Option<NaiveDate>,
    pub overdue_since: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Flip an active organization to overdue, once.
    /// The `overdue_since IS NULL` guard keeps repeat requests from rewriting it.
    pub async fn mark_overdue(pool: &PgPool, id: Uuid, today: NaiveDate) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE organizations
            SET subscription_status = 'overdue', overdue_since = $2, updated_at = NOW()
            WHERE id = $1 AND overdue_since IS NULL
            "#
        )
        .bind(id)
        .bind(today)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub fn plan(&self) -> SubscriptionPlan {
        SubscriptionPlan::from_str(&self.subscription_plan)
    }

    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_str(&self.subscription_status)
    }

    pub fn cycle(&self) -> BillingCycle {
        BillingCycle::from_str(&self.billing_cycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_round_trips_through_db_strings() {
        for plan in [
            SubscriptionPlan::Free,
            SubscriptionPlan::Basic,
            SubscriptionPlan::Professional,
            SubscriptionPlan::Enterprise,
        ] {
            assert_eq!(SubscriptionPlan::from_str(plan.as_str()), plan);
        }
    }

    #[test]
    fn unknown_plan_falls_back_to_basic() {
        assert_eq!(SubscriptionPlan::from_str("platinum"), SubscriptionPlan::Basic);
    }

    #[test]
    fn status_round_trips_through_db_strings() {
        for status in [
            SubscriptionStatus::Trial,
            SubscriptionStatus::ExpiredTrial,
            SubscriptionStatus::Active,
            SubscriptionStatus::Overdue,
            SubscriptionStatus::Suspended,
            SubscriptionStatus::Cancelled,
            SubscriptionStatus::PendingVerification,
        ] {
            assert_eq!(SubscriptionStatus::from_str(status.as_str()), status);
        }
    }

    #[test]
    fn billing_cycle_month_counts() {
        assert_eq!(BillingCycle::Monthly.months(), 1);
        assert_eq!(BillingCycle::SemiAnnual.months(), 6);
        assert_eq!(BillingCycle::Annual.months(), 12);
    }
}
