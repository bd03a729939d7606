//! Authentication middleware
//!
//! Resolves the bearer token to the acting user plus their organization's
//! subscription snapshot in one lookup, then applies the subscription gate
//! before any handler runs.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row};
use uuid::Uuid;

use crate::{AppError, AppState};
use crate::models::{Organization, SubscriptionStatus, UserRole};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // User ID
    pub org: String,      // Organization ID
    pub role: String,     // User role
    pub exp: usize,       // Expiration timestamp
    pub iat: usize,       // Issued at
    /// Set on impersonation tokens only: the issuing super-admin's id
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub impersonated_by: Option<String>,
}

/// Acting user plus organization subscription snapshot
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub impersonated_by: Option<Uuid>,
    pub org: Organization,
}

impl AuthedUser {
    pub fn org_id(&self) -> Uuid {
        self.org.id
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == UserRole::SuperAdmin
    }
}

/// Capability check: the operation is allowed for any of the listed roles
pub fn require_roles(user: &AuthedUser, allowed: &[UserRole]) -> Result<(), AppError> {
    if !allowed.contains(&user.role) {
        tracing::warn!(
            "User {} with role '{}' denied; allowed: {:?}",
            user.user_id,
            user.role.as_str(),
            allowed.iter().map(|r| r.as_str()).collect::<Vec<_>>()
        );
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Middleware: Require user JWT authentication and a usable subscription
pub async fn require_user_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&req)?;

    let token_data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;
    let claims = token_data.claims;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::TokenInvalid)?;
    let impersonated_by = match &claims.impersonated_by {
        Some(id) => Some(Uuid::parse_str(id).map_err(|_| AppError::TokenInvalid)?),
        None => None,
    };

    // User + org subscription snapshot in one lookup
    let row = sqlx::query(
        r#"
        SELECT u.id AS user_id, u.email AS user_email, u.role AS user_role,
               u.is_active AS user_is_active, o.*
        FROM users u
        JOIN organizations o ON o.id = u.org_id
        WHERE u.id = $1
        "#
    )
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    if !row.get::<bool, _>("user_is_active") {
        return Err(AppError::Unauthorized);
    }

    let org = Organization::from_row(&row)?;
    let user = AuthedUser {
        user_id,
        email: row.get("user_email"),
        role: UserRole::from_str(row.get("user_role")),
        impersonated_by,
        org,
    };

    // Super-admins bypass the subscription gate; the platform console must
    // work against organizations in any state.
    if !user.is_super_admin() {
        gate_subscription(&state, &user.org).await?;
    }

    if let Some(admin_id) = user.impersonated_by {
        tracing::info!(
            "Impersonated request: admin {} acting as user {}",
            admin_id, user.user_id
        );
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Subscription gate decision table
async fn gate_subscription(state: &AppState, org: &Organization) -> Result<(), AppError> {
    let today = Utc::now().date_naive();

    match org.status() {
        SubscriptionStatus::Trial => {
            if let Some(trial_end) = org.trial_end_date {
                if today > trial_end {
                    return Err(AppError::TrialExpired);
                }
            }
            Ok(())
        }
        SubscriptionStatus::Active => {
            if let Some(renewal) = org.next_renewal_date {
                if renewal < today {
                    // Idempotent flip; the write is guarded on overdue_since IS NULL
                    Organization::mark_overdue(&state.pool, org.id, today).await?;
                    tracing::info!("Organization {} flipped to overdue", org.id);
                    return Err(AppError::SubscriptionOverdue);
                }
            }
            Ok(())
        }
        SubscriptionStatus::Suspended | SubscriptionStatus::Cancelled => {
            Err(AppError::SubscriptionInactive)
        }
        // overdue / expired_trial proceed with degraded plan limits;
        // pending_verification keeps the previous plan usable
        _ => Ok(()),
    }
}

/// Middleware layer for /api/admin routes
pub async fn require_super_admin(
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<AuthedUser>()
        .ok_or(AppError::Unauthorized)?;

    if !user.is_super_admin() {
        tracing::warn!("Admin route denied for user {} ({})", user.user_id, user.role.as_str());
        return Err(AppError::Forbidden);
    }

    Ok(next.run(req).await)
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(req: &Request) -> Result<String, AppError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?;

    if !auth_header.starts_with("Bearer ") {
        return Err(AppError::Unauthorized);
    }

    Ok(auth_header[7..].to_string())
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthedUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authed_user(role: UserRole) -> AuthedUser {
        let now = Utc::now();
        AuthedUser {
            user_id: Uuid::new_v4(),
            email: "owner@example.com".to_string(),
            role,
            impersonated_by: None,
            org: Organization {
                id: Uuid::new_v4(),
                name: "Test Org".to_string(),
                email: None,
                phone: None,
                address: None,
                subscription_plan: "basic".to_string(),
                subscription_status: "active".to_string(),
                billing_cycle: "monthly".to_string(),
                trial_end_date: None,
                next_renewal_date: None,
                overdue_since: None,
                created_at: now,
                updated_at: now,
            },
        }
    }

    #[test]
    fn role_check_allows_listed_roles() {
        let user = authed_user(UserRole::Landlord);
        assert!(require_roles(&user, &[UserRole::Landlord, UserRole::Admin]).is_ok());
    }

    #[test]
    fn role_check_rejects_unlisted_roles() {
        let user = authed_user(UserRole::Admin);
        let err = require_roles(&user, &[UserRole::Landlord]).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[test]
    fn plain_claims_omit_impersonation_field() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            org: Uuid::new_v4().to_string(),
            role: "landlord".to_string(),
            exp: 2_000_000_000,
            iat: 1_000_000_000,
            impersonated_by: None,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("impersonated_by").is_none());
    }

    #[test]
    fn impersonation_claims_carry_audit_reference() {
        let admin = Uuid::new_v4();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            org: Uuid::new_v4().to_string(),
            role: "landlord".to_string(),
            exp: 2_000_000_000,
            iat: 1_000_000_000,
            impersonated_by: Some(admin.to_string()),
        };
        let json = serde_json::to_string(&claims).unwrap();
        let parsed: Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.impersonated_by, Some(admin.to_string()));
    }

    #[test]
    fn claims_without_impersonation_field_deserialize() {
        let json = r#"{"sub":"s","org":"o","role":"landlord","exp":2,"iat":1}"#;
        let parsed: Claims = serde_json::from_str(json).unwrap();
        assert!(parsed.impersonated_by.is_none());
    }
}
