//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Auth errors
    InvalidCredentials,
    TokenExpired,
    TokenInvalid,
    Unauthorized,
    Forbidden,

    // Subscription-state rejections (expected outcomes, not failures)
    TrialExpired,
    SubscriptionOverdue,
    SubscriptionInactive,
    PlanLimitExceeded {
        feature: &'static str,
        current_usage: i64,
        limit: i64,
        plan: String,
    },

    // Resource errors
    NotFound(String),
    AlreadyExists(String),
    Conflict(String),

    // Validation errors
    ValidationError(String),

    // Database errors
    DatabaseError(String),

    // Generic errors
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": "Invalid email or password" }),
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": "Token has expired" }),
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": "Invalid token" }),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": "Authentication required" }),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                json!({ "message": "Access denied" }),
            ),
            AppError::TrialExpired => (
                StatusCode::FORBIDDEN,
                json!({
                    "message": "Trial period has ended. Please choose a plan to continue.",
                    "code": "TRIAL_EXPIRED"
                }),
            ),
            AppError::SubscriptionOverdue => (
                StatusCode::FORBIDDEN,
                json!({
                    "message": "Subscription payment is overdue. Please renew to continue.",
                    "code": "SUBSCRIPTION_OVERDUE"
                }),
            ),
            AppError::SubscriptionInactive => (
                StatusCode::FORBIDDEN,
                json!({
                    "message": "Subscription is not active. Contact support to reactivate.",
                    "code": "SUBSCRIPTION_INACTIVE"
                }),
            ),
            AppError::PlanLimitExceeded { feature, current_usage, limit, plan } => (
                StatusCode::FORBIDDEN,
                json!({
                    "message": format!("Plan limit reached for {feature}. Upgrade to add more."),
                    "code": "PLAN_LIMIT_EXCEEDED",
                    "feature": feature,
                    "currentUsage": current_usage,
                    "limit": limit,
                    "plan": plan,
                }),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "message": msg })),
            AppError::AlreadyExists(msg) => (StatusCode::BAD_REQUEST, json!({ "message": msg })),
            AppError::Conflict(msg) => (StatusCode::BAD_REQUEST, json!({ "message": msg })),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, json!({ "message": msg })),
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal server error" }),
                )
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::TokenInvalid,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn plan_limit_rejection_is_forbidden() {
        let err = AppError::PlanLimitExceeded {
            feature: "properties",
            current_usage: 3,
            limit: 3,
            plan: "basic".to_string(),
        };
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn subscription_rejections_are_forbidden() {
        for err in [
            AppError::TrialExpired,
            AppError::SubscriptionOverdue,
            AppError::SubscriptionInactive,
        ] {
            assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
        }
    }

    #[test]
    fn conflict_maps_to_bad_request() {
        let resp = AppError::Conflict("Unit is already occupied".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
