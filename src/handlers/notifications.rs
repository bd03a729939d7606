//! Notification handlers - the polling surface for reminder delivery

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{AppError, AppResult, AppState};
use crate::middleware::auth::AuthedUser;
use crate::models::Notification;

pub async fn list(
    State(state): State<AppState>,
    user: AuthedUser,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications = Notification::list_for_user(&state.pool, user.user_id, user.org_id()).await?;
    Ok(Json(notifications))
}

pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let updated = Notification::mark_read(&state.pool, id, user.user_id).await?;
    if !updated {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Notification marked as read" })))
}
