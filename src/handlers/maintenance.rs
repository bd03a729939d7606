//! Maintenance request handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{AppError, AppResult, AppState};
use crate::limits::{self, Feature};
use crate::middleware::auth::AuthedUser;
use crate::models::{
    CreateMaintenanceRequest, MaintenanceRequest, Property, UpdateMaintenanceRequest,
};

/// Create a maintenance request, gated by the plan limit
pub async fn create(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(req): Json<CreateMaintenanceRequest>,
) -> AppResult<Json<MaintenanceRequest>> {
    req.validate()?;
    limits::enforce_limit(&state.pool, &user.org, Feature::MaintenanceRequests).await?;

    Property::find_owned(&state.pool, req.property_id, user.org_id())
        .await?
        .ok_or_else(|| AppError::NotFound("Property not found".to_string()))?;

    let request = MaintenanceRequest::create(&state.pool, user.org_id(), req).await?;
    Ok(Json(request))
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthedUser,
) -> AppResult<Json<Vec<MaintenanceRequest>>> {
    let requests = MaintenanceRequest::list_by_org(&state.pool, user.org_id()).await?;
    Ok(Json(requests))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMaintenanceRequest>,
) -> AppResult<Json<MaintenanceRequest>> {
    if let Some(status) = &req.status {
        if !matches!(status.as_str(), "open" | "in_progress" | "resolved") {
            return Err(AppError::ValidationError(format!("Unknown status '{status}'")));
        }
    }

    let request = MaintenanceRequest::update(&state.pool, id, user.org_id(), req)
        .await?
        .ok_or_else(|| AppError::NotFound("Maintenance request not found".to_string()))?;
    Ok(Json(request))
}
