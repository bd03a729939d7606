//! Property and unit handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{AppError, AppResult, AppState};
use crate::limits::{self, Feature};
use crate::middleware::auth::{require_roles, AuthedUser};
use crate::models::{CreateProperty, CreateUnit, Property, Unit, UpdateProperty, UserRole};

/// Create a property, gated by the plan limit for `properties`
pub async fn create(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(req): Json<CreateProperty>,
) -> AppResult<Json<Property>> {
    req.validate()?;
    limits::enforce_limit(&state.pool, &user.org, Feature::Properties).await?;

    let property = Property::create(&state.pool, user.org_id(), req).await?;

    tracing::info!("Property created: {} by user {}", property.id, user.user_id);
    Ok(Json(property))
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthedUser,
) -> AppResult<Json<Vec<Property>>> {
    let properties = Property::list_by_org(&state.pool, user.org_id()).await?;
    Ok(Json(properties))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Property>> {
    let property = Property::find_owned(&state.pool, id, user.org_id())
        .await?
        .ok_or_else(|| AppError::NotFound("Property not found".to_string()))?;
    Ok(Json(property))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProperty>,
) -> AppResult<Json<Property>> {
    req.validate()?;

    let property = Property::update(&state.pool, id, user.org_id(), req)
        .await?
        .ok_or_else(|| AppError::NotFound("Property not found".to_string()))?;
    Ok(Json(property))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    require_roles(&user, &[UserRole::Landlord, UserRole::Admin])?;
    let deleted = Property::deactivate(&state.pool, id, user.org_id()).await?;
    if !deleted {
        return Err(AppError::NotFound("Property not found".to_string()));
    }

    tracing::info!("Property deactivated: {} by user {}", id, user.user_id);
    Ok(Json(serde_json::json!({ "message": "Property deleted" })))
}

/// Create a unit under a property
pub async fn create_unit(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(property_id): Path<Uuid>,
    Json(req): Json<CreateUnit>,
) -> AppResult<Json<Unit>> {
    req.validate()?;

    // Unit must land under a property the caller's organization owns
    Property::find_owned(&state.pool, property_id, user.org_id())
        .await?
        .ok_or_else(|| AppError::NotFound("Property not found".to_string()))?;

    let unit = Unit::create(&state.pool, user.org_id(), property_id, req).await?;
    Ok(Json(unit))
}

pub async fn list_units(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(property_id): Path<Uuid>,
) -> AppResult<Json<Vec<Unit>>> {
    let units = Unit::list_by_property(&state.pool, property_id, user.org_id()).await?;
    Ok(Json(units))
}
