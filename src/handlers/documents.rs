//! Document metadata handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{AppError, AppResult, AppState};
use crate::limits::{self, Feature};
use crate::middleware::auth::AuthedUser;
use crate::models::{CreateDocument, Document};

/// Register a document, gated by the plan limit
pub async fn create(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(req): Json<CreateDocument>,
) -> AppResult<Json<Document>> {
    req.validate()?;
    limits::enforce_limit(&state.pool, &user.org, Feature::Documents).await?;

    let document = Document::create(&state.pool, user.org_id(), req).await?;
    Ok(Json(document))
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthedUser,
) -> AppResult<Json<Vec<Document>>> {
    let documents = Document::list_by_org(&state.pool, user.org_id()).await?;
    Ok(Json(documents))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = Document::deactivate(&state.pool, id, user.org_id()).await?;
    if !deleted {
        return Err(AppError::NotFound("Document not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Document deleted" })))
}
