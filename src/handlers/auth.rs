//! Authentication handlers

use axum::{extract::State, Json};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::{AppError, AppResult, AppState};
use crate::middleware::auth::{AuthedUser, Claims};
use crate::models::{LoginRequest, LoginResponse, Organization, User, UserInfo};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub organization_name: String,
    pub organization_phone: Option<String>,
    pub organization_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub org_id: Uuid,
    pub email: String,
    pub trial_end_date: chrono::NaiveDate,
}

/// Login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = User::find_by_email(&state.pool, &req.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::InternalError("Invalid password hash".to_string()))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::InvalidCredentials)?;

    User::update_last_login(&state.pool, user.id).await?;

    let token = issue_jwt(
        user.id,
        user.org_id,
        &user.role,
        None,
        &state.config.jwt_secret,
        Duration::hours(state.config.jwt_expiration_hours as i64),
    )?;

    Ok(Json(LoginResponse {
        token,
        user: user.to_info(),
    }))
}

/// Register new organization and landlord user, inside one transaction
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<RegisterResponse>> {
    req.validate()?;

    if User::find_by_email(&state.pool, &req.email).await?.is_some() {
        return Err(AppError::AlreadyExists("Email already registered".to_string()));
    }

    let trial_end = Utc::now().date_naive() + Duration::days(state.config.trial_days);

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .to_string();

    let mut tx = state.pool.begin().await?;

    let org = insert_organization(&mut tx, &req, trial_end).await?;
    let user = insert_landlord(&mut tx, org.id, &req, &password_hash).await?;

    tx.commit().await?;

    tracing::info!("New organization registered: {} ({})", org.name, org.id);

    Ok(Json(RegisterResponse {
        user_id: user.id,
        org_id: org.id,
        email: user.email,
        trial_end_date: trial_end,
    }))
}

/// Resolve caller + organization subscription snapshot
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserInfo,
    pub organization: Organization,
    pub impersonated_by: Option<Uuid>,
}

pub async fn profile(
    State(state): State<AppState>,
    user: AuthedUser,
) -> AppResult<Json<ProfileResponse>> {
    let db_user = User::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        user: db_user.to_info(),
        organization: user.org,
        impersonated_by: user.impersonated_by,
    }))
}

/// Generate a signed JWT. Impersonation tokens carry the issuing admin's id
/// and a short expiry.
pub fn issue_jwt(
    user_id: Uuid,
    org_id: Uuid,
    role: &str,
    impersonated_by: Option<Uuid>,
    secret: &str,
    ttl: Duration,
) -> AppResult<String> {
    let now = Utc::now();
    let exp = now + ttl;

    let claims = Claims {
        sub: user_id.to_string(),
        org: org_id.to_string(),
        role: role.to_string(),
        exp: exp.timestamp() as usize,
        iat: now.timestamp() as usize,
        impersonated_by: impersonated_by.map(|id| id.to_string()),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalError(e.to_string()))
}

async fn insert_organization(
    tx: &mut Transaction<'_, Postgres>,
    req: &RegisterRequest,
    trial_end: chrono::NaiveDate,
) -> Result<Organization, sqlx::Error> {
    sqlx::query_as::<_, Organization>(
        r#"
        INSERT INTO organizations (name, email, phone, address, subscription_status, trial_end_date)
        VALUES ($1, $2, $3, $4, 'trial', $5)
        RETURNING *
        "#
    )
    .bind(&req.organization_name)
    .bind(&req.email)
    .bind(&req.organization_phone)
    .bind(&req.organization_address)
    .bind(trial_end)
    .fetch_one(&mut **tx)
    .await
}

async fn insert_landlord(
    tx: &mut Transaction<'_, Postgres>,
    org_id: Uuid,
    req: &RegisterRequest,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (org_id, email, password_hash, name, role)
        VALUES ($1, $2, $3, $4, 'landlord')
        RETURNING *
        "#
    )
    .bind(org_id)
    .bind(&req.email)
    .bind(password_hash)
    .bind(&req.name)
    .fetch_one(&mut **tx)
    .await
}
