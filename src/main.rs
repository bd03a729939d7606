//! RentDesk Cloud Backend Server
//!
//! Multi-tenant property and rent management API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    RENTDESK CLOUD                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  API      │  │  Auth +   │  │  Rent/Reminder Jobs     │ │
//! │  │  Gateway  │  │  Sub Gate │  │  (Background Loops)     │ │
//! │  │  (Axum)   │  │  (JWT)    │  │                         │ │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬────────────┘ │
//! │        └──────────────┼──────────────────────┘              │
//! │                       ▼                                     │
//! │                ┌─────────────┐                             │
//! │                │ PostgreSQL  │                             │
//! │                └─────────────┘                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod billing;
mod config;
mod db;
mod error;
mod handlers;
mod jobs;
mod limits;
mod middleware;
mod models;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "rentdesk_cloud=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("RentDesk Cloud Server starting...");
    tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));

    // Initialize database pool
    let pool = db::create_pool(&config.database_url).await
        .expect("Failed to create database pool");

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await
        .expect("Failed to run migrations");

    // Build application state
    let state = AppState {
        pool,
        config: config.clone(),
    };

    // Start background rent/reminder jobs
    jobs::spawn(state.clone());

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/register", post(handlers::auth::register));

    // Management routes (user JWT auth + subscription gate)
    let management_routes = Router::new()
        .route("/api/auth/profile", get(handlers::auth::profile))

        // Properties and units
        .route("/api/properties", post(handlers::properties::create))
        .route("/api/properties", get(handlers::properties::list))
        .route("/api/properties/:id", get(handlers::properties::get))
        .route("/api/properties/:id", put(handlers::properties::update))
        .route("/api/properties/:id", delete(handlers::properties::delete))
        .route("/api/properties/:id/units", post(handlers::properties::create_unit))
        .route("/api/properties/:id/units", get(handlers::properties::list_units))

        // Tenants
        .route("/api/tenants", post(handlers::tenants::create))
        .route("/api/tenants", get(handlers::tenants::list))
        .route("/api/tenants/terminated", get(handlers::tenants::list_terminated))
        .route("/api/tenants/:id", get(handlers::tenants::get))
        .route("/api/tenants/:id", put(handlers::tenants::update))
        .route("/api/tenants/:id", delete(handlers::tenants::delete))
        .route("/api/tenants/:id/terminate", post(handlers::tenants::terminate))

        // Contracts
        .route("/api/contracts", post(handlers::contracts::create))
        .route("/api/contracts", get(handlers::contracts::list))
        .route("/api/contracts/:id", get(handlers::contracts::get))
        .route("/api/contracts/:id/renew", post(handlers::contracts::renew))

        // Payments
        .route("/api/payments", post(handlers::payments::record))
        .route("/api/payments", get(handlers::payments::list))
        .route("/api/payments/generate-overdue", post(handlers::payments::generate_overdue))

        // Maintenance
        .route("/api/maintenance", post(handlers::maintenance::create))
        .route("/api/maintenance", get(handlers::maintenance::list))
        .route("/api/maintenance/:id", put(handlers::maintenance::update))

        // Documents
        .route("/api/documents", post(handlers::documents::create))
        .route("/api/documents", get(handlers::documents::list))
        .route("/api/documents/:id", delete(handlers::documents::delete))

        // Notifications
        .route("/api/notifications", get(handlers::notifications::list))
        .route("/api/notifications/:id/read", put(handlers::notifications::mark_read))

        // Subscription self-service
        .route("/api/subscription/status", get(handlers::subscription::status))
        .route("/api/subscription/plans", get(handlers::subscription::plans))
        .route("/api/subscription/upgrade", post(handlers::subscription::upgrade))
        .route("/api/subscription/renew", post(handlers::subscription::renew))
        .route("/api/subscription/check-limits/:feature", get(handlers::subscription::check_limits))

        // Reports
        .route("/api/reports/dashboard", get(handlers::reports::dashboard))

        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_user_auth,
        ));

    // Super-admin console (role-gated on top of user auth)
    let admin_routes = Router::new()
        .route("/api/admin/organizations", get(handlers::admin::list_organizations))
        .route("/api/admin/organizations/:id", get(handlers::admin::get_organization))
        .route("/api/admin/organizations/:id", delete(handlers::admin::delete_organization))
        .route("/api/admin/organizations/:id/cancel-subscription", post(handlers::admin::cancel_subscription))
        .route("/api/admin/subscriptions/pending", get(handlers::admin::pending_subscriptions))
        .route("/api/admin/subscriptions/:id/approve", post(handlers::admin::approve_subscription))
        .route("/api/admin/subscriptions/:id/reject", post(handlers::admin::reject_subscription))
        .route("/api/admin/analytics", get(handlers::admin::analytics))
        .route("/api/admin/actions", get(handlers::admin::list_actions))
        .route("/api/admin/impersonate/:user_id", post(handlers::admin::impersonate))
        .layer(axum_middleware::from_fn(middleware::auth::require_super_admin))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_user_auth,
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(management_routes)
        .merge(admin_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
