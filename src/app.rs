use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::SessionLedger;
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{auth, health, incidents, users};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub sessions: SessionLedger,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig) -> Self {
        Self {
            sessions: SessionLedger::new(pool.clone()),
            pool,
            jwt: Arc::new(jwt),
        }
    }
}

/// Builds the router from environment configuration.
pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let cors = cors_layer(std::env::var("CORS_ORIGIN").ok().as_deref())?;

    Ok(build_router(AppState::new(pool, jwt_config), cors))
}

pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/user", get(auth::me));

    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/:id", put(users::update_user_role));

    let incident_routes = Router::new()
        .route("/", get(incidents::list_incidents).post(incidents::create_incident))
        .route("/export", get(incidents::export_incidents))
        .route("/:id", get(incidents::get_incident))
        .route("/:id/comments", post(incidents::add_comment))
        .route("/:id/suggest-action", put(incidents::suggest_action))
        .route("/:id/assign-action", put(incidents::assign_action))
        .route("/:id/action-status", put(incidents::set_action_status));

    let api = Router::new()
        .merge(auth_routes)
        .route("/health", get(health::health))
        .nest("/users", user_routes)
        .nest("/incidents", incident_routes);

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Cookie transport needs credentials, which rules out a wildcard origin; so
/// an explicit origin enables credentials and no origin means any origin
/// without them.
pub fn cors_layer(origin: Option<&str>) -> Result<CorsLayer, AppError> {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::OPTIONS];

    match origin {
        Some(origin) => {
            let origin = HeaderValue::from_str(origin)
                .map_err(|_| AppError::configuration("CORS_ORIGIN is not a valid header value"))?;

            Ok(CorsLayer::new()
                .allow_methods(methods)
                .allow_origin(origin)
                .allow_headers([CONTENT_TYPE, AUTHORIZATION])
                .allow_credentials(true))
        }
        None => Ok(CorsLayer::new()
            .allow_methods(methods)
            .allow_origin(Any)
            .allow_headers(Any)),
    }
}
