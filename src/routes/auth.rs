use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::Json;
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{extract_token, TOKEN_COOKIE};
use crate::authz::{Principal, Role};
use crate::errors::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::models::user::{AuthResponse, DbUser, LoginRequest, SignupRequest, User};
use crate::utils::{hash_password, utc_now, verify_password};

type CookieHeader = [(HeaderName, String); 1];

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    message: String,
}

#[utoipa::path(
    post,
    path = "/api/signup",
    tag = "Auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created and signed in", body = AuthResponse),
        (status = 400, description = "Invalid email, password or role"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> AppResult<(StatusCode, CookieHeader, Json<AuthResponse>)> {
    let email = normalize_email(&payload.email)?;
    let role = match payload.role.as_deref() {
        Some(role) => role.parse::<Role>()?,
        None => Role::default(),
    };

    ensure_email_available(&state.pool, &email).await?;

    let password_hash = hash_password(&payload.password)?;
    let now = utc_now();
    let user_id = Uuid::new_v4();

    let inserted = sqlx::query(
        "INSERT INTO users (id, email, password_hash, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id.to_string())
    .bind(&email)
    .bind(password_hash)
    .bind(role.as_str())
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await;

    match inserted {
        Ok(_) => {}
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            return Err(AppError::conflict("email already in use"));
        }
        Err(err) => return Err(err.into()),
    }

    let user: User = fetch_user_by_id(&state.pool, user_id).await?.try_into()?;
    let (cookie, response) = start_session(&state, user).await?;

    tracing::info!(user_id = %response.user.id, role = %response.user.role, "user signed up");

    Ok((StatusCode::CREATED, cookie, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<(CookieHeader, Json<AuthResponse>)> {
    let email = payload.email.trim().to_lowercase();

    let db_user = sqlx::query_as::<_, DbUser>(
        "SELECT id, email, password_hash, role, created_at, updated_at FROM users WHERE email = ?",
    )
    .bind(&email)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;

    if !verify_password(&payload.password, &db_user.password_hash)? {
        tracing::warn!(user_id = %db_user.id, "login with wrong password");
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let user: User = db_user.try_into()?;
    let (cookie, response) = start_session(&state, user).await?;

    tracing::info!(user_id = %response.user.id, role = %response.user.role, "user logged in");

    Ok((cookie, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Session revoked", body = MessageResponse),
        (status = 401, description = "No live session")
    ),
    security(("bearerAuth" = []), ("cookieAuth" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    principal: Principal,
    headers: HeaderMap,
) -> AppResult<(CookieHeader, Json<MessageResponse>)> {
    // the gate already resolved a token, so it is present here
    let token = extract_token(&headers).ok_or_else(|| AppError::unauthorized("no token provided"))?;
    state.sessions.revoke(&token).await?;

    tracing::info!(user_id = %principal.user_id, "user logged out");

    Ok((
        [(SET_COOKIE, clear_cookie())],
        Json(MessageResponse {
            message: "Logout successful".to_string(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/user",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user record", body = User),
        (status = 401, description = "Not signed in")
    ),
    security(("bearerAuth" = []), ("cookieAuth" = []))
)]
pub async fn me(State(state): State<AppState>, principal: Principal) -> AppResult<Json<User>> {
    let user: User = fetch_user_by_id(&state.pool, principal.user_id).await?.try_into()?;
    Ok(Json(user))
}

async fn start_session(state: &AppState, user: User) -> AppResult<(CookieHeader, AuthResponse)> {
    let issued = state.jwt.encode(user.id, &user.email, user.role)?;
    state
        .sessions
        .open(user.id, user.role, &issued.token, issued.expires_at)
        .await?;

    let cookie = session_cookie(&issued.token, state.jwt.ttl.num_seconds());

    Ok((
        [(SET_COOKIE, cookie)],
        AuthResponse {
            token: issued.token,
            expires_at: issued.expires_at,
            user,
        },
    ))
}

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{TOKEN_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age_secs}")
}

fn clear_cookie() -> String {
    format!("{TOKEN_COOKIE}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0")
}

fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AppError::bad_request("a valid email is required")),
    }
}

async fn ensure_email_available(pool: &SqlitePool, email: &str) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Err(AppError::conflict("email already in use"));
    }

    Ok(())
}

pub(crate) async fn fetch_user_by_id(pool: &SqlitePool, user_id: Uuid) -> AppResult<DbUser> {
    sqlx::query_as::<_, DbUser>(
        "SELECT id, email, password_hash, role, created_at, updated_at FROM users WHERE id = ?",
    )
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("user not found"))
}
