use axum::extract::State;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{authorize, Operation, Principal, Role};
use crate::errors::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath};
use crate::models::user::{DbUser, RoleUpdateRequest, User};
use crate::routes::auth::fetch_user_by_id;
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearerAuth" = []), ("cookieAuth" = []))
)]
pub async fn list_users(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Vec<User>>> {
    authorize(&principal, Operation::ManageUsers)?;

    let users = sqlx::query_as::<_, DbUser>(
        "SELECT id, email, password_hash, role, created_at, updated_at FROM users ORDER BY created_at, email",
    )
    .fetch_all(&state.pool)
    .await?
    .into_iter()
    .map(User::try_from)
    .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(users))
}

/// Changes a user's role. Sessions already issued keep the role they were
/// issued with until they expire.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = RoleUpdateRequest,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Unknown role"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = []), ("cookieAuth" = []))
)]
pub async fn update_user_role(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<RoleUpdateRequest>,
) -> AppResult<Json<User>> {
    authorize(&principal, Operation::ManageUsers)?;
    let role: Role = payload.role.parse()?;

    let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
        .bind(role.as_str())
        .bind(utc_now())
        .bind(id.to_string())
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("user not found"));
    }

    tracing::info!(admin_id = %principal.user_id, user_id = %id, role = %role, "user role changed");

    let user: User = fetch_user_by_id(&state.pool, id).await?.try_into()?;
    Ok(Json(user))
}
