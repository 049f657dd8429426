use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::Role;
use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbUser {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.id).map_err(|err| AppError::internal(format!("invalid user id: {err}")))
    }
}

impl TryFrom<DbUser> for User {
    type Error = AppError;

    fn try_from(value: DbUser) -> Result<Self, Self::Error> {
        Ok(User {
            id: value.user_id()?,
            role: value
                .role
                .parse()
                .map_err(|_| AppError::internal(format!("stored role is invalid: {}", value.role)))?,
            email: value.email,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    #[schema(example = "first.officer@example.com")]
    pub email: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
    /// Caller-chosen and unrestricted, `admin` included; defaults to `crew`.
    #[schema(example = "pilot")]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "first.officer@example.com")]
    pub email: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleUpdateRequest {
    #[schema(example = "auditor")]
    pub role: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: &str) -> DbUser {
        DbUser {
            id: Uuid::new_v4().to_string(),
            email: "ops@example.com".to_string(),
            password_hash: "x".to_string(),
            role: role.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn stored_row_converts_to_user() {
        let user = User::try_from(row("ground_staff")).unwrap();
        assert_eq!(user.role, Role::GroundStaff);
    }

    #[test]
    fn unknown_stored_role_is_an_internal_error() {
        let err = User::try_from(row("captain")).unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
