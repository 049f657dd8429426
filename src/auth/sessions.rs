use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::authz::Role;
use crate::errors::{AppError, AppResult};

/// A live (or lapsed, until looked up) entry of the session ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, FromRow)]
struct DbSession {
    user_id: String,
    role: String,
    expires_at: DateTime<Utc>,
}

impl TryFrom<DbSession> for Session {
    type Error = AppError;

    fn try_from(value: DbSession) -> Result<Self, Self::Error> {
        Ok(Session {
            user_id: Uuid::parse_str(&value.user_id)
                .map_err(|err| AppError::internal(format!("invalid session user id: {err}")))?,
            role: value.role.parse()?,
            expires_at: value.expires_at,
        })
    }
}

/// Server-side record of issued bearer tokens.
///
/// Tokens are keyed by their SHA-256 digest, so the raw bearer string never
/// lands in the database. Expiry is checked lazily by the caller; nothing
/// sweeps old rows.
#[derive(Debug, Clone)]
pub struct SessionLedger {
    pool: SqlitePool,
}

impl SessionLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn open(
        &self,
        user_id: Uuid,
        role: Role,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, role, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(token_digest(token))
        .bind(user_id.to_string())
        .bind(role.as_str())
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AppError::conflict("session token already registered"))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn find(&self, token: &str) -> AppResult<Option<Session>> {
        let row = sqlx::query_as::<_, DbSession>(
            "SELECT user_id, role, expires_at FROM sessions WHERE token_hash = ?",
        )
        .bind(token_digest(token))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Session::try_from).transpose()
    }

    /// Deletes the entry. Returns whether one existed.
    pub async fn revoke(&self, token: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_digest(token))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn digest_is_stable_and_distinct() {
        assert_eq!(token_digest("abc"), token_digest("abc"));
        assert_ne!(token_digest("abc"), token_digest("abd"));
        assert_eq!(token_digest("abc").len(), 64);
    }

    #[test]
    fn expiry_is_inclusive_of_the_boundary() {
        let now = Utc::now();
        let session = Session {
            user_id: Uuid::new_v4(),
            role: Role::Crew,
            expires_at: now,
        };
        assert!(session.is_expired_at(now));
        assert!(!session.is_expired_at(now - Duration::seconds(1)));
    }
}
