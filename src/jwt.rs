use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::authz::Role;
use crate::errors::AppError;

const DEFAULT_EXP_MINUTES: i64 = 60;
const MAX_EXP_MINUTES: i64 = 60 * 24 * 365;

/// Signing key and token lifetime, loaded once at startup.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Arc<Vec<u8>>,
    pub ttl: Duration,
}

/// A freshly signed token together with the expiry embedded in it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl JwtConfig {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            ttl,
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| AppError::configuration("JWT_SECRET not set"))?;
        if secret.is_empty() {
            return Err(AppError::configuration("JWT_SECRET must not be empty"));
        }

        let exp_minutes = std::env::var("JWT_EXP_MINUTES")
            .map(|val| val.parse::<i64>())
            .unwrap_or(Ok(DEFAULT_EXP_MINUTES))
            .map_err(|_| AppError::configuration("JWT_EXP_MINUTES must be a valid integer"))?;

        Ok(Self::new(secret.into_bytes(), ttl_from_minutes(exp_minutes)?))
    }

    /// Issues a token with the configured lifetime.
    pub fn encode(&self, user_id: Uuid, email: &str, role: Role) -> Result<IssuedToken, AppError> {
        self.issue(user_id, email, role, self.ttl)
    }

    pub fn issue(&self, user_id: Uuid, email: &str, role: Role, ttl: Duration) -> Result<IssuedToken, AppError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::configuration("token lifetime is out of range"))?;

        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))
            .map_err(|err| AppError::internal(format!("failed to sign token: {err}")))?;

        Ok(IssuedToken {
            token,
            expires_at: claims.expires_at(),
        })
    }

    /// Checks signature, shape and embedded expiry. Consults no store.
    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|err| AppError::token(err.to_string()))
    }
}

fn ttl_from_minutes(minutes: i64) -> Result<Duration, AppError> {
    if !(1..=MAX_EXP_MINUTES).contains(&minutes) {
        return Err(AppError::configuration(format!(
            "JWT_EXP_MINUTES must be between 1 and {MAX_EXP_MINUTES}"
        )));
    }
    Ok(Duration::minutes(minutes))
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
    pub jti: Uuid,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}
