//! Password hashing and bearer tokens.
//!
//! Students and teachers sign with different secrets, so a token minted for
//! one role never validates as the other.

use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

pub const STUDENT_TOKEN_TTL_DAYS: i64 = 7;
pub const TEACHER_TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

/// JWT payload shared by both roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

#[derive(Clone)]
pub struct AuthSettings {
    pub student_secret: String,
    pub teacher_secret: String,
    pub student_ttl: Duration,
    pub teacher_ttl: Duration,
    pub bcrypt_cost: u32,
}

impl AuthSettings {
    #[must_use]
    pub fn new(student_secret: impl Into<String>, teacher_secret: impl Into<String>) -> Self {
        Self {
            student_secret: student_secret.into(),
            teacher_secret: teacher_secret.into(),
            student_ttl: Duration::days(STUDENT_TOKEN_TTL_DAYS),
            teacher_ttl: Duration::hours(TEACHER_TOKEN_TTL_HOURS),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    #[must_use]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("student_secret", &"<redacted>")
            .field("teacher_secret", &"<redacted>")
            .field("student_ttl", &self.student_ttl)
            .field("teacher_ttl", &self.teacher_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

//
// ─── PASSWORDS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    #[must_use]
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Runs on the blocking pool, off the async workers.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Hash` if bcrypt rejects the cost or input, or
    /// `AuthError::Blocking` if the worker task dies.
    pub async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let cost = self.cost;
        let password = password.to_owned();
        let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await?;
        Ok(hashed?)
    }

    /// # Errors
    ///
    /// Returns `AuthError::Hash` if the stored hash is malformed, or
    /// `AuthError::Blocking` if the worker task dies.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        let matched = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await?;
        Ok(matched?)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

//
// ─── TOKENS ────────────────────────────────────────────────────────────────────
//

struct RoleKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl RoleKeys {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

/// Issues and validates HS256 tokens. Expiry is always checked against the
/// wall clock.
pub struct TokenIssuer {
    student: RoleKeys,
    teacher: RoleKeys,
    validation: Validation,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(settings: &AuthSettings) -> Self {
        Self {
            student: RoleKeys::new(&settings.student_secret, settings.student_ttl),
            teacher: RoleKeys::new(&settings.teacher_secret, settings.teacher_ttl),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    fn keys(&self, role: Role) -> &RoleKeys {
        match role {
            Role::Student => &self.student,
            Role::Teacher => &self.teacher,
        }
    }

    /// # Errors
    ///
    /// Returns `AuthError::Signing` if encoding fails.
    pub fn issue(&self, role: Role, id: i64, username: &str) -> Result<String, AuthError> {
        let keys = self.keys(role);
        let now = Utc::now();
        let claims = Claims {
            sub: id,
            username: username.to_owned(),
            role,
            iat: now.timestamp(),
            exp: (now + keys.ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(AuthError::Signing)
    }

    /// Decodes `token` with the secret for `role`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for bad signatures, expired tokens,
    /// or a role mismatch.
    pub fn verify(&self, token: &str, role: Role) -> Result<Claims, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.keys(role).decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, ?role, "token rejected");
                AuthError::InvalidToken
            })?;
        if data.claims.role != role {
            return Err(AuthError::InvalidToken);
        }
        Ok(data.claims)
    }
}
