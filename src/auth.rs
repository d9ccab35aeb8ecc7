use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::models::Admin;

/// Issued tokens are valid for this long.
pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminIdentity {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    username: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Access denied. No token provided.")]
    Missing,
    #[error("Token expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("password check task failed")]
    Task,
    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// HS256 signing and verification keys derived from one shared secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue_token(&self, identity: &AdminIdentity) -> Result<String, AuthError> {
        self.issue_token_with_ttl(identity, Duration::hours(TOKEN_TTL_HOURS))
    }

    pub fn issue_token_with_ttl(
        &self,
        identity: &AdminIdentity,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.id.clone(),
            username: identity.username.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify_token(&self, token: &str) -> Result<AdminIdentity, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| AdminIdentity {
                id: data.claims.sub,
                username: data.claims.username,
            })
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|_| AuthError::Task)?
        .map_err(AuthError::from)
}

/// Look up the admin and compare the password against the stored bcrypt hash.
/// Unknown usernames and wrong passwords are indistinguishable to the caller.
pub async fn verify_credentials(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<AdminIdentity, AuthError> {
    let admin: Option<Admin> = sqlx::query_as("SELECT * FROM admins WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    let Some(admin) = admin else {
        return Err(AuthError::InvalidCredentials);
    };

    let password = password.to_string();
    let hash = admin.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|_| AuthError::Task)?
        // A corrupt stored hash can't match anything.
        .unwrap_or(false);

    if !matches {
        return Err(AuthError::InvalidCredentials);
    }

    Ok(AdminIdentity {
        id: admin.id,
        username: admin.username,
    })
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Extractor guarding admin-only routes.
pub struct AuthAdmin(pub AdminIdentity);

impl<S> FromRequestParts<S> for AuthAdmin
where
    JwtKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = TokenError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(TokenError::Missing)?;
        let keys = JwtKeys::from_ref(state);
        keys.verify_token(token).map(AuthAdmin)
    }
}

impl IntoResponse for TokenError {
    fn into_response(self) -> Response {
        let status = match self {
            TokenError::Missing | TokenError::Expired => StatusCode::UNAUTHORIZED,
            TokenError::Invalid => StatusCode::FORBIDDEN,
        };
        (
            status,
            Json(json!({ "success": false, "error": self.to_string() })),
        )
            .into_response()
    }
}
