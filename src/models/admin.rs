use chrono::Utc;
use sqlx::FromRow;
use uuid::Uuid;

/// Stored admin account. Responses carry [`crate::auth::AdminIdentity`] instead.
#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: String,
}

impl Admin {
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            password_hash,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}
