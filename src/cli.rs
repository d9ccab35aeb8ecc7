use sqlx::SqlitePool;

use crate::auth::{AuthError, hash_password};
use crate::models::Admin;

async fn admin_exists(pool: &SqlitePool, username: &str) -> Result<bool, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admins WHERE username = ?")
        .bind(username)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

async fn insert_admin(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    cost: u32,
) -> Result<Admin, AuthError> {
    let hash = hash_password(password, cost).await?;
    let admin = Admin::new(username.to_string(), hash);

    sqlx::query("INSERT INTO admins (id, username, password_hash, created_at) VALUES (?, ?, ?, ?)")
        .bind(&admin.id)
        .bind(&admin.username)
        .bind(&admin.password_hash)
        .bind(&admin.created_at)
        .execute(pool)
        .await?;

    Ok(admin)
}

/// Create the configured admin unless one with that username already exists.
/// Returns whether a row was inserted.
pub async fn seed_admin(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    cost: u32,
) -> Result<bool, AuthError> {
    if admin_exists(pool, username).await? {
        tracing::debug!(username, "admin already present, skipping seed");
        return Ok(false);
    }

    insert_admin(pool, username, password, cost).await?;
    tracing::info!(username, "seeded admin account");
    Ok(true)
}

/// `revive create-admin <username> <password>`
pub async fn create_admin(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    cost: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    if username.trim().is_empty() || password.is_empty() {
        return Err("Username and password are required".into());
    }
    if admin_exists(pool, username).await? {
        return Err(format!("Admin '{}' already exists", username).into());
    }

    let admin = insert_admin(pool, username, password, cost).await?;

    println!("Created admin:");
    println!("  ID: {}", admin.id);
    println!("  Username: {}", admin.username);

    Ok(())
}
