//! Startup seed data.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

use crate::auth;
use crate::db::roles;

/// Ensure a bootstrap admin account exists. Runs on every startup and is a
/// no-op once any admin user is present.
pub async fn seed_admin_user(pool: &SqlitePool, email: &str, password: &str) -> Result<()> {
    let existing: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = ?")
        .bind(roles::ADMIN)
        .fetch_one(pool)
        .await?;
    if existing.0 > 0 {
        return Ok(());
    }

    let id = uuid::Uuid::new_v4().to_string();
    let password_hash = auth::hash_password(password)
        .map_err(|e| anyhow::anyhow!("failed to hash admin password: {e}"))?;
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO users (id, email, password_hash, role, is_active, email_verified, created_at, updated_at)
         VALUES (?, ?, ?, ?, 1, 1, ?, ?)",
    )
    .bind(&id)
    .bind(email)
    .bind(&password_hash)
    .bind(roles::ADMIN)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    info!("Created bootstrap admin user {}", email);
    Ok(())
}
