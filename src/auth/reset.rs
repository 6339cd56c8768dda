//! Password reset tokens and password changes.
//!
//! A reset token is a one-shot capability: redeeming it replaces the
//! user's credential without knowledge of the old password. The
//! check-and-mark step is a single conditional UPDATE inside a
//! transaction, so two racing redemptions of the same token produce
//! exactly one success.

use chrono::{Duration, Utc};
use uuid::Uuid;

use super::{generate_token, hash_token, sessions::hash_new_password, verify_password, AuthError};
use crate::db::{DbPool, PasswordResetToken};

#[derive(Clone)]
pub struct PasswordResetManager {
    db: DbPool,
    ttl: Duration,
}

impl PasswordResetManager {
    pub fn new(db: DbPool, ttl_minutes: i64) -> Self {
        Self {
            db,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Issue a reset token for the account behind `email`. Returns `None`
    /// for unknown or deactivated accounts; callers must not expose that
    /// distinction. Outstanding unredeemed tokens for the same user are
    /// invalidated, leaving at most one live token per user.
    pub async fn issue_token(&self, email: &str) -> Result<Option<String>, AuthError> {
        let user: Option<(String,)> =
            sqlx::query_as("SELECT id FROM users WHERE email = ? AND is_active = 1")
                .bind(email)
                .fetch_optional(&self.db)
                .await?;

        let (user_id,) = match user {
            Some(row) => row,
            None => return Ok(None),
        };

        let token = generate_token();
        let token_hash = hash_token(&token);
        let now = Utc::now();

        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = ? AND used = 0")
            .bind(&user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO password_reset_tokens (id, user_id, token_hash, expires_at, used, created_at)
             VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&user_id)
        .bind(&token_hash)
        .bind((now + self.ttl).to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(token))
    }

    /// Redeem a reset token and set a new password. Fails with
    /// `TokenExpiredOrUsed` when the token is unknown, expired or already
    /// redeemed; no partial mutation occurs on failure.
    pub async fn redeem_token(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        let token_hash = hash_token(token);
        let password_hash = hash_new_password(new_password)?;
        let now = Utc::now().to_rfc3339();

        let mut tx = self.db.begin().await?;

        // Atomic check-and-mark: only one racing redemption can flip `used`
        let marked = sqlx::query(
            "UPDATE password_reset_tokens SET used = 1
             WHERE token_hash = ? AND used = 0 AND expires_at > ?",
        )
        .bind(&token_hash)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        if marked.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AuthError::TokenExpiredOrUsed);
        }

        let consumed: PasswordResetToken =
            sqlx::query_as("SELECT * FROM password_reset_tokens WHERE token_hash = ?")
                .bind(&token_hash)
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(&password_hash)
            .bind(&now)
            .bind(&consumed.user_id)
            .execute(&mut *tx)
            .await?;

        // Setting a password through the invitation link activates the
        // linked driver record, if any
        sqlx::query(
            "UPDATE drivers SET is_account_activated = 1, updated_at = ? WHERE user_id = ?",
        )
        .bind(&now)
        .bind(&consumed.user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Change a password with proof of the current one. Unlike the token
    /// flow this requires the caller to already be authenticated.
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let stored: Option<(String,)> =
            sqlx::query_as("SELECT password_hash FROM users WHERE id = ? AND is_active = 1")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;

        let (password_hash,) = stored.ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(current_password, &password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let new_hash = hash_new_password(new_password)?;
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(&new_hash)
            .bind(Utc::now().to_rfc3339())
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }
}
