//! Session issuance, resolution and revocation.
//!
//! Sessions are opaque bearer tokens with a fixed TTL. Expiry is checked
//! lazily with an `expires_at > now` predicate at lookup time; there is no
//! background sweep. A lookup miss and an expired session are
//! indistinguishable to callers.

use chrono::{Duration, Utc};
use uuid::Uuid;

use super::{generate_token, hash_password, hash_token, verify_password, AuthError};
use crate::db::{DbPool, NewUser, Session, User};
use crate::directory::IdentityDirectory;

/// Result of a successful sign-in or sign-up: the user, the persisted
/// session row, and the raw token the client stores.
#[derive(Debug)]
pub struct SignedIn {
    pub user: User,
    pub session: Session,
    pub token: String,
}

#[derive(Clone)]
pub struct SessionManager {
    db: DbPool,
    directory: IdentityDirectory,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(db: DbPool, ttl_days: i64) -> Self {
        Self {
            directory: IdentityDirectory::new(db.clone()),
            db,
            ttl: Duration::days(ttl_days),
        }
    }

    /// Create a new session for a user. Existing sessions are left alone;
    /// one user may hold several concurrent sessions (multi-device).
    pub async fn create_session(&self, user_id: &str) -> Result<(Session, String), AuthError> {
        let token = generate_token();
        let token_hash = hash_token(&token);
        let now = Utc::now();
        let expires_at = (now + self.ttl).to_rfc3339();
        let created_at = now.to_rfc3339();
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(&token_hash)
        .bind(&expires_at)
        .bind(&created_at)
        .execute(&self.db)
        .await?;

        let session = Session {
            id,
            user_id: user_id.to_string(),
            token_hash,
            expires_at,
            created_at,
        };
        Ok((session, token))
    }

    /// Look up a non-expired session by raw token. Fails closed: unknown
    /// token and expired session both resolve to `None`.
    pub async fn resolve_session(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let token_hash = hash_token(token);
        let now = Utc::now().to_rfc3339();

        let session: Option<Session> = sqlx::query_as(
            "SELECT * FROM sessions WHERE token_hash = ? AND expires_at > ?",
        )
        .bind(&token_hash)
        .bind(&now)
        .fetch_optional(&self.db)
        .await?;

        Ok(session)
    }

    /// Resolve a token to its owning user. Sessions of deactivated users
    /// resolve to `None`.
    pub async fn resolve_user(&self, token: &str) -> Result<Option<User>, AuthError> {
        let session = match self.resolve_session(token).await? {
            Some(s) => s,
            None => return Ok(None),
        };

        let user = self.directory.find_by_id(&session.user_id).await?;
        Ok(user.filter(|u| u.is_active))
    }

    /// Delete a session by raw token. Idempotent: revoking an unknown or
    /// already-revoked token is not an error.
    pub async fn revoke_session(&self, token: &str) -> Result<(), AuthError> {
        let token_hash = hash_token(token);
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(&token_hash)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Delete every session belonging to a user, e.g. when the account is
    /// deactivated.
    pub async fn revoke_sessions_for_user(&self, user_id: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Authenticate by email and password. Unknown email, wrong password
    /// and deactivated account all return `InvalidCredentials`.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AuthError> {
        let user = self.directory.find_by_email(email).await?;

        let user = match user {
            Some(u) if u.is_active => u,
            _ => return Err(AuthError::InvalidCredentials),
        };

        if !verify_password(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let (session, token) = self.create_session(&user.id).await?;
        Ok(SignedIn {
            user,
            session,
            token,
        })
    }

    /// Register a new account and sign it in. The role defaults to the
    /// least-privileged one unless the caller sets it explicitly.
    pub async fn sign_up(&self, new_user: NewUser) -> Result<SignedIn, AuthError> {
        let user = match self.directory.create(new_user).await {
            Ok(u) => u,
            Err(e) if is_unique_violation(&e) => return Err(AuthError::DuplicateIdentity),
            Err(e) => return Err(e.into()),
        };

        let (session, token) = self.create_session(&user.id).await?;
        Ok(SignedIn {
            user,
            session,
            token,
        })
    }
}

/// Hash a plaintext password for storage, mapping hasher failures into the
/// auth error space.
pub fn hash_new_password(password: &str) -> Result<String, AuthError> {
    hash_password(password).map_err(|_| AuthError::Hashing)
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err)
        if db_err.message().contains("UNIQUE constraint failed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::roles;
    use crate::db::test_support::test_pool;

    async fn manager() -> (SessionManager, crate::db::DbPool, tempfile::TempDir) {
        let (pool, dir) = test_pool().await;
        (SessionManager::new(pool.clone(), 30), pool, dir)
    }

    fn registration(email: &str, password: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: hash_new_password(password).unwrap(),
            first_name: Some("Awa".to_string()),
            last_name: Some("Diop".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let (sessions, _pool, _dir) = manager().await;

        let signed_up = sessions
            .sign_up(registration("awa@example.com", "s3cret-pass"))
            .await
            .unwrap();
        assert_eq!(signed_up.user.role, roles::PASSENGER);

        let signed_in = sessions
            .sign_in("awa@example.com", "s3cret-pass")
            .await
            .unwrap();
        assert_eq!(signed_in.user.id, signed_up.user.id);
        assert_ne!(signed_in.token, signed_up.token);
    }

    #[tokio::test]
    async fn test_sign_in_failures_are_uniform() {
        let (sessions, _pool, _dir) = manager().await;
        sessions
            .sign_up(registration("awa@example.com", "s3cret-pass"))
            .await
            .unwrap();

        // Wrong password and unknown email must be the same outcome
        let wrong_password = sessions.sign_in("awa@example.com", "nope").await;
        let unknown_email = sessions.sign_in("ghost@example.com", "nope").await;
        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown_email, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (sessions, _pool, _dir) = manager().await;
        sessions
            .sign_up(registration("awa@example.com", "first"))
            .await
            .unwrap();

        let second = sessions
            .sign_up(registration("awa@example.com", "second"))
            .await;
        assert!(matches!(second, Err(AuthError::DuplicateIdentity)));
    }

    #[tokio::test]
    async fn test_resolve_and_revoke() {
        let (sessions, _pool, _dir) = manager().await;
        let signed = sessions
            .sign_up(registration("awa@example.com", "s3cret-pass"))
            .await
            .unwrap();

        let user = sessions.resolve_user(&signed.token).await.unwrap();
        assert_eq!(user.unwrap().id, signed.user.id);

        sessions.revoke_session(&signed.token).await.unwrap();
        assert!(sessions.resolve_session(&signed.token).await.unwrap().is_none());

        // Revoking again is fine
        sessions.revoke_session(&signed.token).await.unwrap();
    }

    #[tokio::test]
    async fn test_garbage_token_resolves_to_none() {
        let (sessions, _pool, _dir) = manager().await;
        assert!(sessions.resolve_session("not-a-token").await.unwrap().is_none());
        assert!(sessions.resolve_user("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expiry_window() {
        let (sessions, pool, _dir) = manager().await;
        let signed = sessions
            .sign_up(registration("awa@example.com", "s3cret-pass"))
            .await
            .unwrap();

        // 29 days in: still valid
        let not_yet = (Utc::now() + Duration::days(1)).to_rfc3339();
        sqlx::query("UPDATE sessions SET expires_at = ? WHERE id = ?")
            .bind(&not_yet)
            .bind(&signed.session.id)
            .execute(&pool)
            .await
            .unwrap();
        assert!(sessions.resolve_session(&signed.token).await.unwrap().is_some());

        // Past the TTL: treated as no session
        let past = (Utc::now() - Duration::days(1)).to_rfc3339();
        sqlx::query("UPDATE sessions SET expires_at = ? WHERE id = ?")
            .bind(&past)
            .bind(&signed.session.id)
            .execute(&pool)
            .await
            .unwrap();
        assert!(sessions.resolve_session(&signed.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deactivated_user_fails_resolution() {
        let (sessions, pool, _dir) = manager().await;
        let signed = sessions
            .sign_up(registration("awa@example.com", "s3cret-pass"))
            .await
            .unwrap();

        sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?")
            .bind(&signed.user.id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(sessions.resolve_user(&signed.token).await.unwrap().is_none());
        assert!(matches!(
            sessions.sign_in("awa@example.com", "s3cret-pass").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_multiple_concurrent_sessions() {
        let (sessions, _pool, _dir) = manager().await;
        let signed = sessions
            .sign_up(registration("awa@example.com", "s3cret-pass"))
            .await
            .unwrap();

        let (_, second_token) = sessions.create_session(&signed.user.id).await.unwrap();
        // Both devices stay signed in
        assert!(sessions.resolve_user(&signed.token).await.unwrap().is_some());
        assert!(sessions.resolve_user(&second_token).await.unwrap().is_some());

        sessions.revoke_sessions_for_user(&signed.user.id).await.unwrap();
        assert!(sessions.resolve_user(&signed.token).await.unwrap().is_none());
        assert!(sessions.resolve_user(&second_token).await.unwrap().is_none());
    }
}
