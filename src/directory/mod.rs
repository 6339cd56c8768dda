//! Identity directory: lookup and mutation of user and driver records.
//!
//! No business rules live here; the session, reset and dispatch components
//! use it to stay decoupled from storage details. Accounts are never
//! physically deleted while ride history references them; removal means
//! `is_active = 0`.

use chrono::Utc;
use uuid::Uuid;

use crate::auth;
use crate::db::{roles, DbPool, Driver, NewUser, User, UserPatch};

#[derive(Clone)]
pub struct IdentityDirectory {
    db: DbPool,
}

impl IdentityDirectory {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.db)
            .await
    }

    /// Insert a user record. The role falls back to the least-privileged
    /// one when unset. Uniqueness of the email is enforced by the store.
    pub async fn create(&self, new_user: NewUser) -> Result<User, sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let role = new_user.role.unwrap_or_else(|| roles::PASSENGER.to_string());
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, phone, role, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.phone)
        .bind(&role)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await?;

        sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(&id)
            .fetch_one(&self.db)
            .await
    }

    /// Merge-patch update: only fields present in the patch are applied,
    /// everything else is left untouched.
    pub async fn update(&self, id: &str, patch: UserPatch) -> Result<Option<User>, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE users SET
                 first_name = COALESCE(?, first_name),
                 last_name = COALESCE(?, last_name),
                 phone = COALESCE(?, phone),
                 address = COALESCE(?, address),
                 avatar_url = COALESCE(?, avatar_url),
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(&patch.first_name)
        .bind(&patch.last_name)
        .bind(&patch.phone)
        .bind(&patch.address)
        .bind(&patch.avatar_url)
        .bind(&now)
        .bind(id)
        .execute(&self.db)
        .await?;

        self.find_by_id(id).await
    }

    /// Soft-delete an account. Live sessions are expected to be revoked by
    /// the caller through the session manager.
    pub async fn deactivate(&self, id: &str) -> Result<bool, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE users SET is_active = 0, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_drivers(&self) -> Result<Vec<Driver>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM drivers ORDER BY created_at DESC")
            .fetch_all(&self.db)
            .await
    }

    pub async fn find_driver(&self, id: &str) -> Result<Option<Driver>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM drivers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await
    }

    /// Create a driver record plus its placeholder user account. The
    /// account gets an unguessable random credential; the driver signs in
    /// for the first time by setting a password through a reset token
    /// issued against this email.
    pub async fn invite_driver(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        phone: Option<&str>,
        license_number: &str,
    ) -> Result<Driver, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let user_id = Uuid::new_v4().to_string();
        let driver_id = Uuid::new_v4().to_string();
        // Placeholder credential: random and never disclosed, so the
        // account is unusable until the reset flow replaces it
        let placeholder_hash = format!("invited:{}", auth::hash_token(&auth::generate_token()));

        let mut tx = self.db.begin().await?;

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, phone, role, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user_id)
        .bind(email)
        .bind(&placeholder_hash)
        .bind(first_name)
        .bind(last_name)
        .bind(phone)
        .bind(roles::DRIVER)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO drivers (id, user_id, first_name, last_name, email, phone, license_number, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&driver_id)
        .bind(&user_id)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .bind(phone)
        .bind(license_number)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let driver: Driver = sqlx::query_as("SELECT * FROM drivers WHERE id = ?")
            .bind(&driver_id)
            .fetch_one(&self.db)
            .await?;
        Ok(driver)
    }

    /// Soft-delete a driver and its linked user account. Returns the
    /// deactivated record, or `None` when no such driver exists; the
    /// caller is expected to revoke the linked user's sessions.
    pub async fn deactivate_driver(&self, driver_id: &str) -> Result<Option<Driver>, sqlx::Error> {
        let driver: Option<Driver> = self.find_driver(driver_id).await?;
        let driver = match driver {
            Some(d) => d,
            None => return Ok(None),
        };

        let now = Utc::now().to_rfc3339();
        let mut tx = self.db.begin().await?;

        sqlx::query("UPDATE drivers SET is_active = 0, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(driver_id)
            .execute(&mut *tx)
            .await?;

        if let Some(user_id) = &driver.user_id {
            sqlx::query("UPDATE users SET is_active = 0, updated_at = ? WHERE id = ?")
                .bind(&now)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(Some(driver))
    }
}
