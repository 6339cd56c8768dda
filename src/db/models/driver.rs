//! Driver operational records.
//!
//! A driver row is created by an admin invitation and is distinct from the
//! user identity; `user_id` links the two once the placeholder account is
//! created, and `is_account_activated` flips when the driver sets a
//! password through the reset-token flow.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Driver {
    pub id: String,
    pub user_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub license_number: String,
    pub photo_url: Option<String>,
    pub is_active: bool,
    pub is_account_activated: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct InviteDriverRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub license_number: String,
}

#[derive(Debug, Serialize)]
pub struct InviteDriverResponse {
    pub driver: Driver,
    /// Set when email delivery is not configured, so the operator can
    /// forward the activation link manually.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation_url: Option<String>,
}
