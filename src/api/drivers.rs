//! Driver administration endpoints.
//!
//! Admins invite drivers by email; the invitation creates the operational
//! record plus a placeholder account and sends a set-password activation
//! link (a reset token). Removal is a soft-delete that also severs the
//! driver's live sessions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::{Driver, InviteDriverRequest, InviteDriverResponse, User};
use crate::AppState;

use super::auth::require_admin;
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::validate_email;

/// List all driver records
pub async fn list_drivers(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<Driver>>, ApiError> {
    require_admin(&user)?;
    let drivers = state.directory.list_drivers().await?;
    Ok(Json(drivers))
}

/// Invite a new driver
pub async fn invite_driver(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<InviteDriverRequest>,
) -> Result<(StatusCode, Json<InviteDriverResponse>), ApiError> {
    require_admin(&user)?;

    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_email(&request.email) {
        errors.add("email", e);
    }
    if request.first_name.is_empty() {
        errors.add("first_name", "First name is required");
    }
    if request.last_name.is_empty() {
        errors.add("last_name", "Last name is required");
    }
    if request.license_number.is_empty() {
        errors.add("license_number", "License number is required");
    }
    errors.finish()?;

    let driver = state
        .directory
        .invite_driver(
            &request.email,
            &request.first_name,
            &request.last_name,
            request.phone.as_deref(),
            &request.license_number,
        )
        .await?;

    let activation_url = send_activation(&state, &driver).await?;
    tracing::info!(driver = %driver.id, "Driver invited: {}", driver.email);

    Ok((
        StatusCode::CREATED,
        Json(InviteDriverResponse {
            driver,
            activation_url,
        }),
    ))
}

/// Resend the activation link for a driver who has not set a password yet
pub async fn reinvite_driver(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<InviteDriverResponse>, ApiError> {
    require_admin(&user)?;

    let driver = state
        .directory
        .find_driver(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Driver not found"))?;
    if driver.is_account_activated {
        return Err(ApiError::conflict("Driver account is already activated"));
    }

    let activation_url = send_activation(&state, &driver).await?;
    Ok(Json(InviteDriverResponse {
        driver,
        activation_url,
    }))
}

/// Deactivate a driver: soft-delete the records and revoke live sessions
pub async fn remove_driver(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&user)?;

    let driver = state
        .directory
        .deactivate_driver(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Driver not found"))?;

    if let Some(user_id) = &driver.user_id {
        state.sessions.revoke_sessions_for_user(user_id).await?;
    }
    tracing::info!(driver = %id, "Driver deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// Issue an activation token for the driver's linked account and send the
/// set-password link. When email is not configured the link is returned so
/// the operator can forward it.
async fn send_activation(
    state: &Arc<AppState>,
    driver: &Driver,
) -> Result<Option<String>, ApiError> {
    let token = state
        .resets
        .issue_token(&driver.email)
        .await?
        .ok_or_else(|| ApiError::internal("Driver account is missing or inactive"))?;

    let url = state.mailer.activation_url(&token);
    state
        .mailer
        .send_driver_invitation(&driver.email, &driver.first_name, &url)
        .await;

    Ok(if state.mailer.is_enabled() {
        None
    } else {
        Some(url)
    })
}
