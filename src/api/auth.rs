//! Authentication and account endpoints.
//!
//! The session token travels in an httpOnly cookie (set on login/sign-up)
//! with a bearer-header fallback for non-browser clients. Every protected
//! handler authenticates through the `User` extractor below.

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::AuthError;
use crate::db::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse, NewUser,
    ResetPasswordRequest, SignUpRequest, User, UserPatch, UserResponse,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::rate_limit::client_key;
use super::validation::{validate_email, validate_name, validate_password};

/// Cookie carrying the session token
pub const SESSION_COOKIE: &str = "session_token";

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn session_cookie(token: String, ttl_days: i64, secure: bool) -> Cookie<'static> {
    let mut c = Cookie::new(SESSION_COOKIE, token);
    c.set_path("/");
    c.set_http_only(true);
    c.set_same_site(SameSite::Lax);
    c.set_secure(secure);
    c.set_max_age(cookie::time::Duration::days(ttl_days));
    c
}

fn removal_cookie() -> Cookie<'static> {
    let mut c = Cookie::from(SESSION_COOKIE);
    c.set_path("/");
    c
}

/// Pull the session token from the Authorization header or the session
/// cookie.
fn extract_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization").and_then(|h| h.to_str().ok()) {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    if !state.rate_limiter.check(&client_key(&headers)) {
        return Err(ApiError::rate_limited("Too many attempts, try again later"));
    }

    let signed = state
        .sessions
        .sign_in(&request.email, &request.password)
        .await?;

    let jar = jar.add(session_cookie(
        signed.token.clone(),
        state.config.auth.session_ttl_days,
        state.config.auth.secure_cookies,
    ));

    Ok((
        jar,
        Json(LoginResponse {
            token: signed.token,
            user: UserResponse::from(signed.user),
        }),
    ))
}

/// Passenger self-registration
pub async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(request): Json<SignUpRequest>,
) -> Result<(CookieJar, (StatusCode, Json<LoginResponse>)), ApiError> {
    if !state.rate_limiter.check(&client_key(&headers)) {
        return Err(ApiError::rate_limited("Too many attempts, try again later"));
    }

    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_email(&request.email) {
        errors.add("email", e);
    }
    if let Err(e) = validate_password(&request.password) {
        errors.add("password", e);
    }
    if let Err(e) = validate_name(&request.first_name, "first_name") {
        errors.add("first_name", e);
    }
    if let Err(e) = validate_name(&request.last_name, "last_name") {
        errors.add("last_name", e);
    }
    errors.finish()?;

    let password_hash = crate::auth::sessions::hash_new_password(&request.password)?;
    let signed = state
        .sessions
        .sign_up(NewUser {
            email: request.email,
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            phone: request.phone,
            role: None,
        })
        .await?;

    tracing::info!("New passenger account: {}", signed.user.email);

    let jar = jar.add(session_cookie(
        signed.token.clone(),
        state.config.auth.session_ttl_days,
        state.config.auth.secure_cookies,
    ));

    Ok((
        jar,
        (
            StatusCode::CREATED,
            Json(LoginResponse {
                token: signed.token,
                user: UserResponse::from(signed.user),
            }),
        ),
    ))
}

/// Logout: revoke the session and clear the cookie. Idempotent.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, StatusCode), ApiError> {
    if let Some(token) = extract_token(&headers, &jar) {
        state.sessions.revoke_session(&token).await?;
    }
    Ok((jar.remove(removal_cookie()), StatusCode::NO_CONTENT))
}

/// Current authenticated user
pub async fn me(user: User) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// Update the caller's own profile (merge-patch)
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(patch): Json<UserPatch>,
) -> Result<Json<UserResponse>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_name(&patch.first_name, "first_name") {
        errors.add("first_name", e);
    }
    if let Err(e) = validate_name(&patch.last_name, "last_name") {
        errors.add("last_name", e);
    }
    errors.finish()?;

    let updated = state
        .directory
        .update(&user.id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserResponse::from(updated)))
}

/// Request a password reset link. Always answers the same way so the
/// endpoint cannot be used to probe which emails exist.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.rate_limiter.check(&client_key(&headers)) {
        return Err(ApiError::rate_limited("Too many attempts, try again later"));
    }

    if let Some(token) = state.resets.issue_token(&request.email).await? {
        let url = state.mailer.reset_url(&token);
        state
            .mailer
            .send_password_reset(
                &request.email,
                &url,
                state.config.auth.reset_token_ttl_minutes,
            )
            .await;
    }

    Ok(Json(MessageResponse {
        message: "If the address exists, a reset link has been sent".to_string(),
    }))
}

/// Redeem a reset token and set a new password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Err(e) = validate_password(&request.password) {
        return Err(ApiError::validation_field("password", e));
    }

    state
        .resets
        .redeem_token(&request.token, &request.password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password updated".to_string(),
    }))
}

/// Change the password of the authenticated user, with proof of the
/// current one
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Err(e) = validate_password(&request.new_password) {
        return Err(ApiError::validation_field("new_password", e));
    }

    state
        .resets
        .change_password(&user.id, &request.current_password, &request.new_password)
        .await
        .map_err(|e| match e {
            AuthError::InvalidCredentials => {
                ApiError::bad_request("Current password is incorrect")
            }
            other => ApiError::from(other),
        })?;

    Ok(Json(MessageResponse {
        message: "Password updated".to_string(),
    }))
}

/// Require the admin role
pub fn require_admin(user: &User) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Administrator access required"))
    }
}

/// Require the driver role (admins pass too)
pub fn require_driver(user: &User) -> Result<(), ApiError> {
    if user.is_driver() || user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Driver access required"))
    }
}

/// Extractor for the current authenticated user. Any resolution failure is
/// reported uniformly.
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = extract_token(&parts.headers, &jar)
            .ok_or_else(|| ApiError::unauthorized("Session expired or invalid"))?;

        state
            .sessions
            .resolve_user(&token)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Session expired or invalid"))
    }
}
