pub mod auth;
mod drivers;
pub mod error;
mod rate_limit;
mod rides;
mod validation;

pub use rate_limit::AuthRateLimiter;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Account routes; login/signup/forgot are public, the rest
    // authenticate through the User extractor
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/signup", post(auth::signup))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/profile", patch(auth::update_profile))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/change-password", post(auth::change_password));

    let ride_routes = Router::new()
        .route("/", post(rides::create_ride))
        .route("/pending", get(rides::list_pending))
        .route("/active", get(rides::active_ride))
        .route("/assigned", get(rides::current_ride_for_driver))
        .route("/:id/accept", post(rides::accept_ride))
        .route("/:id/start", post(rides::start_ride))
        .route("/:id/complete", post(rides::complete_ride))
        .route("/:id/cancel", post(rides::cancel_ride));

    let driver_routes = Router::new()
        .route("/", get(drivers::list_drivers))
        .route("/invite", post(drivers::invite_driver))
        .route("/:id/reinvite", post(drivers::reinvite_driver))
        .route("/:id", delete(drivers::remove_driver));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api/rides", ride_routes)
        .nest("/api/drivers", driver_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
