//! Ride request endpoints.
//!
//! Creation is a passenger action; the pending feed, acceptance, start and
//! completion are driver actions; cancellation belongs to the owning
//! passenger or an admin. All state decisions live in the matching engine;
//! these handlers only authenticate, validate input and translate errors.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::{CreateRideRequest, PendingRide, RideRequest, User};
use crate::geofence::Point;
use crate::AppState;

use super::auth::require_driver;
use super::error::ApiError;
use super::validation::validate_coordinates;

/// Create a pickup request for the calling passenger
pub async fn create_ride(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<CreateRideRequest>,
) -> Result<(StatusCode, Json<RideRequest>), ApiError> {
    if !user.is_passenger() {
        return Err(ApiError::forbidden("Only passengers can request pickups"));
    }
    if let Err(e) = validate_coordinates(request.pickup_lat, request.pickup_lng) {
        return Err(ApiError::validation_field("pickup", e));
    }

    let ride = state
        .dispatch
        .create_request(
            &user.id,
            Point::new(request.pickup_lat, request.pickup_lng),
            request.pickup_address.as_deref(),
        )
        .await?;

    tracing::info!(ride = %ride.id, passenger = %user.id, "Ride request created");
    Ok((StatusCode::CREATED, Json(ride)))
}

/// Pending requests for the driver feed, oldest first
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<PendingRide>>, ApiError> {
    require_driver(&user)?;
    let pending = state.dispatch.list_pending().await?;
    Ok(Json(pending))
}

/// The calling passenger's open request, if any
pub async fn active_ride(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Option<RideRequest>>, ApiError> {
    let active = state.dispatch.find_active_for_passenger(&user.id).await?;
    Ok(Json(active))
}

/// The calling driver's current accepted or in-progress ride, if any
pub async fn current_ride_for_driver(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Option<RideRequest>>, ApiError> {
    require_driver(&user)?;
    let active = state.dispatch.find_active_for_driver(&user.id).await?;
    Ok(Json(active))
}

/// Claim a pending request. Losing the race is an ordinary conflict.
pub async fn accept_ride(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<RideRequest>, ApiError> {
    require_driver(&user)?;
    let ride = state.dispatch.accept_request(&id, &user.id).await?;
    tracing::info!(ride = %ride.id, driver = %user.id, "Ride request accepted");
    Ok(Json(ride))
}

/// Mark an accepted ride as underway
pub async fn start_ride(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<RideRequest>, ApiError> {
    require_driver(&user)?;
    let ride = state.dispatch.start_ride(&id, &user.id).await?;
    Ok(Json(ride))
}

/// Finish a ride
pub async fn complete_ride(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<RideRequest>, ApiError> {
    let ride = state.dispatch.complete_request(&id, &user).await?;
    tracing::info!(ride = %ride.id, "Ride completed");
    Ok(Json(ride))
}

/// Cancel a request (owning passenger or admin)
pub async fn cancel_ride(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<RideRequest>, ApiError> {
    let ride = state.dispatch.cancel_request(&id, &user).await?;
    tracing::info!(ride = %ride.id, by = %user.id, "Ride request cancelled");
    Ok(Json(ride))
}
