//! Ride request models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled requests admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for RideStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => Self::Pending,
            "accepted" => Self::Accepted,
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RideRequest {
    pub id: String,
    pub passenger_id: String,
    pub driver_id: Option<String>,
    pub status: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub pickup_address: Option<String>,
    pub destination_lat: Option<f64>,
    pub destination_lng: Option<f64>,
    pub destination_address: Option<String>,
    pub accepted_at: Option<String>,
    pub completed_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl RideRequest {
    pub fn status_enum(&self) -> RideStatus {
        RideStatus::from(self.status.clone())
    }
}

/// A pending request as shown to drivers: the row plus enough passenger
/// profile data for display.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PendingRide {
    pub id: String,
    pub passenger_id: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub pickup_address: Option<String>,
    pub created_at: String,
    pub passenger_first_name: Option<String>,
    pub passenger_last_name: Option<String>,
    pub passenger_avatar: Option<String>,
    /// Seconds since the request was created, computed at read time
    #[sqlx(default)]
    pub wait_seconds: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateRideRequest {
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub pickup_address: Option<String>,
}
