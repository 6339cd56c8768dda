//! Ride request matching engine.
//!
//! The state machine is `pending → accepted → in_progress → completed`,
//! with `cancelled` reachable from `pending` and `accepted`. Completed and
//! cancelled are terminal. Every transition is a single conditional UPDATE
//! keyed on the current status, checked through `rows_affected()`, so
//! concurrent callers racing on the same row produce exactly one winner.
//! Multiple service instances may share the store with no in-process
//! coordination.

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{DbPool, PendingRide, RideRequest, User};
use crate::geofence::{is_inside_service_area, Point};

/// Statuses that count as an open request for the one-per-passenger rule
const ACTIVE_STATUSES: &str = "'pending', 'accepted', 'in_progress'";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("passenger already has an active ride request")]
    ActiveRequestExists,
    #[error("pickup location is outside the service area")]
    OutsideServiceArea,
    /// The request is no longer pending: another driver won the race, or
    /// it was cancelled or never existed. Callers must not assume which.
    #[error("ride request was already taken")]
    AlreadyTaken,
    #[error("ride request not found")]
    NotFound,
    #[error("not allowed to act on this ride request")]
    Forbidden,
    #[error("ride request does not allow this transition")]
    InvalidTransition,
    #[error("storage unavailable: {0}")]
    Storage(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct RideMatchingEngine {
    db: DbPool,
    service_area: Vec<Point>,
}

impl RideMatchingEngine {
    pub fn new(db: DbPool, service_area: Vec<Point>) -> Self {
        Self { db, service_area }
    }

    /// Create a pending pickup request. Rejected when the pickup point is
    /// outside the service polygon or the passenger already has an open
    /// request. The one-open-request rule is enforced by a guarded insert
    /// backed by a partial unique index, so concurrent creations cannot
    /// slip past it.
    pub async fn create_request(
        &self,
        passenger_id: &str,
        pickup: Point,
        pickup_address: Option<&str>,
    ) -> Result<RideRequest, DispatchError> {
        if !is_inside_service_area(pickup, &self.service_area) {
            return Err(DispatchError::OutsideServiceArea);
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let sql = format!(
            "INSERT INTO ride_requests
                 (id, passenger_id, status, pickup_lat, pickup_lng, pickup_address, created_at, updated_at)
             SELECT ?, ?, 'pending', ?, ?, ?, ?, ?
             WHERE NOT EXISTS (
                 SELECT 1 FROM ride_requests
                 WHERE passenger_id = ? AND status IN ({ACTIVE_STATUSES})
             )"
        );
        let result = sqlx::query(&sql)
            .bind(&id)
            .bind(passenger_id)
            .bind(pickup.lat)
            .bind(pickup.lng)
            .bind(pickup_address)
            .bind(&now)
            .bind(&now)
            .bind(passenger_id)
            .execute(&self.db)
            .await;

        match result {
            Ok(r) if r.rows_affected() == 0 => Err(DispatchError::ActiveRequestExists),
            Ok(_) => Ok(self.fetch(&id).await?.ok_or(DispatchError::NotFound)?),
            Err(e) if is_unique_violation(&e) => Err(DispatchError::ActiveRequestExists),
            Err(e) => Err(e.into()),
        }
    }

    /// Claim a pending request for a driver. The pending → accepted
    /// transition is one conditional UPDATE; with N concurrent claims on
    /// the same request exactly one succeeds and the rest see
    /// `AlreadyTaken`.
    pub async fn accept_request(
        &self,
        request_id: &str,
        driver_id: &str,
    ) -> Result<RideRequest, DispatchError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE ride_requests
             SET status = 'accepted', driver_id = ?, accepted_at = ?, updated_at = ?
             WHERE id = ? AND status = 'pending'",
        )
        .bind(driver_id)
        .bind(&now)
        .bind(&now)
        .bind(request_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DispatchError::AlreadyTaken);
        }

        Ok(self.fetch(request_id).await?.ok_or(DispatchError::NotFound)?)
    }

    /// Mark an accepted ride as underway. Only the assigned driver may
    /// start it.
    pub async fn start_ride(
        &self,
        request_id: &str,
        driver_id: &str,
    ) -> Result<RideRequest, DispatchError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE ride_requests
             SET status = 'in_progress', updated_at = ?
             WHERE id = ? AND status = 'accepted' AND driver_id = ?",
        )
        .bind(&now)
        .bind(request_id)
        .bind(driver_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            let row = self.fetch(request_id).await?.ok_or(DispatchError::NotFound)?;
            if row.driver_id.as_deref() != Some(driver_id) {
                return Err(DispatchError::Forbidden);
            }
            return Err(DispatchError::InvalidTransition);
        }

        Ok(self.fetch(request_id).await?.ok_or(DispatchError::NotFound)?)
    }

    /// Cancel a request. Allowed for the owning passenger or an admin,
    /// and only while the request is pending or accepted.
    pub async fn cancel_request(
        &self,
        request_id: &str,
        acting_user: &User,
    ) -> Result<RideRequest, DispatchError> {
        let row = self.fetch(request_id).await?.ok_or(DispatchError::NotFound)?;
        if row.passenger_id != acting_user.id && !acting_user.is_admin() {
            return Err(DispatchError::Forbidden);
        }

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE ride_requests
             SET status = 'cancelled', cancelled_at = ?, updated_at = ?
             WHERE id = ? AND status IN ('pending', 'accepted')",
        )
        .bind(&now)
        .bind(&now)
        .bind(request_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DispatchError::InvalidTransition);
        }

        Ok(self.fetch(request_id).await?.ok_or(DispatchError::NotFound)?)
    }

    /// Finish a ride. Allowed for the assigned driver or an admin, from
    /// accepted or in_progress.
    pub async fn complete_request(
        &self,
        request_id: &str,
        acting_user: &User,
    ) -> Result<RideRequest, DispatchError> {
        let row = self.fetch(request_id).await?.ok_or(DispatchError::NotFound)?;
        if row.driver_id.as_deref() != Some(acting_user.id.as_str()) && !acting_user.is_admin() {
            return Err(DispatchError::Forbidden);
        }

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE ride_requests
             SET status = 'completed', completed_at = ?, updated_at = ?
             WHERE id = ? AND status IN ('accepted', 'in_progress')",
        )
        .bind(&now)
        .bind(&now)
        .bind(request_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DispatchError::InvalidTransition);
        }

        Ok(self.fetch(request_id).await?.ok_or(DispatchError::NotFound)?)
    }

    /// All pending requests, oldest first, annotated with passenger
    /// profile data and wait time for the driver view. Read-only snapshot;
    /// drivers may poll it freely.
    pub async fn list_pending(&self) -> Result<Vec<PendingRide>, DispatchError> {
        let mut rows: Vec<PendingRide> = sqlx::query_as(
            "SELECT rr.id, rr.passenger_id, rr.pickup_lat, rr.pickup_lng,
                    rr.pickup_address, rr.created_at,
                    u.first_name AS passenger_first_name,
                    u.last_name AS passenger_last_name,
                    u.avatar_url AS passenger_avatar
             FROM ride_requests rr
             JOIN users u ON u.id = rr.passenger_id
             WHERE rr.status = 'pending'
             ORDER BY rr.created_at ASC",
        )
        .fetch_all(&self.db)
        .await?;

        let now = Utc::now();
        for row in &mut rows {
            row.wait_seconds = chrono::DateTime::parse_from_rfc3339(&row.created_at)
                .map(|created| (now - created.with_timezone(&Utc)).num_seconds().max(0))
                .unwrap_or(0);
        }
        Ok(rows)
    }

    /// The passenger's current open request, if any. Backs both client
    /// state restoration and the one-open-request rule.
    pub async fn find_active_for_passenger(
        &self,
        passenger_id: &str,
    ) -> Result<Option<RideRequest>, DispatchError> {
        let sql = format!(
            "SELECT * FROM ride_requests
             WHERE passenger_id = ? AND status IN ({ACTIVE_STATUSES})
             ORDER BY created_at DESC LIMIT 1"
        );
        Ok(sqlx::query_as(&sql)
            .bind(passenger_id)
            .fetch_optional(&self.db)
            .await?)
    }

    /// The driver's current accepted or in-progress ride, if any.
    pub async fn find_active_for_driver(
        &self,
        driver_id: &str,
    ) -> Result<Option<RideRequest>, DispatchError> {
        Ok(sqlx::query_as(
            "SELECT * FROM ride_requests
             WHERE driver_id = ? AND status IN ('accepted', 'in_progress')
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(driver_id)
        .fetch_optional(&self.db)
        .await?)
    }

    async fn fetch(&self, request_id: &str) -> Result<Option<RideRequest>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM ride_requests WHERE id = ?")
            .bind(request_id)
            .fetch_optional(&self.db)
            .await
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err)
        if db_err.message().contains("UNIQUE constraint failed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use crate::db::{roles, RideStatus};

    fn test_area() -> Vec<Point> {
        vec![
            Point::new(14.705, -17.455),
            Point::new(14.705, -17.43),
            Point::new(14.685, -17.43),
            Point::new(14.685, -17.455),
        ]
    }

    const PICKUP: Point = Point {
        lat: 14.695,
        lng: -17.44,
    };

    async fn seed_user(pool: &DbPool, id: &str, role: &str) -> User {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, first_name, role, created_at, updated_at)
             VALUES (?, ?, 'x', ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(format!("{id}@example.com"))
        .bind(id)
        .bind(role)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();

        sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn setup() -> (RideMatchingEngine, DbPool, tempfile::TempDir) {
        let (pool, dir) = test_pool().await;
        let engine = RideMatchingEngine::new(pool.clone(), test_area());
        (engine, pool, dir)
    }

    #[tokio::test]
    async fn test_create_inside_zone() {
        let (engine, pool, _dir) = setup().await;
        seed_user(&pool, "p1", roles::PASSENGER).await;

        let ride = engine
            .create_request("p1", PICKUP, Some("Gate A main entrance"))
            .await
            .unwrap();
        assert_eq!(ride.status_enum(), RideStatus::Pending);
        assert!(ride.driver_id.is_none());
        assert!(ride.accepted_at.is_none());
        assert_eq!(ride.pickup_address.as_deref(), Some("Gate A main entrance"));
    }

    #[tokio::test]
    async fn test_create_outside_zone_rejected() {
        let (engine, pool, _dir) = setup().await;
        seed_user(&pool, "p1", roles::PASSENGER).await;

        let far_away = Point::new(48.8566, 2.3522);
        let outcome = engine.create_request("p1", far_away, None).await;
        assert!(matches!(outcome, Err(DispatchError::OutsideServiceArea)));

        // No state mutation on rejection
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ride_requests")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn test_second_open_request_rejected() {
        let (engine, pool, _dir) = setup().await;
        seed_user(&pool, "p1", roles::PASSENGER).await;

        engine.create_request("p1", PICKUP, None).await.unwrap();
        let second = engine.create_request("p1", PICKUP, None).await;
        assert!(matches!(second, Err(DispatchError::ActiveRequestExists)));
    }

    #[tokio::test]
    async fn test_open_request_rule_survives_acceptance() {
        let (engine, pool, _dir) = setup().await;
        seed_user(&pool, "p1", roles::PASSENGER).await;
        seed_user(&pool, "d1", roles::DRIVER).await;

        let ride = engine.create_request("p1", PICKUP, None).await.unwrap();
        engine.accept_request(&ride.id, "d1").await.unwrap();

        let again = engine.create_request("p1", PICKUP, None).await;
        assert!(matches!(again, Err(DispatchError::ActiveRequestExists)));
    }

    #[tokio::test]
    async fn test_accept_marks_winner() {
        let (engine, pool, _dir) = setup().await;
        seed_user(&pool, "p1", roles::PASSENGER).await;
        seed_user(&pool, "d1", roles::DRIVER).await;

        let ride = engine.create_request("p1", PICKUP, None).await.unwrap();
        let accepted = engine.accept_request(&ride.id, "d1").await.unwrap();
        assert_eq!(accepted.status_enum(), RideStatus::Accepted);
        assert_eq!(accepted.driver_id.as_deref(), Some("d1"));
        assert!(accepted.accepted_at.is_some());
    }

    #[tokio::test]
    async fn test_second_acceptance_loses() {
        let (engine, pool, _dir) = setup().await;
        seed_user(&pool, "p1", roles::PASSENGER).await;
        seed_user(&pool, "d1", roles::DRIVER).await;
        seed_user(&pool, "d2", roles::DRIVER).await;

        let ride = engine.create_request("p1", PICKUP, None).await.unwrap();
        engine.accept_request(&ride.id, "d1").await.unwrap();

        let loser = engine.accept_request(&ride.id, "d2").await;
        assert!(matches!(loser, Err(DispatchError::AlreadyTaken)));

        // The winner's claim is untouched
        let row: RideRequest = sqlx::query_as("SELECT * FROM ride_requests WHERE id = ?")
            .bind(&ride.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.driver_id.as_deref(), Some("d1"));
    }

    #[tokio::test]
    async fn test_concurrent_acceptance_has_one_winner() {
        let (engine, pool, _dir) = setup().await;
        seed_user(&pool, "p1", roles::PASSENGER).await;
        seed_user(&pool, "d1", roles::DRIVER).await;
        seed_user(&pool, "d2", roles::DRIVER).await;
        seed_user(&pool, "d3", roles::DRIVER).await;

        let ride = engine.create_request("p1", PICKUP, None).await.unwrap();

        let (r1, r2, r3) = tokio::join!(
            engine.accept_request(&ride.id, "d1"),
            engine.accept_request(&ride.id, "d2"),
            engine.accept_request(&ride.id, "d3"),
        );
        let wins = [&r1, &r2, &r3].iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1, "exactly one driver must win the race");
        for r in [r1, r2, r3] {
            if let Err(e) = r {
                assert!(matches!(e, DispatchError::AlreadyTaken));
            }
        }

        let row: RideRequest = sqlx::query_as("SELECT * FROM ride_requests WHERE id = ?")
            .bind(&ride.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(row.driver_id.is_some());
    }

    #[tokio::test]
    async fn test_accept_unknown_or_cancelled_is_already_taken() {
        let (engine, pool, _dir) = setup().await;
        let passenger = seed_user(&pool, "p1", roles::PASSENGER).await;
        seed_user(&pool, "d1", roles::DRIVER).await;

        let missing = engine.accept_request("no-such-id", "d1").await;
        assert!(matches!(missing, Err(DispatchError::AlreadyTaken)));

        let ride = engine.create_request("p1", PICKUP, None).await.unwrap();
        engine.cancel_request(&ride.id, &passenger).await.unwrap();
        let cancelled = engine.accept_request(&ride.id, "d1").await;
        assert!(matches!(cancelled, Err(DispatchError::AlreadyTaken)));
    }

    #[tokio::test]
    async fn test_cancel_own_pending_request() {
        let (engine, pool, _dir) = setup().await;
        let passenger = seed_user(&pool, "p1", roles::PASSENGER).await;

        let ride = engine.create_request("p1", PICKUP, None).await.unwrap();
        let cancelled = engine.cancel_request(&ride.id, &passenger).await.unwrap();
        assert_eq!(cancelled.status_enum(), RideStatus::Cancelled);
        assert!(cancelled.status_enum().is_terminal());
        assert!(cancelled.cancelled_at.is_some());

        // Terminal: a second cancel is rejected
        let again = engine.cancel_request(&ride.id, &passenger).await;
        assert!(matches!(again, Err(DispatchError::InvalidTransition)));
    }

    #[tokio::test]
    async fn test_cancel_requires_ownership_or_admin() {
        let (engine, pool, _dir) = setup().await;
        seed_user(&pool, "p1", roles::PASSENGER).await;
        let stranger = seed_user(&pool, "p2", roles::PASSENGER).await;
        let admin = seed_user(&pool, "boss", roles::ADMIN).await;

        let ride = engine.create_request("p1", PICKUP, None).await.unwrap();
        let denied = engine.cancel_request(&ride.id, &stranger).await;
        assert!(matches!(denied, Err(DispatchError::Forbidden)));

        let by_admin = engine.cancel_request(&ride.id, &admin).await.unwrap();
        assert_eq!(by_admin.status_enum(), RideStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_unknown_request() {
        let (engine, pool, _dir) = setup().await;
        let passenger = seed_user(&pool, "p1", roles::PASSENGER).await;
        let outcome = engine.cancel_request("no-such-id", &passenger).await;
        assert!(matches!(outcome, Err(DispatchError::NotFound)));
    }

    #[tokio::test]
    async fn test_cancel_not_allowed_once_underway() {
        let (engine, pool, _dir) = setup().await;
        let passenger = seed_user(&pool, "p1", roles::PASSENGER).await;
        seed_user(&pool, "d1", roles::DRIVER).await;

        let ride = engine.create_request("p1", PICKUP, None).await.unwrap();
        engine.accept_request(&ride.id, "d1").await.unwrap();
        engine.start_ride(&ride.id, "d1").await.unwrap();

        let outcome = engine.cancel_request(&ride.id, &passenger).await;
        assert!(matches!(outcome, Err(DispatchError::InvalidTransition)));
    }

    #[tokio::test]
    async fn test_start_ride_lifecycle() {
        let (engine, pool, _dir) = setup().await;
        seed_user(&pool, "p1", roles::PASSENGER).await;
        seed_user(&pool, "d1", roles::DRIVER).await;
        seed_user(&pool, "d2", roles::DRIVER).await;

        let ride = engine.create_request("p1", PICKUP, None).await.unwrap();

        // Not assigned yet
        let premature = engine.start_ride(&ride.id, "d1").await;
        assert!(matches!(premature, Err(DispatchError::Forbidden)));

        engine.accept_request(&ride.id, "d1").await.unwrap();

        // Only the assigned driver may start
        let wrong_driver = engine.start_ride(&ride.id, "d2").await;
        assert!(matches!(wrong_driver, Err(DispatchError::Forbidden)));

        let started = engine.start_ride(&ride.id, "d1").await.unwrap();
        assert_eq!(started.status_enum(), RideStatus::InProgress);

        // Starting twice is an invalid transition
        let again = engine.start_ride(&ride.id, "d1").await;
        assert!(matches!(again, Err(DispatchError::InvalidTransition)));
    }

    #[tokio::test]
    async fn test_complete_from_accepted_and_in_progress() {
        let (engine, pool, _dir) = setup().await;
        seed_user(&pool, "p1", roles::PASSENGER).await;
        seed_user(&pool, "p2", roles::PASSENGER).await;
        let driver = seed_user(&pool, "d1", roles::DRIVER).await;

        // accepted → completed
        let a = engine.create_request("p1", PICKUP, None).await.unwrap();
        engine.accept_request(&a.id, "d1").await.unwrap();
        let done = engine.complete_request(&a.id, &driver).await.unwrap();
        assert_eq!(done.status_enum(), RideStatus::Completed);
        assert!(done.completed_at.is_some());

        // in_progress → completed
        let b = engine.create_request("p2", PICKUP, None).await.unwrap();
        engine.accept_request(&b.id, "d1").await.unwrap();
        engine.start_ride(&b.id, "d1").await.unwrap();
        let done = engine.complete_request(&b.id, &driver).await.unwrap();
        assert_eq!(done.status_enum(), RideStatus::Completed);
    }

    #[tokio::test]
    async fn test_complete_requires_assigned_driver() {
        let (engine, pool, _dir) = setup().await;
        seed_user(&pool, "p1", roles::PASSENGER).await;
        let driver = seed_user(&pool, "d1", roles::DRIVER).await;
        let other = seed_user(&pool, "d2", roles::DRIVER).await;

        let ride = engine.create_request("p1", PICKUP, None).await.unwrap();
        engine.accept_request(&ride.id, "d1").await.unwrap();

        let denied = engine.complete_request(&ride.id, &other).await;
        assert!(matches!(denied, Err(DispatchError::Forbidden)));

        engine.complete_request(&ride.id, &driver).await.unwrap();
        let again = engine.complete_request(&ride.id, &driver).await;
        assert!(matches!(again, Err(DispatchError::InvalidTransition)));
    }

    #[tokio::test]
    async fn test_terminal_request_releases_passenger() {
        let (engine, pool, _dir) = setup().await;
        let passenger = seed_user(&pool, "p1", roles::PASSENGER).await;
        seed_user(&pool, "d1", roles::DRIVER).await;

        let first = engine.create_request("p1", PICKUP, None).await.unwrap();
        engine.cancel_request(&first.id, &passenger).await.unwrap();

        // A cancelled request no longer blocks creation
        let second = engine.create_request("p1", PICKUP, None).await.unwrap();
        engine.accept_request(&second.id, "d1").await.unwrap();
        let driver = seed_user(&pool, "d-admin", roles::ADMIN).await;
        engine.complete_request(&second.id, &driver).await.unwrap();

        assert!(engine.create_request("p1", PICKUP, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_pending_is_oldest_first() {
        let (engine, pool, _dir) = setup().await;
        seed_user(&pool, "p1", roles::PASSENGER).await;
        seed_user(&pool, "p2", roles::PASSENGER).await;
        seed_user(&pool, "d1", roles::DRIVER).await;

        let first = engine.create_request("p1", PICKUP, None).await.unwrap();
        // Force distinct created_at values
        sqlx::query("UPDATE ride_requests SET created_at = ? WHERE id = ?")
            .bind((Utc::now() - chrono::Duration::minutes(10)).to_rfc3339())
            .bind(&first.id)
            .execute(&pool)
            .await
            .unwrap();
        let second = engine.create_request("p2", PICKUP, None).await.unwrap();

        let pending = engine.list_pending().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, first.id);
        assert_eq!(pending[1].id, second.id);
        assert_eq!(pending[0].passenger_first_name.as_deref(), Some("p1"));
        assert!(pending[0].wait_seconds >= 600);
        assert!(pending[1].wait_seconds >= 0);

        // Accepted requests drop out of the feed
        engine.accept_request(&first.id, "d1").await.unwrap();
        let pending = engine.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second.id);
    }

    #[tokio::test]
    async fn test_find_active_for_passenger_lifecycle() {
        let (engine, pool, _dir) = setup().await;
        seed_user(&pool, "p1", roles::PASSENGER).await;
        let driver = seed_user(&pool, "d1", roles::DRIVER).await;

        assert!(engine.find_active_for_passenger("p1").await.unwrap().is_none());

        let ride = engine.create_request("p1", PICKUP, None).await.unwrap();
        let active = engine.find_active_for_passenger("p1").await.unwrap().unwrap();
        assert_eq!(active.id, ride.id);

        engine.accept_request(&ride.id, "d1").await.unwrap();
        assert!(engine.find_active_for_passenger("p1").await.unwrap().is_some());

        let found = engine.find_active_for_driver("d1").await.unwrap().unwrap();
        assert_eq!(found.id, ride.id);

        engine.complete_request(&ride.id, &driver).await.unwrap();
        assert!(engine.find_active_for_passenger("p1").await.unwrap().is_none());
        assert!(engine.find_active_for_driver("d1").await.unwrap().is_none());
    }
}
