pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod directory;
pub mod dispatch;
pub mod geofence;
pub mod notifications;
pub mod utils;

pub use db::DbPool;

use config::Config;

use crate::api::AuthRateLimiter;
use crate::auth::{PasswordResetManager, SessionManager};
use crate::directory::IdentityDirectory;
use crate::dispatch::RideMatchingEngine;
use crate::notifications::Mailer;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub sessions: SessionManager,
    pub resets: PasswordResetManager,
    pub directory: IdentityDirectory,
    pub dispatch: RideMatchingEngine,
    pub mailer: Mailer,
    pub rate_limiter: AuthRateLimiter,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let sessions = SessionManager::new(db.clone(), config.auth.session_ttl_days);
        let resets = PasswordResetManager::new(db.clone(), config.auth.reset_token_ttl_minutes);
        let directory = IdentityDirectory::new(db.clone());
        let dispatch = RideMatchingEngine::new(db.clone(), config.service_area.vertices());
        let mailer = Mailer::new(config.email.clone());
        let rate_limiter = AuthRateLimiter::new(config.rate_limit.clone());
        Self {
            config,
            db,
            sessions,
            resets,
            directory,
            dispatch,
            mailer,
            rate_limiter,
        }
    }
}
