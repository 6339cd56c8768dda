//! Database models split into domain-specific modules.

pub mod driver;
pub mod reset_token;
pub mod ride_request;
pub mod user;

pub use driver::*;
pub use reset_token::*;
pub use ride_request::*;
pub use user::*;
