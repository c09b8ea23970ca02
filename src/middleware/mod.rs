pub mod auth;

pub use auth::{AuthUser, ensure_owner};
