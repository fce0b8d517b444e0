//! Authentication
//!
//! Handles:
//! - Signup/login with argon2 password hashing
//! - HMAC-signed session tokens
//! - Authentication extractors

mod middleware;
mod password;
mod routes;
pub mod session;

pub use middleware::CurrentUser;
pub use password::{hash_password, verify_password};
pub use routes::auth_router;
pub use session::{Session, create_session_token, verify_session_token};
