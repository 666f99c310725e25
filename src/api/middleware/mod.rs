//! Request middleware for the HTTP surface

pub mod auth;
pub mod logging;
pub mod rate_limit;
pub mod responder;
pub mod security;

pub use auth::{bearer_auth, AuthUser, Claims};
pub use logging::logging_middleware;
pub use rate_limit::{rate_limit, ClientRateLimiter, RATE_LIMIT_MESSAGE};
pub use responder::{error_responder, panic_response, Rendered};
pub use security::security_headers;
