use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Category of a classified error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Request input failed one or more validation rules
    Validation,
    /// Identifier could not be interpreted by the store
    Cast,
    /// Bearer token could not be verified
    AuthToken,
    /// Bearer token verified but past its expiry
    AuthTokenExpired,
    /// Anything else, classified by status code alone
    Generic,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::Cast => "CAST",
            Self::AuthToken => "AUTH_TOKEN",
            Self::AuthTokenExpired => "AUTH_TOKEN_EXPIRED",
            Self::Generic => "GENERIC",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const VALIDATION_FAILED: &str = "Validation failed";
pub const INVALID_IDENTIFIER: &str = "Invalid ID format";
pub const INVALID_TOKEN: &str = "Invalid token";
pub const TOKEN_EXPIRED: &str = "Token expired";

/// Clamp anything outside the HTTP status range to 500
pub fn normalize_status(status: u16) -> u16 {
    if (100..=599).contains(&status) {
        status
    } else {
        500
    }
}

/// Default user-facing message for a status code
pub fn default_message(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown Error",
    }
}
