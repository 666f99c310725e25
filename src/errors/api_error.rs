use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use thiserror::Error;

use crate::store::StoreError;
use crate::validation::{RuleConfigError, ValidationFailure};

use super::classifier::classify;

/// Every failure a handler can return
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed with {} error(s)", .0.len())]
    Validation(Vec<ValidationFailure>),

    #[error("cannot interpret '{value}' as an identifier")]
    Cast { value: String },

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("token expired")]
    TokenExpired,

    #[error("HTTP {status}{}", .message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Http {
        status: u16,
        /// User-facing message, the status default when absent
        message: Option<String>,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: Some(message.into()),
        }
    }

    pub fn status_only(status: u16) -> Self {
        Self::Http {
            status,
            message: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(400, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(404, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_status(409, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(anyhow::anyhow!(message.into()))
    }

    /// Diagnostic trace, present only for errors that carry a source chain
    pub fn trace(&self) -> Option<String> {
        match self {
            Self::Internal(err) => Some(format!("{:?}", err)),
            _ => None,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidId(value) => Self::Cast { value },
            StoreError::Conflict(message) => Self::conflict(message),
            StoreError::Unavailable(message) => Self::with_status(503, message),
            StoreError::Backend(err) => Self::Internal(err.context("item store operation failed")),
        }
    }
}

impl From<RuleConfigError> for ApiError {
    fn from(err: RuleConfigError) -> Self {
        Self::Internal(anyhow::Error::new(err).context("validation rules are misconfigured"))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::with_status(rejection.status().as_u16(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::with_status(rejection.status().as_u16(), rejection.body_text())
    }
}

/// An error waiting to be rendered by the error responder
#[derive(Debug, Clone)]
pub struct PendingError(pub Arc<ApiError>);

impl IntoResponse for ApiError {
    /// Produces a bodyless response with the classified status. The envelope
    /// is written by the error responder, which has the request context.
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(classify(&self).status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = status.into_response();
        response.extensions_mut().insert(PendingError(Arc::new(self)));
        response
    }
}
