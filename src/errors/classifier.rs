use axum::{extract::ConnectInfo, http::Request};
use chrono::{SecondsFormat, Utc};
use std::net::SocketAddr;
use tracing::{error, warn};

use crate::validation::ValidationFailure;

use super::api_error::ApiError;
use super::codes::{
    default_message, normalize_status, ErrorKind, INVALID_IDENTIFIER, INVALID_TOKEN,
    TOKEN_EXPIRED, VALIDATION_FAILED,
};

/// The HTTP-facing interpretation of an [`ApiError`]
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedError {
    pub status_code: u16,
    pub message: String,
    pub kind: ErrorKind,
    pub details: Option<Vec<ValidationFailure>>,
}

/// Map an error to its status, message and kind.
///
/// Pure: the same error always yields the same classification.
pub fn classify(err: &ApiError) -> ClassifiedError {
    let (status_code, explicit_message) = match err {
        ApiError::Http { status, message } => (normalize_status(*status), message.as_deref()),
        _ => (500, None),
    };

    let generic = ClassifiedError {
        status_code,
        message: explicit_message
            .unwrap_or_else(|| default_message(status_code))
            .to_string(),
        kind: ErrorKind::Generic,
        details: None,
    };

    match err {
        ApiError::Validation(failures) => ClassifiedError {
            status_code: 400,
            message: VALIDATION_FAILED.to_string(),
            kind: ErrorKind::Validation,
            details: Some(failures.clone()),
        },
        ApiError::Cast { .. } => ClassifiedError {
            status_code: 400,
            message: INVALID_IDENTIFIER.to_string(),
            kind: ErrorKind::Cast,
            details: None,
        },
        ApiError::TokenExpired => ClassifiedError {
            status_code: 401,
            message: TOKEN_EXPIRED.to_string(),
            kind: ErrorKind::AuthTokenExpired,
            details: None,
        },
        ApiError::TokenInvalid(_) => ClassifiedError {
            status_code: 401,
            message: INVALID_TOKEN.to_string(),
            kind: ErrorKind::AuthToken,
            details: None,
        },
        ApiError::Http { .. } | ApiError::Internal(_) => generic,
    }
}

/// Request facts needed to render and log an error
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub method: String,
    pub path: String,
    pub client_addr: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            client_addr: request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string()),
            user_agent: request
                .headers()
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }
    }
}

/// Record a classification. `tracing` never surfaces sink failures to the caller.
pub fn log_classification(classified: &ClassifiedError, context: &RequestContext, trace: Option<&str>) {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let client = context.client_addr.as_deref().unwrap_or("unknown");
    let user_agent = context.user_agent.as_deref().unwrap_or("unknown");
    let trace = trace.unwrap_or("");

    if classified.status_code >= 500 {
        error!(
            timestamp = %timestamp,
            method = %context.method,
            path = %context.path,
            status = classified.status_code,
            kind = %classified.kind,
            client = %client,
            user_agent = %user_agent,
            trace = %trace,
            "{}",
            classified.message
        );
    } else {
        warn!(
            timestamp = %timestamp,
            method = %context.method,
            path = %context.path,
            status = classified.status_code,
            kind = %classified.kind,
            client = %client,
            user_agent = %user_agent,
            trace = %trace,
            "{}",
            classified.message
        );
    }
}
