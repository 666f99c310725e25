use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::validation::ValidationFailure;

use super::classifier::{ClassifiedError, RequestContext};

/// Structured error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    /// Always false for errors
    pub success: bool,
    /// ISO-8601 time the error was rendered
    pub timestamp: String,
    /// Request path
    pub path: String,
    /// Request method
    pub method: String,
    /// Error details
    pub error: ErrorBody,
}

/// Error details
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// HTTP status code
    pub code: u16,
    /// Human-readable error message
    pub message: String,
    /// Per-field validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationFailure>>,
    /// Diagnostic trace, never present in production
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(classified: &ClassifiedError, context: &RequestContext, stack: Option<String>) -> Self {
        Self {
            success: false,
            timestamp: now_iso8601(),
            path: context.path.clone(),
            method: context.method.clone(),
            error: ErrorBody {
                code: classified.status_code,
                message: classified.message.clone(),
                details: classified.details.clone(),
                stack,
            },
        }
    }
}

impl IntoResponse for ErrorEnvelope {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.error.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(self)).into_response()
    }
}

/// Success wrapper shared by every resource handler
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always true for successes
    pub success: bool,
    /// Response payload
    pub data: T,
    /// Human-readable summary
    pub message: String,
    /// Present on list responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
            pagination: None,
        }
    }

    pub fn paginated(data: T, message: impl Into<String>, pagination: Pagination) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
            pagination: Some(pagination),
        }
    }
}

/// Page metadata for list responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::codes::ErrorKind;
    use serde_json::json;

    fn context() -> RequestContext {
        RequestContext {
            method: "POST".to_string(),
            path: "/api/items".to_string(),
            ..Default::default()
        }
    }

    fn classified(details: Option<Vec<ValidationFailure>>) -> ClassifiedError {
        ClassifiedError {
            status_code: 400,
            message: "Validation failed".to_string(),
            kind: ErrorKind::Validation,
            details,
        }
    }

    #[test]
    fn test_envelope_shape() {
        let envelope = ErrorEnvelope::new(&classified(None), &context(), None);
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["path"], json!("/api/items"));
        assert_eq!(value["method"], json!("POST"));
        assert_eq!(value["error"]["code"], json!(400));
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_stack_and_details_omitted_when_absent() {
        let envelope = ErrorEnvelope::new(&classified(None), &context(), None);
        let value = serde_json::to_value(&envelope).unwrap();
        let error = value["error"].as_object().unwrap();
        assert!(!error.contains_key("stack"));
        assert!(!error.contains_key("details"));
    }

    #[test]
    fn test_stack_and_details_present_when_given() {
        let details = vec![ValidationFailure {
            field: "name".to_string(),
            message: "Name is required".to_string(),
            rejected_value: None,
        }];
        let envelope = ErrorEnvelope::new(
            &classified(Some(details)),
            &context(),
            Some("trace".to_string()),
        );
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["error"]["stack"], json!("trace"));
        assert_eq!(value["error"]["details"][0]["field"], json!("name"));
    }

    #[test]
    fn test_into_response_status() {
        let response = ErrorEnvelope::new(&classified(None), &context(), None).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_pagination_math() {
        let p = Pagination::new(2, 10, 35);
        assert_eq!(p.total_pages, 4);
        assert!(p.has_next);
        assert!(p.has_prev);

        let last = Pagination::new(4, 10, 35);
        assert!(!last.has_next);

        let empty = Pagination::new(1, 10, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }

    #[test]
    fn test_success_envelope() {
        let value = serde_json::to_value(ApiResponse::success(json!({"id": 1}), "ok")).unwrap();
        assert_eq!(value["success"], json!(true));
        assert!(value.get("error").is_none());
        assert!(value.get("pagination").is_none());

        let value = serde_json::to_value(ApiResponse::paginated(
            json!([]),
            "ok",
            Pagination::new(1, 10, 0),
        ))
        .unwrap();
        assert_eq!(value["pagination"]["totalPages"], json!(0));
    }
}
