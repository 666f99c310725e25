use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;

use crate::api::handlers::AppState;
use crate::errors::{classify, log_classification, ApiError, ErrorEnvelope, PendingError, RequestContext};
use crate::metrics::registry::ERRORS_CLASSIFIED_TOTAL;

/// Marks a response whose body has been written by a responder
#[derive(Debug, Clone, Copy)]
pub struct Rendered;

/// Render errors returned by handlers into the JSON error envelope
pub async fn error_responder(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let context = RequestContext::from_request(&request);
    let response = next.run(request).await;
    render_pending(
        response,
        &context,
        state.config.environment.exposes_diagnostics(),
    )
}

/// Replace an unrendered error response with its envelope.
///
/// A response already marked [`Rendered`] is returned untouched, pending error
/// included, so an outer responder can still see it.
pub fn render_pending(mut response: Response, context: &RequestContext, expose_trace: bool) -> Response {
    if response.extensions().get::<Rendered>().is_some() {
        return response;
    }
    let Some(PendingError(err)) = response.extensions_mut().remove::<PendingError>() else {
        return response;
    };

    let classified = classify(&err);
    let trace = err.trace();
    log_classification(&classified, context, trace.as_deref());
    ERRORS_CLASSIFIED_TOTAL
        .with_label_values(&[classified.kind.as_str(), &classified.status_code.to_string()])
        .inc();

    let stack = if expose_trace { trace } else { None };
    let mut rendered = ErrorEnvelope::new(&classified, context, stack).into_response();
    rendered.extensions_mut().insert(Rendered);
    rendered
}

/// Turn a handler panic into an internal error for the responder
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::internal(format!("handler panicked: {}", detail)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::StatusCode};
    use serde_json::Value;

    fn context() -> RequestContext {
        RequestContext {
            method: "GET".to_string(),
            path: "/api/items/0".to_string(),
            ..Default::default()
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_renders_pending_error() {
        let response = ApiError::Cast {
            value: "0".to_string(),
        }
        .into_response();
        let rendered = render_pending(response, &context(), true);

        assert_eq!(rendered.status(), StatusCode::BAD_REQUEST);
        assert!(rendered.extensions().get::<Rendered>().is_some());
        assert!(rendered.extensions().get::<PendingError>().is_none());

        let body = body_json(rendered).await;
        assert_eq!(body["error"]["message"], "Invalid ID format");
        assert_eq!(body["path"], "/api/items/0");
    }

    #[tokio::test]
    async fn test_stack_follows_diagnostics_flag() {
        let shown = render_pending(ApiError::internal("db exploded").into_response(), &context(), true);
        let body = body_json(shown).await;
        assert!(body["error"]["stack"].as_str().unwrap().contains("db exploded"));

        let hidden = render_pending(ApiError::internal("db exploded").into_response(), &context(), false);
        let body = body_json(hidden).await;
        assert!(body["error"].get("stack").is_none());
        assert_eq!(body["error"]["message"], "Internal Server Error");
    }

    #[tokio::test]
    async fn test_rendered_response_is_forwarded_untouched() {
        let mut response = ApiError::not_found("Item not found").into_response();
        response.extensions_mut().insert(Rendered);

        let forwarded = render_pending(response, &context(), true);
        assert_eq!(forwarded.status(), StatusCode::NOT_FOUND);
        assert!(forwarded.extensions().get::<PendingError>().is_some());
        let bytes = to_bytes(forwarded.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_plain_response_passes_through() {
        let response = (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response();
        let passed = render_pending(response, &context(), true);
        assert_eq!(passed.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(passed.extensions().get::<Rendered>().is_none());
    }

    #[test]
    fn test_panic_response_is_internal() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let pending = response.extensions().get::<PendingError>().unwrap();
        assert!(pending.0.trace().unwrap().contains("boom"));
    }
}
