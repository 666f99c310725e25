use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, errors::ErrorKind as JwtErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::handlers::AppState;
use crate::errors::ApiError;

/// Bearer token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
}

/// Authenticated caller, present in request extensions when a valid token was sent
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: String,
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            JwtErrorKind::ExpiredSignature => ApiError::TokenExpired,
            _ => ApiError::TokenInvalid(e.to_string()),
        })
}

/// Optional bearer authentication: no header means anonymous
pub async fn bearer_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(header) = request.headers().get(AUTHORIZATION) else {
        return Ok(next.run(request).await);
    };

    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::TokenInvalid("malformed authorization header".to_string()))?;

    let claims = decode_token(token, &state.config.auth.jwt_secret)?;
    debug!(user = %claims.sub, "Bearer token accepted");
    request.extensions_mut().insert(AuthUser { id: claims.sub });

    Ok(next.run(request).await)
}
