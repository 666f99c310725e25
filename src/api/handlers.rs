use anyhow::Context;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use utoipa::ToSchema;

use super::middleware::{AuthUser, ClientRateLimiter};
use crate::config::Config;
use crate::errors::response::now_iso8601;
use crate::errors::{ApiError, ApiResponse, ErrorEnvelope, Pagination};
use crate::metrics::registry::VALIDATION_FAILURES_TOTAL;
use crate::models::item::{Item, ItemPatch, ListParams, ListQuery, NewItem};
use crate::store::Store;
use crate::validation::{evaluate, ItemRules, RuleSet};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub config: Config,
    pub store: Store,
    pub rules: ItemRules,
    pub rate_limiter: ClientRateLimiter,
    pub started_at: Instant,
}

impl AppStateInner {
    pub fn new(config: Config, store: Store) -> anyhow::Result<Self> {
        let rules = ItemRules::new().context("Failed to compile item validation rules")?;
        let rate_limiter = ClientRateLimiter::new(&config.rate_limit)?;

        Ok(Self {
            config,
            store,
            rules,
            rate_limiter,
            started_at: Instant::now(),
        })
    }
}

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always "OK"
    pub status: String,
    /// ISO-8601 time of the check
    pub timestamp: String,
    /// Seconds since the process started serving
    pub uptime: f64,
}

// Concrete response types for OpenAPI generation
/// Single item response
#[derive(Debug, Serialize, ToSchema)]
pub struct ItemResponse {
    pub success: bool,
    pub data: Item,
    pub message: String,
}

/// Paginated item list response
#[derive(Debug, Serialize, ToSchema)]
pub struct ItemListResponse {
    pub success: bool,
    pub data: Vec<Item>,
    pub message: String,
    pub pagination: Pagination,
}

/// Identifier of a deleted item
#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedItem {
    pub id: i64,
}

/// Delete response
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
    pub data: DeletedItem,
    pub message: String,
}

/// Run a rule set and turn any failures into a validation error
fn validate(rules: &RuleSet, input: &Value) -> Result<(), ApiError> {
    let failures = evaluate(rules, input)?;
    if failures.is_empty() {
        return Ok(());
    }

    for failure in &failures {
        VALIDATION_FAILURES_TOTAL
            .with_label_values(&[&failure.field])
            .inc();
    }
    Err(ApiError::Validation(failures))
}

/// Deserialize input that already passed validation
fn typed<T: DeserializeOwned>(input: Value) -> Result<T, ApiError> {
    serde_json::from_value(input).map_err(|e| ApiError::bad_request(format!("Malformed request body: {}", e)))
}

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid ID parameter"))
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: now_iso8601(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}

/// List items with filtering, sorting and pagination
#[utoipa::path(
    get,
    path = "/api/items",
    tag = "items",
    params(ListParams),
    responses(
        (status = 200, description = "Page of items", body = ItemListResponse),
        (status = 400, description = "Invalid query parameters", body = ErrorEnvelope),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn list_items(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;
    let raw = serde_json::to_value(&params).context("Failed to inspect query parameters")?;
    validate(&state.rules.list, &raw)?;

    let query = ListQuery::try_from(params)?;
    let page = state.store.list_items(&query).await?;
    let pagination = Pagination::new(query.page, query.limit, page.total);

    Ok(Json(ApiResponse::paginated(
        page.items,
        "Items retrieved successfully",
        pagination,
    )))
}

/// Get a single item by ID
#[utoipa::path(
    get,
    path = "/api/items/{id}",
    tag = "items",
    params(
        ("id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item found", body = ItemResponse),
        (status = 400, description = "Invalid ID", body = ErrorEnvelope),
        (status = 404, description = "Item not found", body = ErrorEnvelope)
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;

    let item = state
        .store
        .get_item(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    Ok(Json(ApiResponse::success(item, "Item retrieved successfully")))
}

/// Create an item
#[utoipa::path(
    post,
    path = "/api/items",
    tag = "items",
    request_body = NewItem,
    responses(
        (status = 201, description = "Item created", body = ItemResponse),
        (status = 400, description = "Validation failed", body = ErrorEnvelope),
        (status = 401, description = "Invalid or expired bearer token", body = ErrorEnvelope),
        (status = 409, description = "Name already taken", body = ErrorEnvelope)
    ),
    security(
        (),
        ("bearer" = [])
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    validate(&state.rules.create, &body)?;

    let new_item: NewItem = typed(body)?;
    let created_by = user.map(|Extension(user)| user.id);
    let item = state.store.create_item(new_item, created_by).await?;
    info!(id = item.id, name = %item.name, "Item created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(item, "Item created successfully")),
    ))
}

/// Update an item; absent fields are left unchanged
#[utoipa::path(
    put,
    path = "/api/items/{id}",
    tag = "items",
    params(
        ("id" = i64, Path, description = "Item ID")
    ),
    request_body = ItemPatch,
    responses(
        (status = 200, description = "Item updated", body = ItemResponse),
        (status = 400, description = "Invalid ID or validation failed", body = ErrorEnvelope),
        (status = 404, description = "Item not found", body = ErrorEnvelope),
        (status = 409, description = "Name already taken", body = ErrorEnvelope)
    )
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = payload?;
    validate(&state.rules.update, &body)?;

    let patch: ItemPatch = typed(body)?;
    if patch.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let item = state
        .store
        .update_item(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;
    info!(id = item.id, "Item updated");

    Ok(Json(ApiResponse::success(item, "Item updated successfully")))
}

/// Delete an item
#[utoipa::path(
    delete,
    path = "/api/items/{id}",
    tag = "items",
    params(
        ("id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item deleted", body = DeleteResponse),
        (status = 400, description = "Invalid ID", body = ErrorEnvelope),
        (status = 404, description = "Item not found", body = ErrorEnvelope)
    )
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;

    if !state.store.delete_item(id).await? {
        return Err(ApiError::not_found("Item not found"));
    }
    info!(id, "Item deleted");

    Ok(Json(ApiResponse::success(
        DeletedItem { id },
        "Item deleted successfully",
    )))
}
