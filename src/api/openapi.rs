use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{DeleteResponse, DeletedItem, HealthResponse, ItemListResponse, ItemResponse};
use crate::errors::{ErrorBody, ErrorEnvelope, ErrorKind, Pagination};
use crate::models::item::{Item, ItemPatch, ListParams, NewItem};
use crate::validation::ValidationFailure;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Item Service",
        version = "0.1.0",
        description = "CRUD backend for a generic item resource. Every error is reported through a single JSON envelope with the classified status, message and per-field validation details.",
        contact(
            name = "Item Service API",
        )
    ),
    paths(
        crate::api::handlers::health,
        crate::api::handlers::list_items,
        crate::api::handlers::get_item,
        crate::api::handlers::create_item,
        crate::api::handlers::update_item,
        crate::api::handlers::delete_item,
    ),
    components(
        schemas(
            Item,
            NewItem,
            ItemPatch,
            ListParams,
            ItemResponse,
            ItemListResponse,
            DeleteResponse,
            DeletedItem,
            HealthResponse,
            Pagination,
            ErrorEnvelope,
            ErrorBody,
            ErrorKind,
            ValidationFailure,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "items", description = "Item CRUD endpoints"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_item_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/items"));
        assert!(doc.paths.paths.contains_key("/api/items/{id}"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
