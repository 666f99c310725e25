// Prints the OpenAPI document served at /api-docs/openapi.json
// Usage: cargo run --bin openapi-export > openapi.json

use item_service::api::openapi::ApiDoc;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    println!("{}", ApiDoc::openapi().to_pretty_json()?);
    Ok(())
}
