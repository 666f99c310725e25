pub mod connection;
pub mod queries;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::item::{Item, ItemPatch, ListQuery, NewItem};
use crate::store::backend::{check_id, ItemStore, Page, StoreError};

pub struct PostgresItemStore {
    pool: PgPool,
}

impl PostgresItemStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemStore for PostgresItemStore {
    async fn list_items(&self, query: &ListQuery) -> Result<Page<Item>, StoreError> {
        queries::list_items(&self.pool, query).await
    }

    async fn get_item(&self, id: i64) -> Result<Option<Item>, StoreError> {
        check_id(id)?;
        queries::get_item(&self.pool, id).await
    }

    async fn create_item(
        &self,
        item: NewItem,
        created_by: Option<String>,
    ) -> Result<Item, StoreError> {
        queries::create_item(&self.pool, item, created_by).await
    }

    async fn update_item(&self, id: i64, patch: ItemPatch) -> Result<Option<Item>, StoreError> {
        check_id(id)?;
        queries::update_item(&self.pool, id, patch).await
    }

    async fn delete_item(&self, id: i64) -> Result<bool, StoreError> {
        check_id(id)?;
        queries::delete_item(&self.pool, id).await
    }

    async fn test_connection(&self) -> Result<(), StoreError> {
        connection::test_connection(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{:#}", e)))
    }
}
