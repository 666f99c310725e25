use async_trait::async_trait;
use thiserror::Error;

use crate::models::item::{Item, ItemPatch, ListQuery, NewItem};

/// Failures reported by an item store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The identifier does not have the shape the store expects
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A uniqueness constraint was violated
    #[error("{0}")]
    Conflict(String),

    /// The store cannot be reached right now
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Item IDs are positive; anything else cannot address a stored item
pub fn check_id(id: i64) -> Result<(), StoreError> {
    if id <= 0 {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// One page of a listing plus the total number of matches
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Data-access collaborator for the item resource
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// List items matching the query, one page at a time
    async fn list_items(&self, query: &ListQuery) -> Result<Page<Item>, StoreError>;

    /// Get an item by ID
    async fn get_item(&self, id: i64) -> Result<Option<Item>, StoreError>;

    /// Insert a new item, recording who created it
    async fn create_item(&self, item: NewItem, created_by: Option<String>)
        -> Result<Item, StoreError>;

    /// Apply a partial update. Returns `None` when the item does not exist
    async fn update_item(&self, id: i64, patch: ItemPatch) -> Result<Option<Item>, StoreError>;

    /// Delete an item. Returns whether it existed
    async fn delete_item(&self, id: i64) -> Result<bool, StoreError>;

    /// Test store connectivity
    async fn test_connection(&self) -> Result<(), StoreError>;
}
