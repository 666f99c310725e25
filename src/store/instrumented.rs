use async_trait::async_trait;
use std::time::Instant;

use crate::metrics::registry::{STORE_OPERATIONS_TOTAL, STORE_OPERATION_DURATION_SECONDS};
use crate::models::item::{Item, ItemPatch, ListQuery, NewItem};

use super::backend::{ItemStore, Page, StoreError};
use super::Store;

/// A thin wrapper around an ItemStore that records Prometheus metrics for
/// operation counts, outcomes and durations.
pub struct InstrumentedStore {
    inner: Store,
}

impl InstrumentedStore {
    pub fn new(inner: Store) -> Self {
        Self { inner }
    }

    fn observe<T>(&self, operation: &'static str, start: Instant, res: &Result<T, StoreError>) {
        let outcome = if res.is_ok() { "ok" } else { "error" };
        STORE_OPERATIONS_TOTAL
            .with_label_values(&[operation, outcome])
            .inc();
        STORE_OPERATION_DURATION_SECONDS
            .with_label_values(&[operation])
            .observe(start.elapsed().as_secs_f64());
    }
}

#[async_trait]
impl ItemStore for InstrumentedStore {
    async fn list_items(&self, query: &ListQuery) -> Result<Page<Item>, StoreError> {
        let start = Instant::now();
        let res = self.inner.list_items(query).await;
        self.observe("list", start, &res);
        res
    }

    async fn get_item(&self, id: i64) -> Result<Option<Item>, StoreError> {
        let start = Instant::now();
        let res = self.inner.get_item(id).await;
        self.observe("get", start, &res);
        res
    }

    async fn create_item(
        &self,
        item: NewItem,
        created_by: Option<String>,
    ) -> Result<Item, StoreError> {
        let start = Instant::now();
        let res = self.inner.create_item(item, created_by).await;
        self.observe("create", start, &res);
        res
    }

    async fn update_item(&self, id: i64, patch: ItemPatch) -> Result<Option<Item>, StoreError> {
        let start = Instant::now();
        let res = self.inner.update_item(id, patch).await;
        self.observe("update", start, &res);
        res
    }

    async fn delete_item(&self, id: i64) -> Result<bool, StoreError> {
        let start = Instant::now();
        let res = self.inner.delete_item(id).await;
        self.observe("delete", start, &res);
        res
    }

    async fn test_connection(&self) -> Result<(), StoreError> {
        let start = Instant::now();
        let res = self.inner.test_connection().await;
        self.observe("ping", start, &res);
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryItemStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_records_outcomes() {
        let store = InstrumentedStore::new(Arc::new(MemoryItemStore::new()));
        let before = STORE_OPERATIONS_TOTAL
            .with_label_values(&["get", "error"])
            .get();

        assert!(store.get_item(-1).await.is_err());

        let after = STORE_OPERATIONS_TOTAL
            .with_label_values(&["get", "error"])
            .get();
        assert!(after > before);
    }
}
