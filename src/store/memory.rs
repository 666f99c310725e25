use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{check_id, ItemStore, Page, StoreError};
use crate::models::item::{Item, ItemPatch, ListQuery, NewItem, SortField};

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    items: BTreeMap<i64, Item>,
}

/// Process-local item store, used for `memory://` and in tests
#[derive(Default)]
pub struct MemoryItemStore {
    state: RwLock<MemoryState>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Case-insensitive by full Unicode lowercasing, matching `LOWER(name)` in Postgres
fn name_taken(state: &MemoryState, name: &str, except: Option<i64>) -> bool {
    let wanted = name.to_lowercase();
    state
        .items
        .values()
        .any(|item| Some(item.id) != except && item.name.to_lowercase() == wanted)
}

fn duplicate(name: &str) -> StoreError {
    StoreError::Conflict(format!("Item with name '{}' already exists", name))
}

fn matches(item: &Item, query: &ListQuery) -> bool {
    let category_ok = query
        .category
        .as_deref()
        .map_or(true, |category| item.category.as_deref() == Some(category));

    let search_ok = query.search.as_deref().map_or(true, |search| {
        let needle = search.to_lowercase();
        item.name.to_lowercase().contains(&needle)
            || item
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    });

    category_ok && search_ok
}

fn compare(a: &Item, b: &Item, field: SortField) -> Ordering {
    match field {
        SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortField::Price => a
            .price
            .unwrap_or(0.0)
            .total_cmp(&b.price.unwrap_or(0.0)),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
    }
    .then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn list_items(&self, query: &ListQuery) -> Result<Page<Item>, StoreError> {
        let state = self.state.read().await;

        let mut found: Vec<&Item> = state.items.values().filter(|i| matches(i, query)).collect();
        found.sort_by(|a, b| {
            let ordering = compare(a, b, query.sort.field);
            if query.sort.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        let total = found.len() as u64;
        let Some(offset) = query.offset().and_then(|o| usize::try_from(o).ok()) else {
            return Ok(Page {
                items: Vec::new(),
                total,
            });
        };
        let items = found
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok(Page { items, total })
    }

    async fn get_item(&self, id: i64) -> Result<Option<Item>, StoreError> {
        check_id(id)?;
        Ok(self.state.read().await.items.get(&id).cloned())
    }

    async fn create_item(
        &self,
        item: NewItem,
        created_by: Option<String>,
    ) -> Result<Item, StoreError> {
        let mut state = self.state.write().await;
        if name_taken(&state, &item.name, None) {
            return Err(duplicate(&item.name));
        }

        state.next_id += 1;
        let now = Utc::now();
        let created = Item {
            id: state.next_id,
            name: item.name,
            description: item.description,
            category: item.category,
            price: item.price,
            tags: item.tags,
            created_by,
            created_at: now,
            updated_at: now,
        };
        state.items.insert(created.id, created.clone());
        debug!(id = created.id, "Item created in memory store");

        Ok(created)
    }

    async fn update_item(&self, id: i64, patch: ItemPatch) -> Result<Option<Item>, StoreError> {
        check_id(id)?;
        let mut state = self.state.write().await;

        if let Some(name) = patch.name.as_deref() {
            if state.items.contains_key(&id) && name_taken(&state, name, Some(id)) {
                return Err(duplicate(name));
            }
        }

        let Some(item) = state.items.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(item);
        item.updated_at = Utc::now();

        Ok(Some(item.clone()))
    }

    async fn delete_item(&self, id: i64) -> Result<bool, StoreError> {
        check_id(id)?;
        Ok(self.state.write().await.items.remove(&id).is_some())
    }

    async fn test_connection(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::item::SortOrder;

    fn new_item(name: &str, price: f64, category: &str) -> NewItem {
        NewItem {
            name: name.to_string(),
            description: Some(format!("{} description", name)),
            category: Some(category.to_string()),
            price: Some(price),
            tags: vec![],
        }
    }

    async fn seeded() -> MemoryItemStore {
        let store = MemoryItemStore::new();
        store.create_item(new_item("Lamp", 30.0, "home"), None).await.unwrap();
        store.create_item(new_item("Desk", 120.0, "office"), None).await.unwrap();
        store.create_item(new_item("Chair", 60.0, "office"), None).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let store = seeded().await;
        let item = store.get_item(2).await.unwrap().unwrap();
        assert_eq!(item.name, "Desk");
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let store = seeded().await;
        let err = store
            .create_item(new_item("lamp", 1.0, "home"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let err = store
            .update_item(
                2,
                ItemPatch {
                    name: Some("CHAIR".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_filters_sorts_and_paginates() {
        let store = seeded().await;
        let query = ListQuery {
            category: Some("office".to_string()),
            sort: SortOrder::parse("price").unwrap(),
            limit: 1,
            page: 2,
            ..Default::default()
        };
        let page = store.list_items(&query).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Desk");
    }

    #[tokio::test]
    async fn test_duplicate_name_ignores_unicode_case() {
        let store = MemoryItemStore::new();
        store.create_item(new_item("Äpfel", 2.0, "food"), None).await.unwrap();
        let err = store
            .create_item(new_item("äPFEL", 3.0, "food"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_page_past_addressable_range_is_empty() {
        let store = seeded().await;
        let query = ListQuery {
            page: i64::MAX as u64,
            limit: 100,
            ..Default::default()
        };
        let page = store.list_items(&query).await.unwrap();
        assert_eq!(page.total, 3);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let store = seeded().await;
        let query = ListQuery {
            search: Some("LAMP".to_string()),
            ..Default::default()
        };
        let page = store.list_items(&query).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let store = seeded().await;
        assert!(store
            .update_item(99, ItemPatch::default())
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete_item(99).await.unwrap());
        assert!(store.delete_item(1).await.unwrap());
        assert!(store.get_item(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_positive_id_is_invalid() {
        let store = seeded().await;
        assert!(matches!(
            store.get_item(0).await.unwrap_err(),
            StoreError::InvalidId(_)
        ));
    }
}
