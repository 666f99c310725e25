use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::item::{Item, ItemPatch, ListQuery, NewItem, SortField, SortOrder};
use crate::store::backend::{Page, StoreError};

/// Translate driver errors into store errors the API layer understands
pub fn store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Conflict("Item with this name already exists".to_string());
        }
    }

    if matches!(
        err,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
    ) {
        return StoreError::Unavailable(err.to_string());
    }

    StoreError::Backend(anyhow::Error::new(err).context("PostgreSQL query failed"))
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ListQuery) {
    let mut separator = " WHERE ";

    if let Some(category) = &query.category {
        builder
            .push(separator)
            .push("category = ")
            .push_bind(category.clone());
        separator = " AND ";
    }

    if let Some(search) = &query.search {
        let pattern = format!("%{}%", escape_like(search));
        builder
            .push(separator)
            .push("(name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn order_clause(sort: SortOrder) -> &'static str {
    match (sort.field, sort.descending) {
        (SortField::Name, false) => "LOWER(name) ASC, id ASC",
        (SortField::Name, true) => "LOWER(name) DESC, id DESC",
        (SortField::Price, false) => "price ASC NULLS FIRST, id ASC",
        (SortField::Price, true) => "price DESC NULLS LAST, id DESC",
        (SortField::CreatedAt, false) => "created_at ASC, id ASC",
        (SortField::CreatedAt, true) => "created_at DESC, id DESC",
    }
}

pub async fn list_items(pool: &PgPool, query: &ListQuery) -> Result<Page<Item>, StoreError> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM items");
    push_filters(&mut count, query);
    let total: i64 = count
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .map_err(store_error)?;
    let total = total.max(0) as u64;

    let Some(offset) = query.offset().and_then(|o| i64::try_from(o).ok()) else {
        return Ok(Page {
            items: Vec::new(),
            total,
        });
    };

    let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM items");
    push_filters(&mut select, query);
    select
        .push(" ORDER BY ")
        .push(order_clause(query.sort))
        .push(" LIMIT ")
        .push_bind(query.limit as i64)
        .push(" OFFSET ")
        .push_bind(offset);

    let items = select
        .build_query_as::<Item>()
        .fetch_all(pool)
        .await
        .map_err(store_error)?;

    Ok(Page { items, total })
}

pub async fn get_item(pool: &PgPool, id: i64) -> Result<Option<Item>, StoreError> {
    sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(store_error)
}

pub async fn create_item(
    pool: &PgPool,
    item: NewItem,
    created_by: Option<String>,
) -> Result<Item, StoreError> {
    sqlx::query_as::<_, Item>(
        r#"
        INSERT INTO items (name, description, category, price, tags, created_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(item.name)
    .bind(item.description)
    .bind(item.category)
    .bind(item.price)
    .bind(item.tags)
    .bind(created_by)
    .fetch_one(pool)
    .await
    .map_err(store_error)
}

pub async fn update_item(
    pool: &PgPool,
    id: i64,
    patch: ItemPatch,
) -> Result<Option<Item>, StoreError> {
    sqlx::query_as::<_, Item>(
        r#"
        UPDATE items SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            category = COALESCE($4, category),
            price = COALESCE($5, price),
            tags = COALESCE($6, tags),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(patch.name)
    .bind(patch.description)
    .bind(patch.category)
    .bind(patch.price)
    .bind(patch.tags)
    .fetch_optional(pool)
    .await
    .map_err(store_error)
}

pub async fn delete_item(pool: &PgPool, id: i64) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM items WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(store_error)?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_filters_render_where_clause() {
        let query = ListQuery {
            category: Some("office".to_string()),
            search: Some("desk".to_string()),
            ..Default::default()
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM items");
        push_filters(&mut builder, &query);
        assert_eq!(
            builder.sql(),
            "SELECT * FROM items WHERE category = $1 AND (name ILIKE $2 OR description ILIKE $3)"
        );
    }

    #[test]
    fn test_order_clause() {
        assert_eq!(order_clause(SortOrder::default()), "created_at DESC, id DESC");
        assert_eq!(
            order_clause(SortOrder::parse("name").unwrap()),
            "LOWER(name) ASC, id ASC"
        );
    }

    #[test]
    fn test_pool_timeout_is_unavailable() {
        assert!(matches!(
            store_error(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            store_error(sqlx::Error::RowNotFound),
            StoreError::Backend(_)
        ));
    }
}
