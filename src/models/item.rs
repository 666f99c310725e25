use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
#[cfg(feature = "postgres")]
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// A stored item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres", derive(FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub tags: Vec<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating an item
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewItem {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Payload for updating an item; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub tags: Option<Vec<String>>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.tags.is_none()
    }

    pub fn apply(self, item: &mut Item) {
        if let Some(name) = self.name {
            item.name = name;
        }
        if let Some(description) = self.description {
            item.description = Some(description);
        }
        if let Some(category) = self.category {
            item.category = Some(category);
        }
        if let Some(price) = self.price {
            item.price = Some(price);
        }
        if let Some(tags) = self.tags {
            item.tags = tags;
        }
    }
}

/// Raw list query parameters as received on the wire
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Page number, starting at 1 (default: 1)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    /// Items per page, 1-100 (default: 10)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    /// Case-insensitive substring matched against name and description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Exact category filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Sort key, prefix with '-' for descending (default: -createdAt)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Price,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: SortField,
    pub descending: bool,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            descending: true,
        }
    }
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        let (descending, key) = match value.strip_prefix('-') {
            Some(key) => (true, key),
            None => (false, value),
        };
        let field = match key {
            "name" => SortField::Name,
            "price" => SortField::Price,
            "createdAt" => SortField::CreatedAt,
            _ => return None,
        };
        Some(Self { field, descending })
    }
}

/// Validated, typed list query
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub page: u64,
    pub limit: u64,
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: SortOrder,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search: None,
            category: None,
            sort: SortOrder::default(),
        }
    }
}

impl ListQuery {
    /// Rows to skip, `None` when the page lies beyond any addressable row
    pub fn offset(&self) -> Option<u64> {
        self.page.saturating_sub(1).checked_mul(self.limit)
    }
}

impl TryFrom<ListParams> for ListQuery {
    type Error = anyhow::Error;

    /// Expects parameters that already passed the list rule set
    fn try_from(params: ListParams) -> Result<Self> {
        let defaults = ListQuery::default();
        let page = match params.page {
            Some(page) => page.trim().parse().context("page is not an integer")?,
            None => defaults.page,
        };
        let limit = match params.limit {
            Some(limit) => limit.trim().parse().context("limit is not an integer")?,
            None => defaults.limit,
        };
        let sort = match params.sort {
            Some(sort) => SortOrder::parse(&sort).context("unknown sort key")?,
            None => defaults.sort,
        };

        Ok(Self {
            page,
            limit,
            search: params.search.filter(|s| !s.trim().is_empty()),
            category: params.category.filter(|s| !s.trim().is_empty()),
            sort,
        })
    }
}
