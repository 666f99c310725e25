use super::rules::{FieldRules, FieldType, RuleConfigError, RuleSet};

pub const NAME_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 500;
pub const CATEGORY_MAX_LEN: usize = 50;
pub const MAX_TAGS: usize = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

pub const SORT_FIELDS: &[&str] = &["name", "-name", "price", "-price", "createdAt", "-createdAt"];

/// Rule sets for the item resource, compiled once at startup
#[derive(Debug, Clone)]
pub struct ItemRules {
    pub create: RuleSet,
    pub update: RuleSet,
    pub list: RuleSet,
}

impl ItemRules {
    pub fn new() -> Result<Self, RuleConfigError> {
        Ok(Self {
            create: item_body(true)?,
            update: item_body(false)?,
            list: list_query(),
        })
    }
}

fn item_body(create: bool) -> Result<RuleSet, RuleConfigError> {
    let name = if create {
        FieldRules::new("name").required().message("Name is required")
    } else {
        FieldRules::new("name")
    };
    let name = name
        .of_type(FieldType::String)
        .length(Some(1), Some(NAME_MAX_LEN))
        .message(format!("Name must be between 1 and {} characters", NAME_MAX_LEN));
    // `required` already rejects blank names on create
    let name = if create {
        name
    } else {
        name.pattern(r"\S")?.message("Name is required")
    };

    Ok(RuleSet::new()
        .field(name)
        .field(
            FieldRules::new("description")
                .of_type(FieldType::String)
                .length(None, Some(DESCRIPTION_MAX_LEN))
                .message(format!(
                    "Description cannot exceed {} characters",
                    DESCRIPTION_MAX_LEN
                )),
        )
        .field(
            FieldRules::new("category")
                .of_type(FieldType::String)
                .length(Some(1), Some(CATEGORY_MAX_LEN))
                .pattern(r"^[A-Za-z0-9 _-]+$")?
                .message("Category may only contain letters, digits, spaces, '-' and '_'"),
        )
        .field(
            FieldRules::new("price")
                .of_type(FieldType::Number)
                .message("Price must be a number")
                .range(Some(0.0), None)
                .message("Price must be a positive number"),
        )
        .field(
            FieldRules::new("tags")
                .of_type(FieldType::Array)
                .message("Tags must be an array")
                .array_of(FieldType::String)
                .length(None, Some(MAX_TAGS)),
        ))
}

/// Query parameters arrive as strings, so numeric checks use `integer`
fn list_query() -> RuleSet {
    RuleSet::new()
        .field(
            FieldRules::new("page")
                .integer(Some(1), None)
                .message("Page must be a positive integer"),
        )
        .field(
            FieldRules::new("limit")
                .integer(Some(1), Some(MAX_PAGE_LIMIT))
                .message(format!("Limit must be between 1 and {}", MAX_PAGE_LIMIT)),
        )
        .field(FieldRules::new("search").length(None, Some(NAME_MAX_LEN)))
        .field(FieldRules::new("category").length(None, Some(CATEGORY_MAX_LEN)))
        .field(FieldRules::new("sort").one_of(SORT_FIELDS.iter().copied()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::evaluate;
    use serde_json::json;

    #[test]
    fn test_rules_compile() {
        let rules = ItemRules::new().unwrap();
        assert!(!rules.create.is_empty());
        assert_eq!(rules.create.len(), rules.update.len());
    }

    #[test]
    fn test_update_rejects_blank_name() {
        let rules = ItemRules::new().unwrap();
        let failures = evaluate(&rules.update, &json!({"name": "   "})).unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].field, "name");
        assert_eq!(failures[0].message, "Name is required");

        assert!(evaluate(&rules.update, &json!({"name": " Lamp "}))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_create_requires_name() {
        let rules = ItemRules::new().unwrap();
        let failures = evaluate(&rules.create, &json!({})).unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].field, "name");
        assert_eq!(failures[0].message, "Name is required");
    }

    #[test]
    fn test_update_allows_partial_body() {
        let rules = ItemRules::new().unwrap();
        assert!(evaluate(&rules.update, &json!({"price": 12.5}))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_create_reports_every_bad_field() {
        let rules = ItemRules::new().unwrap();
        let failures = evaluate(
            &rules.create,
            &json!({
                "name": "",
                "price": -1,
                "category": "bad/category",
                "tags": 5
            }),
        )
        .unwrap();
        let fields: Vec<_> = failures.iter().map(|f| f.field.as_str()).collect();
        // Blank name violates both `required` and the length bound.
        assert_eq!(fields, vec!["name", "name", "category", "price", "tags"]);
    }

    #[test]
    fn test_list_query_rules() {
        let rules = ItemRules::new().unwrap();
        assert!(evaluate(&rules.list, &json!({"page": "2", "limit": "20", "sort": "-price"}))
            .unwrap()
            .is_empty());

        let failures = evaluate(&rules.list, &json!({"page": "0", "limit": "500", "sort": "id"})).unwrap();
        assert_eq!(failures.len(), 3);
        assert_eq!(failures[1].message, "Limit must be between 1 and 100");
    }
}
