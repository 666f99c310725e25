use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::rules::{Check, Rule, RuleConfigError, RuleSet};

/// One violated rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFailure {
    /// Field path the rule was declared on
    pub field: String,
    /// Human-readable description of the violation
    pub message: String,
    /// Offending value, omitted when the field was absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_value: Option<Value>,
}

/// Run every rule against `input` and collect all failures.
///
/// Evaluation never stops at the first failure. An error is returned only
/// when a rule itself is malformed.
pub fn evaluate(rules: &RuleSet, input: &Value) -> Result<Vec<ValidationFailure>, RuleConfigError> {
    let mut failures = Vec::new();

    for rule in rules.rules() {
        rule.verify()?;

        let value = lookup(input, &rule.field).filter(|v| !v.is_null());
        if let Some(message) = violation(rule, value) {
            failures.push(ValidationFailure {
                field: rule.field.clone(),
                message: rule.message.clone().unwrap_or(message),
                rejected_value: value.cloned(),
            });
        }
    }

    Ok(failures)
}

/// Resolve a dotted field path inside a JSON object
fn lookup<'a>(input: &'a Value, field: &str) -> Option<&'a Value> {
    field
        .split('.')
        .try_fold(input, |current, segment| current.as_object()?.get(segment))
}

/// Default message for a violated rule, `None` when the rule holds
fn violation(rule: &Rule, value: Option<&Value>) -> Option<String> {
    let field = rule.field.as_str();

    let Some(value) = value else {
        return matches!(rule.check, Check::Required).then(|| format!("{} is required", field));
    };

    match &rule.check {
        Check::Required => match value.as_str() {
            Some(s) if s.trim().is_empty() => Some(format!("{} is required", field)),
            _ => None,
        },
        Check::Type(expected) => {
            (!expected.matches(value)).then(|| format!("{} must be a {}", field, expected))
        }
        Check::IntegerLike { min, max } => {
            let parsed = match value {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            match parsed {
                None => Some(format!("{} must be an integer", field)),
                Some(n) if !within(n, *min, *max) => {
                    Some(format!("{} must be an integer {}", field, describe_bounds(*min, *max)))
                }
                Some(_) => None,
            }
        }
        Check::Length { min, max } => {
            let (len, unit) = match value {
                Value::String(s) => (s.chars().count(), "characters"),
                Value::Array(items) => (items.len(), "items"),
                _ => return None,
            };
            (!within(len, *min, *max)).then(|| {
                format!("{} must contain {} {}", field, describe_bounds(*min, *max), unit)
            })
        }
        Check::Range { min, max } => {
            let n = value.as_f64()?;
            (!within(n, *min, *max)).then(|| format!("{} must be {}", field, describe_bounds(*min, *max)))
        }
        Check::OneOf(choices) => {
            let s = value.as_str()?;
            (!choices.iter().any(|c| c == s))
                .then(|| format!("{} must be one of: {}", field, choices.join(", ")))
        }
        Check::Pattern(regex) => {
            let s = value.as_str()?;
            (!regex.is_match(s)).then(|| format!("{} has an invalid format", field))
        }
        Check::ArrayOf(expected) => {
            let items = value.as_array()?;
            (!items.iter().all(|item| expected.matches(item)))
                .then(|| format!("{} must contain only {} values", field, expected))
        }
    }
}

fn within<T: PartialOrd>(value: T, min: Option<T>, max: Option<T>) -> bool {
    min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max)
}

fn describe_bounds<T: std::fmt::Display>(min: Option<T>, max: Option<T>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("between {} and {}", min, max),
        (Some(min), None) => format!("at least {}", min),
        (None, Some(max)) => format!("at most {}", max),
        (None, None) => "in range".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::rules::{FieldRules, FieldType};
    use serde_json::json;

    fn name_rules() -> RuleSet {
        RuleSet::new().field(
            FieldRules::new("name")
                .required()
                .message("Name is required")
                .of_type(FieldType::String)
                .length(Some(1), Some(5)),
        )
    }

    #[test]
    fn test_empty_body_reports_required() {
        let failures = evaluate(&name_rules(), &json!({})).unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].field, "name");
        assert_eq!(failures[0].message, "Name is required");
        assert!(failures[0].rejected_value.is_none());
    }

    #[test]
    fn test_valid_input_has_no_failures() {
        assert!(evaluate(&name_rules(), &json!({"name": "lamp"}))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_all_rules_run_without_short_circuit() {
        let rules = name_rules().field(
            FieldRules::new("price")
                .of_type(FieldType::Number)
                .range(Some(0.0), None),
        );
        let failures = evaluate(&rules, &json!({"name": "far too long", "price": -3})).unwrap();
        let fields: Vec<_> = failures.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "price"]);
        assert_eq!(failures[0].message, "name must contain between 1 and 5 characters");
        assert_eq!(failures[1].message, "price must be at least 0");
        assert_eq!(failures[1].rejected_value, Some(json!(-3)));
    }

    #[test]
    fn test_each_violated_rule_counts_once() {
        let failures = evaluate(&name_rules(), &json!({"name": 42})).unwrap();
        // Type fails; Length does not apply to numbers.
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].message, "name must be a string");
    }

    #[test]
    fn test_blank_string_is_missing() {
        let failures = evaluate(&name_rules(), &json!({"name": "   "})).unwrap();
        assert_eq!(failures[0].message, "Name is required");
    }

    #[test]
    fn test_null_treated_as_absent() {
        let rules = RuleSet::new().field(FieldRules::new("description").of_type(FieldType::String));
        assert!(evaluate(&rules, &json!({"description": null})).unwrap().is_empty());
    }

    #[test]
    fn test_integer_like_accepts_numeric_strings() {
        let rules = RuleSet::new().field(FieldRules::new("page").integer(Some(1), None));
        assert!(evaluate(&rules, &json!({"page": "3"})).unwrap().is_empty());
        assert!(evaluate(&rules, &json!({"page": 3})).unwrap().is_empty());

        let failures = evaluate(&rules, &json!({"page": "abc"})).unwrap();
        assert_eq!(failures[0].message, "page must be an integer");

        let failures = evaluate(&rules, &json!({"page": "0"})).unwrap();
        assert_eq!(failures[0].message, "page must be an integer at least 1");
    }

    #[test]
    fn test_one_of_pattern_and_array_of() {
        let rules = RuleSet::new()
            .field(FieldRules::new("sort").one_of(["name", "-name"]))
            .field(FieldRules::new("code").pattern("^[A-Z]{3}$").unwrap())
            .field(FieldRules::new("tags").array_of(FieldType::String));
        let failures = evaluate(
            &rules,
            &json!({"sort": "price", "code": "abc", "tags": ["a", 1]}),
        )
        .unwrap();
        assert_eq!(failures.len(), 3);
        assert_eq!(failures[0].message, "sort must be one of: name, -name");
        assert_eq!(failures[1].message, "code has an invalid format");
        assert_eq!(failures[2].message, "tags must contain only string values");
    }

    #[test]
    fn test_dotted_paths() {
        let rules = RuleSet::new().field(FieldRules::new("owner.email").required());
        assert!(evaluate(&rules, &json!({"owner": {"email": "a@b.c"}}))
            .unwrap()
            .is_empty());
        assert_eq!(evaluate(&rules, &json!({"owner": {}})).unwrap().len(), 1);
    }

    #[test]
    fn test_non_object_input_has_no_fields() {
        let failures = evaluate(&name_rules(), &json!([1, 2, 3])).unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].field, "name");
    }

    #[test]
    fn test_malformed_rule_is_an_error() {
        let rules = RuleSet::new().rule(Rule::new(
            "price",
            Check::Range {
                min: Some(10.0),
                max: Some(1.0),
            },
        ));
        assert!(evaluate(&rules, &json!({"price": 5})).is_err());
    }

    #[test]
    fn test_failure_serializes_camel_case() {
        let failure = ValidationFailure {
            field: "price".to_string(),
            message: "bad".to_string(),
            rejected_value: Some(json!(-1)),
        };
        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(value["rejectedValue"], json!(-1));
    }
}
