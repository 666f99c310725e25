use regex::Regex;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// A rule set that cannot be evaluated. This is an operator error, never a
/// user input error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleConfigError {
    #[error("validation rule has an empty field name")]
    EmptyField,

    #[error("rule for '{field}' has inverted bounds ({min} > {max})")]
    InvertedBounds {
        field: String,
        min: String,
        max: String,
    },

    #[error("rule for '{field}' has an empty list of allowed values")]
    EmptyChoices { field: String },

    #[error("rule for '{field}' has an invalid pattern: {reason}")]
    InvalidPattern { field: String, reason: String },
}

/// JSON types a field can be checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// A single constraint on a single field
#[derive(Debug, Clone)]
pub enum Check {
    /// Present, not null, not a blank string
    Required,
    Type(FieldType),
    /// A JSON integer or a string holding one, optionally bounded
    IntegerLike { min: Option<i64>, max: Option<i64> },
    /// Character count for strings, element count for arrays
    Length { min: Option<usize>, max: Option<usize> },
    Range { min: Option<f64>, max: Option<f64> },
    OneOf(Vec<String>),
    Pattern(Regex),
    ArrayOf(FieldType),
}

impl Check {
    /// Compile a pattern check. Fails on an invalid regular expression.
    pub fn pattern(field: &str, pattern: &str) -> Result<Self, RuleConfigError> {
        Regex::new(pattern)
            .map(Check::Pattern)
            .map_err(|e| RuleConfigError::InvalidPattern {
                field: field.to_string(),
                reason: e.to_string(),
            })
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub field: String,
    pub check: Check,
    pub message: Option<String>,
}

impl Rule {
    pub fn new(field: impl Into<String>, check: Check) -> Self {
        Self {
            field: field.into(),
            check,
            message: None,
        }
    }

    /// Replace the generated failure message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Reject configurations that cannot be evaluated meaningfully
    pub fn verify(&self) -> Result<(), RuleConfigError> {
        if self.field.trim().is_empty() {
            return Err(RuleConfigError::EmptyField);
        }

        let inverted = |min: String, max: String| RuleConfigError::InvertedBounds {
            field: self.field.clone(),
            min,
            max,
        };

        match &self.check {
            Check::IntegerLike {
                min: Some(min),
                max: Some(max),
            } if min > max => Err(inverted(min.to_string(), max.to_string())),
            Check::Length {
                min: Some(min),
                max: Some(max),
            } if min > max => Err(inverted(min.to_string(), max.to_string())),
            Check::Range {
                min: Some(min),
                max: Some(max),
            } if min > max => Err(inverted(min.to_string(), max.to_string())),
            Check::OneOf(choices) if choices.is_empty() => Err(RuleConfigError::EmptyChoices {
                field: self.field.clone(),
            }),
            _ => Ok(()),
        }
    }
}

/// Ordered collection of rules, evaluated in declaration order
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Append every rule declared for one field
    pub fn field(mut self, field: FieldRules) -> Self {
        self.rules.extend(field.rules);
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Builder for the rules of a single field.
///
/// `message` applies to the most recently added check.
#[derive(Debug, Clone)]
pub struct FieldRules {
    field: String,
    rules: Vec<Rule>,
}

impl FieldRules {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rules: Vec::new(),
        }
    }

    pub fn check(mut self, check: Check) -> Self {
        self.rules.push(Rule::new(self.field.clone(), check));
        self
    }

    pub fn required(self) -> Self {
        self.check(Check::Required)
    }

    pub fn of_type(self, field_type: FieldType) -> Self {
        self.check(Check::Type(field_type))
    }

    pub fn integer(self, min: Option<i64>, max: Option<i64>) -> Self {
        self.check(Check::IntegerLike { min, max })
    }

    pub fn length(self, min: Option<usize>, max: Option<usize>) -> Self {
        self.check(Check::Length { min, max })
    }

    pub fn range(self, min: Option<f64>, max: Option<f64>) -> Self {
        self.check(Check::Range { min, max })
    }

    pub fn one_of<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.check(Check::OneOf(values.into_iter().map(Into::into).collect()))
    }

    pub fn pattern(self, pattern: &str) -> Result<Self, RuleConfigError> {
        let check = Check::pattern(&self.field, pattern)?;
        Ok(self.check(check))
    }

    pub fn array_of(self, field_type: FieldType) -> Self {
        self.check(Check::ArrayOf(field_type))
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        if let Some(last) = self.rules.pop() {
            self.rules.push(last.with_message(message));
        }
        self
    }
}
