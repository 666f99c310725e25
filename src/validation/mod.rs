//! Declarative request validation
//!
//! Rules are declared per field and evaluated in order; every violated rule
//! yields one [`ValidationFailure`].

pub mod evaluator;
pub mod rules;
pub mod schemas;

pub use evaluator::{evaluate, ValidationFailure};
pub use rules::{Check, FieldRules, FieldType, Rule, RuleConfigError, RuleSet};
pub use schemas::ItemRules;
