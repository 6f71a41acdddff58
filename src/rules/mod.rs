//! Validation rules and ready-made rule sets.

pub mod presets;
pub mod rule;

pub use rule::{ConditionSet, Pattern, Rule, RulePredicate, RuleStats};
