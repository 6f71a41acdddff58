//! Conditions gating rule activation.
//!
//! A [`Condition`] is a boolean predicate over an [`EvaluationContext`]. The
//! set of condition kinds is closed: value comparisons, context checks,
//! custom predicates and logical combinators. Evaluation is a single match
//! over [`ConditionKind`].
//!
//! Conditions never fail outward. Internal failures (a bad length threshold,
//! a failing predicate) are logged and count as `false`; a disabled
//! condition always evaluates to `true`.

pub mod attribute;
pub mod custom;
pub mod logical;
pub mod value;

pub use attribute::{ContextCondition, ContextOperator};
pub use custom::{ConditionPredicate, CustomCondition};
pub use logical::{LogicalCondition, LogicalOperator};
pub use value::{ValueCondition, ValueOperator};

use crate::core::context::EvaluationContext;
use crate::core::error::{ConditionResult, EvalResult};
use crate::core::types::Value;
use std::collections::BTreeMap;
use std::fmt;

/// The closed set of condition kinds.
#[derive(Debug, Clone)]
pub enum ConditionKind {
    /// Compare the primary value to a constant.
    Value(ValueCondition),
    /// Inspect a named attribute or the value's type.
    Context(ContextCondition),
    /// Arbitrary predicate.
    Custom(CustomCondition),
    /// AND/OR/NOT/XOR over child conditions.
    Logical(LogicalCondition),
}

/// A boolean predicate over an evaluation context.
///
/// Immutable apart from the enabled flag and, for logical conditions, the
/// arity-checked child list.
#[derive(Debug, Clone)]
pub struct Condition {
    kind: ConditionKind,
    enabled: bool,
    description: Option<String>,
    metadata: BTreeMap<String, Value>,
}

impl Condition {
    /// Wrap a condition kind.
    pub fn new(kind: ConditionKind) -> Self {
        Self {
            kind,
            enabled: true,
            description: None,
            metadata: BTreeMap::new(),
        }
    }

    // ========================================================================
    // Value conditions
    // ========================================================================

    /// Compare the primary value using `operator`.
    pub fn value(operator: ValueOperator, target: impl Into<Value>) -> Self {
        ValueCondition::new(operator, target).into()
    }

    /// Value equals `target`.
    pub fn equals(target: impl Into<Value>) -> Self {
        Self::value(ValueOperator::Equals, target)
    }

    /// Value starts with `prefix`.
    pub fn starts_with(prefix: impl Into<Value>) -> Self {
        Self::value(ValueOperator::StartsWith, prefix)
    }

    /// Value ends with `suffix`.
    pub fn ends_with(suffix: impl Into<Value>) -> Self {
        Self::value(ValueOperator::EndsWith, suffix)
    }

    /// Value contains `needle`.
    pub fn contains(needle: impl Into<Value>) -> Self {
        Self::value(ValueOperator::Contains, needle)
    }

    /// Value matches the regex `pattern` (unanchored).
    pub fn matches(pattern: &str) -> Self {
        Self::value(ValueOperator::Matches, pattern)
    }

    // ========================================================================
    // Context conditions
    // ========================================================================

    /// The attribute `name` is present.
    pub fn has_attribute(name: impl Into<String>) -> Self {
        ContextCondition::new(ContextOperator::HasAttribute, name, None).into()
    }

    /// The attribute `name` equals `expected` exactly.
    pub fn attribute_equals(name: impl Into<String>, expected: impl Into<Value>) -> Self {
        ContextCondition::new(ContextOperator::AttributeEquals, name, Some(expected.into())).into()
    }

    /// The primary value's type name is `type_name`.
    pub fn is_type(type_name: &str) -> Self {
        ContextCondition::new(ContextOperator::IsType, "", Some(Value::from(type_name))).into()
    }

    // ========================================================================
    // Custom conditions
    // ========================================================================

    /// Wrap an infallible predicate.
    pub fn custom<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&EvaluationContext) -> bool + Send + Sync + 'static,
    {
        CustomCondition::new(description, predicate).into()
    }

    /// Wrap a predicate that can fail.
    pub fn try_custom<F, E>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&EvaluationContext) -> Result<bool, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        CustomCondition::fallible(description, predicate).into()
    }

    // ========================================================================
    // Logical conditions
    // ========================================================================

    /// All children must hold.
    pub fn and(conditions: Vec<Condition>) -> Self {
        Self::new(ConditionKind::Logical(LogicalCondition::fixed(LogicalOperator::And, conditions)))
    }

    /// Any child must hold.
    pub fn or(conditions: Vec<Condition>) -> Self {
        Self::new(ConditionKind::Logical(LogicalCondition::fixed(LogicalOperator::Or, conditions)))
    }

    /// Negate a condition.
    pub fn not(condition: Condition) -> Self {
        Self::new(ConditionKind::Logical(LogicalCondition::fixed(
            LogicalOperator::Not,
            vec![condition],
        )))
    }

    /// Exactly one of two conditions must hold.
    pub fn xor(first: Condition, second: Condition) -> Self {
        Self::new(ConditionKind::Logical(LogicalCondition::fixed(
            LogicalOperator::Xor,
            vec![first, second],
        )))
    }

    /// Combine children with an operator chosen at runtime.
    pub fn logical(operator: LogicalOperator, conditions: Vec<Condition>) -> ConditionResult<Self> {
        Ok(LogicalCondition::new(operator, conditions)?.into())
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Attach a description used in log messages.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Start disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The condition kind.
    pub fn kind(&self) -> &ConditionKind {
        &self.kind
    }

    /// Mutable access to a logical condition's child list.
    pub fn as_logical_mut(&mut self) -> Option<&mut LogicalCondition> {
        match &mut self.kind {
            ConditionKind::Logical(logical) => Some(logical),
            _ => None,
        }
    }

    /// Whether the condition is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the condition.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Description, if one was attached.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Metadata entries.
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    /// Evaluate, folding internal failures into `false`.
    pub fn evaluate(&self, ctx: &EvaluationContext) -> bool {
        match self.try_evaluate(ctx) {
            Ok(result) => result,
            Err(e) => {
                log::error!("Error evaluating condition {}: {}", self, e);
                false
            }
        }
    }

    /// Evaluate, reporting internal failures.
    ///
    /// Failures inside children of a logical condition are already folded
    /// into `false` by the time the parent sees them.
    pub fn try_evaluate(&self, ctx: &EvaluationContext) -> EvalResult<bool> {
        if !self.enabled {
            return Ok(true);
        }
        ctx.record_condition_evaluation();

        match &self.kind {
            ConditionKind::Value(condition) => condition.evaluate(ctx),
            ConditionKind::Context(condition) => Ok(condition.evaluate(ctx)),
            ConditionKind::Custom(condition) => condition.evaluate(ctx),
            ConditionKind::Logical(condition) => Ok(condition.evaluate(ctx)),
        }
    }
}

impl From<ConditionKind> for Condition {
    fn from(kind: ConditionKind) -> Self {
        Self::new(kind)
    }
}

impl From<ValueCondition> for Condition {
    fn from(condition: ValueCondition) -> Self {
        Self::new(ConditionKind::Value(condition))
    }
}

impl From<ContextCondition> for Condition {
    fn from(condition: ContextCondition) -> Self {
        Self::new(ConditionKind::Context(condition))
    }
}

impl From<CustomCondition> for Condition {
    fn from(condition: CustomCondition) -> Self {
        Self::new(ConditionKind::Custom(condition))
    }
}

impl From<LogicalCondition> for Condition {
    fn from(condition: LogicalCondition) -> Self {
        Self::new(ConditionKind::Logical(condition))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(description) = &self.description {
            return f.write_str(description);
        }
        match &self.kind {
            ConditionKind::Value(c) => c.fmt(f),
            ConditionKind::Context(c) => c.fmt(f),
            ConditionKind::Custom(c) => c.fmt(f),
            ConditionKind::Logical(c) => c.fmt(f),
        }
    }
}

// ============================================================================
// Shorthand
// ============================================================================

/// Ergonomic ways to name the shared condition of a conditional rule batch.
///
/// - a ready-made [`Condition`]
/// - an `(operator, value)` pair, compared against the primary value
/// - a bare string, treated as a `starts_with` prefix
#[derive(Debug, Clone)]
pub enum ConditionSpec {
    /// A ready-made condition.
    Condition(Condition),
    /// A value comparison.
    Comparison(ValueOperator, Value),
    /// A `starts_with` prefix.
    Prefix(String),
}

impl ConditionSpec {
    /// Resolve the shorthand into a condition.
    pub fn into_condition(self) -> Condition {
        match self {
            ConditionSpec::Condition(condition) => condition,
            ConditionSpec::Comparison(operator, value) => Condition::value(operator, value),
            ConditionSpec::Prefix(prefix) => Condition::starts_with(prefix),
        }
    }
}

impl From<Condition> for ConditionSpec {
    fn from(condition: Condition) -> Self {
        ConditionSpec::Condition(condition)
    }
}

impl<V: Into<Value>> From<(ValueOperator, V)> for ConditionSpec {
    fn from((operator, value): (ValueOperator, V)) -> Self {
        ConditionSpec::Comparison(operator, value.into())
    }
}

impl From<&str> for ConditionSpec {
    fn from(prefix: &str) -> Self {
        ConditionSpec::Prefix(prefix.to_string())
    }
}

impl From<String> for ConditionSpec {
    fn from(prefix: String) -> Self {
        ConditionSpec::Prefix(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_condition_is_inert() {
        let mut condition = Condition::equals("never");
        let ctx = EvaluationContext::new("value");
        assert!(!condition.evaluate(&ctx));

        condition.set_enabled(false);
        assert!(condition.evaluate(&ctx));
        assert!(Condition::not(Condition::equals("value")).disabled().evaluate(&ctx));
    }

    #[test]
    fn test_failing_predicate_is_false() {
        let condition = Condition::try_custom("always fails", |_| Err::<bool, _>("boom"));
        let ctx = EvaluationContext::new("value");
        assert!(condition.try_evaluate(&ctx).is_err());
        assert!(!condition.evaluate(&ctx));
        assert!(condition.clone().disabled().evaluate(&ctx));
    }

    #[test]
    fn test_xor_of_value_conditions() {
        let xor = Condition::xor(Condition::starts_with("te"), Condition::ends_with("st"));
        assert!(xor.evaluate(&EvaluationContext::new("tent")));
        assert!(xor.evaluate(&EvaluationContext::new("best")));
        assert!(!xor.evaluate(&EvaluationContext::new("test")));
        assert!(!xor.evaluate(&EvaluationContext::new("other")));
    }

    #[test]
    fn test_nested_logical() {
        let condition = Condition::and(vec![
            Condition::or(vec![Condition::starts_with("."), Condition::starts_with("/")]),
            Condition::not(Condition::contains(" ")),
        ]);
        assert!(condition.evaluate(&EvaluationContext::new(".bashrc")));
        assert!(condition.evaluate(&EvaluationContext::new("/etc")));
        assert!(!condition.evaluate(&EvaluationContext::new(".my file")));
        assert!(!condition.evaluate(&EvaluationContext::new("plain")));
    }

    #[test]
    fn test_logical_mutation_through_condition() {
        let mut condition = Condition::logical(LogicalOperator::Or, vec![]).unwrap();
        let logical = condition.as_logical_mut().unwrap();
        logical.add_condition(Condition::equals("a")).unwrap();
        assert!(condition.evaluate(&EvaluationContext::new("a")));
        assert!(!condition.evaluate(&EvaluationContext::new("b")));

        assert!(Condition::equals("a").as_logical_mut().is_none());
    }

    #[test]
    fn test_evaluations_are_counted() {
        let ctx = EvaluationContext::new("abc");
        let condition = Condition::and(vec![Condition::starts_with("a"), Condition::ends_with("c")]);
        condition.evaluate(&ctx);
        assert_eq!(ctx.condition_evaluations(), 3);
    }

    #[test]
    fn test_condition_spec_shorthand() {
        let ctx = EvaluationContext::new(".bashrc");
        assert!(ConditionSpec::from(".").into_condition().evaluate(&ctx));
        assert!(ConditionSpec::from((ValueOperator::EndsWith, "rc"))
            .into_condition()
            .evaluate(&ctx));
        assert!(!ConditionSpec::from(Condition::equals("x"))
            .into_condition()
            .evaluate(&ctx));
    }

    #[test]
    fn test_display_uses_description() {
        let condition = Condition::starts_with(".").with_description("dotfile");
        assert_eq!(condition.to_string(), "dotfile");
        assert_eq!(Condition::starts_with(".").to_string(), "ValueCondition(starts_with=.)");
    }
}
