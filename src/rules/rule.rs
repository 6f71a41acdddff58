//! Validation rules.
//!
//! A rule is a named, severity-tagged test over a value. It is active only
//! when all of its activation conditions hold, and it may declare other
//! rules it depends on so the engine runs them first.

use crate::conditions::Condition;
use crate::core::context::EvaluationContext;
use crate::core::error::{EvalResult, EvaluationError};
use crate::core::types::{Severity, Value};
use crate::validation::result::Violation;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Predicate signature for predicate patterns.
pub type RulePredicate = dyn Fn(&Value) -> EvalResult<bool> + Send + Sync;

/// What a rule tests.
#[derive(Clone)]
pub enum Pattern {
    /// Unanchored regex search over the stringified value.
    Regex {
        /// Pattern source.
        source: String,
        /// Compiled pattern, or the compile error.
        compiled: Result<Regex, String>,
    },
    /// Arbitrary predicate over the value.
    Predicate(Arc<RulePredicate>),
}

impl Pattern {
    /// Compile a regex pattern. An invalid pattern is logged and turns every
    /// evaluation into an error.
    pub fn regex(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = Regex::new(&source).map_err(|e| e.to_string());
        if let Err(e) = &compiled {
            log::warn!("Invalid regex pattern '{}': {}", source, e);
        }
        Pattern::Regex { source, compiled }
    }

    /// Wrap an infallible predicate.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Pattern::Predicate(Arc::new(move |value: &Value| -> EvalResult<bool> {
            Ok(predicate(value))
        }))
    }

    /// Wrap a predicate that can fail.
    pub fn try_predicate<F, E>(predicate: F) -> Self
    where
        F: Fn(&Value) -> Result<bool, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        Pattern::Predicate(Arc::new(move |value: &Value| -> EvalResult<bool> {
            predicate(value).map_err(EvaluationError::predicate)
        }))
    }

    /// Test a value against the pattern.
    pub fn test(&self, value: &Value) -> EvalResult<bool> {
        match self {
            Pattern::Regex {
                compiled: Ok(regex),
                ..
            } => Ok(regex.is_match(&value.to_string())),
            Pattern::Regex {
                source,
                compiled: Err(reason),
            } => Err(EvaluationError::InvalidPattern {
                pattern: source.clone(),
                reason: reason.clone(),
            }),
            Pattern::Predicate(predicate) => predicate(value),
        }
    }
}

impl From<&str> for Pattern {
    fn from(source: &str) -> Self {
        Pattern::regex(source)
    }
}

impl From<String> for Pattern {
    fn from(source: String) -> Self {
        Pattern::regex(source)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Regex { source, compiled } => f
                .debug_struct("Regex")
                .field("source", source)
                .field("valid", &compiled.is_ok())
                .finish(),
            Pattern::Predicate(_) => f.write_str("Predicate(<predicate>)"),
        }
    }
}

/// One or more activation conditions.
///
/// Lets [`Rule::conditional`] accept either a single condition or a list.
#[derive(Debug, Clone, Default)]
pub struct ConditionSet(pub Vec<Condition>);

impl From<Condition> for ConditionSet {
    fn from(condition: Condition) -> Self {
        ConditionSet(vec![condition])
    }
}

impl From<Vec<Condition>> for ConditionSet {
    fn from(conditions: Vec<Condition>) -> Self {
        ConditionSet(conditions)
    }
}

/// Execution statistics for one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleStats {
    /// Rule name.
    pub name: String,
    /// Times the pattern was evaluated.
    pub executions: u64,
    /// Violations produced.
    pub violations: u64,
    /// `violations / max(executions, 1)`.
    pub violation_rate: f64,
    /// Whether the rule is enabled.
    pub enabled: bool,
    /// Whether the rule has activation conditions.
    pub has_conditions: bool,
    /// Number of declared dependencies.
    pub dependencies: usize,
    /// Number of registered dependents.
    pub dependents: usize,
}

/// A named validation rule.
///
/// Rules are built standalone and then registered into a
/// [`RuleEngine`](crate::engine::RuleEngine), which owns execution ordering
/// and keeps the dependency/dependent names consistent in both directions.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    pattern: Pattern,
    severity: Severity,
    description: String,
    inverse: bool,
    enabled: bool,
    tags: Vec<String>,
    metadata: BTreeMap<String, Value>,
    activation_conditions: Vec<Condition>,
    dependencies: Vec<String>,
    dependents: Vec<String>,
    execution_count: u64,
    violation_count: u64,
}

impl Rule {
    /// Create an error-severity rule that is always active.
    pub fn new(name: impl Into<String>, pattern: impl Into<Pattern>) -> Self {
        let name = name.into();
        Self {
            description: format!("Rule: {}", name),
            name,
            pattern: pattern.into(),
            severity: Severity::Error,
            inverse: false,
            enabled: true,
            tags: Vec::new(),
            metadata: BTreeMap::new(),
            activation_conditions: Vec::new(),
            dependencies: Vec::new(),
            dependents: Vec::new(),
            execution_count: 0,
            violation_count: 0,
        }
    }

    /// Create a rule gated on one condition or a list of conditions.
    pub fn conditional(
        name: impl Into<String>,
        pattern: impl Into<Pattern>,
        conditions: impl Into<ConditionSet>,
    ) -> Self {
        let mut rule = Self::new(name, pattern);
        rule.activation_conditions.extend(conditions.into().0);
        rule
    }

    /// Create a rule from a predicate.
    pub fn predicate<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::new(name, Pattern::predicate(predicate))
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Set the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Set the description, used as the violation message.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        if !description.is_empty() {
            self.description = description;
        }
        self
    }

    /// Invert the rule: a match becomes a failure.
    pub fn inverse(self) -> Self {
        self.with_inverse(true)
    }

    /// Set the inverse flag.
    pub fn with_inverse(mut self, inverse: bool) -> Self {
        self.inverse = inverse;
        self
    }

    /// Set the enabled flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add a metadata entry, copied into every violation.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Add an activation condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.activation_conditions.push(condition);
        self
    }

    /// Declare a dependency on another rule.
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.add_dependency(name.into());
        self
    }

    /// Declare several dependencies.
    pub fn with_dependencies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.add_dependency(name.into());
        }
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Unique rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tested pattern.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Violation severity.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Violation message.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the result is inverted.
    pub fn is_inverse(&self) -> bool {
        self.inverse
    }

    /// Whether the rule is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the rule.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Tags.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Metadata.
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// Activation conditions; empty means always active.
    pub fn activation_conditions(&self) -> &[Condition] {
        &self.activation_conditions
    }

    /// Names of rules this rule depends on.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Names of registered rules that depend on this rule.
    pub fn dependents(&self) -> &[String] {
        &self.dependents
    }

    /// Times the pattern was evaluated.
    pub fn execution_count(&self) -> u64 {
        self.execution_count
    }

    /// Violations produced.
    pub fn violation_count(&self) -> u64 {
        self.violation_count
    }

    // ========================================================================
    // Conditions and links
    // ========================================================================

    /// Add an activation condition.
    pub fn add_activation_condition(&mut self, condition: Condition) {
        self.activation_conditions.push(condition);
    }

    /// Remove the activation condition at `index`.
    pub fn remove_activation_condition(&mut self, index: usize) -> Option<Condition> {
        if index < self.activation_conditions.len() {
            Some(self.activation_conditions.remove(index))
        } else {
            None
        }
    }

    /// Returns `false` if the dependency was already declared.
    pub(crate) fn add_dependency(&mut self, name: String) -> bool {
        if self.dependencies.contains(&name) {
            return false;
        }
        self.dependencies.push(name);
        true
    }

    pub(crate) fn remove_dependency(&mut self, name: &str) {
        self.dependencies.retain(|d| d != name);
    }

    pub(crate) fn set_dependents(&mut self, dependents: Vec<String>) {
        self.dependents = dependents;
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    /// Check whether the rule participates for this context.
    ///
    /// Disabled rules are never active. Otherwise every activation condition
    /// must hold; an evaluation failure fails closed.
    pub fn is_active(&self, ctx: &EvaluationContext) -> bool {
        if !self.enabled {
            return false;
        }
        match self.try_is_active(ctx) {
            Ok(active) => active,
            Err(e) => {
                log::error!(
                    "Error evaluating activation conditions for rule '{}': {}",
                    self.name,
                    e
                );
                false
            }
        }
    }

    /// Check activation, reporting the first failing condition.
    pub fn try_is_active(&self, ctx: &EvaluationContext) -> EvalResult<bool> {
        if !self.enabled {
            return Ok(false);
        }
        for (index, condition) in self.activation_conditions.iter().enumerate() {
            let holds = condition
                .try_evaluate(ctx)
                .map_err(|e| EvaluationError::Activation {
                    rule: self.name.clone(),
                    index,
                    reason: e.to_string(),
                })?;
            if !holds {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Check activation for a bare value and raw attributes.
    pub fn should_activate(&self, value: impl Into<Value>, attributes: BTreeMap<String, Value>) -> bool {
        let ctx = EvaluationContext::new(value).with_attributes(attributes);
        self.is_active(&ctx)
    }

    /// Validate a value.
    ///
    /// Builds a context when none is given. Returns `None` when the rule is
    /// inactive or the value passes.
    pub fn validate(&mut self, value: &Value, ctx: Option<&EvaluationContext>) -> Option<Violation> {
        let owned;
        let ctx = match ctx {
            Some(ctx) => ctx,
            None => {
                owned = EvaluationContext::new(value.clone());
                &owned
            }
        };

        if !self.is_active(ctx) {
            return None;
        }
        self.execute(value, ctx)
    }

    /// Validate a value with raw attributes, building the context.
    pub fn validate_with_attributes(
        &mut self,
        value: &Value,
        attributes: BTreeMap<String, Value>,
    ) -> Option<Violation> {
        let ctx = EvaluationContext::new(value.clone()).with_attributes(attributes);
        self.validate(value, Some(&ctx))
    }

    /// Run the pattern without checking activation.
    ///
    /// Pattern failures become violations carrying the error message.
    pub(crate) fn execute(&mut self, value: &Value, ctx: &EvaluationContext) -> Option<Violation> {
        let outcome = self.evaluate_pattern(value);
        self.execution_count += 1;

        match outcome {
            Ok(true) => None,
            Ok(false) => Some(self.violation(value, self.description.clone(), ctx)),
            Err(e) => {
                log::error!("Error validating rule '{}': {}", self.name, e);
                Some(self.violation(value, format!("Rule validation error: {}", e), ctx))
            }
        }
    }

    /// Test the pattern, applying the inverse flag.
    pub fn evaluate_pattern(&self, value: &Value) -> EvalResult<bool> {
        let matched = self.pattern.test(value)?;
        Ok(matched != self.inverse)
    }

    fn violation(&mut self, value: &Value, message: String, ctx: &EvaluationContext) -> Violation {
        self.violation_count += 1;
        Violation {
            rule_name: self.name.clone(),
            severity: self.severity,
            message,
            value: value.clone(),
            context: Some(ctx.snapshot()),
            metadata: self.metadata.clone(),
        }
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Execution statistics.
    pub fn stats(&self) -> RuleStats {
        RuleStats {
            name: self.name.clone(),
            executions: self.execution_count,
            violations: self.violation_count,
            violation_rate: self.violation_count as f64 / self.execution_count.max(1) as f64,
            enabled: self.enabled,
            has_conditions: !self.activation_conditions.is_empty(),
            dependencies: self.dependencies.len(),
            dependents: self.dependents.len(),
        }
    }

    /// Reset execution statistics.
    pub fn reset_stats(&mut self) {
        self.execution_count = 0;
        self.violation_count = 0;
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.enabled { "enabled" } else { "disabled" };
        write!(f, "{} ({})", self.name, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_rule() {
        let mut rule = Rule::new("starts_with_test", "^test");
        assert!(rule.validate(&Value::from("test_value"), None).is_none());

        let violation = rule.validate(&Value::from("other_value"), None).unwrap();
        assert_eq!(violation.rule_name, "starts_with_test");
        assert_eq!(violation.severity, Severity::Error);
        assert_eq!(violation.message, "Rule: starts_with_test");
        assert_eq!(rule.execution_count(), 2);
        assert_eq!(rule.violation_count(), 1);
    }

    #[test]
    fn test_regex_search_is_unanchored() {
        let mut rule = Rule::new("has_digit", r"\d");
        assert!(rule.validate(&Value::from("abc1def"), None).is_none());
    }

    #[test]
    fn test_inverse_rule() {
        let mut rule = Rule::new("no_spaces", r"\s")
            .inverse()
            .with_severity(Severity::Warning)
            .with_description("No spaces allowed");

        assert!(rule.validate(&Value::from("clean"), None).is_none());
        let violation = rule.validate(&Value::from("has space"), None).unwrap();
        assert_eq!(violation.severity, Severity::Warning);
        assert_eq!(violation.message, "No spaces allowed");
    }

    #[test]
    fn test_predicate_rule() {
        let mut rule = Rule::predicate("short", |v| v.to_string().len() <= 5);
        assert!(rule.validate(&Value::from("abc"), None).is_none());
        assert!(rule.validate(&Value::from("abcdefgh"), None).is_some());
        assert!(rule.validate(&Value::from(12345), None).is_none());
    }

    #[test]
    fn test_invalid_regex_becomes_violation() {
        let mut rule = Rule::new("broken", "(unclosed");
        let violation = rule.validate(&Value::from("anything"), None).unwrap();
        assert!(violation.message.starts_with("Rule validation error"));
    }

    #[test]
    fn test_failing_predicate_becomes_violation() {
        let mut rule = Rule::new(
            "numeric",
            Pattern::try_predicate(|v| v.to_string().parse::<i64>().map(|n| n > 0)),
        );
        assert!(rule.validate(&Value::from("7"), None).is_none());
        let violation = rule.validate(&Value::from("seven"), None).unwrap();
        assert!(violation.message.contains("Predicate failed"));
    }

    #[test]
    fn test_inactive_rule_never_violates() {
        let mut rule = Rule::conditional("dotfile", r"^\.[^/]+$", Condition::starts_with("."));
        assert!(rule.validate(&Value::from("plain/file"), None).is_none());
        assert_eq!(rule.execution_count(), 0);

        assert!(rule.validate(&Value::from(".a/b"), None).is_some());
        assert_eq!(rule.execution_count(), 1);
    }

    #[test]
    fn test_disabled_rule_is_inactive() {
        let rule = Rule::new("any", ".*").with_enabled(false);
        assert!(!rule.is_active(&EvaluationContext::new("x")));
    }

    #[test]
    fn test_failing_condition_fails_closed() {
        let rule = Rule::conditional(
            "guarded",
            ".*",
            Condition::try_custom("broken", |_| Err::<bool, _>("boom")),
        );
        let ctx = EvaluationContext::new("x");
        assert!(matches!(
            rule.try_is_active(&ctx),
            Err(EvaluationError::Activation { index: 0, .. })
        ));
        assert!(!rule.is_active(&ctx));
    }

    #[test]
    fn test_conditional_accepts_list() {
        let rule = Rule::conditional(
            "absolute_txt",
            ".*",
            vec![Condition::starts_with("/"), Condition::ends_with(".txt")],
        );
        assert_eq!(rule.activation_conditions().len(), 2);
        assert!(rule.should_activate("/a.txt", BTreeMap::new()));
        assert!(!rule.should_activate("/a.md", BTreeMap::new()));
    }

    #[test]
    fn test_activation_condition_mutation() {
        let mut rule = Rule::new("r", ".*");
        rule.add_activation_condition(Condition::equals("x"));
        assert!(!rule.is_active(&EvaluationContext::new("y")));

        assert!(rule.remove_activation_condition(3).is_none());
        assert!(rule.remove_activation_condition(0).is_some());
        assert!(rule.is_active(&EvaluationContext::new("y")));
    }

    #[test]
    fn test_validate_with_attributes() {
        let mut rule = Rule::conditional("owned", "^/", Condition::has_attribute("owner"));
        let mut attributes = BTreeMap::new();
        attributes.insert("owner".to_string(), Value::from("root"));

        let violation = rule
            .validate_with_attributes(&Value::from("relative"), attributes)
            .unwrap();
        assert_eq!(
            violation.context.unwrap().attributes.get("owner"),
            Some(&Value::from("root"))
        );
    }

    #[test]
    fn test_violation_carries_metadata() {
        let mut rule = Rule::new("r", "^x").with_metadata("category", "path");
        let violation = rule.validate(&Value::from("y"), None).unwrap();
        assert_eq!(violation.metadata.get("category"), Some(&Value::from("path")));
    }

    #[test]
    fn test_stats_and_reset() {
        let mut rule = Rule::new("r", "^x").with_dependency("other").with_dependency("other");
        rule.validate(&Value::from("x"), None);
        rule.validate(&Value::from("y"), None);

        let stats = rule.stats();
        assert_eq!(stats.executions, 2);
        assert_eq!(stats.violations, 1);
        assert_eq!(stats.violation_rate, 0.5);
        assert_eq!(stats.dependencies, 1);

        rule.reset_stats();
        assert_eq!(rule.stats().executions, 0);
        assert_eq!(rule.stats().violation_rate, 0.0);
    }
}
