//! Evaluation context.
//!
//! The context carries the primary value under validation together with a
//! flat attribute mapping and free-form metadata. Conditions and rules read
//! from it; nothing they do mutates the caller-visible attributes.

use crate::core::types::Value;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

const STR_VALUE_KEY: &str = "str_value";

/// Context provided during condition and rule evaluation.
///
/// Attribute lookups chain to the parent context when a name is missing
/// locally; the parent is never mutated. Derived values (the stringified
/// primary value and anything a custom condition wants to memoize) live in a
/// lazily filled cache scoped to this context.
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    /// Primary value being validated.
    value: Value,
    /// Named attributes.
    attributes: BTreeMap<String, Value>,
    /// Free-form metadata.
    metadata: BTreeMap<String, Value>,
    /// Fallback for attribute lookups.
    parent: Option<Box<EvaluationContext>>,
    /// Lazily computed values.
    computed: RefCell<HashMap<String, Value>>,
    /// Number of conditions evaluated against this context.
    condition_evaluations: Cell<u64>,
}

/// Immutable copy of a context's visible state, attached to violations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContextSnapshot {
    /// Attributes visible from the context, parents included.
    pub attributes: BTreeMap<String, Value>,
    /// Context metadata.
    pub metadata: BTreeMap<String, Value>,
    /// Type name of the primary value.
    pub type_name: String,
}

impl EvaluationContext {
    /// Create a new context for a value.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    /// Set all attributes at once.
    pub fn with_attributes(mut self, attributes: BTreeMap<String, Value>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Add a single attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Chain attribute lookups to a parent context.
    pub fn with_parent(mut self, parent: EvaluationContext) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Re-bind this context to another primary value.
    ///
    /// Attributes, metadata and parent are kept; derived values are dropped.
    pub fn rebind(mut self, value: Value) -> Self {
        if self.value != value {
            self.value = value;
            self.computed.get_mut().clear();
        }
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The primary value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Local attributes (without the parent chain).
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Metadata entries.
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// The parent context, if any.
    pub fn parent(&self) -> Option<&EvaluationContext> {
        self.parent.as_deref()
    }

    /// Look up an attribute here or in the parent chain.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        match self.attributes.get(name) {
            Some(value) => Some(value),
            None => self.parent.as_ref().and_then(|p| p.attribute(name)),
        }
    }

    /// Look up an attribute, falling back to a default.
    pub fn attribute_or<'a>(&'a self, name: &str, default: &'a Value) -> &'a Value {
        self.attribute(name).unwrap_or(default)
    }

    /// Check whether an attribute exists here or in the parent chain.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
            || self.parent.as_ref().is_some_and(|p| p.has_attribute(name))
    }

    /// Type name of the primary value.
    pub fn type_name(&self) -> &'static str {
        self.value.type_name()
    }

    // ========================================================================
    // Computed Values
    // ========================================================================

    /// Stringified primary value, computed once per context.
    pub fn str_value(&self) -> String {
        match self.computed_or_insert_with(STR_VALUE_KEY, || Value::String(self.value.to_string())) {
            Value::String(s) => s,
            other => other.to_string(),
        }
    }

    /// Character length of the stringified primary value.
    pub fn length(&self) -> usize {
        if self.value.is_none() {
            return 0;
        }
        self.str_value().chars().count()
    }

    /// Get a previously computed value.
    pub fn computed_value(&self, key: &str) -> Option<Value> {
        self.computed.borrow().get(key).cloned()
    }

    /// Store a computed value.
    pub fn set_computed_value(&self, key: impl Into<String>, value: Value) {
        self.computed.borrow_mut().insert(key.into(), value);
    }

    /// Get a computed value, computing and storing it on first access.
    pub fn computed_or_insert_with<F>(&self, key: &str, compute: F) -> Value
    where
        F: FnOnce() -> Value,
    {
        if let Some(value) = self.computed_value(key) {
            return value;
        }
        let value = compute();
        self.set_computed_value(key, value.clone());
        value
    }

    // ========================================================================
    // Bookkeeping
    // ========================================================================

    pub(crate) fn record_condition_evaluation(&self) {
        self.condition_evaluations
            .set(self.condition_evaluations.get() + 1);
    }

    /// Number of conditions evaluated against this context so far.
    pub fn condition_evaluations(&self) -> u64 {
        self.condition_evaluations.get()
    }

    /// Capture the visible attributes and metadata.
    pub fn snapshot(&self) -> ContextSnapshot {
        let mut attributes = self
            .parent
            .as_ref()
            .map(|p| p.snapshot().attributes)
            .unwrap_or_default();
        attributes.extend(self.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));

        ContextSnapshot {
            attributes,
            metadata: self.metadata.clone(),
            type_name: self.type_name().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_chains_to_parent() {
        let parent = EvaluationContext::new("parent").with_attribute("kind", "file");
        let ctx = EvaluationContext::new("child")
            .with_attribute("local", 1)
            .with_parent(parent);

        assert!(ctx.has_attribute("kind"));
        assert!(ctx.has_attribute("local"));
        assert!(!ctx.has_attribute("missing"));
        assert_eq!(ctx.attribute("kind"), Some(&Value::from("file")));
        assert_eq!(ctx.parent().unwrap().attributes().len(), 1);
    }

    #[test]
    fn test_local_attribute_shadows_parent() {
        let parent = EvaluationContext::new("p").with_attribute("kind", "file");
        let ctx = EvaluationContext::new("c")
            .with_attribute("kind", "dir")
            .with_parent(parent);

        assert_eq!(ctx.attribute("kind"), Some(&Value::from("dir")));
        assert_eq!(ctx.snapshot().attributes.get("kind"), Some(&Value::from("dir")));
    }

    #[test]
    fn test_computed_values_are_cached() {
        let ctx = EvaluationContext::new("abc");
        let mut calls = 0;
        let first = ctx.computed_or_insert_with("upper", || {
            calls += 1;
            Value::from("ABC")
        });
        let second = ctx.computed_or_insert_with("upper", || Value::from("other"));

        assert_eq!(calls, 1);
        assert_eq!(first, second);
        assert_eq!(ctx.str_value(), "abc");
        assert_eq!(ctx.length(), 3);
    }

    #[test]
    fn test_rebind_drops_derived_values() {
        let ctx = EvaluationContext::new("old").with_attribute("a", 1);
        assert_eq!(ctx.str_value(), "old");

        let ctx = ctx.rebind(Value::from("new"));
        assert_eq!(ctx.str_value(), "new");
        assert!(ctx.has_attribute("a"));
    }

    #[test]
    fn test_none_value_has_zero_length() {
        let ctx = EvaluationContext::new(Value::None);
        assert_eq!(ctx.length(), 0);
        assert_eq!(ctx.type_name(), "none");
    }
}
