//! Conditions over context attributes.

use crate::core::context::EvaluationContext;
use crate::core::error::ConditionError;
use crate::core::types::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Check applied to the evaluation context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextOperator {
    /// The attribute is present
    HasAttribute,
    /// The attribute equals the expected value exactly
    AttributeEquals,
    /// The primary value's type name equals the expected name
    IsType,
}

impl ContextOperator {
    /// Operator name as used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextOperator::HasAttribute => "has_attribute",
            ContextOperator::AttributeEquals => "attribute_equals",
            ContextOperator::IsType => "is_type",
        }
    }
}

impl fmt::Display for ContextOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextOperator {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "has_attribute" => Ok(ContextOperator::HasAttribute),
            "attribute_equals" => Ok(ContextOperator::AttributeEquals),
            "is_type" => Ok(ContextOperator::IsType),
            _ => Err(ConditionError::UnknownOperator {
                kind: "context".to_string(),
                name: s.to_string(),
            }),
        }
    }
}

/// Inspects a named attribute or the recorded type of the primary value.
///
/// `attribute_equals` uses exact equality with no coercion: an integer `1`
/// never equals the string `"1"`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextCondition {
    operator: ContextOperator,
    attribute: String,
    expected: Option<Value>,
}

impl ContextCondition {
    /// Create a context condition.
    pub fn new(operator: ContextOperator, attribute: impl Into<String>, expected: Option<Value>) -> Self {
        Self {
            operator,
            attribute: attribute.into(),
            expected,
        }
    }

    /// The check applied.
    pub fn operator(&self) -> ContextOperator {
        self.operator
    }

    /// The attribute inspected.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// The expected value, if any.
    pub fn expected(&self) -> Option<&Value> {
        self.expected.as_ref()
    }

    /// Evaluate against the context.
    pub fn evaluate(&self, ctx: &EvaluationContext) -> bool {
        match self.operator {
            ContextOperator::HasAttribute => ctx.has_attribute(&self.attribute),
            ContextOperator::AttributeEquals => ctx.attribute(&self.attribute) == self.expected.as_ref(),
            ContextOperator::IsType => {
                let expected = self
                    .expected
                    .as_ref()
                    .map(Value::to_string)
                    .unwrap_or_default();
                ctx.type_name() == expected
            }
        }
    }
}

impl fmt::Display for ContextCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expected {
            Some(expected) => write!(
                f,
                "ContextCondition({} {}={})",
                self.attribute, self.operator, expected
            ),
            None => write!(f, "ContextCondition({} {})", self.attribute, self.operator),
        }
    }
}
