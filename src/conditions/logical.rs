//! Logical combinators over child conditions.

use crate::conditions::Condition;
use crate::core::context::EvaluationContext;
use crate::core::error::{ConditionError, ConditionResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical operator combining child conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperator {
    /// All children true (short-circuit)
    And,
    /// Any child true (short-circuit)
    Or,
    /// Negation of the single child
    Not,
    /// Exactly one of two children true
    Xor,
}

impl LogicalOperator {
    /// Operator name as used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "and",
            LogicalOperator::Or => "or",
            LogicalOperator::Not => "not",
            LogicalOperator::Xor => "xor",
        }
    }

    /// Required number of children, if fixed.
    pub fn arity(&self) -> Option<usize> {
        match self {
            LogicalOperator::Not => Some(1),
            LogicalOperator::Xor => Some(2),
            LogicalOperator::And | LogicalOperator::Or => None,
        }
    }

    fn check_arity(&self, count: usize) -> ConditionResult<()> {
        match self.arity() {
            Some(expected) if expected != count => Err(ConditionError::arity(
                self.as_str().to_uppercase(),
                expected,
                count,
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalOperator {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(LogicalOperator::And),
            "or" => Ok(LogicalOperator::Or),
            "not" => Ok(LogicalOperator::Not),
            "xor" => Ok(LogicalOperator::Xor),
            _ => Err(ConditionError::UnknownOperator {
                kind: "logical".to_string(),
                name: s.to_string(),
            }),
        }
    }
}

/// Combines child conditions with AND, OR, NOT or XOR.
///
/// Invariant: a NOT condition always has exactly one child and an XOR
/// condition exactly two. The invariant is checked on construction and on
/// every mutation of the child list; a rejected mutation leaves the
/// condition unchanged.
#[derive(Debug, Clone)]
pub struct LogicalCondition {
    operator: LogicalOperator,
    conditions: Vec<Condition>,
}

impl LogicalCondition {
    /// Create a logical condition, checking the operator's arity.
    pub fn new(operator: LogicalOperator, conditions: Vec<Condition>) -> ConditionResult<Self> {
        operator.check_arity(conditions.len())?;
        Ok(Self {
            operator,
            conditions,
        })
    }

    /// Build from a child list whose length the caller's signature already fixes.
    pub(super) fn fixed(operator: LogicalOperator, conditions: Vec<Condition>) -> Self {
        debug_assert!(operator.check_arity(conditions.len()).is_ok());
        Self {
            operator,
            conditions,
        }
    }

    /// The combining operator.
    pub fn operator(&self) -> LogicalOperator {
        self.operator
    }

    /// Child conditions.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Mutable access to a child, for toggling or nested edits.
    pub fn condition_mut(&mut self, index: usize) -> Option<&mut Condition> {
        self.conditions.get_mut(index)
    }

    /// Append a child.
    pub fn add_condition(&mut self, condition: Condition) -> ConditionResult<()> {
        self.operator.check_arity(self.conditions.len() + 1)?;
        self.conditions.push(condition);
        Ok(())
    }

    /// Remove and return the child at `index`.
    pub fn remove_condition(&mut self, index: usize) -> ConditionResult<Condition> {
        let len = self.conditions.len();
        if index >= len {
            return Err(ConditionError::IndexOutOfRange { index, len });
        }
        self.operator.check_arity(len - 1)?;
        Ok(self.conditions.remove(index))
    }

    /// Evaluate the children.
    ///
    /// An AND/OR without children is vacuously true.
    pub fn evaluate(&self, ctx: &EvaluationContext) -> bool {
        if self.conditions.is_empty() {
            log::warn!(
                "Logical condition {} has no sub-conditions",
                self.operator.as_str().to_uppercase()
            );
            return true;
        }

        match self.operator {
            LogicalOperator::And => self.conditions.iter().all(|c| c.evaluate(ctx)),
            LogicalOperator::Or => self.conditions.iter().any(|c| c.evaluate(ctx)),
            LogicalOperator::Not => !self.conditions[0].evaluate(ctx),
            LogicalOperator::Xor => self.conditions[0].evaluate(ctx) != self.conditions[1].evaluate(ctx),
        }
    }
}

impl fmt::Display for LogicalCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LogicalCondition({}, {} conditions)",
            self.operator.as_str().to_uppercase(),
            self.conditions.len()
        )
    }
}
