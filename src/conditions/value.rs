//! Conditions over the primary value.

use crate::core::context::EvaluationContext;
use crate::core::error::{ConditionError, EvalResult, EvaluationError};
use crate::core::types::Value;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const LOWER_STR_VALUE_KEY: &str = "str_value_lower";

/// Comparison applied to the stringified primary value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOperator {
    /// Exact string equality
    Equals,
    /// String inequality
    NotEquals,
    /// Prefix match
    StartsWith,
    /// Negated prefix match
    NotStartsWith,
    /// Suffix match
    EndsWith,
    /// Negated suffix match
    NotEndsWith,
    /// Substring match
    Contains,
    /// Negated substring match
    NotContains,
    /// Unanchored regex search
    Matches,
    /// Negated regex search
    NotMatches,
    /// Length strictly greater than a threshold
    LengthGt,
    /// Length strictly less than a threshold
    LengthLt,
    /// Length equal to a threshold
    LengthEq,
}

impl ValueOperator {
    /// All operators, in declaration order.
    pub const ALL: [ValueOperator; 13] = [
        ValueOperator::Equals,
        ValueOperator::NotEquals,
        ValueOperator::StartsWith,
        ValueOperator::NotStartsWith,
        ValueOperator::EndsWith,
        ValueOperator::NotEndsWith,
        ValueOperator::Contains,
        ValueOperator::NotContains,
        ValueOperator::Matches,
        ValueOperator::NotMatches,
        ValueOperator::LengthGt,
        ValueOperator::LengthLt,
        ValueOperator::LengthEq,
    ];

    /// Operator name as used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueOperator::Equals => "equals",
            ValueOperator::NotEquals => "not_equals",
            ValueOperator::StartsWith => "starts_with",
            ValueOperator::NotStartsWith => "not_starts_with",
            ValueOperator::EndsWith => "ends_with",
            ValueOperator::NotEndsWith => "not_ends_with",
            ValueOperator::Contains => "contains",
            ValueOperator::NotContains => "not_contains",
            ValueOperator::Matches => "matches",
            ValueOperator::NotMatches => "not_matches",
            ValueOperator::LengthGt => "length_gt",
            ValueOperator::LengthLt => "length_lt",
            ValueOperator::LengthEq => "length_eq",
        }
    }

    fn is_regex(&self) -> bool {
        matches!(self, ValueOperator::Matches | ValueOperator::NotMatches)
    }

    fn is_length(&self) -> bool {
        matches!(
            self,
            ValueOperator::LengthGt | ValueOperator::LengthLt | ValueOperator::LengthEq
        )
    }
}

impl fmt::Display for ValueOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueOperator {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValueOperator::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ConditionError::UnknownOperator {
                kind: "value".to_string(),
                name: s.to_string(),
            })
    }
}

/// Compares the primary value against a constant.
///
/// Both operands are stringified (and case-folded when case-insensitive).
/// Regex operators compile their pattern once, here; an invalid pattern is
/// logged and leaves `matches` permanently false and `not_matches`
/// permanently true.
#[derive(Debug, Clone)]
pub struct ValueCondition {
    operator: ValueOperator,
    target: Value,
    case_sensitive: bool,
    regex: Option<Regex>,
    threshold: Option<usize>,
}

impl ValueCondition {
    /// Create a case-sensitive value condition.
    pub fn new(operator: ValueOperator, target: impl Into<Value>) -> Self {
        Self::with_case(operator, target, true)
    }

    /// Create a value condition with explicit case sensitivity.
    pub fn with_case(operator: ValueOperator, target: impl Into<Value>, case_sensitive: bool) -> Self {
        let target = target.into();

        let regex = if operator.is_regex() {
            let source = target.to_string();
            match RegexBuilder::new(&source)
                .case_insensitive(!case_sensitive)
                .build()
            {
                Ok(regex) => Some(regex),
                Err(e) => {
                    log::warn!("Invalid regex pattern '{}': {}", source, e);
                    None
                }
            }
        } else {
            None
        };

        let threshold = if operator.is_length() {
            target.as_length()
        } else {
            None
        };

        Self {
            operator,
            target,
            case_sensitive,
            regex,
            threshold,
        }
    }

    /// Switch to case-insensitive comparison.
    pub fn case_insensitive(self) -> Self {
        Self::with_case(self.operator, self.target, false)
    }

    /// The comparison operator.
    pub fn operator(&self) -> ValueOperator {
        self.operator
    }

    /// The constant compared against.
    pub fn target(&self) -> &Value {
        &self.target
    }

    /// Whether comparisons are case-sensitive.
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Whether a regex operator compiled its pattern successfully.
    pub fn has_valid_pattern(&self) -> bool {
        !self.operator.is_regex() || self.regex.is_some()
    }

    /// Evaluate against the context's primary value.
    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult<bool> {
        if ctx.value().is_none() {
            return Ok(self.operator == ValueOperator::NotEquals);
        }

        let (subject, target) = if self.case_sensitive {
            (ctx.str_value(), self.target.to_string())
        } else {
            let lowered = ctx.computed_or_insert_with(LOWER_STR_VALUE_KEY, || {
                Value::String(ctx.str_value().to_lowercase())
            });
            (lowered.to_string(), self.target.to_string().to_lowercase())
        };

        let result = match self.operator {
            ValueOperator::Equals => subject == target,
            ValueOperator::NotEquals => subject != target,
            ValueOperator::StartsWith => subject.starts_with(&target),
            ValueOperator::NotStartsWith => !subject.starts_with(&target),
            ValueOperator::EndsWith => subject.ends_with(&target),
            ValueOperator::NotEndsWith => !subject.ends_with(&target),
            ValueOperator::Contains => subject.contains(&target),
            ValueOperator::NotContains => !subject.contains(&target),
            ValueOperator::Matches => self
                .regex
                .as_ref()
                .is_some_and(|regex| regex.is_match(&subject)),
            ValueOperator::NotMatches => self
                .regex
                .as_ref()
                .map_or(true, |regex| !regex.is_match(&subject)),
            ValueOperator::LengthGt => subject.chars().count() > self.threshold()?,
            ValueOperator::LengthLt => subject.chars().count() < self.threshold()?,
            ValueOperator::LengthEq => subject.chars().count() == self.threshold()?,
        };

        Ok(result)
    }

    fn threshold(&self) -> EvalResult<usize> {
        self.threshold.ok_or_else(|| EvaluationError::InvalidThreshold {
            operator: self.operator.to_string(),
            value: self.target.to_string(),
        })
    }
}

impl fmt::Display for ValueCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueCondition({}={})", self.operator, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(op: ValueOperator, target: impl Into<Value>, value: &str) -> bool {
        ValueCondition::new(op, target)
            .evaluate(&EvaluationContext::new(value))
            .unwrap()
    }

    #[test]
    fn test_string_operators() {
        assert!(eval(ValueOperator::Equals, "abc", "abc"));
        assert!(eval(ValueOperator::NotEquals, "abc", "abd"));
        assert!(eval(ValueOperator::StartsWith, ".", ".bashrc"));
        assert!(eval(ValueOperator::NotStartsWith, "/", ".bashrc"));
        assert!(eval(ValueOperator::EndsWith, ".txt", "notes.txt"));
        assert!(!eval(ValueOperator::NotEndsWith, ".txt", "notes.txt"));
        assert!(eval(ValueOperator::Contains, "ote", "notes.txt"));
        assert!(eval(ValueOperator::NotContains, ":", "notes.txt"));
    }

    #[test]
    fn test_regex_operators() {
        assert!(eval(ValueOperator::Matches, r"\d+", "file42"));
        assert!(!eval(ValueOperator::Matches, r"^\d+$", "file42"));
        assert!(eval(ValueOperator::NotMatches, r"^\d+$", "file42"));
    }

    #[test]
    fn test_invalid_regex_is_permanent() {
        let matches = ValueCondition::new(ValueOperator::Matches, "(unclosed");
        let not_matches = ValueCondition::new(ValueOperator::NotMatches, "(unclosed");
        assert!(!matches.has_valid_pattern());

        for value in ["", "(unclosed", "anything"] {
            let ctx = EvaluationContext::new(value);
            assert!(!matches.evaluate(&ctx).unwrap());
            assert!(not_matches.evaluate(&ctx).unwrap());
        }
    }

    #[test]
    fn test_length_operators() {
        assert!(eval(ValueOperator::LengthGt, 3, "abcd"));
        assert!(eval(ValueOperator::LengthLt, 3, "ab"));
        assert!(eval(ValueOperator::LengthEq, "4", "abcd"));
    }

    #[test]
    fn test_invalid_threshold_is_an_error() {
        let condition = ValueCondition::new(ValueOperator::LengthGt, "many");
        let result = condition.evaluate(&EvaluationContext::new("abc"));
        assert!(matches!(result, Err(EvaluationError::InvalidThreshold { .. })));
    }

    #[test]
    fn test_case_insensitive() {
        let condition = ValueCondition::new(ValueOperator::Equals, "README").case_insensitive();
        assert!(condition.evaluate(&EvaluationContext::new("readme")).unwrap());

        let condition = ValueCondition::with_case(ValueOperator::Matches, "^read", false);
        assert!(condition.evaluate(&EvaluationContext::new("README.md")).unwrap());

        let condition = ValueCondition::new(ValueOperator::StartsWith, "READ");
        assert!(!condition.evaluate(&EvaluationContext::new("readme")).unwrap());
    }

    #[test]
    fn test_absent_value_short_circuits() {
        let ctx = EvaluationContext::new(Value::None);
        for op in ValueOperator::ALL {
            let expected = op == ValueOperator::NotEquals;
            assert_eq!(
                ValueCondition::new(op, "x").evaluate(&ctx).unwrap(),
                expected,
                "operator {}",
                op
            );
        }
    }

    #[test]
    fn test_operator_parsing() {
        for op in ValueOperator::ALL {
            assert_eq!(op.as_str().parse::<ValueOperator>().unwrap(), op);
        }
        assert!("sort_of_equals".parse::<ValueOperator>().is_err());
    }
}
