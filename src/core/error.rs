//! Error types for Rulenet.
//!
//! Uses thiserror for structured errors with context. Errors are split by when
//! they can happen:
//! - Construction-time misuse (bad logical arity, unknown operator) is raised
//! - Evaluation failures are recovered locally and only ever logged
//! - Configuration errors come from loading rule sets

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Rulenet.
///
/// This enum encompasses all error categories and enables automatic
/// conversion between specific error types.
#[derive(Error, Debug)]
pub enum RuleNetError {
    #[error("Condition error: {0}")]
    Condition(#[from] ConditionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while building conditions.
///
/// These are unambiguous programmer errors and are returned to the caller
/// instead of being logged.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionError {
    #[error("{operator} operator requires exactly {expected} condition(s), got {got}")]
    InvalidArity {
        operator: String,
        expected: usize,
        got: usize,
    },

    #[error("Unknown {kind} operator '{name}'")]
    UnknownOperator { kind: String, name: String },

    #[error("Condition index {index} out of range ({len} conditions)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Failures that happen while evaluating a condition or a rule pattern.
///
/// These never escape a validation run: conditions degrade to `false`, rules
/// become violations carrying the error message.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationError {
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid length threshold '{value}' for {operator}")]
    InvalidThreshold { operator: String, value: String },

    #[error("Predicate failed: {0}")]
    Predicate(String),

    #[error("Activation condition {index} of rule '{rule}' failed: {reason}")]
    Activation {
        rule: String,
        index: usize,
        reason: String,
    },
}

/// Errors from loading a rule set configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid condition in rule '{rule}': {error}")]
    Condition { rule: String, error: ConditionError },

    #[error("Rule '{0}' is defined more than once")]
    DuplicateRule(String),
}

/// The declared rule dependencies contain a cycle.
///
/// Never escapes the engine, which falls back to registration order; exposed
/// for callers that inspect ordering directly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Dependency cycle detected among rules: {}", rules.join(", "))]
pub struct DependencyCycle {
    /// Rules left unordered, in registration order.
    pub rules: Vec<String>,
}

// ============================================================================
// Error Utilities
// ============================================================================

impl ConditionError {
    /// Build an arity error for a logical operator.
    pub fn arity(operator: impl Into<String>, expected: usize, got: usize) -> Self {
        ConditionError::InvalidArity {
            operator: operator.into(),
            expected,
            got,
        }
    }

    /// Get suggestion for fixing this error.
    pub fn suggested_fix(&self) -> Option<String> {
        match self {
            ConditionError::InvalidArity {
                operator, expected, ..
            } => Some(format!(
                "Give the {} condition exactly {} child condition(s)",
                operator, expected
            )),
            ConditionError::UnknownOperator { kind, .. } => {
                Some(format!("Use one of the documented {} operators", kind))
            }
            ConditionError::IndexOutOfRange { .. } => None,
        }
    }
}

impl EvaluationError {
    /// Wrap any displayable predicate failure.
    pub fn predicate(error: impl std::fmt::Display) -> Self {
        EvaluationError::Predicate(error.to_string())
    }
}

/// Result type alias for Rulenet operations.
pub type RuleNetResult<T> = Result<T, RuleNetError>;

/// Result type alias for condition construction.
pub type ConditionResult<T> = Result<T, ConditionError>;

/// Result type alias for evaluation.
pub type EvalResult<T> = Result<T, EvaluationError>;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
