//! Core types for the Rulenet validation engine.
//!
//! This module contains the foundational types shared by conditions, rules
//! and the engine:
//! - Value types and severities
//! - The evaluation context
//! - Error types

pub mod types;
pub mod error;
pub mod context;

// Re-export commonly used types
pub use types::{ExecutionStrategy, Severity, Value};
pub use error::{ConditionError, ConfigError, DependencyCycle, EvaluationError, RuleNetError};
pub use context::{ContextSnapshot, EvaluationContext};
