//! # Rulenet - Conditional Rule Networks
//!
//! Rulenet validates values against a network of named rules. Each rule
//! carries a severity, can be gated on activation conditions, and can depend
//! on other rules so that it always runs after them.
//!
//! ## Features
//!
//! - **Conditional Activation**: Gate rules on value comparisons, context
//!   attributes, custom predicates and AND/OR/NOT/XOR combinations
//! - **Dependency Ordering**: Rules run in topological order of their
//!   dependencies, falling back to registration order on cycles
//! - **Severity Levels**: Only error-severity violations make a value invalid
//! - **Execution Strategies**: Stop at the first error or collect everything
//! - **Caching**: Built-in result caching for repeated values
//! - **Configuration**: Rule sets can be loaded from TOML
//!
//! ## Quick Start
//!
//! ```rust
//! use rulenet::prelude::*;
//!
//! let mut engine = RuleEngine::new();
//! engine.add_rule(Rule::new("starts_with_test", "^test"));
//! engine.add_conditional_rules(
//!     Condition::starts_with("."),
//!     vec![Rule::new("valid_dotfile", r"^\.[^/]+$")],
//!     Some("dotfiles"),
//! );
//!
//! let result = engine.validate("test_value");
//! assert!(result.is_valid());
//! assert!(result.was_skipped("valid_dotfile"));
//!
//! let result = engine.validate("other_value");
//! assert!(!result.is_valid());
//! assert_eq!(result.violations[0].rule_name, "starts_with_test");
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: Values, severities, the evaluation context and errors
//! - [`conditions`]: Activation conditions
//! - [`rules`]: Rules and ready-made rule sets
//! - [`validation`]: Violations and validation results
//! - [`engine`]: Registry, ordering, execution and caching
//! - [`config`]: TOML rule set configuration
//!
//! ## Custom Predicates
//!
//! Both conditions and rules accept closures:
//!
//! ```rust
//! use rulenet::prelude::*;
//!
//! let mut engine = RuleEngine::new();
//! engine.add_rule(
//!     Rule::conditional(
//!         "short_names",
//!         Pattern::predicate(|value| value.to_string().len() <= 16),
//!         Condition::custom("is text", |ctx| ctx.type_name() == "string"),
//!     )
//!     .with_severity(Severity::Warning),
//! );
//!
//! let result = engine.validate("a_rather_long_file_name");
//! assert!(result.is_valid());
//! assert_eq!(result.warning_count(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod conditions;
pub mod config;
pub mod core;
pub mod engine;
pub mod rules;
pub mod validation;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust
/// use rulenet::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::types::{ExecutionStrategy, Severity, Value};

    // Context
    pub use crate::core::context::{ContextSnapshot, EvaluationContext};

    // Errors
    pub use crate::core::error::{
        ConditionError, ConfigError, DependencyCycle, EvaluationError, RuleNetError, RuleNetResult,
    };

    // Conditions
    pub use crate::conditions::{
        Condition, ConditionKind, ConditionSpec, ContextCondition, ContextOperator, CustomCondition,
        LogicalCondition, LogicalOperator, ValueCondition, ValueOperator,
    };

    // Rules
    pub use crate::rules::presets::{absolute_path_rules, dotfile_rules, filename_rules};
    pub use crate::rules::{ConditionSet, Pattern, Rule, RuleStats};

    // Validation
    pub use crate::validation::{SerializedResult, ValidationResult, Violation};

    // Engine
    pub use crate::engine::{
        CacheStats, EngineOptions, EngineReport, EngineStats, OrderAnalyzer, RuleEngine,
    };

    // Configuration
    pub use crate::config::{ConditionConfig, GroupConfig, RuleConfig, RuleSetConfig};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
        assert_eq!(super::NAME, "rulenet");
    }

    #[test]
    fn test_presets_register_cleanly() {
        let mut engine = RuleEngine::new();
        engine.add_conditional_rules(".", dotfile_rules(), Some("dotfiles"));
        engine.add_conditional_rules("/", absolute_path_rules(), Some("absolute_paths"));

        assert_eq!(engine.len(), 6);
        assert_eq!(engine.groups().len(), 2);
        assert!(!engine.has_cycle());
    }

    #[test]
    fn test_presets_gate_on_prefix() {
        let mut engine = RuleEngine::with_options(EngineOptions::collect_all());
        engine.add_conditional_rules(".", dotfile_rules(), Some("dotfiles"));
        engine.add_conditional_rules("/", absolute_path_rules(), Some("absolute_paths"));

        let result = engine.validate("/usr//bin");
        assert!(!result.is_valid());
        assert!(result.was_skipped("valid_dotfile"));
        assert!(result.was_executed("no_double_separators"));
    }
}
