//! Rule set configuration.
//!
//! Rule sets can be described in TOML and turned into a ready
//! [`RuleEngine`]:
//!
//! ```toml
//! [engine]
//! strategy = "collect_all"
//!
//! [[rules]]
//! name = "no_null_bytes"
//! pattern = '\x00'
//! inverse = true
//!
//! [[groups]]
//! name = "dotfiles"
//! when = { type = "value", operator = "starts_with", value = "." }
//!
//! [[groups.rules]]
//! name = "valid_dotfile"
//! pattern = '^\.[^/]+$'
//! ```
//!
//! Custom predicates cannot be expressed in configuration; add them to the
//! built engine in code.

use crate::conditions::{
    Condition, ContextCondition, ContextOperator, LogicalOperator, ValueCondition, ValueOperator,
};
use crate::core::error::{ConditionResult, ConfigError, ConfigResult};
use crate::core::types::{Severity, Value};
use crate::engine::{EngineOptions, RuleEngine};
use crate::rules::Rule;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

fn default_true() -> bool {
    true
}

/// A complete rule set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSetConfig {
    /// Engine options.
    pub engine: EngineOptions,
    /// Ungated rules.
    pub rules: Vec<RuleConfig>,
    /// Rule batches sharing an activation condition.
    pub groups: Vec<GroupConfig>,
}

/// One rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Unique rule name.
    pub name: String,
    /// Regex searched in the stringified value.
    pub pattern: String,
    /// Violation severity.
    #[serde(default)]
    pub severity: Severity,
    /// Violation message.
    #[serde(default)]
    pub description: Option<String>,
    /// Fail when the pattern matches instead of when it does not.
    #[serde(default)]
    pub inverse: bool,
    /// Whether the rule starts enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Rules that must run first.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Activation conditions; all must hold.
    #[serde(default)]
    pub conditions: Vec<ConditionConfig>,
}

/// A batch of rules gated on one condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Group name, recorded for enumeration.
    pub name: String,
    /// Shared activation condition.
    pub when: ConditionConfig,
    /// Member rules.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// A condition, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionConfig {
    /// Compare the primary value.
    Value {
        /// Operator name, e.g. `starts_with`.
        operator: String,
        /// Comparison target.
        value: Value,
        /// Compare case-sensitively.
        #[serde(default = "default_true")]
        case_sensitive: bool,
    },
    /// Inspect an attribute or the value's type.
    Context {
        /// Operator name, e.g. `has_attribute`.
        operator: String,
        /// Attribute name; unused by `is_type`.
        #[serde(default)]
        attribute: String,
        /// Expected value or type name.
        #[serde(default)]
        value: Option<Value>,
    },
    /// Combine child conditions.
    Logical {
        /// `and`, `or`, `not` or `xor`.
        operator: String,
        /// Child conditions.
        #[serde(default)]
        conditions: Vec<ConditionConfig>,
    },
}

impl ConditionConfig {
    /// Build the condition, checking operator names and logical arity.
    pub fn to_condition(&self) -> ConditionResult<Condition> {
        match self {
            ConditionConfig::Value {
                operator,
                value,
                case_sensitive,
            } => {
                let operator: ValueOperator = operator.parse()?;
                Ok(ValueCondition::with_case(operator, value.clone(), *case_sensitive).into())
            }
            ConditionConfig::Context {
                operator,
                attribute,
                value,
            } => {
                let operator: ContextOperator = operator.parse()?;
                Ok(ContextCondition::new(operator, attribute.clone(), value.clone()).into())
            }
            ConditionConfig::Logical {
                operator,
                conditions,
            } => {
                let operator: LogicalOperator = operator.parse()?;
                let children = conditions
                    .iter()
                    .map(ConditionConfig::to_condition)
                    .collect::<ConditionResult<Vec<_>>>()?;
                Condition::logical(operator, children)
            }
        }
    }
}

impl RuleConfig {
    /// Build the rule.
    pub fn to_rule(&self) -> ConfigResult<Rule> {
        let mut rule = Rule::new(self.name.as_str(), self.pattern.as_str())
            .with_severity(self.severity)
            .with_inverse(self.inverse)
            .with_enabled(self.enabled)
            .with_dependencies(self.dependencies.iter().cloned());

        if let Some(description) = &self.description {
            rule = rule.with_description(description.as_str());
        }
        for tag in &self.tags {
            rule = rule.with_tag(tag.as_str());
        }
        for condition in &self.conditions {
            let condition = condition.to_condition().map_err(|error| ConfigError::Condition {
                rule: self.name.clone(),
                error,
            })?;
            rule.add_activation_condition(condition);
        }

        Ok(rule)
    }
}

impl RuleSetConfig {
    /// Parse a rule set from TOML.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Load a rule set from a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Total number of rules, grouped ones included.
    pub fn rule_count(&self) -> usize {
        self.rules.len() + self.groups.iter().map(|g| g.rules.len()).sum::<usize>()
    }

    /// Build an engine holding every configured rule.
    pub fn build(&self) -> ConfigResult<RuleEngine> {
        self.check_unique_names()?;

        let mut engine = RuleEngine::with_options(self.engine.clone());

        let rules = self
            .rules
            .iter()
            .map(RuleConfig::to_rule)
            .collect::<ConfigResult<Vec<_>>>()?;
        engine.add_rules(rules);

        for group in &self.groups {
            let condition = group.when.to_condition().map_err(|error| ConfigError::Condition {
                rule: group.name.clone(),
                error,
            })?;
            let rules = group
                .rules
                .iter()
                .map(RuleConfig::to_rule)
                .collect::<ConfigResult<Vec<_>>>()?;
            engine.add_conditional_rules(condition, rules, Some(group.name.as_str()));
        }

        log::debug!("Built engine with {} rules", engine.len());
        Ok(engine)
    }

    fn check_unique_names(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        let all = self
            .rules
            .iter()
            .chain(self.groups.iter().flat_map(|g| g.rules.iter()));
        for rule in all {
            if !seen.insert(rule.name.as_str()) {
                return Err(ConfigError::DuplicateRule(rule.name.clone()));
            }
        }
        Ok(())
    }
}
