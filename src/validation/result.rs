//! Violations and aggregated validation results.

use crate::core::context::ContextSnapshot;
use crate::core::error::RuleNetResult;
use crate::core::types::{Severity, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// A single rule failure. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Name of the rule that failed.
    pub rule_name: String,
    /// Severity copied from the rule.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// The value that failed.
    pub value: Value,
    /// Attributes and metadata visible when the rule ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextSnapshot>,
    /// Metadata copied from the rule.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.severity.as_str().to_uppercase(),
            self.rule_name,
            self.message
        )
    }
}

/// Outcome of one validation run.
///
/// Severity counts are derived from the violation list on every call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationResult {
    /// The validated value.
    pub value: Value,
    /// Violations in execution order.
    pub violations: Vec<Violation>,
    /// Rules whose pattern ran.
    pub executed_rules: Vec<String>,
    /// Rules skipped because they were inactive.
    pub skipped_rules: Vec<String>,
    /// Wall time of the run.
    pub duration: Duration,
    /// Free-form metadata.
    pub metadata: BTreeMap<String, Value>,
}

/// Serializable form of a [`ValidationResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedResult {
    /// The validated value.
    pub value: Value,
    /// `true` when no error-severity violation occurred.
    pub is_valid: bool,
    /// Violations in execution order.
    pub violations: Vec<Violation>,
    /// Rules whose pattern ran.
    pub executed_rules: Vec<String>,
    /// Rules skipped because they were inactive.
    pub skipped_rules: Vec<String>,
    /// Wall time in milliseconds.
    pub duration_ms: f64,
    /// Error-severity violations.
    pub error_count: usize,
    /// Warning-severity violations.
    pub warning_count: usize,
    /// Info-severity violations.
    pub info_count: usize,
    /// Free-form metadata.
    pub metadata: BTreeMap<String, Value>,
}

impl ValidationResult {
    /// Create an empty result for a value.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    /// Whether no error-severity violation occurred.
    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }

    /// Number of error-severity violations.
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Number of warning-severity violations.
    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    /// Number of info-severity violations.
    pub fn info_count(&self) -> usize {
        self.count(Severity::Info)
    }

    fn count(&self, severity: Severity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == severity)
            .count()
    }

    /// Violations of one severity.
    pub fn get_violations_by_severity(&self, severity: Severity) -> Vec<&Violation> {
        self.violations
            .iter()
            .filter(|v| v.severity == severity)
            .collect()
    }

    /// Whether a rule ran.
    pub fn was_executed(&self, rule_name: &str) -> bool {
        self.executed_rules.iter().any(|r| r == rule_name)
    }

    /// Whether a rule was skipped.
    pub fn was_skipped(&self, rule_name: &str) -> bool {
        self.skipped_rules.iter().any(|r| r == rule_name)
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        if self.is_valid() {
            let advisories = self.warning_count() + self.info_count();
            if advisories == 0 {
                format!("✓ '{}' is valid", self.value)
            } else {
                format!("✓ '{}' is valid with {} advisory violation(s)", self.value, advisories)
            }
        } else {
            format!(
                "✗ '{}' failed validation with {} error(s)",
                self.value,
                self.error_count()
            )
        }
    }

    /// One numbered line per violation.
    pub fn detailed_violations(&self) -> Vec<String> {
        self.violations
            .iter()
            .enumerate()
            .map(|(i, violation)| format!("{}. {}", i + 1, violation))
            .collect()
    }

    /// Structured form with derived counts.
    pub fn to_serialized(&self) -> SerializedResult {
        SerializedResult {
            value: self.value.clone(),
            is_valid: self.is_valid(),
            violations: self.violations.clone(),
            executed_rules: self.executed_rules.clone(),
            skipped_rules: self.skipped_rules.clone(),
            duration_ms: self.duration.as_micros() as f64 / 1000.0,
            error_count: self.error_count(),
            warning_count: self.warning_count(),
            info_count: self.info_count(),
            metadata: self.metadata.clone(),
        }
    }

    /// Pretty-printed JSON of [`to_serialized`](Self::to_serialized).
    pub fn to_json(&self) -> RuleNetResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_serialized())?)
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
