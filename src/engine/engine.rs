//! Rule engine implementation.
//!
//! The engine owns the rule registry, keeps the execution order in sync with
//! declared dependencies, and runs rules against values.

use crate::conditions::ConditionSpec;
use crate::core::context::EvaluationContext;
use crate::core::types::{ExecutionStrategy, Value};
use crate::engine::cache::{CacheKey, CacheStats, ResultCache, DEFAULT_CACHE_CAPACITY};
use crate::engine::order::OrderAnalyzer;
use crate::rules::{Rule, RuleStats};
use crate::validation::{ValidationResult, Violation};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

/// Engine options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Whether to stop at the first error or run every active rule.
    pub strategy: ExecutionStrategy,
    /// Whether to cache validation results.
    pub use_cache: bool,
    /// Maximum number of cached results.
    pub cache_capacity: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            strategy: ExecutionStrategy::FailFast,
            use_cache: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl EngineOptions {
    /// Create a new options builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the execution strategy.
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enable/disable caching.
    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Set the cache capacity.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Run every active rule.
    pub fn collect_all() -> Self {
        Self::default().with_strategy(ExecutionStrategy::CollectAll)
    }
}

/// Engine-level counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Calls to `validate`, cache hits included.
    pub validations: u64,
    /// Validations answered from the cache.
    pub cache_hits: u64,
    /// Rules that ran.
    pub rule_executions: u64,
    /// Conditions evaluated while deciding activation.
    pub condition_evaluations: u64,
}

/// Snapshot of engine state returned by [`RuleEngine::get_stats`].
#[derive(Debug, Clone, Serialize)]
pub struct EngineReport {
    /// Engine counters.
    pub engine_stats: EngineStats,
    /// Cache counters.
    pub cache_stats: CacheStats,
    /// Registered rules.
    pub rule_count: usize,
    /// Recorded rule groups.
    pub group_count: usize,
    /// Cached results.
    pub cache_size: usize,
    /// Current execution order.
    pub execution_order: Vec<String>,
    /// Per-rule statistics in registration order.
    pub rule_stats: Vec<RuleStats>,
}

/// Outcome of one rule within a run.
enum Step {
    Skipped,
    Executed(Option<Violation>),
}

/// The main rule engine.
///
/// Not thread-safe: validation updates counters and the cache in place, so
/// share an engine between threads only behind a lock.
///
/// Cached results are keyed by value and rule subset only. Changing the rule
/// set does not invalidate them; call [`clear_cache`](Self::clear_cache)
/// after registration changes.
#[derive(Debug)]
pub struct RuleEngine {
    options: EngineOptions,
    rules: IndexMap<String, Rule>,
    groups: IndexMap<String, Vec<String>>,
    execution_order: Vec<String>,
    cache: ResultCache,
    stats: EngineStats,
}

impl RuleEngine {
    /// Create an engine with default options.
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    /// Create an engine with the given options.
    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            cache: ResultCache::new(options.cache_capacity),
            options,
            rules: IndexMap::new(),
            groups: IndexMap::new(),
            execution_order: Vec::new(),
            stats: EngineStats::default(),
        }
    }

    /// The engine's options.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Change the execution strategy.
    pub fn set_strategy(&mut self, strategy: ExecutionStrategy) {
        self.options.strategy = strategy;
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a rule, replacing any rule with the same name.
    pub fn add_rule(&mut self, rule: Rule) {
        self.insert_rule(rule);
        self.refresh_order();
    }

    /// Register several rules.
    pub fn add_rules(&mut self, rules: impl IntoIterator<Item = Rule>) {
        for rule in rules {
            self.insert_rule(rule);
        }
        self.refresh_order();
    }

    fn insert_rule(&mut self, rule: Rule) {
        let name = rule.name().to_string();
        if self.rules.contains_key(&name) {
            log::warn!("Rule '{}' already exists, overwriting", name);
        }
        self.rules.insert(name, rule);
    }

    /// Unregister a rule and drop every dependency on it.
    ///
    /// Returns `false` if no rule has this name.
    pub fn remove_rule(&mut self, name: &str) -> bool {
        if self.rules.shift_remove(name).is_none() {
            return false;
        }
        for rule in self.rules.values_mut() {
            rule.remove_dependency(name);
        }
        for members in self.groups.values_mut() {
            members.retain(|member| member != name);
        }
        self.refresh_order();
        true
    }

    /// Make `rule_name` run after `dependency_name`.
    ///
    /// Returns `false` if either rule is unknown. Adding an existing link is
    /// a no-op.
    pub fn add_rule_dependency(&mut self, rule_name: &str, dependency_name: &str) -> bool {
        if !self.rules.contains_key(dependency_name) {
            return false;
        }
        let Some(rule) = self.rules.get_mut(rule_name) else {
            return false;
        };
        if rule.add_dependency(dependency_name.to_string()) {
            self.refresh_order();
        }
        true
    }

    /// Register a batch of rules that share one activation condition.
    ///
    /// Each rule is registered individually and takes part in the global
    /// order. The group name is only recorded for [`groups`](Self::groups);
    /// reusing a name replaces that group's list with this batch.
    pub fn add_conditional_rules(
        &mut self,
        condition: impl Into<ConditionSpec>,
        rules: Vec<Rule>,
        group_name: Option<&str>,
    ) {
        let condition = condition.into().into_condition();
        let mut names = Vec::with_capacity(rules.len());

        for mut rule in rules {
            rule.add_activation_condition(condition.clone());
            names.push(rule.name().to_string());
            self.insert_rule(rule);
        }

        if let Some(group) = group_name {
            if self.groups.insert(group.to_string(), names).is_some() {
                log::debug!("Group '{}' replaced by a new batch", group);
            }
        }

        self.refresh_order();
    }

    /// Enable or disable a registered rule.
    pub fn set_rule_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.rules.get_mut(name) {
            Some(rule) => {
                rule.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    /// Recompute the execution order and every rule's dependents.
    fn refresh_order(&mut self) {
        let analyzer = OrderAnalyzer::new(&self.rules);
        let order = analyzer.execution_order();
        let mut dependents = analyzer.dependents();

        for (name, rule) in self.rules.iter_mut() {
            rule.set_dependents(dependents.remove(name).unwrap_or_default());
        }
        log::debug!("Execution order: {:?}", order);
        self.execution_order = order;
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Validate a value against every registered rule.
    pub fn validate(&mut self, value: impl Into<Value>) -> ValidationResult {
        self.validate_with(value, None, None)
    }

    /// Validate a value with attributes and metadata.
    pub fn validate_in(&mut self, value: impl Into<Value>, context: EvaluationContext) -> ValidationResult {
        self.validate_with(value, Some(context), None)
    }

    /// Validate a value against an explicit subset of rules, in the given order.
    pub fn validate_rules(&mut self, value: impl Into<Value>, rule_names: &[&str]) -> ValidationResult {
        self.validate_with(value, None, Some(rule_names))
    }

    /// Validate a value.
    ///
    /// A given context is re-bound to `value`. With a non-empty `rule_names`,
    /// unknown names are dropped and the caller's order is kept; otherwise
    /// the dependency order is used. Never fails: broken patterns become
    /// violations and a panicking rule is left out of the run.
    pub fn validate_with(
        &mut self,
        value: impl Into<Value>,
        context: Option<EvaluationContext>,
        rule_names: Option<&[&str]>,
    ) -> ValidationResult {
        let value = value.into();
        let rule_names = rule_names.filter(|names| !names.is_empty());
        self.stats.validations += 1;

        let key = CacheKey::new(&value, rule_names);
        if self.options.use_cache {
            if let Some(cached) = self.cache.get(&key) {
                self.stats.cache_hits += 1;
                return cached;
            }
        }

        let start = Instant::now();
        let ctx = match context {
            Some(ctx) => ctx.rebind(value.clone()),
            None => EvaluationContext::new(value.clone()),
        };
        let evaluations_before = ctx.condition_evaluations();

        let candidates: Vec<String> = match rule_names {
            Some(names) => names
                .iter()
                .filter(|name| self.rules.contains_key(**name))
                .map(|name| name.to_string())
                .collect(),
            None => self.execution_order.clone(),
        };

        let fail_fast = self.options.strategy == ExecutionStrategy::FailFast;
        let mut result = ValidationResult::new(value.clone());

        for name in candidates {
            let Some(rule) = self.rules.get_mut(&name) else {
                continue;
            };

            let step = panic::catch_unwind(AssertUnwindSafe(|| {
                if rule.is_active(&ctx) {
                    Step::Executed(rule.execute(&value, &ctx))
                } else {
                    Step::Skipped
                }
            }));

            match step {
                Ok(Step::Skipped) => result.skipped_rules.push(name),
                Ok(Step::Executed(violation)) => {
                    result.executed_rules.push(name);
                    self.stats.rule_executions += 1;

                    if let Some(violation) = violation {
                        let stop = fail_fast && violation.severity.is_error();
                        result.violations.push(violation);
                        if stop {
                            break;
                        }
                    }
                }
                Err(_) => {
                    log::error!("Rule '{}' panicked during validation, leaving it out of this run", name);
                }
            }
        }

        self.stats.condition_evaluations += ctx.condition_evaluations() - evaluations_before;
        result.duration = start.elapsed();

        if self.options.use_cache {
            self.cache.put(key, result.clone());
        }

        result
    }

    /// Shorthand for `validate(value).is_valid()`.
    pub fn is_valid(&mut self, value: impl Into<Value>) -> bool {
        self.validate(value).is_valid()
    }

    // ========================================================================
    // Statistics and cache
    // ========================================================================

    /// Engine counters, cache state and per-rule statistics.
    pub fn get_stats(&self) -> EngineReport {
        EngineReport {
            engine_stats: self.stats.clone(),
            cache_stats: self.cache.stats().clone(),
            rule_count: self.rules.len(),
            group_count: self.groups.len(),
            cache_size: self.cache.len(),
            execution_order: self.execution_order.clone(),
            rule_stats: self.rules.values().map(Rule::stats).collect(),
        }
    }

    /// Engine counters.
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Drop every cached result.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Reset engine, cache and rule counters. Registration is untouched.
    pub fn reset_stats(&mut self) {
        self.stats = EngineStats::default();
        self.cache.reset_stats();
        for rule in self.rules.values_mut() {
            rule.reset_stats();
        }
    }

    /// Number of cached results.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Look up a rule.
    pub fn get_rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    /// Rule names in registration order.
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Registered rules in registration order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// Current execution order.
    pub fn execution_order(&self) -> &[String] {
        &self.execution_order
    }

    /// Whether the declared dependencies contain a cycle.
    pub fn has_cycle(&self) -> bool {
        OrderAnalyzer::new(&self.rules).has_cycle()
    }

    /// Recorded groups and their member rule names.
    pub fn groups(&self) -> &IndexMap<String, Vec<String>> {
        &self.groups
    }

    /// Member rule names of one group.
    pub fn group(&self, name: &str) -> Option<&[String]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}
