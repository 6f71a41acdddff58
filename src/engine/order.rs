//! Dependency-respecting execution order.
//!
//! Provides:
//! - Topological sorting of rules (dependencies before dependents)
//! - Cycle detection with a registration-order fallback
//! - Dependent lists derived from declared dependencies

use crate::core::error::DependencyCycle;
use crate::rules::Rule;
use indexmap::IndexMap;
use std::collections::{HashMap, VecDeque};

/// Analyzer for the dependency graph of a rule registry.
pub struct OrderAnalyzer<'a> {
    rules: &'a IndexMap<String, Rule>,
}

impl<'a> OrderAnalyzer<'a> {
    /// Create a new analyzer over a registry.
    pub fn new(rules: &'a IndexMap<String, Rule>) -> Self {
        Self { rules }
    }

    /// Get the topological order (Kahn's algorithm).
    ///
    /// The queue is seeded in registration order, so unrelated rules keep
    /// their registration order. Dependencies on unregistered names are
    /// ignored.
    pub fn topological_sort(&self) -> Result<Vec<String>, DependencyCycle> {
        let mut in_degree: HashMap<&str, usize> = HashMap::with_capacity(self.rules.len());
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::with_capacity(self.rules.len());

        for name in self.rules.keys() {
            in_degree.insert(name, 0);
            adjacency.insert(name, Vec::new());
        }

        // Edge dependency -> rule
        for (name, rule) in self.rules {
            for dependency in rule.dependencies() {
                if let Some(targets) = adjacency.get_mut(dependency.as_str()) {
                    targets.push(name);
                    *in_degree.entry(name).or_insert(0) += 1;
                }
            }
        }

        let mut queue: VecDeque<&str> = self
            .rules
            .keys()
            .map(String::as_str)
            .filter(|name| in_degree.get(name) == Some(&0))
            .collect();

        let mut order = Vec::with_capacity(self.rules.len());

        while let Some(name) = queue.pop_front() {
            order.push(name.to_string());

            for &target in adjacency.get(name).map(Vec::as_slice).unwrap_or_default() {
                if let Some(degree) = in_degree.get_mut(target) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(target);
                    }
                }
            }
        }

        if order.len() != self.rules.len() {
            let remaining = self
                .rules
                .keys()
                .filter(|name| in_degree.get(name.as_str()).is_some_and(|d| *d > 0))
                .cloned()
                .collect();
            return Err(DependencyCycle { rules: remaining });
        }

        Ok(order)
    }

    /// Get a usable execution order.
    ///
    /// Falls back to registration order when the dependencies contain a
    /// cycle, so every rule appears exactly once either way.
    pub fn execution_order(&self) -> Vec<String> {
        for (rule, dependency) in self.dangling_dependencies() {
            log::warn!(
                "Rule '{}' depends on unknown rule '{}', ignoring for ordering",
                rule,
                dependency
            );
        }

        match self.topological_sort() {
            Ok(order) => order,
            Err(cycle) => {
                log::warn!("{}; using registration order", cycle);
                self.rules.keys().cloned().collect()
            }
        }
    }

    /// Check if the dependencies contain a cycle.
    pub fn has_cycle(&self) -> bool {
        self.topological_sort().is_err()
    }

    /// `(rule, dependency)` pairs whose dependency is not registered.
    pub fn dangling_dependencies(&self) -> Vec<(&'a str, &'a str)> {
        let rules = self.rules;
        rules
            .iter()
            .flat_map(move |(name, rule)| {
                rule.dependencies()
                    .iter()
                    .filter(move |d| !rules.contains_key(d.as_str()))
                    .map(move |d| (name.as_str(), d.as_str()))
            })
            .collect()
    }

    /// Registered dependents of every rule, derived from declared dependencies.
    pub fn dependents(&self) -> HashMap<String, Vec<String>> {
        let mut dependents: HashMap<String, Vec<String>> = self
            .rules
            .keys()
            .map(|name| (name.clone(), Vec::new()))
            .collect();

        for (name, rule) in self.rules {
            for dependency in rule.dependencies() {
                if let Some(list) = dependents.get_mut(dependency) {
                    list.push(name.clone());
                }
            }
        }

        dependents
    }
}
