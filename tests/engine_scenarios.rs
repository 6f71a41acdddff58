//! End-to-end validation scenarios against the public API.

use rulenet::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn uncached(strategy: ExecutionStrategy) -> RuleEngine {
    RuleEngine::with_options(
        EngineOptions::new()
            .with_strategy(strategy)
            .with_cache(false),
    )
}

#[test]
fn test_single_regex_rule() {
    let mut engine = RuleEngine::new();
    engine.add_rule(Rule::new("starts_with_test", "^test"));

    let result = engine.validate("test_value");
    assert!(result.is_valid());
    assert!(result.violations.is_empty());

    let result = engine.validate("other_value");
    assert!(!result.is_valid());
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].rule_name, "starts_with_test");
}

#[test]
fn test_conditional_group_gates_rules() {
    let mut engine = RuleEngine::new();
    engine.add_conditional_rules(
        Condition::starts_with("."),
        vec![Rule::new("valid_dotfile", r"^\.[^/]+$")],
        Some("dotfiles"),
    );

    let result = engine.validate(".bashrc");
    assert!(result.is_valid());
    assert!(result.was_executed("valid_dotfile"));

    let result = engine.validate("regular_file.txt");
    assert!(result.is_valid());
    assert!(result.executed_rules.is_empty());
    assert_eq!(result.skipped_rules, vec!["valid_dotfile"]);
}

#[test]
fn test_dependencies_registered_in_reverse() {
    let mut engine = RuleEngine::new();
    engine.add_rule(Rule::new("rule3", ".*").with_dependency("rule2"));
    engine.add_rule(Rule::new("rule2", ".*").with_dependency("rule1"));
    engine.add_rule(Rule::new("rule1", ".*"));

    assert_eq!(engine.execution_order(), ["rule1", "rule2", "rule3"]);

    let result = engine.validate("anything");
    assert_eq!(result.executed_rules, vec!["rule1", "rule2", "rule3"]);
}

#[test]
fn test_dependencies_linked_after_registration() {
    let mut engine = RuleEngine::new();
    engine.add_rule(Rule::new("rule3", ".*"));
    engine.add_rule(Rule::new("rule2", ".*"));
    engine.add_rule(Rule::new("rule1", ".*"));

    assert!(engine.add_rule_dependency("rule3", "rule2"));
    assert!(engine.add_rule_dependency("rule2", "rule1"));
    assert_eq!(engine.execution_order(), ["rule1", "rule2", "rule3"]);
}

#[test]
fn test_xor_gate() {
    let gate = || Condition::xor(Condition::starts_with("te"), Condition::ends_with(".md"));
    let mut engine = uncached(ExecutionStrategy::CollectAll);
    engine.add_rule(Rule::conditional("gated", "^$", gate()));

    // one true, one false
    assert!(engine.validate("test.txt").was_executed("gated"));
    assert!(engine.validate("notes.md").was_executed("gated"));
    // both true, both false
    assert!(engine.validate("test.md").was_skipped("gated"));
    assert!(engine.validate("notes.txt").was_skipped("gated"));
}

#[test]
fn test_fail_fast_versus_collect_all() {
    let rules = || vec![Rule::new("first", "^a"), Rule::new("second", "^b")];

    let mut fail_fast = uncached(ExecutionStrategy::FailFast);
    fail_fast.add_rules(rules());
    let result = fail_fast.validate("zzz");
    assert_eq!(result.violations.len(), 1);
    assert!(!result.was_executed("second"));

    let mut collect_all = uncached(ExecutionStrategy::CollectAll);
    collect_all.add_rules(rules());
    let result = collect_all.validate("zzz");
    assert_eq!(result.violations.len(), 2);
    assert_eq!(result.executed_rules, vec!["first", "second"]);
}

#[test]
fn test_validity_ignores_warnings_and_info() {
    let mut engine = uncached(ExecutionStrategy::CollectAll);
    engine.add_rule(Rule::new("advisory", "^a").with_severity(Severity::Warning));
    engine.add_rule(Rule::new("note", "^b").with_severity(Severity::Info));

    let result = engine.validate("zzz");
    assert!(result.is_valid());
    assert_eq!(result.warning_count(), 1);
    assert_eq!(result.info_count(), 1);

    engine.add_rule(Rule::new("strict", "^c"));
    let result = engine.validate("zzz");
    assert!(!result.is_valid());
    assert_eq!(result.error_count(), 1);
}

#[test]
fn test_inactive_rule_never_violates() {
    let mut engine = uncached(ExecutionStrategy::CollectAll);
    engine.add_rule(Rule::conditional(
        "never_active",
        "^impossible$",
        Condition::has_attribute("missing"),
    ));
    engine.add_rule(Rule::new("always_attempted", ".*"));

    for value in ["a", "b", ".c", "/d"] {
        let result = engine.validate(value);
        assert!(result.is_valid());
        assert!(result.was_skipped("never_active"));
        assert!(result.was_executed("always_attempted"));
    }
}

#[test]
fn test_cached_validation_is_idempotent() {
    let mut engine = RuleEngine::new();
    engine.add_rules(dotfile_rules());

    let first = engine.validate("..my rc");
    let second = engine.validate("..my rc");

    assert_eq!(first, second);
    assert_eq!(engine.stats().cache_hits, 1);
    assert_eq!(engine.get_stats().cache_size, 1);
}

#[test]
fn test_stale_cache_until_cleared() {
    init_logging();
    let mut engine = RuleEngine::new();
    engine.add_rule(Rule::new("lenient", ".*"));
    assert!(engine.validate("x").is_valid());

    engine.add_rule(Rule::new("strict", "^y"));
    assert!(engine.validate("x").is_valid());

    engine.clear_cache();
    assert!(!engine.validate("x").is_valid());
}

#[test]
fn test_context_attributes_gate_rules() {
    let mut engine = uncached(ExecutionStrategy::CollectAll);
    engine.add_conditional_rules(
        Condition::attribute_equals("kind", "directory"),
        vec![Rule::new("directory_has_no_extension", r"\.[a-z]+$").inverse()],
        Some("directories"),
    );

    let parent = EvaluationContext::new("/srv").with_attribute("kind", "directory");
    let ctx = EvaluationContext::new("").with_parent(parent);
    let result = engine.validate_in("backup.tar", ctx);
    assert!(!result.is_valid());

    let snapshot = result.violations[0].context.as_ref().unwrap();
    assert_eq!(snapshot.attributes.get("kind"), Some(&Value::from("directory")));

    let result = engine.validate_in("backup.tar", EvaluationContext::default());
    assert!(result.is_valid());
}

#[test]
fn test_cycle_does_not_break_validation() {
    init_logging();
    let mut engine = uncached(ExecutionStrategy::CollectAll);
    engine.add_rule(Rule::new("a", ".*").with_dependency("b"));
    engine.add_rule(Rule::new("b", ".*").with_dependency("a"));

    assert!(engine.has_cycle());
    assert_eq!(engine.execution_order(), ["a", "b"]);
    assert_eq!(engine.validate("x").executed_rules, vec!["a", "b"]);
}

#[test]
fn test_result_json_shape() {
    let mut engine = RuleEngine::new();
    engine.add_rules(absolute_path_rules());

    let result = engine.validate("/etc/");
    let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();

    assert_eq!(json["is_valid"], true);
    assert_eq!(json["info_count"], 1);
    assert_eq!(json["violations"][0]["rule_name"], "no_trailing_separator");
    assert_eq!(json["violations"][0]["severity"], "info");
}
