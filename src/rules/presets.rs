//! Ready-made rule sets for path-like values.
//!
//! Each function returns fresh, unregistered rules. Pair them with a gating
//! condition through
//! [`RuleEngine::add_conditional_rules`](crate::engine::RuleEngine::add_conditional_rules)
//! when they should only apply to some values.

use crate::core::types::Severity;
use crate::rules::rule::Rule;

/// Maximum filename length accepted by [`filename_rules`].
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Rules for hidden files such as `.bashrc`.
pub fn dotfile_rules() -> Vec<Rule> {
    vec![
        Rule::new("valid_dotfile", r"^\.[^/\\]+$")
            .with_description("Must be valid dotfile format"),
        Rule::new("no_double_dots", r"^\.{2,}")
            .inverse()
            .with_severity(Severity::Warning)
            .with_description("Should not start with multiple dots"),
        Rule::new("no_spaces_in_dotfile", r"\s")
            .inverse()
            .with_severity(Severity::Warning)
            .with_description("Dotfiles should not contain spaces"),
    ]
}

/// Rules for absolute paths with `/` or `\` separators.
pub fn absolute_path_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "valid_absolute_path",
            r#"^[/\\]([^/\\<>:"|?*\x00-\x1f]+[/\\])*[^/\\<>:"|?*\x00-\x1f]*$"#,
        )
        .with_description("Must be valid absolute path"),
        Rule::new("no_double_separators", r"[/\\]{2,}")
            .inverse()
            .with_severity(Severity::Warning)
            .with_description("Should not have consecutive separators"),
        Rule::new("no_trailing_separator", r"[/\\]$")
            .inverse()
            .with_severity(Severity::Info)
            .with_description("Should not end with separator"),
    ]
}

/// Rules for a single path component.
pub fn filename_rules() -> Vec<Rule> {
    vec![
        Rule::new("valid_filename", r#"^[^/\\<>:"|?*\x00-\x1f]+$"#)
            .with_description("Must be valid filename"),
        Rule::predicate("reasonable_filename_length", |value| {
            value.to_string().chars().count() <= MAX_FILENAME_LENGTH
        })
        .with_severity(Severity::Warning)
        .with_description("Filename should be reasonable length"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Value;

    fn failures(rules: &mut [Rule], value: &str) -> Vec<String> {
        let value = Value::from(value);
        rules
            .iter_mut()
            .filter_map(|rule| rule.validate(&value, None))
            .map(|v| v.rule_name)
            .collect()
    }

    #[test]
    fn test_dotfile_rules() {
        let mut rules = dotfile_rules();
        assert!(failures(&mut rules, ".bashrc").is_empty());
        assert_eq!(failures(&mut rules, "..hidden"), vec!["no_double_dots"]);
        assert_eq!(failures(&mut rules, ".my config"), vec!["no_spaces_in_dotfile"]);
        assert_eq!(failures(&mut rules, ".config/nvim"), vec!["valid_dotfile"]);
    }

    #[test]
    fn test_absolute_path_rules() {
        let mut rules = absolute_path_rules();
        assert!(failures(&mut rules, "/usr/local/bin").is_empty());
        assert_eq!(failures(&mut rules, "/usr/local/"), vec!["no_trailing_separator"]);
        assert_eq!(
            failures(&mut rules, "/usr//bin"),
            vec!["valid_absolute_path", "no_double_separators"]
        );
        assert_eq!(failures(&mut rules, "relative/path"), vec!["valid_absolute_path"]);
    }

    #[test]
    fn test_filename_rules() {
        let mut rules = filename_rules();
        assert!(failures(&mut rules, "notes.txt").is_empty());
        assert_eq!(failures(&mut rules, "a/b"), vec!["valid_filename"]);
        assert_eq!(
            failures(&mut rules, &"x".repeat(MAX_FILENAME_LENGTH + 1)),
            vec!["reasonable_filename_length"]
        );
    }
}
