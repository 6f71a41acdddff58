//! Rulenet CLI - Conditional Rule Networks
//!
//! This is a demonstration CLI for the Rulenet library. It checks path-like
//! values against the built-in presets or a TOML rule set.

use anyhow::{bail, Context, Result};
use rulenet::prelude::*;
use std::path::PathBuf;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();
    let program = program_name(&args);

    if args.len() < 2 {
        print_usage(program);
        return;
    }

    let outcome = match args[1].as_str() {
        "check" => check(&args[2..]),
        "presets" => {
            list_presets();
            Ok(true)
        }
        "help" | "--help" | "-h" => {
            print_usage(program);
            Ok(true)
        }
        "version" | "--version" => {
            println!("{} {}", rulenet::NAME, rulenet::VERSION);
            Ok(true)
        }
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_usage(program);
            Ok(false)
        }
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("❌ {:#}", e);
            std::process::exit(2);
        }
    }
}

/// Invoked program name, falling back to the crate name for an empty argv.
fn program_name(args: &[String]) -> &str {
    args.first().map(String::as_str).unwrap_or(rulenet::NAME)
}

fn print_usage(program: &str) {
    println!("🔎 Rulenet - Conditional Rule Networks v{}", rulenet::VERSION);
    println!();
    println!("Usage: {} <command> [options]", program);
    println!();
    println!("Commands:");
    println!("  check <value>... [options]  Validate one or more values");
    println!("  presets                     List the built-in rule presets");
    println!("  version                     Show the version");
    println!("  help                        Show this help message");
    println!();
    println!("Check options:");
    println!("  --config <file>   Load rules from a TOML rule set instead of the presets");
    println!("  --collect-all     Run every active rule instead of stopping at the first error");
    println!("  --json            Print results as JSON");
    println!();
    println!("Exit status is 1 when any value is invalid.");
}

/// Options for the `check` command.
#[derive(Debug, Default)]
struct CheckOptions {
    values: Vec<String>,
    config: Option<PathBuf>,
    collect_all: bool,
    json: bool,
}

fn parse_check_options(args: &[String]) -> Result<CheckOptions> {
    let mut options = CheckOptions::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                let Some(path) = args.get(i + 1) else {
                    bail!("--config needs a file path");
                };
                options.config = Some(PathBuf::from(path));
                i += 2;
            }
            "--collect-all" => {
                options.collect_all = true;
                i += 1;
            }
            "--json" => {
                options.json = true;
                i += 1;
            }
            flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
            value => {
                options.values.push(value.to_string());
                i += 1;
            }
        }
    }

    if options.values.is_empty() {
        bail!("Please specify at least one value to check");
    }
    Ok(options)
}

/// Presets gated on the shape of the value.
fn preset_engine() -> RuleEngine {
    let mut engine = RuleEngine::new();
    engine.add_conditional_rules(".", dotfile_rules(), Some("dotfiles"));
    engine.add_conditional_rules("/", absolute_path_rules(), Some("absolute_paths"));
    engine.add_conditional_rules(
        Condition::not(Condition::or(vec![
            Condition::starts_with("."),
            Condition::contains("/"),
        ])),
        filename_rules(),
        Some("filenames"),
    );
    engine
}

fn build_engine(options: &CheckOptions) -> Result<RuleEngine> {
    let mut engine = match &options.config {
        Some(path) => RuleSetConfig::from_path(path)
            .and_then(|config| config.build())
            .with_context(|| format!("Failed to load rule set {}", path.display()))?,
        None => preset_engine(),
    };

    if options.collect_all {
        engine.set_strategy(ExecutionStrategy::CollectAll);
    }
    Ok(engine)
}

fn check(args: &[String]) -> Result<bool> {
    let options = parse_check_options(args)?;
    let mut engine = build_engine(&options)?;

    let mut all_valid = true;
    let mut serialized = Vec::with_capacity(options.values.len());

    for value in &options.values {
        let result = engine.validate(value.as_str());
        all_valid &= result.is_valid();

        if options.json {
            serialized.push(result.to_serialized());
            continue;
        }

        println!("{}", result.summary());
        for line in result.detailed_violations() {
            println!("   {}", line);
        }
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&serialized)?);
    } else {
        let stats = engine.stats();
        log::info!(
            "{} validations, {} rule executions, {} condition evaluations",
            stats.validations,
            stats.rule_executions,
            stats.condition_evaluations
        );
    }

    Ok(all_valid)
}

fn list_presets() {
    let presets: [(&str, &str, Vec<Rule>); 3] = [
        ("dotfiles", "values starting with '.'", dotfile_rules()),
        ("absolute_paths", "values starting with '/'", absolute_path_rules()),
        ("filenames", "other values without '/'", filename_rules()),
    ];

    for (name, gate, rules) in presets {
        println!("  📁 {} ({})", name, gate);
        for rule in rules {
            let inverse = if rule.is_inverse() { ", inverse" } else { "" };
            println!(
                "      • {} [{}{}] - {}",
                rule.name(),
                rule.severity(),
                inverse,
                rule.description()
            );
        }
        println!();
    }
}
