use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rulenet::prelude::*;

/// Engine with every path preset, gated on the value's shape
fn preset_engine(options: EngineOptions) -> RuleEngine {
    let mut engine = RuleEngine::with_options(options);
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

fn generate_values(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i % 4 {
            0 => format!(".config_{}", i),
            1 => format!("/usr/local/share/item_{}", i),
            2 => format!("/tmp//broken_{}/", i),
            _ => format!("file_{}.txt", i),
        })
        .collect()
}

/// Chain of `len` rules, each depending on the previous one, registered in reverse
fn dependency_chain(len: usize) -> Vec<Rule> {
    (0..len)
        .rev()
        .map(|i| {
            let rule = Rule::new(format!("rule_{}", i), ".*");
            if i == 0 {
                rule
            } else {
                rule.with_dependency(format!("rule_{}", i - 1))
            }
        })
        .collect()
}

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    let values = generate_values(1000);
    group.throughput(Throughput::Elements(values.len() as u64));

    for strategy in [ExecutionStrategy::FailFast, ExecutionStrategy::CollectAll] {
        group.bench_with_input(
            BenchmarkId::new("uncached", strategy),
            &values,
            |b, values| {
                let mut engine =
                    preset_engine(EngineOptions::new().with_strategy(strategy).with_cache(false));
                b.iter(|| {
                    for value in values {
                        black_box(engine.validate(value.as_str()));
                    }
                })
            },
        );
    }

    group.bench_with_input(BenchmarkId::new("cached", "fail_fast"), &values, |b, values| {
        let mut engine = preset_engine(EngineOptions::new().with_cache_capacity(values.len()));
        b.iter(|| {
            for value in values {
                black_box(engine.validate(value.as_str()));
            }
        })
    });

    group.finish();
}

fn bench_ordering(c: &mut Criterion) {
    let mut group = c.benchmark_group("execution_order");

    for len in [10usize, 100, 500] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter(|| {
                let mut engine = RuleEngine::new();
                engine.add_rules(dependency_chain(len));
                black_box(engine.execution_order().len())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_validation, bench_ordering);
criterion_main!(benches);
