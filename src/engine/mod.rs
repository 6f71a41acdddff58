//! Rule engine.
//!
//! The engine handles:
//! - Rule registration and dependency links
//! - Dependency-respecting execution order
//! - Fail-fast and collect-all execution
//! - Result caching and statistics

pub mod cache;
#[allow(clippy::module_inception)]
pub mod engine;
pub mod order;

pub use cache::{CacheKey, CacheStats, ResultCache, DEFAULT_CACHE_CAPACITY};
pub use engine::{EngineOptions, EngineReport, EngineStats, RuleEngine};
pub use order::OrderAnalyzer;
