//! Validation outcomes.
//!
//! A run produces a [`ValidationResult`] holding the [`Violation`]s raised by
//! the rules that executed, plus the executed and skipped rule names.

pub mod result;

pub use result::{SerializedResult, ValidationResult, Violation};
