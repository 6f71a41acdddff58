//! Conditions backed by arbitrary predicates.

use crate::core::context::EvaluationContext;
use crate::core::error::{EvalResult, EvaluationError};
use std::fmt;
use std::sync::Arc;

/// Predicate signature for custom conditions.
pub type ConditionPredicate = dyn Fn(&EvaluationContext) -> EvalResult<bool> + Send + Sync;

/// Wraps a one-argument predicate over the evaluation context.
#[derive(Clone)]
pub struct CustomCondition {
    description: String,
    predicate: Arc<ConditionPredicate>,
}

impl CustomCondition {
    /// Wrap an infallible predicate.
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&EvaluationContext) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            predicate: Arc::new(move |ctx: &EvaluationContext| -> EvalResult<bool> {
                Ok(predicate(ctx))
            }),
        }
    }

    /// Wrap a predicate that can fail. Failures count as `false`.
    pub fn fallible<F, E>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&EvaluationContext) -> Result<bool, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        Self {
            description: description.into(),
            predicate: Arc::new(move |ctx: &EvaluationContext| -> EvalResult<bool> {
                predicate(ctx).map_err(EvaluationError::predicate)
            }),
        }
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Run the predicate.
    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult<bool> {
        (self.predicate)(ctx)
    }
}

impl fmt::Debug for CustomCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomCondition")
            .field("description", &self.description)
            .field("predicate", &"<predicate>")
            .finish()
    }
}

impl fmt::Display for CustomCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomCondition({})", self.description)
    }
}
