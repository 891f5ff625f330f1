//! Evaluation-time errors, per spec.md §4.5: function-call failures and
//! model-adapter failures both surface as evaluation errors, plus the two
//! failure modes unique to tree-walking itself — an unresolved `%constant`
//! and runaway recursion.

use fhirpath_model::ModelError;
use fhirpath_registry::FunctionError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Function(#[from] FunctionError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("undefined constant %{name}")]
    UndefinedConstant { name: String },

    #[error("unsupported: {message}")]
    Unsupported { message: String },

    #[error("recursion limit of {limit} exceeded")]
    RecursionLimitExceeded { limit: usize },
}

pub type EvaluationResult<T> = Result<T, EvaluationError>;
