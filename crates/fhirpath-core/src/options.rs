//! Compile-time knobs, threaded down into the [`crate::Executor`] it
//! produces.

use fhirpath_evaluator::EvaluationOptions;

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub evaluation: EvaluationOptions,
}
