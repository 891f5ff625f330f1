//! The `Function` execution contract and the `Looper` handle a function
//! with a declared `loop_arg_index` uses to evaluate its unevaluated
//! argument, per spec.md §4.4/§4.5.

use fhirpath_model::{Collection, FhirPathValue, ModelAdapter};

use crate::error::FunctionError;
use crate::spec::FunctionSpec;

/// A function's view of its loop argument: the evaluator owns the actual
/// sub-expression and context, and exposes just enough to drive iteration,
/// matching spec.md's `Looper.Evaluator()`/`IncIndex` contract.
pub trait LoopEvaluator {
    /// Evaluate the loop body with `$this` bound to `this` and `$index`
    /// bound to `index`.
    fn eval_once(&mut self, this: &FhirPathValue, index: usize) -> Result<FhirPathValue, FunctionError>;

    /// `$total` — the item count the loop was started with.
    fn total(&self) -> usize;
}

/// A built-in function registered by name and arity.
pub trait Function: Send + Sync {
    fn spec(&self) -> &FunctionSpec;

    /// `input` is the function's context collection (the left-hand side of
    /// `input.f(args)`, or the ambient context for a bare call). `args`
    /// holds every pre-evaluated argument; the slot named by
    /// `spec().loop_arg_index`, if any, is a placeholder `FhirPathValue::Collection`
    /// empty value and must be driven through `looper` instead. `model` is
    /// `None` when the evaluation was started with no adapter — only
    /// System-only functions may ignore it.
    fn execute(
        &self,
        input: &Collection,
        args: &[FhirPathValue],
        looper: Option<&mut dyn LoopEvaluator>,
        model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError>;
}

/// Unwraps a one-element collection into its element, per spec.md §3's
/// single-vs-collection coercion; for comparison/arithmetic-shaped helpers
/// that are only defined on singletons.
pub fn as_singleton(value: &FhirPathValue) -> Option<FhirPathValue> {
    match value {
        FhirPathValue::Collection(c) => match c.count() {
            0 => None,
            1 => c.get(0).cloned(),
            _ => None,
        },
        other => Some(other.clone()),
    }
}

pub fn collection_of(value: &FhirPathValue) -> Collection {
    match value {
        FhirPathValue::Collection(c) => c.clone(),
        other => Collection::single(other.clone()),
    }
}

/// Wrap a result the FHIRPath way: empty `Vec` becomes the empty
/// collection, a single item unwraps, more than one stays a collection.
pub fn wrap(mut items: Vec<FhirPathValue>) -> FhirPathValue {
    match items.len() {
        0 => FhirPathValue::Collection(Collection::empty()),
        1 => items.pop().unwrap(),
        _ => FhirPathValue::Collection(Collection::from_vec(items)),
    }
}

/// A loop criterion's truth value: empty means "does not satisfy" rather
/// than an error; a non-Boolean singleton is the hard error spec.md §4.6
/// names explicitly ("a filter argument that does not evaluate to Boolean").
pub fn criterion_truth(function: &str, value: FhirPathValue) -> Result<bool, FunctionError> {
    match as_singleton(&value) {
        None => Ok(false),
        Some(FhirPathValue::Boolean(b)) => Ok(b),
        Some(other) => Err(FunctionError::wrong_type(
            function,
            format!("criterion must evaluate to Boolean, got {:?}", other.data_type()),
        )),
    }
}
