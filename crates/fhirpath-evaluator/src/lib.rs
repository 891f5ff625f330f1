//! Tree-walking evaluator, per spec.md §4.4/§4.5: an [`EvaluationContext`]
//! carrying the current input, bound variables and lambda frame, walked
//! over a parsed `fhirpath_ast::ExpressionNode` by [`evaluate`].

mod context;
mod error;
mod evaluate;
mod looper;
mod options;

pub use context::EvaluationContext;
pub use error::{EvaluationError, EvaluationResult};
pub use evaluate::evaluate;
pub use looper::Looper;
pub use options::EvaluationOptions;
