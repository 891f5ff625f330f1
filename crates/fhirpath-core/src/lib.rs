//! Compiler facade: `compile(source)` parses an expression once into an
//! [`Executor`] that can then be run against any number of root values and
//! environment-variable bindings, per spec.md §4.7. Re-exports the public
//! surface of the crates underneath so most callers only need this one.

mod compiler;
mod env_vars;
mod executor;
mod options;

pub use compiler::{compile, compile_with_options};
pub use env_vars::EnvVars;
pub use executor::Executor;
pub use options::CompileOptions;

pub use fhirpath_ast::{BinaryOperator, ExpressionNode, LiteralValue, UnaryOperator};
pub use fhirpath_evaluator::{EvaluationError, EvaluationOptions};
pub use fhirpath_model::{Collection, DataType, FhirPathValue, ModelAdapter, ModelNode};
pub use fhirpath_parser::ParseError;
pub use fhirpath_registry::{Function, FunctionError, FunctionRegistry, FunctionSpec};
