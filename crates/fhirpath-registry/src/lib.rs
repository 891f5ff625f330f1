//! Built-in FHIRPath function library and name/arity registry, per
//! spec.md §4.6/§4.7: "The registry keys by `(name, arity)` with a
//! preference for exact arity, falling back to the variadic form."

mod error;
mod function;
mod functions;
mod limits;
mod registry;
mod spec;

pub use error::FunctionError;
pub use function::{as_singleton, collection_of, criterion_truth, wrap, Function, LoopEvaluator};
pub use limits::MAX_RECURSION_DEPTH;
pub use registry::FunctionRegistry;
pub use spec::FunctionSpec;
