//! System value lattice, type system and model adapter for the FHIRPath
//! runtime.
//!
//! This crate has no dependency on the parser, registry or evaluator: it is
//! the vocabulary they all share, the way the teacher's own `fhirpath-model`
//! crate sits underneath its `fhirpath-parser`/`fhirpath-registry`/
//! `fhirpath-evaluator` siblings.

pub mod collection;
pub mod error;
pub mod provider;
pub mod quantity;
pub mod temporal;
pub mod types;
pub mod value;

pub use collection::Collection;
pub use error::{ModelError, Result};
pub use provider::{ModelAdapter, ModelNode};
pub use quantity::Quantity;
pub use temporal::{DatePrecision, PartialDate, PartialDateTime, PartialTime, TimePrecision};
pub use types::{system_types, DataType, FqName, TypeSpec};
pub use value::{ArithmeticOp, CompareStatus, FhirPathValue};

#[cfg(feature = "json-adapter")]
pub mod json_adapter;
