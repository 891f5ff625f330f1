//! Tokenizer and Pratt parser that turn FHIRPath source text into an
//! `fhirpath_ast::ExpressionNode` tree — the parse tree and the evaluator
//! tree are one and the same, as in the teacher's `fhirpath-ast` crate.

mod error;
mod pratt;
mod span;
mod tokenizer;

pub use error::{ParseError, ParseResult};
pub use pratt::parse;
pub use span::{Span, Spanned};
pub use tokenizer::{tokenize, Token};
