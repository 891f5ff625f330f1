//! Function-dispatch error type, matching spec.md §7's error-kind list for
//! the parts that originate in the registry: arity, type, adapter,
//! regex-syntax, unsupported-operation.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FunctionError {
    #[error("{name} expects {min}..{} arguments, got {got}", max.map(|m| m.to_string()).unwrap_or_else(|| "∞".to_string()))]
    Arity {
        name: String,
        min: usize,
        max: Option<usize>,
        got: usize,
    },

    #[error("{function}: {message}")]
    Type { function: String, message: String },

    #[error("no function named '{name}' accepts {arity} argument(s)")]
    UndefinedFunction { name: String, arity: usize },

    #[error("model adapter error: {0}")]
    Adapter(String),

    #[error("invalid regular expression: {0}")]
    RegexSyntax(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("recursion limit of {limit} exceeded")]
    RecursionLimitExceeded { limit: usize },
}

impl FunctionError {
    pub fn wrong_type(function: &str, message: impl Into<String>) -> Self {
        FunctionError::Type {
            function: function.to_string(),
            message: message.into(),
        }
    }
}
