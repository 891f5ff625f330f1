//! Parser error type, trimmed from the teacher's `fhirpath-parser::error`
//! (which layers a `fhirpath-diagnostics::Diagnostic` on top — out of scope
//! here, so `ParseError` carries its own position/message directly).

use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("unexpected token '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("expected {expected} at position {position}")]
    ExpectedToken { expected: String, position: usize },

    #[error("invalid {literal_type} literal at position {position}: {value}")]
    InvalidLiteral {
        literal_type: String,
        value: String,
        position: usize,
    },

    #[error("unclosed string literal starting at position {position}")]
    UnclosedString { position: usize },
}

impl ParseError {
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        ParseError::SyntaxError {
            position,
            message: message.into(),
        }
    }

    pub fn expected(position: usize, expected: impl Into<String>) -> Self {
        ParseError::ExpectedToken {
            position,
            expected: expected.into(),
        }
    }

    pub fn invalid_literal(
        position: usize,
        literal_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        ParseError::InvalidLiteral {
            position,
            literal_type: literal_type.into(),
            value: value.into(),
        }
    }
}
