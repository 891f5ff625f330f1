//! Binary and unary operator tags.
//!
//! Named and grouped exactly as spec.md §4.5/§6 lists them; variant names
//! follow the teacher's `fhirpath-parser` tokenizer/pratt naming
//! (`Add`/`Subtract`, `IntegerDivide`, `Equivalent`/`NotEquivalent`, ...).

/// A binary operator appearing in an `ExpressionNode::BinaryOp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryOperator {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `div`
    IntegerDivide,
    /// `mod`
    Modulo,
    /// `&`, string concatenation treating an empty operand as `''`
    Concatenate,
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `~`
    Equivalent,
    /// `!~`
    NotEquivalent,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `|`
    Union,
    /// `in`
    In,
    /// `contains`
    Contains,
    /// `and`
    And,
    /// `or`
    Or,
    /// `xor`
    Xor,
    /// `implies`
    Implies,
}

impl BinaryOperator {
    /// The source-level spelling, for diagnostics and pretty-printing.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::IntegerDivide => "div",
            BinaryOperator::Modulo => "mod",
            BinaryOperator::Concatenate => "&",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Equivalent => "~",
            BinaryOperator::NotEquivalent => "!~",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::Union => "|",
            BinaryOperator::In => "in",
            BinaryOperator::Contains => "contains",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
            BinaryOperator::Xor => "xor",
            BinaryOperator::Implies => "implies",
        }
    }

    /// Whether this is one of the four equality-family operators, which
    /// evaluate collection-wise rather than requiring singleton operands.
    pub fn is_equality(self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::Equivalent
                | BinaryOperator::NotEquivalent
        )
    }
}

/// A unary (prefix) operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnaryOperator {
    /// Unary `+`, a no-op kept for grammar completeness.
    Plus,
    /// Unary `-`
    Minus,
    /// `not`
    Not,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_family_is_recognized() {
        assert!(BinaryOperator::Equal.is_equality());
        assert!(BinaryOperator::NotEquivalent.is_equality());
        assert!(!BinaryOperator::LessThan.is_equality());
    }
}
