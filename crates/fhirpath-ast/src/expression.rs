//! The expression tree a parsed FHIRPath program compiles to, and the
//! evaluator walks.
//!
//! Shaped after the teacher's `fhirpath-ast::expression::ExpressionNode`,
//! trimmed to the variants this runtime's grammar actually produces: FHIRPath
//! has no lambda-parameter syntax of its own (`where`/`select`/... bodies
//! just reference the ambient `$this`/`$index`/`$total` variables), so unlike
//! the teacher there is no separate `Lambda`/`Conditional` node — a loop
//! argument is an ordinary sub-expression the evaluator chooses not to
//! pre-evaluate, and `iif` is an ordinary `FunctionCall`.

use smallvec::SmallVec;

use crate::operator::{BinaryOperator, UnaryOperator};

/// A parsed FHIRPath literal, still holding its source text for types (like
/// `Decimal`) where the exact textual precision matters.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Boolean(bool),
    /// Integer literals exceed `i32` in intermediate parsing only when
    /// rejected outright; kept as `i64` until converted during evaluation.
    Integer(i64),
    /// Decimal literal text, preserved verbatim (`"1.10"` keeps its trailing
    /// zero) so the evaluator can build a `rust_decimal::Decimal` at the
    /// literal's own scale.
    Decimal(String),
    String(String),
    Date(String),
    Time(String),
    DateTime(String),
    Quantity { value: String, unit: String },
    /// The empty collection literal, `{}`.
    Null,
}

/// Arguments to a binary operator, boxed so `ExpressionNode` doesn't carry
/// the largest variant's size into every other variant.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOpData {
    pub op: BinaryOperator,
    pub left: ExpressionNode,
    pub right: ExpressionNode,
}

/// A bare function invocation, `name(args...)`, evaluated against the
/// ambient context (no explicit base expression).
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallData {
    pub name: String,
    pub args: SmallVec<[ExpressionNode; 4]>,
}

/// `base.name(args...)` — navigation followed by an invocation, evaluated
/// with `base`'s result as the function's input collection.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCallData {
    pub base: ExpressionNode,
    pub name: String,
    pub args: SmallVec<[ExpressionNode; 4]>,
}

/// The root node of a parsed expression or sub-expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionNode {
    Literal(LiteralValue),

    /// A bare name: either a child-element navigation relative to the
    /// ambient context, or (when it resolves to none) a type/resource name
    /// used as a navigation root.
    Identifier(String),

    /// `$this`, `$index`, `$total`, or a `%`-prefixed environment variable —
    /// all resolved the same way, by name, against the evaluation context.
    Variable(String),

    /// `base.path`, simple dotted navigation with no arguments.
    Path {
        base: Box<ExpressionNode>,
        path: String,
    },

    /// `base[index]`.
    Index {
        base: Box<ExpressionNode>,
        index: Box<ExpressionNode>,
    },

    BinaryOp(Box<BinaryOpData>),

    UnaryOp {
        op: UnaryOperator,
        operand: Box<ExpressionNode>,
    },

    FunctionCall(Box<FunctionCallData>),

    MethodCall(Box<MethodCallData>),

    /// `base is TypeName`.
    TypeCheck {
        expression: Box<ExpressionNode>,
        type_name: String,
    },

    /// `base as TypeName`.
    TypeCast {
        expression: Box<ExpressionNode>,
        type_name: String,
    },
}

impl ExpressionNode {
    pub fn literal(value: LiteralValue) -> Self {
        ExpressionNode::Literal(value)
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        ExpressionNode::Identifier(name.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        ExpressionNode::Variable(name.into())
    }

    pub fn path(base: ExpressionNode, path: impl Into<String>) -> Self {
        ExpressionNode::Path {
            base: Box::new(base),
            path: path.into(),
        }
    }

    pub fn index(base: ExpressionNode, index: ExpressionNode) -> Self {
        ExpressionNode::Index {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    pub fn binary_op(op: BinaryOperator, left: ExpressionNode, right: ExpressionNode) -> Self {
        ExpressionNode::BinaryOp(Box::new(BinaryOpData { op, left, right }))
    }

    pub fn unary_op(op: UnaryOperator, operand: ExpressionNode) -> Self {
        ExpressionNode::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn function_call(
        name: impl Into<String>,
        args: SmallVec<[ExpressionNode; 4]>,
    ) -> Self {
        ExpressionNode::FunctionCall(Box::new(FunctionCallData {
            name: name.into(),
            args,
        }))
    }

    pub fn method_call(
        base: ExpressionNode,
        name: impl Into<String>,
        args: SmallVec<[ExpressionNode; 4]>,
    ) -> Self {
        ExpressionNode::MethodCall(Box::new(MethodCallData {
            base,
            name: name.into(),
            args,
        }))
    }

    pub fn type_check(expression: ExpressionNode, type_name: impl Into<String>) -> Self {
        ExpressionNode::TypeCheck {
            expression: Box::new(expression),
            type_name: type_name.into(),
        }
    }

    pub fn type_cast(expression: ExpressionNode, type_name: impl Into<String>) -> Self {
        ExpressionNode::TypeCast {
            expression: Box::new(expression),
            type_name: type_name.into(),
        }
    }

    /// True for literals and bare identifiers — the two shapes that never
    /// need an evaluation context to resolve to a constant or a single
    /// unqualified navigation step.
    pub fn is_simple(&self) -> bool {
        matches!(
            self,
            ExpressionNode::Literal(_) | ExpressionNode::Identifier(_)
        )
    }

    /// The function name this node invokes against the ambient or a
    /// chained context, if it's a call at all. Used by the evaluator to look
    /// up a `Function` by name without a separate destructuring match at
    /// every call site.
    pub fn call_name(&self) -> Option<&str> {
        match self {
            ExpressionNode::FunctionCall(data) => Some(&data.name),
            ExpressionNode::MethodCall(data) => Some(&data.name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_chain_nests_base_left() {
        let expr = ExpressionNode::path(
            ExpressionNode::path(ExpressionNode::identifier("Patient"), "name"),
            "family",
        );
        match expr {
            ExpressionNode::Path { base, path } => {
                assert_eq!(path, "family");
                assert!(matches!(*base, ExpressionNode::Path { .. }));
            }
            _ => panic!("expected Path"),
        }
    }

    #[test]
    fn method_call_carries_base_separately_from_bare_call() {
        let bare = ExpressionNode::function_call("today", SmallVec::new());
        let method = ExpressionNode::method_call(
            ExpressionNode::identifier("name"),
            "exists",
            SmallVec::new(),
        );
        assert_eq!(bare.call_name(), Some("today"));
        assert_eq!(method.call_name(), Some("exists"));
        assert!(matches!(method, ExpressionNode::MethodCall(_)));
    }

    #[test]
    fn special_variables_and_environment_variables_share_one_variant() {
        assert_eq!(
            ExpressionNode::variable("this"),
            ExpressionNode::Variable("this".to_string())
        );
        assert_eq!(
            ExpressionNode::variable("ext-patient-birthTime"),
            ExpressionNode::Variable("ext-patient-birthTime".to_string())
        );
    }
}
