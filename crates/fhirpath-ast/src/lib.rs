//! Expression tree produced by the parser and walked by the evaluator.

mod expression;
mod operator;

pub use expression::{
    BinaryOpData, ExpressionNode, FunctionCallData, LiteralValue, MethodCallData,
};
pub use operator::{BinaryOperator, UnaryOperator};
