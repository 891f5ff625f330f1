//! The tree-walk itself, per spec.md §4.5: one function per
//! `ExpressionNode` shape, dispatching arithmetic/comparison/equality to
//! `FhirPathValue`'s own methods and built-in calls to the registry.

use std::str::FromStr;

use fhirpath_ast::{BinaryOpData, BinaryOperator, ExpressionNode, LiteralValue, UnaryOperator};
use fhirpath_model::{
    ArithmeticOp, Collection, CompareStatus, FhirPathValue, FqName, ModelAdapter, PartialDate,
    PartialDateTime, PartialTime, Quantity,
};
use fhirpath_registry::{as_singleton, collection_of, wrap};
use rust_decimal::Decimal;

use crate::context::EvaluationContext;
use crate::error::{EvaluationError, EvaluationResult};
use crate::looper::Looper;

pub fn evaluate(node: &ExpressionNode, ctx: &EvaluationContext) -> EvaluationResult<FhirPathValue> {
    match node {
        ExpressionNode::Literal(lit) => evaluate_literal(lit),
        ExpressionNode::Identifier(name) => evaluate_identifier(name, ctx),
        ExpressionNode::Variable(name) => {
            ctx.resolve_variable(name)
                .ok_or_else(|| EvaluationError::UndefinedConstant { name: name.clone() })
        }
        ExpressionNode::Path { base, path } => {
            let value = evaluate(base, ctx)?;
            navigate_children(&value, path, ctx.model())
        }
        ExpressionNode::Index { base, index } => evaluate_index(base, index, ctx),
        ExpressionNode::BinaryOp(data) => evaluate_binary(data, ctx),
        ExpressionNode::UnaryOp { op, operand } => evaluate_unary(*op, operand, ctx),
        ExpressionNode::FunctionCall(data) => {
            evaluate_call(&data.name, &data.args, ctx.input().clone(), ctx)
        }
        ExpressionNode::MethodCall(data) => {
            let base = evaluate(&data.base, ctx)?;
            evaluate_call(&data.name, &data.args, base, ctx)
        }
        ExpressionNode::TypeCheck {
            expression,
            type_name,
        } => evaluate_type_check(expression, type_name, ctx),
        ExpressionNode::TypeCast {
            expression,
            type_name,
        } => evaluate_type_cast(expression, type_name, ctx),
    }
}

fn evaluate_literal(lit: &LiteralValue) -> EvaluationResult<FhirPathValue> {
    Ok(match lit {
        LiteralValue::Boolean(b) => FhirPathValue::Boolean(*b),
        LiteralValue::Integer(i) => {
            let i = i32::try_from(*i).map_err(|_| EvaluationError::Unsupported {
                message: format!("integer literal {i} exceeds System.Integer range"),
            })?;
            FhirPathValue::Integer(i)
        }
        LiteralValue::Decimal(text) => {
            let d = Decimal::from_str(text).map_err(|_| EvaluationError::Unsupported {
                message: format!("invalid decimal literal {text:?}"),
            })?;
            FhirPathValue::Decimal(d)
        }
        LiteralValue::String(s) => FhirPathValue::string(s.clone()),
        LiteralValue::Date(text) => FhirPathValue::Date(PartialDate::parse(text)?),
        LiteralValue::Time(text) => FhirPathValue::Time(PartialTime::parse(text)?),
        LiteralValue::DateTime(text) => FhirPathValue::DateTime(PartialDateTime::parse(text)?),
        LiteralValue::Quantity { value, unit } => {
            let d = Decimal::from_str(value).map_err(|_| EvaluationError::Unsupported {
                message: format!("invalid quantity value {value:?}"),
            })?;
            FhirPathValue::Quantity(Quantity::new(d, Some(unit.clone())))
        }
        LiteralValue::Null => FhirPathValue::Collection(Collection::empty()),
    })
}

fn push_flattened(results: &mut Vec<FhirPathValue>, value: FhirPathValue) {
    match value {
        FhirPathValue::Collection(c) => results.extend(c.into_vec()),
        other => results.push(other),
    }
}

/// Applies child navigation (a plain `Identifier` or a `Path`'s `path`
/// segment) to every item of `value`, skipping items with no properties
/// (System primitives) and items whose adapter lookup comes back absent.
fn navigate_children(
    value: &FhirPathValue,
    name: &str,
    model: Option<&dyn ModelAdapter>,
) -> EvaluationResult<FhirPathValue> {
    let Some(model) = model else {
        return Ok(FhirPathValue::Collection(Collection::empty()));
    };
    let mut results = Vec::new();
    for item in collection_of(value).iter() {
        if let FhirPathValue::Node(node) = item {
            if let Some(property) = model.get_property(node, name) {
                push_flattened(&mut results, property);
            }
        }
    }
    Ok(wrap(results))
}

fn root_matches_type(ctx: &EvaluationContext, name: &str) -> bool {
    match (ctx.root(), ctx.model()) {
        (FhirPathValue::Node(node), Some(model)) => model.is_type(node, name),
        _ => false,
    }
}

/// A bare name navigates from the ambient context; when it resolves to no
/// property anywhere (e.g. the expression's leading `Patient` naming the
/// resource type itself) it falls back to the root resource, if that
/// resource's type matches.
fn evaluate_identifier(name: &str, ctx: &EvaluationContext) -> EvaluationResult<FhirPathValue> {
    let navigated = navigate_children(ctx.input(), name, ctx.model())?;
    let is_empty = matches!(&navigated, FhirPathValue::Collection(c) if c.is_empty());
    if !is_empty {
        return Ok(navigated);
    }
    if root_matches_type(ctx, name) {
        return Ok(ctx.root().clone());
    }
    Ok(FhirPathValue::Collection(Collection::empty()))
}

fn evaluate_index(
    base: &ExpressionNode,
    index: &ExpressionNode,
    ctx: &EvaluationContext,
) -> EvaluationResult<FhirPathValue> {
    let base_value = evaluate(base, ctx)?;
    let index_value = evaluate(index, ctx)?;
    let items = collection_of(&base_value);
    let i = match as_singleton(&index_value) {
        Some(FhirPathValue::Integer(i)) => i,
        _ => return Ok(FhirPathValue::Collection(Collection::empty())),
    };
    if i < 0 {
        return Ok(FhirPathValue::Collection(Collection::empty()));
    }
    Ok(items
        .get(i as usize)
        .cloned()
        .unwrap_or(FhirPathValue::Collection(Collection::empty())))
}

fn type_matches(
    value: &FhirPathValue,
    type_name: &str,
    model: Option<&dyn ModelAdapter>,
) -> EvaluationResult<bool> {
    match value {
        FhirPathValue::Node(node) => {
            let model = model.ok_or_else(|| EvaluationError::Unsupported {
                message: "type check on a model node requires a model adapter".to_string(),
            })?;
            let simple = type_name.rsplit('.').next().unwrap_or(type_name);
            Ok(model.is_type(node, simple))
        }
        other => {
            let fq = FqName::parse(type_name)?;
            Ok(other.type_spec().extends(&fq))
        }
    }
}

fn evaluate_type_check(
    expression: &ExpressionNode,
    type_name: &str,
    ctx: &EvaluationContext,
) -> EvaluationResult<FhirPathValue> {
    let value = evaluate(expression, ctx)?;
    match as_singleton(&value) {
        None => Ok(FhirPathValue::Collection(Collection::empty())),
        Some(v) => Ok(FhirPathValue::Boolean(type_matches(
            &v,
            type_name,
            ctx.model(),
        )?)),
    }
}

fn evaluate_type_cast(
    expression: &ExpressionNode,
    type_name: &str,
    ctx: &EvaluationContext,
) -> EvaluationResult<FhirPathValue> {
    let value = evaluate(expression, ctx)?;
    match as_singleton(&value) {
        None => Ok(FhirPathValue::Collection(Collection::empty())),
        Some(v) => {
            if type_matches(&v, type_name, ctx.model())? {
                Ok(v)
            } else {
                Ok(FhirPathValue::Collection(Collection::empty()))
            }
        }
    }
}

fn evaluate_unary(
    op: UnaryOperator,
    operand: &ExpressionNode,
    ctx: &EvaluationContext,
) -> EvaluationResult<FhirPathValue> {
    let value = evaluate(operand, ctx)?;
    match op {
        UnaryOperator::Plus => Ok(value),
        UnaryOperator::Minus => match as_singleton(&value) {
            None => Ok(FhirPathValue::Collection(Collection::empty())),
            Some(v) => v.negate().ok_or_else(|| EvaluationError::Unsupported {
                message: format!("unary '-' is not defined for {:?}", v.data_type()),
            }),
        },
        UnaryOperator::Not => match as_singleton(&value) {
            None => Ok(FhirPathValue::Collection(Collection::empty())),
            Some(FhirPathValue::Boolean(b)) => Ok(FhirPathValue::Boolean(!b)),
            Some(other) => Err(EvaluationError::Unsupported {
                message: format!("'not' requires a Boolean operand, got {:?}", other.data_type()),
            }),
        },
    }
}

fn evaluate_binary(data: &BinaryOpData, ctx: &EvaluationContext) -> EvaluationResult<FhirPathValue> {
    use BinaryOperator::*;
    if matches!(data.op, And | Or | Xor | Implies) {
        return evaluate_logical(data, ctx);
    }
    let left = evaluate(&data.left, ctx)?;
    let right = evaluate(&data.right, ctx)?;
    match data.op {
        Equal | NotEqual | Equivalent | NotEquivalent => {
            Ok(evaluate_equality(data.op, &left, &right, ctx.model()))
        }
        LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual => {
            evaluate_comparison(data.op, &left, &right)
        }
        Add | Subtract | Multiply | Divide | IntegerDivide | Modulo => {
            evaluate_arithmetic(data.op, &left, &right)
        }
        Concatenate => Ok(evaluate_concatenate(&left, &right)),
        Union => Ok(evaluate_union(&left, &right, ctx.model())),
        In => Ok(evaluate_in(&left, &right, ctx.model())),
        Contains => Ok(evaluate_in(&right, &left, ctx.model())),
        And | Or | Xor | Implies => unreachable!("handled by evaluate_logical above"),
    }
}

fn evaluate_equality(
    op: BinaryOperator,
    left: &FhirPathValue,
    right: &FhirPathValue,
    model: Option<&dyn ModelAdapter>,
) -> FhirPathValue {
    use BinaryOperator::*;
    let lc = collection_of(left);
    let rc = collection_of(right);
    let lw = FhirPathValue::Collection(lc.clone());
    let rw = FhirPathValue::Collection(rc.clone());
    match op {
        Equal => {
            if lc.is_empty() || rc.is_empty() {
                FhirPathValue::Collection(Collection::empty())
            } else {
                FhirPathValue::Boolean(lw.equal(&rw, model))
            }
        }
        NotEqual => {
            if lc.is_empty() || rc.is_empty() {
                FhirPathValue::Collection(Collection::empty())
            } else {
                FhirPathValue::Boolean(!lw.equal(&rw, model))
            }
        }
        Equivalent => FhirPathValue::Boolean(if lc.is_empty() && rc.is_empty() {
            true
        } else if lc.is_empty() != rc.is_empty() {
            false
        } else {
            lw.equivalent(&rw, model)
        }),
        NotEquivalent => FhirPathValue::Boolean(if lc.is_empty() && rc.is_empty() {
            false
        } else if lc.is_empty() != rc.is_empty() {
            true
        } else {
            !lw.equivalent(&rw, model)
        }),
        _ => unreachable!("caller guarantees an equality-family operator"),
    }
}

fn evaluate_comparison(
    op: BinaryOperator,
    left: &FhirPathValue,
    right: &FhirPathValue,
) -> EvaluationResult<FhirPathValue> {
    use BinaryOperator::*;
    let (l, r) = match (as_singleton(left), as_singleton(right)) {
        (Some(l), Some(r)) => (l, r),
        _ => return Ok(FhirPathValue::Collection(Collection::empty())),
    };
    match l.compare(&r) {
        CompareStatus::Evaluated(ord) => {
            let b = match op {
                LessThan => ord.is_lt(),
                LessThanOrEqual => ord.is_le(),
                GreaterThan => ord.is_gt(),
                GreaterThanOrEqual => ord.is_ge(),
                _ => unreachable!("caller guarantees a comparison operator"),
            };
            Ok(FhirPathValue::Boolean(b))
        }
        CompareStatus::Empty => Ok(FhirPathValue::Collection(Collection::empty())),
        CompareStatus::Inconvertible => Err(EvaluationError::Unsupported {
            message: format!(
                "{} is not defined between {:?} and {:?}",
                op.symbol(),
                l.data_type(),
                r.data_type()
            ),
        }),
    }
}

fn evaluate_arithmetic(
    op: BinaryOperator,
    left: &FhirPathValue,
    right: &FhirPathValue,
) -> EvaluationResult<FhirPathValue> {
    use BinaryOperator::*;
    let (l, r) = match (as_singleton(left), as_singleton(right)) {
        (Some(l), Some(r)) => (l, r),
        _ => return Ok(FhirPathValue::Collection(Collection::empty())),
    };
    if op == Add {
        if let (FhirPathValue::String(a), FhirPathValue::String(b)) = (&l, &r) {
            return Ok(FhirPathValue::string(format!("{a}{b}")));
        }
    }
    let arith = match op {
        Add => ArithmeticOp::Addition,
        Subtract => ArithmeticOp::Subtraction,
        Multiply => ArithmeticOp::Multiplication,
        Divide => ArithmeticOp::Division,
        IntegerDivide => ArithmeticOp::Div,
        Modulo => ArithmeticOp::Mod,
        _ => unreachable!("caller guarantees an arithmetic operator"),
    };
    match l.calc(&r, arith)? {
        Some(v) => Ok(v),
        None => Ok(FhirPathValue::Collection(Collection::empty())),
    }
}

fn display_or_empty(value: &FhirPathValue) -> String {
    match as_singleton(value) {
        None => String::new(),
        Some(v) => v.display_string(),
    }
}

fn evaluate_concatenate(left: &FhirPathValue, right: &FhirPathValue) -> FhirPathValue {
    FhirPathValue::string(format!("{}{}", display_or_empty(left), display_or_empty(right)))
}

fn evaluate_union(
    left: &FhirPathValue,
    right: &FhirPathValue,
    model: Option<&dyn ModelAdapter>,
) -> FhirPathValue {
    let mut result = collection_of(left);
    result.add_all_unique(&collection_of(right), model);
    wrap(result.into_vec())
}

fn evaluate_in(
    item: &FhirPathValue,
    haystack: &FhirPathValue,
    model: Option<&dyn ModelAdapter>,
) -> FhirPathValue {
    match as_singleton(item) {
        None if collection_of(item).is_empty() => {
            // spec.md §4.5: empty left returns empty, unless right is also
            // empty, in which case the result is `false` rather than empty.
            if collection_of(haystack).is_empty() {
                FhirPathValue::Boolean(false)
            } else {
                FhirPathValue::Collection(Collection::empty())
            }
        }
        None => FhirPathValue::Collection(Collection::empty()),
        Some(v) => FhirPathValue::Boolean(collection_of(haystack).contains(&v, model)),
    }
}

fn kleene(value: &FhirPathValue) -> EvaluationResult<Option<bool>> {
    match as_singleton(value) {
        None => Ok(None),
        Some(FhirPathValue::Boolean(b)) => Ok(Some(b)),
        Some(other) => Err(EvaluationError::Unsupported {
            message: format!("Boolean logic requires a Boolean operand, got {:?}", other.data_type()),
        }),
    }
}

/// `and`/`or` short-circuit on the left operand alone deciding the result,
/// so the right side is never evaluated in that case; `xor`/`implies`
/// (`implies`'s `false` case aside) need both sides.
fn evaluate_logical(data: &BinaryOpData, ctx: &EvaluationContext) -> EvaluationResult<FhirPathValue> {
    use BinaryOperator::*;
    let left = kleene(&evaluate(&data.left, ctx)?)?;

    if let And = data.op {
        if left == Some(false) {
            return Ok(FhirPathValue::Boolean(false));
        }
    }
    if let Or = data.op {
        if left == Some(true) {
            return Ok(FhirPathValue::Boolean(true));
        }
    }
    if let Implies = data.op {
        if left == Some(false) {
            return Ok(FhirPathValue::Boolean(true));
        }
    }

    let right = kleene(&evaluate(&data.right, ctx)?)?;
    let result = match data.op {
        And => match right {
            Some(true) if left == Some(true) => Some(true),
            Some(false) => Some(false),
            _ => None,
        },
        Or => match right {
            Some(true) => Some(true),
            Some(false) if left == Some(false) => Some(false),
            _ => None,
        },
        Xor => match (left, right) {
            (Some(a), Some(b)) => Some(a != b),
            _ => None,
        },
        Implies => match (left, right) {
            (Some(true), b) => b,
            (None, Some(true)) => Some(true),
            (None, _) => None,
            (Some(false), _) => unreachable!("handled by the early return above"),
        },
        _ => unreachable!("caller guarantees a logical operator"),
    };
    Ok(match result {
        Some(b) => FhirPathValue::Boolean(b),
        None => FhirPathValue::Collection(Collection::empty()),
    })
}

fn evaluate_call(
    name: &str,
    args_ast: &[ExpressionNode],
    input_value: FhirPathValue,
    ctx: &EvaluationContext,
) -> EvaluationResult<FhirPathValue> {
    let ctx = ctx.deeper()?;
    let function = ctx.registry().resolve(name, args_ast.len())?;
    let loop_index = function.spec().loop_arg_index;
    // Only live if the call actually supplied that many arguments — `iif`'s
    // `otherwiseResult` is optional, so a 2-arg call has no alt branch.
    let loop_index_alt = function
        .spec()
        .loop_arg_index_alt
        .filter(|&alt| alt < args_ast.len());

    let mut evaluated_args = Vec::with_capacity(args_ast.len());
    for (i, arg) in args_ast.iter().enumerate() {
        if Some(i) == loop_index || Some(i) == loop_index_alt {
            evaluated_args.push(FhirPathValue::Collection(Collection::empty()));
        } else {
            evaluated_args.push(evaluate(arg, &ctx)?);
        }
    }

    let input_collection = collection_of(&input_value);
    let model = ctx.model();

    match (loop_index, loop_index_alt) {
        (Some(idx), Some(alt)) => {
            let total = input_collection.count();
            let mut looper = Looper::new_branching(&args_ast[idx], &args_ast[alt], &ctx, total);
            Ok(function.execute(&input_collection, &evaluated_args, Some(&mut looper), model)?)
        }
        (Some(idx), None) => {
            let total = input_collection.count();
            let mut looper = Looper::new(&args_ast[idx], &ctx, total);
            Ok(function.execute(&input_collection, &evaluated_args, Some(&mut looper), model)?)
        }
        (None, _) => Ok(function.execute(&input_collection, &evaluated_args, None, model)?),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fhirpath_ast::ExpressionNode;
    use fhirpath_registry::FunctionRegistry;
    use smallvec::smallvec;

    use super::*;

    fn ctx(root: FhirPathValue) -> EvaluationContext {
        EvaluationContext::new(root, Arc::new(FunctionRegistry::standard()))
    }

    #[test]
    fn integer_literal_evaluates_to_integer() {
        let node = ExpressionNode::literal(LiteralValue::Integer(42));
        let result = evaluate(&node, &ctx(FhirPathValue::Collection(Collection::empty()))).unwrap();
        assert_eq!(result, FhirPathValue::Integer(42));
    }

    #[test]
    fn addition_promotes_integer_and_decimal() {
        let node = ExpressionNode::binary_op(
            BinaryOperator::Add,
            ExpressionNode::literal(LiteralValue::Integer(1)),
            ExpressionNode::literal(LiteralValue::Decimal("0.5".to_string())),
        );
        let result = evaluate(&node, &ctx(FhirPathValue::Collection(Collection::empty()))).unwrap();
        assert!(matches!(result, FhirPathValue::Decimal(_)));
    }

    #[test]
    fn division_by_zero_is_empty() {
        let node = ExpressionNode::binary_op(
            BinaryOperator::Divide,
            ExpressionNode::literal(LiteralValue::Integer(1)),
            ExpressionNode::literal(LiteralValue::Integer(0)),
        );
        let result = evaluate(&node, &ctx(FhirPathValue::Collection(Collection::empty()))).unwrap();
        assert_eq!(result, FhirPathValue::Collection(Collection::empty()));
    }

    #[test]
    fn equality_is_empty_when_either_side_is_empty() {
        let node = ExpressionNode::binary_op(
            BinaryOperator::Equal,
            ExpressionNode::literal(LiteralValue::Null),
            ExpressionNode::literal(LiteralValue::Integer(1)),
        );
        let result = evaluate(&node, &ctx(FhirPathValue::Collection(Collection::empty()))).unwrap();
        assert_eq!(result, FhirPathValue::Collection(Collection::empty()));
    }

    #[test]
    fn and_short_circuits_on_a_false_operand_even_if_the_other_is_empty() {
        let node = ExpressionNode::binary_op(
            BinaryOperator::And,
            ExpressionNode::literal(LiteralValue::Boolean(false)),
            ExpressionNode::literal(LiteralValue::Null),
        );
        let result = evaluate(&node, &ctx(FhirPathValue::Collection(Collection::empty()))).unwrap();
        assert_eq!(result, FhirPathValue::Boolean(false));
    }

    #[test]
    fn count_function_call_counts_the_input_collection() {
        let input = FhirPathValue::Collection(Collection::from_vec(vec![
            FhirPathValue::Integer(1),
            FhirPathValue::Integer(2),
        ]));
        let node = ExpressionNode::function_call("count", smallvec![]);
        let result = evaluate(&node, &ctx(input)).unwrap();
        assert_eq!(result, FhirPathValue::Integer(2));
    }
}
