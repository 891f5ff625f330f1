//! `where`, `select`, `repeat`, `ofType` — spec.md §4.6's filtering/
//! projection group. All four carry their sub-expression as the declared
//! loop argument.

use std::sync::Arc;

use fhirpath_model::{Collection, FhirPathValue, ModelAdapter};

use crate::error::FunctionError;
use crate::function::{as_singleton, criterion_truth, wrap, Function, LoopEvaluator};
use crate::limits::MAX_RECURSION_DEPTH;
use crate::registry::FunctionRegistry;
use crate::spec::FunctionSpec;

pub struct WhereFn;
impl Function for WhereFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("where", 1).with_loop_arg(0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let looper = looper.expect("where's criterion is always a loop argument");
        let mut kept = Vec::new();
        for (i, item) in input.iter().enumerate() {
            let result = looper.eval_once(item, i)?;
            if criterion_truth("where", result)? {
                kept.push(item.clone());
            }
        }
        Ok(wrap(kept))
    }
}

/// `select` flattens one level: a projection that itself returns a
/// collection contributes its items individually, not as a nested
/// collection-of-collections.
pub struct SelectFn;
impl Function for SelectFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("select", 1).with_loop_arg(0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let looper = looper.expect("select's projection is always a loop argument");
        let mut out = Vec::new();
        for (i, item) in input.iter().enumerate() {
            let projected = looper.eval_once(item, i)?;
            match projected {
                FhirPathValue::Collection(c) => out.extend(c.into_vec()),
                other => out.push(other),
            }
        }
        Ok(wrap(out))
    }
}

/// Runs the projection repeatedly over its own output until it contributes
/// nothing new, accumulating every intermediate result.
pub struct RepeatFn;
impl Function for RepeatFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("repeat", 1).with_loop_arg(0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let looper = looper.expect("repeat's projection is always a loop argument");
        let mut accumulated = Vec::new();
        let mut frontier: Vec<FhirPathValue> = input.iter().cloned().collect();
        let mut depth = 0;

        while !frontier.is_empty() {
            if depth >= MAX_RECURSION_DEPTH {
                return Err(FunctionError::RecursionLimitExceeded {
                    limit: MAX_RECURSION_DEPTH,
                });
            }
            depth += 1;
            let mut next_frontier = Vec::new();
            for (i, item) in frontier.iter().enumerate() {
                let projected = looper.eval_once(item, i)?;
                match projected {
                    FhirPathValue::Collection(c) => next_frontier.extend(c.into_vec()),
                    other => next_frontier.push(other),
                }
            }
            accumulated.extend(next_frontier.iter().cloned());
            frontier = next_frontier;
        }

        Ok(wrap(accumulated))
    }
}

pub struct OfTypeFn;
impl Function for OfTypeFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("ofType", 1);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let type_name = match as_singleton(&args[0]) {
            Some(FhirPathValue::String(s)) => s.to_string(),
            _ => {
                return Err(FunctionError::wrong_type(
                    "ofType",
                    "expects a type name argument",
                ))
            }
        };
        let kept: Vec<FhirPathValue> = input
            .iter()
            .filter(|item| match (item, model) {
                (FhirPathValue::Node(node), Some(model)) => model.is_type(node, &type_name),
                _ => item.type_spec().fq_name().name() == type_name,
            })
            .cloned()
            .collect();
        Ok(wrap(kept))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Arc::new(WhereFn));
    registry.register(Arc::new(SelectFn));
    registry.register(Arc::new(RepeatFn));
    registry.register(Arc::new(OfTypeFn));
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingLooper<F: FnMut(&FhirPathValue, usize) -> FhirPathValue> {
        f: F,
    }
    impl<F: FnMut(&FhirPathValue, usize) -> FhirPathValue> LoopEvaluator for CountingLooper<F> {
        fn eval_once(&mut self, this: &FhirPathValue, index: usize) -> Result<FhirPathValue, FunctionError> {
            Ok((self.f)(this, index))
        }
        fn total(&self) -> usize {
            0
        }
    }

    #[test]
    fn repeat_on_a_self_referencing_projection_hits_the_recursion_limit() {
        let input = Collection::single(FhirPathValue::Integer(1));
        let mut looper = CountingLooper {
            // Every item contributes itself again: the frontier never empties.
            f: |this, _index| this.clone(),
        };
        let err = RepeatFn
            .execute(&input, &[], Some(&mut looper), None)
            .unwrap_err();
        assert!(matches!(err, FunctionError::RecursionLimitExceeded { .. }));
    }

    #[test]
    fn where_keeps_items_satisfying_index_criterion() {
        let input = Collection::from_vec(vec![
            FhirPathValue::Integer(1),
            FhirPathValue::Integer(2),
            FhirPathValue::Integer(3),
        ]);
        let mut looper = CountingLooper {
            f: |_this, index| FhirPathValue::Boolean(index > 0),
        };
        let result = WhereFn.execute(&input, &[], Some(&mut looper), None).unwrap();
        match result {
            FhirPathValue::Collection(c) => assert_eq!(c.count(), 2),
            other => panic!("expected Collection, got {other:?}"),
        }
    }

    #[test]
    fn of_type_keeps_items_matching_the_system_type_by_name() {
        let input = Collection::from_vec(vec![
            FhirPathValue::Integer(1),
            FhirPathValue::string("x"),
            FhirPathValue::Integer(2),
        ]);
        let args = vec![FhirPathValue::string("Integer")];
        let result = OfTypeFn.execute(&input, &args, None, None).unwrap();
        match result {
            FhirPathValue::Collection(c) => assert_eq!(c.count(), 2),
            other => panic!("expected Collection, got {other:?}"),
        }
    }

    #[test]
    fn select_flattens_nested_collections() {
        let input = Collection::from_vec(vec![FhirPathValue::Integer(1), FhirPathValue::Integer(2)]);
        let mut looper = CountingLooper {
            f: |this, _index| {
                let FhirPathValue::Integer(n) = this else { unreachable!() };
                FhirPathValue::Collection(Collection::from_vec(vec![
                    FhirPathValue::Integer(*n),
                    FhirPathValue::Integer(n * 2),
                ]))
            },
        };
        let result = SelectFn.execute(&input, &[], Some(&mut looper), None).unwrap();
        match result {
            FhirPathValue::Collection(c) => assert_eq!(c.count(), 4),
            other => panic!("expected Collection, got {other:?}"),
        }
    }
}
