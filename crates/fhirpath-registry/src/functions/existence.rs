//! `empty`, `exists`, `all`, `allTrue`/`anyTrue`/`allFalse`/`anyFalse`,
//! `subsetOf`/`supersetOf`, `count`, `distinct`, `isDistinct` — spec.md
//! §4.6's existence group, kept with the vacuous-truth rules
//! `original_source`'s `existence_function.go` states explicitly (SPEC_FULL
//! §7): `allTrue`/`allFalse` compare `f.all && f.t != b`, `anyTrue`/
//! `anyFalse` compare `!f.all && f.t == b`.

use std::sync::Arc;

use fhirpath_model::{Collection, FhirPathValue, ModelAdapter};

use crate::error::FunctionError;
use crate::function::{collection_of, criterion_truth, Function, LoopEvaluator};
use crate::registry::FunctionRegistry;
use crate::spec::FunctionSpec;

fn require_all_boolean<'a>(
    function: &str,
    items: impl Iterator<Item = &'a FhirPathValue>,
) -> Result<Vec<bool>, FunctionError> {
    items
        .map(|v| match v {
            FhirPathValue::Boolean(b) => Ok(*b),
            other => Err(FunctionError::wrong_type(
                function,
                format!("expects only Boolean items, got {:?}", other.data_type()),
            )),
        })
        .collect()
}

pub struct EmptyFn;
impl Function for EmptyFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("empty", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        Ok(FhirPathValue::Boolean(input.is_empty()))
    }
}

pub struct ExistsFn;
impl Function for ExistsFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::range("exists", 0, 1).with_loop_arg(0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(looper) = looper else {
            return Ok(FhirPathValue::Boolean(!input.is_empty()));
        };
        for (i, item) in input.iter().enumerate() {
            let result = looper.eval_once(item, i)?;
            if criterion_truth("exists", result)? {
                return Ok(FhirPathValue::Boolean(true));
            }
        }
        Ok(FhirPathValue::Boolean(false))
    }
}

pub struct AllFn;
impl Function for AllFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("all", 1).with_loop_arg(0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let looper = looper.expect("all always has its criterion wired as a loop argument");
        for (i, item) in input.iter().enumerate() {
            let result = looper.eval_once(item, i)?;
            if !criterion_truth("all", result)? {
                return Ok(FhirPathValue::Boolean(false));
            }
        }
        Ok(FhirPathValue::Boolean(true))
    }
}

macro_rules! boolean_quantifier {
    ($struct_name:ident, $name:literal, $vacuous:literal, $matches_all:literal, $target:literal) => {
        pub struct $struct_name;
        impl Function for $struct_name {
            fn spec(&self) -> &FunctionSpec {
                const SPEC: FunctionSpec = FunctionSpec::exact($name, 0);
                &SPEC
            }
            fn execute(
                &self,
                input: &Collection,
                _args: &[FhirPathValue],
                _looper: Option<&mut dyn LoopEvaluator>,
                _model: Option<&dyn ModelAdapter>,
            ) -> Result<FhirPathValue, FunctionError> {
                if input.is_empty() {
                    return Ok(FhirPathValue::Boolean($vacuous));
                }
                let items = require_all_boolean($name, input.iter())?;
                let result = if $matches_all {
                    items.iter().all(|&b| b == $target)
                } else {
                    items.iter().any(|&b| b == $target)
                };
                Ok(FhirPathValue::Boolean(result))
            }
        }
    };
}

boolean_quantifier!(AllTrueFn, "allTrue", true, true, true);
boolean_quantifier!(AnyTrueFn, "anyTrue", false, false, true);
boolean_quantifier!(AllFalseFn, "allFalse", true, true, false);
boolean_quantifier!(AnyFalseFn, "anyFalse", false, false, false);

pub struct SubsetOfFn;
impl Function for SubsetOfFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("subsetOf", 1);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let other = collection_of(&args[0]);
        Ok(FhirPathValue::Boolean(input.is_subset_of(&other, model)))
    }
}

pub struct SupersetOfFn;
impl Function for SupersetOfFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("supersetOf", 1);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let other = collection_of(&args[0]);
        Ok(FhirPathValue::Boolean(other.is_subset_of(input, model)))
    }
}

pub struct CountFn;
impl Function for CountFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("count", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        Ok(FhirPathValue::Integer(input.count() as i32))
    }
}

pub struct DistinctFn;
impl Function for DistinctFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("distinct", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        Ok(FhirPathValue::Collection(input.distinct(model)))
    }
}

pub struct IsDistinctFn;
impl Function for IsDistinctFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("isDistinct", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        if input.is_empty() {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        }
        Ok(FhirPathValue::Boolean(
            input.count() == input.distinct(model).count(),
        ))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Arc::new(EmptyFn));
    registry.register(Arc::new(ExistsFn));
    registry.register(Arc::new(AllFn));
    registry.register(Arc::new(AllTrueFn));
    registry.register(Arc::new(AnyTrueFn));
    registry.register(Arc::new(AllFalseFn));
    registry.register(Arc::new(AnyFalseFn));
    registry.register(Arc::new(SubsetOfFn));
    registry.register(Arc::new(SupersetOfFn));
    registry.register(Arc::new(CountFn));
    registry.register(Arc::new(DistinctFn));
    registry.register(Arc::new(IsDistinctFn));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_true_is_vacuously_true_on_empty() {
        let f = AllTrueFn;
        let result = f
            .execute(&Collection::empty(), &[], None, None)
            .unwrap();
        assert_eq!(result, FhirPathValue::Boolean(true));
    }

    #[test]
    fn any_false_is_false_on_empty() {
        let f = AnyFalseFn;
        let result = f
            .execute(&Collection::empty(), &[], None, None)
            .unwrap();
        assert_eq!(result, FhirPathValue::Boolean(false));
    }

    #[test]
    fn boolean_quantifier_errors_on_non_boolean_item() {
        let f = AllTrueFn;
        let input = Collection::single(FhirPathValue::Integer(1));
        assert!(f.execute(&input, &[], None, None).is_err());
    }

    #[test]
    fn is_distinct_is_empty_on_empty_input() {
        let f = IsDistinctFn;
        let result = f.execute(&Collection::empty(), &[], None, None).unwrap();
        assert_eq!(result, FhirPathValue::Collection(Collection::empty()));
    }

    #[test]
    fn subset_of_is_vacuously_true_when_input_empty() {
        let f = SubsetOfFn;
        let other = FhirPathValue::Collection(Collection::single(FhirPathValue::Integer(1)));
        let result = f.execute(&Collection::empty(), &[other], None, None).unwrap();
        assert_eq!(result, FhirPathValue::Boolean(true));
    }
}
