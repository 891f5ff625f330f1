//! `union`, `combine` — spec.md §4.6's combining group. `union` is also the
//! evaluator's `|` operator under the hood; the function form lets it be
//! called positionally as `a.union(b)`.

use std::sync::Arc;

use fhirpath_model::{Collection, FhirPathValue};

use crate::error::FunctionError;
use crate::function::{collection_of, wrap, Function, LoopEvaluator};
use crate::registry::FunctionRegistry;
use crate::spec::FunctionSpec;

/// Merges `input` and the argument, dropping duplicates (by `FhirPathValue::equal`).
pub struct UnionFn;
impl Function for UnionFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("union", 1);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        model: Option<&dyn fhirpath_model::ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let mut merged = input.clone();
        merged.add_all_unique(&collection_of(&args[0]), model);
        Ok(wrap(merged.into_vec()))
    }
}

/// Merges `input` and the argument, keeping every element including duplicates.
pub struct CombineFn;
impl Function for CombineFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("combine", 1);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn fhirpath_model::ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let mut merged = input.clone();
        merged.add_all(&collection_of(&args[0]));
        Ok(wrap(merged.into_vec()))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Arc::new(UnionFn));
    registry.register(Arc::new(CombineFn));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_drops_duplicates_across_both_sides() {
        let input = Collection::from_vec(vec![FhirPathValue::Integer(1), FhirPathValue::Integer(2)]);
        let arg = FhirPathValue::Collection(Collection::from_vec(vec![
            FhirPathValue::Integer(2),
            FhirPathValue::Integer(3),
        ]));
        let result = UnionFn.execute(&input, &[arg], None, None).unwrap();
        match result {
            FhirPathValue::Collection(c) => assert_eq!(c.count(), 3),
            other => panic!("expected Collection, got {other:?}"),
        }
    }

    #[test]
    fn combine_keeps_duplicates() {
        let input = Collection::single(FhirPathValue::Integer(1));
        let arg = FhirPathValue::Integer(1);
        let result = CombineFn.execute(&input, &[arg], None, None).unwrap();
        match result {
            FhirPathValue::Collection(c) => assert_eq!(c.count(), 2),
            other => panic!("expected Collection, got {other:?}"),
        }
    }
}
