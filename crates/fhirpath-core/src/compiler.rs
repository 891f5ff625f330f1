//! Parses source text into a reusable [`Executor`], per spec.md §4.7's
//! `Compile(source) → Executor | ParseError` contract.

use std::sync::Arc;

use fhirpath_parser::ParseError;
use fhirpath_registry::FunctionRegistry;

use crate::executor::Executor;
use crate::options::CompileOptions;

pub fn compile(source: &str) -> Result<Executor, ParseError> {
    compile_with_options(source, CompileOptions::default())
}

pub fn compile_with_options(source: &str, options: CompileOptions) -> Result<Executor, ParseError> {
    let expression = fhirpath_parser::parse(source)?;
    log::debug!(target: "fhirpath::compile", "compiled {source:?}");
    Ok(Executor::new(
        expression,
        Arc::new(FunctionRegistry::standard()),
        options.evaluation,
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fhirpath_model::json_adapter::JsonModelAdapter;
    use fhirpath_model::{Collection, FhirPathValue, ModelAdapter};
    use serde_json::json;

    use super::*;
    use crate::env_vars::EnvVars;

    #[test]
    fn arithmetic_needs_no_model_adapter() {
        let executor = compile("1 + 2").unwrap();
        let root = FhirPathValue::Collection(Collection::empty());
        let result = executor.evaluate(&root, &EnvVars::new()).unwrap();
        assert_eq!(result, FhirPathValue::Integer(3));
    }

    #[test]
    fn navigation_through_a_json_adapter() {
        let adapter = JsonModelAdapter::new();
        let root = adapter.root(json!({"resourceType": "Patient", "name": {"family": "Doe"}}));
        let executor = compile("Patient.name.family").unwrap();
        let env = EnvVars::new().with_model(Arc::new(adapter) as Arc<dyn ModelAdapter>);
        let result = executor.evaluate(&root, &env).unwrap();
        assert_eq!(result, FhirPathValue::string("Doe"));
    }

    #[test]
    fn iif_never_evaluates_the_untaken_branch() {
        let root = FhirPathValue::Collection(Collection::empty());
        let taken = compile("iif(true, 1, nonexistentFn())").unwrap();
        assert_eq!(
            taken.evaluate(&root, &EnvVars::new()).unwrap(),
            FhirPathValue::Integer(1)
        );
        let other_taken = compile("iif(false, nonexistentFn(), 2)").unwrap();
        assert_eq!(
            other_taken.evaluate(&root, &EnvVars::new()).unwrap(),
            FhirPathValue::Integer(2)
        );
    }

    #[test]
    fn unknown_function_name_surfaces_as_evaluation_error() {
        let executor = compile("nonexistentFn()").unwrap();
        let root = FhirPathValue::Collection(Collection::empty());
        assert!(executor.evaluate(&root, &EnvVars::new()).is_err());
    }

    #[test]
    fn syntax_error_is_reported_at_compile_time() {
        assert!(compile("Patient..name").is_err());
    }
}
