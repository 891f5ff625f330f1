//! `indexOf`, `substring`, `startsWith`, `endsWith`, `contains`, `upper`,
//! `lower`, `replace`, `matches`, `replaceMatches`, `length`, `toChars` —
//! spec.md §4.6's string group. Indices and lengths are Unicode code-point
//! counts, not byte offsets; `matches`/`replaceMatches` use the `regex`
//! crate's own flavor per REDESIGN FLAG 2 rather than emulating another
//! engine's syntax.

use std::sync::Arc;

use fhirpath_model::{Collection, FhirPathValue, ModelAdapter};
use regex::Regex;

use crate::error::FunctionError;
use crate::function::{wrap, Function, LoopEvaluator};
use crate::registry::FunctionRegistry;
use crate::spec::FunctionSpec;

fn require_string(function: &str, input: &Collection) -> Result<Option<Arc<str>>, FunctionError> {
    match input.count() {
        0 => Ok(None),
        1 => match input.get(0) {
            Some(FhirPathValue::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(FunctionError::wrong_type(
                function,
                format!("expects a String input, got {:?}", other.data_type()),
            )),
            None => Ok(None),
        },
        _ => Err(FunctionError::wrong_type(
            function,
            "expects a singleton String input",
        )),
    }
}

fn arg_string(function: &str, args: &[FhirPathValue], index: usize) -> Result<String, FunctionError> {
    match args.get(index) {
        Some(FhirPathValue::String(s)) => Ok(s.to_string()),
        Some(other) => Err(FunctionError::wrong_type(
            function,
            format!("expects a String argument, got {:?}", other.data_type()),
        )),
        None => Err(FunctionError::Arity {
            name: function.to_string(),
            min: index + 1,
            max: None,
            got: args.len(),
        }),
    }
}

fn compile_regex(function: &str, pattern: &str) -> Result<Regex, FunctionError> {
    Regex::new(pattern).map_err(|err| FunctionError::RegexSyntax(format!("{function}: {err}")))
}

pub struct IndexOfFn;
impl Function for IndexOfFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("indexOf", 1);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(haystack) = require_string("indexOf", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        let needle = arg_string("indexOf", args, 0)?;
        if needle.is_empty() {
            return Ok(FhirPathValue::Integer(0));
        }
        let chars: Vec<char> = haystack.chars().collect();
        let needle_chars: Vec<char> = needle.chars().collect();
        for start in 0..chars.len() {
            if chars[start..].starts_with(needle_chars.as_slice()) {
                return Ok(FhirPathValue::Integer(start as i32));
            }
        }
        Ok(FhirPathValue::Integer(-1))
    }
}

pub struct SubstringFn;
impl Function for SubstringFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::range("substring", 1, 2);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(source) = require_string("substring", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        let start = match args.first() {
            Some(FhirPathValue::Integer(i)) => *i,
            Some(other) => {
                return Err(FunctionError::wrong_type(
                    "substring",
                    format!("start index must be Integer, got {:?}", other.data_type()),
                ))
            }
            None => {
                return Err(FunctionError::Arity {
                    name: "substring".to_string(),
                    min: 1,
                    max: Some(2),
                    got: 0,
                })
            }
        };
        let chars: Vec<char> = source.chars().collect();
        if start < 0 || start as usize >= chars.len() {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        }
        let start = start as usize;
        let end = match args.get(1) {
            Some(FhirPathValue::Integer(len)) => (start + (*len).max(0) as usize).min(chars.len()),
            Some(other) => {
                return Err(FunctionError::wrong_type(
                    "substring",
                    format!("length must be Integer, got {:?}", other.data_type()),
                ))
            }
            None => chars.len(),
        };
        let result: String = chars[start..end].iter().collect();
        Ok(FhirPathValue::String(result.into()))
    }
}

pub struct StartsWithFn;
impl Function for StartsWithFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("startsWith", 1);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(source) = require_string("startsWith", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        let prefix = arg_string("startsWith", args, 0)?;
        Ok(FhirPathValue::Boolean(source.starts_with(prefix.as_str())))
    }
}

pub struct EndsWithFn;
impl Function for EndsWithFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("endsWith", 1);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(source) = require_string("endsWith", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        let suffix = arg_string("endsWith", args, 0)?;
        Ok(FhirPathValue::Boolean(source.ends_with(suffix.as_str())))
    }
}

pub struct ContainsFn;
impl Function for ContainsFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("contains", 1);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(source) = require_string("contains", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        let needle = arg_string("contains", args, 0)?;
        Ok(FhirPathValue::Boolean(source.contains(needle.as_str())))
    }
}

pub struct UpperFn;
impl Function for UpperFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("upper", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(source) = require_string("upper", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        Ok(FhirPathValue::String(source.to_uppercase().into()))
    }
}

pub struct LowerFn;
impl Function for LowerFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("lower", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(source) = require_string("lower", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        Ok(FhirPathValue::String(source.to_lowercase().into()))
    }
}

pub struct ReplaceFn;
impl Function for ReplaceFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("replace", 2);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(source) = require_string("replace", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        let pattern = arg_string("replace", args, 0)?;
        let substitution = arg_string("replace", args, 1)?;
        let replaced = if pattern.is_empty() {
            source.to_string()
        } else {
            source.replace(pattern.as_str(), substitution.as_str())
        };
        Ok(FhirPathValue::String(replaced.into()))
    }
}

pub struct MatchesFn;
impl Function for MatchesFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("matches", 1);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(source) = require_string("matches", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        let pattern = arg_string("matches", args, 0)?;
        let regex = compile_regex("matches", &pattern)?;
        Ok(FhirPathValue::Boolean(regex.is_match(&source)))
    }
}

pub struct ReplaceMatchesFn;
impl Function for ReplaceMatchesFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("replaceMatches", 2);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(source) = require_string("replaceMatches", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        let pattern = arg_string("replaceMatches", args, 0)?;
        let substitution = arg_string("replaceMatches", args, 1)?;
        let regex = compile_regex("replaceMatches", &pattern)?;
        let replaced = regex.replace_all(&source, substitution.as_str()).into_owned();
        Ok(FhirPathValue::String(replaced.into()))
    }
}

pub struct LengthFn;
impl Function for LengthFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("length", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(source) = require_string("length", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        Ok(FhirPathValue::Integer(source.chars().count() as i32))
    }
}

pub struct ToCharsFn;
impl Function for ToCharsFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("toChars", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(source) = require_string("toChars", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        let chars: Vec<FhirPathValue> = source
            .chars()
            .map(|c| FhirPathValue::String(c.to_string().into()))
            .collect();
        Ok(wrap(chars))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Arc::new(IndexOfFn));
    registry.register(Arc::new(SubstringFn));
    registry.register(Arc::new(StartsWithFn));
    registry.register(Arc::new(EndsWithFn));
    registry.register(Arc::new(ContainsFn));
    registry.register(Arc::new(UpperFn));
    registry.register(Arc::new(LowerFn));
    registry.register(Arc::new(ReplaceFn));
    registry.register(Arc::new(MatchesFn));
    registry.register(Arc::new(ReplaceMatchesFn));
    registry.register(Arc::new(LengthFn));
    registry.register(Arc::new(ToCharsFn));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_input(s: &str) -> Collection {
        Collection::single(FhirPathValue::String(s.into()))
    }

    #[test]
    fn index_of_counts_code_points_not_bytes() {
        let input = string_input("héllo");
        let args = vec![FhirPathValue::String("llo".into())];
        let result = IndexOfFn.execute(&input, &args, None, None).unwrap();
        assert_eq!(result, FhirPathValue::Integer(2));
    }

    #[test]
    fn substring_clamps_length_past_end() {
        let input = string_input("hello");
        let args = vec![FhirPathValue::Integer(3), FhirPathValue::Integer(100)];
        let result = SubstringFn.execute(&input, &args, None, None).unwrap();
        assert_eq!(result, FhirPathValue::String("lo".into()));
    }

    #[test]
    fn substring_start_past_end_is_empty() {
        let input = string_input("hi");
        let args = vec![FhirPathValue::Integer(10)];
        let result = SubstringFn.execute(&input, &args, None, None).unwrap();
        assert_eq!(result, FhirPathValue::Collection(Collection::empty()));
    }

    #[test]
    fn matches_uses_rust_regex_syntax() {
        let input = string_input("abc123");
        let args = vec![FhirPathValue::String(r"^[a-z]+\d+$".into())];
        let result = MatchesFn.execute(&input, &args, None, None).unwrap();
        assert_eq!(result, FhirPathValue::Boolean(true));
    }

    #[test]
    fn invalid_regex_is_a_hard_error() {
        let input = string_input("abc");
        let args = vec![FhirPathValue::String("(".into())];
        assert!(MatchesFn.execute(&input, &args, None, None).is_err());
    }

    #[test]
    fn to_chars_splits_on_code_points() {
        let input = string_input("ab");
        let result = ToCharsFn.execute(&input, &[], None, None).unwrap();
        match result {
            FhirPathValue::Collection(c) => assert_eq!(c.count(), 2),
            other => panic!("expected Collection, got {other:?}"),
        }
    }
}
