//! `abs`, `ceiling`, `floor`, `round`, `truncate`, `sqrt`, `ln`, `log`,
//! `exp`, `power` — spec.md §4.6's numeric group. `rust_decimal` isn't
//! built with its `maths` feature here, so the transcendental members
//! (`sqrt`/`ln`/`log`/`exp`/`power`) round-trip through `f64`, same as the
//! grounding source does.

use std::sync::Arc;

use fhirpath_model::{Collection, FhirPathValue, ModelAdapter};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::error::FunctionError;
use crate::function::{as_singleton, Function, LoopEvaluator};
use crate::registry::FunctionRegistry;
use crate::spec::FunctionSpec;

fn require_number(function: &str, input: &Collection) -> Result<Option<Decimal>, FunctionError> {
    let Some(item) = as_singleton(&FhirPathValue::Collection(input.clone())) else {
        return Ok(None);
    };
    match item {
        FhirPathValue::Integer(i) => Ok(Some(Decimal::from(i))),
        FhirPathValue::Decimal(d) => Ok(Some(d)),
        other => Err(FunctionError::wrong_type(
            function,
            format!("expects a numeric input, got {:?}", other.data_type()),
        )),
    }
}

fn to_f64(function: &str, d: Decimal) -> Result<f64, FunctionError> {
    d.to_f64()
        .ok_or_else(|| FunctionError::wrong_type(function, "value out of f64 range"))
}

fn from_f64(function: &str, f: f64) -> Result<FhirPathValue, FunctionError> {
    if f.is_nan() || f.is_infinite() {
        return Ok(FhirPathValue::Collection(Collection::empty()));
    }
    Decimal::from_f64(f)
        .map(FhirPathValue::Decimal)
        .ok_or_else(|| FunctionError::wrong_type(function, "result out of Decimal range"))
}

pub struct AbsFn;
impl Function for AbsFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("abs", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(item) = as_singleton(&FhirPathValue::Collection(input.clone())) else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        match item {
            FhirPathValue::Integer(i) => Ok(FhirPathValue::Integer(i.abs())),
            FhirPathValue::Decimal(d) => Ok(FhirPathValue::Decimal(d.abs())),
            FhirPathValue::Quantity(q) => Ok(FhirPathValue::Quantity(fhirpath_model::Quantity::new(
                q.value.abs(),
                q.unit,
            ))),
            other => Err(FunctionError::wrong_type(
                "abs",
                format!("expects a numeric input, got {:?}", other.data_type()),
            )),
        }
    }
}

pub struct CeilingFn;
impl Function for CeilingFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("ceiling", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(n) = require_number("ceiling", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        let ceiled = n.ceil().to_i32().ok_or_else(|| {
            FunctionError::wrong_type("ceiling", "result out of Integer range")
        })?;
        Ok(FhirPathValue::Integer(ceiled))
    }
}

pub struct FloorFn;
impl Function for FloorFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("floor", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(n) = require_number("floor", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        let floored = n
            .floor()
            .to_i32()
            .ok_or_else(|| FunctionError::wrong_type("floor", "result out of Integer range"))?;
        Ok(FhirPathValue::Integer(floored))
    }
}

pub struct RoundFn;
impl Function for RoundFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::range("round", 0, 1);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(n) = require_number("round", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        let precision = match args.first() {
            Some(FhirPathValue::Integer(p)) if *p >= 0 => *p as u32,
            Some(other) => {
                return Err(FunctionError::wrong_type(
                    "round",
                    format!("precision must be a non-negative Integer, got {:?}", other.data_type()),
                ))
            }
            None => 0,
        };
        Ok(FhirPathValue::Decimal(n.round_dp(precision)))
    }
}

pub struct TruncateFn;
impl Function for TruncateFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("truncate", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(n) = require_number("truncate", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        let truncated = n
            .trunc()
            .to_i32()
            .ok_or_else(|| FunctionError::wrong_type("truncate", "result out of Integer range"))?;
        Ok(FhirPathValue::Integer(truncated))
    }
}

pub struct SqrtFn;
impl Function for SqrtFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("sqrt", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(n) = require_number("sqrt", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        if n.is_sign_negative() && !n.is_zero() {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        }
        from_f64("sqrt", to_f64("sqrt", n)?.sqrt())
    }
}

pub struct LnFn;
impl Function for LnFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("ln", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(n) = require_number("ln", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        if n.is_sign_negative() || n.is_zero() {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        }
        from_f64("ln", to_f64("ln", n)?.ln())
    }
}

pub struct LogFn;
impl Function for LogFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("log", 1);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(n) = require_number("log", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        let base = match args.first() {
            Some(FhirPathValue::Integer(i)) => Decimal::from(*i),
            Some(FhirPathValue::Decimal(d)) => *d,
            Some(other) => {
                return Err(FunctionError::wrong_type(
                    "log",
                    format!("base must be numeric, got {:?}", other.data_type()),
                ))
            }
            None => {
                return Err(FunctionError::Arity {
                    name: "log".to_string(),
                    min: 1,
                    max: Some(1),
                    got: 0,
                })
            }
        };
        if n.is_sign_negative() || n.is_zero() || base.is_sign_negative() || base.is_zero() {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        }
        let result = to_f64("log", n)?.ln() / to_f64("log", base)?.ln();
        from_f64("log", result)
    }
}

pub struct ExpFn;
impl Function for ExpFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("exp", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(n) = require_number("exp", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        from_f64("exp", to_f64("exp", n)?.exp())
    }
}

/// Integer exponent `1` is the identity and never round-trips through
/// `f64`, avoiding needless precision loss on the common `x.power(1)` case.
pub struct PowerFn;
impl Function for PowerFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("power", 1);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(base) = require_number("power", input)? else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        match args.first() {
            Some(FhirPathValue::Integer(1)) => {
                return Ok(FhirPathValue::Decimal(base));
            }
            _ => {}
        }
        let exponent = match args.first() {
            Some(FhirPathValue::Integer(i)) => Decimal::from(*i),
            Some(FhirPathValue::Decimal(d)) => *d,
            Some(other) => {
                return Err(FunctionError::wrong_type(
                    "power",
                    format!("exponent must be numeric, got {:?}", other.data_type()),
                ))
            }
            None => {
                return Err(FunctionError::Arity {
                    name: "power".to_string(),
                    min: 1,
                    max: Some(1),
                    got: 0,
                })
            }
        };
        if base.is_sign_negative() && exponent.fract() != Decimal::ZERO {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        }
        let result = to_f64("power", base)?.powf(to_f64("power", exponent)?);
        from_f64("power", result)
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Arc::new(AbsFn));
    registry.register(Arc::new(CeilingFn));
    registry.register(Arc::new(FloorFn));
    registry.register(Arc::new(RoundFn));
    registry.register(Arc::new(TruncateFn));
    registry.register(Arc::new(SqrtFn));
    registry.register(Arc::new(LnFn));
    registry.register(Arc::new(LogFn));
    registry.register(Arc::new(ExpFn));
    registry.register(Arc::new(PowerFn));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn num(s: &str) -> Collection {
        Collection::single(FhirPathValue::Decimal(Decimal::from_str(s).unwrap()))
    }

    #[test]
    fn abs_on_negative_integer() {
        let input = Collection::single(FhirPathValue::Integer(-5));
        let result = AbsFn.execute(&input, &[], None, None).unwrap();
        assert_eq!(result, FhirPathValue::Integer(5));
    }

    #[test]
    fn ceiling_rounds_toward_positive_infinity() {
        let input = num("1.1");
        let result = CeilingFn.execute(&input, &[], None, None).unwrap();
        assert_eq!(result, FhirPathValue::Integer(2));
    }

    #[test]
    fn sqrt_of_negative_is_empty() {
        let input = num("-4");
        let result = SqrtFn.execute(&input, &[], None, None).unwrap();
        assert_eq!(result, FhirPathValue::Collection(Collection::empty()));
    }

    #[test]
    fn power_with_exponent_one_is_identity_without_float_roundtrip() {
        let input = num("3.5");
        let args = vec![FhirPathValue::Integer(1)];
        let result = PowerFn.execute(&input, &args, None, None).unwrap();
        assert_eq!(result, FhirPathValue::Decimal(Decimal::from_str("3.5").unwrap()));
    }

    #[test]
    fn round_respects_requested_precision() {
        let input = num("3.14159");
        let args = vec![FhirPathValue::Integer(2)];
        let result = RoundFn.execute(&input, &args, None, None).unwrap();
        assert_eq!(result, FhirPathValue::Decimal(Decimal::from_str("3.14").unwrap()));
    }
}
