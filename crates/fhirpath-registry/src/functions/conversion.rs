//! `toInteger`, `toDecimal`, `toString`, `toBoolean`, `toQuantity`, `toDate`,
//! `toTime`, `toDateTime` — spec.md §4.6's conversion group. Every member
//! returns empty on a failed conversion rather than an error; none of them
//! ever raise `FunctionError`.

use std::str::FromStr;
use std::sync::Arc;

use fhirpath_model::{
    Collection, FhirPathValue, ModelAdapter, PartialDate, PartialDateTime, PartialTime, Quantity,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::FunctionError;
use crate::function::{Function, LoopEvaluator};
use crate::registry::FunctionRegistry;
use crate::spec::FunctionSpec;

fn empty_or(value: Option<FhirPathValue>) -> FhirPathValue {
    match value {
        Some(v) => v,
        None => FhirPathValue::Collection(Collection::empty()),
    }
}

/// The function's context collection, unwrapped to its single element.
/// Conversions are only defined on a singleton input; anything else (empty
/// or multi-valued) yields empty rather than an error.
fn singleton_input(input: &Collection) -> Option<FhirPathValue> {
    match input.count() {
        1 => input.get(0).cloned(),
        _ => None,
    }
}

fn to_integer(value: &FhirPathValue) -> Option<FhirPathValue> {
    let converted = match value {
        FhirPathValue::Integer(i) => *i,
        FhirPathValue::Decimal(d) => d.trunc().to_i32()?,
        FhirPathValue::Boolean(b) => i32::from(*b),
        FhirPathValue::String(s) => s.trim().parse::<i32>().ok()?,
        _ => return None,
    };
    Some(FhirPathValue::Integer(converted))
}

fn to_decimal(value: &FhirPathValue) -> Option<FhirPathValue> {
    let converted = match value {
        FhirPathValue::Integer(i) => Decimal::from(*i),
        FhirPathValue::Decimal(d) => *d,
        FhirPathValue::Boolean(b) => Decimal::from(i32::from(*b)),
        FhirPathValue::String(s) => Decimal::from_str(s.trim()).ok()?,
        _ => return None,
    };
    Some(FhirPathValue::Decimal(converted))
}

fn to_boolean(value: &FhirPathValue) -> Option<FhirPathValue> {
    let converted = match value {
        FhirPathValue::Boolean(b) => *b,
        FhirPathValue::Integer(1) => true,
        FhirPathValue::Integer(0) => false,
        FhirPathValue::Decimal(d) if *d == Decimal::ONE => true,
        FhirPathValue::Decimal(d) if *d == Decimal::ZERO => false,
        FhirPathValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" | "1.0" => true,
            "false" | "f" | "no" | "n" | "0" | "0.0" => false,
            _ => return None,
        },
        _ => return None,
    };
    Some(FhirPathValue::Boolean(converted))
}

fn to_quantity(value: &FhirPathValue) -> Option<FhirPathValue> {
    let quantity = match value {
        FhirPathValue::Quantity(q) => q.clone(),
        FhirPathValue::Integer(i) => Quantity::unitless(Decimal::from(*i)),
        FhirPathValue::Decimal(d) => Quantity::unitless(*d),
        FhirPathValue::String(s) => parse_quantity_string(s.trim())?,
        _ => return None,
    };
    Some(FhirPathValue::Quantity(quantity))
}

/// `"<number> '<unit>'"`, or a bare number for a unitless quantity.
fn parse_quantity_string(text: &str) -> Option<Quantity> {
    let text = text.trim();
    if let Some(rest) = text
        .strip_prefix(|c: char| c.is_ascii_digit() || c == '-' || c == '+')
        .map(|_| text)
    {
        let mut parts = rest.splitn(2, char::is_whitespace);
        let number = parts.next()?;
        let value = Decimal::from_str(number).ok()?;
        let unit = parts.next().map(str::trim).and_then(|u| {
            let trimmed = u.trim_matches('\'');
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        });
        return Some(Quantity::new(value, unit));
    }
    None
}

macro_rules! simple_conversion {
    ($struct_name:ident, $name:literal, $convert:path) => {
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
                let Some(item) = singleton_input(input) else {
                    return Ok(FhirPathValue::Collection(Collection::empty()));
                };
                Ok(empty_or($convert(&item)))
            }
        }
    };
}

simple_conversion!(ToIntegerFn, "toInteger", to_integer);
simple_conversion!(ToDecimalFn, "toDecimal", to_decimal);
simple_conversion!(ToBooleanFn, "toBoolean", to_boolean);
simple_conversion!(ToQuantityFn, "toQuantity", to_quantity);

pub struct ToStringFn;
impl Function for ToStringFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("toString", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(item) = singleton_input(input) else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        Ok(FhirPathValue::String(item.display_string().into()))
    }
}

pub struct ToDateFn;
impl Function for ToDateFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("toDate", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(item) = singleton_input(input) else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        let converted = match item {
            FhirPathValue::Date(d) => Some(FhirPathValue::Date(d)),
            FhirPathValue::DateTime(dt) => Some(FhirPathValue::Date(dt.date)),
            FhirPathValue::String(s) => PartialDate::parse(s.trim())
                .ok()
                .map(FhirPathValue::Date),
            _ => None,
        };
        Ok(empty_or(converted))
    }
}

pub struct ToTimeFn;
impl Function for ToTimeFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("toTime", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(item) = singleton_input(input) else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        let converted = match item {
            FhirPathValue::Time(t) => Some(FhirPathValue::Time(t)),
            FhirPathValue::String(s) => PartialTime::parse(s.trim())
                .ok()
                .map(FhirPathValue::Time),
            _ => None,
        };
        Ok(empty_or(converted))
    }
}

pub struct ToDateTimeFn;
impl Function for ToDateTimeFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("toDateTime", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(item) = singleton_input(input) else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        let converted = match item {
            FhirPathValue::DateTime(dt) => Some(FhirPathValue::DateTime(dt)),
            FhirPathValue::Date(d) => Some(FhirPathValue::DateTime(PartialDateTime {
                date: d,
                time: None,
            })),
            FhirPathValue::String(s) => PartialDateTime::parse(s.trim())
                .ok()
                .map(FhirPathValue::DateTime),
            _ => None,
        };
        Ok(empty_or(converted))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Arc::new(ToIntegerFn));
    registry.register(Arc::new(ToDecimalFn));
    registry.register(Arc::new(ToStringFn));
    registry.register(Arc::new(ToBooleanFn));
    registry.register(Arc::new(ToQuantityFn));
    registry.register(Arc::new(ToDateFn));
    registry.register(Arc::new(ToTimeFn));
    registry.register(Arc::new(ToDateTimeFn));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_integer_truncates_decimal() {
        let input = Collection::single(FhirPathValue::Decimal(Decimal::from_str("3.9").unwrap()));
        let result = ToIntegerFn.execute(&input, &[], None, None).unwrap();
        assert_eq!(result, FhirPathValue::Integer(3));
    }

    #[test]
    fn to_integer_on_non_numeric_string_is_empty() {
        let input = Collection::single(FhirPathValue::String("not a number".into()));
        let result = ToIntegerFn.execute(&input, &[], None, None).unwrap();
        assert_eq!(result, FhirPathValue::Collection(Collection::empty()));
    }

    #[test]
    fn to_boolean_recognizes_yes_no() {
        let input = Collection::single(FhirPathValue::String("yes".into()));
        let result = ToBooleanFn.execute(&input, &[], None, None).unwrap();
        assert_eq!(result, FhirPathValue::Boolean(true));
    }

    #[test]
    fn to_string_renders_integer() {
        let input = Collection::single(FhirPathValue::Integer(42));
        let result = ToStringFn.execute(&input, &[], None, None).unwrap();
        assert_eq!(result, FhirPathValue::String("42".into()));
    }

    #[test]
    fn to_quantity_parses_quoted_unit() {
        let input = Collection::single(FhirPathValue::String("4 'mg'".into()));
        let result = ToQuantityFn.execute(&input, &[], None, None).unwrap();
        match result {
            FhirPathValue::Quantity(q) => {
                assert_eq!(q.value, Decimal::from(4));
                assert_eq!(q.unit.as_deref(), Some("mg"));
            }
            other => panic!("expected Quantity, got {other:?}"),
        }
    }
}
