//! The System value lattice and its polymorphic operation contract.
//!
//! Every value is immutable and carries a [`DataType`] tag. Rather than the
//! capability-interface style of the Go original (`NumberAccessor`,
//! `Comparator`, `Negator`...), this follows the tagged-variant form the
//! design notes recommend: one enum, dispatch by `match`, capability checks
//! become `Option`-returning methods instead of interface downcasts.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::collection::Collection;
use crate::error::{ModelError, Result};
use crate::provider::{ModelAdapter, ModelNode};
use crate::quantity::Quantity;
use crate::temporal::{PartialDate, PartialDateTime, PartialTime};
use crate::types::{system_types, DataType, TypeSpec};

/// A System value, a model node awaiting navigation, or a collection of
/// either.
#[derive(Clone)]
pub enum FhirPathValue {
    /// `System.Boolean`
    Boolean(bool),
    /// `System.Integer`, 32-bit signed
    Integer(i32),
    /// `System.Decimal`, arbitrary precision
    Decimal(Decimal),
    /// `System.String`
    String(Arc<str>),
    /// `System.Date`
    Date(PartialDate),
    /// `System.Time`
    Time(PartialTime),
    /// `System.DateTime`
    DateTime(PartialDateTime),
    /// `System.Quantity`
    Quantity(Quantity),
    /// `System.Collection`
    Collection(Collection),
    /// A foreign node not yet converted to a System type; the only path by
    /// which non-System data enters evaluation (see `ModelAdapter`).
    Node(Arc<dyn ModelNode>),
}

/// The arithmetic operators `Calc` understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    /// `+`
    Addition,
    /// `-`
    Subtraction,
    /// `*`
    Multiplication,
    /// `/`
    Division,
    /// `div`
    Div,
    /// `mod`
    Mod,
}

/// The outcome of [`FhirPathValue::compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareStatus {
    /// A definite ordering was produced.
    Evaluated(Ordering),
    /// The values are of comparable types but this particular pair cannot
    /// be ordered (e.g. mismatched temporal precision, incompatible units).
    Empty,
    /// The two values are not of comparable types at all.
    Inconvertible,
}

impl FhirPathValue {
    /// A convenience constructor for an interned string value.
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        FhirPathValue::String(s.into())
    }

    /// The data type tag of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            FhirPathValue::Boolean(_) => DataType::Boolean,
            FhirPathValue::Integer(_) => DataType::Integer,
            FhirPathValue::Decimal(_) => DataType::Decimal,
            FhirPathValue::String(_) => DataType::String,
            FhirPathValue::Date(_) => DataType::Date,
            FhirPathValue::Time(_) => DataType::Time,
            FhirPathValue::DateTime(_) => DataType::DateTime,
            FhirPathValue::Quantity(_) => DataType::Quantity,
            FhirPathValue::Collection(_) => DataType::Collection,
            FhirPathValue::Node(_) => DataType::Collection,
        }
    }

    /// The type-spec of this value in the System lattice. Foreign `Node`
    /// values report `System.Any` here; a `ModelAdapter` is needed for a
    /// more precise answer.
    pub fn type_spec(&self) -> Arc<TypeSpec> {
        system_types::of(self.data_type()).unwrap_or_else(|| system_types::ANY.clone())
    }

    /// Strict equality: same type, same canonical value. Returns `false`
    /// (never empty) for incompatible-type comparisons — three-valued
    /// surfaces handle emptiness at the evaluator layer. `model`, when
    /// supplied, governs `(Node, Node)` comparison; without one, two nodes
    /// are equal only if they're the same allocation.
    pub fn equal(&self, other: &FhirPathValue, model: Option<&dyn ModelAdapter>) -> bool {
        use FhirPathValue::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Decimal(a), Decimal(b)) => a == b,
            (Integer(a), Decimal(b)) | (Decimal(b), Integer(a)) => Decimal::from(*a) == *b,
            (String(a), String(b)) => a == b,
            (Date(a), Date(b)) => a.equals(b),
            (Time(a), Time(b)) => a.equals(b),
            (DateTime(a), DateTime(b)) => a.equals(b),
            (Quantity(a), Quantity(b)) => a.unit == b.unit && a.value == b.value,
            (Collection(a), Collection(b)) => {
                a.count() == b.count()
                    && a.iter().zip(b.iter()).all(|(x, y)| x.equal(y, model))
            }
            (Node(a), Node(b)) => match model {
                Some(model) => model.equal(a, b),
                None => Arc::ptr_eq(a, b),
            },
            _ => false,
        }
    }

    /// Loose equivalence: decimals at the lesser scale, strings after
    /// Unicode case-folding and whitespace normalization, partial-precision
    /// temporals at the common precision, collections compared as
    /// order-independent multisets. `false` (never empty) across
    /// incompatible types. `model` governs `(Node, Node)` comparison the
    /// same way it does for [`FhirPathValue::equal`].
    pub fn equivalent(&self, other: &FhirPathValue, model: Option<&dyn ModelAdapter>) -> bool {
        use FhirPathValue::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Decimal(a), Decimal(b)) => decimal_equivalent(*a, *b),
            (Integer(a), Decimal(b)) | (Decimal(b), Integer(a)) => {
                decimal_equivalent(Decimal::from(*a), *b)
            }
            (String(a), String(b)) => string_equivalent(a, b),
            (Date(a), Date(b)) => a.equivalent(b),
            (Time(a), Time(b)) => a.equivalent(b),
            (DateTime(a), DateTime(b)) => a.equivalent(b),
            (Quantity(a), Quantity(b)) => {
                a.compare(b) == Some(Ordering::Equal)
                    || (a.unit == b.unit && decimal_equivalent(a.value, b.value))
            }
            (Collection(a), Collection(b)) => collection_equivalent(a, b, model),
            (Node(a), Node(b)) => match model {
                Some(model) => model.equivalent(a, b),
                None => Arc::ptr_eq(a, b),
            },
            _ => false,
        }
    }

    /// Ordering between two singleton values, or the reason no ordering
    /// could be produced.
    pub fn compare(&self, other: &FhirPathValue) -> CompareStatus {
        use FhirPathValue::*;
        match (self, other) {
            (Integer(a), Integer(b)) => CompareStatus::Evaluated(a.cmp(b)),
            (Decimal(a), Decimal(b)) => CompareStatus::Evaluated(a.cmp(b)),
            (Integer(a), Decimal(b)) => CompareStatus::Evaluated(Decimal::from(*a).cmp(b)),
            (Decimal(a), Integer(b)) => CompareStatus::Evaluated(a.cmp(&Decimal::from(*b))),
            (String(a), String(b)) => CompareStatus::Evaluated(a.cmp(b)),
            (Date(a), Date(b)) => match a.compare(b) {
                Some(ord) => CompareStatus::Evaluated(ord),
                None => CompareStatus::Empty,
            },
            (Time(a), Time(b)) => match a.compare(b) {
                Some(ord) => CompareStatus::Evaluated(ord),
                None => CompareStatus::Empty,
            },
            (DateTime(a), DateTime(b)) => match a.compare(b) {
                Some(ord) => CompareStatus::Evaluated(ord),
                None => CompareStatus::Empty,
            },
            (Quantity(a), Quantity(b)) => match a.compare(b) {
                Some(ord) => CompareStatus::Evaluated(ord),
                None => CompareStatus::Empty,
            },
            (Boolean(_), Boolean(_)) | (Collection(_), Collection(_)) | (Node(_), Node(_)) => {
                CompareStatus::Inconvertible
            }
            _ => CompareStatus::Inconvertible,
        }
    }

    /// Negate a Boolean (logical flip) or an Integer/Decimal/Quantity
    /// (arithmetic sign flip); `None` for types with no defined negation.
    pub fn negate(&self) -> Option<FhirPathValue> {
        match self {
            FhirPathValue::Boolean(b) => Some(FhirPathValue::Boolean(!b)),
            FhirPathValue::Integer(i) => i.checked_neg().map(FhirPathValue::Integer),
            FhirPathValue::Decimal(d) => Some(FhirPathValue::Decimal(-d)),
            FhirPathValue::Quantity(q) => Some(FhirPathValue::Quantity(Quantity::new(
                -q.value,
                q.unit.clone(),
            ))),
            _ => None,
        }
    }

    /// Arithmetic. `Ok(None)` for the spec's soft failures (division by
    /// zero, integer overflow); `Err` for genuine type/unit mismatches
    /// (`unsupported-operation`).
    pub fn calc(&self, other: &FhirPathValue, op: ArithmeticOp) -> Result<Option<FhirPathValue>> {
        use FhirPathValue::*;
        match (self, other) {
            (Integer(a), Integer(b)) => Ok(integer_calc(*a, *b, op).map(|v| match v {
                IntOrDecimal::Int(i) => Integer(i),
                IntOrDecimal::Dec(d) => Decimal(d),
            })),
            (Decimal(_), _) | (_, Decimal(_)) if matches!(other, Integer(_) | Decimal(_)) => {
                let a = as_decimal(self).unwrap();
                let b = as_decimal(other).unwrap();
                Ok(decimal_calc(a, b, op).map(Decimal))
            }
            (Quantity(a), Quantity(b)) => quantity_calc(a, b, op),
            (Quantity(q), Integer(s)) | (Integer(s), Quantity(q)) => {
                scalar_quantity_calc(q, Decimal::from(*s), op, matches!(self, Integer(_)))
            }
            (Quantity(q), Decimal(s)) | (Decimal(s), Quantity(q)) => {
                scalar_quantity_calc(q, *s, op, matches!(self, Decimal(_)))
            }
            (Date(_), Quantity(_)) | (DateTime(_), Quantity(_)) => temporal_calc(self, other, op),
            _ => Err(ModelError::conversion_error(
                format!("{:?}", self.data_type()),
                format!("{:?}", other.data_type()),
            )),
        }
    }

    /// The `String()` rendering used by `toString()` and error messages.
    pub fn display_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Debug for FhirPathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FhirPathValue::Boolean(b) => write!(f, "Boolean({b:?})"),
            FhirPathValue::Integer(i) => write!(f, "Integer({i:?})"),
            FhirPathValue::Decimal(d) => write!(f, "Decimal({d:?})"),
            FhirPathValue::String(s) => write!(f, "String({s:?})"),
            FhirPathValue::Date(d) => write!(f, "Date({d})"),
            FhirPathValue::Time(t) => write!(f, "Time({t})"),
            FhirPathValue::DateTime(dt) => write!(f, "DateTime({dt})"),
            FhirPathValue::Quantity(q) => write!(f, "Quantity({q})"),
            FhirPathValue::Collection(c) => write!(f, "Collection({} items)", c.count()),
            FhirPathValue::Node(n) => write!(f, "Node({})", n.display_value()),
        }
    }
}

impl PartialEq for FhirPathValue {
    /// Structural equality (used by tests and `HashMap`-adjacent code);
    /// semantically meaningful FHIRPath comparisons should use
    /// [`FhirPathValue::equal`] or [`FhirPathValue::equivalent`] instead.
    fn eq(&self, other: &Self) -> bool {
        use FhirPathValue::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Decimal(a), Decimal(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Quantity(a), Quantity(b)) => a == b,
            (Collection(a), Collection(b)) => a.as_slice().len() == b.as_slice().len()
                && a.iter().zip(b.iter()).all(|(x, y)| x == y),
            (Node(a), Node(b)) => Arc::ptr_eq(a, b),
            (Date(a), Date(b)) => a.equals(b),
            (Time(a), Time(b)) => a.equals(b),
            (DateTime(a), DateTime(b)) => a.equals(b),
            _ => false,
        }
    }
}

impl fmt::Display for FhirPathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FhirPathValue::Boolean(b) => write!(f, "{b}"),
            FhirPathValue::Integer(i) => write!(f, "{i}"),
            FhirPathValue::Decimal(d) => write!(f, "{d}"),
            FhirPathValue::String(s) => write!(f, "{s}"),
            FhirPathValue::Date(d) => write!(f, "{d}"),
            FhirPathValue::Time(t) => write!(f, "{t}"),
            FhirPathValue::DateTime(dt) => write!(f, "{dt}"),
            FhirPathValue::Quantity(q) => write!(f, "{q}"),
            FhirPathValue::Collection(c) => {
                write!(f, "{{")?;
                for (i, item) in c.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
            FhirPathValue::Node(n) => write!(f, "{}", n.display_value()),
        }
    }
}

fn as_decimal(v: &FhirPathValue) -> Option<Decimal> {
    match v {
        FhirPathValue::Integer(i) => Some(Decimal::from(*i)),
        FhirPathValue::Decimal(d) => Some(*d),
        _ => None,
    }
}

fn decimal_equivalent(a: Decimal, b: Decimal) -> bool {
    let scale = a.scale().min(b.scale());
    a.round_dp(scale) == b.round_dp(scale)
}

fn string_equivalent(a: &str, b: &str) -> bool {
    normalize_for_equivalence(a) == normalize_for_equivalence(b)
}

fn normalize_for_equivalence(s: &str) -> String {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}

fn collection_equivalent(a: &Collection, b: &Collection, model: Option<&dyn ModelAdapter>) -> bool {
    if a.count() != b.count() {
        return false;
    }
    let mut remaining: Vec<&FhirPathValue> = b.iter().collect();
    for item in a.iter() {
        match remaining
            .iter()
            .position(|candidate| item.equivalent(candidate, model))
        {
            Some(idx) => {
                remaining.remove(idx);
            }
            None => return false,
        }
    }
    true
}

enum IntOrDecimal {
    Int(i32),
    Dec(Decimal),
}

fn integer_calc(a: i32, b: i32, op: ArithmeticOp) -> Option<IntOrDecimal> {
    match op {
        ArithmeticOp::Addition => a.checked_add(b).map(IntOrDecimal::Int),
        ArithmeticOp::Subtraction => a.checked_sub(b).map(IntOrDecimal::Int),
        ArithmeticOp::Multiplication => a.checked_mul(b).map(IntOrDecimal::Int),
        ArithmeticOp::Division => {
            if b == 0 {
                None
            } else {
                Some(IntOrDecimal::Dec(Decimal::from(a) / Decimal::from(b)))
            }
        }
        ArithmeticOp::Div => {
            if b == 0 {
                None
            } else {
                a.checked_div(b).map(IntOrDecimal::Int)
            }
        }
        ArithmeticOp::Mod => {
            if b == 0 {
                None
            } else {
                a.checked_rem(b).map(IntOrDecimal::Int)
            }
        }
    }
}

fn decimal_calc(a: Decimal, b: Decimal, op: ArithmeticOp) -> Option<Decimal> {
    match op {
        ArithmeticOp::Addition => Some(a + b),
        ArithmeticOp::Subtraction => Some(a - b),
        ArithmeticOp::Multiplication => Some(a * b),
        ArithmeticOp::Division => {
            if b.is_zero() {
                None
            } else {
                Some(a / b)
            }
        }
        ArithmeticOp::Div => {
            if b.is_zero() {
                None
            } else {
                Some((a / b).trunc())
            }
        }
        ArithmeticOp::Mod => {
            if b.is_zero() {
                None
            } else {
                Some(a % b)
            }
        }
    }
}

fn quantity_calc(
    a: &Quantity,
    b: &Quantity,
    op: ArithmeticOp,
) -> Result<Option<FhirPathValue>> {
    match op {
        ArithmeticOp::Addition => a.add(b).map(|q| Some(FhirPathValue::Quantity(q))),
        ArithmeticOp::Subtraction => a.subtract(b).map(|q| Some(FhirPathValue::Quantity(q))),
        ArithmeticOp::Multiplication => Ok(combine_units(a, b, "*")
            .map(|unit| FhirPathValue::Quantity(Quantity::new(a.value * b.value, unit)))),
        ArithmeticOp::Division => {
            if b.value.is_zero() {
                Ok(None)
            } else {
                Ok(combine_units(a, b, "/")
                    .map(|unit| FhirPathValue::Quantity(Quantity::new(a.value / b.value, unit))))
            }
        }
        ArithmeticOp::Div | ArithmeticOp::Mod => Err(ModelError::conversion_error(
            "Quantity",
            "Quantity (div/mod undefined)",
        )),
    }
}

/// Derives the result unit of `Quantity * Quantity` / `Quantity / Quantity`
/// via UCUM unit algebra; falls back to plain concatenation the way the
/// teacher's own operators do when a unit isn't UCUM-expressible.
fn combine_units(a: &Quantity, b: &Quantity, op: &str) -> Option<Option<String>> {
    match (&a.unit, &b.unit) {
        (None, None) => Some(None),
        (Some(u), None) | (None, Some(u)) => Some(Some(u.clone())),
        (Some(u1), Some(u2)) => {
            let combined = match op {
                "*" => match octofhir_ucum::unit_multiply(u1, u2) {
                    Ok(result) => result.expression,
                    Err(_) => format!("{u1}.{u2}"),
                },
                "/" => match octofhir_ucum::unit_divide(u1, u2) {
                    Ok(result) => result.expression,
                    Err(_) => format!("{u1}/{u2}"),
                },
                _ => unreachable!("combine_units is only called for * and /"),
            };
            Some(Some(combined))
        }
    }
}

fn scalar_quantity_calc(
    q: &Quantity,
    scalar: Decimal,
    op: ArithmeticOp,
    scalar_is_left: bool,
) -> Result<Option<FhirPathValue>> {
    match op {
        ArithmeticOp::Multiplication => Ok(Some(FhirPathValue::Quantity(
            q.multiply_scalar(scalar),
        ))),
        ArithmeticOp::Division if !scalar_is_left => {
            Ok(q.divide_scalar(scalar).map(FhirPathValue::Quantity))
        }
        _ => Err(ModelError::conversion_error("Quantity", "scalar")),
    }
}

fn temporal_calc(
    temporal: &FhirPathValue,
    quantity: &FhirPathValue,
    op: ArithmeticOp,
) -> Result<Option<FhirPathValue>> {
    let q = match quantity {
        FhirPathValue::Quantity(q) => q,
        _ => unreachable!("caller guarantees Quantity operand"),
    };
    if !matches!(op, ArithmeticOp::Addition | ArithmeticOp::Subtraction) {
        return Err(ModelError::conversion_error(
            format!("{:?}", temporal.data_type()),
            "Quantity",
        ));
    }
    let sign = if op == ArithmeticOp::Subtraction {
        -1
    } else {
        1
    };
    let amount = match q.value.to_string().parse::<f64>() {
        Ok(v) => v * sign as f64,
        Err(_) => return Ok(None),
    };
    let unit = match &q.unit {
        Some(u) => u.as_str(),
        None => return Ok(None),
    };

    match temporal {
        FhirPathValue::Date(d) => Ok(shift_date(*d, unit, amount).map(FhirPathValue::Date)),
        FhirPathValue::DateTime(dt) => {
            Ok(shift_date_time(*dt, unit, amount).map(FhirPathValue::DateTime))
        }
        _ => Ok(None),
    }
}

fn shift_date(d: PartialDate, unit: &str, amount: f64) -> Option<PartialDate> {
    use chrono::{Datelike, Duration, NaiveDate};
    let base = NaiveDate::from_ymd_opt(d.year(), d.month(), d.day())?;
    let shifted = match unit {
        "a" => {
            let whole = amount.trunc() as i32;
            if amount.fract() != 0.0 {
                return None;
            }
            base.with_year(base.year() + whole)?
        }
        "mo" => {
            let whole = amount.trunc() as i32;
            if amount.fract() != 0.0 {
                return None;
            }
            let total_months = base.year() * 12 + (base.month() as i32 - 1) + whole;
            let year = total_months.div_euclid(12);
            let month = total_months.rem_euclid(12) + 1;
            NaiveDate::from_ymd_opt(year, month as u32, base.day().min(28))?
        }
        "wk" => base.checked_add_signed(Duration::days((amount * 7.0) as i64))?,
        "d" => base.checked_add_signed(Duration::days(amount as i64))?,
        _ => return None,
    };
    Some(PartialDate::new(
        shifted.year(),
        shifted.month(),
        shifted.day(),
        d.precision(),
    ))
}

fn shift_date_time(dt: PartialDateTime, unit: &str, amount: f64) -> Option<PartialDateTime> {
    // Calendar (year/month/week/day) units shift the date component only;
    // sub-day units require a time component to carry the remainder.
    match unit {
        "a" | "mo" | "wk" | "d" => shift_date(dt.date, unit, amount).map(|date| PartialDateTime {
            date,
            time: dt.time,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_and_decimal_equal_numerically() {
        let a = FhirPathValue::Integer(2);
        let b = FhirPathValue::Decimal(Decimal::new(2, 0));
        assert!(a.equal(&b, None));
    }

    #[test]
    fn equal_false_not_empty_on_type_mismatch() {
        let a = FhirPathValue::Integer(2);
        let b = FhirPathValue::Boolean(true);
        assert!(!a.equal(&b, None));
    }

    #[test]
    fn decimal_equivalent_at_lesser_scale() {
        let a = FhirPathValue::Decimal(Decimal::new(150, 2)); // 1.50
        let b = FhirPathValue::Decimal(Decimal::new(2, 0)); // 2, different scale but not equal
        assert!(!a.equivalent(&b, None));
        let c = FhirPathValue::Decimal(Decimal::new(15, 1)); // 1.5
        assert!(a.equivalent(&c, None));
    }

    #[test]
    fn division_by_zero_is_empty_not_error() {
        let a = FhirPathValue::Integer(1);
        let b = FhirPathValue::Integer(0);
        assert_eq!(a.calc(&b, ArithmeticOp::Division).unwrap(), None);
        assert_eq!(a.calc(&b, ArithmeticOp::Div).unwrap(), None);
        assert_eq!(a.calc(&b, ArithmeticOp::Mod).unwrap(), None);
    }

    #[test]
    fn integer_overflow_is_empty() {
        let a = FhirPathValue::Integer(i32::MAX);
        let b = FhirPathValue::Integer(1);
        assert_eq!(a.calc(&b, ArithmeticOp::Addition).unwrap(), None);
    }

    #[test]
    fn mixed_integer_decimal_promotes() {
        let a = FhirPathValue::Integer(1);
        let b = FhirPathValue::Decimal(Decimal::new(5, 1)); // 0.5
        let result = a.calc(&b, ArithmeticOp::Addition).unwrap().unwrap();
        assert!(matches!(result, FhirPathValue::Decimal(_)));
    }

    #[test]
    fn boolean_negate_flips() {
        assert_eq!(
            FhirPathValue::Boolean(true).negate(),
            Some(FhirPathValue::Boolean(false))
        );
    }

    #[test]
    fn compare_inconvertible_across_families() {
        let a = FhirPathValue::Boolean(true);
        let b = FhirPathValue::Boolean(false);
        assert_eq!(a.compare(&b), CompareStatus::Inconvertible);
    }
}
