//! Quantity value: a Decimal paired with an optional UCUM (or calendar
//! keyword) unit.
//!
//! Grounded in the teacher's `fhirpath-model/src/quantity.rs`: calendar
//! keywords (`year`, `day`, ...) are normalized to their UCUM codes on
//! construction so that `1 year` and `'a'` compare as the same unit, and
//! arithmetic delegates dimensional compatibility checks to `octofhir-ucum`.

use rust_decimal::Decimal;

use crate::error::{ModelError, Result};

/// A numeric value with an optional unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    /// The numeric value.
    pub value: Decimal,
    /// The unit, normalized to a UCUM code. `None` means unitless.
    pub unit: Option<String>,
}

impl Quantity {
    /// Construct a quantity, normalizing any recognized calendar keyword
    /// unit to its UCUM equivalent.
    pub fn new(value: Decimal, unit: Option<String>) -> Self {
        let unit = unit
            .map(|u| normalize_unit(&u))
            .filter(|u| !u.is_empty());
        Self { value, unit }
    }

    /// A unitless quantity.
    pub fn unitless(value: Decimal) -> Self {
        Self { value, unit: None }
    }

    fn dimensions_compatible(&self, other: &Quantity) -> bool {
        match (&self.unit, &other.unit) {
            (None, None) => true,
            (Some(a), Some(b)) if a == b => true,
            (Some(a), Some(b)) => octofhir_ucum::is_comparable(a, b).unwrap_or(false),
            _ => false,
        }
    }

    /// Addition; both operands must carry the same (or UCUM-commensurable)
    /// unit.
    pub fn add(&self, other: &Quantity) -> Result<Quantity> {
        if !self.dimensions_compatible(other) {
            return Err(ModelError::incompatible_units(
                self.unit.as_deref().unwrap_or(""),
                other.unit.as_deref().unwrap_or(""),
            ));
        }
        Ok(Quantity::new(self.value + other.value, self.unit.clone()))
    }

    /// Subtraction; same unit requirement as [`Quantity::add`].
    pub fn subtract(&self, other: &Quantity) -> Result<Quantity> {
        if !self.dimensions_compatible(other) {
            return Err(ModelError::incompatible_units(
                self.unit.as_deref().unwrap_or(""),
                other.unit.as_deref().unwrap_or(""),
            ));
        }
        Ok(Quantity::new(self.value - other.value, self.unit.clone()))
    }

    /// Multiply by a scalar, keeping the unit.
    pub fn multiply_scalar(&self, scalar: Decimal) -> Quantity {
        Quantity::new(self.value * scalar, self.unit.clone())
    }

    /// Divide by a scalar; `None` on division by zero (spec: soft failure,
    /// not an error).
    pub fn divide_scalar(&self, scalar: Decimal) -> Option<Quantity> {
        if scalar.is_zero() {
            None
        } else {
            Some(Quantity::new(self.value / scalar, self.unit.clone()))
        }
    }

    /// Comparison; only defined when units are compatible.
    pub fn compare(&self, other: &Quantity) -> Option<std::cmp::Ordering> {
        if !self.dimensions_compatible(other) {
            return None;
        }
        Some(self.value.cmp(&other.value))
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{} '{}'", self.value, unit),
            None => write!(f, "{}", self.value),
        }
    }
}

/// Map a FHIRPath calendar-duration keyword (and its plural) to the UCUM
/// code the spec says it's equivalent to; UCUM codes pass through unchanged.
fn normalize_unit(unit: &str) -> String {
    match unit {
        "year" | "years" => "a",
        "month" | "months" => "mo",
        "week" | "weeks" => "wk",
        "day" | "days" => "d",
        "hour" | "hours" => "h",
        "minute" | "minutes" => "min",
        "second" | "seconds" => "s",
        "millisecond" | "milliseconds" => "ms",
        other => other,
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn calendar_keyword_normalizes_to_ucum() {
        let q = Quantity::new(Decimal::from(1), Some("year".to_string()));
        assert_eq!(q.unit.as_deref(), Some("a"));
    }

    #[test]
    fn empty_unit_means_unitless() {
        let q = Quantity::new(Decimal::from(5), Some(String::new()));
        assert_eq!(q.unit, None);
    }

    #[test]
    fn same_unit_arithmetic_succeeds() {
        let a = Quantity::new(Decimal::from(5), Some("mg".to_string()));
        let b = Quantity::new(Decimal::from(3), Some("mg".to_string()));
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.value, Decimal::from(8));
    }

    #[test]
    fn incompatible_units_error() {
        let a = Quantity::new(Decimal::from(5), Some("mg".to_string()));
        let b = Quantity::new(Decimal::from(3), Some("each".to_string()));
        assert!(a.add(&b).is_err());
    }
}
