//! Error types for the model crate

use thiserror::Error;

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Model-specific error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Invalid type conversion
    #[error("cannot convert {from} to {to}")]
    ConversionError {
        /// Source type
        from: String,
        /// Target type
        to: String,
    },

    /// Invalid quantity unit
    #[error("invalid quantity unit: {unit}")]
    InvalidUnit {
        /// The invalid unit
        unit: String,
    },

    /// Incompatible units for an arithmetic or comparison operation
    #[error("incompatible units: '{left}' and '{right}'")]
    IncompatibleUnits {
        /// Left unit
        left: String,
        /// Right unit
        right: String,
    },

    /// Invalid date/time literal
    #[error("invalid date/time value: {value}")]
    InvalidDateTime {
        /// The invalid value
        value: String,
    },

    /// Invalid fully-qualified type name
    #[error("invalid type name: {name}")]
    InvalidTypeName {
        /// The offending name
        name: String,
    },

    /// The model adapter has no mapping for a requested navigation
    #[error("adapter cannot navigate to '{property}' on '{type_name}'")]
    PropertyNotFound {
        /// Type name of the node being navigated
        type_name: String,
        /// Property name that could not be resolved
        property: String,
    },

    /// No model adapter is configured but one is required
    #[error("no model adapter configured; navigation of foreign nodes is unsupported")]
    NoAdapter,
}

impl ModelError {
    /// Create a conversion error
    pub fn conversion_error(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::ConversionError {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Create an invalid unit error
    pub fn invalid_unit(unit: impl Into<String>) -> Self {
        Self::InvalidUnit { unit: unit.into() }
    }

    /// Create an incompatible units error
    pub fn incompatible_units(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self::IncompatibleUnits {
            left: left.into(),
            right: right.into(),
        }
    }

    /// Create an invalid date/time error
    pub fn invalid_datetime(value: impl Into<String>) -> Self {
        Self::InvalidDateTime {
            value: value.into(),
        }
    }

    /// Create an invalid type name error
    pub fn invalid_type_name(name: impl Into<String>) -> Self {
        Self::InvalidTypeName { name: name.into() }
    }

    /// Create a property-not-found error
    pub fn property_not_found(type_name: impl Into<String>, property: impl Into<String>) -> Self {
        Self::PropertyNotFound {
            type_name: type_name.into(),
            property: property.into(),
        }
    }
}
