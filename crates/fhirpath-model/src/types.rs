//! Fully-qualified type names and the System type lattice
//!
//! Grounded in `volsch/gohipath`'s `pathsys/type_spec.go`: a `TypeSpec` is a
//! fully-qualified name plus a base-of link, `Extends` walks the base chain
//! matching by simple name when the query is unqualified, and
//! `common_base_type` does the nested double-walk over both chains.

use std::fmt;
use std::sync::Arc;

use crate::error::{ModelError, Result};

/// The namespace every System type lives under.
pub const SYSTEM_NAMESPACE: &str = "System";

/// The data type tag carried by every `FhirPathValue`, plus `Undefined` for
/// describing the type of an absent/empty evaluation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// No value; the type of the empty collection
    Undefined,
    /// `System.Boolean`
    Boolean,
    /// `System.Integer`
    Integer,
    /// `System.Decimal`
    Decimal,
    /// `System.String`
    String,
    /// `System.Date`
    Date,
    /// `System.Time`
    Time,
    /// `System.DateTime`
    DateTime,
    /// `System.Quantity`
    Quantity,
    /// `System.Collection`, or a model-defined complex type exposed as a node
    Collection,
}

impl DataType {
    /// The bare (unqualified) System type name for this tag, or `None` for
    /// `Undefined`, which has no corresponding System type.
    pub fn simple_name(self) -> Option<&'static str> {
        match self {
            DataType::Undefined => None,
            DataType::Boolean => Some("Boolean"),
            DataType::Integer => Some("Integer"),
            DataType::Decimal => Some("Decimal"),
            DataType::String => Some("String"),
            DataType::Date => Some("Date"),
            DataType::Time => Some("Time"),
            DataType::DateTime => Some("DateTime"),
            DataType::Quantity => Some("Quantity"),
            DataType::Collection => Some("Collection"),
        }
    }
}

/// A fully-qualified type name: `Namespace.Name`, or bare `Name` when no
/// namespace applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FqName {
    namespace: Option<Arc<str>>,
    name: Arc<str>,
}

impl FqName {
    /// Build an unqualified name.
    pub fn unqualified(name: impl Into<Arc<str>>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    /// Build a qualified `namespace.name`.
    pub fn qualified(namespace: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    /// A name in the `System` namespace.
    pub fn system(name: impl Into<Arc<str>>) -> Self {
        Self::qualified(SYSTEM_NAMESPACE, name)
    }

    /// Whether this name carries an explicit namespace.
    pub fn has_namespace(&self) -> bool {
        self.namespace.is_some()
    }

    /// The namespace, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The simple (unqualified) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parse `Name` or `Namespace.Name`. Rejects empty strings, a leading or
    /// trailing dot, and more than one dot.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(ModelError::invalid_type_name(text));
        }
        match text.find('.') {
            None => Ok(Self::unqualified(text)),
            Some(idx) => {
                if idx == 0 || idx + 1 == text.len() {
                    return Err(ModelError::invalid_type_name(text));
                }
                let name = &text[idx + 1..];
                if name.contains('.') {
                    return Err(ModelError::invalid_type_name(text));
                }
                Ok(Self::qualified(&text[..idx], name))
            }
        }
    }
}

impl fmt::Display for FqName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A type in the lattice: a fully-qualified name linked to its base type.
#[derive(Debug, Clone)]
pub struct TypeSpec {
    fq_name: FqName,
    base: Option<Arc<TypeSpec>>,
}

impl TypeSpec {
    /// A type with no base (only `System.Any` should use this).
    pub fn root(fq_name: FqName) -> Self {
        Self {
            fq_name,
            base: None,
        }
    }

    /// A type extending `base`.
    pub fn with_base(fq_name: FqName, base: Arc<TypeSpec>) -> Self {
        Self {
            fq_name,
            base: Some(base),
        }
    }

    /// The fully-qualified name of this type.
    pub fn fq_name(&self) -> &FqName {
        &self.fq_name
    }

    /// The immediate base type, if any.
    pub fn base(&self) -> Option<&Arc<TypeSpec>> {
        self.base.as_ref()
    }

    /// Reflexive-transitive check over the base chain. An unqualified query
    /// name matches by simple name alone at any position in the chain.
    pub fn extends(&self, name: &FqName) -> bool {
        let matches = if name.has_namespace() {
            name == &self.fq_name
        } else {
            name.name() == self.fq_name.name()
        };
        if matches {
            return true;
        }
        match &self.base {
            Some(base) => base.extends(name),
            None => false,
        }
    }

    /// The closest common ancestor of two types, searching both base chains.
    pub fn common_base<'a>(t1: &'a Arc<TypeSpec>, t2: &'a Arc<TypeSpec>) -> Option<Arc<TypeSpec>> {
        let mut cur1 = Some(t1.clone());
        while let Some(c1) = cur1 {
            let mut cur2 = Some(t2.clone());
            while let Some(c2) = cur2 {
                if c1.fq_name == c2.fq_name {
                    return Some(c1);
                }
                cur2 = c2.base.clone();
            }
            cur1 = c1.base.clone();
        }
        None
    }
}

impl PartialEq for TypeSpec {
    fn eq(&self, other: &Self) -> bool {
        self.fq_name == other.fq_name
    }
}

/// Well-known System type specs, built once and shared by reference.
pub mod system_types {
    use super::*;
    use once_cell::sync::Lazy;

    /// `System.Any`, the root of the lattice.
    pub static ANY: Lazy<Arc<TypeSpec>> =
        Lazy::new(|| Arc::new(TypeSpec::root(FqName::system("Any"))));

    fn leaf(name: &'static str) -> Arc<TypeSpec> {
        Arc::new(TypeSpec::with_base(FqName::system(name), ANY.clone()))
    }

    /// `System.Boolean`
    pub static BOOLEAN: Lazy<Arc<TypeSpec>> = Lazy::new(|| leaf("Boolean"));
    /// `System.String`
    pub static STRING: Lazy<Arc<TypeSpec>> = Lazy::new(|| leaf("String"));
    /// `System.Integer`
    pub static INTEGER: Lazy<Arc<TypeSpec>> = Lazy::new(|| leaf("Integer"));
    /// `System.Decimal`
    pub static DECIMAL: Lazy<Arc<TypeSpec>> = Lazy::new(|| leaf("Decimal"));
    /// `System.Date`
    pub static DATE: Lazy<Arc<TypeSpec>> = Lazy::new(|| leaf("Date"));
    /// `System.Time`
    pub static TIME: Lazy<Arc<TypeSpec>> = Lazy::new(|| leaf("Time"));
    /// `System.DateTime`
    pub static DATE_TIME: Lazy<Arc<TypeSpec>> = Lazy::new(|| leaf("DateTime"));
    /// `System.Quantity`
    pub static QUANTITY: Lazy<Arc<TypeSpec>> = Lazy::new(|| leaf("Quantity"));
    /// `System.Collection`
    pub static COLLECTION: Lazy<Arc<TypeSpec>> = Lazy::new(|| leaf("Collection"));

    /// The `TypeSpec` matching a `DataType` tag, or `None` for `Undefined`.
    pub fn of(data_type: DataType) -> Option<Arc<TypeSpec>> {
        Some(match data_type {
            DataType::Undefined => return None,
            DataType::Boolean => BOOLEAN.clone(),
            DataType::Integer => INTEGER.clone(),
            DataType::Decimal => DECIMAL.clone(),
            DataType::String => STRING.clone(),
            DataType::Date => DATE.clone(),
            DataType::Time => TIME.clone(),
            DataType::DateTime => DATE_TIME.clone(),
            DataType::Quantity => QUANTITY.clone(),
            DataType::Collection => COLLECTION.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_qualified_and_unqualified_names() {
        let n = FqName::parse("Patient").unwrap();
        assert!(!n.has_namespace());
        assert_eq!(n.name(), "Patient");

        let n = FqName::parse("FHIR.Patient").unwrap();
        assert_eq!(n.namespace(), Some("FHIR"));
        assert_eq!(n.name(), "Patient");
    }

    #[test]
    fn rejects_malformed_names() {
        assert!(FqName::parse("").is_err());
        assert!(FqName::parse(".Patient").is_err());
        assert!(FqName::parse("Patient.").is_err());
        assert!(FqName::parse("A.B.C").is_err());
    }

    #[test]
    fn every_system_type_extends_any() {
        for t in [
            &system_types::BOOLEAN,
            &system_types::STRING,
            &system_types::INTEGER,
            &system_types::DECIMAL,
        ] {
            assert!(t.extends(&FqName::system("Any")));
            assert!(t.extends(t.fq_name()));
        }
    }

    #[test]
    fn extends_matches_unqualified_by_simple_name() {
        assert!(system_types::INTEGER.extends(&FqName::unqualified("Integer")));
        assert!(!system_types::INTEGER.extends(&FqName::unqualified("Decimal")));
    }

    #[test]
    fn common_base_of_siblings_is_any() {
        let base = TypeSpec::common_base(&system_types::INTEGER, &system_types::STRING).unwrap();
        assert_eq!(base.fq_name(), system_types::ANY.fq_name());
    }

    #[test]
    fn common_base_of_a_type_with_itself_is_itself() {
        let base =
            TypeSpec::common_base(&system_types::INTEGER, &system_types::INTEGER).unwrap();
        assert_eq!(base.fq_name(), system_types::INTEGER.fq_name());
    }
}
