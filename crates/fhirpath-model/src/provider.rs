//! Pluggable adapter boundary between FHIRPath values and a foreign data
//! model.
//!
//! Grounded in the teacher's `model/provider.rs`, which doesn't define its
//! own reflection trait but re-exports `octofhir_fhir_model::provider`'s
//! `ModelProvider`/`ValueReflection` pair wholesale. We do the same: a
//! `FhirPathValue::Node` is exactly an `Arc<dyn ValueReflection>`, and a
//! `ModelAdapter` pairs a `ModelProvider` (type reflection) with the
//! System-value conversion that property navigation requires.

use std::sync::Arc;

pub use octofhir_fhir_model::provider::{
    EmptyModelProvider, FhirVersion, ModelProvider, ResolutionContext, ValueReflection,
};
pub use octofhir_fhir_model::reflection::TypeReflectionInfo;

use crate::value::FhirPathValue;

/// A foreign node reachable from `FhirPathValue::Node`. Adds downcasting to
/// `ValueReflection` so a `ModelAdapter` that knows its own concrete node
/// type (e.g. `JsonModelAdapter`'s `JsonNode`) can recover it without the
/// upstream crate needing to know about us.
pub trait ModelNode: ValueReflection {
    /// A short rendering for `Display`/error messages. Defaults to
    /// `to_debug_string`, which every `ValueReflection` already provides.
    fn display_value(&self) -> String {
        self.to_debug_string()
    }

    /// Recover the concrete node type behind this trait object.
    fn as_any(&self) -> &dyn std::any::Any;
}

impl<T: ValueReflection + 'static> ModelNode for T {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Bridges a `ModelProvider` to FHIRPath navigation: resolves a node's
/// property into a ready-made `FhirPathValue`, deciding along the way
/// whether the result is a System primitive, another `Node`, or a
/// `Collection` for repeating elements.
pub trait ModelAdapter: Send + Sync {
    /// The `ModelProvider` backing type reflection for this adapter.
    fn provider(&self) -> &dyn ModelProvider;

    /// Navigate from `node` to its `name` property, already converted to a
    /// `FhirPathValue`. Returns `None` when the property is absent or
    /// undefined on this node's type — absence, not error.
    fn get_property(&self, node: &Arc<dyn ModelNode>, name: &str) -> Option<FhirPathValue>;

    /// Whether `node`'s declared type extends `type_name`, by simple or
    /// qualified name.
    fn is_type(&self, node: &Arc<dyn ModelNode>, type_name: &str) -> bool {
        let actual = node.type_name();
        actual == type_name || self.provider().is_subtype_of(&actual, type_name)
    }

    /// Model-aware `Equal` (spec.md §4.2) between two nodes: identity first,
    /// then structural comparison over every declared property. An adapter
    /// backed by a real identity scheme (a resource id, a database key) may
    /// override this with something cheaper than walking every property.
    fn equal(&self, a: &Arc<dyn ModelNode>, b: &Arc<dyn ModelNode>) -> bool {
        structural_compare(self, a, b, FhirPathValue::equal)
    }

    /// Model-aware `Equivalent` (spec.md §4.2): same shape as `equal`, but
    /// each property compares via `FhirPathValue::equivalent` instead.
    fn equivalent(&self, a: &Arc<dyn ModelNode>, b: &Arc<dyn ModelNode>) -> bool {
        structural_compare(self, a, b, FhirPathValue::equivalent)
    }
}

fn structural_compare(
    model: &(impl ModelAdapter + ?Sized),
    a: &Arc<dyn ModelNode>,
    b: &Arc<dyn ModelNode>,
    leaf_compare: fn(&FhirPathValue, &FhirPathValue, Option<&dyn ModelAdapter>) -> bool,
) -> bool {
    if Arc::ptr_eq(a, b) {
        return true;
    }
    if a.type_name() != b.type_name() {
        return false;
    }
    let mut a_names = a.property_names();
    a_names.sort();
    let mut b_names = b.property_names();
    b_names.sort();
    if a_names != b_names {
        return false;
    }
    a_names.iter().all(
        |name| match (model.get_property(a, name), model.get_property(b, name)) {
            (None, None) => true,
            (Some(x), Some(y)) => leaf_compare(&x, &y, Some(model as &dyn ModelAdapter)),
            _ => false,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Leaf(&'static str);

    impl ValueReflection for Leaf {
        fn type_name(&self) -> String {
            self.0.to_string()
        }
        fn get_property(&self, _name: &str) -> Option<Box<dyn ValueReflection>> {
            None
        }
        fn has_property(&self, _name: &str) -> bool {
            false
        }
        fn property_names(&self) -> Vec<String> {
            Vec::new()
        }
        fn to_debug_string(&self) -> String {
            format!("Leaf({})", self.0)
        }
    }

    #[test]
    fn model_node_display_defaults_to_debug_string() {
        let leaf: Arc<dyn ModelNode> = Arc::new(Leaf("Patient"));
        assert_eq!(leaf.display_value(), "Leaf(Patient)");
    }
}
