//! `children`, `descendants` — spec.md §4.6's navigation group. Both walk a
//! `Node`'s properties via the supplied `ModelAdapter`; System primitives
//! and `Collection`s contribute nothing (a leaf has no children).

use std::sync::Arc;

use fhirpath_model::{Collection, FhirPathValue, ModelAdapter, ModelNode};

use crate::error::FunctionError;
use crate::function::{wrap, Function, LoopEvaluator};
use crate::limits::MAX_RECURSION_DEPTH;
use crate::registry::FunctionRegistry;
use crate::spec::FunctionSpec;

fn immediate_children(
    value: &FhirPathValue,
    model: &dyn ModelAdapter,
    out: &mut Vec<FhirPathValue>,
) {
    match value {
        FhirPathValue::Node(node) => {
            for name in node.property_names() {
                if let Some(child) = model.get_property(node, &name) {
                    push_flattened(child, out);
                }
            }
        }
        FhirPathValue::Collection(items) => {
            for item in items.iter() {
                immediate_children(item, model, out);
            }
        }
        _ => {}
    }
}

fn push_flattened(value: FhirPathValue, out: &mut Vec<FhirPathValue>) {
    match value {
        FhirPathValue::Collection(c) => out.extend(c.into_vec()),
        other => out.push(other),
    }
}

pub struct ChildrenFn;
impl Function for ChildrenFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("children", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(model) = model else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        let mut children = Vec::new();
        for item in input.iter() {
            immediate_children(item, model, &mut children);
        }
        Ok(wrap(children))
    }
}

/// `descendants()` is `children().repeat(children())`: every node reachable
/// through any number of property hops, each visited once per distinct path.
pub struct DescendantsFn;
impl Function for DescendantsFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("descendants", 0);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let Some(model) = model else {
            return Ok(FhirPathValue::Collection(Collection::empty()));
        };
        let mut accumulated = Vec::new();
        let mut frontier: Vec<FhirPathValue> = input.iter().cloned().collect();
        let mut depth = 0;

        while !frontier.is_empty() {
            if depth >= MAX_RECURSION_DEPTH {
                return Err(FunctionError::RecursionLimitExceeded {
                    limit: MAX_RECURSION_DEPTH,
                });
            }
            depth += 1;
            let mut next_frontier = Vec::new();
            for item in &frontier {
                immediate_children(item, model, &mut next_frontier);
            }
            if next_frontier.is_empty() {
                break;
            }
            accumulated.extend(next_frontier.iter().cloned());
            frontier = next_frontier;
        }

        Ok(wrap(accumulated))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Arc::new(ChildrenFn));
    registry.register(Arc::new(DescendantsFn));
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhirpath_model::provider::ValueReflection;

    #[derive(Debug)]
    struct FakeNode {
        properties: Vec<(&'static str, FhirPathValue)>,
    }

    impl ValueReflection for FakeNode {
        fn type_name(&self) -> String {
            "Fake".to_string()
        }
        fn get_property(&self, _name: &str) -> Option<Box<dyn ValueReflection>> {
            None
        }
        fn has_property(&self, name: &str) -> bool {
            self.properties.iter().any(|(n, _)| *n == name)
        }
        fn property_names(&self) -> Vec<String> {
            self.properties.iter().map(|(n, _)| n.to_string()).collect()
        }
        fn to_debug_string(&self) -> String {
            "FakeNode".to_string()
        }
    }

    struct FakeAdapter;
    impl ModelAdapter for FakeAdapter {
        fn provider(&self) -> &dyn fhirpath_model::provider::ModelProvider {
            unimplemented!("not exercised by these tests")
        }
        fn get_property(&self, node: &Arc<dyn ModelNode>, name: &str) -> Option<FhirPathValue> {
            let fake = node.as_any().downcast_ref::<FakeNode>()?;
            fake.properties
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn children_returns_immediate_properties_only() {
        let leaf: Arc<dyn ModelNode> = Arc::new(FakeNode {
            properties: vec![("given", FhirPathValue::String("John".into()))],
        });
        let root: Arc<dyn ModelNode> = Arc::new(FakeNode {
            properties: vec![("name", FhirPathValue::Node(leaf))],
        });
        let input = Collection::single(FhirPathValue::Node(root));
        let result = ChildrenFn
            .execute(&input, &[], None, Some(&FakeAdapter))
            .unwrap();
        match result {
            FhirPathValue::Node(_) => {}
            other => panic!("expected a single Node child, got {other:?}"),
        }
    }

    #[test]
    fn descendants_walks_every_depth() {
        let leaf: Arc<dyn ModelNode> = Arc::new(FakeNode {
            properties: vec![("given", FhirPathValue::String("John".into()))],
        });
        let root: Arc<dyn ModelNode> = Arc::new(FakeNode {
            properties: vec![("name", FhirPathValue::Node(leaf))],
        });
        let input = Collection::single(FhirPathValue::Node(root));
        let result = DescendantsFn
            .execute(&input, &[], None, Some(&FakeAdapter))
            .unwrap();
        match result {
            FhirPathValue::Collection(c) => assert_eq!(c.count(), 2),
            other => panic!("expected Collection of 2, got {other:?}"),
        }
    }

    #[test]
    fn children_without_model_adapter_is_empty() {
        let input = Collection::single(FhirPathValue::Integer(1));
        let result = ChildrenFn.execute(&input, &[], None, None).unwrap();
        assert_eq!(result, FhirPathValue::Collection(Collection::empty()));
    }

    #[derive(Debug)]
    struct CyclicNode;
    impl ValueReflection for CyclicNode {
        fn type_name(&self) -> String {
            "Cyclic".to_string()
        }
        fn get_property(&self, _name: &str) -> Option<Box<dyn ValueReflection>> {
            None
        }
        fn has_property(&self, name: &str) -> bool {
            name == "next"
        }
        fn property_names(&self) -> Vec<String> {
            vec!["next".to_string()]
        }
        fn to_debug_string(&self) -> String {
            "CyclicNode".to_string()
        }
    }

    struct CyclicAdapter;
    impl ModelAdapter for CyclicAdapter {
        fn provider(&self) -> &dyn fhirpath_model::provider::ModelProvider {
            unimplemented!("not exercised by this test")
        }
        fn get_property(&self, _node: &Arc<dyn ModelNode>, _name: &str) -> Option<FhirPathValue> {
            let next: Arc<dyn ModelNode> = Arc::new(CyclicNode);
            Some(FhirPathValue::Node(next))
        }
    }

    #[test]
    fn descendants_on_a_self_referencing_graph_hits_the_recursion_limit() {
        let root: Arc<dyn ModelNode> = Arc::new(CyclicNode);
        let input = Collection::single(FhirPathValue::Node(root));
        let err = DescendantsFn
            .execute(&input, &[], None, Some(&CyclicAdapter))
            .unwrap_err();
        assert!(matches!(err, FunctionError::RecursionLimitExceeded { .. }));
    }
}
