//! Evaluation context threaded through the tree-walk, per spec.md §4.4:
//! the current input collection, the original root resource, bound
//! variables (`%name` and the lambda-local `$this`/`$index`/`$total`), the
//! function registry and optional model adapter, and the options governing
//! the walk.

use std::sync::Arc;

use fhirpath_model::{FhirPathValue, ModelAdapter};
use rustc_hash::FxHashMap;

use fhirpath_registry::FunctionRegistry;

use crate::error::{EvaluationError, EvaluationResult};
use crate::options::EvaluationOptions;

#[derive(Debug, Clone)]
struct LambdaFrame {
    this: FhirPathValue,
    index: usize,
    total: usize,
}

/// The magic environment variable FHIRPath defines for UCUM unit literals.
const UCUM_SYSTEM_URI: &str = "http://unitsofmeasure.org";

#[derive(Clone)]
pub struct EvaluationContext {
    input: FhirPathValue,
    root: Arc<FhirPathValue>,
    variables: Arc<FxHashMap<String, FhirPathValue>>,
    lambda: Option<Arc<LambdaFrame>>,
    registry: Arc<FunctionRegistry>,
    model: Option<Arc<dyn ModelAdapter>>,
    options: Arc<EvaluationOptions>,
    depth: usize,
}

impl EvaluationContext {
    pub fn new(root: FhirPathValue, registry: Arc<FunctionRegistry>) -> Self {
        let root = Arc::new(root);
        Self {
            input: (*root).clone(),
            root,
            variables: Arc::new(FxHashMap::default()),
            lambda: None,
            registry,
            model: None,
            options: Arc::new(EvaluationOptions::default()),
            depth: 0,
        }
    }

    pub fn with_model(mut self, model: Arc<dyn ModelAdapter>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_options(mut self, options: EvaluationOptions) -> Self {
        self.options = Arc::new(options);
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: FhirPathValue) -> Self {
        Arc::make_mut(&mut self.variables).insert(name.into(), value);
        self
    }

    pub fn input(&self) -> &FhirPathValue {
        &self.input
    }

    pub fn root(&self) -> &FhirPathValue {
        &self.root
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn model(&self) -> Option<&dyn ModelAdapter> {
        self.model.as_deref()
    }

    pub(crate) fn with_lambda(&self, this: FhirPathValue, index: usize, total: usize) -> Self {
        Self {
            input: this.clone(),
            lambda: Some(Arc::new(LambdaFrame { this, index, total })),
            ..self.clone()
        }
    }

    pub(crate) fn deeper(&self) -> EvaluationResult<Self> {
        if self.depth >= self.options.max_recursion_depth {
            return Err(EvaluationError::RecursionLimitExceeded {
                limit: self.options.max_recursion_depth,
            });
        }
        Ok(Self {
            depth: self.depth + 1,
            ..self.clone()
        })
    }

    pub(crate) fn resolve_variable(&self, name: &str) -> Option<FhirPathValue> {
        match name {
            "this" => Some(
                self.lambda
                    .as_ref()
                    .map(|f| f.this.clone())
                    .unwrap_or_else(|| self.input.clone()),
            ),
            "index" => self
                .lambda
                .as_ref()
                .map(|f| FhirPathValue::Integer(f.index as i32)),
            "total" => self
                .lambda
                .as_ref()
                .map(|f| FhirPathValue::Integer(f.total as i32)),
            "context" => Some(self.input.clone()),
            "resource" => Some((*self.root).clone()),
            "ucum" => Some(FhirPathValue::string(UCUM_SYSTEM_URI)),
            _ => self.variables.get(name).cloned(),
        }
    }
}
