//! Per-evaluation inputs that don't belong to the compiled expression
//! itself: `%`-prefixed environment variables and the model adapter
//! resolving navigation into the root resource.

use std::sync::Arc;

use fhirpath_model::{FhirPathValue, ModelAdapter};
use rustc_hash::FxHashMap;

#[derive(Clone, Default)]
pub struct EnvVars {
    variables: FxHashMap<String, FhirPathValue>,
    model: Option<Arc<dyn ModelAdapter>>,
}

impl EnvVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: FhirPathValue) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn with_model(mut self, model: Arc<dyn ModelAdapter>) -> Self {
        self.model = Some(model);
        self
    }

    pub(crate) fn variables(&self) -> impl Iterator<Item = (&str, &FhirPathValue)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn model(&self) -> Option<Arc<dyn ModelAdapter>> {
        self.model.clone()
    }
}
