//! A compiled expression, ready to run against any number of root values.

use std::sync::Arc;

use fhirpath_ast::ExpressionNode;
use fhirpath_evaluator::{evaluate, EvaluationContext, EvaluationError, EvaluationOptions};
use fhirpath_model::FhirPathValue;
use fhirpath_registry::FunctionRegistry;

use crate::env_vars::EnvVars;

pub struct Executor {
    expression: ExpressionNode,
    registry: Arc<FunctionRegistry>,
    evaluation_options: EvaluationOptions,
}

impl Executor {
    pub(crate) fn new(
        expression: ExpressionNode,
        registry: Arc<FunctionRegistry>,
        evaluation_options: EvaluationOptions,
    ) -> Self {
        Self {
            expression,
            registry,
            evaluation_options,
        }
    }

    /// Evaluate the compiled expression with `root` as both `%resource` and
    /// the starting input collection.
    pub fn evaluate(
        &self,
        root: &FhirPathValue,
        env_vars: &EnvVars,
    ) -> Result<FhirPathValue, EvaluationError> {
        let mut ctx = EvaluationContext::new(root.clone(), self.registry.clone())
            .with_options(self.evaluation_options.clone());
        if let Some(model) = env_vars.model() {
            ctx = ctx.with_model(model);
        }
        for (name, value) in env_vars.variables() {
            ctx = ctx.with_variable(name, value.clone());
        }
        evaluate(&self.expression, &ctx)
    }
}
