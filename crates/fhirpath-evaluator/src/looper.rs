//! Bridges `fhirpath_registry::LoopEvaluator` to a real expression body and
//! [`EvaluationContext`], so `where`/`select`/`repeat`/`iif`/`trace` in the
//! registry can re-enter the tree-walker without depending on it directly
//! (the registry crate sits below the evaluator in the dependency graph).

use fhirpath_ast::ExpressionNode;
use fhirpath_model::FhirPathValue;
use fhirpath_registry::{FunctionError, LoopEvaluator};

use crate::context::EvaluationContext;
use crate::evaluate::evaluate;

/// Either one body evaluated once per item (`where`/`select`/`all`/
/// `repeat`/`trace`, `$index` meaning the iteration position) or two
/// bodies where `eval_once`'s `index` instead picks which one to run
/// (`iif`'s `trueResult`/`otherwiseResult` — only the chosen branch is
/// ever evaluated).
enum Body<'a> {
    One(&'a ExpressionNode),
    Branching(&'a ExpressionNode, &'a ExpressionNode),
}

pub struct Looper<'a> {
    body: Body<'a>,
    base: &'a EvaluationContext,
    total: usize,
}

impl<'a> Looper<'a> {
    pub fn new(body: &'a ExpressionNode, base: &'a EvaluationContext, total: usize) -> Self {
        Self { body: Body::One(body), base, total }
    }

    pub fn new_branching(
        true_body: &'a ExpressionNode,
        false_body: &'a ExpressionNode,
        base: &'a EvaluationContext,
        total: usize,
    ) -> Self {
        Self { body: Body::Branching(true_body, false_body), base, total }
    }
}

impl LoopEvaluator for Looper<'_> {
    fn eval_once(&mut self, this: &FhirPathValue, index: usize) -> Result<FhirPathValue, FunctionError> {
        let body = match self.body {
            Body::One(body) => body,
            Body::Branching(true_body, false_body) => {
                if index == 0 {
                    true_body
                } else {
                    false_body
                }
            }
        };
        let ctx = self.base.with_lambda(this.clone(), index, self.total);
        evaluate(body, &ctx).map_err(|err| match err {
            crate::error::EvaluationError::Function(inner) => inner,
            other => FunctionError::Unsupported(other.to_string()),
        })
    }

    fn total(&self) -> usize {
        self.total
    }
}
