//! Knobs that shape a single evaluation run. Integer-overflow behavior is
//! not one of them: `fhirpath_model::FhirPathValue::calc` already treats
//! overflow as empty unconditionally, and nothing upstream threads a policy
//! through to it, so making it configurable here would just be a knob that
//! does nothing.

/// Guards `evaluate_call`'s nested-dispatch depth against pathologically
/// nested expressions. Shares its default with `fhirpath_registry`'s own
/// frontier-expansion cap (`repeat()`/`descendants()`) so the two guards
/// against runaway recursion, reached by different paths, agree on one
/// limit rather than drifting apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationOptions {
    pub max_recursion_depth: usize,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            max_recursion_depth: fhirpath_registry::MAX_RECURSION_DEPTH,
        }
    }
}
