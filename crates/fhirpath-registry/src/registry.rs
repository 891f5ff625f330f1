//! Name/arity dispatch table, per spec.md §4.6: "The registry keys by
//! `(name, arity)` with a preference for exact arity, falling back to the
//! variadic form."

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::FunctionError;
use crate::function::Function;

pub struct FunctionRegistry {
    by_name: FxHashMap<&'static str, Vec<Arc<dyn Function>>>,
}

impl FunctionRegistry {
    pub fn empty() -> Self {
        Self {
            by_name: FxHashMap::default(),
        }
    }

    /// The registry pre-loaded with every built-in function group.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        crate::functions::register_all(&mut registry);
        registry
    }

    pub fn register(&mut self, function: Arc<dyn Function>) {
        self.by_name
            .entry(function.spec().name)
            .or_default()
            .push(function);
    }

    /// Resolve `name` against `arity`, preferring an exact-arity overload
    /// over a variadic one that merely covers the count.
    pub fn resolve(&self, name: &str, arity: usize) -> Result<Arc<dyn Function>, FunctionError> {
        let candidates = self
            .by_name
            .get(name)
            .ok_or_else(|| FunctionError::UndefinedFunction {
                name: name.to_string(),
                arity,
            })?;

        candidates
            .iter()
            .filter(|f| f.spec().accepts(arity))
            .max_by_key(|f| f.spec().is_exact())
            .cloned()
            .ok_or_else(|| FunctionError::UndefinedFunction {
                name: name.to_string(),
                arity,
            })
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_function_name_is_undefined() {
        let registry = FunctionRegistry::standard();
        assert!(registry.resolve("nonexistentFn", 0).is_err());
    }

    #[test]
    fn exists_accepts_zero_or_one_argument() {
        let registry = FunctionRegistry::standard();
        assert!(registry.resolve("exists", 0).is_ok());
        assert!(registry.resolve("exists", 1).is_ok());
        assert!(registry.resolve("exists", 2).is_err());
    }
}
