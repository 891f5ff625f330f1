//! `(name, loopArgIndex, minArgs, maxArgs)` declaration every built-in
//! function carries, per spec.md §4.6.

#[derive(Debug, Clone)]
pub struct FunctionSpec {
    pub name: &'static str,
    /// Position (0-based) of the argument that is a loop body rather than a
    /// pre-evaluated value, if any.
    pub loop_arg_index: Option<usize>,
    /// A second lazy argument position, for `iif`'s two branches: only the
    /// chosen branch is ever evaluated, so both must stay unevaluated until
    /// the criterion picks one.
    pub loop_arg_index_alt: Option<usize>,
    pub min_args: usize,
    /// `None` means unbounded (the source's `maxArgs == -1`).
    pub max_args: Option<usize>,
}

impl FunctionSpec {
    pub const fn exact(name: &'static str, n: usize) -> Self {
        FunctionSpec {
            name,
            loop_arg_index: None,
            loop_arg_index_alt: None,
            min_args: n,
            max_args: Some(n),
        }
    }

    pub const fn range(name: &'static str, min: usize, max: usize) -> Self {
        FunctionSpec {
            name,
            loop_arg_index: None,
            loop_arg_index_alt: None,
            min_args: min,
            max_args: Some(max),
        }
    }

    pub const fn unbounded(name: &'static str, min: usize) -> Self {
        FunctionSpec {
            name,
            loop_arg_index: None,
            loop_arg_index_alt: None,
            min_args: min,
            max_args: None,
        }
    }

    pub const fn with_loop_arg(mut self, index: usize) -> Self {
        self.loop_arg_index = Some(index);
        self
    }

    /// Declares a second lazy argument position alongside the first, for
    /// `iif`'s `trueResult`/`otherwiseResult` pair.
    pub const fn with_loop_arg_alt(mut self, index: usize) -> Self {
        self.loop_arg_index_alt = Some(index);
        self
    }

    pub fn accepts(&self, arity: usize) -> bool {
        arity >= self.min_args && self.max_args.map(|m| arity <= m).unwrap_or(true)
    }

    pub fn is_exact(&self) -> bool {
        self.max_args == Some(self.min_args)
    }
}
