//! The narrow interface a built-in [`crate::object::BuiltinFn`] uses to
//! allocate values, bind/look up names, and recurse back into evaluation,
//! without `ferro-core` needing to depend on the evaluator crate that
//! implements it.

use crate::error::ErrorCode;
use crate::object::CallableKind;
use crate::value::Value;
use num_bigint::BigInt;

/// What a combiner invocation hands back to the evaluator loop: either a
/// fully-reduced value, or a tail call the evaluator should loop on
/// instead of recursing.
pub enum EvalOutcome {
    Value(Value),
    TailCall { expr: Value, env: Value },
}

impl EvalOutcome {
    pub fn value(v: Value) -> EvalOutcome {
        EvalOutcome::Value(v)
    }

    pub fn tail(expr: Value, env: Value) -> EvalOutcome {
        EvalOutcome::TailCall { expr, env }
    }
}

/// Allocation, binding, evaluation, and host-hook surface available to
/// built-ins. Implemented by `ferro-rt`'s `Vm`.
pub trait Interp {
    fn alloc_symbol(&mut self, name: &str) -> Value;
    fn alloc_string(&mut self, s: &str) -> Value;
    fn alloc_list(&mut self, items: Vec<Value>) -> Value;
    fn alloc_bigint(&mut self, n: BigInt) -> Value;
    fn alloc_error(&mut self, code: ErrorCode, message: &str) -> Value;
    fn alloc_env(&mut self, parent: Option<Value>) -> Value;

    /// Construct a user-defined `Callable`. `envsym` is only meaningful
    /// for `Operative`.
    #[allow(clippy::too_many_arguments)]
    fn alloc_callable(
        &mut self,
        name: Option<&str>,
        kind: CallableKind,
        formals: Vec<Box<str>>,
        rest: Option<Box<str>>,
        envsym: Option<Box<str>>,
        body: Value,
        env: Value,
    ) -> Value;

    /// Insert `name -> value` into `env`'s own frame. Returns `false` if
    /// the frame is sealed or already has `name`.
    fn bind(&mut self, env: Value, name: &str, value: Value) -> bool;

    /// Freeze `env` against further `bind`s.
    fn seal(&mut self, env: Value);

    /// Dotted-path lookup; never mutates, returns an
    /// `Error(SymbolNotFound)` value rather than failing.
    fn lookup(&mut self, env: Value, dotted_name: &str) -> Value;

    /// Fully evaluate `expr` in `env`, following tail calls to completion.
    /// Built-ins that need a final value out-of-line (`eval`, `mapreduce`,
    /// `$cond`'s test clauses) use this; the main dispatch loop itself does
    /// not call back through here for tail positions, to preserve stack
    /// flatness.
    fn eval(&mut self, expr: Value, env: Value) -> Value;

    /// Invoke a combiner directly against `args`, exactly as given --
    /// neither applicative nor operative dispatch re-evaluates them here.
    /// This is the primitive `apply` and `mapreduce` are built on: list
    /// dispatch in the main evaluator loop is what evaluates an
    /// applicative's operand expressions *before* calling this.
    fn invoke(&mut self, combiner: Value, env: Value, args: &[Value]) -> Value;

    fn output(&mut self, bytes: &[u8]);

    /// Resolve a module by name via the host `import` hook, caching the
    /// result. Returns an `Error(ImportNotFound)` value on miss-then-fail.
    fn import(&mut self, name: &str) -> Value;

    /// Render `v` the way `print` would.
    fn format_value(&mut self, v: Value) -> String;
}
