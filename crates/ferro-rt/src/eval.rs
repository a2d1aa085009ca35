//! The trampoline evaluator.
//!
//! `eval` loops on [`EvalOutcome::TailCall`] instead of recursing, so a
//! self-tail-recursive user combiner (e.g. `fact`) runs in constant Rust
//! stack depth regardless of how many times it calls itself. Non-tail
//! recursion (e.g. evaluating an applicative's operands) still grows the
//! Rust stack, same as the source language's own non-tail call sites.

use crate::env;
use crate::vm::Vm;
use ferro_core::object::{CallableBody, CallableKind};
use ferro_core::{ErrorCode, EvalOutcome, ObjType, Value, ValueKind};

/// Fully evaluate `expr` in `env`, following tail calls until a final
/// value is produced.
pub fn eval(vm: &mut Vm, mut expr: Value, mut env_val: Value) -> Value {
    loop {
        match step(vm, expr, env_val) {
            EvalOutcome::Value(v) => return v,
            EvalOutcome::TailCall { expr: e, env: ev } => {
                expr = e;
                env_val = ev;
            }
        }
    }
}

/// Invoke `combiner` against already-final `args`, exactly as given
/// (neither applicative nor operative dispatch here re-evaluates them).
/// Used by `apply`, `mapreduce`, and `call`.
pub fn invoke(vm: &mut Vm, combiner: Value, env_val: Value, args: &[Value]) -> Value {
    match invoke_step(vm, combiner, env_val, args) {
        EvalOutcome::Value(v) => v,
        EvalOutcome::TailCall { expr, env: ev } => eval(vm, expr, ev),
    }
}

fn step(vm: &mut Vm, expr: Value, env_val: Value) -> EvalOutcome {
    match expr.kind() {
        ValueKind::Obj(ObjType::Symbol) => {
            let name = &expr.obj().as_symbol().name;
            EvalOutcome::value(env::lookup(&mut vm.gc, env_val, name))
        }
        ValueKind::Obj(ObjType::List) => eval_list(vm, expr, env_val),
        // Every other kind -- immediates, String, Callable, Environment,
        // BigInt, Error -- evaluates to itself.
        _ => EvalOutcome::value(expr),
    }
}

fn is_error(v: Value) -> bool {
    v.obj_type() == Some(ObjType::Error)
}

fn eval_list(vm: &mut Vm, expr: Value, env_val: Value) -> EvalOutcome {
    let items = &expr.obj().as_list().items;
    if items.is_empty() {
        return EvalOutcome::value(vm.gc.alloc_error(ErrorCode::EmptyList, "empty list in operand position"));
    }
    let head_expr = items[0];
    let operand_exprs = &items[1..];

    let head = eval(vm, head_expr, env_val);
    if is_error(head) {
        return EvalOutcome::value(head);
    }
    if head.obj_type() != Some(ObjType::Callable) {
        return EvalOutcome::value(vm.gc.alloc_error(ErrorCode::NotACombiner, "head of list is not a combiner"));
    }

    let kind = head.obj().as_callable().kind;
    let args: Vec<Value> = match kind {
        CallableKind::Applicative => {
            let mut buf = Vec::with_capacity(operand_exprs.len());
            for e in operand_exprs {
                let v = eval(vm, *e, env_val);
                if is_error(v) {
                    return EvalOutcome::value(v);
                }
                buf.push(v);
            }
            buf
        }
        CallableKind::Operative => operand_exprs.to_vec(),
    };

    invoke_step(vm, head, env_val, &args)
}

/// Shared combiner-invocation logic: dispatch to a built-in's function
/// pointer, or construct a fresh activation environment for a
/// user-defined combiner and hand back a tail call on its body. `args`
/// are taken as final -- callers decide whether and when to evaluate
/// them.
fn invoke_step(vm: &mut Vm, callable: Value, caller_env: Value, args: &[Value]) -> EvalOutcome {
    let callable_obj = callable.obj().as_callable();
    match &callable_obj.body {
        CallableBody::Builtin { func, .. } => func(vm, callable, caller_env, args),
        CallableBody::User { formals, rest, envsym, body, env } => {
            let too_few = args.len() < formals.len();
            let too_many = rest.is_none() && args.len() > formals.len();
            if too_few || too_many {
                return EvalOutcome::value(
                    vm.gc.alloc_error(ErrorCode::WrongNumberOfArguments, "wrong number of arguments"),
                );
            }
            let activation = vm.gc.alloc_env(Some(*env));
            if env::bind_multiple(&mut vm.gc, activation, formals, args, rest.as_deref()).is_err() {
                return EvalOutcome::value(vm.gc.alloc_error(ErrorCode::GenericFailure, "duplicate formal name"));
            }
            if callable_obj.kind == CallableKind::Operative {
                if let Some(envsym) = envsym {
                    let _ = env::bind(activation, envsym, caller_env);
                }
            }
            EvalOutcome::tail(*body, activation)
        }
    }
}
