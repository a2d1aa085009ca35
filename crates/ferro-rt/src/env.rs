//! Lexical environments: name -> value binding, parent chain, dotted
//! lookup, sealing.

use ferro_core::object::{BuiltinFn, CallableKind, ObjType};
use ferro_core::{ErrorCode, Gc, Value};

/// Why a `bind` was refused. Rebinding a name or writing to a sealed frame
/// is a programmer error in the reference design; we surface it as a
/// `Result` instead of panicking so a misbehaving script cannot take the
/// whole embedding process down with it (documented in `DESIGN.md`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindError {
    AlreadyBound,
    Sealed,
}

fn env_is(v: Value) -> bool {
    v.obj_type() == Some(ObjType::Environment)
}

/// Insert `name -> value` into `env`'s own frame.
pub fn bind(env: Value, name: &str, value: Value) -> Result<(), BindError> {
    debug_assert!(env_is(env), "bind: not an Environment value");
    let e = env.obj().as_env();
    if e.sealed.get() {
        return Err(BindError::Sealed);
    }
    let mut slots = e.slots.borrow_mut();
    if slots.iter().any(|(k, _)| &**k == name) {
        return Err(BindError::AlreadyBound);
    }
    slots.push((name.into(), value));
    Ok(())
}

/// Bind `keys[i] -> values[i]` positionally; any values beyond `keys.len()`
/// are collected into a fresh `List` bound to `variadic`, if given.
pub fn bind_multiple(
    gc: &mut Gc,
    env: Value,
    keys: &[Box<str>],
    values: &[Value],
    variadic: Option<&str>,
) -> Result<(), BindError> {
    for (k, v) in keys.iter().zip(values.iter()) {
        bind(env, k, *v)?;
    }
    if let Some(rest_name) = variadic {
        let overflow: Vec<Value> = if values.len() > keys.len() {
            values[keys.len()..].to_vec()
        } else {
            Vec::new()
        };
        let rest_list = gc.alloc_list(overflow);
        bind(env, rest_name, rest_list)?;
    }
    Ok(())
}

pub fn bind_applicative(gc: &mut Gc, env: Value, name: &str, func: BuiltinFn) -> Result<(), BindError> {
    let callable = gc.alloc_builtin(name, CallableKind::Applicative, func, None);
    bind(env, name, callable)
}

pub fn bind_operative(
    gc: &mut Gc,
    env: Value,
    name: &str,
    func: BuiltinFn,
    context: Option<Value>,
) -> Result<(), BindError> {
    let callable = gc.alloc_builtin(name, CallableKind::Operative, func, context);
    bind(env, name, callable)
}

pub fn seal(env: Value) {
    debug_assert!(env_is(env));
    env.obj().as_env().sealed.set(true);
}

/// Look up `name` in `env`'s own frame only (no ascent). Used both by the
/// first segment of a dotted lookup's *ascent* phase and by every
/// subsequent segment's *no-ascent* phase.
fn lookup_local(env: Value, name: &str) -> Option<Value> {
    let e = env.obj().as_env();
    e.slots
        .borrow()
        .iter()
        .rev()
        .find(|(k, _)| &**k == name)
        .map(|(_, v)| *v)
}

/// Resolve a (possibly dotted) name, producing an `Error(SymbolNotFound)`
/// value rather than an exception on failure.
pub fn lookup(gc: &mut Gc, env: Value, dotted_name: &str) -> Value {
    let mut segments = dotted_name.split('.');
    let first = match segments.next() {
        Some(s) => s,
        None => return gc.alloc_error(ErrorCode::SymbolNotFound, "symbol not found"),
    };

    // First segment: walk the parent chain.
    let mut cursor = Some(env);
    let mut resolved = None;
    while let Some(frame) = cursor {
        if let Some(v) = lookup_local(frame, first) {
            resolved = Some(v);
            break;
        }
        cursor = frame.obj().as_env().parent.get();
    }
    let mut current = match resolved {
        Some(v) => v,
        None => return gc.alloc_error(ErrorCode::SymbolNotFound, "symbol not found"),
    };

    // Remaining segments: resolve strictly inside the previous
    // resolution's environment, without ascending its parent chain.
    for seg in segments {
        if env_is(current) {
            match lookup_local(current, seg) {
                Some(v) => current = v,
                None => return gc.alloc_error(ErrorCode::SymbolNotFound, "symbol not found"),
            }
        } else {
            return gc.alloc_error(ErrorCode::SymbolNotFound, "symbol not found");
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_and_lookup_local() {
        let mut gc = Gc::new();
        let env = gc.alloc_env(None);
        bind(env, "x", Value::int(42)).unwrap();
        let v = lookup(&mut gc, env, "x");
        assert!(v.is_int());
        assert_eq!(v.as_int(), 42);
    }

    #[test]
    fn lookup_ascends_parent() {
        let mut gc = Gc::new();
        let parent = gc.alloc_env(None);
        bind(parent, "x", Value::int(1)).unwrap();
        let child = gc.alloc_env(Some(parent));
        let v = lookup(&mut gc, child, "x");
        assert_eq!(v.as_int(), 1);
    }

    #[test]
    fn missing_symbol_is_error_value() {
        let mut gc = Gc::new();
        let env = gc.alloc_env(None);
        let v = lookup(&mut gc, env, "nope");
        assert_eq!(v.obj_type(), Some(ObjType::Error));
    }

    #[test]
    fn sealed_env_rejects_bind() {
        let mut gc = Gc::new();
        let env = gc.alloc_env(None);
        seal(env);
        assert_eq!(bind(env, "x", Value::int(1)), Err(BindError::Sealed));
    }

    #[test]
    fn dotted_lookup_does_not_ascend_inner_parent() {
        let mut gc = Gc::new();
        let root = gc.alloc_env(None);
        let module_parent = gc.alloc_env(None);
        bind(module_parent, "y", Value::int(99)).unwrap();
        let module = gc.alloc_env(Some(module_parent));
        bind(module, "x", Value::int(7)).unwrap();
        bind(root, "m", module).unwrap();

        let ok = lookup(&mut gc, root, "m.x");
        assert_eq!(ok.as_int(), 7);

        let missing = lookup(&mut gc, root, "m.y");
        assert_eq!(missing.obj_type(), Some(ObjType::Error));
    }
}
