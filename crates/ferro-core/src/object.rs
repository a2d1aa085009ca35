//! Heap object layout.
//!
//! Every heap object shares a [`GcHeader`] (a GC header plus a type tag);
//! the payload is a closed enum over the seven heap object kinds: Symbol,
//! String, List, BigInt, Callable, Environment, and Error.

use crate::value::Value;
use num_bigint::BigInt;
use std::cell::{Cell, RefCell};

/// Discriminant for a heap object's payload. Stored in the header so a
/// boxed [`Value`] can be downcast with a debug-checked type assertion
/// instead of a runtime branch: a `Value` tagged `Obj` always points to a
/// live object whose header matches the kind being extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjType {
    Symbol,
    Str,
    List,
    BigInt,
    Callable,
    Environment,
    Error,
}

/// GC bookkeeping shared by every heap object.
pub struct GcHeader {
    /// Mark bit for the current tri-color sweep. `false` between cycles.
    pub(crate) mark: Cell<bool>,
    pub type_tag: ObjType,
}

/// A heap-allocated, GC-managed object: header plus typed payload.
pub struct GcObject {
    pub header: GcHeader,
    pub payload: ObjPayload,
}

impl GcObject {
    pub(crate) fn new(type_tag: ObjType, payload: ObjPayload) -> GcObject {
        GcObject {
            header: GcHeader {
                mark: Cell::new(false),
                type_tag,
            },
            payload,
        }
    }

    /// Enumerate this object's outgoing edges for the tracing collector.
    /// Scalar kinds (`String`, `Symbol`, `BigInt`, `Error`) have none.
    pub(crate) fn trace(&self, mut visit: impl FnMut(Value)) {
        match &self.payload {
            ObjPayload::List(l) => {
                for v in l.items.iter() {
                    visit(*v);
                }
            }
            ObjPayload::Callable(c) => {
                if let CallableBody::User { env, body, .. } = &c.body {
                    visit(*env);
                    visit(*body);
                }
                if let CallableBody::Builtin { context: Some(ctx), .. } = &c.body {
                    visit(*ctx);
                }
            }
            ObjPayload::Environment(e) => {
                if let Some(parent) = e.parent.get() {
                    visit(parent);
                }
                for (_, v) in e.slots.borrow().iter() {
                    visit(*v);
                }
            }
            ObjPayload::Symbol(_) | ObjPayload::Str(_) | ObjPayload::BigInt(_) | ObjPayload::Error(_) => {}
        }
    }
}

/// Payload variants, one per heap object kind.
pub enum ObjPayload {
    Symbol(SymbolObj),
    Str(StrObj),
    List(ListObj),
    BigInt(BigIntObj),
    Callable(CallableObj),
    Environment(EnvObj),
    Error(ErrorObj),
}

/// Interned-by-value identifier. Equality is defined by byte content,
/// not object identity: two symbols with the same name compare equal
/// even as distinct heap objects.
pub struct SymbolObj {
    pub name: Box<str>,
}

/// Immutable UTF-8 string.
pub struct StrObj {
    pub bytes: Box<str>,
}

/// Fixed-length value array. Length is immutable after creation.
pub struct ListObj {
    pub items: Box<[Value]>,
}

/// Arbitrary-precision signed integer, backed by `num-bigint`.
/// Finalization is simply Rust's `Drop` for `BigInt` -- there is no
/// separate finalizer hook to invoke.
pub struct BigIntObj {
    pub value: BigInt,
}

/// Either an applicative (arguments pre-evaluated) or operative (arguments
/// passed unevaluated, caller env visible) combiner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    Applicative,
    Operative,
}

/// A built-in combiner's entry point. `callable` is the combiner value
/// itself (so a built-in can read back its own `context` field), `env` is
/// the *caller's* environment (meaningful only for operatives; applicatives
/// may ignore it) and `args` are the (already-evaluated, for applicatives)
/// operands.
pub type BuiltinFn = fn(
    interp: &mut dyn crate::interp::Interp,
    callable: Value,
    env: Value,
    args: &[Value],
) -> crate::interp::EvalOutcome;

pub enum CallableBody {
    /// A built-in, implemented as a Rust function pointer plus an optional
    /// captured context value (builtins only).
    Builtin {
        func: BuiltinFn,
        context: Option<Value>,
    },
    /// A user-defined combiner: raw body expression plus the environment
    /// it closes over -- no bytecode, just the source expression.
    User {
        formals: Box<[Box<str>]>,
        rest: Option<Box<str>>,
        /// Only set for operatives: the name the caller's environment is
        /// bound under on invocation.
        envsym: Option<Box<str>>,
        body: Value,
        env: Value,
    },
}

pub struct CallableObj {
    pub name: Option<Box<str>>,
    pub kind: CallableKind,
    pub body: CallableBody,
}

/// A single binding frame: insertion-ordered name -> value map, optional
/// parent, and a `sealed` flag.
pub struct EnvObj {
    pub parent: Cell<Option<Value>>,
    pub slots: RefCell<Vec<(Box<str>, Value)>>,
    pub sealed: Cell<bool>,
}

/// A first-class error value: errors are values the evaluator passes
/// around, never exceptions.
pub struct ErrorObj {
    pub code: crate::error::ErrorCode,
    pub message: Box<str>,
}

// --- Typed, debug-checked downcasts ---------------------------------------
//
// A Value tagged Obj always points to a live object whose header.type_tag
// matches the kind being extracted, so the type-safe cast is an invariant,
// not a runtime branch: only a debug_assert guards misuse.

macro_rules! downcast {
    ($fn_name:ident, $variant:ident, $ty:ty, $tag:ident) => {
        impl GcObject {
            #[allow(dead_code)]
            pub fn $fn_name(&self) -> &$ty {
                debug_assert_eq!(self.header.type_tag, ObjType::$tag);
                match &self.payload {
                    ObjPayload::$variant(inner) => inner,
                    _ => unreachable!("GcObject type_tag/payload mismatch"),
                }
            }
        }
    };
}

downcast!(as_symbol, Symbol, SymbolObj, Symbol);
downcast!(as_str, Str, StrObj, Str);
downcast!(as_list, List, ListObj, List);
downcast!(as_bigint, BigInt, BigIntObj, BigInt);
downcast!(as_callable, Callable, CallableObj, Callable);
downcast!(as_env, Environment, EnvObj, Environment);
downcast!(as_error, Error, ErrorObj, Error);
