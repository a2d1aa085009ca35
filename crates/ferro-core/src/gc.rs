//! A precise, stop-the-world, tri-color mark/sweep collector over
//! [`GcObject`]s.
//!
//! The collector owns every object it registers: sweeping an unmarked
//! object drops its `Box`, which runs Rust's own finalization for the two
//! kinds that need it (`BigInt`'s bignum storage, `Environment`'s slot
//! vector) -- there is no separate finalizer callback to wire up.
//!
//! Concurrency: single-threaded, synchronous with the evaluator. A full
//! incremental/concurrent collector is not required here; stop-the-world
//! mark/sweep is correct as long as every live value is reachable from a
//! root whenever `collect()` runs.

use crate::object::{
    BigIntObj, CallableBody, CallableKind, CallableObj, EnvObj, ErrorObj, GcObject, ListObj,
    ObjPayload, ObjType, StrObj, SymbolObj,
};
use crate::value::Value;
use num_bigint::BigInt;
use std::cell::{Cell, RefCell};

/// Something the collector can ask for the current root set. Implemented
/// by the embedding VM: the root environment, every value on the
/// embedding stack, and every imported module.
pub trait RootProvider {
    fn visit_roots(&self, visit: &mut dyn FnMut(Value));
}

/// Running totals, surfaced mostly for tests and `tracing` spans.
#[derive(Debug, Default, Clone, Copy)]
pub struct GcStats {
    pub live_objects: usize,
    pub collections: u64,
    pub last_freed: usize,
}

pub struct Gc {
    registry: Vec<*mut GcObject>,
    stats: GcStats,
    /// Collect automatically once the registry crosses this many live
    /// objects since the last cycle. Purely a heuristic; callers may also
    /// call [`Gc::collect`] directly at any allocation-safe point.
    collect_threshold: usize,
    allocated_since_collect: usize,
}

impl Gc {
    pub fn new() -> Gc {
        Gc {
            registry: Vec::new(),
            stats: GcStats::default(),
            collect_threshold: 4096,
            allocated_since_collect: 0,
        }
    }

    pub fn stats(&self) -> GcStats {
        self.stats
    }

    pub fn live_count(&self) -> usize {
        self.registry.len()
    }

    fn register(&mut self, obj: Box<GcObject>) -> Value {
        let ptr = Box::into_raw(obj);
        self.registry.push(ptr);
        self.allocated_since_collect += 1;
        Value::from_obj_ptr(ptr)
    }

    pub fn should_collect(&self) -> bool {
        self.allocated_since_collect >= self.collect_threshold
    }

    // --- Typed constructors -------------------------------------------

    pub fn alloc_symbol(&mut self, name: &str) -> Value {
        self.register(Box::new(GcObject::new(
            ObjType::Symbol,
            ObjPayload::Symbol(SymbolObj { name: name.into() }),
        )))
    }

    pub fn alloc_string(&mut self, s: &str) -> Value {
        self.register(Box::new(GcObject::new(
            ObjType::Str,
            ObjPayload::Str(StrObj { bytes: s.into() }),
        )))
    }

    pub fn alloc_list(&mut self, items: Vec<Value>) -> Value {
        self.register(Box::new(GcObject::new(
            ObjType::List,
            ObjPayload::List(ListObj {
                items: items.into_boxed_slice(),
            }),
        )))
    }

    pub fn alloc_bigint(&mut self, n: BigInt) -> Value {
        self.register(Box::new(GcObject::new(
            ObjType::BigInt,
            ObjPayload::BigInt(BigIntObj { value: n }),
        )))
    }

    pub fn alloc_error(&mut self, code: crate::error::ErrorCode, message: &str) -> Value {
        self.register(Box::new(GcObject::new(
            ObjType::Error,
            ObjPayload::Error(ErrorObj {
                code,
                message: message.into(),
            }),
        )))
    }

    pub fn alloc_env(&mut self, parent: Option<Value>) -> Value {
        self.register(Box::new(GcObject::new(
            ObjType::Environment,
            ObjPayload::Environment(EnvObj {
                parent: Cell::new(parent),
                slots: RefCell::new(Vec::new()),
                sealed: Cell::new(false),
            }),
        )))
    }

    pub fn alloc_builtin(
        &mut self,
        name: &str,
        kind: CallableKind,
        func: crate::object::BuiltinFn,
        context: Option<Value>,
    ) -> Value {
        self.register(Box::new(GcObject::new(
            ObjType::Callable,
            ObjPayload::Callable(CallableObj {
                name: Some(name.into()),
                kind,
                body: CallableBody::Builtin { func, context },
            }),
        )))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn alloc_user_callable(
        &mut self,
        name: Option<&str>,
        kind: CallableKind,
        formals: Vec<Box<str>>,
        rest: Option<Box<str>>,
        envsym: Option<Box<str>>,
        body: Value,
        env: Value,
    ) -> Value {
        self.register(Box::new(GcObject::new(
            ObjType::Callable,
            ObjPayload::Callable(CallableObj {
                name: name.map(|n| n.into()),
                kind,
                body: CallableBody::User {
                    formals: formals.into_boxed_slice(),
                    rest,
                    envsym,
                    body,
                    env,
                },
            }),
        )))
    }

    /// Mark from `roots`, then sweep every unmarked object. Safe to call at
    /// any point where every live value is reachable from `roots` (spec
    /// §4.B "safe to run at any allocation point ... no in-progress
    /// allocation whose result is not yet rooted").
    pub fn collect(&mut self, roots: &dyn RootProvider) {
        tracing::debug!(live_before = self.registry.len(), "gc: collection start");

        let mut worklist: Vec<Value> = Vec::new();
        roots.visit_roots(&mut |v| worklist.push(v));

        while let Some(v) = worklist.pop() {
            if !v.is_obj() {
                continue;
            }
            let ptr = v.as_obj_ptr();
            // SAFETY: ptr came from a Value tagged Obj, which per invariant
            // 6 always points to a live, registered object.
            let obj = unsafe { &*ptr };
            if obj.header.mark.get() {
                continue;
            }
            obj.header.mark.set(true);
            obj.trace(|edge| worklist.push(edge));
        }

        let before = self.registry.len();
        let mut kept = Vec::with_capacity(self.registry.len());
        for ptr in self.registry.drain(..) {
            // SAFETY: every pointer in the registry was produced by
            // `register` and is unique to this Gc.
            let marked = unsafe { (*ptr).header.mark.get() };
            if marked {
                unsafe { (*ptr).header.mark.set(false) };
                kept.push(ptr);
            } else {
                unsafe {
                    drop(Box::from_raw(ptr));
                }
            }
        }
        self.registry = kept;
        let freed = before - self.registry.len();

        self.stats.collections += 1;
        self.stats.last_freed = freed;
        self.stats.live_objects = self.registry.len();
        self.allocated_since_collect = 0;

        tracing::debug!(freed, live_after = self.registry.len(), "gc: collection end");
    }
}

impl Drop for Gc {
    fn drop(&mut self) {
        for ptr in self.registry.drain(..) {
            unsafe {
                drop(Box::from_raw(ptr));
            }
        }
    }
}

impl Default for Gc {
    fn default() -> Gc {
        Gc::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoRoots;
    impl RootProvider for NoRoots {
        fn visit_roots(&self, _visit: &mut dyn FnMut(Value)) {}
    }

    struct OneRoot(Value);
    impl RootProvider for OneRoot {
        fn visit_roots(&self, visit: &mut dyn FnMut(Value)) {
            visit(self.0);
        }
    }

    #[test]
    fn unreachable_objects_are_swept() {
        let mut gc = Gc::new();
        let _a = gc.alloc_string("a");
        let _b = gc.alloc_string("b");
        assert_eq!(gc.live_count(), 2);
        gc.collect(&NoRoots);
        assert_eq!(gc.live_count(), 0);
    }

    #[test]
    fn rooted_objects_survive() {
        let mut gc = Gc::new();
        let kept = gc.alloc_string("kept");
        let _dropped = gc.alloc_string("dropped");
        gc.collect(&OneRoot(kept));
        assert_eq!(gc.live_count(), 1);
    }

    #[test]
    fn list_elements_are_traced() {
        let mut gc = Gc::new();
        let inner = gc.alloc_string("inner");
        let list = gc.alloc_list(vec![inner]);
        gc.collect(&OneRoot(list));
        assert_eq!(gc.live_count(), 2);
    }

    #[test]
    fn env_parent_chain_is_traced() {
        let mut gc = Gc::new();
        let parent = gc.alloc_env(None);
        let child = gc.alloc_env(Some(parent));
        gc.collect(&OneRoot(child));
        assert_eq!(gc.live_count(), 2);
    }
}
