//! The stack-based embedding API: VM lifecycle, the value stack,
//! parse/eval/call/peek, and the host hooks contract.

use std::collections::HashMap;

use ferro_core::object::CallableKind;
use ferro_core::{ErrorCode, Gc, Interp, ObjType, RootProvider, Value, ValueKind};

use crate::builtins::{self, format_value};
use crate::env;
use crate::error::{VmError, VmResult};
use crate::eval;
use crate::reader;

/// Capability set the embedder supplies. `import` hands back
/// raw module source; the VM itself parses and evaluates it through the
/// same path `vm_import` uses, so a host callback never has to re-enter
/// the VM it is a field of.
pub trait HostHooks {
    fn mem_alloc(&mut self, n: usize) -> *mut u8;
    fn mem_free(&mut self, ptr: *mut u8);
    fn init(&mut self);
    fn quit(&mut self);
    fn output(&mut self, bytes: &[u8]);
    fn import(&mut self, modname: &str) -> VmResult<Vec<u8>>;
}

/// Every `mem_alloc` token the bookkeeping facade hands out is this many
/// bytes; the size is never inspected, only the pointer identity and the
/// running count (see the `note_*` methods below).
const ALLOC_TOKEN_SIZE: usize = 1;

struct RootsView<'a> {
    stack: &'a [Value],
    root_env: Value,
    imports: &'a HashMap<Box<str>, Value>,
}

impl RootProvider for RootsView<'_> {
    fn visit_roots(&self, visit: &mut dyn FnMut(Value)) {
        if !self.root_env.is_null() {
            visit(self.root_env);
        }
        for v in self.stack {
            visit(*v);
        }
        for v in self.imports.values() {
            visit(*v);
        }
    }
}

/// A single, self-contained embeddable interpreter instance; multiple
/// `Vm`s never interact or share state.
pub struct Vm {
    gc: Gc,
    /// Unsealed; its sole parent is the sealed builtins frame, so the
    /// builtins stay alive (GC-reachable) for as long as this is a root
    /// without themselves needing to be a separate root.
    root_env: Value,
    stack: Vec<Value>,
    imports: HashMap<Box<str>, Value>,
    hooks: Box<dyn HostHooks>,

    /// mem_alloc/mem_free bookkeeping facade (see `note_allocations` /
    /// `note_collection`): `ferro_core::gc::Gc` owns its objects directly
    /// via `Box`, so this tracks aggregate alloc/free *counts* against the
    /// host hooks rather than routing every byte of heap storage through
    /// them: the counts balance by the time `vm_delete` returns.
    alloc_tokens: Vec<*mut u8>,
    tracked_live: usize,
}

impl Vm {
    pub fn new(mut hooks: Box<dyn HostHooks>) -> Vm {
        hooks.init();
        let mut gc = Gc::new();
        let builtins_env = gc.alloc_env(None);
        builtins::install_builtins(&mut gc, builtins_env);
        env::seal(builtins_env);
        let root_env = gc.alloc_env(Some(builtins_env));

        let mut vm = Vm {
            gc,
            root_env,
            stack: Vec::new(),
            imports: HashMap::new(),
            hooks,
            alloc_tokens: Vec::new(),
            tracked_live: 0,
        };
        vm.note_allocations();
        vm
    }

    /// `vm_delete`: clear the stack, collect twice (the second pass is a
    /// no-op for a precise single-space collector; kept to match the
    /// spec's literal operation table), release, then `hooks.quit()`.
    pub fn delete(mut self) {
        self.stack.clear();
        self.imports.clear();
        self.root_env = Value::NULL;
        for _ in 0..2 {
            let roots = RootsView { stack: &self.stack, root_env: self.root_env, imports: &self.imports };
            self.gc.collect(&roots);
            self.note_collection();
        }
        self.hooks.quit();
    }

    fn maybe_collect(&mut self) {
        if self.gc.should_collect() {
            let roots = RootsView { stack: &self.stack, root_env: self.root_env, imports: &self.imports };
            self.gc.collect(&roots);
            self.note_collection();
        }
    }

    fn note_allocations(&mut self) {
        let live = self.gc.live_count();
        if live > self.tracked_live {
            for _ in 0..(live - self.tracked_live) {
                let ptr = self.hooks.mem_alloc(ALLOC_TOKEN_SIZE);
                self.alloc_tokens.push(ptr);
            }
        }
        self.tracked_live = live;
    }

    fn note_collection(&mut self) {
        let freed = self.gc.stats().last_freed;
        for _ in 0..freed {
            match self.alloc_tokens.pop() {
                Some(ptr) => self.hooks.mem_free(ptr),
                None => break,
            }
        }
        self.tracked_live = self.gc.live_count();
    }

    fn resolve_index(&self, idx: i64) -> VmResult<usize> {
        let len = self.stack.len() as i64;
        let actual = if idx < 0 { len + idx } else { idx };
        if actual < 0 || actual >= len {
            return Err(VmError::StackIndexOutOfRange(idx, self.stack.len()));
        }
        Ok(actual as usize)
    }

    /// Resolve a module by name, parsing and evaluating its source the
    /// same way `vm_import` does, on cache miss. Failures are not
    /// memoized: a later `$import` of a previously-failing name retries
    /// the host hook.
    pub(crate) fn do_import(&mut self, name: &str) -> Value {
        if let Some(v) = self.imports.get(name) {
            return *v;
        }
        let bytes = match self.hooks.import(name) {
            Ok(b) => b,
            Err(_) => return self.gc.alloc_error(ErrorCode::ImportNotFound, "import not found"),
        };
        self.load_module(name, &bytes)
    }

    /// Parse and evaluate every top-level expression of `bytes` into a
    /// fresh module environment, cache it under `name`, and return it.
    /// Backs both `vm_import` (bytes supplied by the embedder) and
    /// `$import`/`do_import` (bytes supplied by the `import` host hook).
    fn load_module(&mut self, name: &str, bytes: &[u8]) -> Value {
        let module_env = self.gc.alloc_env(Some(self.root_env));
        let mut cursor = 0usize;
        while cursor < bytes.len() {
            let result = reader::parse(&mut self.gc, bytes, cursor);
            cursor = result.next;
            if result.value.obj_type() == Some(ObjType::Error) {
                break;
            }
            let evaluated = eval::eval(self, result.value, module_env);
            if evaluated.obj_type() == Some(ObjType::Error) {
                break;
            }
        }
        self.imports.insert(name.into(), module_env);
        self.note_allocations();
        module_env
    }

    // --- Embedding API -------------------------------------------------

    /// `vm_import`: parse+eval all expressions of `bytes` into a fresh
    /// module env, cache by `name`, push the module value on the stack.
    pub fn vm_import(&mut self, name: &str, bytes: &[u8]) -> VmResult<()> {
        self.imports.remove(name);
        let module = self.load_module(name, bytes);
        self.stack.push(module);
        self.maybe_collect();
        Ok(())
    }

    /// `parse`: consume one top-level expression from `bytes[start..]`,
    /// push it (an `Error` value on malformed input), and return the
    /// cursor of the first unconsumed byte.
    pub fn parse(&mut self, bytes: &[u8], start: usize) -> usize {
        let result = reader::parse(&mut self.gc, bytes, start);
        self.stack.push(result.value);
        self.note_allocations();
        self.maybe_collect();
        result.next
    }

    /// `eval`: replace `stack[idx]` with its evaluation in the root env.
    pub fn eval(&mut self, idx: i64) -> VmResult<()> {
        let i = self.resolve_index(idx)?;
        let expr = self.stack[i];
        let root_env = self.root_env;
        let value = eval::eval(self, expr, root_env);
        self.stack[i] = value;
        self.note_allocations();
        self.maybe_collect();
        Ok(())
    }

    /// `call`: treat `stack[-narg-1]` as callable, invoke with `narg`
    /// args, replace all `narg+1` slots with `nres` results. `nres` is
    /// currently always 1.
    pub fn call(&mut self, narg: usize, nres: usize) -> VmResult<()> {
        if nres != 1 {
            return Err(VmError::HookContractViolation("call: nres must be 1".into()));
        }
        if self.stack.len() < narg + 1 {
            return Err(VmError::StackIndexOutOfRange(-(narg as i64) - 1, self.stack.len()));
        }
        let base = self.stack.len() - narg - 1;
        let callable = self.stack[base];
        if callable.obj_type() != Some(ObjType::Callable) {
            return Err(VmError::NotCallable(base as i64));
        }
        let args: Vec<Value> = self.stack[base + 1..].to_vec();
        let root_env = self.root_env;
        let result = eval::invoke(self, callable, root_env, &args);
        self.stack.truncate(base);
        self.stack.push(result);
        self.note_allocations();
        self.maybe_collect();
        Ok(())
    }

    pub fn pop(&mut self, n: usize) {
        let new_len = self.stack.len().saturating_sub(n);
        self.stack.truncate(new_len);
    }

    pub fn push_opaque(&mut self, cookie: u64) {
        self.stack.push(Value::opaque(cookie));
    }

    pub fn push_symbol(&mut self, name: &str) {
        let v = self.gc.alloc_symbol(name);
        self.stack.push(v);
        self.note_allocations();
    }

    pub fn push_integer(&mut self, i: i32) {
        self.stack.push(Value::int(i));
    }

    pub fn tonumber(&self, idx: i64) -> VmResult<f64> {
        let i = self.resolve_index(idx)?;
        match self.stack[i].kind() {
            ValueKind::Double => Ok(self.stack[i].as_double()),
            ValueKind::Int => Ok(self.stack[i].as_int() as f64),
            _ => Err(VmError::WrongType(idx, "number")),
        }
    }

    pub fn tointeger(&self, idx: i64) -> VmResult<i32> {
        let i = self.resolve_index(idx)?;
        match self.stack[i].kind() {
            ValueKind::Int => Ok(self.stack[i].as_int()),
            ValueKind::Double => Ok(self.stack[i].as_double() as i32),
            _ => Err(VmError::WrongType(idx, "integer")),
        }
    }

    pub fn isnull(&self, idx: i64) -> VmResult<bool> {
        let i = self.resolve_index(idx)?;
        Ok(self.stack[i].is_null())
    }

    /// Borrowed snapshot of `stack[idx]`; invalidated on the next stack
    /// mutation.
    pub fn peekstack(&self, idx: i64) -> VmResult<Value> {
        let i = self.resolve_index(idx)?;
        Ok(self.stack[i])
    }

    /// `setmap`: treat `stack[idx]` as an environment; bind
    /// `stack[-2] -> stack[-1]` into it (key alone is not meaningful for
    /// a write, so `setmap` always takes both).
    pub fn setmap(&mut self, idx: i64) -> VmResult<()> {
        let i = self.resolve_index(idx)?;
        let env_val = self.stack[i];
        if env_val.obj_type() != Some(ObjType::Environment) {
            return Err(VmError::WrongType(idx, "environment"));
        }
        if self.stack.len() < 2 {
            return Err(VmError::StackIndexOutOfRange(-2, self.stack.len()));
        }
        let value = self.stack[self.stack.len() - 1];
        let key = self.stack[self.stack.len() - 2];
        if key.obj_type() != Some(ObjType::Symbol) {
            return Err(VmError::WrongType(-2, "symbol"));
        }
        let name = key.obj().as_symbol().name.clone();
        self.bind(env_val, &name, value);
        self.pop(2);
        Ok(())
    }

    /// `getmap`: treat `stack[idx]` as an environment; look up
    /// `stack[-1]` as a key and push the result.
    pub fn getmap(&mut self, idx: i64) -> VmResult<()> {
        let i = self.resolve_index(idx)?;
        let env_val = self.stack[i];
        if env_val.obj_type() != Some(ObjType::Environment) {
            return Err(VmError::WrongType(idx, "environment"));
        }
        if self.stack.is_empty() {
            return Err(VmError::StackIndexOutOfRange(-1, self.stack.len()));
        }
        let key = *self.stack.last().unwrap();
        if key.obj_type() != Some(ObjType::Symbol) {
            return Err(VmError::WrongType(-1, "symbol"));
        }
        let name = key.obj().as_symbol().name.clone();
        let result = self.lookup(env_val, &name);
        self.pop(1);
        self.stack.push(result);
        Ok(())
    }

    /// `print(vm, idx, end)`: print `stack[idx]` via the host output
    /// hook, followed by `end` (e.g. `"\n"`).
    pub fn print(&mut self, idx: i64, end: &str) -> VmResult<()> {
        let i = self.resolve_index(idx)?;
        let text = format_value(self.stack[i]);
        self.hooks.output(text.as_bytes());
        self.hooks.output(end.as_bytes());
        Ok(())
    }

    pub fn root_env(&self) -> Value {
        self.root_env
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }
}

impl Interp for Vm {
    fn alloc_symbol(&mut self, name: &str) -> Value {
        let v = self.gc.alloc_symbol(name);
        self.note_allocations();
        v
    }

    fn alloc_string(&mut self, s: &str) -> Value {
        let v = self.gc.alloc_string(s);
        self.note_allocations();
        v
    }

    fn alloc_list(&mut self, items: Vec<Value>) -> Value {
        let v = self.gc.alloc_list(items);
        self.note_allocations();
        v
    }

    fn alloc_bigint(&mut self, n: num_bigint::BigInt) -> Value {
        let v = self.gc.alloc_bigint(n);
        self.note_allocations();
        v
    }

    fn alloc_error(&mut self, code: ErrorCode, message: &str) -> Value {
        let v = self.gc.alloc_error(code, message);
        self.note_allocations();
        v
    }

    fn alloc_env(&mut self, parent: Option<Value>) -> Value {
        let v = self.gc.alloc_env(parent);
        self.note_allocations();
        v
    }

    fn alloc_callable(
        &mut self,
        name: Option<&str>,
        kind: CallableKind,
        formals: Vec<Box<str>>,
        rest: Option<Box<str>>,
        envsym: Option<Box<str>>,
        body: Value,
        env: Value,
    ) -> Value {
        let v = self.gc.alloc_user_callable(name, kind, formals, rest, envsym, body, env);
        self.note_allocations();
        v
    }

    fn bind(&mut self, env: Value, name: &str, value: Value) -> bool {
        env::bind(env, name, value).is_ok()
    }

    fn seal(&mut self, env: Value) {
        env::seal(env)
    }

    fn lookup(&mut self, env: Value, dotted_name: &str) -> Value {
        env::lookup(&mut self.gc, env, dotted_name)
    }

    fn eval(&mut self, expr: Value, env: Value) -> Value {
        eval::eval(self, expr, env)
    }

    fn invoke(&mut self, combiner: Value, env: Value, args: &[Value]) -> Value {
        eval::invoke(self, combiner, env, args)
    }

    fn output(&mut self, bytes: &[u8]) {
        self.hooks.output(bytes)
    }

    fn import(&mut self, name: &str) -> Value {
        self.do_import(name)
    }

    fn format_value(&mut self, v: Value) -> String {
        format_value(v)
    }
}
