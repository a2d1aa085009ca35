//! Integration tests against the stack-based embedding API: GC soundness,
//! parser/evaluator invariants, and full end-to-end scripts.

use std::alloc::{self, Layout};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use ferro_core::{ObjType, Value, ValueKind};
use ferro_rt::{HostHooks, Vm, VmError, VmResult};

const TOKEN_LAYOUT: Layout = match Layout::from_size_align(1, 1) {
    Ok(l) => l,
    Err(_) => unreachable!(),
};

/// A host hooks stand-in that counts every `mem_alloc`/`mem_free` call,
/// captures `output`, and resolves `$import` against an in-memory module
/// table instead of the filesystem.
struct TestHooks {
    allocs: Rc<RefCell<usize>>,
    frees: Rc<RefCell<usize>>,
    output: Rc<RefCell<Vec<u8>>>,
    modules: HashMap<String, Vec<u8>>,
}

impl TestHooks {
    fn new() -> TestHooks {
        TestHooks {
            allocs: Rc::new(RefCell::new(0)),
            frees: Rc::new(RefCell::new(0)),
            output: Rc::new(RefCell::new(Vec::new())),
            modules: HashMap::new(),
        }
    }

    fn with_module(mut self, name: &str, source: &str) -> TestHooks {
        self.modules.insert(name.to_string(), source.as_bytes().to_vec());
        self
    }
}

impl HostHooks for TestHooks {
    fn mem_alloc(&mut self, _n: usize) -> *mut u8 {
        *self.allocs.borrow_mut() += 1;
        unsafe { alloc::alloc(TOKEN_LAYOUT) }
    }

    fn mem_free(&mut self, ptr: *mut u8) {
        *self.frees.borrow_mut() += 1;
        unsafe { alloc::dealloc(ptr, TOKEN_LAYOUT) };
    }

    fn init(&mut self) {}
    fn quit(&mut self) {}

    fn output(&mut self, bytes: &[u8]) {
        self.output.borrow_mut().extend_from_slice(bytes);
    }

    fn import(&mut self, modname: &str) -> VmResult<Vec<u8>> {
        self.modules
            .get(modname)
            .cloned()
            .ok_or_else(|| VmError::FileNotFound(modname.to_string()))
    }
}

fn new_vm() -> (Vm, Rc<RefCell<usize>>, Rc<RefCell<usize>>, Rc<RefCell<Vec<u8>>>) {
    let hooks = TestHooks::new();
    let (allocs, frees, output) = (hooks.allocs.clone(), hooks.frees.clone(), hooks.output.clone());
    (Vm::new(Box::new(hooks)), allocs, frees, output)
}

/// Parse and evaluate every top-level expression of `src`, returning the
/// final stack-top value.
fn eval_all(vm: &mut Vm, src: &str) -> Value {
    let bytes = src.as_bytes();
    let mut cursor = 0usize;
    let mut last = Value::NULL;
    while cursor < bytes.len() {
        if bytes[cursor..].iter().all(|b| b.is_ascii_whitespace()) {
            break;
        }
        let next = vm.parse(bytes, cursor);
        vm.eval(-1).expect("eval should not hit a VmError in these tests");
        last = vm.peekstack(-1).unwrap();
        cursor = next;
    }
    last
}

fn assert_not_error(v: Value) {
    assert_ne!(
        v.obj_type(),
        Some(ObjType::Error),
        "expected a non-error value, got an Error"
    );
}

// --- GC soundness ------------------------------------------------------------

#[test]
fn gc_soundness_balances_alloc_and_free() {
    let (mut vm, allocs, frees, _out) = new_vm();
    eval_all(
        &mut vm,
        "(begin ($define (fact n) ($if (<= n 1) 1 (* n (fact (- n 1))))) (fact (bigint 20)))",
    );
    vm.pop(1);
    vm.delete();
    assert_eq!(*allocs.borrow(), *frees.borrow());
    assert!(*allocs.borrow() > 0);
}

// --- Structural parse round-trip ---------------------------------------------

#[test]
fn parse_round_trip_is_structural() {
    use ferro_core::Interp;

    let (mut vm, ..) = new_vm();
    // Restricted to ints/lists (no comments/strings): symbols print with a
    // `:` sigil that isn't valid re-parse syntax, so a structural round
    // trip is only guaranteed for this subset per the reader's own
    // grammar.
    let src = "(1 (2 3) 4 (5 (6 7)))";
    let next = vm.parse(src.as_bytes(), 0);
    assert_eq!(next, src.len());
    let original = vm.peekstack(-1).unwrap();
    assert_not_error(original);

    let printed = vm.format_value(original);
    vm.pop(1);
    vm.parse(printed.as_bytes(), 0);
    let reparsed = vm.peekstack(-1).unwrap();
    assert_not_error(reparsed);
    assert!(int_list_structural_eq(original, reparsed));
}

fn int_list_structural_eq(a: Value, b: Value) -> bool {
    match (a.kind(), b.kind()) {
        (ValueKind::Int, ValueKind::Int) => a.as_int() == b.as_int(),
        (ValueKind::Obj(ObjType::List), ValueKind::Obj(ObjType::List)) => {
            let (xs, ys) = (&a.obj().as_list().items, &b.obj().as_list().items);
            xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(x, y)| int_list_structural_eq(*x, *y))
        }
        _ => false,
    }
}

// --- Strict left-to-right applicative argument evaluation order -------------

#[test]
fn applicative_args_evaluate_left_to_right() {
    let (mut vm, .., output) = new_vm();
    eval_all(
        &mut vm,
        r#"(begin ($define (f x y z) null) (f (print "a") (print "b") (print "c")))"#,
    );
    assert_eq!(&*output.borrow(), b"abc");
}

// --- Tail calls run flat ------------------------------------------------------

#[test]
fn tail_recursive_loop_does_not_overflow_the_stack() {
    let (mut vm, ..) = new_vm();
    let result = eval_all(
        &mut vm,
        "(begin ($define (loop n acc) ($if (<= n 0) acc (loop (- n 1) (+ acc 1)))) (loop 200000 0))",
    );
    assert_eq!(result.kind(), ValueKind::Int);
    assert_eq!(result.as_int(), 200000);
}

// --- Dotted lookup (embedding-level) ------------------------------------------

#[test]
fn dotted_lookup_through_module() {
    let (mut vm, ..) = new_vm();
    let result = eval_all(&mut vm, "(begin ($module m ($define x 7)) m.x)");
    assert_eq!(result.kind(), ValueKind::Int);
    assert_eq!(result.as_int(), 7);

    let missing = eval_all(&mut vm, "m.y");
    assert_eq!(missing.obj_type(), Some(ObjType::Error));
}

// --- Sealed environments reject binds (embedding level, complementing
// the unit-level coverage in ferro_rt::env's own tests) ---------------------

#[test]
fn root_env_is_unsealed_but_sees_sealed_builtins() {
    let (mut vm, ..) = new_vm();
    // The root env (where top-level `$define`s land) is unsealed, but its
    // parent -- the builtins frame -- is sealed; lookups still ascend to
    // find `+` there.
    let result = eval_all(&mut vm, "(begin ($define two 2) (+ two two))");
    assert_eq!(result.as_int(), 4);
}

// --- End-to-end scenarios ------------------------------------------------------

#[test]
fn scenario_circle_area() {
    let (mut vm, ..) = new_vm();
    let result = eval_all(&mut vm, "(begin ($define r 10) (* 3.1415 (* r r)))");
    assert_eq!(result.kind(), ValueKind::Double);
    assert!(result.as_double() > 314.0 && result.as_double() < 315.0);
}

#[test]
fn scenario_factorial_bigint() {
    let (mut vm, ..) = new_vm();
    let result = eval_all(
        &mut vm,
        "(begin ($define (fact n) ($if (<= n 1) 1 (* n (fact (- n 1))))) (fact (bigint 35)))",
    );
    assert_eq!(result.obj_type(), Some(ObjType::BigInt));
    assert_eq!(
        result.obj().as_bigint().value.to_string(),
        "10333147966386144929666651337523200000000"
    );
}

#[test]
fn scenario_repeat_combinator() {
    let (mut vm, ..) = new_vm();
    eval_all(
        &mut vm,
        "(begin ($define (twice x) (* 2 x)) ($define repeat ($lambda (f) ($lambda (x) (f (f x))))))",
    );
    let forty = eval_all(&mut vm, "((repeat twice) 10)");
    assert_eq!(forty.as_int(), 40);
    let one_sixty = eval_all(&mut vm, "((repeat (repeat twice)) 10)");
    assert_eq!(one_sixty.as_int(), 160);
}

#[test]
fn scenario_mapreduce_count() {
    let (mut vm, ..) = new_vm();
    let result = eval_all(
        &mut vm,
        "(begin ($define (count item L) (mapreduce ($lambda (x) (equal? item x)) + L)) (count 0 (list 0 1 2 0 3 0 0)))",
    );
    assert_eq!(result.as_int(), 4);
}

#[test]
fn scenario_let_scoping() {
    let (mut vm, .., output) = new_vm();
    eval_all(&mut vm, r#"($let (a 10 b 20) (print a b "\n"))"#);
    assert_eq!(&*output.borrow(), b"1020\n");

    // Bare `$let` (no body) binds into the *caller's* environment.
    eval_all(&mut vm, "(begin ($let (c 30 d 40)))");
    let c = eval_all(&mut vm, "c");
    assert_eq!(c.as_int(), 30);
}

#[test]
fn scenario_import_module_and_missing_import() {
    let hooks = TestHooks::new().with_module("math", "($define pi 3.14159)");
    let mut vm = Vm::new(Box::new(hooks));

    let result = eval_all(&mut vm, "(begin ($import math) (* math.pi 2))");
    assert_eq!(result.kind(), ValueKind::Double);
    assert!(result.as_double() > 6.28 && result.as_double() < 6.29);

    let missing = eval_all(&mut vm, "($import nonexistent)");
    assert_eq!(missing.obj_type(), Some(ObjType::Error));
}

// --- `call`/`push_*`/`tonumber`/`setmap`/`getmap` smoke test ---------------

#[test]
fn call_with_pushed_arguments() {
    let (mut vm, ..) = new_vm();
    eval_all(&mut vm, "($define (add3 x y z) (+ x (+ y z)))");
    vm.parse(b"add3", 0);
    vm.eval(-1).unwrap();
    vm.push_integer(1);
    vm.push_integer(2);
    vm.push_integer(3);
    vm.call(3, 1).unwrap();
    let result = vm.peekstack(-1).unwrap();
    assert_eq!(result.as_int(), 6);
}

#[test]
fn setmap_and_getmap_round_trip() {
    let (mut vm, ..) = new_vm();
    vm.parse(b"(getenv)", 0);
    vm.eval(-1).unwrap();
    let env_idx = (vm.stack_len() - 1) as i64;
    vm.push_symbol("greeting");
    vm.parse(b"42", 0);
    vm.eval(-1).unwrap();
    vm.setmap(env_idx).unwrap();

    vm.push_symbol("greeting");
    vm.getmap(env_idx).unwrap();
    let result = vm.peekstack(-1).unwrap();
    assert_eq!(result.as_int(), 42);
}
