//! The built-in combiner table plus the printing rules that back `print`
//! and the embedding API's `print` operation.
//!
//! Every function here has the [`ferro_core::object::BuiltinFn`] shape and
//! is bound into the sealed builtins environment by [`install_builtins`].

use ferro_core::numeric::{joint_class, JointClass, Num};
use ferro_core::object::CallableKind;
use ferro_core::{ErrorCode, EvalOutcome, Gc, Interp, ObjType, Value, ValueKind};
use num_bigint::BigInt;

use crate::env;

fn is_error(v: Value) -> bool {
    v.obj_type() == Some(ObjType::Error)
}

fn wrong_args(interp: &mut dyn Interp) -> EvalOutcome {
    EvalOutcome::value(interp.alloc_error(ErrorCode::WrongNumberOfArguments, "wrong number of arguments"))
}

fn non_numeric(interp: &mut dyn Interp) -> EvalOutcome {
    EvalOutcome::value(interp.alloc_error(ErrorCode::NonNumericArguments, "operands are not numeric"))
}

fn generic_fail(interp: &mut dyn Interp, message: &str) -> EvalOutcome {
    EvalOutcome::value(interp.alloc_error(ErrorCode::GenericFailure, message))
}

fn expect_symbol_name(v: Value) -> Option<Box<str>> {
    if v.obj_type() == Some(ObjType::Symbol) {
        Some(v.obj().as_symbol().name.clone())
    } else {
        None
    }
}

fn expect_list(v: Value) -> Option<&'static [Value]> {
    if v.obj_type() == Some(ObjType::List) {
        Some(&v.obj().as_list().items)
    } else {
        None
    }
}

/// A formal-parameter list, possibly ending in a `. rest` variadic marker:
/// a literal symbol `.` followed by a rest name.
fn parse_formals(items: &[Value]) -> Option<(Vec<Box<str>>, Option<Box<str>>)> {
    let mut formals = Vec::new();
    let mut rest = None;
    let mut i = 0;
    while i < items.len() {
        let name = expect_symbol_name(items[i])?;
        if &*name == "." {
            if i + 2 != items.len() {
                return None;
            }
            rest = Some(expect_symbol_name(items[i + 1])?);
            i += 2;
        } else {
            formals.push(name);
            i += 1;
        }
    }
    Some((formals, rest))
}

// --- $define / $lambda / $if / $quote / $cond ------------------------------

fn bi_define(interp: &mut dyn Interp, _callable: Value, env: Value, args: &[Value]) -> EvalOutcome {
    match args.len() {
        2 if args[0].obj_type() == Some(ObjType::Symbol) => {
            let name = expect_symbol_name(args[0]).unwrap();
            let value = interp.eval(args[1], env);
            if is_error(value) {
                return EvalOutcome::value(value);
            }
            if !interp.bind(env, &name, value) {
                return generic_fail(interp, "$define: name already bound or environment sealed");
            }
            EvalOutcome::value(value)
        }
        2 if args[0].obj_type() == Some(ObjType::List) => {
            let head_items = expect_list(args[0]).unwrap();
            if head_items.is_empty() {
                return generic_fail(interp, "$define: empty combiner head");
            }
            let name = match expect_symbol_name(head_items[0]) {
                Some(n) => n,
                None => return generic_fail(interp, "$define: combiner name must be a symbol"),
            };
            let (formals, rest) = match parse_formals(&head_items[1..]) {
                Some(f) => f,
                None => return generic_fail(interp, "$define: malformed formal list"),
            };
            let body = args[1];
            let callable = interp.alloc_callable(Some(&name), CallableKind::Applicative, formals, rest, None, body, env);
            if !interp.bind(env, &name, callable) {
                return generic_fail(interp, "$define: name already bound or environment sealed");
            }
            EvalOutcome::value(callable)
        }
        3 if args[0].obj_type() == Some(ObjType::List) => {
            let head_items = expect_list(args[0]).unwrap();
            if head_items.is_empty() {
                return generic_fail(interp, "$define: empty combiner head");
            }
            let name = match expect_symbol_name(head_items[0]) {
                Some(n) if n.starts_with('$') => n,
                _ => return generic_fail(interp, "$define: operative name must start with '$'"),
            };
            let (formals, rest) = match parse_formals(&head_items[1..]) {
                Some(f) => f,
                None => return generic_fail(interp, "$define: malformed formal list"),
            };
            let envsym = match expect_symbol_name(args[1]) {
                Some(s) => s,
                None => return generic_fail(interp, "$define: envsym must be a symbol"),
            };
            let body = args[2];
            let callable = interp.alloc_callable(Some(&name), CallableKind::Operative, formals, rest, Some(envsym), body, env);
            if !interp.bind(env, &name, callable) {
                return generic_fail(interp, "$define: name already bound or environment sealed");
            }
            EvalOutcome::value(callable)
        }
        _ => generic_fail(interp, "$define: unrecognized form"),
    }
}

fn bi_lambda(interp: &mut dyn Interp, _callable: Value, env: Value, args: &[Value]) -> EvalOutcome {
    if args.len() != 2 {
        return wrong_args(interp);
    }
    let body = args[1];
    let (formals, rest) = match args[0].obj_type() {
        Some(ObjType::List) => match parse_formals(expect_list(args[0]).unwrap()) {
            Some(f) => f,
            None => return generic_fail(interp, "$lambda: malformed formal list"),
        },
        Some(ObjType::Symbol) => {
            let all = expect_symbol_name(args[0]).unwrap();
            (Vec::new(), Some(all))
        }
        _ => return generic_fail(interp, "$lambda: argument spec must be a list or symbol"),
    };
    let callable = interp.alloc_callable(None, CallableKind::Applicative, formals, rest, None, body, env);
    EvalOutcome::value(callable)
}

fn bi_if(interp: &mut dyn Interp, _callable: Value, env: Value, args: &[Value]) -> EvalOutcome {
    if args.len() != 2 && args.len() != 3 {
        return wrong_args(interp);
    }
    let cond = interp.eval(args[0], env);
    if is_error(cond) {
        return EvalOutcome::value(cond);
    }
    match cond.kind() {
        ValueKind::Int | ValueKind::Obj(ObjType::List) => {
            if cond.is_truthy() {
                EvalOutcome::tail(args[1], env)
            } else if args.len() == 3 {
                EvalOutcome::tail(args[2], env)
            } else {
                generic_fail(interp, "$if: falsey condition with no else clause")
            }
        }
        _ => generic_fail(interp, "$if: condition must be Int or List"),
    }
}

fn bi_quote(interp: &mut dyn Interp, _callable: Value, _env: Value, args: &[Value]) -> EvalOutcome {
    if args.len() != 1 {
        return wrong_args(interp);
    }
    EvalOutcome::value(args[0])
}

fn bi_cond(interp: &mut dyn Interp, _callable: Value, env: Value, args: &[Value]) -> EvalOutcome {
    for clause in args {
        let pair = match expect_list(*clause) {
            Some(p) if p.len() == 2 => p,
            _ => return generic_fail(interp, "$cond: each clause must be (test expr)"),
        };
        let is_else = expect_symbol_name(pair[0]).as_deref() == Some("else");
        if is_else {
            return EvalOutcome::tail(pair[1], env);
        }
        let test = interp.eval(pair[0], env);
        if is_error(test) {
            return EvalOutcome::value(test);
        }
        if test.is_truthy() {
            return EvalOutcome::tail(pair[1], env);
        }
    }
    EvalOutcome::value(Value::NULL)
}

// --- $module / $import / $let / begin --------------------------------------

fn bi_module(interp: &mut dyn Interp, _callable: Value, env: Value, args: &[Value]) -> EvalOutcome {
    if args.is_empty() {
        return wrong_args(interp);
    }
    let name = match expect_symbol_name(args[0]) {
        Some(n) => n,
        None => return generic_fail(interp, "$module: name must be a symbol"),
    };
    let child = interp.alloc_env(Some(env));
    for expr in &args[1..] {
        let v = interp.eval(*expr, child);
        if is_error(v) {
            return EvalOutcome::value(v);
        }
    }
    if !interp.bind(env, &name, child) {
        return generic_fail(interp, "$module: name already bound or environment sealed");
    }
    EvalOutcome::value(child)
}

fn bi_import(interp: &mut dyn Interp, _callable: Value, env: Value, args: &[Value]) -> EvalOutcome {
    if args.len() != 1 {
        return wrong_args(interp);
    }
    let name = match expect_symbol_name(args[0]) {
        Some(n) => n,
        None => return generic_fail(interp, "$import: name must be a symbol"),
    };
    let result = interp.import(&name);
    let _ = interp.bind(env, &name, result);
    EvalOutcome::value(result)
}

fn bi_let(interp: &mut dyn Interp, _callable: Value, env: Value, args: &[Value]) -> EvalOutcome {
    if args.is_empty() {
        return wrong_args(interp);
    }
    let pairs = match expect_list(args[0]) {
        Some(p) if p.len() % 2 == 0 => p,
        _ => return generic_fail(interp, "$let: bindings must be an even-length list"),
    };
    let body = &args[1..];
    // A bare `$let` (no body) binds directly into the caller's environment
    // rather than a fresh child.
    let target = if body.is_empty() { env } else { interp.alloc_env(Some(env)) };

    let mut i = 0;
    while i < pairs.len() {
        let key = match expect_symbol_name(pairs[i]) {
            Some(k) => k,
            None => return generic_fail(interp, "$let: binding name must be a symbol"),
        };
        let value = interp.eval(pairs[i + 1], target);
        if is_error(value) {
            return EvalOutcome::value(value);
        }
        if !interp.bind(target, &key, value) {
            return generic_fail(interp, "$let: duplicate binding name");
        }
        i += 2;
    }

    if body.is_empty() {
        return EvalOutcome::value(Value::NULL);
    }
    for expr in &body[..body.len() - 1] {
        let v = interp.eval(*expr, target);
        if is_error(v) {
            return EvalOutcome::value(v);
        }
    }
    EvalOutcome::tail(body[body.len() - 1], target)
}

fn bi_begin(interp: &mut dyn Interp, _callable: Value, env: Value, args: &[Value]) -> EvalOutcome {
    if args.is_empty() {
        return EvalOutcome::value(Value::NULL);
    }
    for expr in &args[..args.len() - 1] {
        let v = interp.eval(*expr, env);
        if is_error(v) {
            return EvalOutcome::value(v);
        }
    }
    EvalOutcome::tail(args[args.len() - 1], env)
}

// --- eval / getenv / print / list / bigint / equal? / mapreduce ------------

fn bi_eval(interp: &mut dyn Interp, _callable: Value, env: Value, args: &[Value]) -> EvalOutcome {
    match args.len() {
        1 => EvalOutcome::tail(args[0], env),
        2 => {
            if args[1].obj_type() != Some(ObjType::Environment) {
                return generic_fail(interp, "eval: second argument must be an environment");
            }
            EvalOutcome::tail(args[0], args[1])
        }
        _ => wrong_args(interp),
    }
}

fn bi_getenv(interp: &mut dyn Interp, _callable: Value, env: Value, args: &[Value]) -> EvalOutcome {
    if !args.is_empty() {
        return wrong_args(interp);
    }
    EvalOutcome::value(env)
}

fn bi_print(interp: &mut dyn Interp, _callable: Value, _env: Value, args: &[Value]) -> EvalOutcome {
    for a in args {
        let text = interp.format_value(*a);
        interp.output(text.as_bytes());
    }
    EvalOutcome::value(Value::NULL)
}

fn bi_list(interp: &mut dyn Interp, _callable: Value, _env: Value, args: &[Value]) -> EvalOutcome {
    EvalOutcome::value(interp.alloc_list(args.to_vec()))
}

fn bi_bigint(interp: &mut dyn Interp, _callable: Value, _env: Value, args: &[Value]) -> EvalOutcome {
    if args.len() != 1 {
        return wrong_args(interp);
    }
    match args[0].kind() {
        ValueKind::Int => EvalOutcome::value(interp.alloc_bigint(BigInt::from(args[0].as_int()))),
        ValueKind::Obj(ObjType::BigInt) => EvalOutcome::value(args[0]),
        _ => non_numeric(interp),
    }
}

fn structural_equal(a: Value, b: Value) -> bool {
    match (a.kind(), b.kind()) {
        (ValueKind::Int, ValueKind::Int) => a.as_int() == b.as_int(),
        (ValueKind::Double, ValueKind::Double) => a.as_double() == b.as_double(),
        (ValueKind::Null, ValueKind::Null) => true,
        (ValueKind::Opaque, ValueKind::Opaque) => a.as_opaque() == b.as_opaque(),
        (ValueKind::Obj(ObjType::Symbol), ValueKind::Obj(ObjType::Symbol)) => {
            a.obj().as_symbol().name == b.obj().as_symbol().name
        }
        (ValueKind::Obj(ObjType::Str), ValueKind::Obj(ObjType::Str)) => {
            a.obj().as_str().bytes == b.obj().as_str().bytes
        }
        (ValueKind::Obj(ObjType::BigInt), ValueKind::Obj(ObjType::BigInt)) => {
            a.obj().as_bigint().value == b.obj().as_bigint().value
        }
        (ValueKind::Obj(ObjType::List), ValueKind::Obj(ObjType::List)) => {
            let (xs, ys) = (&a.obj().as_list().items, &b.obj().as_list().items);
            xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(x, y)| structural_equal(*x, *y))
        }
        // Callable/Environment/Error have no defined structural notion;
        // fall back to identity.
        (ValueKind::Obj(ObjType::Callable), ValueKind::Obj(ObjType::Callable))
        | (ValueKind::Obj(ObjType::Environment), ValueKind::Obj(ObjType::Environment))
        | (ValueKind::Obj(ObjType::Error), ValueKind::Obj(ObjType::Error)) => a == b,
        _ => false,
    }
}

fn bi_equal(interp: &mut dyn Interp, _callable: Value, _env: Value, args: &[Value]) -> EvalOutcome {
    if args.len() != 2 {
        return wrong_args(interp);
    }
    EvalOutcome::value(Value::int(structural_equal(args[0], args[1]) as i32))
}

fn bi_mapreduce(interp: &mut dyn Interp, _callable: Value, env: Value, args: &[Value]) -> EvalOutcome {
    if args.len() != 3 {
        return wrong_args(interp);
    }
    let (mapper, reducer, lst) = (args[0], args[1], args[2]);
    let items = match expect_list(lst) {
        Some(i) => i,
        None => return generic_fail(interp, "mapreduce: third argument must be a list"),
    };
    if items.is_empty() {
        return EvalOutcome::value(interp.alloc_error(ErrorCode::EmptyList, "mapreduce on empty list"));
    }
    let mut acc = interp.invoke(mapper, env, &items[0..1]);
    if is_error(acc) {
        return EvalOutcome::value(acc);
    }
    for item in &items[1..] {
        let mapped = interp.invoke(mapper, env, std::slice::from_ref(item));
        if is_error(mapped) {
            return EvalOutcome::value(mapped);
        }
        acc = interp.invoke(reducer, env, &[acc, mapped]);
        if is_error(acc) {
            return EvalOutcome::value(acc);
        }
    }
    EvalOutcome::value(acc)
}

// --- arithmetic -------------------------------------------------------------

fn arith(
    interp: &mut dyn Interp,
    args: &[Value],
    int_op: fn(i32, i32) -> i32,
    dbl_op: fn(f64, f64) -> f64,
    big_op: fn(&BigInt, &BigInt) -> BigInt,
) -> EvalOutcome {
    if args.len() != 2 {
        return wrong_args(interp);
    }
    let (a, b) = match (Num::from_value(args[0]), Num::from_value(args[1])) {
        (Some(a), Some(b)) => (a, b),
        _ => return non_numeric(interp),
    };
    match joint_class(&a, &b) {
        Some(JointClass::Int) => {
            let (x, y) = match (&a, &b) {
                (Num::Int(x), Num::Int(y)) => (*x, *y),
                _ => unreachable!(),
            };
            EvalOutcome::value(Value::int(int_op(x, y)))
        }
        Some(JointClass::Double) => EvalOutcome::value(Value::double(dbl_op(a.to_f64(), b.to_f64()))),
        Some(JointClass::Big) => {
            EvalOutcome::value(interp.alloc_bigint(big_op(&a.to_bigint(), &b.to_bigint())))
        }
        None => non_numeric(interp),
    }
}

fn bi_add(interp: &mut dyn Interp, _callable: Value, _env: Value, args: &[Value]) -> EvalOutcome {
    arith(interp, args, i32::wrapping_add, |x, y| x + y, |x, y| x + y)
}

fn bi_sub(interp: &mut dyn Interp, _callable: Value, _env: Value, args: &[Value]) -> EvalOutcome {
    arith(interp, args, i32::wrapping_sub, |x, y| x - y, |x, y| x - y)
}

fn bi_mul(interp: &mut dyn Interp, _callable: Value, _env: Value, args: &[Value]) -> EvalOutcome {
    arith(interp, args, i32::wrapping_mul, |x, y| x * y, |x, y| x * y)
}

fn bi_div(interp: &mut dyn Interp, _callable: Value, _env: Value, args: &[Value]) -> EvalOutcome {
    if args.len() != 2 {
        return wrong_args(interp);
    }
    match (args[0].kind(), args[1].kind()) {
        (ValueKind::Double, ValueKind::Double) => {
            EvalOutcome::value(Value::double(args[0].as_double() / args[1].as_double()))
        }
        // Only the two-double form is supported; mixed int/bigint
        // division has no defined rounding policy here.
        _ => non_numeric(interp),
    }
}

fn bi_le(interp: &mut dyn Interp, _callable: Value, _env: Value, args: &[Value]) -> EvalOutcome {
    if args.len() != 2 {
        return wrong_args(interp);
    }
    let (a, b) = match (Num::from_value(args[0]), Num::from_value(args[1])) {
        (Some(a), Some(b)) => (a, b),
        _ => return non_numeric(interp),
    };
    let result = if matches!(a, Num::Double(_)) || matches!(b, Num::Double(_)) {
        a.to_f64() <= b.to_f64()
    } else {
        a.to_bigint() <= b.to_bigint()
    };
    EvalOutcome::value(Value::int(result as i32))
}

// --- list/string/symbol helpers ---------------------------------------------

fn bi_not(_interp: &mut dyn Interp, _callable: Value, _env: Value, args: &[Value]) -> EvalOutcome {
    let truthy = args.first().is_some_and(|v| v.is_truthy());
    EvalOutcome::value(Value::int((!truthy) as i32))
}

fn bi_cons(interp: &mut dyn Interp, _callable: Value, _env: Value, args: &[Value]) -> EvalOutcome {
    if args.len() != 2 {
        return wrong_args(interp);
    }
    let items = match expect_list(args[1]) {
        Some(i) => i,
        None => return generic_fail(interp, "cons: second argument must be a list"),
    };
    let mut out = Vec::with_capacity(items.len() + 1);
    out.push(args[0]);
    out.extend_from_slice(items);
    EvalOutcome::value(interp.alloc_list(out))
}

fn bi_car(interp: &mut dyn Interp, _callable: Value, _env: Value, args: &[Value]) -> EvalOutcome {
    if args.len() != 1 {
        return wrong_args(interp);
    }
    let items = match expect_list(args[0]) {
        Some(i) => i,
        None => return generic_fail(interp, "car: argument must be a list"),
    };
    match items.first() {
        Some(v) => EvalOutcome::value(*v),
        None => EvalOutcome::value(interp.alloc_error(ErrorCode::EmptyList, "car of empty list")),
    }
}

fn bi_cdr(interp: &mut dyn Interp, _callable: Value, _env: Value, args: &[Value]) -> EvalOutcome {
    if args.len() != 1 {
        return wrong_args(interp);
    }
    let items = match expect_list(args[0]) {
        Some(i) => i,
        None => return generic_fail(interp, "cdr: argument must be a list"),
    };
    if items.is_empty() {
        return EvalOutcome::value(interp.alloc_error(ErrorCode::EmptyList, "cdr of empty list"));
    }
    EvalOutcome::value(interp.alloc_list(items[1..].to_vec()))
}

fn bi_length(interp: &mut dyn Interp, _callable: Value, _env: Value, args: &[Value]) -> EvalOutcome {
    if args.len() != 1 {
        return wrong_args(interp);
    }
    match expect_list(args[0]) {
        Some(i) => EvalOutcome::value(Value::int(i.len() as i32)),
        None => generic_fail(interp, "length: argument must be a list"),
    }
}

fn bi_symbol_to_string(interp: &mut dyn Interp, _callable: Value, _env: Value, args: &[Value]) -> EvalOutcome {
    if args.len() != 1 {
        return wrong_args(interp);
    }
    if args[0].obj_type() != Some(ObjType::Symbol) {
        return generic_fail(interp, "symbol->string: argument must be a symbol");
    }
    let name = args[0].obj().as_symbol().name.clone();
    EvalOutcome::value(interp.alloc_string(&name))
}

fn bi_string_to_symbol(interp: &mut dyn Interp, _callable: Value, _env: Value, args: &[Value]) -> EvalOutcome {
    if args.len() != 1 {
        return wrong_args(interp);
    }
    if args[0].obj_type() != Some(ObjType::Str) {
        return generic_fail(interp, "string->symbol: argument must be a string");
    }
    let s = args[0].obj().as_str().bytes.clone();
    EvalOutcome::value(interp.alloc_symbol(&s))
}

fn bi_apply(interp: &mut dyn Interp, _callable: Value, env: Value, args: &[Value]) -> EvalOutcome {
    if args.len() != 2 {
        return wrong_args(interp);
    }
    if args[0].obj_type() != Some(ObjType::Callable) {
        return EvalOutcome::value(interp.alloc_error(ErrorCode::NotACombiner, "apply: first argument is not a combiner"));
    }
    let items = match expect_list(args[1]) {
        Some(i) => i.to_vec(),
        None => return generic_fail(interp, "apply: second argument must be a list"),
    };
    EvalOutcome::value(interp.invoke(args[0], env, &items))
}

// --- Printing ----------------------------------------------------------------

/// Render `v` per the `print` rules: `Double` decimal, `Int` decimal,
/// `Null` -> `null`, `Opaque<n>`, `:symbol`, strings verbatim, lists as
/// `(e1 e2 …)`, callables as `Ap<name>`/`Op<name>`, environments as
/// `Env<addr>`, errors as `Err<code,msg>`.
pub fn format_value(v: Value) -> String {
    match v.kind() {
        ValueKind::Double => format!("{}", v.as_double()),
        ValueKind::Int => format!("{}", v.as_int()),
        ValueKind::Null => "null".to_string(),
        ValueKind::Opaque => format!("Opaque<{}>", v.as_opaque()),
        ValueKind::Obj(ObjType::Symbol) => format!(":{}", v.obj().as_symbol().name),
        ValueKind::Obj(ObjType::Str) => v.obj().as_str().bytes.to_string(),
        ValueKind::Obj(ObjType::BigInt) => v.obj().as_bigint().value.to_string(),
        ValueKind::Obj(ObjType::List) => {
            let parts: Vec<String> = v.obj().as_list().items.iter().map(|e| format_value(*e)).collect();
            format!("({})", parts.join(" "))
        }
        ValueKind::Obj(ObjType::Callable) => {
            let c = v.obj().as_callable();
            let tag = match c.kind {
                CallableKind::Applicative => "Ap",
                CallableKind::Operative => "Op",
            };
            format!("{}<{}>", tag, c.name.as_deref().unwrap_or("anonymous"))
        }
        ValueKind::Obj(ObjType::Environment) => format!("Env<{:x}>", v.addr()),
        ValueKind::Obj(ObjType::Error) => {
            let e = v.obj().as_error();
            format!("Err<{},{}>", e.code, e.message)
        }
    }
}

/// Bind every built-in combiner into `env`, which the caller is expected
/// to `seal()` afterwards.
pub fn install_builtins(gc: &mut Gc, env: Value) {
    let applicatives: &[(&str, ferro_core::object::BuiltinFn)] = &[
        ("eval", bi_eval),
        ("getenv", bi_getenv),
        ("print", bi_print),
        ("list", bi_list),
        ("bigint", bi_bigint),
        ("equal?", bi_equal),
        ("mapreduce", bi_mapreduce),
        ("+", bi_add),
        ("-", bi_sub),
        ("*", bi_mul),
        ("/", bi_div),
        ("<=", bi_le),
        ("not", bi_not),
        ("cons", bi_cons),
        ("car", bi_car),
        ("cdr", bi_cdr),
        ("length", bi_length),
        ("symbol->string", bi_symbol_to_string),
        ("string->symbol", bi_string_to_symbol),
        ("apply", bi_apply),
    ];
    for (name, func) in applicatives {
        env::bind_applicative(gc, env, name, *func).expect("builtins env: duplicate applicative name");
    }

    let operatives: &[(&str, ferro_core::object::BuiltinFn)] = &[
        ("$define", bi_define),
        ("$lambda", bi_lambda),
        ("$if", bi_if),
        ("$quote", bi_quote),
        ("$cond", bi_cond),
        ("$module", bi_module),
        ("$import", bi_import),
        ("$let", bi_let),
        ("begin", bi_begin),
    ];
    for (name, func) in operatives {
        env::bind_operative(gc, env, name, *func, None).expect("builtins env: duplicate operative name");
    }

    env::bind(env, "null", Value::NULL).expect("builtins env: duplicate 'null' binding");
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferro_core::Gc;

    #[test]
    fn format_int_and_null() {
        assert_eq!(format_value(Value::int(42)), "42");
        assert_eq!(format_value(Value::NULL), "null");
    }

    #[test]
    fn format_list() {
        let mut gc = Gc::new();
        let list = gc.alloc_list(vec![Value::int(1), Value::int(2)]);
        assert_eq!(format_value(list), "(1 2)");
    }

    #[test]
    fn structural_equal_lists() {
        let mut gc = Gc::new();
        let a = gc.alloc_list(vec![Value::int(1), Value::int(2)]);
        let b = gc.alloc_list(vec![Value::int(1), Value::int(2)]);
        assert!(structural_equal(a, b));
    }

    #[test]
    fn structural_equal_symbols_by_content() {
        let mut gc = Gc::new();
        let a = gc.alloc_symbol("foo");
        let b = gc.alloc_symbol("foo");
        assert!(structural_equal(a, b));
    }
}
