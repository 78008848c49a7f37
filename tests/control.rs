mod common;

use pretty_assertions::assert_eq;

use ember::{run, ErrorKind, FunctionSpec, Interpreter, Span};

use common::{add, call_global, eq, op};

#[test]
fn test_loop_break_value() {
    // loop { break 42 }
    let result = run(|b| Ok(b.loop_(b.break_(Some(b.number(42.0)))))).expect("Execution failed");
    assert_eq!(result.to_string(), "42");
}

#[test]
fn test_loop_counts_up_to_break() {
    // let i = 0 in loop { i = i + 1; if i == 42 { break i } }
    let result = run(|b| {
        let number = &b.runtime().types.number;
        let step = b.sequence(vec![
            b.set(b.local(0, number), add(b, b.local(0, number), b.number(1.0)))?,
            b.if_(eq(b, b.local(0, number), b.number(42.0)), b.break_(Some(b.local(0, number))), None)?,
        ])?;
        Ok(b.let_(vec![b.number(0.0)], b.loop_(step)))
    })
    .expect("Execution failed");
    assert_eq!(result.to_string(), "42");
}

#[test]
fn test_continue_skips_rest_of_body() {
    // let i = 0, total = 0 in loop {
    //   i = i + 1;
    //   if i > 10 { break total };
    //   if i % 2 == 0 { continue };
    //   total = total + i
    // }
    let result = run(|b| {
        let types = &b.runtime().types;
        let number = &types.number;
        let i = || b.local(0, number);
        let total = || b.local(1, number);
        let even = eq(b, op(b, "mod", i(), b.number(2.0), number), b.number(0.0));
        let step = b.sequence(vec![
            b.set(i(), add(b, i(), b.number(1.0)))?,
            b.if_(op(b, "gt", i(), b.number(10.0), &types.boolean), b.break_(Some(total())), None)?,
            b.if_(even, b.continue_(), None)?,
            b.set(total(), add(b, total(), i()))?,
        ])?;
        Ok(b.let_(vec![b.number(0.0), b.number(0.0)], b.loop_(step)))
    })
    .expect("Execution failed");
    assert_eq!(result.to_string(), "25");
}

#[test]
fn test_let_inside_loop_reuses_its_slot() {
    // let total = 0 in loop { let x = total + 1 in if x > 3 { break total } else { total = x } }
    let result = run(|b| {
        let types = &b.runtime().types;
        let number = &types.number;
        let step = b.if_(
            op(b, "gt", b.local(1, number), b.number(3.0), &types.boolean),
            b.break_(Some(b.local(0, number))),
            Some(b.set(b.local(0, number), b.local(1, number))?),
        )?;
        let body = b.let_(vec![add(b, b.local(0, number), b.number(1.0))], step);
        Ok(b.let_(vec![b.number(0.0)], b.loop_(body)))
    })
    .expect("Execution failed");
    assert_eq!(result.to_string(), "3");
}

#[test]
fn test_if_without_else_is_null() {
    let result = run(|b| b.if_(b.boolean(false), b.number(1.0), None)).expect("Execution failed");
    assert!(result.is_null(), "expected null, got {:?}", result);
}

#[test]
fn test_and_or_short_circuit() {
    let interp = Interpreter::new();
    interp.register_native("boom", Some(0), |_, _| Err("should not run".to_string()));
    let b = interp.builder();
    let boolean = &b.runtime().types.boolean;

    let or = b
        .or(b.boolean(true), call_global(&b, "boom", Vec::new(), boolean))
        .expect("or");
    assert!(interp.run_blocking(&or).map(|v| v.is_truthy()).unwrap_or(false));

    let and = b
        .and(b.boolean(false), call_global(&b, "boom", Vec::new(), boolean))
        .expect("and");
    assert!(interp.run_blocking(&and).map(|v| !v.is_truthy()).unwrap_or(false));

    let evaluated = b
        .and(b.boolean(true), call_global(&b, "boom", Vec::new(), boolean))
        .expect("and");
    let err = interp.run_blocking(&evaluated).expect_err("boom runs");
    assert_eq!(err.kind, ErrorKind::Native("should not run".to_string()));
}

#[test]
fn test_assignment_guard_rejects_variant_change() {
    // let x = 1 in x = "s"
    let err = run(|b| {
        let number = &b.runtime().types.number;
        Ok(b.let_(vec![b.number(1.0)], b.set(b.local(0, number), b.string("s"))?))
    })
    .expect_err("variant change must fail");
    assert!(matches!(err.kind, ErrorKind::TypeMismatchOnAssignment { .. }));
    assert!(err.to_string().contains("Assignment to different type"));
}

#[test]
fn test_assignment_guard_allows_null_first() {
    // let x = null in x = 1; x = 2; x
    let result = run(|b| {
        let any = &b.runtime().types.any;
        let body = b.sequence(vec![
            b.set(b.local(0, any), b.number(1.0))?,
            b.set(b.local(0, any), b.number(2.0))?,
            b.local(0, any),
        ])?;
        Ok(b.let_(vec![b.null()], body))
    })
    .expect("Execution failed");
    assert_eq!(result.to_string(), "2");
}

#[test]
fn test_assignment_guard_applies_to_properties() {
    // let o = {a: 1} in o.b = "new"; o.a = "s"
    let err = run(|b| {
        let object = &b.runtime().types.object;
        let body = b.sequence(vec![
            b.set(b.property(b.local(0, object), "b"), b.string("new"))?,
            b.set(b.property(b.local(0, object), "a"), b.string("s"))?,
        ])?;
        Ok(b.let_(vec![b.object(vec![("a", b.number(1.0))])], body))
    })
    .expect_err("variant change must fail");
    assert!(matches!(err.kind, ErrorKind::TypeMismatchOnAssignment { .. }));
}

#[test]
fn test_break_outside_loop_is_fatal() {
    let err = run(|b| Ok(b.break_(None))).expect_err("break escapes");
    assert_eq!(err.kind, ErrorKind::UncaughtSignal("break"));
    assert!(err.kind.is_fatal());
}

#[test]
fn test_signal_cannot_cross_call_boundary() {
    // let f = fn() { continue } in loop { f() }
    let err = run(|b| {
        let f = b.function(FunctionSpec::new(Vec::new(), Vec::new(), b.continue_()))?;
        let f_ty = f.ty.clone();
        Ok(b.let_(vec![f], b.loop_(b.call(b.local(0, &f_ty), Vec::new()))))
    })
    .expect_err("continue escapes");
    assert_eq!(err.kind, ErrorKind::UncaughtSignal("continue"));
}

#[test]
fn test_call_depth_is_limited() {
    // let f = fn() { f() } in f()
    let interp = Interpreter::new().with_max_depth(16);
    let b = interp.builder();
    let types = &b.runtime().types;
    let f_ty = types.callable(&[], &types.any);
    let f = b
        .function(FunctionSpec::new(Vec::new(), vec![b.local(0, &f_ty)], b.call(b.capture(0, &f_ty), Vec::new())))
        .expect("function");
    let tree = b.let_(vec![f], b.call(b.local(0, &f_ty), Vec::new()));

    let err = interp.run_blocking(&tree).expect_err("recursion is unbounded");
    assert_eq!(err.kind, ErrorKind::StackOverflow(16));
    assert_eq!(interp.live_frames(), 0);
}

#[test]
fn test_errors_carry_node_span() {
    let err = run(|b| {
        let callee = b.at(Span::new(10, 11, 3, 7)).number(1.0);
        Ok(b.call(callee, Vec::new()))
    })
    .expect_err("numbers are not callable");
    assert_eq!(err.kind, ErrorKind::InvalidCall("number".to_string()));
    assert_eq!(err.span.map(|s| (s.line, s.column)), Some((3, 7)));
}

#[test]
fn test_construction_rejects_non_boolean_condition() {
    let err = run(|b| b.if_(b.number(1.0), b.null(), None)).expect_err("non-boolean condition");
    assert!(matches!(err.kind, ErrorKind::ConstructionTypeError { construct: "if", .. }));
}

/// let f = fn(n) { if n == 0 { 0 } else { f(n - 1) } } in f(depth)
fn countdown(interp: &Interpreter, depth: f64) -> ember::Result<ember::Value> {
    let b = interp.builder();
    let types = &b.runtime().types;
    let number = &types.number;
    let f_ty = types.callable(&[number.clone()], number);
    let n = || b.local(0, number);
    let recurse = b.call(b.capture(0, &f_ty), vec![op(&b, "sub", n(), b.number(1.0), number)]);
    let body = b.if_(eq(&b, n(), b.number(0.0)), b.number(0.0), Some(recurse))?;
    let params = vec![("n".to_string(), number.clone())];
    let f = b.function(FunctionSpec::new(params, vec![b.local(0, &f_ty)], body))?;
    let tree = b.let_(vec![f], b.call(b.local(0, &f_ty), vec![b.number(depth)]));
    interp.run_blocking(&tree)
}

#[test]
fn test_recursion_up_to_default_depth() {
    let interp = Interpreter::new();
    let result = countdown(&interp, 250.0).expect("Execution failed");
    assert_eq!(result.to_string(), "0");
    assert_eq!(interp.live_frames(), 0);
}

#[test]
fn test_recursion_past_default_depth_is_an_error() {
    let interp = Interpreter::new();
    let err = countdown(&interp, 400.0).expect_err("recursion is too deep");
    assert_eq!(err.kind, ErrorKind::StackOverflow(256));
    assert_eq!(interp.live_frames(), 0);
}
