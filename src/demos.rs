//! Sample programs for the demo runner, built directly as node trees

use std::rc::Rc;

use ember::{FunctionSpec, Node, NodeBuilder, Result, Type};

pub struct Demo {
    pub name: &'static str,
    pub about: &'static str,
    pub build: fn(&NodeBuilder<'_>) -> Result<Rc<Node>>,
}

pub const DEMOS: &[Demo] = &[
    Demo { name: "counter", about: "closure mutating a captured local until a loop breaks", build: counter },
    Demo { name: "iterators", about: "summing a list through its lazy iterator", build: iterators },
    Demo { name: "tasks", about: "launch/await ordering around a sleeping task", build: tasks },
    Demo { name: "generator", about: "collecting the values a generator yields", build: generator },
    Demo { name: "json", about: "round-tripping a document through the host bridge", build: json },
];

pub fn find(name: &str) -> Option<&'static Demo> {
    DEMOS.iter().find(|demo| demo.name == name)
}

/// A two-argument intrinsic call returning `ret`.
fn op(b: &NodeBuilder<'_>, name: &str, left: Rc<Node>, right: Rc<Node>, ret: &Type) -> Rc<Node> {
    let types = &b.runtime().types;
    let ty = types.callable(&[types.any.clone(), types.any.clone()], ret);
    b.call(b.global(name, &ty), vec![left, right])
}

// let count = 0, bump = fn() { count = count + 1 } in
//   loop { bump(); if count >= 5 { break count } }
fn counter(b: &NodeBuilder<'_>) -> Result<Rc<Node>> {
    let types = &b.runtime().types;
    let number = &types.number;

    let bump_body = b.set(b.capture(0, number), op(b, "add", b.capture(0, number), b.number(1.0), number))?;
    let bump = b.function(FunctionSpec::new(Vec::new(), vec![b.local(0, number)], bump_body).named("bump"))?;
    let bump_ty = bump.ty.clone();

    let step = b.sequence(vec![
        b.call(b.local(1, &bump_ty), Vec::new()),
        b.if_(
            op(b, "ge", b.local(0, number), b.number(5.0), &types.boolean),
            b.break_(Some(b.local(0, number))),
            None,
        )?,
    ])?;
    Ok(b.let_(vec![b.number(0.0), bump], b.loop_(step)))
}

// let xs = [1, 2, 3, 4], next = xs.iter(), total = 0 in
//   loop { let item = next() in if item == null { break total } else { total = total + item } }
fn iterators(b: &NodeBuilder<'_>) -> Result<Rc<Node>> {
    let types = &b.runtime().types;
    let any = &types.any;
    let number = &types.number;

    let xs = b.list((1..=4).map(|n| b.number(n as f64)).collect());
    let next = b.invoke(b.local(0, &types.list), "iter", Vec::new());
    let next_ty = types.callable(&[], any);

    let item = b.call(b.local(1, &next_ty), Vec::new());
    let step = b.if_(
        op(b, "eq", b.local(3, any), b.null(), &types.boolean),
        b.break_(Some(b.local(2, number))),
        Some(b.set(b.local(2, number), op(b, "add", b.local(2, number), b.local(3, any), number))?),
    )?;
    Ok(b.let_(vec![xs, next, b.number(0.0)], b.loop_(b.let_(vec![item], step))))
}

// let log = [] in
//   let task = launch { sleep(20); log.push("A") } in
//     log.push("B"); await task; log
fn tasks(b: &NodeBuilder<'_>) -> Result<Rc<Node>> {
    let types = &b.runtime().types;
    let list = &types.list;
    let sleep_ty = types.callable(&[types.number.clone()], &types.null);

    let work = b.sequence(vec![
        b.call(b.global("sleep", &sleep_ty), vec![b.number(20.0)]),
        b.invoke(b.local(0, list), "push", vec![b.string("A")]),
    ])?;
    let task = b.launch(work);
    let task_ty = task.ty.clone();

    let body = b.sequence(vec![
        b.invoke(b.local(0, list), "push", vec![b.string("B")]),
        b.await_(b.local(1, &task_ty)),
        b.local(0, list),
    ])?;
    Ok(b.let_(vec![b.list(Vec::new())], b.let_(vec![task], body)))
}

// let numbers = gen() { yield 1; yield 2; yield 3 }, next = numbers(), out = [] in
//   loop { let v = next() in if v == null { break out } else { out.push(v) } }
fn generator(b: &NodeBuilder<'_>) -> Result<Rc<Node>> {
    let types = &b.runtime().types;
    let any = &types.any;

    let body = b.sequence((1..=3).map(|n| b.yield_(Some(b.number(n as f64)))).collect())?;
    let numbers = b.function(FunctionSpec::new(Vec::new(), Vec::new(), body).named("numbers").generator())?;
    let numbers_ty = numbers.ty.clone();
    let next_ty = types.callable(&[], any);

    let step = b.if_(
        op(b, "eq", b.local(3, any), b.null(), &types.boolean),
        b.break_(Some(b.local(2, &types.list))),
        Some(b.invoke(b.local(2, &types.list), "push", vec![b.local(3, any)])),
    )?;
    let pull = b.let_(vec![b.call(b.local(1, &next_ty), Vec::new())], step);
    Ok(b.let_(
        vec![numbers, b.call(b.local(0, &numbers_ty), Vec::new()), b.list(Vec::new())],
        b.loop_(pull),
    ))
}

// json.stringify(json.parse("{\"name\":\"ember\",\"tags\":[1,2]}"))
fn json(b: &NodeBuilder<'_>) -> Result<Rc<Node>> {
    let object = &b.runtime().types.object;
    let parsed = b.invoke(
        b.global("json", object),
        "parse",
        vec![b.string(r#"{"name":"ember","tags":[1,2]}"#)],
    );
    Ok(b.invoke(b.global("json", object), "stringify", vec![parsed]))
}
