#![allow(dead_code)]

use std::rc::Rc;

use ember::{Node, NodeBuilder, Type};

/// Call a two-argument global returning `ret`.
pub fn op(b: &NodeBuilder<'_>, name: &str, left: Rc<Node>, right: Rc<Node>, ret: &Type) -> Rc<Node> {
    let types = &b.runtime().types;
    let ty = types.callable(&[types.any.clone(), types.any.clone()], ret);
    b.call(b.global(name, &ty), vec![left, right])
}

/// Call a global with the given arguments, typed as returning `ret`.
pub fn call_global(b: &NodeBuilder<'_>, name: &str, args: Vec<Rc<Node>>, ret: &Type) -> Rc<Node> {
    let types = &b.runtime().types;
    let params = vec![types.any.clone(); args.len()];
    let ty = types.callable(&params, ret);
    b.call(b.global(name, &ty), args)
}

pub fn eq(b: &NodeBuilder<'_>, left: Rc<Node>, right: Rc<Node>) -> Rc<Node> {
    op(b, "eq", left, right, &b.runtime().types.boolean)
}

pub fn add(b: &NodeBuilder<'_>, left: Rc<Node>, right: Rc<Node>) -> Rc<Node> {
    op(b, "add", left, right, &b.runtime().types.number)
}
