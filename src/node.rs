//! Compiled node tree
//!
//! The tree arrives fully resolved: locals and captures are addressed by
//! static index, globals by a name bound once at link time, and every node
//! carries its type. `NodeBuilder` is the construction boundary and rejects
//! ill-typed control constructs before anything runs.

use std::cell::{Cell, OnceCell};
use std::rc::Rc;

use crate::error::{ErrorKind, Result, RuntimeError, Span};
use crate::interpreter::SignalKind;
use crate::types::Type;
use crate::value::{Runtime, Value};

/// Opaque debug identity of a node
pub type NodeId = u32;

/// A function literal
#[derive(Debug)]
pub struct FunctionDef {
    pub name: Option<String>,
    pub params: Vec<String>,
    /// Lvalues evaluated as references in the enclosing frame
    pub captures: Vec<Rc<Node>>,
    pub body: Rc<Node>,
    pub generator: bool,
}

#[derive(Debug)]
pub enum NodeKind {
    /// Scalar literal, interned at build time
    Literal(Value),
    Local(usize),
    Capture(usize),
    /// Global namespace entry, bound by `Interpreter::link`
    Global { name: String, resolved: OnceCell<Value> },
    Property { object: Rc<Node>, name: Rc<str> },
    Call { callee: Rc<Node>, args: Vec<Rc<Node>> },
    Invoke { object: Rc<Node>, name: Rc<str>, args: Vec<Rc<Node>> },
    Set { target: Rc<Node>, value: Rc<Node> },
    Object(Vec<(Rc<str>, Rc<Node>)>),
    List(Vec<Rc<Node>>),
    Map(Vec<(Rc<Node>, Rc<Node>)>),
    Let { inits: Vec<Rc<Node>>, body: Rc<Node> },
    Sequence(Vec<Rc<Node>>),
    If { cond: Rc<Node>, then: Rc<Node>, otherwise: Option<Rc<Node>> },
    And(Rc<Node>, Rc<Node>),
    Or(Rc<Node>, Rc<Node>),
    Loop(Rc<Node>),
    /// break / continue / return / yield
    Signal { kind: SignalKind, value: Option<Rc<Node>> },
    Function(Rc<FunctionDef>),
    Launch(Rc<Node>),
    Await(Rc<Node>),
}

#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub ty: Type,
    pub span: Span,
    pub id: NodeId,
}

impl Node {
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Local(_) | NodeKind::Capture(_) | NodeKind::Property { .. }
        )
    }

    /// Direct children, function bodies and capture lists included.
    pub fn children(&self) -> Vec<&Rc<Node>> {
        match &self.kind {
            NodeKind::Literal(_) | NodeKind::Local(_) | NodeKind::Capture(_) | NodeKind::Global { .. } => Vec::new(),
            NodeKind::Property { object, .. } => vec![object],
            NodeKind::Call { callee, args } => std::iter::once(callee).chain(args).collect(),
            NodeKind::Invoke { object, args, .. } => std::iter::once(object).chain(args).collect(),
            NodeKind::Set { target, value } => vec![target, value],
            NodeKind::Object(fields) => fields.iter().map(|(_, n)| n).collect(),
            NodeKind::List(items) | NodeKind::Sequence(items) => items.iter().collect(),
            NodeKind::Map(entries) => entries.iter().flat_map(|(k, v)| [k, v]).collect(),
            NodeKind::Let { inits, body } => inits.iter().chain(std::iter::once(body)).collect(),
            NodeKind::If { cond, then, otherwise } => {
                let mut children = vec![cond, then];
                children.extend(otherwise);
                children
            }
            NodeKind::And(l, r) | NodeKind::Or(l, r) => vec![l, r],
            NodeKind::Loop(body) | NodeKind::Launch(body) | NodeKind::Await(body) => vec![body],
            NodeKind::Signal { value, .. } => value.iter().collect(),
            NodeKind::Function(def) => def.captures.iter().chain(std::iter::once(&def.body)).collect(),
        }
    }
}

/// Parameters of a function literal under construction
pub struct FunctionSpec {
    pub name: Option<String>,
    pub params: Vec<(String, Type)>,
    pub captures: Vec<Rc<Node>>,
    pub body: Rc<Node>,
    pub generator: bool,
}

impl FunctionSpec {
    pub fn new(params: Vec<(String, Type)>, captures: Vec<Rc<Node>>, body: Rc<Node>) -> Self {
        Self {
            name: None,
            params,
            captures,
            body,
            generator: false,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn generator(mut self) -> Self {
        self.generator = true;
        self
    }
}

/// Typed constructor for node trees
pub struct NodeBuilder<'rt> {
    rt: &'rt Runtime,
    next_id: Cell<NodeId>,
    span: Cell<Span>,
}

impl<'rt> NodeBuilder<'rt> {
    pub fn new(rt: &'rt Runtime) -> Self {
        Self {
            rt,
            next_id: Cell::new(0),
            span: Cell::new(Span::default()),
        }
    }

    /// Attach `span` to nodes built from here on.
    pub fn at(&self, span: Span) -> &Self {
        self.span.set(span);
        self
    }

    pub fn runtime(&self) -> &'rt Runtime {
        self.rt
    }

    fn node(&self, kind: NodeKind, ty: Type) -> Rc<Node> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Rc::new(Node {
            kind,
            ty,
            span: self.span.get(),
            id,
        })
    }

    fn reject(&self, construct: &'static str, expected: &str, found: &str) -> RuntimeError {
        RuntimeError::at(
            ErrorKind::ConstructionTypeError {
                construct,
                expected: expected.to_string(),
                found: found.to_string(),
            },
            self.span.get(),
        )
    }

    fn require_boolean(&self, construct: &'static str, node: &Node) -> Result<()> {
        if self.rt.types.is_boolean(&node.ty) {
            Ok(())
        } else {
            Err(self.reject(construct, "boolean", node.ty.name()))
        }
    }

    fn require_lvalue(&self, construct: &'static str, node: &Node) -> Result<()> {
        if node.is_lvalue() {
            Ok(())
        } else {
            Err(self.reject(construct, "an lvalue", node.ty.name()))
        }
    }

    pub fn number(&self, n: f64) -> Rc<Node> {
        self.node(NodeKind::Literal(self.rt.number(n)), self.rt.types.number.clone())
    }

    pub fn string(&self, s: &str) -> Rc<Node> {
        self.node(NodeKind::Literal(self.rt.string(s)), self.rt.types.string.clone())
    }

    pub fn boolean(&self, b: bool) -> Rc<Node> {
        self.node(NodeKind::Literal(self.rt.boolean(b)), self.rt.types.boolean.clone())
    }

    pub fn null(&self) -> Rc<Node> {
        self.node(NodeKind::Literal(self.rt.null()), self.rt.types.null.clone())
    }

    pub fn local(&self, index: usize, ty: &Type) -> Rc<Node> {
        self.node(NodeKind::Local(index), ty.clone())
    }

    pub fn capture(&self, index: usize, ty: &Type) -> Rc<Node> {
        self.node(NodeKind::Capture(index), ty.clone())
    }

    pub fn global(&self, name: &str, ty: &Type) -> Rc<Node> {
        let kind = NodeKind::Global {
            name: name.to_string(),
            resolved: OnceCell::new(),
        };
        self.node(kind, ty.clone())
    }

    pub fn property(&self, object: Rc<Node>, name: &str) -> Rc<Node> {
        let ty = self.property_type(&object.ty, name);
        self.node(NodeKind::Property { object, name: Rc::from(name) }, ty)
    }

    fn property_type(&self, ty: &Type, name: &str) -> Type {
        ty.property(name)
            .map(|p| p.ty.clone())
            .unwrap_or_else(|| self.rt.types.any.clone())
    }

    fn return_type(&self, callee: &Type) -> Type {
        callee.ret().cloned().unwrap_or_else(|| self.rt.types.any.clone())
    }

    pub fn call(&self, callee: Rc<Node>, args: Vec<Rc<Node>>) -> Rc<Node> {
        let ty = self.return_type(&callee.ty);
        self.node(NodeKind::Call { callee, args }, ty)
    }

    pub fn invoke(&self, object: Rc<Node>, name: &str, args: Vec<Rc<Node>>) -> Rc<Node> {
        let ty = self.return_type(&self.property_type(&object.ty, name));
        self.node(NodeKind::Invoke { object, name: Rc::from(name), args }, ty)
    }

    pub fn set(&self, target: Rc<Node>, value: Rc<Node>) -> Result<Rc<Node>> {
        self.require_lvalue("set", &target)?;
        if let Some(prop) = self.property_slot(&target) {
            if !prop {
                return Err(self.reject("set", "a mutable property", target.ty.name()));
            }
        }
        let ty = value.ty.clone();
        Ok(self.node(NodeKind::Set { target, value }, ty))
    }

    /// Mutability of a property target, when its object type declares it.
    fn property_slot(&self, target: &Node) -> Option<bool> {
        match &target.kind {
            NodeKind::Property { object, name } => object.ty.property(name).map(|p| p.mutable),
            _ => None,
        }
    }

    pub fn object(&self, fields: Vec<(&str, Rc<Node>)>) -> Rc<Node> {
        let fields = fields.into_iter().map(|(k, v)| (Rc::from(k), v)).collect();
        self.node(NodeKind::Object(fields), self.rt.types.object.clone())
    }

    pub fn list(&self, items: Vec<Rc<Node>>) -> Rc<Node> {
        self.node(NodeKind::List(items), self.rt.types.list.clone())
    }

    pub fn map(&self, entries: Vec<(Rc<Node>, Rc<Node>)>) -> Rc<Node> {
        self.node(NodeKind::Map(entries), self.rt.types.map.clone())
    }

    /// Bind `inits.len()` new locals, then evaluate `body`.
    pub fn let_(&self, inits: Vec<Rc<Node>>, body: Rc<Node>) -> Rc<Node> {
        let ty = body.ty.clone();
        self.node(NodeKind::Let { inits, body }, ty)
    }

    pub fn sequence(&self, children: Vec<Rc<Node>>) -> Result<Rc<Node>> {
        let ty = match children.last() {
            Some(last) => last.ty.clone(),
            None => return Err(self.reject("sequence", "at least one expression", "none")),
        };
        Ok(self.node(NodeKind::Sequence(children), ty))
    }

    pub fn if_(&self, cond: Rc<Node>, then: Rc<Node>, otherwise: Option<Rc<Node>>) -> Result<Rc<Node>> {
        self.require_boolean("if", &cond)?;
        let ty = match &otherwise {
            Some(other) if other.ty == then.ty => then.ty.clone(),
            _ => self.rt.types.any.clone(),
        };
        Ok(self.node(NodeKind::If { cond, then, otherwise }, ty))
    }

    pub fn and(&self, left: Rc<Node>, right: Rc<Node>) -> Result<Rc<Node>> {
        self.require_boolean("and", &left)?;
        self.require_boolean("and", &right)?;
        Ok(self.node(NodeKind::And(left, right), self.rt.types.boolean.clone()))
    }

    pub fn or(&self, left: Rc<Node>, right: Rc<Node>) -> Result<Rc<Node>> {
        self.require_boolean("or", &left)?;
        self.require_boolean("or", &right)?;
        Ok(self.node(NodeKind::Or(left, right), self.rt.types.boolean.clone()))
    }

    pub fn loop_(&self, body: Rc<Node>) -> Rc<Node> {
        self.node(NodeKind::Loop(body), self.rt.types.any.clone())
    }

    fn signal(&self, kind: SignalKind, value: Option<Rc<Node>>) -> Rc<Node> {
        self.node(NodeKind::Signal { kind, value }, self.rt.types.any.clone())
    }

    pub fn break_(&self, value: Option<Rc<Node>>) -> Rc<Node> {
        self.signal(SignalKind::Break, value)
    }

    pub fn continue_(&self) -> Rc<Node> {
        self.signal(SignalKind::Continue, None)
    }

    pub fn return_(&self, value: Option<Rc<Node>>) -> Rc<Node> {
        self.signal(SignalKind::Return, value)
    }

    pub fn yield_(&self, value: Option<Rc<Node>>) -> Rc<Node> {
        self.signal(SignalKind::Yield, value)
    }

    pub fn function(&self, spec: FunctionSpec) -> Result<Rc<Node>> {
        for capture in &spec.captures {
            self.require_lvalue("capture", capture)?;
        }

        let param_types: Vec<Type> = spec.params.iter().map(|(_, ty)| ty.clone()).collect();
        let ret = if spec.generator {
            self.rt.types.callable(&[], &self.rt.types.any)
        } else {
            spec.body.ty.clone()
        };
        let ty = self.rt.types.callable(&param_types, &ret);

        let def = FunctionDef {
            name: spec.name,
            params: spec.params.into_iter().map(|(name, _)| name).collect(),
            captures: spec.captures,
            body: spec.body,
            generator: spec.generator,
        };
        Ok(self.node(NodeKind::Function(Rc::new(def)), ty))
    }

    pub fn launch(&self, body: Rc<Node>) -> Rc<Node> {
        let ty = self.rt.types.task_of(&body.ty);
        self.node(NodeKind::Launch(body), ty)
    }

    pub fn await_(&self, task: Rc<Node>) -> Rc<Node> {
        let ty = self.rt.types.awaited(&task.ty);
        self.node(NodeKind::Await(task), ty)
    }
}
