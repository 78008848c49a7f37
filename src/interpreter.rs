//! Tree-walking evaluator for Ember
//!
//! Every evaluation step is a suspend-capable future so that `await` composes
//! through nested calls. Non-local exits travel upward as `Flow::Signal`
//! values; runtime errors travel as `Err`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, Mutex, OnceCell};
use tokio::task::{JoinHandle, LocalSet};
use tracing::{debug, trace, warn};

use crate::builtins;
use crate::error::{ErrorKind, Result, RuntimeError, Span};
use crate::frame::{Frame, FrameArena, FrameId};
use crate::node::{FunctionDef, Node, NodeBuilder, NodeKind};
use crate::reference::{PropertyRef, Reference, ValueRef};
use crate::stack::StackSafe;
use crate::types::Type;
use crate::value::{Callable, CallableValue, Closure, Runtime, Value};

/// Default maximum call depth
const FRAMES_MAX: usize = 256;

/// Kind of a non-local control transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Break,
    Continue,
    Return,
    Yield,
}

impl SignalKind {
    pub fn name(self) -> &'static str {
        match self {
            SignalKind::Break => "break",
            SignalKind::Continue => "continue",
            SignalKind::Return => "return",
            SignalKind::Yield => "yield",
        }
    }
}

/// Outcome of one evaluation step
#[derive(Debug, Clone)]
pub enum Flow<T> {
    Normal(T),
    Signal(SignalKind, Value),
}

pub type Completion = Flow<Value>;

/// Unwrap a `Flow::Normal`, or return the signal to the caller.
macro_rules! normal {
    ($flow:expr) => {
        match $flow {
            Flow::Normal(value) => value,
            Flow::Signal(kind, value) => return Ok(Flow::Signal(kind, value)),
        }
    };
}

/// Pending result of a launched unit of work
pub struct TaskHandle {
    pub id: u64,
    pub ty: Type,
    join: RefCell<Option<JoinHandle<Result<Value>>>>,
    outcome: OnceCell<Result<Value>>,
}

impl TaskHandle {
    /// Wait for the task. Later calls return the cached outcome.
    pub async fn join(&self) -> Result<Value> {
        self.outcome
            .get_or_init(|| async {
                let handle = self.join.borrow_mut().take();
                match handle {
                    Some(handle) => handle.await.unwrap_or_else(|e| {
                        Err(RuntimeError::new(ErrorKind::TaskFailed(e.to_string()), None))
                    }),
                    None => Err(RuntimeError::new(
                        ErrorKind::TaskFailed(format!("task {} has no join handle", self.id)),
                        None,
                    )),
                }
            })
            .await
            .clone()
    }
}

/// Generator side of a generator/consumer pair, stored in the generator's frame
pub struct GeneratorPort {
    yields: mpsc::Sender<Value>,
    resumes: Mutex<mpsc::Receiver<()>>,
}

impl GeneratorPort {
    /// Hand `value` to the consumer and wait to be resumed.
    /// Returns false once the consumer is gone.
    async fn suspend(&self, value: Value) -> bool {
        if self.yields.send(value).await.is_err() {
            return false;
        }
        self.resumes.lock().await.recv().await.is_some()
    }
}

/// Consumer side of a generator: a suspended frame resumed by each call
pub struct Generator {
    resumes: mpsc::Sender<()>,
    yields: Mutex<mpsc::Receiver<Value>>,
    task: RefCell<Option<JoinHandle<Result<()>>>>,
    done: Cell<bool>,
}

impl Generator {
    /// Run the body to its next yield. `None` once the body has completed.
    pub async fn resume(&self) -> Result<Option<Value>> {
        if self.done.get() {
            return Ok(None);
        }
        if self.resumes.send(()).await.is_err() {
            return self.finish().await;
        }
        let next = self.yields.lock().await.recv().await;
        match next {
            Some(value) => Ok(Some(value)),
            None => self.finish().await,
        }
    }

    async fn finish(&self) -> Result<Option<Value>> {
        self.done.set(true);
        let task = self.task.borrow_mut().take();
        if let Some(task) = task {
            task.await
                .map_err(|e| RuntimeError::new(ErrorKind::TaskFailed(e.to_string()), None))??;
        }
        Ok(None)
    }
}

/// Owns a frame and releases it when dropped, including when the task
/// polling it is cancelled.
struct FrameGuard {
    interp: Interpreter,
    id: FrameId,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if let Ok(mut frames) = self.interp.inner.frames.try_borrow_mut() {
            frames.release(self.id);
        }
    }
}

struct Shared {
    rt: Rc<Runtime>,
    globals: RefCell<FxHashMap<String, Value>>,
    frames: RefCell<FrameArena>,
    /// Launched tasks, joined before `run_blocking` returns
    launched: RefCell<Vec<Rc<TaskHandle>>>,
    max_depth: Cell<usize>,
    next_task: Cell<u64>,
}

/// The evaluator. Cloning shares the same runtime, globals and frames.
#[derive(Clone)]
pub struct Interpreter {
    inner: Rc<Shared>,
}

impl Interpreter {
    pub fn new() -> Self {
        let rt = Rc::new(Runtime::new());
        let mut globals = FxHashMap::default();
        builtins::install(&rt, &mut globals);

        Self {
            inner: Rc::new(Shared {
                rt,
                globals: RefCell::new(globals),
                frames: RefCell::new(FrameArena::new()),
                launched: RefCell::new(Vec::new()),
                max_depth: Cell::new(FRAMES_MAX),
                next_task: Cell::new(0),
            }),
        }
    }

    pub fn with_max_depth(self, depth: usize) -> Self {
        self.inner.max_depth.set(depth);
        self
    }

    pub fn runtime(&self) -> &Rc<Runtime> {
        &self.inner.rt
    }

    /// A node builder sharing this interpreter's types and intern table.
    pub fn builder(&self) -> NodeBuilder<'_> {
        NodeBuilder::new(&self.inner.rt)
    }

    /// Add or replace a global. Only affects trees linked afterwards.
    pub fn register_global(&self, name: &str, value: Value) {
        self.inner.globals.borrow_mut().insert(name.to_string(), value);
    }

    pub fn register_native(
        &self,
        name: &str,
        arity: Option<usize>,
        func: impl Fn(&Runtime, &[Value]) -> std::result::Result<Value, String> + 'static,
    ) {
        let native = self.inner.rt.native(name, arity, func);
        self.register_global(name, native);
    }

    pub fn register_async_native(
        &self,
        name: &str,
        arity: Option<usize>,
        func: impl Fn(Rc<Runtime>, Vec<Value>) -> LocalBoxFuture<'static, std::result::Result<Value, String>>
            + 'static,
    ) {
        let native = self.inner.rt.native_async(name, arity, func);
        self.register_global(name, native);
    }

    /// Number of frames currently alive in the arena.
    pub fn live_frames(&self) -> usize {
        self.inner.frames.borrow().live()
    }

    /// Bind every global reference in `tree` to its value.
    pub fn link(&self, tree: &Rc<Node>) -> Result<()> {
        let globals = self.inner.globals.borrow();
        let mut pending = vec![tree];
        let mut linked = 0usize;

        while let Some(node) = pending.pop() {
            if let NodeKind::Global { name, resolved } = &node.kind {
                if resolved.get().is_none() {
                    let value = globals.get(name).cloned().ok_or_else(|| {
                        RuntimeError::at(ErrorKind::UndefinedSymbol(name.clone()), node.span)
                    })?;
                    let _ = resolved.set(value);
                    linked += 1;
                }
            }
            pending.extend(node.children());
        }

        debug!(linked, "linked global references");
        Ok(())
    }

    /// Link and evaluate `tree` in a fresh root frame.
    ///
    /// Must be polled inside a tokio `LocalSet`; see `run_blocking`.
    pub async fn run(&self, tree: &Rc<Node>) -> Result<Value> {
        self.link(tree)?;

        let root = self.enter(Frame::new(Vec::new(), Vec::new()));
        let result = self.eval(tree, root.id).await;
        drop(root);

        match result? {
            Flow::Normal(value) => Ok(value),
            Flow::Signal(kind, _) => Err(RuntimeError::at(
                ErrorKind::UncaughtSignal(kind.name()),
                tree.span,
            )),
        }
    }

    /// Drive `run` on a current-thread scheduler, then let every launched
    /// task run to completion before returning.
    pub fn run_blocking(&self, tree: &Rc<Node>) -> Result<Value> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                RuntimeError::new(ErrorKind::Native(format!("scheduler init failed: {e}")), None)
            })?;
        let local = LocalSet::new();

        local.block_on(&runtime, async {
            let result = self.run(tree).await;
            loop {
                let launched: Vec<_> = self.inner.launched.borrow_mut().drain(..).collect();
                if launched.is_empty() {
                    break;
                }
                for task in launched {
                    let _ = task.join().await;
                }
            }
            result
        })
    }

    fn enter(&self, frame: Frame) -> FrameGuard {
        let id = self.inner.frames.borrow_mut().alloc(frame);
        FrameGuard { interp: self.clone(), id }
    }

    fn stale(id: FrameId) -> RuntimeError {
        RuntimeError::new(ErrorKind::StaleFrame(id.index()), None)
    }

    fn local(&self, frame: FrameId, index: usize, span: Span) -> Result<ValueRef> {
        let frames = self.inner.frames.borrow();
        let frame = frames.get(frame).ok_or_else(|| Self::stale(frame))?;
        frame.locals.get(index).cloned().ok_or_else(|| {
            RuntimeError::at(ErrorKind::InvalidSlot { kind: "local", index }, span)
        })
    }

    fn capture(&self, frame: FrameId, index: usize, span: Span) -> Result<Reference> {
        let frames = self.inner.frames.borrow();
        let frame = frames.get(frame).ok_or_else(|| Self::stale(frame))?;
        frame.captures.get(index).cloned().ok_or_else(|| {
            RuntimeError::at(ErrorKind::InvalidSlot { kind: "capture", index }, span)
        })
    }

    /// Evaluate `node` to a value in `frame`.
    pub fn eval<'a>(&'a self, node: &'a Rc<Node>, frame: FrameId) -> StackSafe<'a, Result<Completion>> {
        StackSafe::new(async move {
            let rt = &self.inner.rt;
            match &node.kind {
                NodeKind::Literal(value) => Ok(Flow::Normal(value.clone())),

                NodeKind::Local(index) => Ok(Flow::Normal(self.local(frame, *index, node.span)?.get())),

                NodeKind::Capture(index) => {
                    let reference = self.capture(frame, *index, node.span)?;
                    let value = reference.get(rt).map_err(|k| RuntimeError::at(k, node.span))?;
                    Ok(Flow::Normal(value))
                }

                NodeKind::Global { name, resolved } => resolved
                    .get()
                    .cloned()
                    .map(Flow::Normal)
                    .ok_or_else(|| RuntimeError::at(ErrorKind::UndefinedSymbol(name.clone()), node.span)),

                NodeKind::Property { .. } => {
                    let reference = normal!(self.eval_ref(node, frame).await?);
                    let value = reference.get(rt).map_err(|k| RuntimeError::at(k, node.span))?;
                    Ok(Flow::Normal(value))
                }

                NodeKind::Call { callee, args } => {
                    let callee = normal!(self.eval(callee, frame).await?);
                    let args = normal!(self.eval_all(args, frame).await?);
                    Ok(Flow::Normal(self.call(callee, args, frame, node.span).await?))
                }

                NodeKind::Invoke { object, name, args } => {
                    let target = normal!(self.eval(object, frame).await?);
                    let method = PropertyRef { target, key: Rc::clone(name) }
                        .get(rt)
                        .map_err(|k| RuntimeError::at(k, node.span))?;
                    let args = normal!(self.eval_all(args, frame).await?);
                    Ok(Flow::Normal(self.call(method, args, frame, node.span).await?))
                }

                NodeKind::Set { target, value } => {
                    let reference = normal!(self.eval_ref(target, frame).await?);
                    let value = normal!(self.eval(value, frame).await?);
                    self.assign(&reference, value.clone(), node.span)?;
                    Ok(Flow::Normal(value))
                }

                NodeKind::Object(fields) => {
                    let mut values = Vec::with_capacity(fields.len());
                    for (key, field) in fields {
                        values.push((Rc::clone(key), normal!(self.eval(field, frame).await?)));
                    }
                    Ok(Flow::Normal(rt.object(values)))
                }

                NodeKind::List(items) => {
                    let items = normal!(self.eval_all(items, frame).await?);
                    Ok(Flow::Normal(rt.list(items)))
                }

                NodeKind::Map(entries) => {
                    let mut pairs = Vec::with_capacity(entries.len());
                    for (key, value) in entries {
                        let key = normal!(self.eval(key, frame).await?);
                        let value = normal!(self.eval(value, frame).await?);
                        pairs.push((key, value));
                    }
                    Ok(Flow::Normal(rt.map(pairs)))
                }

                NodeKind::Let { inits, body } => self.eval_let(inits, body, frame).await,

                NodeKind::Sequence(children) => {
                    let mut last = rt.null();
                    for child in children {
                        last = normal!(self.eval(child, frame).await?);
                    }
                    Ok(Flow::Normal(last))
                }

                NodeKind::If { cond, then, otherwise } => {
                    let cond = normal!(self.eval(cond, frame).await?);
                    if cond.is_truthy() {
                        self.eval(then, frame).await
                    } else if let Some(otherwise) = otherwise {
                        self.eval(otherwise, frame).await
                    } else {
                        Ok(Flow::Normal(rt.null()))
                    }
                }

                NodeKind::And(left, right) => {
                    let left = normal!(self.eval(left, frame).await?);
                    if !left.is_truthy() {
                        return Ok(Flow::Normal(left));
                    }
                    self.eval(right, frame).await
                }

                NodeKind::Or(left, right) => {
                    let left = normal!(self.eval(left, frame).await?);
                    if left.is_truthy() {
                        return Ok(Flow::Normal(left));
                    }
                    self.eval(right, frame).await
                }

                NodeKind::Loop(body) => loop {
                    match self.eval(body, frame).await? {
                        Flow::Normal(_) | Flow::Signal(SignalKind::Continue, _) => continue,
                        Flow::Signal(SignalKind::Break, value) => return Ok(Flow::Normal(value)),
                        other => return Ok(other),
                    }
                },

                NodeKind::Signal { kind, value } => {
                    let value = match value {
                        Some(value) => normal!(self.eval(value, frame).await?),
                        None => rt.null(),
                    };
                    if *kind == SignalKind::Yield {
                        if let Some(port) = self.generator_port(frame)? {
                            trace!(node = node.id, "generator yield");
                            return Ok(if port.suspend(value).await {
                                Flow::Normal(rt.null())
                            } else {
                                // Consumer dropped: unwind the generator body.
                                Flow::Signal(SignalKind::Return, rt.null())
                            });
                        }
                    }
                    Ok(Flow::Signal(*kind, value))
                }

                NodeKind::Function(def) => {
                    let mut captures = Vec::with_capacity(def.captures.len());
                    for capture in &def.captures {
                        captures.push(normal!(self.eval_ref(capture, frame).await?));
                    }
                    let closure = Closure { def: Rc::clone(def), captures };
                    Ok(Flow::Normal(rt.callable(Callable::Closure(closure), node.ty.clone())))
                }

                NodeKind::Launch(body) => Ok(Flow::Normal(self.launch(body, frame, node)?)),

                NodeKind::Await(task) => {
                    let value = normal!(self.eval(task, frame).await?);
                    match value {
                        Value::Task(handle) => {
                            let value = handle.join().await.map_err(|mut e| {
                                e.span = e.span.or(Some(node.span));
                                e
                            })?;
                            Ok(Flow::Normal(value))
                        }
                        other => Ok(Flow::Normal(other)),
                    }
                }
            }
        })
    }

    /// Evaluate an lvalue node to the reference it denotes.
    pub async fn eval_ref(&self, node: &Rc<Node>, frame: FrameId) -> Result<Flow<Reference>> {
        match &node.kind {
            NodeKind::Local(index) => Ok(Flow::Normal(Reference::Value(self.local(frame, *index, node.span)?))),
            NodeKind::Capture(index) => Ok(Flow::Normal(self.capture(frame, *index, node.span)?)),
            NodeKind::Property { object, name } => {
                let target = normal!(self.eval(object, frame).await?);
                Ok(Flow::Normal(Reference::Property(PropertyRef {
                    target,
                    key: Rc::clone(name),
                })))
            }
            _ => Err(RuntimeError::at(
                ErrorKind::ConstructionTypeError {
                    construct: "reference",
                    expected: "an lvalue".to_string(),
                    found: node.ty.name().to_string(),
                },
                node.span,
            )),
        }
    }

    async fn eval_all(&self, nodes: &[Rc<Node>], frame: FrameId) -> Result<Flow<Vec<Value>>> {
        let mut values = Vec::with_capacity(nodes.len());
        for node in nodes {
            values.push(normal!(self.eval(node, frame).await?));
        }
        Ok(Flow::Normal(values))
    }

    async fn eval_let(&self, inits: &[Rc<Node>], body: &Rc<Node>, frame: FrameId) -> Result<Completion> {
        let (base, slots) = {
            let mut frames = self.inner.frames.borrow_mut();
            let locals = &mut frames.get_mut(frame).ok_or_else(|| Self::stale(frame))?.locals;
            let base = locals.len();
            let slots: Vec<ValueRef> = inits.iter().map(|_| ValueRef::new(Value::Undefined)).collect();
            locals.extend(slots.iter().cloned());
            (base, slots)
        };

        // Slots exist before any initializer runs, so initializers may refer to each other.
        // A runtime error leaves the slots in place; the whole call is unwinding.
        for (slot, init) in slots.iter().zip(inits) {
            match self.eval(init, frame).await? {
                Flow::Normal(value) => slot.set(value),
                signal => {
                    self.trim(frame, base);
                    return Ok(signal);
                }
            }
        }

        let result = self.eval(body, frame).await?;
        self.trim(frame, base);
        Ok(result)
    }

    fn trim(&self, frame: FrameId, len: usize) {
        if let Some(frame) = self.inner.frames.borrow_mut().get_mut(frame) {
            frame.locals.truncate(len);
        }
    }

    fn generator_port(&self, frame: FrameId) -> Result<Option<Rc<GeneratorPort>>> {
        let frames = self.inner.frames.borrow();
        let frame = frames.get(frame).ok_or_else(|| Self::stale(frame))?;
        Ok(frame.generator.clone())
    }

    /// Store through `reference`, refusing to change the variant of a non-null value.
    fn assign(&self, reference: &Reference, value: Value, span: Span) -> Result<()> {
        if let Some(old) = reference.peek() {
            if !old.is_null() && !old.is_undefined() && old.variant() != value.variant() {
                return Err(RuntimeError::at(
                    ErrorKind::TypeMismatchOnAssignment {
                        expected: old.type_name().to_string(),
                        found: value.type_name().to_string(),
                    },
                    span,
                ));
            }
        }
        reference.set(value).map_err(|k| RuntimeError::at(k, span))
    }

    /// Call `callee` with already-evaluated arguments.
    pub async fn call(&self, callee: Value, args: Vec<Value>, caller: FrameId, span: Span) -> Result<Value> {
        let callable = match callee {
            Value::Callable(callable) => callable,
            other => {
                return Err(RuntimeError::at(
                    ErrorKind::InvalidCall(other.type_name().to_string()),
                    span,
                ))
            }
        };

        match &callable.callable {
            Callable::Closure(closure) => self.call_closure(&callable, closure, args, caller, span).await,
            Callable::Native(native) => {
                check_arity(&native.name, native.arity, args.len(), span)?;
                (native.func)(&*self.inner.rt, &args).map_err(|msg| RuntimeError::at(ErrorKind::Native(msg), span))
            }
            Callable::NativeAsync(native) => {
                check_arity(&native.name, native.arity, args.len(), span)?;
                (native.func)(Rc::clone(&self.inner.rt), args)
                    .await
                    .map_err(|msg| RuntimeError::at(ErrorKind::Native(msg), span))
            }
            Callable::Generator(generator) => {
                let next = generator.resume().await.map_err(|mut e| {
                    e.span = e.span.or(Some(span));
                    e
                })?;
                Ok(next.unwrap_or_else(|| self.inner.rt.null()))
            }
        }
    }

    async fn call_closure(
        &self,
        callable: &Rc<CallableValue>,
        closure: &Closure,
        args: Vec<Value>,
        caller: FrameId,
        span: Span,
    ) -> Result<Value> {
        let max_depth = self.inner.max_depth.get();
        if self.inner.frames.borrow().depth(caller) >= max_depth {
            return Err(RuntimeError::at(ErrorKind::StackOverflow(max_depth), span));
        }

        let def = &closure.def;
        let frame = Frame::new(self.bind(def, args), closure.captures.clone()).with_parent(caller, span);

        if def.generator {
            return Ok(self.start_generator(Rc::clone(def), frame));
        }

        let frame = self.enter(frame);
        trace!(function = callable.name(), frame = frame.id.index(), "call");
        let result = self.eval(&def.body, frame.id).await;
        drop(frame);

        match result? {
            Flow::Normal(value) | Flow::Signal(SignalKind::Return, value) => Ok(value),
            Flow::Signal(kind, _) => Err(RuntimeError::at(ErrorKind::UncaughtSignal(kind.name()), span)),
        }
    }

    /// Positional binding: missing arguments are `Undefined`, surplus ones
    /// land in a list bound to the implicit trailing parameter.
    fn bind(&self, def: &FunctionDef, args: Vec<Value>) -> Vec<ValueRef> {
        let arity = def.params.len();
        let mut args = args.into_iter();
        let mut locals: Vec<ValueRef> = (0..arity)
            .map(|_| ValueRef::new(args.next().unwrap_or(Value::Undefined)))
            .collect();
        locals.push(ValueRef::new(self.inner.rt.list(args.collect())));
        locals
    }

    fn start_generator(&self, def: Rc<FunctionDef>, mut frame: Frame) -> Value {
        let (yield_tx, yield_rx) = mpsc::channel(1);
        let (resume_tx, resume_rx) = mpsc::channel(1);
        let port = Rc::new(GeneratorPort {
            yields: yield_tx,
            resumes: Mutex::new(resume_rx),
        });
        frame.generator = Some(Rc::clone(&port));
        let span = frame.call_site.unwrap_or_default();
        // Released when the body ends or when the task is dropped while suspended.
        let frame = self.enter(frame);
        debug!(frame = frame.id.index(), function = def.name.as_deref().unwrap_or("<anonymous>"), "generator created");

        let body = Rc::clone(&def);
        let task = tokio::task::spawn_local(async move {
            // The body starts on the first resumption, not on creation.
            let started = port.resumes.lock().await.recv().await.is_some();
            drop(port);
            let result = if started {
                frame.interp.eval(&body.body, frame.id).await
            } else {
                Ok(Flow::Normal(Value::Undefined))
            };
            drop(frame);

            match result? {
                Flow::Normal(_) | Flow::Signal(SignalKind::Return, _) => Ok(()),
                Flow::Signal(kind, _) => Err(RuntimeError::at(ErrorKind::UncaughtSignal(kind.name()), span)),
            }
        });

        let generator = Generator {
            resumes: resume_tx,
            yields: Mutex::new(yield_rx),
            task: RefCell::new(Some(task)),
            done: Cell::new(false),
        };
        let rt = &self.inner.rt;
        let ty = rt.types.callable(&[], &rt.types.any);
        rt.callable(Callable::Generator(Rc::new(generator)), ty)
    }

    /// Schedule `body` as an independent task sharing the current frame's references.
    fn launch(&self, body: &Rc<Node>, frame: FrameId, node: &Node) -> Result<Value> {
        let copy = {
            let frames = self.inner.frames.borrow();
            let parent = frames.get(frame).ok_or_else(|| Self::stale(frame))?;
            Frame::new(parent.locals.clone(), parent.captures.clone()).with_parent(frame, node.span)
        };
        let child = self.enter(copy);

        let id = self.inner.next_task.get();
        self.inner.next_task.set(id + 1);
        debug!(task = id, frame = child.id.index(), "launch");

        let body = Rc::clone(body);
        let span = node.span;
        let join = tokio::task::spawn_local(async move {
            let result = child.interp.eval(&body, child.id).await;
            drop(child);

            let result = result.and_then(|flow| match flow {
                Flow::Normal(value) => Ok(value),
                Flow::Signal(kind, _) => Err(RuntimeError::at(ErrorKind::UncaughtSignal(kind.name()), span)),
            });
            if let Err(e) = &result {
                warn!(task = id, error = %e, "launched task failed");
            }
            result
        });

        let handle = Rc::new(TaskHandle {
            id,
            ty: node.ty.clone(),
            join: RefCell::new(Some(join)),
            outcome: OnceCell::new(),
        });
        self.inner.launched.borrow_mut().push(Rc::clone(&handle));
        Ok(Value::Task(handle))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn check_arity(name: &str, arity: Option<usize>, got: usize, span: Span) -> Result<()> {
    match arity {
        Some(expected) if expected != got => Err(RuntimeError::at(
            ErrorKind::Native(format!("{}() expects {} arguments, got {}", name, expected, got)),
            span,
        )),
        _ => Ok(()),
    }
}
