//! Runtime value types for Ember

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use indexmap::IndexMap;

use crate::intern::Interner;
use crate::interpreter::{Generator, TaskHandle};
use crate::node::FunctionDef;
use crate::reference::Reference;
use crate::types::{Type, TypeRegistry};

/// Raw scalar payload
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
}

/// An interned scalar; see `Runtime::number` and friends
#[derive(Debug)]
pub struct ScalarValue {
    pub scalar: Scalar,
    pub ty: Type,
}

impl ScalarValue {
    pub fn new(scalar: Scalar, ty: Type) -> Self {
        Self { scalar, ty }
    }
}

/// Open record of named properties
pub struct ObjectValue {
    pub ty: Type,
    fields: RefCell<IndexMap<Rc<str>, Value>>,
}

impl ObjectValue {
    pub fn get(&self, key: &str) -> Option<Value> {
        self.fields.borrow().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: Value) {
        self.fields.borrow_mut().insert(Rc::from(key), value);
    }

    pub fn keys(&self) -> Vec<Rc<str>> {
        self.fields.borrow().keys().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(Rc<str>, Value)> {
        self.fields.borrow().iter().map(|(k, v)| (Rc::clone(k), v.clone())).collect()
    }
}

pub struct ListValue {
    pub ty: Type,
    pub items: RefCell<Vec<Value>>,
}

/// Map key compared by value identity
#[derive(Clone)]
pub struct MapKey(pub Value);

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.same(&other.0)
    }
}

impl Eq for MapKey {}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.identity().hash(state);
    }
}

pub struct MapValue {
    pub ty: Type,
    pub entries: RefCell<IndexMap<MapKey, Value>>,
}

/// Native function signature
pub type NativeFnPtr = Rc<dyn Fn(&Runtime, &[Value]) -> Result<Value, String>>;

/// Native asynchronous function signature
pub type AsyncNativeFnPtr =
    Rc<dyn Fn(Rc<Runtime>, Vec<Value>) -> LocalBoxFuture<'static, Result<Value, String>>>;

/// Native/built-in function
#[derive(Clone)]
pub struct NativeFn {
    pub name: String,
    pub arity: Option<usize>, // None means variadic
    pub func: NativeFnPtr,
}

impl NativeFn {
    pub fn new(
        name: &str,
        arity: Option<usize>,
        func: impl Fn(&Runtime, &[Value]) -> Result<Value, String> + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            arity,
            func: Rc::new(func),
        }
    }
}

/// Native function that suspends
#[derive(Clone)]
pub struct NativeAsyncFn {
    pub name: String,
    pub arity: Option<usize>,
    pub func: AsyncNativeFnPtr,
}

/// User closure: function literal plus the references it captured
pub struct Closure {
    pub def: Rc<FunctionDef>,
    pub captures: Vec<Reference>,
}

pub enum Callable {
    Closure(Closure),
    Native(NativeFn),
    NativeAsync(NativeAsyncFn),
    Generator(Rc<Generator>),
}

pub struct CallableValue {
    pub callable: Callable,
    pub ty: Type,
}

impl CallableValue {
    pub fn name(&self) -> &str {
        match &self.callable {
            Callable::Closure(c) => c.def.name.as_deref().unwrap_or("<anonymous>"),
            Callable::Native(n) => &n.name,
            Callable::NativeAsync(n) => &n.name,
            Callable::Generator(_) => "<generator>",
        }
    }
}

/// Runtime values in Ember
#[derive(Clone)]
pub enum Value {
    /// Sentinel for failed lookups; distinct from null
    Undefined,
    Scalar(Rc<ScalarValue>),
    Object(Rc<ObjectValue>),
    List(Rc<ListValue>),
    Map(Rc<MapValue>),
    Callable(Rc<CallableValue>),
    /// Pending result of a `launch`
    Task(Rc<TaskHandle>),
}

/// The runtime shape of a value, used by the assignment guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Object,
    List,
    Map,
    Callable,
    Task,
}

impl Variant {
    pub fn name(self) -> &'static str {
        match self {
            Variant::Undefined => "undefined",
            Variant::Null => "null",
            Variant::Boolean => "boolean",
            Variant::Number => "number",
            Variant::String => "string",
            Variant::Object => "object",
            Variant::List => "list",
            Variant::Map => "map",
            Variant::Callable => "callable",
            Variant::Task => "task",
        }
    }
}

impl Value {
    pub fn variant(&self) -> Variant {
        match self {
            Value::Undefined => Variant::Undefined,
            Value::Scalar(s) => match s.scalar {
                Scalar::Null => Variant::Null,
                Scalar::Boolean(_) => Variant::Boolean,
                Scalar::Number(_) => Variant::Number,
                Scalar::String(_) => Variant::String,
            },
            Value::Object(_) => Variant::Object,
            Value::List(_) => Variant::List,
            Value::Map(_) => Variant::Map,
            Value::Callable(_) => Variant::Callable,
            Value::Task(_) => Variant::Task,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.variant().name()
    }

    /// The value's type descriptor; `Undefined` has none.
    pub fn ty(&self) -> Option<&Type> {
        match self {
            Value::Undefined => None,
            Value::Scalar(s) => Some(&s.ty),
            Value::Object(o) => Some(&o.ty),
            Value::List(l) => Some(&l.ty),
            Value::Map(m) => Some(&m.ty),
            Value::Callable(c) => Some(&c.ty),
            Value::Task(t) => Some(&t.ty),
        }
    }

    /// Identity comparison. Interned scalars make this value equality for them.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Undefined, _) | (_, Value::Undefined) => false,
            _ => self.identity() == other.identity(),
        }
    }

    /// Address of the underlying allocation (0 for `Undefined`).
    pub fn identity(&self) -> usize {
        match self {
            Value::Undefined => 0,
            Value::Scalar(s) => Rc::as_ptr(s) as *const () as usize,
            Value::Object(o) => Rc::as_ptr(o) as *const () as usize,
            Value::List(l) => Rc::as_ptr(l) as *const () as usize,
            Value::Map(m) => Rc::as_ptr(m) as *const () as usize,
            Value::Callable(c) => Rc::as_ptr(c) as *const () as usize,
            Value::Task(t) => Rc::as_ptr(t) as *const () as usize,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Scalar(s) if s.scalar == Scalar::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined => false,
            Value::Scalar(s) => !matches!(s.scalar, Scalar::Null | Scalar::Boolean(false)),
            _ => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Scalar(s) => match s.scalar {
                Scalar::Number(n) => Some(n),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Scalar(s) => match s.scalar {
                Scalar::Boolean(b) => Some(b),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => match &s.scalar {
                Scalar::String(text) => Some(text),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Rc<CallableValue>> {
        match self {
            Value::Callable(c) => Some(c),
            _ => None,
        }
    }
}

fn fmt_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Printer { path: Vec::new() }.write(f, self)
    }
}

/// Writes values; a container that contains itself prints as `[...]` or `{...}`.
struct Printer {
    /// Identities of the containers currently being written
    path: Vec<usize>,
}

impl Printer {
    fn write(&mut self, f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
        match value {
            Value::Undefined => write!(f, "undefined"),
            Value::Scalar(s) => match &s.scalar {
                Scalar::Null => write!(f, "null"),
                Scalar::Boolean(b) => write!(f, "{}", b),
                Scalar::Number(n) => fmt_number(f, *n),
                Scalar::String(text) => write!(f, "{}", text),
            },
            Value::Object(o) => {
                if self.path.contains(&value.identity()) {
                    return write!(f, "{{...}}");
                }
                self.path.push(value.identity());
                write!(f, "{{")?;
                for (i, (key, field)) in o.entries().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: ", key)?;
                    self.write(f, field)?;
                }
                self.path.pop();
                write!(f, "}}")
            }
            Value::List(l) => {
                if self.path.contains(&value.identity()) {
                    return write!(f, "[...]");
                }
                self.path.push(value.identity());
                write!(f, "[")?;
                for (i, item) in l.items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    self.write(f, item)?;
                }
                self.path.pop();
                write!(f, "]")
            }
            Value::Map(m) => write!(f, "<map of {}>", m.entries.borrow().len()),
            Value::Callable(c) => match c.callable {
                Callable::Closure(_) => write!(f, "<fn {}>", c.name()),
                Callable::Native(_) | Callable::NativeAsync(_) => write!(f, "<native fn {}>", c.name()),
                Callable::Generator(_) => write!(f, "<generator>"),
            },
            Value::Task(_) => write!(f, "<task>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(s) if matches!(s.scalar, Scalar::String(_)) => write!(f, "{:?}", self.to_string()),
            _ => write!(f, "{}", self),
        }
    }
}

/// Process-wide evaluator state shared with native functions: the type
/// registry and the scalar intern table. Every value is built through here.
pub struct Runtime {
    pub types: TypeRegistry,
    interner: RefCell<Interner>,
}

impl Runtime {
    pub fn new() -> Self {
        let types = TypeRegistry::new();
        let interner = RefCell::new(Interner::new(&types));
        Self { types, interner }
    }

    fn scalar(&self, scalar: Scalar) -> Value {
        Value::Scalar(self.interner.borrow_mut().intern(scalar, &self.types))
    }

    pub fn null(&self) -> Value {
        self.scalar(Scalar::Null)
    }

    pub fn boolean(&self, b: bool) -> Value {
        self.scalar(Scalar::Boolean(b))
    }

    pub fn number(&self, n: f64) -> Value {
        self.scalar(Scalar::Number(n))
    }

    pub fn string(&self, s: &str) -> Value {
        self.scalar(Scalar::String(Rc::from(s)))
    }

    pub fn list(&self, items: Vec<Value>) -> Value {
        Value::List(Rc::new(ListValue {
            ty: self.types.list.clone(),
            items: RefCell::new(items),
        }))
    }

    pub fn object<K: AsRef<str>>(&self, fields: impl IntoIterator<Item = (K, Value)>) -> Value {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (Rc::from(k.as_ref()), v))
            .collect();
        Value::Object(Rc::new(ObjectValue {
            ty: self.types.object.clone(),
            fields: RefCell::new(fields),
        }))
    }

    pub fn map(&self, entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
        let entries = entries.into_iter().map(|(k, v)| (MapKey(k), v)).collect();
        Value::Map(Rc::new(MapValue {
            ty: self.types.map.clone(),
            entries: RefCell::new(entries),
        }))
    }

    fn native_type(&self, arity: Option<usize>) -> Type {
        let params = vec![self.types.any.clone(); arity.unwrap_or(0)];
        self.types.callable(&params, &self.types.any)
    }

    pub fn native(
        &self,
        name: &str,
        arity: Option<usize>,
        func: impl Fn(&Runtime, &[Value]) -> Result<Value, String> + 'static,
    ) -> Value {
        self.native_fn(NativeFn::new(name, arity, func))
    }

    /// Wrap a native as a callable value typed by its arity.
    pub fn native_fn(&self, native: NativeFn) -> Value {
        let ty = self.native_type(native.arity);
        self.callable(Callable::Native(native), ty)
    }

    pub fn native_async(
        &self,
        name: &str,
        arity: Option<usize>,
        func: impl Fn(Rc<Runtime>, Vec<Value>) -> LocalBoxFuture<'static, Result<Value, String>> + 'static,
    ) -> Value {
        Value::Callable(Rc::new(CallableValue {
            callable: Callable::NativeAsync(NativeAsyncFn {
                name: name.to_string(),
                arity,
                func: Rc::new(func),
            }),
            ty: self.native_type(arity),
        }))
    }

    pub fn callable(&self, callable: Callable, ty: Type) -> Value {
        Value::Callable(Rc::new(CallableValue { callable, ty }))
    }

    /// Evict interned scalars nothing refers to any more.
    pub fn sweep_interned(&self) -> usize {
        self.interner.borrow_mut().sweep()
    }

    pub fn interned_count(&self) -> usize {
        self.interner.borrow().len()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_identical() {
        let rt = Runtime::new();
        assert!(rt.number(42.0).same(&rt.number(42.0)));
        assert!(rt.string("a").same(&rt.string("a")));
        assert!(rt.null().same(&rt.null()));
        assert!(!rt.number(1.0).same(&rt.string("1")));
        assert!(!rt.null().same(&Value::Undefined));
    }

    #[test]
    fn compound_values_are_distinct() {
        let rt = Runtime::new();
        let a = rt.list(vec![rt.number(1.0)]);
        let b = rt.list(vec![rt.number(1.0)]);
        assert!(!a.same(&b));
        assert!(a.same(&a.clone()));
    }

    #[test]
    fn display_formats() {
        let rt = Runtime::new();
        let list = rt.list(vec![rt.number(1.0), rt.number(2.5), rt.string("x")]);
        assert_eq!(list.to_string(), "[1, 2.5, x]");
        let obj = rt.object([("a", rt.boolean(true)), ("b", rt.null())]);
        assert_eq!(obj.to_string(), "{a: true, b: null}");
        assert_eq!(format!("{:?}", rt.string("q")), "\"q\"");
    }

    #[test]
    fn display_stops_at_self_reference() {
        let rt = Runtime::new();
        let obj = rt.object(Vec::<(&str, Value)>::new());
        let Value::Object(inner) = &obj else { panic!("expected object") };
        inner.set("me", obj.clone());
        inner.set("list", rt.list(vec![obj.clone()]));
        assert_eq!(obj.to_string(), "{me: {...}, list: [{...}]}");
        inner.set("me", rt.null());
        inner.set("list", rt.null());
    }

    #[test]
    fn truthiness() {
        let rt = Runtime::new();
        assert!(!rt.null().is_truthy());
        assert!(!rt.boolean(false).is_truthy());
        assert!(!Value::Undefined.is_truthy());
        assert!(rt.number(0.0).is_truthy());
        assert!(rt.list(Vec::new()).is_truthy());
    }

    #[test]
    fn every_defined_value_has_a_type() {
        let rt = Runtime::new();
        assert!(Value::Undefined.ty().is_none());
        assert_eq!(rt.boolean(true).ty(), Some(&rt.types.boolean));
        assert_eq!(rt.map(Vec::new()).ty(), Some(&rt.types.map));
    }
}
