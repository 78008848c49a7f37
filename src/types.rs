//! Type descriptors
//!
//! Types are attached to nodes when the tree is built and never re-checked
//! at evaluation time. Equality is identity: instantiations of a constructor
//! are interned, so two structurally identical instantiations share one `Type`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rustc_hash::FxHashMap;

/// A property slot in a type's property table
#[derive(Debug, Clone)]
pub struct PropertyType {
    pub mutable: bool,
    pub ty: Type,
}

#[derive(Debug)]
enum Shape {
    Named,
    Callable { params: Vec<Type>, ret: Type },
    Instance { constructor: ConstructorId, args: Vec<Type> },
}

struct TypeData {
    name: String,
    supertypes: Vec<Type>,
    properties: FxHashMap<String, PropertyType>,
    shape: Shape,
}

/// A shared, identity-compared type descriptor
#[derive(Clone)]
pub struct Type(Rc<TypeData>);

impl Type {
    fn from_data(data: TypeData) -> Self {
        Self(Rc::new(data))
    }

    /// Create a nominal type. Two calls produce two distinct types.
    pub fn named(
        name: impl Into<String>,
        supertypes: Vec<Type>,
        properties: FxHashMap<String, PropertyType>,
    ) -> Self {
        Self::from_data(TypeData {
            name: name.into(),
            supertypes,
            properties,
            shape: Shape::Named,
        })
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn supertypes(&self) -> &[Type] {
        &self.0.supertypes
    }

    pub fn property(&self, name: &str) -> Option<&PropertyType> {
        self.0.properties.get(name)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.0.shape, Shape::Callable { .. })
    }

    /// Parameter types when this is a callable type.
    pub fn params(&self) -> Option<&[Type]> {
        match &self.0.shape {
            Shape::Callable { params, .. } => Some(params),
            _ => None,
        }
    }

    /// Return type when this is a callable type.
    pub fn ret(&self) -> Option<&Type> {
        match &self.0.shape {
            Shape::Callable { ret, .. } => Some(ret),
            _ => None,
        }
    }

    /// Type arguments when this type instantiates `constructor`.
    pub fn args_of(&self, constructor: &TypeConstructor) -> Option<&[Type]> {
        match &self.0.shape {
            Shape::Instance { constructor: id, args } if *id == constructor.id => Some(args),
            _ => None,
        }
    }

    pub fn has_supertype(&self, other: &Type) -> bool {
        self == other || self.0.supertypes.iter().any(|s| s.has_supertype(other))
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Type {}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.name)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.name)
    }
}

/// Hashes a type by identity so it can key the instantiation table.
#[derive(Clone, PartialEq, Eq)]
struct TypeKey(Type);

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.0 .0).hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstructorId(u32);

/// A generic type constructor such as `list<T>` or `task<T>`
#[derive(Debug, Clone)]
pub struct TypeConstructor {
    id: ConstructorId,
    name: String,
    arity: usize,
}

impl TypeConstructor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

/// Owner of the built-in types and the instantiation intern table
pub struct TypeRegistry {
    pub any: Type,
    pub null: Type,
    pub boolean: Type,
    pub number: Type,
    pub string: Type,
    pub object: Type,
    pub list: Type,
    pub map: Type,
    list_ctor: TypeConstructor,
    map_ctor: TypeConstructor,
    task_ctor: TypeConstructor,
    callable_id: ConstructorId,
    instances: RefCell<FxHashMap<(ConstructorId, Vec<TypeKey>), Type>>,
    next_ctor: Cell<u32>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let any = Type::named("any", Vec::new(), FxHashMap::default());
        let scalar = |name: &str| Type::named(name, vec![any.clone()], FxHashMap::default());
        let null = scalar("null");
        let boolean = scalar("boolean");
        let number = scalar("number");
        let object = scalar("object");

        let mut registry = Self {
            string: null.clone(),
            list: null.clone(),
            map: null.clone(),
            any,
            null,
            boolean,
            number,
            object,
            list_ctor: TypeConstructor { id: ConstructorId(1), name: "list".into(), arity: 1 },
            map_ctor: TypeConstructor { id: ConstructorId(2), name: "map".into(), arity: 2 },
            task_ctor: TypeConstructor { id: ConstructorId(3), name: "task".into(), arity: 1 },
            callable_id: ConstructorId(0),
            instances: RefCell::new(FxHashMap::default()),
            next_ctor: Cell::new(4),
        };

        let any = registry.any.clone();
        let number = registry.number.clone();
        let boolean = registry.boolean.clone();
        let iterator = registry.callable(&[], &any);

        let mut string_props = registry.methods(vec![
            ("length", vec![], number.clone()),
            ("get", vec![number.clone()], any.clone()),
        ]);
        string_props.insert("iter".into(), PropertyType { mutable: false, ty: registry.callable(&[], &iterator) });
        registry.string = Type::named("string", vec![any.clone()], string_props);

        let mut list_props = registry.methods(vec![
            ("length", vec![], number.clone()),
            ("get", vec![number.clone()], any.clone()),
            ("set", vec![number.clone(), any.clone()], any.clone()),
            ("push", vec![any.clone()], number.clone()),
            ("pop", vec![], any.clone()),
        ]);
        list_props.insert("iter".into(), PropertyType { mutable: false, ty: registry.callable(&[], &iterator) });
        let list_ctor = registry.list_ctor.clone();
        registry.list = registry.intern_instance(&list_ctor, &[any.clone()], list_props);

        let mut map_props = registry.methods(vec![
            ("get", vec![any.clone()], any.clone()),
            ("set", vec![any.clone(), any.clone()], any.clone()),
            ("has", vec![any.clone()], boolean.clone()),
            ("delete", vec![any.clone()], boolean),
            ("size", vec![], number),
        ]);
        for name in ["iter", "keys", "values"] {
            map_props.insert(name.into(), PropertyType { mutable: false, ty: registry.callable(&[], &iterator) });
        }
        let map_ctor = registry.map_ctor.clone();
        registry.map = registry.intern_instance(&map_ctor, &[any.clone(), any], map_props);

        registry
    }

    fn methods(&self, sigs: Vec<(&str, Vec<Type>, Type)>) -> FxHashMap<String, PropertyType> {
        sigs.into_iter()
            .map(|(name, params, ret)| {
                let ty = self.callable(&params, &ret);
                (name.to_string(), PropertyType { mutable: false, ty })
            })
            .collect()
    }

    /// Allocate a fresh generic constructor for host-defined types.
    pub fn define_constructor(&self, name: impl Into<String>, arity: usize) -> TypeConstructor {
        let id = self.next_ctor.get();
        self.next_ctor.set(id + 1);
        TypeConstructor { id: ConstructorId(id), name: name.into(), arity }
    }

    /// The interned callable type for these parameter and return types.
    pub fn callable(&self, params: &[Type], ret: &Type) -> Type {
        let mut key: Vec<TypeKey> = params.iter().cloned().map(TypeKey).collect();
        key.push(TypeKey(ret.clone()));
        let key = (self.callable_id, key);

        if let Some(ty) = self.instances.borrow().get(&key) {
            return ty.clone();
        }

        let names: Vec<&str> = params.iter().map(Type::name).collect();
        let ty = Type::from_data(TypeData {
            name: format!("fn({}) -> {}", names.join(", "), ret.name()),
            supertypes: vec![self.any.clone()],
            properties: FxHashMap::default(),
            shape: Shape::Callable { params: params.to_vec(), ret: ret.clone() },
        });
        self.instances.borrow_mut().insert(key, ty.clone());
        ty
    }

    /// Instantiate `constructor` with `args`; `None` when the arity is wrong.
    pub fn instantiate(&self, constructor: &TypeConstructor, args: &[Type]) -> Option<Type> {
        if args.len() != constructor.arity {
            return None;
        }
        Some(self.intern_instance(constructor, args, FxHashMap::default()))
    }

    fn intern_instance(
        &self,
        constructor: &TypeConstructor,
        args: &[Type],
        properties: FxHashMap<String, PropertyType>,
    ) -> Type {
        let key = (constructor.id, args.iter().cloned().map(TypeKey).collect::<Vec<_>>());
        if let Some(ty) = self.instances.borrow().get(&key) {
            return ty.clone();
        }

        let names: Vec<&str> = args.iter().map(Type::name).collect();
        let ty = Type::from_data(TypeData {
            name: format!("{}<{}>", constructor.name, names.join(", ")),
            supertypes: vec![self.any.clone()],
            properties,
            shape: Shape::Instance { constructor: constructor.id, args: args.to_vec() },
        });
        self.instances.borrow_mut().insert(key, ty.clone());
        ty
    }

    pub fn task_of(&self, inner: &Type) -> Type {
        let ctor = self.task_ctor.clone();
        self.intern_instance(&ctor, std::slice::from_ref(inner), FxHashMap::default())
    }

    /// Result type of awaiting a value of type `ty`.
    pub fn awaited(&self, ty: &Type) -> Type {
        match ty.args_of(&self.task_ctor) {
            Some([inner]) => inner.clone(),
            _ => ty.clone(),
        }
    }

    pub fn is_boolean(&self, ty: &Type) -> bool {
        *ty == self.boolean
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
