//! References: the only mutable storage units
//!
//! Closures capture references, not values, so a mutation through any alias
//! of a `ValueRef` is visible through every other alias.

use std::cell::RefCell;
use std::rc::Rc;

use crate::builtins;
use crate::error::ErrorKind;
use crate::value::{Runtime, Value};

/// A shared slot holding one value
#[derive(Clone)]
pub struct ValueRef(Rc<RefCell<Value>>);

impl ValueRef {
    pub fn new(value: Value) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    pub fn set(&self, value: Value) {
        *self.0.borrow_mut() = value;
    }

    pub fn ptr_eq(&self, other: &ValueRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A named property on a target value
#[derive(Clone)]
pub struct PropertyRef {
    pub target: Value,
    pub key: Rc<str>,
}

impl PropertyRef {
    /// Read the property. Absent properties are an error, never `Undefined`.
    pub fn get(&self, rt: &Runtime) -> Result<Value, ErrorKind> {
        match &self.target {
            Value::Object(object) => object
                .get(&self.key)
                .ok_or_else(|| ErrorKind::InvalidProperty(self.key.to_string())),
            Value::List(_) | Value::Map(_) => builtins::method(rt, &self.target, &self.key)
                .ok_or_else(|| ErrorKind::InvalidProperty(self.key.to_string())),
            other if other.as_str().is_some() => builtins::method(rt, other, &self.key)
                .ok_or_else(|| ErrorKind::InvalidProperty(self.key.to_string())),
            other => Err(self.non_object(other)),
        }
    }

    /// Current value if present; used by the assignment guard.
    pub fn peek(&self) -> Option<Value> {
        match &self.target {
            Value::Object(object) => object.get(&self.key),
            _ => None,
        }
    }

    /// Write the property, creating it when new.
    pub fn set(&self, value: Value) -> Result<(), ErrorKind> {
        match &self.target {
            Value::Object(object) => {
                object.set(&self.key, value);
                Ok(())
            }
            other => Err(self.non_object(other)),
        }
    }

    fn non_object(&self, found: &Value) -> ErrorKind {
        ErrorKind::NonObjectPropertyAccess {
            key: self.key.to_string(),
            found: found.type_name().to_string(),
        }
    }
}

/// Result of evaluating an lvalue node as a reference
#[derive(Clone)]
pub enum Reference {
    Value(ValueRef),
    Property(PropertyRef),
}

impl Reference {
    pub fn get(&self, rt: &Runtime) -> Result<Value, ErrorKind> {
        match self {
            Reference::Value(slot) => Ok(slot.get()),
            Reference::Property(prop) => prop.get(rt),
        }
    }

    /// The value currently held, without failing on absence.
    pub fn peek(&self) -> Option<Value> {
        match self {
            Reference::Value(slot) => Some(slot.get()),
            Reference::Property(prop) => prop.peek(),
        }
    }

    pub fn set(&self, value: Value) -> Result<(), ErrorKind> {
        match self {
            Reference::Value(slot) => {
                slot.set(value);
                Ok(())
            }
            Reference::Property(prop) => prop.set(value),
        }
    }
}
