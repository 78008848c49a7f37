//! Scalar intern table
//!
//! Null, booleans, numbers and strings are canonicalized so that equal raw
//! scalars share one allocation. Entries are held weakly; once every value
//! referring to a scalar is dropped its entry is evicted by the next sweep.

use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::types::TypeRegistry;
use crate::value::{Scalar, ScalarValue};

/// Sweep threshold floor (entries)
const MIN_SWEEP: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ScalarKey {
    Number(u64),
    String(Rc<str>),
}

pub struct Interner {
    null: Rc<ScalarValue>,
    yes: Rc<ScalarValue>,
    no: Rc<ScalarValue>,
    table: FxHashMap<ScalarKey, Weak<ScalarValue>>,
    next_sweep: usize,
}

impl Interner {
    pub fn new(types: &TypeRegistry) -> Self {
        let pinned = |scalar, ty: &crate::types::Type| Rc::new(ScalarValue::new(scalar, ty.clone()));
        Self {
            null: pinned(Scalar::Null, &types.null),
            yes: pinned(Scalar::Boolean(true), &types.boolean),
            no: pinned(Scalar::Boolean(false), &types.boolean),
            table: FxHashMap::default(),
            next_sweep: MIN_SWEEP,
        }
    }

    /// Return the canonical allocation for `scalar`.
    pub fn intern(&mut self, scalar: Scalar, types: &TypeRegistry) -> Rc<ScalarValue> {
        // -0.0 and 0.0 are one number.
        let scalar = match scalar {
            Scalar::Number(n) if n == 0.0 => Scalar::Number(0.0),
            other => other,
        };
        let (key, ty) = match &scalar {
            Scalar::Null => return Rc::clone(&self.null),
            Scalar::Boolean(true) => return Rc::clone(&self.yes),
            Scalar::Boolean(false) => return Rc::clone(&self.no),
            Scalar::Number(n) => (ScalarKey::Number(n.to_bits()), &types.number),
            Scalar::String(s) => (ScalarKey::String(Rc::clone(s)), &types.string),
        };

        if let Some(existing) = self.table.get(&key).and_then(Weak::upgrade) {
            return existing;
        }

        let value = Rc::new(ScalarValue::new(scalar, ty.clone()));
        self.table.insert(key, Rc::downgrade(&value));

        if self.table.len() > self.next_sweep {
            self.sweep();
        }
        value
    }

    /// Drop entries whose scalar is no longer referenced. Returns the number evicted.
    pub fn sweep(&mut self) -> usize {
        let before = self.table.len();
        self.table.retain(|_, weak| weak.strong_count() > 0);
        let evicted = before - self.table.len();

        self.next_sweep = std::cmp::max(self.table.len() * 2, MIN_SWEEP);
        trace!(evicted, live = self.table.len(), "swept scalar intern table");
        evicted
    }

    /// Number of table entries, live or awaiting a sweep.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_scalars_share_allocation() {
        let types = TypeRegistry::new();
        let mut interner = Interner::new(&types);
        let a = interner.intern(Scalar::Number(3.5), &types);
        let b = interner.intern(Scalar::Number(3.5), &types);
        let s1 = interner.intern(Scalar::String("hi".into()), &types);
        let s2 = interner.intern(Scalar::String("hi".into()), &types);
        assert!(Rc::ptr_eq(&a, &b));
        assert!(Rc::ptr_eq(&s1, &s2));
        assert!(Rc::ptr_eq(
            &interner.intern(Scalar::Null, &types),
            &interner.intern(Scalar::Null, &types)
        ));
    }

    #[test]
    fn signed_zeros_share_allocation() {
        let types = TypeRegistry::new();
        let mut interner = Interner::new(&types);
        let zero = interner.intern(Scalar::Number(0.0), &types);
        let negative = interner.intern(Scalar::Number(-0.0), &types);
        assert!(Rc::ptr_eq(&zero, &negative));
        assert!(matches!(negative.scalar, Scalar::Number(n) if n.is_sign_positive()));
    }

    #[test]
    fn sweep_evicts_dropped_scalars() {
        let types = TypeRegistry::new();
        let mut interner = Interner::new(&types);
        let kept = interner.intern(Scalar::String("kept".into()), &types);
        drop(interner.intern(Scalar::String("dropped".into()), &types));
        assert_eq!(interner.len(), 2);
        assert_eq!(interner.sweep(), 1);
        assert_eq!(interner.len(), 1);
        assert!(Rc::ptr_eq(&kept, &interner.intern(Scalar::String("kept".into()), &types)));
    }
}
