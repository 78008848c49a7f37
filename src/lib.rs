//! Ember - execution core for a small dynamically-typed language
//!
//! Ember runs already-resolved node trees: variables are addressed by static
//! index, closures capture by reference, and `launch`/`await` schedule work
//! cooperatively on a single thread.

pub mod error;
pub mod types;
pub mod intern;
pub mod value;
pub mod reference;
pub mod frame;
pub mod node;
pub mod interpreter;
pub mod stack;
pub mod builtins;
pub mod bridge;

use std::rc::Rc;

pub use error::{ErrorKind, Result, RuntimeError, Span};
pub use interpreter::{Completion, Flow, Interpreter, SignalKind};
pub use node::{FunctionSpec, Node, NodeBuilder};
pub use types::{Type, TypeRegistry};
pub use value::{Runtime, Value};

/// Convenience function: build a tree with a fresh interpreter and run it to completion
pub fn run(build: impl FnOnce(&NodeBuilder<'_>) -> Result<Rc<Node>>) -> Result<Value> {
    let interp = Interpreter::new();
    let tree = build(&interp.builder())?;
    interp.run_blocking(&tree)
}

/// Version of the Ember runtime
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
