//! An embeddable ECMAScript 3rd edition interpreter.
//!
//! Programs run under one of two interchangeable strategies: a direct
//! syntax-tree walker, or a compiler to a compact stack-machine bytecode.
//! Both share one object model, scope model and exception mechanism, and
//! produce identical observable behaviour.

pub mod ast;
pub mod bytecode;
pub mod intern;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod types;

pub use interpreter::{CompatFlags, Config, EngineError, Interpreter, Strategy};
pub use types::{JsString, JsValue, ObjectId};
