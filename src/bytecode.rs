//! Compiled form of a function or program body for the stack machine.
//!
//! Operands on the machine stack are either values or references; an
//! operation that needs a value calls GetValue itself only where noted.
//! Jump targets are absolute indices into [`Code::ops`].

use crate::ast::{BinaryOp, FunctionLiteral};
use crate::intern::Atom;
use crate::types::JsString;
use std::fmt;
use std::rc::Rc;

/// Address of an operation.
pub type Address = usize;

/// Placeholder target recorded by a forward jump until it is patched.
pub const UNPATCHED: Address = usize::MAX;

#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    Pop,
    Dup,
    /// Swaps the two topmost operands.
    Exch,

    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(JsString),
    This,

    /// Resolves an identifier to a reference.
    Lookup(Atom),
    /// Pops a base value, pushes `base.name`.
    Member(Atom),
    /// Pops a name value and a base value, pushes `base[name]`.
    MemberComputed,
    GetValue,
    /// Pops a value and a reference, stores, and pushes the value back.
    PutValue,

    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,

    Negate,
    Plus,
    Not,
    BitNot,
    /// Pops an operand, pushes its type name.
    Typeof,
    /// Pops an operand, pushes the outcome of deleting it.
    Delete,
    Binary(BinaryOp),

    /// Pops `argc` arguments and the callee operand.
    Call(u32),
    /// Pops `argc` arguments and the constructor value.
    New(u32),
    /// Pushes a function instance for the literal at this index.
    Function(u32),

    NewArray,
    /// Pops a value and stores it at this index of the array below it.
    SetIndex(u32),
    SetLength(u32),
    NewObject,
    /// Pops a value and stores it on the object below it.
    InitProperty(Atom),

    Jump(Address),
    /// Pops a value and jumps if it converts to true.
    JumpIfTrue(Address),
    JumpIfFalse(Address),
    /// Pushes the next name of the innermost enumeration, or jumps when the
    /// names are exhausted.
    NextName(Address),

    /// Pops a value into the statement-list result.
    SetResult,
    /// Start of a statement. `top_level` marks statements directly in a
    /// program body, where collection is allowed.
    Line { line: u32, top_level: bool },

    /// Pops a value and adds it to the front of the scope chain.
    EnterWith,
    /// Pops a value and starts enumerating its property names.
    EnterEnum,
    EnterCatch { handler: Address, param: Atom },
    EnterFinally(Address),
    /// Unwinds the block stack down to this depth, running finally blocks.
    Leave(u32),
    EndFinally,
    /// Pops the return value and leaves the body.
    Return,
    /// Pops a value and throws it.
    Throw,
    /// End of the body.
    Halt,
}

impl Op {
    /// Operands (popped, pushed) on the fall-through path.
    pub fn stack_effect(&self) -> (usize, usize) {
        match self {
            Op::Pop | Op::SetResult | Op::JumpIfTrue(_) | Op::JumpIfFalse(_) | Op::EnterWith | Op::EnterEnum => (1, 0),
            Op::Return | Op::Throw => (1, 0),
            Op::Dup => (1, 2),
            Op::Exch => (2, 2),
            Op::Undefined
            | Op::Null
            | Op::Bool(_)
            | Op::Number(_)
            | Op::String(_)
            | Op::This
            | Op::Lookup(_)
            | Op::Function(_)
            | Op::NewArray
            | Op::NewObject
            | Op::NextName(_) => (0, 1),
            Op::Member(_)
            | Op::GetValue
            | Op::PreIncrement
            | Op::PreDecrement
            | Op::PostIncrement
            | Op::PostDecrement
            | Op::Negate
            | Op::Plus
            | Op::Not
            | Op::BitNot
            | Op::Typeof
            | Op::Delete
            | Op::SetLength(_) => (1, 1),
            Op::MemberComputed | Op::PutValue | Op::Binary(_) => (2, 1),
            Op::SetIndex(_) | Op::InitProperty(_) => (2, 1),
            Op::Call(argc) | Op::New(argc) => (*argc as usize + 1, 1),
            Op::Jump(_)
            | Op::Line { .. }
            | Op::EnterCatch { .. }
            | Op::EnterFinally(_)
            | Op::Leave(_)
            | Op::EndFinally
            | Op::Halt => (0, 0),
        }
    }

    /// The jump target of a branching operation.
    pub fn target_mut(&mut self) -> Option<&mut Address> {
        match self {
            Op::Jump(t)
            | Op::JumpIfTrue(t)
            | Op::JumpIfFalse(t)
            | Op::NextName(t)
            | Op::EnterFinally(t)
            | Op::EnterCatch { handler: t, .. } => Some(t),
            _ => None,
        }
    }
}

/// A compiled body.
#[derive(Debug, Default)]
pub struct Code {
    pub ops: Vec<Op>,
    /// Function literals referenced by [`Op::Function`].
    pub functions: Vec<Rc<FunctionLiteral>>,
    /// Largest operand stack depth any path reaches.
    pub max_stack: usize,
    /// Largest block nesting any path reaches.
    pub max_blocks: usize,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (addr, op) in self.ops.iter().enumerate() {
            writeln!(f, "{addr:5}  {op:?}")?;
        }
        Ok(())
    }
}
