use crate::ast::LabelId;
use crate::intern::Atom;
use crate::types::{JsValue, ObjectId};
use bitflags::bitflags;
use std::fmt;
use std::rc::Rc;

bitflags! {
    /// Per-property attributes, fixed when the property is created.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct Attributes: u8 {
        const READ_ONLY = 1 << 0;
        const DONT_ENUM = 1 << 1;
        const DONT_DELETE = 1 << 2;
        /// Hidden from enumeration and reflection.
        const INTERNAL = 1 << 3;
    }
}

/// A property access that has not been dereferenced yet. `base: None` is an
/// unresolved identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct Reference {
    pub base: Option<ObjectId>,
    pub name: Atom,
}

/// The result of evaluating an expression: either a value or a reference
/// still waiting for GetValue/PutValue.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Value(JsValue),
    Reference(Reference),
}

impl From<JsValue> for Operand {
    fn from(v: JsValue) -> Self {
        Operand::Value(v)
    }
}

/// Statement outcome. Throws travel through `Err(Exception)` instead; the
/// value of a statement list is kept in the running context.
#[derive(Clone, Debug, PartialEq)]
pub enum Completion {
    Normal,
    Break(LabelId),
    Continue(LabelId),
    Return(JsValue),
}

impl Completion {
    pub(crate) fn is_abrupt(&self) -> bool {
        !matches!(self, Completion::Normal)
    }
}

/// Hint passed to DefaultValue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hint {
    String,
    Number,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Error,
    EvalError,
    RangeError,
    ReferenceError,
    SyntaxError,
    TypeError,
    UriError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::Error,
        ErrorKind::EvalError,
        ErrorKind::RangeError,
        ErrorKind::ReferenceError,
        ErrorKind::SyntaxError,
        ErrorKind::TypeError,
        ErrorKind::UriError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::EvalError => "EvalError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::UriError => "URIError",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Source position of the statement being executed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub source_name: Rc<str>,
    pub line: u32,
}

impl Location {
    pub fn new(source_name: &str, line: u32) -> Self {
        Location {
            source_name: Rc::from(source_name),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source_name, self.line)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceEvent {
    Statement,
    Call,
    Return,
    Throw,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallType {
    Call,
    Construct,
}

/// One frame of the script-level call path.
#[derive(Clone, Debug, PartialEq)]
pub struct TracebackEntry {
    pub call_location: Location,
    pub callee: ObjectId,
    pub call_type: CallType,
}

/// A thrown value on its way to the nearest try region.
#[derive(Clone, Debug)]
pub struct Exception {
    pub value: JsValue,
    /// Call path at the throw point, innermost call last.
    pub traceback: Vec<TracebackEntry>,
}

pub type JsResult<T> = Result<T, Exception>;

/// Why a try region was entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RegionKind {
    /// A host entry point (`evaluate`, `call`, `construct`).
    Host,
    /// A script `try` statement.
    Script,
}

#[derive(Clone, Debug)]
pub(crate) struct TryRegion {
    pub(crate) kind: RegionKind,
    pub(crate) context_depth: usize,
    pub(crate) traceback_depth: usize,
}
