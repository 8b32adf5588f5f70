/// Executable syntax tree for ES3 programs.
///
/// Names are interned at parse time, breakable statements carry the label-id
/// targets their `break`/`continue` statements were resolved to, and function
/// bodies carry the results of the declaration pass (hoisted `var` names and
/// function declarations).
use crate::bytecode::Code;
use crate::intern::Atom;
use crate::types::{JsString, ObjectId};
use std::cell::{Cell, OnceCell};
use std::rc::Rc;

/// Stable identifier of a label set, assigned once at parse time.
pub type LabelId = u32;

#[derive(Debug)]
pub struct Program {
    pub body: Rc<FunctionBody>,
}

/// A program or function body, shared between both execution strategies.
#[derive(Debug)]
pub struct FunctionBody {
    pub statements: Vec<Statement>,
    /// Hoisted `var` names in declaration order (duplicates removed).
    pub var_names: Vec<Atom>,
    /// Function declarations in source order.
    pub functions: Vec<Rc<FunctionLiteral>>,
    pub is_program: bool,
    /// Name of the source the body was parsed from, used in locations.
    pub source_name: Rc<str>,
    /// Bytecode, compiled on first use by the bytecode strategy.
    pub code: OnceCell<Rc<Code>>,
}

impl FunctionBody {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// One function definition. Every evaluation of the literal creates (or
/// reuses) a function instance pointing back at this shared definition.
#[derive(Debug)]
pub struct FunctionLiteral {
    pub name: Option<Atom>,
    pub params: Vec<Atom>,
    pub body: FunctionBody,
    /// Source text of the body, between the braces.
    pub body_text: Rc<str>,
    pub line: u32,
    /// First instance created from this definition (weak).
    pub cache: Cell<Option<ObjectId>>,
    /// Property store shared by all instances of this definition.
    pub common: Cell<Option<ObjectId>>,
}

#[derive(Debug)]
pub struct Statement {
    pub line: u32,
    pub kind: StatementKind,
}

#[derive(Debug)]
pub enum StatementKind {
    Empty,
    Expression(Expression),
    Block(Vec<Statement>),
    Variable(Vec<VariableDeclarator>),
    If(IfStatement),
    DoWhile(LoopStatement),
    While(LoopStatement),
    For(ForStatement),
    ForIn(ForInStatement),
    Continue(LabelId),
    Break(LabelId),
    Return(Option<Expression>),
    With(Expression, Box<Statement>),
    Switch(SwitchStatement),
    Labeled(LabelId, Box<Statement>),
    Throw(Expression),
    Try(TryStatement),
    /// Bound by the declaration pass; a no-op when reached.
    FunctionDeclaration(Rc<FunctionLiteral>),
}

#[derive(Debug)]
pub struct VariableDeclarator {
    pub name: Atom,
    pub init: Option<Expression>,
}

#[derive(Debug)]
pub struct IfStatement {
    pub test: Expression,
    pub consequent: Box<Statement>,
    pub alternate: Option<Box<Statement>>,
}

#[derive(Debug)]
pub struct LoopStatement {
    pub target: LabelId,
    pub test: Expression,
    pub body: Box<Statement>,
}

#[derive(Debug)]
pub enum ForInit {
    Variable(Vec<VariableDeclarator>),
    Expression(Expression),
}

#[derive(Debug)]
pub struct ForStatement {
    pub target: LabelId,
    pub init: Option<ForInit>,
    pub test: Option<Expression>,
    pub update: Option<Expression>,
    pub body: Box<Statement>,
}

#[derive(Debug)]
pub enum ForInTarget {
    Variable(VariableDeclarator),
    Expression(Expression),
}

#[derive(Debug)]
pub struct ForInStatement {
    pub target: LabelId,
    pub left: ForInTarget,
    pub object: Expression,
    pub body: Box<Statement>,
}

#[derive(Debug)]
pub struct SwitchStatement {
    pub target: LabelId,
    pub discriminant: Expression,
    pub cases: Vec<SwitchCase>,
}

#[derive(Debug)]
pub struct SwitchCase {
    /// `None` for the `default` clause.
    pub test: Option<Expression>,
    pub body: Vec<Statement>,
}

#[derive(Debug)]
pub struct TryStatement {
    pub block: Vec<Statement>,
    pub handler: Option<CatchClause>,
    pub finalizer: Option<Vec<Statement>>,
}

#[derive(Debug)]
pub struct CatchClause {
    pub param: Atom,
    pub body: Vec<Statement>,
}

#[derive(Debug)]
pub enum Expression {
    Literal(Literal),
    Identifier(Atom),
    This,
    Array(Vec<Option<Expression>>),
    Object(Vec<(Atom, Expression)>),
    Function(Rc<FunctionLiteral>),
    Unary(UnaryOp, Box<Expression>),
    Update(UpdateOp, bool, Box<Expression>), // op, prefix, argument
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Logical(LogicalOp, Box<Expression>, Box<Expression>),
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
    Assign(AssignOp, Box<Expression>, Box<Expression>),
    Call(Box<Expression>, Vec<Expression>),
    New(Box<Expression>, Vec<Expression>),
    Member(Box<Expression>, MemberProperty),
    Sequence(Vec<Expression>),
}

#[derive(Debug)]
pub enum MemberProperty {
    Dot(Atom),
    Computed(Box<Expression>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
    Typeof,
    Void,
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    LShift,
    RShift,
    URShift,
    BitAnd,
    BitOr,
    BitXor,
    In,
    Instanceof,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    LShiftAssign,
    RShiftAssign,
    URShiftAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
}

impl AssignOp {
    /// The binary operator a compound assignment applies.
    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
            AssignOp::ModAssign => Some(BinaryOp::Mod),
            AssignOp::LShiftAssign => Some(BinaryOp::LShift),
            AssignOp::RShiftAssign => Some(BinaryOp::RShift),
            AssignOp::URShiftAssign => Some(BinaryOp::URShift),
            AssignOp::BitAndAssign => Some(BinaryOp::BitAnd),
            AssignOp::BitOrAssign => Some(BinaryOp::BitOr),
            AssignOp::BitXorAssign => Some(BinaryOp::BitXor),
        }
    }
}
