use std::rc::Rc;

use crate::diag::{Position, Site};
use crate::interner::Symbol;

/// A name as written in the source.
#[derive(Debug, PartialEq, Clone)]
pub struct Name {
    pub symbol: Symbol,
    pub line: Position,
}

impl Name {
    pub fn site(&self) -> Site {
        Site::lexeme(self.line, self.symbol.name())
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Stmt {
    Expr(Box<Expr>),
    Print(Box<Expr>),
    Var(Name, Option<Box<Expr>>),
    Const(Name, Option<Box<Expr>>),
    Function(Rc<FunctionDecl>),
    Block(Vec<Stmt>),
    If(Box<Expr>, Box<Stmt>, Option<Box<Stmt>>),
    While(Box<Expr>, Box<Stmt>),
    Break,
    Continue,
    Return(Option<Box<Expr>>),
    Switch(Box<Expr>, CaseTable),
}

/// Named functions and lambdas share this representation.  It is reference counted so function
/// values can point at their declaration without copying the body.
#[derive(Debug, PartialEq)]
pub struct FunctionDecl {
    pub name: Option<Name>,
    pub params: Vec<Name>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum CaseLabel {
    Expr(Expr),
    Default,
}

/// Cases of a `switch`, in declaration order.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct CaseTable {
    cases: Vec<(CaseLabel, Vec<Stmt>)>,
}

impl CaseTable {
    pub fn new() -> CaseTable {
        CaseTable::default()
    }

    pub fn push(&mut self, label: CaseLabel, body: Vec<Stmt>) {
        self.cases.push((label, body));
    }

    pub fn has_default(&self) -> bool {
        self.default_case().is_some()
    }

    /// Cases with an expression label, in declaration order.
    pub fn explicit(&self) -> impl Iterator<Item = (&Expr, &[Stmt])> + '_ {
        self.cases.iter().filter_map(|(label, body)| match label {
            CaseLabel::Expr(e) => Some((e, body.as_slice())),
            CaseLabel::Default => None,
        })
    }

    pub fn default_case(&self) -> Option<&[Stmt]> {
        self.cases.iter().find_map(|(label, body)| match label {
            CaseLabel::Default => Some(body.as_slice()),
            CaseLabel::Expr(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum LiteralValue {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, PartialEq, Clone)]
pub enum TemplatePart {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Literal(LiteralValue),
    Grouping(Box<Expr>),
    Unary(UnaryOp, Box<Expr>, Site),
    Binary(Box<Expr>, BinaryOp, Box<Expr>, Site),
    Logical(Box<Expr>, LogicalOp, Box<Expr>),
    Assign(Name, Box<Expr>),
    Variable(Name),
    Call(Box<Expr>, Vec<Expr>, Site),
    Lambda(Rc<FunctionDecl>),
    Array(Vec<Expr>),
    Tupel(Vec<Expr>),
    ArrayCall(Box<Expr>, Box<Expr>, Site),
    ArrayAssign(Box<Expr>, Box<Expr>, Box<Expr>, Site),
    Template(Vec<TemplatePart>),
}

impl Expr {
    pub fn nil() -> Expr {
        Expr::Literal(LiteralValue::Nil)
    }

    pub fn boolean(b: bool) -> Expr {
        Expr::Literal(LiteralValue::Bool(b))
    }

    pub fn number(n: f64) -> Expr {
        Expr::Literal(LiteralValue::Number(n))
    }

    pub fn string(s: &str) -> Expr {
        Expr::Literal(LiteralValue::Str(Rc::from(s)))
    }
}
