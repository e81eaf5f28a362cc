use std::io;
use std::io::prelude::*;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::ast::{BinaryOp, CaseTable, Expr, LiteralValue, LogicalOp, Stmt, TemplatePart, UnaryOp};
use crate::ctx::Context;
use crate::diag::Site;
use crate::env::Env;
use crate::value::{native_clock, Function, Value};

/// Error aborting the evaluation of a program.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("{site}: {kind}")]
    Located { site: Site, kind: ErrorKind },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RuntimeError {
    pub fn new(site: Site, kind: ErrorKind) -> RuntimeError {
        RuntimeError::Located { site, kind }
    }

    pub fn kind(&self) -> Option<&ErrorKind> {
        match self {
            RuntimeError::Located { kind, .. } => Some(kind),
            RuntimeError::Io(_) => None,
        }
    }
}

/// What went wrong at runtime, independently of where.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    #[error("Variable '{0}' is not assigned.")]
    UnassignedVariable(String),
    #[error("Cannot reassign constant '{0}'.")]
    ConstantReassigned(String),
    #[error("Operand must be a number.")]
    NumberOperand,
    #[error("Operands must be numbers.")]
    NumberOperands,
    #[error("Operands must be two numbers, strings or include a collection.")]
    AddOperands,
    #[error("Divisor has to be non-zero.")]
    DivByZero,
    #[error("Cannot remove {requested} entries from a collection of size {size}.")]
    RemoveCount { requested: usize, size: usize },
    #[error("Entry count must be a non-negative integer.")]
    InvalidCount,
    #[error("Only strings and collections can be indexed.")]
    NotIndexable,
    #[error("Index must be a non-negative integer.")]
    BadIndex,
    #[error("Index {0} is out of range.")]
    IndexOutOfRange(usize),
    #[error("Collection index overflow.")]
    IndexOverflow,
    #[error("Can only call functions.")]
    NotCallable,
    #[error("Expected {expected} arguments but got {got}.")]
    Arity { expected: usize, got: usize },
    #[error("Tuples are immutable.")]
    ImmutableCollection,
    #[error("Only collections support indexed assignment.")]
    NotCollection,
    #[error("{0}")]
    Native(String),
}

/// Outcome of executing a statement.
#[derive(Debug, PartialEq)]
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

#[derive(Debug)]
pub struct Evaluator<'t, W: Write> {
    output: &'t mut W,
    ctx: Rc<Context>,
    globals: Rc<Env>,
    /// Innermost scope of the statement being executed.
    env: Rc<Env>,
}

impl<'t, W: Write> Evaluator<'t, W> {
    pub fn new(output: &'t mut W, ctx: Rc<Context>) -> Evaluator<'t, W> {
        let globals = new_globals(&ctx);
        Evaluator {
            output,
            ctx,
            env: globals.clone(),
            globals,
        }
    }

    /// Forget every global definition.
    pub fn reset(&mut self) {
        self.globals = new_globals(&self.ctx);
        self.env = self.globals.clone();
    }

    /// Execute top-level statements in the global scope.
    ///
    /// Returns the values of the expression statements.  The first runtime error aborts the
    /// remaining statements.
    pub fn interpret(&mut self, stmts: &[Stmt]) -> Result<Vec<Value>, RuntimeError> {
        self.env = self.globals.clone();
        let result = self.interpret_all(stmts);
        if let Err(e) = &result {
            debug!(error = %e, "evaluation aborted");
        }
        result
    }

    fn interpret_all(&mut self, stmts: &[Stmt]) -> Result<Vec<Value>, RuntimeError> {
        let mut values = vec![];
        for stmt in stmts {
            match stmt {
                Stmt::Expr(e) => values.push(self.eval_expr(e)?),
                // A stray jump only ends its own statement.
                _ => {
                    self.execute(stmt)?;
                }
            }
        }
        Ok(values)
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Expr(e) => {
                self.eval_expr(e)?;
            }
            Stmt::Print(e) => {
                let v = self.eval_expr(e)?;
                writeln!(self.output, "{}", v)?;
            }
            Stmt::Var(name, init) => {
                let value = match init {
                    Some(e) => Some(self.eval_expr(e)?),
                    None => None,
                };
                self.env.define(&name.symbol, value);
            }
            Stmt::Const(name, init) => {
                let value = match init {
                    Some(e) => self.eval_expr(e)?,
                    None => Value::Nil,
                };
                self.env.define_const(&name.symbol, value);
            }
            Stmt::Function(decl) => {
                if let Some(name) = &decl.name {
                    let func = Function::User {
                        decl: decl.clone(),
                        closure: self.env.clone(),
                    };
                    self.env
                        .define(&name.symbol, Some(Value::Function(Rc::new(func))));
                }
            }
            Stmt::Block(stmts) => {
                let env = Env::with_parent(self.env.clone());
                return self.execute_block(stmts, env);
            }
            Stmt::If(cond, then_branch, else_branch) => {
                if self.eval_expr(cond)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }
            Stmt::While(cond, body) => {
                while self.eval_expr(cond)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => (),
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Continue => return Ok(Flow::Continue),
            Stmt::Return(e) => {
                let value = match e {
                    Some(e) => self.eval_expr(e)?,
                    None => Value::Nil,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::Switch(rule, cases) => return self.execute_switch(rule, cases),
        }
        Ok(Flow::Normal)
    }

    /// Run `stmts` in `env`, then restore the current scope whatever the outcome.
    fn execute_block(&mut self, stmts: &[Stmt], env: Rc<Env>) -> Result<Flow, RuntimeError> {
        let previous = std::mem::replace(&mut self.env, env);
        let result = self.execute_all(stmts);
        self.env = previous;
        result
    }

    fn execute_all(&mut self, stmts: &[Stmt]) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            match self.execute(stmt)? {
                Flow::Normal => (),
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    /// Every case whose label equals the rule runs, then the default case.  The rule is
    /// evaluated again for each label.  `break` leaves the whole switch.
    fn execute_switch(&mut self, rule: &Expr, cases: &CaseTable) -> Result<Flow, RuntimeError> {
        for (label, body) in cases.explicit() {
            let label = self.eval_expr(label)?;
            if label == self.eval_expr(rule)? {
                match self.execute_case(body)? {
                    Flow::Normal => (),
                    Flow::Break => return Ok(Flow::Normal),
                    flow => return Ok(flow),
                }
            }
        }
        if let Some(body) = cases.default_case() {
            return match self.execute_case(body)? {
                Flow::Break => Ok(Flow::Normal),
                flow => Ok(flow),
            };
        }
        Ok(Flow::Normal)
    }

    fn execute_case(&mut self, body: &[Stmt]) -> Result<Flow, RuntimeError> {
        let env = Env::with_parent(self.env.clone());
        self.execute_block(body, env)
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                LiteralValue::Nil => Value::Nil,
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::Str(s.clone()),
            }),
            Expr::Grouping(e) => self.eval_expr(e),
            Expr::Unary(op, e, site) => {
                let v = self.eval_expr(e)?;
                match (op, v) {
                    (UnaryOp::Negate, Value::Number(n)) => Ok(Value::Number(-n)),
                    (UnaryOp::Negate, _) => Err(RuntimeError::new(
                        site.clone(),
                        ErrorKind::NumberOperand,
                    )),
                    (UnaryOp::Not, v) => Ok(Value::Bool(!v.is_truthy())),
                }
            }
            Expr::Binary(lhs, op, rhs, site) => {
                let l = self.eval_expr(lhs)?;
                let r = self.eval_expr(rhs)?;
                binary(*op, l, r).map_err(at(site))
            }
            Expr::Logical(lhs, op, rhs) => {
                let l = self.eval_expr(lhs)?;
                let short_circuit = match op {
                    LogicalOp::Or => l.is_truthy(),
                    LogicalOp::And => !l.is_truthy(),
                };
                if short_circuit {
                    Ok(l)
                } else {
                    self.eval_expr(rhs)
                }
            }
            Expr::Assign(name, e) => {
                let v = self.eval_expr(e)?;
                self.env
                    .assign(&name.symbol, v.clone())
                    .map_err(at(&name.site()))?;
                Ok(v)
            }
            Expr::Variable(name) => self.env.get(&name.symbol).map_err(at(&name.site())),
            Expr::Call(callee, args, site) => {
                let callee = self.eval_expr(callee)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expr(arg)?);
                }
                self.call(callee, values, site)
            }
            Expr::Lambda(decl) => Ok(Value::Function(Rc::new(Function::User {
                decl: decl.clone(),
                closure: self.env.clone(),
            }))),
            Expr::Array(elements) => Ok(Value::collection(self.eval_all(elements)?, true)),
            Expr::Tupel(elements) => Ok(Value::collection(self.eval_all(elements)?, false)),
            Expr::ArrayCall(target, index, site) => {
                let target = self.eval_expr(target)?;
                let index = self.eval_expr(index)?;
                subscript(&target, &index).map_err(at(site))
            }
            Expr::ArrayAssign(target, index, value, site) => {
                let target = self.eval_expr(target)?;
                let index = self.eval_expr(index)?;
                let value = self.eval_expr(value)?;
                match target {
                    Value::Collection(c) => {
                        let i = as_index(&index).map_err(at(site))?;
                        c.borrow_mut().set(i, value.clone()).map_err(at(site))?;
                        Ok(value)
                    }
                    _ => Err(RuntimeError::new(site.clone(), ErrorKind::NotCollection)),
                }
            }
            Expr::Template(parts) => {
                let mut s = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => s.push_str(text),
                        TemplatePart::Expr(e) => s.push_str(&self.eval_expr(e)?.to_string()),
                    }
                }
                Ok(Value::Str(s.into()))
            }
        }
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
        exprs.iter().map(|e| self.eval_expr(e)).collect()
    }

    fn call(&mut self, callee: Value, args: Vec<Value>, site: &Site) -> Result<Value, RuntimeError> {
        let func = match callee {
            Value::Function(func) => func,
            _ => return Err(RuntimeError::new(site.clone(), ErrorKind::NotCallable)),
        };
        if args.len() != func.arity() {
            return Err(RuntimeError::new(
                site.clone(),
                ErrorKind::Arity {
                    expected: func.arity(),
                    got: args.len(),
                },
            ));
        }

        trace!(function = %func, args = args.len(), "call");
        match &*func {
            Function::Native { body, .. } => body(&args).map_err(at(site)),
            Function::User { decl, closure } => {
                let env = Env::with_parent(closure.clone());
                for (param, arg) in decl.params.iter().zip(args) {
                    env.define(&param.symbol, Some(arg));
                }
                match self.execute_block(&decl.body, env)? {
                    Flow::Return(v) => Ok(v),
                    Flow::Normal | Flow::Break | Flow::Continue => Ok(Value::Nil),
                }
            }
        }
    }
}

fn new_globals(ctx: &Context) -> Rc<Env> {
    let globals = Env::new();
    globals.add_native(&ctx.symbol("clock"), 0, native_clock);
    globals
}

fn at(site: &Site) -> impl FnOnce(ErrorKind) -> RuntimeError + '_ {
    move |kind| RuntimeError::new(site.clone(), kind)
}

fn binary(op: BinaryOp, l: Value, r: Value) -> Result<Value, ErrorKind> {
    match op {
        BinaryOp::Add => add(l, r),
        BinaryOp::Sub => subtract(l, r),
        BinaryOp::Mul => numbers(l, r).map(|(l, r)| Value::Number(l * r)),
        BinaryOp::Div => {
            let (l, r) = numbers(l, r)?;
            if r == 0.0 {
                Err(ErrorKind::DivByZero)
            } else {
                Ok(Value::Number(l / r))
            }
        }
        BinaryOp::Rem => numbers(l, r).map(|(l, r)| Value::Number(l % r)),
        BinaryOp::Less => numbers(l, r).map(|(l, r)| Value::Bool(l < r)),
        BinaryOp::LessEqual => numbers(l, r).map(|(l, r)| Value::Bool(l <= r)),
        BinaryOp::Greater => numbers(l, r).map(|(l, r)| Value::Bool(l > r)),
        BinaryOp::GreaterEqual => numbers(l, r).map(|(l, r)| Value::Bool(l >= r)),
        BinaryOp::Equal => Ok(Value::Bool(l == r)),
        BinaryOp::NotEqual => Ok(Value::Bool(l != r)),
    }
}

fn numbers(l: Value, r: Value) -> Result<(f64, f64), ErrorKind> {
    match (l, r) {
        (Value::Number(l), Value::Number(r)) => Ok((l, r)),
        _ => Err(ErrorKind::NumberOperands),
    }
}

/// Collection operands are mutated in place and returned.
fn add(l: Value, r: Value) -> Result<Value, ErrorKind> {
    match (l, r) {
        (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
        (Value::Str(l), Value::Str(r)) => Ok(Value::Str(format!("{}{}", l, r).into())),
        (Value::Str(l), Value::Number(r)) => Ok(Value::Str(format!("{}{}", l, r).into())),
        (Value::Number(l), Value::Str(r)) => Ok(Value::Str(format!("{}{}", l, r).into())),
        (Value::Collection(l), Value::Collection(r)) => {
            // `r` may be `l` itself.
            let other = r.borrow().clone();
            l.borrow_mut().concat(&other)?;
            Ok(Value::Collection(l))
        }
        (Value::Collection(l), r) => {
            l.borrow_mut().push(r);
            Ok(Value::Collection(l))
        }
        (l, Value::Collection(r)) => {
            r.borrow_mut().unshift(l)?;
            Ok(Value::Collection(r))
        }
        _ => Err(ErrorKind::AddOperands),
    }
}

/// `collection - n` drops the last `n` entries, `n - collection` the first `n`.
fn subtract(l: Value, r: Value) -> Result<Value, ErrorKind> {
    match (l, r) {
        (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l - r)),
        (Value::Collection(c), Value::Number(n)) => {
            c.borrow_mut().remove_from_end(count(n)?)?;
            Ok(Value::Collection(c))
        }
        (Value::Number(n), Value::Collection(c)) => {
            c.borrow_mut().remove_from_start(count(n)?)?;
            Ok(Value::Collection(c))
        }
        _ => Err(ErrorKind::NumberOperands),
    }
}

fn count(n: f64) -> Result<usize, ErrorKind> {
    if n >= 0.0 && n.fract() == 0.0 {
        Ok(n as usize)
    } else {
        Err(ErrorKind::InvalidCount)
    }
}

/// Largest index a string or collection accepts.
const MAX_INDEX: f64 = u32::MAX as f64;

fn as_index(index: &Value) -> Result<usize, ErrorKind> {
    match index {
        Value::Number(n) if *n >= 0.0 && *n <= MAX_INDEX && n.fract() == 0.0 => Ok(*n as usize),
        _ => Err(ErrorKind::BadIndex),
    }
}

fn subscript(target: &Value, index: &Value) -> Result<Value, ErrorKind> {
    match target {
        Value::Str(s) => {
            let i = as_index(index)?;
            s.chars()
                .nth(i)
                .map(|c| Value::Str(c.to_string().into()))
                .ok_or(ErrorKind::IndexOutOfRange(i))
        }
        Value::Collection(c) => {
            let i = as_index(index)?;
            c.borrow()
                .get(i)
                .cloned()
                .ok_or(ErrorKind::IndexOutOfRange(i))
        }
        _ => Err(ErrorKind::NotIndexable),
    }
}
