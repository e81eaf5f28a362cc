use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ast::FunctionDecl;
use crate::collection::Collection;
use crate::env::Env;
use crate::eval::ErrorKind;
use crate::interner::Symbol;

/// Result of evaluating an expression.
///
/// Collections and functions are shared by reference: copying a `Value` never copies them.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Collection(Rc<RefCell<Collection>>),
    Function(Rc<Function>),
}

impl Value {
    pub fn collection(values: Vec<Value>, mutable: bool) -> Value {
        Value::Collection(Rc::new(RefCell::new(Collection::new(values, mutable))))
    }

    /// `nil` and `false` are falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::Number(l), Value::Number(r)) => l == r,
            (Value::Str(l), Value::Str(r)) => l == r,
            (Value::Collection(l), Value::Collection(r)) => Rc::ptr_eq(l, r),
            (Value::Function(l), Value::Function(r)) => Rc::ptr_eq(l, r),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) if n.is_infinite() => {
                write!(f, "{}", if *n > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Collection(c) => write!(f, "{}", c.borrow()),
            Value::Function(func) => write!(f, "{}", func),
        }
    }
}

pub type NativeFn = fn(&[Value]) -> Result<Value, ErrorKind>;

/// Anything that can be called.
pub enum Function {
    Native {
        name: Symbol,
        arity: usize,
        body: NativeFn,
    },
    /// Named function or lambda, with the scope it was created in.
    User {
        decl: Rc<FunctionDecl>,
        closure: Rc<Env>,
    },
}

impl Function {
    pub fn arity(&self) -> usize {
        match self {
            Function::Native { arity, .. } => *arity,
            Function::User { decl, .. } => decl.params.len(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Function::Native { name, .. } => Some(name.name()),
            Function::User { decl, .. } => decl.name.as_ref().map(|n| n.symbol.name()),
        }
    }
}

// The closure is left out: it usually contains the function itself.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .finish()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Native { .. } => write!(f, "<native fn>"),
            Function::User { decl, .. } => match &decl.name {
                Some(name) => write!(f, "<fn {}>", name.symbol),
                None => write!(f, "<fn>"),
            },
        }
    }
}

/// Milliseconds since the Unix epoch.
pub fn native_clock(_args: &[Value]) -> Result<Value, ErrorKind> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| ErrorKind::Native(e.to_string()))?;
    Ok(Value::Number(now.as_millis() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::Str(Rc::from("")).is_truthy());
    }

    #[test]
    fn equality_is_strict() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_ne!(Value::Number(1.0), Value::Str(Rc::from("1")));
        assert_eq!(Value::Str(Rc::from("a")), Value::Str(Rc::from("a")));
    }

    #[test]
    fn collections_compare_by_identity() {
        let a = Value::collection(vec![Value::Number(1.0)], true);
        let b = Value::collection(vec![Value::Number(1.0)], true);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn integral_numbers_print_without_fraction() {
        assert_eq!(Value::Number(7.0).to_string(), "7");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
    }

    #[test]
    fn infinities_print_spelled_out() {
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::Number(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
    }

    #[test]
    fn clock_is_in_milliseconds() -> Result<(), ErrorKind> {
        match native_clock(&[])? {
            Value::Number(n) => assert!(n > 1e12),
            out => panic!("unexpected output: {:?}", out),
        }
        Ok(())
    }
}
