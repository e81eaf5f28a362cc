use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::eval::ErrorKind;
use crate::interner::Symbol;
use crate::value::{Function, NativeFn, Value};

/// One scope of variable bindings, chained to its enclosing scope.
///
/// Scopes are shared: every block, call frame and closure created inside a scope holds a
/// reference to it, so a binding mutated through one of them is visible through all the others.
#[derive(Debug, Default)]
pub struct Env {
    parent: Option<Rc<Env>>,
    bindings: RefCell<HashMap<Symbol, Binding>>,
}

#[derive(Debug)]
struct Binding {
    /// `None` until the variable is assigned.
    value: Option<Value>,
    constant: bool,
}

impl Env {
    pub fn new() -> Rc<Env> {
        Rc::new(Env::default())
    }

    pub fn with_parent(parent: Rc<Env>) -> Rc<Env> {
        Rc::new(Env {
            parent: Some(parent),
            bindings: RefCell::new(HashMap::new()),
        })
    }

    /// Create or overwrite a binding in this scope.
    pub fn define(&self, sym: &Symbol, value: Option<Value>) {
        self.bind(sym, value, false);
    }

    pub fn define_const(&self, sym: &Symbol, value: Value) {
        self.bind(sym, Some(value), true);
    }

    fn bind(&self, sym: &Symbol, value: Option<Value>, constant: bool) {
        self.bindings
            .borrow_mut()
            .insert(sym.clone(), Binding { value, constant });
    }

    pub fn get(&self, sym: &Symbol) -> Result<Value, ErrorKind> {
        match self.bindings.borrow().get(sym) {
            Some(Binding { value: Some(v), .. }) => Ok(v.clone()),
            Some(Binding { value: None, .. }) => {
                Err(ErrorKind::UnassignedVariable(sym.name().to_owned()))
            }
            None => match &self.parent {
                Some(parent) => parent.get(sym),
                None => Err(ErrorKind::UndefinedVariable(sym.name().to_owned())),
            },
        }
    }

    /// Update the innermost existing binding of `sym`.  Never creates a binding.
    pub fn assign(&self, sym: &Symbol, value: Value) -> Result<(), ErrorKind> {
        if let Some(binding) = self.bindings.borrow_mut().get_mut(sym) {
            if binding.constant {
                return Err(ErrorKind::ConstantReassigned(sym.name().to_owned()));
            }
            binding.value = Some(value);
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.assign(sym, value),
            None => Err(ErrorKind::UndefinedVariable(sym.name().to_owned())),
        }
    }

    pub fn add_native(&self, name: &Symbol, arity: usize, body: NativeFn) {
        let native = Function::Native {
            name: name.clone(),
            arity,
            body,
        };
        self.define(name, Some(Value::Function(Rc::new(native))));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctx::Context;

    #[test]
    fn define_then_get() -> Result<(), ErrorKind> {
        let ctx = Context::new();
        let env = Env::new();
        env.define(&ctx.symbol("a"), Some(Value::Number(1.0)));
        assert_eq!(env.get(&ctx.symbol("a"))?, Value::Number(1.0));
        Ok(())
    }

    #[test]
    fn lookup_walks_the_parent_chain() -> Result<(), ErrorKind> {
        let ctx = Context::new();
        let outer = Env::new();
        outer.define(&ctx.symbol("a"), Some(Value::Bool(true)));
        let inner = Env::with_parent(Env::with_parent(outer));
        assert_eq!(inner.get(&ctx.symbol("a"))?, Value::Bool(true));
        Ok(())
    }

    #[test]
    fn define_shadows_without_touching_parent() -> Result<(), ErrorKind> {
        let ctx = Context::new();
        let a = ctx.symbol("a");
        let outer = Env::new();
        outer.define(&a, Some(Value::Number(1.0)));
        let inner = Env::with_parent(outer.clone());
        inner.define(&a, Some(Value::Number(2.0)));
        assert_eq!(inner.get(&a)?, Value::Number(2.0));
        assert_eq!(outer.get(&a)?, Value::Number(1.0));
        Ok(())
    }

    #[test]
    fn assign_updates_enclosing_scope() -> Result<(), ErrorKind> {
        let ctx = Context::new();
        let a = ctx.symbol("a");
        let outer = Env::new();
        outer.define(&a, Some(Value::Number(1.0)));
        let inner = Env::with_parent(outer.clone());
        inner.assign(&a, Value::Number(3.0))?;
        assert_eq!(outer.get(&a)?, Value::Number(3.0));
        Ok(())
    }

    #[test]
    fn undefined_variable() {
        let ctx = Context::new();
        let env = Env::new();
        match env.get(&ctx.symbol("nope")) {
            Err(ErrorKind::UndefinedVariable(name)) if name == "nope" => (),
            out => panic!("unexpected output: {:?}", out),
        }
        match env.assign(&ctx.symbol("nope"), Value::Nil) {
            Err(ErrorKind::UndefinedVariable(_)) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn unassigned_variable() {
        let ctx = Context::new();
        let env = Env::new();
        env.define(&ctx.symbol("a"), None);
        match env.get(&ctx.symbol("a")) {
            Err(ErrorKind::UnassignedVariable(_)) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn constant_cannot_be_reassigned() {
        let ctx = Context::new();
        let env = Env::new();
        env.define_const(&ctx.symbol("k"), Value::Number(1.0));
        match env.assign(&ctx.symbol("k"), Value::Number(2.0)) {
            Err(ErrorKind::ConstantReassigned(_)) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }
}
