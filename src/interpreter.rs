//! API to control the interpreter.

use std::io::prelude::*;
use std::rc::Rc;

use thiserror::Error;

use crate::ctx::Context;
use crate::diag::Diagnostic;
use crate::eval::{Evaluator, RuntimeError};
use crate::parser::Parser;
use crate::scanner::Scanner;
use crate::value::Value;

/// Tree-walk interpreter.
///
/// Global definitions persist across calls to [`Interpreter::eval`].  Lexical and syntax errors
/// do not stop evaluation: the statements that parsed are run and the errors are kept until
/// [`Interpreter::take_diagnostics`] is called.
///
/// # Example
///
/// Invoke the interpreter a first time to define a function then additional times to call this
/// function:
///
/// ```
/// # use flox::interpreter::{Interpreter, FloxError};
///
/// let mut output: Vec<u8> = Vec::new();
/// let mut interp = Interpreter::new(&mut output);
///
/// let func_def = r#"
///     fun max(x, y) {
///         if (x > y) {
///             return x;
///         } else {
///             return y;
///         }
///     }
/// "#;
/// interp.eval(func_def)?;
///
/// interp.eval("print max(10, 20);")?;
/// let echoed = interp.eval("max(5, 4);")?;
/// assert_eq!(echoed[0].to_string(), "5");
/// assert!(interp.take_diagnostics().is_empty());
///
/// assert_eq!(output, b"20\n");
/// # Ok::<(), FloxError>(())
/// ```
#[derive(Debug)]
pub struct Interpreter<'t, W: Write> {
    ctx: Rc<Context>,
    evaluator: Evaluator<'t, W>,
}

/// Errors the interpreter can raise.
#[derive(Debug, Error)]
pub enum FloxError {
    /// Error occurring during evaluation.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl<W: Write> Interpreter<'_, W> {
    pub fn new(output: &mut W) -> Interpreter<'_, W> {
        let ctx = Context::new();
        Interpreter {
            ctx: ctx.clone(),
            evaluator: Evaluator::new(output, ctx),
        }
    }

    /// Scan, parse and run `source`.  Returns the values of its expression statements.
    #[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
    pub fn eval(&mut self, source: &str) -> Result<Vec<Value>, FloxError> {
        let tokens = Scanner::new(source, self.ctx.clone()).scan_tokens();
        let prg = Parser::new(tokens, self.ctx.clone()).parse();
        Ok(self.evaluator.interpret(&prg)?)
    }

    /// Remove and return the lexical and syntax errors reported so far.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.ctx.take_diagnostics()
    }

    /// Drop every global definition.
    pub fn reset(&mut self) {
        self.evaluator.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::ErrorKind;

    fn interpret(input: &str) -> Result<String, FloxError> {
        let mut raw_output: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut raw_output);
        interp.eval(input)?;
        assert!(interp.take_diagnostics().is_empty());
        let output = String::from_utf8(raw_output).expect("cannot convert output to string");
        Ok(output)
    }

    #[test]
    fn print_expr() -> Result<(), FloxError> {
        assert_eq!(interpret("print 3*2;")?, "6\n");
        Ok(())
    }

    #[test]
    fn init_set_get_var() -> Result<(), FloxError> {
        assert_eq!(interpret("var foo=42; foo=24; print foo;")?, "24\n");
        Ok(())
    }

    #[test]
    fn block_with_shadowed_var() -> Result<(), FloxError> {
        assert_eq!(
            interpret("var foo=42; { var foo=24; print foo; } print foo; ")?,
            "24\n42\n"
        );
        Ok(())
    }

    #[test]
    fn inc_var_declared_in_outer_block() -> Result<(), FloxError> {
        assert_eq!(
            interpret("var foo = 2; { foo = foo + 1; } print foo; ")?,
            "3\n"
        );
        Ok(())
    }

    #[test]
    fn if_else() -> Result<(), FloxError> {
        assert_eq!(
            interpret("var foo; if (2 + 2 == 4) foo = 1; else foo = 2; print foo;")?,
            "1\n"
        );
        assert_eq!(
            interpret("var foo; if (2 + 2 != 4) foo = 1; else foo = 2; print foo;")?,
            "2\n"
        );
        Ok(())
    }

    #[test]
    fn implicit_return_is_nil() -> Result<(), FloxError> {
        assert_eq!(interpret("fun f() {} print f();")?, "nil\n");
        Ok(())
    }

    #[test]
    fn function_values_display() -> Result<(), FloxError> {
        assert_eq!(
            interpret("fun f() {} fun g(h) { print h; } print f; g(fun () {}); print clock;")?,
            "<fn f>\n<fn>\n<native fn>\n"
        );
        Ok(())
    }

    #[test]
    fn multiple_return_values_form_a_tuple() -> Result<(), FloxError> {
        assert_eq!(
            interpret("fun pair() { return 1, 2; } print pair();")?,
            "(0: 1, 1: 2,)\n"
        );
        Ok(())
    }

    #[test]
    fn static_errors_are_collected_and_good_statements_run() -> Result<(), FloxError> {
        let mut out: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut out);
        interp.eval("print 1; print ; print 2; @")?;
        let errors: Vec<String> = interp
            .take_diagnostics()
            .iter()
            .map(|d| d.to_string())
            .collect();
        assert_eq!(
            errors,
            vec![
                "[line 1] Error: Unexpected character '@'.",
                "[line 1] Error at ';': Expect expression.",
            ]
        );
        assert!(interp.take_diagnostics().is_empty());
        assert_eq!(out, b"1\n2\n");
        Ok(())
    }

    #[test]
    fn runtime_error_keeps_earlier_output() {
        let mut out: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut out);
        match interp.eval("print 1; print 1 / 0; print 2;") {
            Err(FloxError::Runtime(e)) => assert_eq!(e.kind(), Some(&ErrorKind::DivByZero)),
            out => panic!("unexpected output: {:?}", out),
        }
        assert_eq!(out, b"1\n");
    }

    #[test]
    fn reset_drops_globals() {
        let mut out: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut out);
        assert!(interp.eval("var a = 1;").is_ok());
        interp.reset();
        match interp.eval("print a;") {
            Err(FloxError::Runtime(e)) => assert_eq!(
                e.kind(),
                Some(&ErrorKind::UndefinedVariable("a".to_string()))
            ),
            out => panic!("unexpected output: {:?}", out),
        }
    }
}
