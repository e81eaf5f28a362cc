//! A tree-walking interpreter for Flox, a small dynamically typed scripting language in the Lox
//! family.
//!
//! Besides the usual Lox statements, Flox has arrays and tuples, string templates, `switch`,
//! `break` / `continue`, constants and lambdas passed as arguments.
//!
//! # Examples
//!
//! See [`crate::interpreter::Interpreter`].
//!
//! # Limitations
//!
//! - `class`, `this` and `super` are reserved words without any meaning yet.
//! - Functions capture their defining scope, so a function stored in that scope is never freed.

#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

pub mod interpreter;

mod ast;
mod collection;
mod ctx;
mod diag;
mod env;
mod eval;
mod interner;
mod parser;
mod scanner;
mod token;
mod value;

pub use collection::Collection;
pub use diag::{At, Diagnostic, Position, Site};
pub use eval::{ErrorKind, RuntimeError};
pub use value::{Function, Value};
