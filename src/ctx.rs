use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::diag::Diagnostic;
use crate::interner::{Interner, Symbol};
use crate::token::TokenKind;

/// State shared by the scanner, the parser and the evaluator of one interpreter.
///
/// Anchors the string interner (symbols from different contexts never compare equal), maps
/// keywords to their token kinds, and is the channel through which static errors are reported.
#[derive(Debug)]
pub struct Context {
    interner: RefCell<Interner>,
    keywords: HashMap<Symbol, TokenKind>,
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Context {
    /// Creates a new context.
    ///
    /// Returns a Rc because the context is shared between various data structures.
    pub fn new() -> Rc<Self> {
        let mut interner = Interner::new();

        let mut keywords = HashMap::new();
        for (name, kind) in KEYWORDS.iter().copied() {
            keywords.insert(interner.symbol(name), kind);
        }

        Rc::new(Context {
            interner: RefCell::new(interner),
            keywords,
            diagnostics: RefCell::new(Vec::new()),
        })
    }

    /// Intern the given string if needed and return its associated symbol.
    pub fn symbol(&self, name: &str) -> Symbol {
        self.interner.borrow_mut().symbol(name)
    }

    /// Return the token kind associated with the given symbol if it is a keyword.
    pub fn keyword(&self, id: &Symbol) -> Option<TokenKind> {
        self.keywords.get(id).copied()
    }

    /// Record a static error.
    pub fn report(&self, diagnostic: Diagnostic) {
        debug!(%diagnostic, "static error");
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    #[cfg(test)]
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.borrow().is_empty()
    }

    /// Remove and return every error reported so far.
    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }
}

const KEYWORDS: [(&str, TokenKind); 23] = [
    ("and", TokenKind::And),
    ("break", TokenKind::Break),
    ("case", TokenKind::Case),
    ("class", TokenKind::Class),
    ("const", TokenKind::Const),
    ("continue", TokenKind::Continue),
    ("default", TokenKind::Default),
    ("else", TokenKind::Else),
    ("false", TokenKind::False),
    ("for", TokenKind::For),
    ("fun", TokenKind::Fun),
    ("if", TokenKind::If),
    ("maybe", TokenKind::Maybe),
    ("nil", TokenKind::Nil),
    ("or", TokenKind::Or),
    ("print", TokenKind::Print),
    ("return", TokenKind::Return),
    ("super", TokenKind::Super),
    ("switch", TokenKind::Switch),
    ("this", TokenKind::This),
    ("true", TokenKind::True),
    ("var", TokenKind::Var),
    ("while", TokenKind::While),
];
