//! Shape of the errors reported to the user.
//!
//! Every error, static or runtime, renders as `[line L] Error<where>: <message>`.

use std::fmt;

use thiserror::Error;

use crate::token::{Token, TokenKind};

/// Line number (starting at one).
pub type Position = u32;

/// Which part of the source an error points at.
#[derive(Debug, Clone, PartialEq)]
pub enum At {
    /// No particular token, e.g. a bad character found by the scanner.
    Unknown,
    /// The end-of-input token.
    End,
    /// A token with the given lexeme.
    Lexeme(String),
}

impl fmt::Display for At {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            At::Unknown => Ok(()),
            At::End => write!(f, " at end"),
            At::Lexeme(lexeme) => write!(f, " at '{}'", lexeme),
        }
    }
}

/// Source location attached to AST nodes that can fail at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub line: Position,
    pub at: At,
}

impl Site {
    pub fn new(line: Position, at: At) -> Site {
        Site { line, at }
    }

    pub fn lexeme(line: Position, lexeme: &str) -> Site {
        Site::new(line, At::Lexeme(lexeme.to_string()))
    }
}

impl From<&Token> for Site {
    fn from(token: &Token) -> Site {
        let at = match token.kind {
            TokenKind::Eof => At::End,
            _ => At::Lexeme(token.lexeme.clone()),
        };
        Site::new(token.line, at)
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error{}", self.line, self.at)
    }
}

/// A lexical or syntax error.  These never stop scanning or parsing.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{site}: {message}")]
pub struct Diagnostic {
    pub site: Site,
    pub message: String,
}

impl Diagnostic {
    pub fn new(site: Site, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            site,
            message: message.into(),
        }
    }
}
