use std::fmt;

use crate::diag::Position;
use crate::interner::Symbol;

/// Kinds of "words" produced by `Scanner`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    // Punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    Semicolon,
    Colon,

    // Operators
    Minus,
    Plus,
    Slash,
    Star,
    Percent,
    MinusEqual,
    PlusEqual,
    SlashEqual,
    StarEqual,
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Templates
    Backtick,
    TemplateText,
    DollarBrace,

    // Literals
    Identifier,
    String,
    Number,

    // Keywords
    And,
    Break,
    Case,
    Class,
    Const,
    Continue,
    Default,
    Else,
    False,
    For,
    Fun,
    If,
    Maybe,
    Nil,
    Or,
    Print,
    Return,
    Super,
    Switch,
    This,
    True,
    Var,
    While,

    Eof,
}

impl TokenKind {
    /// Keywords that begin a statement.  Panic-mode recovery stops in front of these.
    pub fn starts_statement(self) -> bool {
        matches!(
            self,
            TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::Const
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return
                | TokenKind::Switch
        )
    }
}

/// Value carried by literal and identifier tokens.
#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    Number(f64),
    Str(String),
    Identifier(Symbol),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub line: Position,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: Position) -> Token {
        Token {
            kind,
            lexeme: lexeme.into(),
            literal: None,
            line,
        }
    }

    pub fn with_literal(mut self, literal: Literal) -> Token {
        self.literal = Some(literal);
        self
    }

    pub fn eof(line: Position) -> Token {
        Token::new(TokenKind::Eof, "", line)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.literal) {
            (TokenKind::Eof, _) => write!(f, "EOF"),
            (kind, Some(Literal::Number(n))) => write!(f, "{:?} {} {}", kind, self.lexeme, n),
            (kind, Some(Literal::Str(s))) => write!(f, "{:?} {} {:?}", kind, self.lexeme, s),
            (kind, _) => write!(f, "{:?} {}", kind, self.lexeme),
        }
    }
}
