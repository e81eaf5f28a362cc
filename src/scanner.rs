//! Lexical analyzer

use std::rc::Rc;

use crate::ctx::Context;
use crate::diag::{At, Diagnostic, Position, Site};
use crate::token::{Literal, Token, TokenKind};

/// What the characters under the cursor mean.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    /// Plain code.
    Normal,
    /// Text between backticks: every character is significant.
    Template,
    /// Code inside `${ ... }`.  `depth` counts the braces opened since `${`.
    Interpolation { depth: u32 },
}

/// Turn source text into a sequence of tokens.
///
/// Errors are reported through the `Context` and scanning goes on, so the result always ends
/// with exactly one `Eof` token.
#[derive(Debug)]
pub struct Scanner {
    source: Vec<char>,
    start: usize,
    current: usize,
    line: Position,
    ctx: Rc<Context>,
    tokens: Vec<Token>,
}

impl Scanner {
    /// Creates a new scanner operating on `source`.
    pub fn new(source: &str, ctx: Rc<Context>) -> Scanner {
        Scanner {
            source: source.chars().collect(),
            start: 0,
            current: 0,
            line: 1,
            ctx,
            tokens: Vec::new(),
        }
    }

    pub fn scan_tokens(mut self) -> Vec<Token> {
        // Backticks and `${` nest, so the mode is a stack.  The bottom is always Normal.
        let mut modes = vec![Mode::Normal];
        while !self.is_at_end() {
            self.start = self.current;
            match modes.last().copied().unwrap_or(Mode::Normal) {
                Mode::Template => self.scan_template_char(&mut modes),
                Mode::Normal | Mode::Interpolation { .. } => self.scan_token(&mut modes),
            }
        }

        if modes.len() > 1 {
            self.error("Unterminated template.");
        }

        self.tokens.push(Token::eof(self.line));
        self.tokens
    }

    fn scan_token(&mut self, modes: &mut Vec<Mode>) {
        let ch = self.advance();
        match ch {
            '(' => self.add_token(TokenKind::LeftParen),
            ')' => self.add_token(TokenKind::RightParen),
            '[' => self.add_token(TokenKind::LeftBracket),
            ']' => self.add_token(TokenKind::RightBracket),
            ',' => self.add_token(TokenKind::Comma),
            '.' => self.add_token(TokenKind::Dot),
            ';' => self.add_token(TokenKind::Semicolon),
            ':' => self.add_token(TokenKind::Colon),
            '%' => self.add_token(TokenKind::Percent),
            '{' => {
                if let Some(Mode::Interpolation { depth }) = modes.last_mut() {
                    *depth += 1;
                }
                self.add_token(TokenKind::LeftBrace);
            }
            '}' => {
                if matches!(modes.last(), Some(Mode::Interpolation { depth: 0 })) {
                    modes.pop();
                } else if let Some(Mode::Interpolation { depth }) = modes.last_mut() {
                    *depth -= 1;
                }
                self.add_token(TokenKind::RightBrace);
            }
            '`' => {
                modes.push(Mode::Template);
                self.add_token(TokenKind::Backtick);
            }
            '-' => self.add_either('=', TokenKind::MinusEqual, TokenKind::Minus),
            '+' => self.add_either('=', TokenKind::PlusEqual, TokenKind::Plus),
            '*' => self.add_either('=', TokenKind::StarEqual, TokenKind::Star),
            '!' => self.add_either('=', TokenKind::BangEqual, TokenKind::Bang),
            '=' => self.add_either('=', TokenKind::EqualEqual, TokenKind::Equal),
            '<' => self.add_either('=', TokenKind::LessEqual, TokenKind::Less),
            '>' => self.add_either('=', TokenKind::GreaterEqual, TokenKind::Greater),
            '/' => {
                if self.match_char('/') {
                    while self.peek() != Some('\n') && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_either('=', TokenKind::SlashEqual, TokenKind::Slash);
                }
            }
            ' ' | '\r' | '\t' => (),
            '\n' => self.line += 1,
            '"' => self.scan_line_string(),
            '\'' => self.scan_multiline_string(),
            '0'..='9' => self.scan_number(),
            'a'..='z' | 'A'..='Z' | '_' => self.scan_identifier(),
            _ => self.error(&format!("Unexpected character '{}'.", ch)),
        }
    }

    /// One character of template text, or the backtick / `${` that ends it.
    fn scan_template_char(&mut self, modes: &mut Vec<Mode>) {
        let ch = self.advance();
        match ch {
            '`' => {
                modes.pop();
                self.add_token(TokenKind::Backtick);
            }
            '$' if self.peek() == Some('{') => {
                self.advance();
                modes.push(Mode::Interpolation { depth: 0 });
                self.add_token(TokenKind::DollarBrace);
            }
            '\\' => match self.peek() {
                Some(escaped) => {
                    self.advance();
                    if escaped == '\n' {
                        self.line += 1;
                    }
                    self.add_text(escaped);
                }
                None => self.add_text('\\'),
            },
            _ => {
                if ch == '\n' {
                    self.line += 1;
                }
                self.add_text(ch);
            }
        }
    }

    /// Double-quoted string: must end on the line it starts.
    fn scan_line_string(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '"' || ch == '\n' {
                break;
            }
            self.advance();
        }

        if self.peek() != Some('"') {
            self.error("Unterminated string.");
            return;
        }

        self.advance();
        self.add_string();
    }

    /// Single-quoted string: may span lines.
    fn scan_multiline_string(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\'' {
                break;
            }
            if ch == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.error("Unterminated string.");
            return;
        }

        self.advance();
        self.add_string();
    }

    fn add_string(&mut self) {
        let value: String = self.source[self.start + 1..self.current - 1].iter().collect();
        self.add_literal(TokenKind::String, Literal::Str(value));
    }

    fn scan_number(&mut self) {
        while self.peek().map_or(false, |ch| ch.is_ascii_digit()) {
            self.advance();
        }

        // A '.' is only part of the number when a digit follows it.
        if self.peek() == Some('.') && self.peek_next().map_or(false, |ch| ch.is_ascii_digit()) {
            self.advance();
            while self.peek().map_or(false, |ch| ch.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = self.lexeme();
        match text.parse::<f64>() {
            Ok(n) => self.add_literal(TokenKind::Number, Literal::Number(n)),
            Err(_) => self.error(&format!("Cannot parse number '{}'.", text)),
        }
    }

    fn scan_identifier(&mut self) {
        while self
            .peek()
            .map_or(false, |ch| ch.is_ascii_alphanumeric() || ch == '_')
        {
            self.advance();
        }

        let sym = self.ctx.symbol(&self.lexeme());
        match self.ctx.keyword(&sym) {
            Some(kind) => self.add_token(kind),
            None => self.add_literal(TokenKind::Identifier, Literal::Identifier(sym)),
        }
    }

    fn add_either(&mut self, second: char, matched: TokenKind, single: TokenKind) {
        let kind = if self.match_char(second) {
            matched
        } else {
            single
        };
        self.add_token(kind);
    }

    fn add_token(&mut self, kind: TokenKind) {
        let token = Token::new(kind, self.lexeme(), self.line);
        self.tokens.push(token);
    }

    fn add_literal(&mut self, kind: TokenKind, literal: Literal) {
        let token = Token::new(kind, self.lexeme(), self.line).with_literal(literal);
        self.tokens.push(token);
    }

    fn add_text(&mut self, ch: char) {
        self.add_literal(TokenKind::TemplateText, Literal::Str(ch.to_string()));
    }

    fn error(&self, message: &str) {
        self.ctx
            .report(Diagnostic::new(Site::new(self.line, At::Unknown), message));
    }

    fn lexeme(&self) -> String {
        self.source[self.start..self.current].iter().collect()
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    /// Return the next character.  Only call when not at end.
    fn advance(&mut self) -> char {
        let ch = self.source[self.current];
        self.current += 1;
        ch
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.current).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.source.get(self.current + 1).copied()
    }
}
