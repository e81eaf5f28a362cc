use std::rc::Rc;

use crate::ast::{
    BinaryOp, CaseLabel, CaseTable, Expr, FunctionDecl, LogicalOp, Name, Stmt, TemplatePart,
    UnaryOp,
};
use crate::ctx::Context;
use crate::diag::{Diagnostic, Site};
use crate::token::{Literal, Token, TokenKind};

const MAX_ARGS: usize = 255;

/// Marker for a syntax error that was already reported.  Unwinds to the closest declaration,
/// where the parser resynchronizes.
#[derive(Debug)]
struct ParseError;

type ParseResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    ctx: Rc<Context>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>, ctx: Rc<Context>) -> Parser {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::eof(line));
        }
        Parser {
            tokens,
            current: 0,
            ctx,
        }
    }

    /// Parse a whole program.  Statements that fail to parse are reported and left out.
    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut prg = vec![];
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                prg.push(stmt);
            }
        }
        prg
    }

    #[cfg(test)]
    fn parse_expression(&mut self) -> Option<Expr> {
        self.expression().ok()
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let stmt = self.try_declaration();
        self.recover(stmt)
    }

    /// A statement directly inside a block, where `break` and `continue` are allowed.
    fn block_declaration(&mut self) -> Option<Stmt> {
        let stmt = if self.match_kind(TokenKind::Break) {
            self.jump(Stmt::Break, "Expect ';' after 'break'.")
        } else if self.match_kind(TokenKind::Continue) {
            self.jump(Stmt::Continue, "Expect ';' after 'continue'.")
        } else {
            self.try_declaration()
        };
        self.recover(stmt)
    }

    fn recover(&mut self, stmt: ParseResult<Stmt>) -> Option<Stmt> {
        match stmt {
            Ok(stmt) => Some(stmt),
            Err(ParseError) => {
                self.synchronize();
                None
            }
        }
    }

    fn try_declaration(&mut self) -> ParseResult<Stmt> {
        if self.match_kind(TokenKind::Fun) {
            self.fun_decl()
        } else if self.match_kind(TokenKind::Var) {
            let (name, init) = self.var_decl(false)?;
            Ok(Stmt::Var(name, init))
        } else if self.match_kind(TokenKind::Const) {
            let (name, init) = self.var_decl(true)?;
            Ok(Stmt::Const(name, init))
        } else {
            self.statement()
        }
    }

    /// Parse variable or constant declaration.
    /// Current token is the one following `var` / `const`.
    fn var_decl(&mut self, constant: bool) -> ParseResult<(Name, Option<Box<Expr>>)> {
        let name = self.identifier("Expect variable name.")?;
        let init = if self.match_kind(TokenKind::Equal) {
            Some(Box::new(self.expression()?))
        } else if constant {
            return Err(self.error_at_current("Expect '=' after constant name."));
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.")?;
        Ok((name, init))
    }

    fn fun_decl(&mut self) -> ParseResult<Stmt> {
        let name = self.identifier("Expect function name.")?;
        self.consume(TokenKind::LeftParen, "Expect '(' after function name.")?;
        let decl = self.function_rest(Some(name))?;
        Ok(Stmt::Function(Rc::new(decl)))
    }

    /// Parameters and body, shared by named functions and lambdas.
    /// Current token follows the opening parenthesis.
    fn function_rest(&mut self, name: Option<Name>) -> ParseResult<FunctionDecl> {
        let mut params = vec![];
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= MAX_ARGS {
                    self.report_at_current(&format!(
                        "Can't have more than {} parameters.",
                        MAX_ARGS
                    ));
                }
                params.push(self.identifier("Expect parameter name.")?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.")?;
        let body = self.block_body()?;
        Ok(FunctionDecl { name, params, body })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.match_kind(TokenKind::Print) {
            let expr = Box::new(self.expression()?);
            self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
            Ok(Stmt::Print(expr))
        } else if self.match_kind(TokenKind::LeftBrace) {
            Ok(Stmt::Block(self.block_body()?))
        } else if self.match_kind(TokenKind::If) {
            self.if_stmt()
        } else if self.match_kind(TokenKind::For) {
            self.for_stmt()
        } else if self.match_kind(TokenKind::While) {
            self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
            let cond = Box::new(self.expression()?);
            self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;
            let body = Box::new(self.statement()?);
            Ok(Stmt::While(cond, body))
        } else if self.match_kind(TokenKind::Switch) {
            self.switch_stmt()
        } else if self.match_kind(TokenKind::Return) {
            self.return_stmt()
        } else {
            let expr = Box::new(self.expression()?);
            self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
            Ok(Stmt::Expr(expr))
        }
    }

    fn if_stmt(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let cond = Box::new(self.expression()?);
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_kind(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If(cond, then_branch, else_branch))
    }

    /// `for (init; cond; incr) body` becomes `{ init; while (cond) { body; incr; } }`.
    fn for_stmt(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        let init = if self.match_kind(TokenKind::Semicolon) {
            None
        } else if self.match_kind(TokenKind::Var) {
            let (name, init) = self.var_decl(false)?;
            Some(Stmt::Var(name, init))
        } else {
            let expr = Box::new(self.expression()?);
            self.consume(TokenKind::Semicolon, "Expect ';' after loop initializer.")?;
            Some(Stmt::Expr(expr))
        };

        let cond = if self.check(TokenKind::Semicolon) {
            Expr::boolean(true)
        } else {
            self.expression()?
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let incr = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;
        if let Some(incr) = incr {
            body = Stmt::Block(vec![body, Stmt::Expr(Box::new(incr))]);
        }
        body = Stmt::While(Box::new(cond), Box::new(body));
        if let Some(init) = init {
            body = Stmt::Block(vec![init, body]);
        }
        Ok(body)
    }

    /// `switch rule: case e1: { ... } case e2: { ... } default: { ... }`
    fn switch_stmt(&mut self) -> ParseResult<Stmt> {
        let rule = Box::new(self.expression()?);
        self.consume(TokenKind::Colon, "Expect ':' after switch expression.")?;

        let mut cases = CaseTable::new();
        loop {
            if self.match_kind(TokenKind::Case) {
                let label = self.expression()?;
                self.consume(TokenKind::Colon, "Expect ':' after case expression.")?;
                let body = self.case_body()?;
                cases.push(CaseLabel::Expr(label), body);
            } else if self.match_kind(TokenKind::Default) {
                if cases.has_default() {
                    self.report_at_previous("Switch can only have one default case.");
                }
                self.consume(TokenKind::Colon, "Expect ':' after 'default'.")?;
                let body = self.case_body()?;
                cases.push(CaseLabel::Default, body);
            } else {
                break;
            }
        }

        Ok(Stmt::Switch(rule, cases))
    }

    fn case_body(&mut self) -> ParseResult<Vec<Stmt>> {
        self.consume(TokenKind::LeftBrace, "Expect '{' before case body.")?;
        self.block_body()
    }

    fn return_stmt(&mut self) -> ParseResult<Stmt> {
        if self.match_kind(TokenKind::Semicolon) {
            return Ok(Stmt::Return(None));
        }

        let first = self.expression()?;
        let value = if self.check(TokenKind::Comma) {
            let mut values = vec![first];
            while self.match_kind(TokenKind::Comma) {
                values.push(self.expression()?);
            }
            Expr::Tupel(values)
        } else {
            first
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return(Some(Box::new(value))))
    }

    fn jump(&mut self, stmt: Stmt, message: &str) -> ParseResult<Stmt> {
        self.consume(TokenKind::Semicolon, message)?;
        Ok(stmt)
    }

    /// Statements up to and including the closing brace.
    /// Current token follows the opening brace.
    fn block_body(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut stmts = vec![];
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.block_declaration() {
                stmts.push(stmt);
            }
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(stmts)
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let lhs = self.or()?;

        let compound = match self.peek().kind {
            TokenKind::Equal => None,
            TokenKind::PlusEqual => Some(BinaryOp::Add),
            TokenKind::MinusEqual => Some(BinaryOp::Sub),
            TokenKind::StarEqual => Some(BinaryOp::Mul),
            TokenKind::SlashEqual => Some(BinaryOp::Div),
            _ => return Ok(lhs),
        };
        let equals = self.advance().clone();
        let rhs = self.assignment()?;

        // `x op= v` is `x = x op v`.
        let value = match compound {
            Some(op) => Expr::Binary(
                Box::new(lhs.clone()),
                op,
                Box::new(rhs),
                Site::from(&equals),
            ),
            None => rhs,
        };

        match lhs {
            Expr::Variable(name) => Ok(Expr::Assign(name, Box::new(value))),
            Expr::ArrayCall(target, index, site) => {
                Ok(Expr::ArrayAssign(target, index, Box::new(value), site))
            }
            _ => {
                self.report(Site::from(&equals), "Invalid assignment target.");
                Ok(lhs)
            }
        }
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;
        while self.match_kind(TokenKind::Or) {
            let rhs = self.and()?;
            expr = Expr::Logical(Box::new(expr), LogicalOp::Or, Box::new(rhs));
        }
        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        while self.match_kind(TokenKind::And) {
            let rhs = self.equality()?;
            expr = Expr::Logical(Box::new(expr), LogicalOp::And, Box::new(rhs));
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqualEqual => BinaryOp::Equal,
                TokenKind::BangEqual => BinaryOp::NotEqual,
                _ => break,
            };
            let site = Site::from(self.advance());
            let rhs = self.comparison()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(rhs), site);
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEqual => BinaryOp::LessEqual,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                _ => break,
            };
            let site = Site::from(self.advance());
            let rhs = self.term()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(rhs), site);
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let site = Site::from(self.advance());
            let rhs = self.factor()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(rhs), site);
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => break,
            };
            let site = Site::from(self.advance());
            let rhs = self.unary()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(rhs), site);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.call(),
        };
        let site = Site::from(self.advance());
        Ok(Expr::Unary(op, Box::new(self.unary()?), site))
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.match_kind(TokenKind::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_kind(TokenKind::LeftBracket) {
                let site = Site::from(self.previous());
                let index = self.expression()?;
                self.consume(TokenKind::RightBracket, "Expect ']' after index.")?;
                expr = Expr::ArrayCall(Box::new(expr), Box::new(index), site);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut args = vec![];
        if !self.check(TokenKind::RightParen) {
            loop {
                if args.len() >= MAX_ARGS {
                    self.report_at_current(&format!(
                        "Can't have more than {} arguments.",
                        MAX_ARGS
                    ));
                }
                // Lambdas are only allowed as arguments.
                let arg = if self.match_kind(TokenKind::Fun) {
                    self.consume(TokenKind::LeftParen, "Expect '(' after 'fun'.")?;
                    Expr::Lambda(Rc::new(self.function_rest(None)?))
                } else {
                    self.expression()?
                };
                args.push(arg);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?;
        let site = Site::from(paren);
        Ok(Expr::Call(Box::new(callee), args, site))
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();
        let expr = match token.kind {
            TokenKind::True => Expr::boolean(true),
            TokenKind::False => Expr::boolean(false),
            TokenKind::Nil => Expr::nil(),
            TokenKind::Maybe => Expr::boolean(rand::random::<bool>()),
            TokenKind::Number => match token.literal {
                Some(Literal::Number(n)) => Expr::number(n),
                _ => return Err(self.error_at_current("Malformed number literal.")),
            },
            TokenKind::String => match &token.literal {
                Some(Literal::Str(s)) => Expr::string(s),
                _ => return Err(self.error_at_current("Malformed string literal.")),
            },
            TokenKind::Identifier => Expr::Variable(self.identifier("Expect expression.")?),
            TokenKind::LeftParen => {
                self.advance();
                return self.grouping_or_tuple();
            }
            TokenKind::LeftBracket => {
                self.advance();
                let elements = self.elements(TokenKind::RightBracket)?;
                self.consume(TokenKind::RightBracket, "Expect ']' after array elements.")?;
                return Ok(Expr::Array(elements));
            }
            TokenKind::Backtick => {
                self.advance();
                return self.template();
            }
            _ => return Err(self.error_at_current("Expect expression.")),
        };
        if token.kind != TokenKind::Identifier {
            self.advance();
        }
        Ok(expr)
    }

    /// `(e)` is a grouping, `(e,)`, `(a, b)` and `()` are tuples.
    /// Current token follows the opening parenthesis.
    fn grouping_or_tuple(&mut self) -> ParseResult<Expr> {
        if self.match_kind(TokenKind::RightParen) {
            return Ok(Expr::Tupel(vec![]));
        }

        let first = self.expression()?;
        if self.match_kind(TokenKind::Comma) {
            let mut elements = vec![first];
            elements.extend(self.elements(TokenKind::RightParen)?);
            self.consume(TokenKind::RightParen, "Expect ')' after tuple elements.")?;
            Ok(Expr::Tupel(elements))
        } else {
            self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
            Ok(Expr::Grouping(Box::new(first)))
        }
    }

    /// Comma separated expressions up to (not including) `close`.  A trailing comma is allowed.
    fn elements(&mut self, close: TokenKind) -> ParseResult<Vec<Expr>> {
        let mut elements = vec![];
        while !self.check(close) && !self.is_at_end() {
            elements.push(self.expression()?);
            if !self.match_kind(TokenKind::Comma) {
                break;
            }
        }
        Ok(elements)
    }

    /// Current token follows the opening backtick.
    fn template(&mut self) -> ParseResult<Expr> {
        let mut parts = vec![];
        let mut text = String::new();
        loop {
            if self.match_kind(TokenKind::TemplateText) {
                if let Some(Literal::Str(s)) = &self.previous().literal {
                    text.push_str(s);
                }
            } else if self.match_kind(TokenKind::DollarBrace) {
                if !text.is_empty() {
                    parts.push(TemplatePart::Text(std::mem::take(&mut text)));
                }
                let expr = self.expression()?;
                self.consume(TokenKind::RightBrace, "Expect '}' after template expression.")?;
                parts.push(TemplatePart::Expr(expr));
            } else if self.match_kind(TokenKind::Backtick) {
                break;
            } else {
                return Err(self.error_at_current("Expect '`' after template."));
            }
        }
        if !text.is_empty() {
            parts.push(TemplatePart::Text(text));
        }
        Ok(Expr::Template(parts))
    }

    fn identifier(&mut self, message: &str) -> ParseResult<Name> {
        let token = self.consume(TokenKind::Identifier, message)?;
        let line = token.line;
        let symbol = match &token.literal {
            Some(Literal::Identifier(symbol)) => Some(symbol.clone()),
            _ => None,
        };
        match symbol {
            Some(symbol) => Ok(Name { symbol, line }),
            None => Err(self.error_at_previous(message)),
        }
    }

    /// Skip tokens up to the next statement boundary.
    fn synchronize(&mut self) {
        if !self.is_at_end() {
            self.advance();
        }
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon || self.peek().kind.starts_statement()
            {
                return;
            }
            self.advance();
        }
    }

    fn consume(&mut self, expected: TokenKind, message: &str) -> ParseResult<&Token> {
        if self.check(expected) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(message))
        }
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn report(&self, site: Site, message: &str) {
        self.ctx.report(Diagnostic::new(site, message));
    }

    fn report_at_current(&self, message: &str) {
        self.report(Site::from(self.peek()), message);
    }

    fn report_at_previous(&self, message: &str) {
        self.report(Site::from(self.previous()), message);
    }

    fn error_at_current(&self, message: &str) -> ParseError {
        self.report_at_current(message);
        ParseError
    }

    fn error_at_previous(&self, message: &str) -> ParseError {
        self.report_at_previous(message);
        ParseError
    }
}
