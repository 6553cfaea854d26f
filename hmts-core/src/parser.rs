//! Recursive-descent parser.
//!
//! Precedence from tight to loose: primary, postfix (`e[i]`, `e(args)`),
//! `*`, `+`, then the right-associative ternary. The only ambiguity is an
//! opening `(`, which may start a parenthesised expression or an arrow
//! function; [`Parser::at_arrow_function`] settles it by scanning ahead and
//! restoring the cursor.
//!
//! Errors inside a statement are recorded and the parser skips to the next
//! `;`, `}` or end of input, so one bad statement never hides its siblings.

use log::debug;

use crate::ast::{
    ArrowFunction, BinaryOp, BlockStatement, ConstDeclaration, Expr, ExprKind, NodeId, Param,
    Program, ReturnStatement, ScalarKeyword, Stmt, TypeExpr,
};
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{Token, TokenKind};
use crate::span::Span;

type PResult<T> = Result<T, ParseError>;

/// A program together with every error recovered from while parsing it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutput {
    pub program: Program,
    pub errors: Vec<ParseError>,
}

impl ParseOutput {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse a token sequence terminated by `EOF`.
pub fn parse(tokens: Vec<Token>) -> ParseOutput {
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program();
    debug!(
        "parsed {} statement(s) with {} error(s)",
        program.body.len(),
        parser.errors.len()
    );
    ParseOutput {
        program,
        errors: parser.errors,
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    next_id: u32,
    errors: Vec<ParseError>,
}

impl Parser {
    fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let end = tokens.last().map(|t| t.span.end).unwrap_or(0);
            tokens.push(Token {
                kind: TokenKind::Eof,
                lexeme: None,
                span: Span::point(end),
            });
        }
        Parser {
            tokens,
            pos: 0,
            next_id: 0,
            errors: Vec::new(),
        }
    }

    // ── Statements ───────────────────────────────────────────────────

    fn parse_program(&mut self) -> Program {
        let id = self.fresh_id();
        let mut body = Vec::new();
        loop {
            while self.eat(TokenKind::Semicolon) {}
            if self.check(TokenKind::Eof) {
                break;
            }
            match self.parse_statement(true) {
                Ok(stmt) => body.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                    // A stray `}` has no block to close at the top level.
                    if self.check(TokenKind::RightCurly) {
                        self.advance();
                    }
                }
            }
        }
        let end = self.peek().span.end;
        Program {
            id,
            body,
            span: Span::new(0, end),
        }
    }

    fn parse_statement(&mut self, top_level: bool) -> PResult<Stmt> {
        let stmt = match self.peek_kind() {
            TokenKind::Const => Stmt::Const(self.parse_const()?),
            TokenKind::Return if top_level => {
                return Err(ParseError {
                    kind: ParseErrorKind::ReturnOutsideFunction,
                    span: self.peek().span,
                });
            }
            TokenKind::Return => Stmt::Return(self.parse_return()?),
            _ if top_level => Stmt::Expr(self.parse_expression()?),
            found => {
                return Err(ParseError {
                    kind: ParseErrorKind::ExpectedToken {
                        expected: "'const' or 'return'",
                        found,
                    },
                    span: self.peek().span,
                });
            }
        };
        self.eat(TokenKind::Semicolon);
        Ok(stmt)
    }

    fn parse_const(&mut self) -> PResult<ConstDeclaration> {
        let start = self.expect(TokenKind::Const, "'const'")?.span;
        let name = self.expect(TokenKind::Identifier, "identifier")?;
        let type_annotation = if self.eat(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(TokenKind::Equal, "'='")?;
        let init = self.parse_expression()?;
        let span = start.merge(init.span);
        Ok(ConstDeclaration {
            id: self.fresh_id(),
            name: name.text().to_string(),
            type_annotation,
            init,
            span,
        })
    }

    fn parse_return(&mut self) -> PResult<ReturnStatement> {
        let start = self.expect(TokenKind::Return, "'return'")?.span;
        let argument = match self.peek_kind() {
            TokenKind::Semicolon | TokenKind::RightCurly | TokenKind::Eof => None,
            _ => Some(self.parse_expression()?),
        };
        let span = argument
            .as_ref()
            .map_or(start, |arg| start.merge(arg.span));
        Ok(ReturnStatement {
            id: self.fresh_id(),
            argument,
            span,
        })
    }

    fn parse_block(&mut self) -> PResult<BlockStatement> {
        let start = self.expect(TokenKind::LeftCurly, "'{'")?.span;
        let mut body = Vec::new();
        loop {
            while self.eat(TokenKind::Semicolon) {}
            if self.check(TokenKind::RightCurly) || self.check(TokenKind::Eof) {
                break;
            }
            match self.parse_statement(false) {
                Ok(stmt) => body.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }
        let end = self.expect(TokenKind::RightCurly, "'}'")?.span;
        Ok(BlockStatement {
            id: self.fresh_id(),
            body,
            span: start.merge(end),
        })
    }

    /// Skip to the next `;` (consumed), unmatched `}` or end of input (left
    /// in place). Braced blocks opened while skipping are skipped whole.
    fn synchronize(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                TokenKind::Eof => return,
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::RightCurly if depth == 0 => return,
                TokenKind::LeftCurly => depth += 1,
                TokenKind::RightCurly => depth -= 1,
                _ => {}
            }
            self.advance();
        }
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn parse_expression(&mut self) -> PResult<Expr> {
        let test = self.parse_additive()?;
        if !self.eat(TokenKind::Ternary) {
            return Ok(test);
        }
        let consequent = self.parse_expression()?;
        self.expect(TokenKind::Colon, "':'")?;
        let alternate = self.parse_expression()?;
        let span = test.span.merge(alternate.span);
        Ok(self.node(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        ))
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        while self.eat(TokenKind::Plus) {
            let right = self.parse_multiplicative()?;
            left = self.binary(BinaryOp::Add, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut left = self.parse_postfix()?;
        while self.eat(TokenKind::Star) {
            let right = self.parse_postfix()?;
            left = self.binary(BinaryOp::Mul, left, right);
        }
        Ok(left)
    }

    fn binary(&mut self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        let span = left.span.merge(right.span);
        self.node(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(TokenKind::LeftBracket) {
                let index = self.parse_expression()?;
                let end = self.expect(TokenKind::RightBracket, "']'")?.span;
                let span = expr.span.merge(end);
                expr = self.node(
                    ExprKind::Member {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                );
            } else if self.eat(TokenKind::LeftParen) {
                let mut arguments = Vec::new();
                if !self.check(TokenKind::RightParen) {
                    loop {
                        arguments.push(self.parse_expression()?);
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                let end = self.expect(TokenKind::RightParen, "')'")?.span;
                let span = expr.span.merge(end);
                expr = self.node(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        arguments,
                    },
                    span,
                );
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                let value = token.text().parse::<f64>().map_err(|_| ParseError {
                    kind: ParseErrorKind::UnexpectedTokenInExpression(token.kind),
                    span: token.span,
                })?;
                Ok(self.node(ExprKind::Number(value), token.span))
            }
            TokenKind::String => {
                self.advance();
                Ok(self.node(ExprKind::String(unquote(token.text())), token.span))
            }
            TokenKind::Boolean => {
                self.advance();
                Ok(self.node(ExprKind::Boolean(token.text() == "true"), token.span))
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(self.node(ExprKind::Identifier(token.text().to_string()), token.span))
            }
            TokenKind::LeftBracket => self.parse_array(),
            TokenKind::LeftParen if self.at_arrow_function() => self.parse_arrow_function(),
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RightParen, "')'")?;
                Ok(inner)
            }
            other => Err(ParseError {
                kind: ParseErrorKind::UnexpectedTokenInExpression(other),
                span: token.span,
            }),
        }
    }

    fn parse_array(&mut self) -> PResult<Expr> {
        let start = self.expect(TokenKind::LeftBracket, "'['")?.span;
        let mut elements = Vec::new();
        if !self.check(TokenKind::RightBracket) {
            loop {
                elements.push(self.parse_expression()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(TokenKind::RightBracket, "']'")?.span;
        Ok(self.node(ExprKind::Array(elements), start.merge(end)))
    }

    /// Whether the upcoming `(` opens an arrow function.
    ///
    /// Scans `( [name [: T] {, name [: T]}] ) [: T]` and checks for `=>`.
    /// Annotations are skipped by shape only, so a bad type name still
    /// commits to the arrow and is reported by `parse_type`. The cursor is
    /// restored and no node ids are allocated.
    fn at_arrow_function(&mut self) -> bool {
        let saved = self.pos;
        let is_arrow = self.scan_arrow_head() && self.check(TokenKind::Arrow);
        self.pos = saved;
        is_arrow
    }

    fn scan_arrow_head(&mut self) -> bool {
        if !self.eat(TokenKind::LeftParen) {
            return false;
        }
        if !self.check(TokenKind::RightParen) {
            loop {
                if !self.eat(TokenKind::Identifier) {
                    return false;
                }
                if self.eat(TokenKind::Colon) && !self.scan_type() {
                    return false;
                }
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        if !self.eat(TokenKind::RightParen) {
            return false;
        }
        !self.eat(TokenKind::Colon) || self.scan_type()
    }

    /// Skip one type annotation, accepting any identifier as a name.
    fn scan_type(&mut self) -> bool {
        let atom = match self.peek_kind() {
            TokenKind::Identifier => {
                self.advance();
                true
            }
            TokenKind::TypeArray => {
                self.advance();
                self.eat(TokenKind::LessThan)
                    && self.scan_type()
                    && self.eat(TokenKind::GreaterThan)
            }
            TokenKind::LeftParen => {
                self.advance();
                let mut ok = true;
                if !self.check(TokenKind::RightParen) {
                    loop {
                        ok = self.eat(TokenKind::Identifier)
                            && self.eat(TokenKind::Colon)
                            && self.scan_type();
                        if !ok || !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                ok && self.eat(TokenKind::RightParen)
                    && self.eat(TokenKind::Arrow)
                    && self.scan_type()
            }
            kind if scalar_keyword(kind).is_some() => {
                self.advance();
                true
            }
            _ => false,
        };
        if !atom {
            return false;
        }
        while self.check(TokenKind::LeftBracket) && self.peek_nth_kind(1) == TokenKind::RightBracket {
            self.advance();
            self.advance();
        }
        true
    }

    fn parse_arrow_function(&mut self) -> PResult<Expr> {
        let start = self.expect(TokenKind::LeftParen, "'('")?.span;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(self.parse_param()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "')'")?;
        let return_type = if self.eat(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(TokenKind::Arrow, "'=>'")?;
        let body = self.parse_block()?;
        let span = start.merge(body.span);
        Ok(self.node(
            ExprKind::Arrow(ArrowFunction {
                params,
                return_type,
                body,
            }),
            span,
        ))
    }

    fn parse_param(&mut self) -> PResult<Param> {
        let name = self.expect(TokenKind::Identifier, "parameter name")?;
        let type_annotation = if self.eat(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let span = type_annotation
            .as_ref()
            .map_or(name.span, |ty| name.span.merge(ty.span()));
        Ok(Param {
            id: self.fresh_id(),
            name: name.text().to_string(),
            type_annotation,
            span,
        })
    }

    // ── Types ────────────────────────────────────────────────────────

    fn parse_type(&mut self) -> PResult<TypeExpr> {
        let mut ty = self.parse_type_atom()?;
        while self.check(TokenKind::LeftBracket) && self.peek_nth_kind(1) == TokenKind::RightBracket {
            self.advance();
            let end = self.advance().span;
            let span = ty.span().merge(end);
            ty = TypeExpr::ArrayOf {
                element: Box::new(ty),
                span,
            };
        }
        Ok(ty)
    }

    fn parse_type_atom(&mut self) -> PResult<TypeExpr> {
        let token = self.peek().clone();
        if let Some(keyword) = scalar_keyword(token.kind) {
            self.advance();
            return Ok(TypeExpr::Scalar {
                keyword,
                span: token.span,
            });
        }
        match token.kind {
            TokenKind::TypeArray => {
                self.advance();
                self.expect(TokenKind::LessThan, "'<'")?;
                let element = self.parse_type()?;
                let end = self.expect(TokenKind::GreaterThan, "'>'")?.span;
                Ok(TypeExpr::ArrayOf {
                    element: Box::new(element),
                    span: token.span.merge(end),
                })
            }
            TokenKind::Identifier => {
                self.advance();
                let kind = if token.text() == "any" {
                    ParseErrorKind::UnsupportedAnyType
                } else {
                    ParseErrorKind::UnknownTypeName(token.text().to_string())
                };
                Err(ParseError {
                    kind,
                    span: token.span,
                })
            }
            TokenKind::LeftParen => {
                self.advance();
                let mut params = Vec::new();
                if !self.check(TokenKind::RightParen) {
                    loop {
                        let name = self.expect(TokenKind::Identifier, "parameter name")?;
                        self.expect(TokenKind::Colon, "':'")?;
                        let ty = self.parse_type()?;
                        params.push((name.text().to_string(), ty));
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RightParen, "')'")?;
                self.expect(TokenKind::Arrow, "'=>'")?;
                let result = self.parse_type()?;
                let span = token.span.merge(result.span());
                Ok(TypeExpr::FunctionOf {
                    params,
                    result: Box::new(result),
                    span,
                })
            }
            found => Err(ParseError {
                kind: ParseErrorKind::ExpectedToken {
                    expected: "type",
                    found,
                },
                span: token.span,
            }),
        }
    }

    // ── Cursor helpers ───────────────────────────────────────────────

    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn node(&mut self, kind: ExprKind, span: Span) -> Expr {
        Expr {
            id: self.fresh_id(),
            kind,
            span,
        }
    }

    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_nth_kind(&self, n: usize) -> TokenKind {
        let last = self.tokens.len() - 1;
        self.tokens[(self.pos + n).min(last)].kind
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError {
                kind: ParseErrorKind::ExpectedToken {
                    expected,
                    found: self.peek_kind(),
                },
                span: self.peek().span,
            })
        }
    }
}

fn scalar_keyword(kind: TokenKind) -> Option<ScalarKeyword> {
    let keyword = match kind {
        TokenKind::TypeNumber => ScalarKeyword::Number,
        TokenKind::TypeString => ScalarKeyword::String,
        TokenKind::TypeBoolean => ScalarKeyword::Boolean,
        TokenKind::TypeVoid => ScalarKeyword::Void,
        TokenKind::TypeInt => ScalarKeyword::CapitalVoid,
        TokenKind::TypeFloat => ScalarKeyword::Float,
        TokenKind::TypeBool => ScalarKeyword::Bool,
        TokenKind::TypeUnit => ScalarKeyword::Unit,
        _ => return None,
    };
    Some(keyword)
}

/// Strip the delimiting quotes of a string lexeme and resolve escapes.
fn unquote(lexeme: &str) -> String {
    let inner = lexeme
        .get(1..lexeme.len().saturating_sub(1))
        .unwrap_or("");
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
