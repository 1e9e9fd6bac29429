use std::collections::HashSet;

use crate::error::SyntaxError;
use crate::lexer::{Lexer, Token};
use crate::span::{Span, Spanned};
use crate::syntax::{Attribute, BinaryOp, Block, Body, Expression, Label, ObjectItem, UnaryOp};

const MAX_NESTING_DEPTH: u32 = 128;

/// Tokenize and parse a whole source file.
pub(crate) fn parse_source(source: &str) -> Result<Body, SyntaxError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_file()
}

pub(crate) struct Parser {
    tokens: Vec<Spanned<Token>>,
    pos: usize,
    depth: u32,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Spanned<Token>>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    pub(crate) fn parse_file(mut self) -> Result<Body, SyntaxError> {
        let body = self.parse_body()?;
        if !self.at(&Token::Eof) {
            return Err(self.unexpected("a block or attribute name"));
        }
        Ok(body)
    }

    // --- token helpers ---

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].node
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn advance(&mut self) -> Spanned<Token> {
        let tok = self.tokens[self.pos].clone();
        if tok.node != Token::Eof {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, expected: &str) -> Result<Span, SyntaxError> {
        if self.at(token) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        SyntaxError::new(
            self.current_span(),
            format!("expected {expected}, found {}", self.peek().describe()),
        )
    }

    fn enter_nesting(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(SyntaxError::new(
                self.current_span(),
                format!("nesting depth exceeded (maximum {MAX_NESTING_DEPTH} levels)"),
            ));
        }
        Ok(())
    }

    fn exit_nesting(&mut self) {
        self.depth -= 1;
    }

    // --- structure ---

    /// Parses attributes and blocks until `}` or end of input, leaving that
    /// token for the caller.
    fn parse_body(&mut self) -> Result<Body, SyntaxError> {
        let mut body = Body::default();
        let mut keys = HashSet::new();
        loop {
            match self.peek() {
                Token::Eof | Token::RBrace => return Ok(body),
                Token::Ident(_) => {}
                _ => return Err(self.unexpected("a block or attribute name")),
            }

            let name = self.expect_ident()?;
            if self.eat(&Token::Assign) {
                if !keys.insert(name.node.clone()) {
                    return Err(SyntaxError::new(
                        name.span,
                        format!("attribute `{}` is defined more than once", name.node),
                    ));
                }
                let value = self.parse_expr()?;
                body.attributes.push(Attribute { key: name, value });
            } else {
                let block = self.parse_block(name)?;
                body.blocks.push(block);
            }
        }
    }

    fn parse_block(&mut self, kind: Spanned<String>) -> Result<Block, SyntaxError> {
        let mut labels = Vec::new();
        loop {
            let label = match self.peek() {
                Token::LBrace => break,
                Token::Str { .. } | Token::Ident(_) => self.advance(),
                _ => return Err(self.unexpected("a block label, `=` or `{`")),
            };
            let node = match label.node {
                Token::Str {
                    value,
                    template: false,
                } => Label::Literal(value),
                Token::Str {
                    value,
                    template: true,
                } => Label::Template(value),
                Token::Ident(name) => Label::Bare(name),
                _ => unreachable!("only labels are advanced past"),
            };
            labels.push(Spanned::new(node, label.span));
        }

        self.expect(&Token::LBrace, "`{`")?;
        self.enter_nesting()?;
        let body = self.parse_body()?;
        self.exit_nesting();
        let close = self.expect(&Token::RBrace, "`}`")?;

        Ok(Block {
            span: kind.span.merge(close),
            kind,
            labels,
            body,
        })
    }

    fn expect_ident(&mut self) -> Result<Spanned<String>, SyntaxError> {
        if !matches!(self.peek(), Token::Ident(_)) {
            return Err(self.unexpected("an identifier"));
        }
        let tok = self.advance();
        match tok.node {
            Token::Ident(name) => Ok(Spanned::new(name, tok.span)),
            _ => unreachable!("checked above"),
        }
    }

    // --- expressions ---

    pub(crate) fn parse_expr(&mut self) -> Result<Spanned<Expression>, SyntaxError> {
        self.enter_nesting()?;
        let expr = self.parse_conditional()?;
        self.exit_nesting();
        Ok(expr)
    }

    fn parse_conditional(&mut self) -> Result<Spanned<Expression>, SyntaxError> {
        let condition = self.parse_binary(0)?;
        if !self.eat(&Token::Question) {
            return Ok(condition);
        }
        let then = self.parse_expr()?;
        self.expect(&Token::Colon, "`:`")?;
        let otherwise = self.parse_expr()?;
        let span = condition.span.merge(otherwise.span);
        Ok(Spanned::new(
            Expression::Conditional {
                condition: Box::new(condition),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            span,
        ))
    }

    fn parse_binary(&mut self, min_bp: u8) -> Result<Spanned<Expression>, SyntaxError> {
        let mut lhs = self.parse_unary()?;

        loop {
            let op = match self.peek() {
                Token::OrOr => BinaryOp::Or,
                Token::AndAnd => BinaryOp::And,
                Token::EqEq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                Token::Lt => BinaryOp::Lt,
                Token::Le => BinaryOp::Le,
                Token::Gt => BinaryOp::Gt,
                Token::Ge => BinaryOp::Ge,
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => break,
            };

            let (l_bp, r_bp) = op.binding_power();
            if l_bp < min_bp {
                break;
            }

            self.advance();
            let rhs = self.parse_binary(r_bp)?;
            let span = lhs.span.merge(rhs.span);
            lhs = Spanned::new(
                Expression::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Spanned<Expression>, SyntaxError> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Negate,
            Token::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        let start = self.advance().span;

        self.enter_nesting()?;
        let operand = self.parse_unary()?;
        self.exit_nesting();

        let span = start.merge(operand.span);
        Ok(Spanned::new(
            Expression::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// `.name`, `.0` and `[index]` traversals.
    fn parse_postfix(&mut self) -> Result<Spanned<Expression>, SyntaxError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let name = match self.peek() {
                    Token::Ident(_) | Token::Number(_) => self.advance(),
                    _ => return Err(self.unexpected("an attribute name after `.`")),
                };
                let (Token::Ident(text) | Token::Number(text)) = name.node else {
                    unreachable!("checked above")
                };
                let span = expr.span.merge(name.span);
                expr = Spanned::new(
                    Expression::GetAttr {
                        target: Box::new(expr),
                        name: text,
                    },
                    span,
                );
            } else if self.eat(&Token::LBracket) {
                let index = self.parse_expr()?;
                let close = self.expect(&Token::RBracket, "`]`")?;
                let span = expr.span.merge(close);
                expr = Spanned::new(
                    Expression::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                );
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Spanned<Expression>, SyntaxError> {
        if matches!(
            self.peek(),
            Token::Eof | Token::RBrace | Token::RBracket | Token::RParen | Token::Comma
        ) {
            return Err(self.unexpected("an expression"));
        }

        let tok = self.advance();
        let span = tok.span;
        let expr = match tok.node {
            Token::Str {
                value,
                template: false,
            } => Expression::Literal(value),
            Token::Str {
                value,
                template: true,
            } => Expression::Template(value),
            Token::Number(n) => Expression::Number(n),
            Token::Ident(name) if self.at(&Token::LParen) => return self.parse_call(name, span),
            Token::Ident(name) => match name.as_str() {
                "true" => Expression::Bool(true),
                "false" => Expression::Bool(false),
                "null" => Expression::Null,
                _ => Expression::Variable(name),
            },
            Token::LBracket => return self.parse_tuple(span),
            Token::LBrace => return self.parse_object(span),
            Token::LParen => {
                let inner = self.parse_expr()?;
                let close = self.expect(&Token::RParen, "`)`")?;
                return Ok(Spanned::new(inner.node, span.merge(close)));
            }
            other => {
                return Err(SyntaxError::new(
                    span,
                    format!("expected an expression, found {}", other.describe()),
                ));
            }
        };
        Ok(Spanned::new(expr, span))
    }

    /// Comma-separated expressions up to `close`; a trailing comma is allowed.
    fn parse_sequence(
        &mut self,
        close: &Token,
        expected: &str,
    ) -> Result<(Vec<Spanned<Expression>>, Span), SyntaxError> {
        self.enter_nesting()?;
        let mut elements = Vec::new();
        while !self.at(close) {
            elements.push(self.parse_expr()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        let end = self.expect(close, expected)?;
        self.exit_nesting();
        Ok((elements, end))
    }

    fn parse_tuple(&mut self, open: Span) -> Result<Spanned<Expression>, SyntaxError> {
        let (elements, close) = self.parse_sequence(&Token::RBracket, "`,` or `]`")?;
        Ok(Spanned::new(Expression::Tuple(elements), open.merge(close)))
    }

    fn parse_call(
        &mut self,
        name: String,
        start: Span,
    ) -> Result<Spanned<Expression>, SyntaxError> {
        self.expect(&Token::LParen, "`(`")?;
        let (args, close) = self.parse_sequence(&Token::RParen, "`,` or `)`")?;
        Ok(Spanned::new(Expression::Call { name, args }, start.merge(close)))
    }

    /// Items are `key = value` or `key: value`, separated by optional commas.
    fn parse_object(&mut self, open: Span) -> Result<Spanned<Expression>, SyntaxError> {
        self.enter_nesting()?;
        let mut items = Vec::new();
        while !self.at(&Token::RBrace) {
            let key = self.parse_expr()?;
            if !self.eat(&Token::Assign) && !self.eat(&Token::Colon) {
                return Err(self.unexpected("`=` or `:`"));
            }
            let value = self.parse_expr()?;
            items.push(ObjectItem { key, value });
            self.eat(&Token::Comma);
        }
        let close = self.expect(&Token::RBrace, "`}`")?;
        self.exit_nesting();
        Ok(Spanned::new(Expression::Object(items), open.merge(close)))
    }
}
