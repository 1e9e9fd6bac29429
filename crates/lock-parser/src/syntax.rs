//! Syntax tree for lock file sources.
//!
//! The tree covers the HCL subset that appears in dependency lock files and the
//! blocks that sit next to them. Lookups go by name (block type, attribute key)
//! rather than by child position, so optional attributes can be absent or
//! reordered without shifting anything else.

use crate::span::{Span, Spanned};

/// A sequence of attributes and blocks: the whole file, or the inside of a block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Body {
    pub attributes: Vec<Attribute>,
    pub blocks: Vec<Block>,
}

impl Body {
    /// The attribute with the given key, if present. Keys are unique per body.
    pub fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.key.node == key)
    }

    /// All blocks of the given type, in source order.
    pub fn blocks<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.blocks.iter().filter(move |block| block.kind.node == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.blocks.is_empty()
    }
}

/// `key = value`
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub key: Spanned<String>,
    pub value: Spanned<Expression>,
}

/// `kind "label" ... { body }`
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub kind: Spanned<String>,
    pub labels: Vec<Spanned<Label>>,
    pub body: Body,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Label {
    /// A double-quoted label without interpolation.
    Literal(String),
    /// A double-quoted label containing `${...}` or `%{...}`.
    Template(String),
    /// An unquoted identifier label.
    Bare(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    /// A double-quoted string without interpolation, escapes decoded.
    Literal(String),
    /// A double-quoted string with interpolation, kept verbatim.
    Template(String),
    Number(String),
    Bool(bool),
    Null,
    Variable(String),
    Tuple(Vec<Spanned<Expression>>),
    Object(Vec<ObjectItem>),
    Call {
        name: String,
        args: Vec<Spanned<Expression>>,
    },
    GetAttr {
        target: Box<Spanned<Expression>>,
        name: String,
    },
    Index {
        target: Box<Spanned<Expression>>,
        index: Box<Spanned<Expression>>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Spanned<Expression>>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Spanned<Expression>>,
        rhs: Box<Spanned<Expression>>,
    },
    Conditional {
        condition: Box<Spanned<Expression>>,
        then: Box<Spanned<Expression>>,
        otherwise: Box<Spanned<Expression>>,
    },
}

impl Expression {
    /// The decoded text of a plain string literal. Templates are not literals.
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Expression::Literal(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Spanned<Expression>]> {
        match self {
            Expression::Tuple(elements) => Some(elements),
            _ => None,
        }
    }

    /// Short description for error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Expression::Literal(_) => "a string literal",
            Expression::Template(_) => "a string template",
            Expression::Number(_) => "a number",
            Expression::Bool(_) => "a boolean",
            Expression::Null => "null",
            Expression::Variable(_) | Expression::GetAttr { .. } | Expression::Index { .. } => {
                "a reference"
            }
            Expression::Tuple(_) => "a list",
            Expression::Object(_) => "an object",
            Expression::Call { .. } => "a function call",
            Expression::Unary { .. } | Expression::Binary { .. } | Expression::Conditional { .. } => {
                "an operator expression"
            }
        }
    }
}

/// `key = value` or `key: value` inside an object constructor.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectItem {
    pub key: Spanned<Expression>,
    pub value: Spanned<Expression>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    /// Left and right binding power; all operators are left-associative.
    pub(crate) fn binding_power(self) -> (u8, u8) {
        let precedence = match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::NotEq => 3,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 6,
        };
        (precedence * 2 - 1, precedence * 2)
    }
}
