//! The compiled form of a template.
//!
//! A template compiles to a list of [`Node`]s; every expression inside a
//! marker compiles to an [`Expr`] tree. Both are plain data: evaluation lives
//! in [`crate::render`].

use crate::context::ContextValue;

/// Binary arithmetic and concatenation operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/` (true division, always a float)
    Div,
    /// `//` (floor division)
    FloorDiv,
    /// `%`
    Mod,
    /// `~` (string concatenation)
    Concat,
}

impl BinaryOp {
    /// Returns the operator as written in a template.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Concat => "~",
        }
    }
}

/// Comparison and membership operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value (`"text"`, `3`, `true`, `none`).
    Literal(ContextValue),
    /// A list literal: `[a, b, c]`.
    List(Vec<Expr>),
    /// A variable reference.
    Name(String),
    /// Attribute access: `value.name`.
    Attr(Box<Expr>, String),
    /// Subscription: `value[key]`.
    Item(Box<Expr>, Box<Expr>),
    /// Unary minus.
    Neg(Box<Expr>),
    /// Unary plus.
    Pos(Box<Expr>),
    /// A binary operator.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// A comparison.
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    /// `left and right`
    And(Box<Expr>, Box<Expr>),
    /// `left or right`
    Or(Box<Expr>, Box<Expr>),
    /// `not operand`
    Not(Box<Expr>),
    /// `then if condition else otherwise`
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Option<Box<Expr>>,
    },
    /// A filter application: `value | name(args)`.
    Filter {
        value: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    /// A call: `callee(args)`.
    Call { callee: Box<Expr>, args: Vec<Expr> },
}

/// A node in the compiled template.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, emitted as-is.
    Text(String),
    /// `{{ expr }}`
    Output(Expr),
    /// `{% if %}` with its `elif` branches and an optional `else` body.
    If {
        /// `(condition, body)` pairs, tried in order.
        branches: Vec<(Expr, Vec<Node>)>,
        /// The `else` body.
        otherwise: Vec<Node>,
    },
    /// `{% for target in iterable %}` with an optional `else` body that
    /// renders when the iterable is empty.
    For {
        target: String,
        iterable: Expr,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
    /// `{% set name = value %}`
    Set { name: String, value: Expr },
}
