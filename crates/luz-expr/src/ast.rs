use std::fmt;

use crate::value::TimeOfDay;

/// Byte range into the source text of a token body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (at {}..{})",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    #[must_use]
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// One token body: either an assignment into the name table or a bare expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Assign { name: String, value: Expr },
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Number(i64),
    Time(TimeOfDay),
    Name(String),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Round(RoundExpr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

/// Built-in 5-minute rounding functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Up,
    Down,
}

impl Rounding {
    pub fn keyword(self) -> &'static str {
        match self {
            Rounding::Up => "UP",
            Rounding::Down => "DOWN",
        }
    }

    pub fn from_keyword(ident: &str) -> Option<Self> {
        match ident {
            "UP" => Some(Rounding::Up),
            "DOWN" => Some(Rounding::Down),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundExpr {
    pub func: Rounding,
    pub arg: Box<Expr>,
}

// Fully parenthesized canonical form. Only used for logging, so it favours being unambiguous over
// being minimal.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Time(t) => write!(f, "{t}"),
            Expr::Name(name) => f.write_str(name),
            Expr::Unary(u) => match u.op {
                UnaryOp::Minus => write!(f, "-{}", u.expr),
            },
            Expr::Binary(b) => write!(f, "({} {} {})", b.left, b.op.as_str(), b.right),
            Expr::Round(r) => write!(f, "{}({})", r.func.keyword(), r.arg),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assign { name, value } => write!(f, "{name} = {value}"),
            Statement::Expr(expr) => write!(f, "{expr}"),
        }
    }
}
