use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::domain::Domain;

/// A boxed expression: the canonical immutable tree produced by the parser.
///
/// Cloning is cheap; function nodes are reference counted so structure is
/// shared between an expression and anything built from it.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Number(Number),
    Symbol(Arc<str>),
    String(Arc<str>),
    Function(Arc<FunctionExpression>),
}

/// Exact or floating numeric literal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Head {
    Name(Arc<str>),
    Expression(Expression),
}

#[derive(Debug)]
pub struct FunctionExpression {
    head: Head,
    ops: Vec<Expression>,
    valid: bool,
    domain: OnceCell<Domain>,
}

impl PartialEq for FunctionExpression {
    fn eq(&self, other: &Self) -> bool {
        self.head == other.head && self.ops == other.ops
    }
}

/// Machine-readable code of an embedded parse error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    UnknownSymbol,
    UnexpectedCommand,
    UnknownEnvironment,
    UnexpectedDelimiter,
    ExpectedClosingDelimiter,
    UnexpectedOperator,
    UnexpectedToken,
    Missing,
    SyntaxError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownSymbol => "unknown-symbol",
            Self::UnexpectedCommand => "unexpected-command",
            Self::UnknownEnvironment => "unknown-environment",
            Self::UnexpectedDelimiter => "unexpected-delimiter",
            Self::ExpectedClosingDelimiter => "expected-closing-delimiter",
            Self::UnexpectedOperator => "unexpected-operator",
            Self::UnexpectedToken => "unexpected-token",
            Self::Missing => "missing",
            Self::SyntaxError => "syntax-error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Head {
    fn from(name: &str) -> Self {
        Self::Name(name.into())
    }
}

impl From<String> for Head {
    fn from(name: String) -> Self {
        Self::Name(name.into())
    }
}

impl From<Expression> for Head {
    fn from(expr: Expression) -> Self {
        match expr {
            Expression::Symbol(name) => Self::Name(name),
            expr => Self::Expression(expr),
        }
    }
}

impl Expression {
    pub fn symbol(name: &str) -> Self {
        Self::Symbol(name.into())
    }

    pub fn string(value: &str) -> Self {
        Self::String(value.into())
    }

    pub fn integer(value: i64) -> Self {
        Self::Number(Number::Integer(value))
    }

    pub fn float(value: f64) -> Self {
        Self::Number(Number::Float(value))
    }

    /// Build a function call as is. No normalization is applied; the
    /// parser goes through [`crate::Engine::function`] instead.
    pub fn function(head: impl Into<Head>, ops: Vec<Expression>) -> Self {
        let head = head.into();
        let valid = match &head {
            Head::Name(name) => &**name != "Error",
            Head::Expression(expr) => expr.is_valid(),
        } && ops.iter().all(Expression::is_valid);
        Self::Function(Arc::new(FunctionExpression {
            head,
            ops,
            valid,
            domain: OnceCell::new(),
        }))
    }

    /// An embedded error: `["Error", code, ["LatexString", raw]]`, with the
    /// code wrapped as `["ErrorCode", code, arg]` when an argument is given.
    pub fn error(code: ErrorCode, arg: Option<&str>, raw: Option<&str>) -> Self {
        let code = match arg {
            Some(arg) => Self::function(
                "ErrorCode",
                vec![Self::string(code.as_str()), Self::string(arg)],
            ),
            None => Self::string(code.as_str()),
        };
        let mut ops = vec![code];
        if let Some(raw) = raw {
            ops.push(Self::function("LatexString", vec![Self::string(raw)]));
        }
        Self::function("Error", ops)
    }

    pub fn head(&self) -> Option<&Head> {
        match self {
            Self::Function(f) => Some(&f.head),
            _ => None,
        }
    }

    /// The head of a function call whose head is a plain name.
    pub fn head_name(&self) -> Option<&str> {
        match self.head() {
            Some(Head::Name(name)) => Some(name.as_ref()),
            _ => None,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    pub fn ops(&self) -> &[Expression] {
        match self {
            Self::Function(f) => &f.ops,
            _ => &[],
        }
    }

    pub fn nops(&self) -> usize {
        self.ops().len()
    }

    /// Zero-based operand access.
    pub fn op(&self, index: usize) -> Option<&Expression> {
        self.ops().get(index)
    }

    pub fn symbol_name(&self) -> Option<&str> {
        match self {
            Self::Symbol(name) => Some(name.as_ref()),
            _ => None,
        }
    }

    pub fn string_value(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_ref()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// False for `Error` nodes and for anything that contains one.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Function(f) => f.valid,
            _ => true,
        }
    }

    pub fn is_error(&self) -> bool {
        self.head_name() == Some("Error")
    }

    /// The code of an `Error` node.
    pub fn error_code(&self) -> Option<&str> {
        if !self.is_error() {
            return None;
        }
        let code = self.op(0)?;
        match code.head_name() {
            Some("ErrorCode") => code.op(0)?.string_value(),
            _ => code.string_value(),
        }
    }

    /// True if both values are the same allocation (or equal atoms).
    pub fn ptr_eq(lhs: &Self, rhs: &Self) -> bool {
        match (lhs, rhs) {
            (Self::Function(a), Self::Function(b)) => Arc::ptr_eq(a, b),
            (Self::Symbol(a), Self::Symbol(b)) | (Self::String(a), Self::String(b)) => {
                Arc::ptr_eq(a, b)
            }
            (Self::Number(a), Self::Number(b)) => a == b,
            _ => false,
        }
    }

    pub(crate) fn domain_cell(&self) -> Option<&OnceCell<Domain>> {
        match self {
            Self::Function(f) => Some(&f.domain),
            _ => None,
        }
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Self::Integer(value) => serializer.serialize_i64(value),
            Self::Float(value) if value.is_nan() => serializer.serialize_str("NaN"),
            Self::Float(value) if value.is_infinite() => {
                serializer.serialize_str(if value > 0.0 { "+Infinity" } else { "-Infinity" })
            }
            Self::Float(value) => serializer.serialize_f64(value),
        }
    }
}

impl Serialize for Head {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Name(name) => serializer.serialize_str(name),
            Self::Expression(expr) => expr.serialize(serializer),
        }
    }
}

/// Serializes as MathJSON.
impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(n) => n.serialize(serializer),
            Self::Symbol(name) => serializer.serialize_str(name),
            Self::String(value) => serializer.serialize_str(&format!("'{value}'")),
            Self::Function(f) => {
                let mut seq = serializer.serialize_seq(Some(f.ops.len() + 1))?;
                seq.serialize_element(&f.head)?;
                for op in &f.ops {
                    seq.serialize_element(op)?;
                }
                seq.end()
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
