use std::fmt;

use serde::{Deserialize, Serialize};

/// Expression operators, in split priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// `&`: both sides active.
    #[serde(rename = "&")]
    And,
    /// `|`: either side active.
    #[serde(rename = "|")]
    Or,
    /// `+`
    #[serde(rename = "+")]
    Add,
    /// `-`
    #[serde(rename = "-")]
    Sub,
    /// `*`
    #[serde(rename = "*")]
    Mul,
    /// `/`
    #[serde(rename = "/")]
    Div,
    /// `%`
    #[serde(rename = "%")]
    Rem,
    /// `!`: inverts its right side, the left side is empty.
    #[serde(rename = "!")]
    Not,
}

impl Operator {
    /// Every operator, in the order the parser looks for split points.
    pub const ALL: [Operator; 8] = [
        Operator::And,
        Operator::Or,
        Operator::Add,
        Operator::Sub,
        Operator::Mul,
        Operator::Div,
        Operator::Rem,
        Operator::Not,
    ];

    /// Source character of the operator.
    pub fn symbol(self) -> char {
        match self {
            Self::And => '&',
            Self::Or => '|',
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
            Self::Rem => '%',
            Self::Not => '!',
        }
    }

    /// Operator for a source character.
    pub fn from_symbol(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == c)
    }

    /// `+ - * / %`.
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Rem
        )
    }

    /// Apply an arithmetic operator. `None` for logical operators and division by zero.
    pub(crate) fn apply(self, l: f64, r: f64) -> Option<f64> {
        match self {
            Self::Add => Some(l + r),
            Self::Sub => Some(l - r),
            Self::Mul => Some(l * r),
            Self::Div if r != 0.0 => Some(l / r),
            Self::Rem if r != 0.0 => Some(l % r),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Enable expression.
///
/// Deserializes from JSON `null`, a number, a boolean, a string (parsed lazily) or an
/// `{"l": .., "o": .., "r": ..}` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expression {
    /// Empty operand (left side of `!`).
    Null,
    /// Numeric constant.
    Number(f64),
    /// Boolean constant.
    Bool(bool),
    /// Reference string such as `#video.end`, or unparsed source text.
    Text(String),
    /// Binary node.
    Node(Box<ExpressionNode>),
}

/// `{l, o, r}` node of an expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionNode {
    /// Left operand.
    pub l: Expression,
    /// Operator.
    pub o: Operator,
    /// Right operand.
    pub r: Expression,
}

impl Expression {
    /// Build a binary node.
    pub fn node(l: Expression, o: Operator, r: Expression) -> Self {
        Self::Node(Box::new(ExpressionNode { l, o, r }))
    }

    /// `Number` or `Bool`.
    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Number(_) | Self::Bool(_))
    }

    /// Numeric value of a constant; booleans are 1 and 0.
    pub fn constant_value(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Whether this is `Null` or an empty string.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<f64> for Expression {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for Expression {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Expression {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Expression {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Number(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Node(n) if n.o == Operator::Not && n.l.is_empty() => write!(f, "!{}", n.r),
            Self::Node(n) => write!(f, "({} {} {})", n.l, n.o, n.r),
        }
    }
}
