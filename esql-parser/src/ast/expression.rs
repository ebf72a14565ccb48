use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::query::{CommandOption, Order, Source};
use crate::spans::Location;

/// Any node that can appear as a command argument.
#[derive(Debug, PartialEq, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AstNode {
    Function(Function),
    Literal(Literal),
    Column(Column),
    Option(CommandOption),
    List(List),
    Source(Source),
    Order(Order),
}

impl AstNode {
    pub fn location(&self) -> Location {
        match self {
            AstNode::Function(node) => node.location,
            AstNode::Literal(node) => node.location,
            AstNode::Column(node) => node.location,
            AstNode::Option(node) => node.location,
            AstNode::List(node) => node.location,
            AstNode::Source(node) => node.location,
            AstNode::Order(node) => node.location,
        }
    }

    /// Direct children, in source order.
    pub fn children(&self) -> &[AstNode] {
        match self {
            AstNode::Function(node) => &node.args,
            AstNode::Option(node) => &node.args,
            AstNode::List(node) => &node.values,
            AstNode::Order(node) => std::slice::from_ref(&*node.expression),
            AstNode::Literal(_) | AstNode::Column(_) | AstNode::Source(_) => &[],
        }
    }

    pub fn is_column(&self) -> bool {
        matches!(self, AstNode::Column(_))
    }

    pub fn is_option(&self) -> bool {
        matches!(self, AstNode::Option(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, AstNode::Function(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, AstNode::Literal(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, AstNode::List(_))
    }

    pub fn is_source(&self) -> bool {
        matches!(self, AstNode::Source(_))
    }

    pub fn is_order(&self) -> bool {
        matches!(self, AstNode::Order(_))
    }

    pub fn as_column(&self) -> Option<&Column> {
        match self {
            AstNode::Column(column) => Some(column),
            _ => None,
        }
    }

    pub fn as_option(&self) -> Option<&CommandOption> {
        match self {
            AstNode::Option(option) => Some(option),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            AstNode::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            AstNode::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            AstNode::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_source(&self) -> Option<&Source> {
        match self {
            AstNode::Source(source) => Some(source),
            _ => None,
        }
    }
}

/// Function calls and operators.
///
/// Operators are modelled as functions named after the operator
/// (`>`, `and`, `not in`, `is null`, ...), with `subtype` telling
/// how they were written.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Function {
    pub name: String,
    pub subtype: FunctionKind,
    pub args: Vec<AstNode>,
    pub location: Location,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FunctionKind {
    /// `name(arg, ...)`
    VariadicCall,
    /// `left op right`
    BinaryExpression,
    /// `op operand`
    UnaryExpression,
    /// `operand op`, e.g. `IS NULL`
    PostfixUnaryExpression,
    /// `operand::type`
    InlineCast,
}

/// Serialized as `{ literalType, value, location }`, with a `numberType`
/// of `integer` or `decimal` next to number literals.
#[derive(Debug, PartialEq, Clone)]
pub struct Literal {
    pub value: LiteralValue,
    pub location: Location,
}

impl Serialize for Literal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Literal", 4)?;
        state.serialize_field("literalType", &self.literal_type())?;
        match &self.value {
            LiteralValue::Integer(value) => {
                state.serialize_field("numberType", "integer")?;
                state.serialize_field("value", value)?;
            }
            LiteralValue::Decimal(value) => {
                state.serialize_field("numberType", "decimal")?;
                state.serialize_field("value", value)?;
            }
            LiteralValue::String(value) => state.serialize_field("value", value)?,
            LiteralValue::Boolean(value) => state.serialize_field("value", value)?,
            LiteralValue::Null => state.serialize_field("value", &())?,
            LiteralValue::Param(param) => state.serialize_field("value", param)?,
        }
        state.serialize_field("location", &self.location)?;
        state.end()
    }
}

impl Literal {
    pub fn literal_type(&self) -> LiteralType {
        match self.value {
            LiteralValue::Integer(_) | LiteralValue::Decimal(_) => LiteralType::Number,
            LiteralValue::String(_) => LiteralType::String,
            LiteralValue::Boolean(_) => LiteralType::Boolean,
            LiteralValue::Null => LiteralType::Null,
            LiteralValue::Param(_) => LiteralType::Param,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum LiteralValue {
    Integer(i64),
    Decimal(f64),
    String(String),
    Boolean(bool),
    Null,
    Param(Param),
}

/// Coarse literal category
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LiteralType {
    Number,
    String,
    Boolean,
    Null,
    Param,
}

/// Query parameter placeholder, bound by the caller at execution time.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Param {
    /// `?`
    Unnamed,
    /// `?name`
    Named(String),
    /// `?1`
    Positional(u32),
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct Column {
    /// Dotted name with quoting removed, e.g. `host.name`
    pub name: String,
    pub parts: Vec<String>,
    /// Whether any part was written with backticks
    pub quoted: bool,
    pub location: Location,
}

impl Column {
    pub fn new(parts: Vec<String>, quoted: bool, location: Location) -> Self {
        Column {
            name: parts.join("."),
            parts,
            quoted,
            location,
        }
    }

    pub fn is_pattern(&self) -> bool {
        !self.quoted && self.name.contains('*')
    }
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct List {
    pub values: Vec<AstNode>,
    pub location: Location,
}
