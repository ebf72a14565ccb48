//! Canonical ES|QL text for commands and expressions.
//!
//! Printed queries parse back to the same tree, locations aside, so external
//! tools can edit an AST and hand the text to Elasticsearch.

use std::fmt::{self, Display, Formatter};

use crate::ast::{
    AstNode, Column, Command, CommandOption, Function, FunctionKind, Literal, LiteralValue,
    NullsPosition, Order, Param, SortDirection, Source,
};
use crate::parser::expression::is_bare_name;
use crate::parser::ParseResult;

impl Display for ParseResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (index, command) in self.ast.iter().enumerate() {
            if index > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", command)?;
        }
        Ok(())
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name.to_uppercase())?;

        let (options, args): (Vec<&AstNode>, Vec<&AstNode>) =
            self.args.iter().partition(|arg| arg.is_option());

        match self.name.as_str() {
            "show" => {
                for arg in args {
                    match arg.as_function() {
                        Some(function) => write!(f, " {}", function.name.to_uppercase())?,
                        None => write!(f, " {}", arg)?,
                    }
                }
            }
            "dissect" | "grok" => {
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                for option in options.iter().filter_map(|option| option.as_option()) {
                    write!(f, " {} =", option.name.to_uppercase())?;
                    for value in &option.args {
                        write!(f, " {}", value)?;
                    }
                }
                return Ok(());
            }
            _ => {
                if !args.is_empty() {
                    write!(f, " ")?;
                    write_separated(f, args, ", ")?;
                }
            }
        }

        for option in options {
            write!(f, " {}", option)?;
        }
        Ok(())
    }
}

fn write_separated<'a, T, I>(f: &mut Formatter<'_>, items: I, separator: &str) -> fmt::Result
where
    T: Display + 'a,
    I: IntoIterator<Item = &'a T>,
{
    for (index, item) in items.into_iter().enumerate() {
        if index > 0 {
            write!(f, "{}", separator)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl Display for AstNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AstNode::Function(function) => write!(f, "{}", function),
            AstNode::Literal(literal) => write!(f, "{}", literal),
            AstNode::Column(column) => write!(f, "{}", column),
            AstNode::Option(option) => write!(f, "{}", option),
            AstNode::List(list) => {
                write!(f, "[")?;
                write_separated(f, &list.values, ", ")?;
                write!(f, "]")
            }
            AstNode::Source(source) => write!(f, "{}", source),
            AstNode::Order(order) => write!(f, "{}", order),
        }
    }
}

/// Binding strength of a printed node; children that bind looser than their
/// parent get parentheses.
fn precedence(node: &AstNode) -> u8 {
    match node {
        AstNode::Function(function) => function_precedence(function),
        // a leading minus reparses as a unary operator
        AstNode::Literal(Literal {
            value: LiteralValue::Integer(value),
            ..
        }) if *value < 0 => 7,
        AstNode::Literal(Literal {
            value: LiteralValue::Decimal(value),
            ..
        }) if value.is_sign_negative() => 7,
        _ => 9,
    }
}

fn function_precedence(function: &Function) -> u8 {
    match function.subtype {
        FunctionKind::BinaryExpression => match function.name.as_str() {
            "=" | "as" => 0,
            "or" => 1,
            "and" => 2,
            "+" | "-" => 5,
            "*" | "/" | "%" => 6,
            _ => 4,
        },
        FunctionKind::UnaryExpression if function.name == "not" => 3,
        FunctionKind::UnaryExpression => 7,
        FunctionKind::PostfixUnaryExpression => 4,
        FunctionKind::InlineCast => 8,
        FunctionKind::VariadicCall => 9,
    }
}

fn write_operand(f: &mut Formatter<'_>, node: &AstNode, parenthesize: bool) -> fmt::Result {
    if parenthesize {
        write!(f, "({})", node)
    } else {
        write!(f, "{}", node)
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let own = function_precedence(self);
        match (self.subtype, self.args.as_slice()) {
            (FunctionKind::BinaryExpression, [left, right]) => {
                write_operand(f, left, own > 0 && precedence(left) < own)?;
                match self.name.as_str() {
                    "in" | "not in" => {
                        write!(f, " {} (", self.name.to_uppercase())?;
                        match right {
                            AstNode::List(list) => write_separated(f, &list.values, ", ")?,
                            other => write!(f, "{}", other)?,
                        }
                        write!(f, ")")
                    }
                    name => {
                        let operator = match name {
                            "or" | "and" | "like" | "not like" | "rlike" | "not rlike" | "as" => {
                                name.to_uppercase()
                            }
                            other => other.to_string(),
                        };
                        write!(f, " {} ", operator)?;
                        write_operand(f, right, own > 0 && precedence(right) <= own)
                    }
                }
            }
            (FunctionKind::UnaryExpression, [operand]) => {
                if self.name == "not" {
                    write!(f, "NOT ")?;
                } else {
                    write!(f, "{}", self.name)?;
                }
                write_operand(f, operand, precedence(operand) < own)
            }
            (FunctionKind::PostfixUnaryExpression, [operand]) => {
                write_operand(f, operand, precedence(operand) < own)?;
                write!(f, " {}", self.name.to_uppercase())
            }
            (FunctionKind::InlineCast, [operand, data_type]) => {
                write_operand(f, operand, precedence(operand) < own)?;
                match data_type {
                    AstNode::Literal(Literal {
                        value: LiteralValue::String(name),
                        ..
                    }) => write!(f, "::{}", name),
                    other => write!(f, "::{}", other),
                }
            }
            (_, args) => {
                write!(f, "{}(", self.name.to_uppercase())?;
                write_separated(f, args, ", ")?;
                write!(f, ")")
            }
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.value {
            LiteralValue::Integer(value) => write!(f, "{}", value),
            LiteralValue::Decimal(value) => write!(f, "{:?}", value),
            LiteralValue::String(value) => write_string(f, value),
            LiteralValue::Boolean(true) => write!(f, "TRUE"),
            LiteralValue::Boolean(false) => write!(f, "FALSE"),
            LiteralValue::Null => write!(f, "NULL"),
            LiteralValue::Param(Param::Unnamed) => write!(f, "?"),
            LiteralValue::Param(Param::Named(name)) => write!(f, "?{}", name),
            LiteralValue::Param(Param::Positional(index)) => write!(f, "?{}", index),
        }
    }
}

fn write_string(f: &mut Formatter<'_>, value: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in value.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\r' => write!(f, "\\r")?,
            '\t' => write!(f, "\\t")?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "\"")
}

fn is_plain_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '@' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && is_bare_name(part)
}

impl Display for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (index, part) in self.parts.iter().enumerate() {
            if index > 0 {
                write!(f, ".")?;
            }
            let raw = !self.quoted && (part.contains('*') || is_plain_identifier(part));
            if raw {
                write!(f, "{}", part)?;
            } else {
                write!(f, "`{}`", part.replace('`', "``"))?;
            }
        }
        Ok(())
    }
}

impl Display for CommandOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name.to_uppercase())?;
        if !self.args.is_empty() {
            write!(f, " ")?;
            write_separated(f, &self.args, ", ")?;
        }
        Ok(())
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let bare = !self.name.is_empty()
            && !self.name.eq_ignore_ascii_case("metadata")
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "_@-*.:+%".contains(c));
        if bare {
            write!(f, "{}", self.name)
        } else {
            write_string(f, &self.name)
        }
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)?;
        match self.direction {
            Some(SortDirection::Asc) => write!(f, " ASC")?,
            Some(SortDirection::Desc) => write!(f, " DESC")?,
            None => {}
        }
        match self.nulls {
            Some(NullsPosition::First) => write!(f, " NULLS FIRST"),
            Some(NullsPosition::Last) => write!(f, " NULLS LAST"),
            None => Ok(()),
        }
    }
}
