use serde::Serialize;

use super::expression::AstNode;
use crate::spans::Location;

/// One pipeline stage, e.g. `WHERE a > 1`.
#[derive(Debug, PartialEq, Clone, Serialize)]
#[serde(tag = "type", rename = "command")]
pub struct Command {
    /// Lowercased command keyword
    pub name: String,
    pub args: Vec<AstNode>,
    pub location: Location,
    /// Set when error recovery cut the command short
    pub incomplete: bool,
}

impl Command {
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Command {
            name: name.into(),
            args: Vec::new(),
            location,
            incomplete: false,
        }
    }

    pub fn options(&self) -> impl Iterator<Item = &CommandOption> {
        self.args.iter().filter_map(AstNode::as_option)
    }

    /// First option called `name`, matched case-insensitively.
    pub fn option(&self, name: &str) -> Option<&CommandOption> {
        self.options()
            .find(|option| option.name.eq_ignore_ascii_case(name))
    }
}

/// A keyword clause nested in a command, such as `METADATA _id` in `FROM`
/// or `BY host` in `STATS`.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct CommandOption {
    /// Lowercased option keyword
    pub name: String,
    pub args: Vec<AstNode>,
    pub location: Location,
}

/// An index pattern in `FROM`, optionally prefixed by a remote cluster.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct Source {
    /// Full text as written, without quotes
    pub name: String,
    pub cluster: Option<String>,
    pub index: String,
    pub location: Location,
}

/// A `SORT` key.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Order {
    pub expression: Box<AstNode>,
    pub direction: Option<SortDirection>,
    pub nulls: Option<NullsPosition>,
    pub location: Location,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NullsPosition {
    First,
    Last,
}
