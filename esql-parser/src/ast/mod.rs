pub mod expression;
pub mod query;
pub mod walk;

pub use expression::{
    AstNode, Column, Function, FunctionKind, List, Literal, LiteralType, LiteralValue, Param,
};
pub use query::{Command, CommandOption, NullsPosition, Order, SortDirection, Source};
pub use walk::{walk, walk_with_parent, Parent};
