//! Depth-first traversal over commands and their argument trees.
//!
//! Nodes hold no back-references, so the only way to see a node's parent is
//! [`walk_with_parent`].

use super::{AstNode, Command};

/// What a visited node hangs off.
#[derive(Debug, Clone, Copy)]
pub enum Parent<'a> {
    Command(&'a Command),
    Node(&'a AstNode),
}

/// Visits every argument node of every command, pre-order.
pub fn walk<'a, F>(commands: &'a [Command], mut visit: F)
where
    F: FnMut(&'a AstNode),
{
    walk_with_parent(commands, |node, _| visit(node));
}

pub fn walk_with_parent<'a, F>(commands: &'a [Command], mut visit: F)
where
    F: FnMut(&'a AstNode, Parent<'a>),
{
    for command in commands {
        for arg in &command.args {
            walk_node(arg, Parent::Command(command), &mut visit);
        }
    }
}

fn walk_node<'a, F>(node: &'a AstNode, parent: Parent<'a>, visit: &mut F)
where
    F: FnMut(&'a AstNode, Parent<'a>),
{
    visit(node, parent);
    for child in node.children() {
        walk_node(child, Parent::Node(node), visit);
    }
}
