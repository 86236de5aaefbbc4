//! Program tree and the per-scope register/switch alias store that turns
//! its names into physical addresses.

pub mod alias;
mod node;

pub use alias::{RegisterAliasStore, Scope};
pub use node::{BinaryOp, Node};

/// A parsed program, ready for [`crate::ir`] to lower.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    pub declarations: Vec<Node>,
}

impl Ast {
    pub fn new(declarations: Vec<Node>) -> Self {
        Self { declarations }
    }

    /// Function declarations at the top level, in source order.
    pub fn functions(&self) -> impl Iterator<Item = (&str, &[String], &[Node])> {
        self.declarations.iter().filter_map(|d| match d {
            Node::FunctionDeclaration { name, params, body } => {
                Some((name.as_str(), params.as_slice(), body.as_slice()))
            }
            _ => None,
        })
    }

    /// Global variable declarations at the top level, in source order.
    pub fn global_variables(&self) -> impl Iterator<Item = (&str, u32)> {
        self.declarations.iter().filter_map(|d| match d {
            Node::GlobalVariableDeclaration { name, count } => Some((name.as_str(), *count)),
            _ => None,
        })
    }

    /// Top-level `event` declarations, in source order.
    pub fn events(&self) -> impl Iterator<Item = (&[Node], &[Node])> {
        self.declarations.iter().filter_map(|d| match d {
            Node::EventDeclaration { conditions, actions } => {
                Some((conditions.as_slice(), actions.as_slice()))
            }
            _ => None,
        })
    }
}
