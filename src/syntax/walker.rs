//! Depth-first event driver over a [`ParseNode`] tree.
//!
//! Every node produces an `enter_node` event before its children and an
//! `exit_node` event after them; terminal children produce `visit_terminal`
//! in order. The listener decides what to build from the events.

use crate::syntax::{ParseChild, ParseNode, Token};

pub trait ParseTreeListener {
    type Error;

    fn enter_node(&mut self, node: &ParseNode) -> Result<(), Self::Error>;

    fn visit_terminal(&mut self, token: &Token) -> Result<(), Self::Error>;

    fn exit_node(&mut self, node: &ParseNode) -> Result<(), Self::Error>;
}

/// Walks `node` in pre-order/post-order, stopping at the first listener error.
pub fn walk<L: ParseTreeListener>(listener: &mut L, node: &ParseNode) -> Result<(), L::Error> {
    listener.enter_node(node)?;
    for child in &node.children {
        match child {
            ParseChild::Terminal(token) => listener.visit_terminal(token)?,
            ParseChild::Node(inner) => walk(listener, inner)?,
        }
    }
    listener.exit_node(node)
}
