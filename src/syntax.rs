//! Syntax module for SQL templates
//!
//! This module defines the parse-tree contract between the grammar front end
//! and the assembly engine. A [`ParseNode`] is an immutable, rule-labelled
//! tree with ordered children, each either a captured terminal [`Token`] or a
//! nested node. The pest front end in [`parser`] produces these trees, but the
//! engine accepts any tree that honours the same rule vocabulary.

use serde::{Deserialize, Serialize};

pub mod parser;
pub mod walker;

pub use parser::Rule;
pub use walker::{walk, ParseTreeListener};

/// Identifier of a grammar production.
pub type RuleKind = Rule;

/// Represents a span in the source code as byte offsets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the covered slice of `source`, or an empty string if the span
    /// does not fit.
    pub fn slice<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        miette::SourceSpan::from(span.start..span.end)
    }
}

/// A captured terminal: rule kind, raw text and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub rule: RuleKind,
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseChild {
    Terminal(Token),
    Node(ParseNode),
}

/// One node of the parse tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseNode {
    pub rule: RuleKind,
    pub children: Vec<ParseChild>,
    pub span: Span,
}

impl ParseNode {
    pub fn new(rule: RuleKind, span: Span) -> Self {
        Self {
            rule,
            children: Vec::new(),
            span,
        }
    }

    /// Appends a terminal child. Intended for building trees by hand.
    pub fn with_terminal(mut self, rule: RuleKind, text: &str) -> Self {
        let span = self.span;
        self.children.push(ParseChild::Terminal(Token {
            rule,
            text: text.to_string(),
            span,
        }));
        self
    }

    /// Appends a nested node child. Intended for building trees by hand.
    pub fn with_node(mut self, node: ParseNode) -> Self {
        self.children.push(ParseChild::Node(node));
        self
    }

    /// True when the node has exactly one child and that child is a terminal.
    pub fn is_leaf(&self) -> bool {
        matches!(self.children.as_slice(), [ParseChild::Terminal(_)])
    }

    /// Text of the single terminal child, if the node is a leaf.
    pub fn leaf_text(&self) -> Option<&str> {
        match self.children.as_slice() {
            [ParseChild::Terminal(token)] => Some(token.text.as_str()),
            _ => None,
        }
    }

    /// Rule kind of the first non-terminal child.
    pub fn first_node_rule(&self) -> Option<RuleKind> {
        self.children.iter().find_map(|child| match child {
            ParseChild::Node(node) => Some(node.rule),
            ParseChild::Terminal(_) => None,
        })
    }

    /// Raw source text covered by this node. Falls back to joining terminal
    /// texts when the span does not index into `source` (hand-built trees).
    pub fn raw_text(&self, source: &str) -> String {
        let text = self.span.slice(source);
        if !text.is_empty() {
            return text.to_string();
        }
        let mut parts = Vec::new();
        self.collect_terminals(&mut parts);
        parts.concat()
    }

    fn collect_terminals<'a>(&'a self, out: &mut Vec<&'a str>) {
        for child in &self.children {
            match child {
                ParseChild::Terminal(token) => out.push(&token.text),
                ParseChild::Node(node) => node.collect_terminals(out),
            }
        }
    }

    /// Number of nodes in the tree rooted here.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|child| match child {
                ParseChild::Node(node) => node.node_count(),
                ParseChild::Terminal(_) => 0,
            })
            .sum::<usize>()
    }
}
