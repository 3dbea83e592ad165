//! Shared helpers for the integration tests.

#![allow(dead_code)]

use sqlsnip::ast::{AstNode, Query};
use sqlsnip::syntax::{ParseNode, Rule, Span};
use sqlsnip::{assemble, ConflictPolicy, Engine, EngineConfig, Snippet, SnippetError, SourceContext};

/// Processes `sql` with the default configuration, failing the test on error.
pub fn snippet(sql: &str) -> Snippet {
    match sqlsnip::parse_snippet(sql) {
        Ok(snippet) => snippet,
        Err(e) => panic!("`{sql}` failed: {e:?}"),
    }
}

pub fn process_with(sql: &str, config: EngineConfig) -> Result<Snippet, SnippetError> {
    Engine::new(config)?.process("test.sql", sql)
}

pub fn process_with_policy(sql: &str, policy: ConflictPolicy) -> Result<Snippet, SnippetError> {
    process_with(sql, EngineConfig::default().with_conflict_policy(policy))
}

/// The top-level query of `snippet`.
pub fn query(snippet: &Snippet) -> &Query {
    match snippet.ast() {
        AstNode::Query(query) => query,
        other => panic!("expected a query, got {}", other.type_name()),
    }
}

/// The WHERE condition of a single `SELECT`.
pub fn where_of(sql: &str) -> AstNode {
    let snippet = snippet(sql);
    query(&snippet)
        .where_clause
        .clone()
        .unwrap_or_else(|| panic!("`{sql}` has no WHERE clause"))
}

// ---------------------------------------------------------------------------
// Hand-built trees
// ---------------------------------------------------------------------------

pub fn leaf(rule: Rule, terminal: Rule, text: &str) -> ParseNode {
    ParseNode::new(rule, Span::default()).with_terminal(terminal, text)
}

pub fn node(rule: Rule, children: Vec<ParseNode>) -> ParseNode {
    children
        .into_iter()
        .fold(ParseNode::new(rule, Span::default()), ParseNode::with_node)
}

pub fn column(name: &str) -> ParseNode {
    leaf(Rule::column_reference, Rule::identifier, name)
}

pub fn number(text: &str) -> ParseNode {
    leaf(Rule::literal, Rule::unsigned_numeric_literal, text)
}

pub fn assemble_tree(tree: &ParseNode) -> Result<Snippet, SnippetError> {
    assemble(tree, &SourceContext::inline(""), &EngineConfig::default())
}
