//! SQL template parser
//!
//! Converts template text into a [`ParseNode`] tree with source spans. The
//! parser is purely syntactic; reshaping into the canonical tree happens in
//! the engine.

use pest::{error::InputLocation, iterators::Pair, Parser};
use pest_derive::Parser;

use crate::diagnostics::{SnippetError, SourceContext};
use crate::syntax::{ParseChild, ParseNode, Span, Token};

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
pub struct SqlParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parses one statement or expression fragment.
pub fn parse(source: &SourceContext) -> Result<ParseNode, SnippetError> {
    let text = source.content.as_str();
    if text.trim().is_empty() {
        return Err(SnippetError::Syntax {
            message: "empty template".to_string(),
            src: source.to_named_source(),
            span: Span::new(0, text.len()).into(),
        });
    }

    let mut pairs =
        SqlParser::parse(Rule::statement, text).map_err(|e| convert_parse_error(e, source))?;

    match pairs.next() {
        Some(statement) => Ok(build_node(statement)),
        None => Err(SnippetError::Syntax {
            message: "no statement recognised".to_string(),
            src: source.to_named_source(),
            span: Span::new(0, text.len()).into(),
        }),
    }
}

// ============================================================================
// TREE CONVERSION
// ============================================================================

fn build_node(pair: Pair<Rule>) -> ParseNode {
    let mut node = ParseNode::new(pair.as_rule(), get_span(&pair));
    for inner in pair.into_inner() {
        if is_syntax_only(inner.as_rule()) {
            continue;
        }
        node.children.push(build_child(inner));
    }
    node
}

fn build_child(pair: Pair<Rule>) -> ParseChild {
    if pair.clone().into_inner().next().is_none() {
        return ParseChild::Terminal(Token {
            rule: pair.as_rule(),
            text: pair.as_str().to_string(),
            span: get_span(&pair),
        });
    }
    ParseChild::Node(build_node(pair))
}

/// Keywords that only shape the grammar and carry no value of their own.
pub fn is_syntax_only(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::EOI
            | Rule::k_select
            | Rule::k_from
            | Rule::k_where
            | Rule::k_group
            | Rule::k_by
            | Rule::k_having
            | Rule::k_order
            | Rule::k_limit
            | Rule::k_offset
            | Rule::k_as
            | Rule::k_join
            | Rule::k_on
            | Rule::k_using
            | Rule::k_between
            | Rule::k_and
            | Rule::k_in
            | Rule::k_exists
            | Rule::k_case
            | Rule::k_when
            | Rule::k_then
            | Rule::k_else
            | Rule::k_end
            | Rule::k_cast
            | Rule::k_trim
            | Rule::k_over
            | Rule::k_partition
            | Rule::k_with
            | Rule::k_recursive
            | Rule::k_insert
            | Rule::k_into
            | Rule::k_values
            | Rule::k_update
            | Rule::k_set
            | Rule::k_returning
    )
}

// ============================================================================
// HELPERS
// ============================================================================

fn get_span(pair: &Pair<Rule>) -> Span {
    let span = pair.as_span();
    Span::new(span.start(), span.end())
}

fn convert_parse_error(error: pest::error::Error<Rule>, source: &SourceContext) -> SnippetError {
    let span = match error.location {
        InputLocation::Pos(pos) => Span::new(pos, pos),
        InputLocation::Span((start, end)) => Span::new(start, end),
    };

    SnippetError::Syntax {
        message: error.variant.message().to_string(),
        src: source.to_named_source(),
        span: span.into(),
    }
}
