//! Production transform catalog.
//!
//! Each grammar production finishes through one reshaping rule that turns its
//! captures into a canonical node. The captures arrive in child order, with
//! named entries for values a clause production relocated into its parent.
//! A capture count that matches none of a rule's shapes is a structural
//! error, reported with the rule kind and the count.

mod clauses;
mod expressions;
mod predicates;

use crate::ast::{AstNode, Capture, Unrecognized};
use crate::diagnostics::{structure_error, SnippetError};
use crate::engine::assembler::NodeValue;
use crate::engine::context::AssemblyContext;
use crate::snippet::ScopeKind;
use crate::syntax::{ParseNode, Rule, RuleKind, Span};

/// Where a finished value goes in the parent frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Under the parent's next positional key.
    Value(Capture),
    /// Under a named semantic key, replacing positional placement.
    Keyed(&'static str, Capture),
}

// ============================================================================
// CAPTURES
// ============================================================================

/// The finished captures of one node, with the type tag already stripped.
#[derive(Debug)]
pub(crate) struct Captures {
    pub rule: RuleKind,
    pub span: Span,
    pub positional: Vec<Capture>,
    pub named: Vec<(&'static str, Capture)>,
}

/// Enough of a capture set to report a structural error after the captures
/// have been consumed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Shape {
    pub rule: RuleKind,
    pub span: Span,
    pub count: usize,
}

impl Captures {
    pub fn new(node: &ParseNode, value: NodeValue) -> Self {
        let (positional, named) = match value {
            NodeValue::Leaf(text) => (vec![Capture::Text(text)], Vec::new()),
            NodeValue::Container(frame) => frame.into_parts(),
        };
        Self {
            rule: node.rule,
            span: node.span,
            positional,
            named,
        }
    }

    pub fn shape(&self) -> Shape {
        Shape {
            rule: self.rule,
            span: self.span,
            count: self.positional.len() + self.named.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn take_named(&mut self, key: &str) -> Option<Capture> {
        let index = self.named.iter().position(|(name, _)| *name == key)?;
        Some(self.named.remove(index).1)
    }
}

impl<'a> AssemblyContext<'a> {
    pub(crate) fn structure(&self, shape: Shape, expected: &str) -> SnippetError {
        structure_error(&self.named_source, shape.rule, shape.count, expected, shape.span)
    }
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// The one positional capture of `caps`, with no named entries.
pub(crate) fn single(ctx: &AssemblyContext, caps: Captures) -> Result<Capture, SnippetError> {
    let shape = caps.shape();
    let mut positional = caps.positional;
    if positional.len() != 1 || !caps.named.is_empty() {
        return Err(ctx.structure(shape, "exactly one capture"));
    }
    positional
        .pop()
        .ok_or_else(|| ctx.structure(shape, "exactly one capture"))
}

/// Single-child collapse: unwraps the wrapper.
pub(crate) fn collapse(ctx: &AssemblyContext, caps: Captures) -> Result<Outcome, SnippetError> {
    Ok(Outcome::Value(single(ctx, caps)?))
}

/// Clause pass-through: the single child, re-keyed for the parent.
pub(crate) fn keyed(
    ctx: &AssemblyContext,
    key: &'static str,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    Ok(Outcome::Keyed(key, single(ctx, caps)?))
}

pub(crate) fn node_of(
    ctx: &AssemblyContext,
    shape: Shape,
    capture: Capture,
    expected: &str,
) -> Result<AstNode, SnippetError> {
    capture
        .into_node()
        .ok_or_else(|| ctx.structure(shape, expected))
}

pub(crate) fn text_of(
    ctx: &AssemblyContext,
    shape: Shape,
    capture: Capture,
    expected: &str,
) -> Result<String, SnippetError> {
    match capture {
        Capture::Text(text) => Ok(text),
        _ => Err(ctx.structure(shape, expected)),
    }
}

/// Joins token captures with single spaces, collapsing whitespace inside
/// multi-word tokens such as `DISTINCT  FROM`.
pub(crate) fn join_tokens(ctx: &AssemblyContext, caps: Captures) -> Result<String, SnippetError> {
    let shape = caps.shape();
    if caps.positional.is_empty() || !caps.named.is_empty() {
        return Err(ctx.structure(shape, "one or more tokens"));
    }
    let mut words = Vec::new();
    for capture in caps.positional {
        let text = text_of(ctx, shape, capture, "tokens only")?;
        words.extend(text.split_whitespace().map(str::to_string));
    }
    Ok(words.join(" "))
}

/// Collects list items, merging items that are themselves lists.
pub(crate) fn flatten_list(
    ctx: &AssemblyContext,
    caps: Captures,
) -> Result<Vec<AstNode>, SnippetError> {
    let shape = caps.shape();
    let mut items = Vec::with_capacity(caps.positional.len());
    for capture in caps.positional {
        match capture {
            Capture::List(nested) | Capture::Node(AstNode::List(nested)) => items.extend(nested),
            Capture::Node(node) => items.push(node),
            Capture::Text(_) => return Err(ctx.structure(shape, "list items")),
        }
    }
    Ok(items)
}

/// Collects list items as they are, one node per capture.
pub(crate) fn node_list(
    ctx: &AssemblyContext,
    caps: Captures,
) -> Result<Vec<AstNode>, SnippetError> {
    let shape = caps.shape();
    caps.positional
        .into_iter()
        .map(|capture| node_of(ctx, shape, capture, "list items"))
        .collect()
}

// ============================================================================
// DISPATCH
// ============================================================================

/// Hooks that must run before a node's children are visited.
pub(crate) fn on_enter(ctx: &mut AssemblyContext, node: &ParseNode) {
    match node.rule {
        Rule::statement if node.first_node_rule() == Some(Rule::value_expression) => {
            ctx.resolver.open_scope(ScopeKind::Fragment);
        }
        Rule::query_specification => {
            ctx.resolver.open_scope(ScopeKind::Query);
        }
        Rule::insert_statement => {
            ctx.resolver.open_scope(ScopeKind::Insert);
        }
        Rule::update_statement => {
            ctx.resolver.open_scope(ScopeKind::Update);
        }
        Rule::query_body => {
            ctx.scope_marks.push(ctx.resolver.next_scope_id());
        }
        Rule::with_list_element => {
            ctx.resolver.enter_cte();
            ctx.scope_marks.push(ctx.resolver.next_scope_id());
        }
        Rule::table_primary => {
            ctx.scope_marks.push(ctx.resolver.next_scope_id());
        }
        _ => {}
    }
}

/// Finishes one node. Rules without an entry here fall back to the default
/// finishing behaviour.
pub(crate) fn finish(
    ctx: &mut AssemblyContext,
    node: &ParseNode,
    value: NodeValue,
) -> Result<Outcome, SnippetError> {
    let caps = Captures::new(node, value);
    match node.rule {
        Rule::statement => {
            if node.first_node_rule() == Some(Rule::value_expression) {
                ctx.resolver.close_scope();
            }
            collapse(ctx, caps)
        }

        // Queries
        Rule::query_expression => {
            if ctx.held_scopes.pop().unwrap_or(false) {
                ctx.resolver.close_scope();
            }
            clauses::query_expression(ctx, caps)
        }
        Rule::query_body => {
            // ORDER BY, LIMIT and OFFSET follow the body and resolve in the
            // scope of its first query.
            let held = ctx
                .scope_marks
                .pop()
                .filter(|scope| *scope < ctx.resolver.next_scope_id());
            if let Some(scope) = held {
                ctx.resolver.reenter_scope(scope);
            }
            ctx.held_scopes.push(held.is_some());
            clauses::set_operation(ctx, caps)
        }
        Rule::query_term => clauses::set_operation(ctx, caps),
        Rule::query_primary | Rule::derived_table | Rule::scalar_subquery => collapse(ctx, caps),
        Rule::query_specification => clauses::query_specification(ctx, caps),
        Rule::with_clause => keyed(ctx, "with", caps),
        Rule::with_list => Ok(Outcome::Value(Capture::List(node_list(ctx, caps)?))),
        Rule::with_list_element => clauses::with_list_element(ctx, caps),

        // Select list
        Rule::select_list => clauses::select_list(ctx, caps),
        Rule::qualified_asterisk => clauses::qualified_asterisk(ctx, caps),
        Rule::derived_column => clauses::derived_column(ctx, caps),

        // FROM
        Rule::from_clause => keyed(ctx, "from", caps),
        Rule::table_reference_list => clauses::table_reference_list(ctx, caps),
        Rule::table_reference => clauses::table_reference(ctx, caps),
        Rule::join_extension => clauses::join_extension(ctx, caps),
        Rule::join_condition => keyed(ctx, "on", caps),
        Rule::named_columns_join => clauses::named_columns_join(ctx, caps),
        Rule::table_primary => clauses::table_primary(ctx, caps),
        Rule::table_name => clauses::table_name(ctx, caps),

        // Clauses
        Rule::where_clause => keyed(ctx, "where", caps),
        Rule::having_clause => keyed(ctx, "having", caps),
        Rule::limit_clause => keyed(ctx, "limit", caps),
        Rule::offset_clause => keyed(ctx, "offset", caps),
        Rule::group_by_clause => keyed(ctx, "groupby", caps),
        Rule::order_by_clause => keyed(ctx, "orderby", caps),
        Rule::grouping_element_list | Rule::sort_specification_list => {
            Ok(Outcome::Value(Capture::List(flatten_list(ctx, caps)?)))
        }
        Rule::search_condition
        | Rule::grouping_element
        | Rule::ordinary_grouping_set
        | Rule::sort_key => collapse(ctx, caps),
        Rule::sort_specification => clauses::sort_specification(ctx, caps),
        Rule::null_ordering => Ok(Outcome::Value(Capture::Text(join_tokens(ctx, caps)?))),

        // Data modification
        Rule::insert_statement => clauses::insert_statement(ctx, caps),
        Rule::insert_column_list => clauses::insert_column_list(ctx, caps),
        Rule::insert_source => collapse(ctx, caps),
        Rule::values_clause | Rule::row_constructor => {
            Ok(Outcome::Value(Capture::List(node_list(ctx, caps)?)))
        }
        Rule::update_statement => clauses::update_statement(ctx, caps),
        Rule::set_clause => Ok(Outcome::Keyed("set", Capture::List(node_list(ctx, caps)?))),
        Rule::assignment => clauses::assignment(ctx, caps),
        Rule::returning_clause => clauses::returning_clause(ctx, caps),

        // Conditions
        Rule::value_expression => predicates::value_expression(ctx, caps),
        Rule::boolean_value_expression => predicates::boolean_list(ctx, caps, AstNode::Or),
        Rule::boolean_term => predicates::boolean_list(ctx, caps, AstNode::And),
        Rule::boolean_factor => predicates::boolean_factor(ctx, caps),
        Rule::boolean_test => predicates::boolean_test(ctx, caps),
        Rule::boolean_primary => collapse(ctx, caps),
        Rule::truth_operator
        | Rule::comp_op
        | Rule::null_operator
        | Rule::distinct_operator => Ok(Outcome::Value(Capture::Text(join_tokens(ctx, caps)?))),
        Rule::comparison_predicate => predicates::comparison(ctx, caps),
        Rule::between_predicate => predicates::between(ctx, caps),
        Rule::in_predicate => predicates::in_predicate(ctx, caps),
        Rule::in_predicate_value => collapse(ctx, caps),
        Rule::in_value_list => Ok(Outcome::Value(Capture::List(node_list(ctx, caps)?))),
        Rule::null_predicate => predicates::null_predicate(ctx, caps),
        Rule::distinct_predicate => predicates::distinct_predicate(ctx, caps),
        Rule::exists_predicate => predicates::exists(ctx, caps),
        Rule::row_value_predicand => predicates::row_value_predicand(ctx, caps),

        // Values
        Rule::common_value_expression => expressions::concatenation(ctx, caps),
        Rule::numeric_value_expression | Rule::term => expressions::arithmetic_fold(ctx, caps),
        Rule::factor => expressions::factor(ctx, caps),
        Rule::signed_numeric_literal => expressions::signed_numeric_literal(ctx, caps),
        Rule::parenthesized_value_expression => expressions::parentheses(ctx, caps),
        Rule::literal => expressions::literal(ctx, caps),
        Rule::column_reference => expressions::column_reference(ctx, caps),
        Rule::substitution_variable => expressions::substitution_variable(ctx, caps),

        // Functions
        Rule::routine_invocation => expressions::routine_invocation(ctx, caps),
        Rule::routine_name => expressions::routine_name(ctx, caps),
        Rule::routine_arguments => Ok(Outcome::Value(Capture::List(node_list(ctx, caps)?))),
        Rule::routine_argument => expressions::routine_argument(ctx, caps),
        Rule::over_clause => expressions::over_clause(ctx, caps),
        Rule::partition_clause => {
            Ok(Outcome::Keyed("partition_by", Capture::List(node_list(ctx, caps)?)))
        }
        Rule::cast_specification => expressions::cast(ctx, caps),
        Rule::trim_function | Rule::trim_character | Rule::trim_source => collapse(ctx, caps),
        Rule::trim_operands => expressions::trim_operands(ctx, caps),

        // CASE
        Rule::case_expression => expressions::case_expression(ctx, caps),
        Rule::case_operand => keyed(ctx, "value", caps),
        Rule::when_clause => expressions::when_clause(ctx, caps),
        Rule::when_operand | Rule::case_result => collapse(ctx, caps),
        Rule::else_clause => keyed(ctx, "else", caps),

        _ => default_finish(caps),
    }
}

/// Leaves finish as their text and single captures pass through. Anything
/// else is kept whole as an unrecognized node.
fn default_finish(caps: Captures) -> Result<Outcome, SnippetError> {
    let Captures {
        rule,
        mut positional,
        named,
        ..
    } = caps;
    if positional.len() == 1 && named.is_empty() {
        return Ok(Outcome::Value(positional.remove(0)));
    }
    let mut entries: Vec<(String, Capture)> = positional
        .into_iter()
        .enumerate()
        .map(|(index, capture)| ((index + 1).to_string(), capture))
        .collect();
    entries.extend(
        named
            .into_iter()
            .map(|(key, capture)| (key.to_string(), capture)),
    );
    Ok(Outcome::Value(Capture::Node(AstNode::Unrecognized(
        Unrecognized {
            rule: format!("{rule:?}"),
            entries,
        },
    ))))
}
