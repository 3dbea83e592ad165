//! Boolean connectives and predicates.
//!
//! Predicates are left-factored in the grammar: the left operand is parsed
//! once by `boolean_primary` and already sits in that frame when the
//! predicate finishes. The predicate takes it back so that it sees its full
//! shape, the left operand first.

use crate::ast::{AstNode, Between, Capture, Condition, InList, InPredicate, IsPredicate};
use crate::diagnostics::SnippetError;
use crate::engine::context::AssemblyContext;
use crate::registry::SubstitutionType;
use crate::syntax::Rule;

use super::{node_of, single, text_of, Captures, Outcome, Shape};

/// The predicate's captures with its left operand restored.
fn full_shape(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<(Shape, Vec<Capture>), SnippetError> {
    let mut shape = caps.shape();
    if !caps.named.is_empty() {
        return Err(ctx.structure(shape, "positional captures only"));
    }
    let mut positional = caps.positional;
    if ctx.parent_rule() == Some(Rule::boolean_primary) {
        let left = ctx
            .parent_frame_mut()?
            .take_last_positional()
            .ok_or_else(|| ctx.structure(shape, "a left operand"))?;
        positional.insert(0, left);
        shape.count += 1;
    }
    Ok((shape, positional))
}

fn node(capture: AstNode) -> Result<Outcome, SnippetError> {
    Ok(Outcome::Value(Capture::Node(capture)))
}

// ============================================================================
// CONNECTIVES
// ============================================================================

/// Promotes the expression according to where it is used.
pub(super) fn value_expression(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let span = caps.span;
    let mut value = single(ctx, caps)?;
    match ctx.parent_rule() {
        Some(Rule::derived_column) => {
            ctx.promote(&mut value, SubstitutionType::Predicand, span);
            ctx.pending_output = value.as_node().map(AstNode::display_name);
        }
        Some(Rule::search_condition | Rule::parenthesized_value_expression) => {
            ctx.promote(&mut value, SubstitutionType::Condition, span);
        }
        Some(
            Rule::case_operand
            | Rule::when_operand
            | Rule::case_result
            | Rule::routine_argument
            | Rule::trim_character
            | Rule::trim_source
            | Rule::row_constructor
            | Rule::assignment,
        ) => {
            ctx.promote(&mut value, SubstitutionType::Predicand, span);
        }
        _ => {}
    }
    Ok(Outcome::Value(value))
}

/// `AND`/`OR` chains: operands alternate with operator tokens and become one
/// flat, ordered list.
pub(super) fn boolean_list(
    ctx: &mut AssemblyContext,
    caps: Captures,
    build: fn(Vec<AstNode>) -> AstNode,
) -> Result<Outcome, SnippetError> {
    if caps.len() == 1 {
        return super::collapse(ctx, caps);
    }
    let shape = caps.shape();
    if caps.len() % 2 == 0 || !caps.named.is_empty() {
        return Err(ctx.structure(shape, "operands separated by operators"));
    }

    let mut operands = Vec::with_capacity(caps.len() / 2 + 1);
    for (index, capture) in caps.positional.into_iter().enumerate() {
        if index % 2 == 1 {
            text_of(ctx, shape, capture, "an operator between operands")?;
            continue;
        }
        let mut operand = node_of(ctx, shape, capture, "an operand")?;
        ctx.promote_node(&mut operand, SubstitutionType::Condition, shape.span);
        operands.push(operand);
    }
    node(build(operands))
}

pub(super) fn boolean_factor(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    if caps.len() == 1 {
        return super::collapse(ctx, caps);
    }
    let shape = caps.shape();
    let [negation, operand]: [Capture; 2] = caps
        .positional
        .try_into()
        .map_err(|_| ctx.structure(shape, "NOT and a condition"))?;
    text_of(ctx, shape, negation, "NOT")?;
    let mut operand = node_of(ctx, shape, operand, "a condition")?;
    ctx.promote_node(&mut operand, SubstitutionType::Condition, shape.span);
    node(AstNode::Not(Box::new(operand)))
}

/// `x IS [NOT] TRUE|FALSE|UNKNOWN`
pub(super) fn boolean_test(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    if caps.len() == 1 {
        return super::collapse(ctx, caps);
    }
    let shape = caps.shape();
    let [item, operator]: [Capture; 2] = caps
        .positional
        .try_into()
        .map_err(|_| ctx.structure(shape, "an operand and a truth test"))?;
    let mut item = node_of(ctx, shape, item, "an operand")?;
    ctx.promote_node(&mut item, SubstitutionType::Condition, shape.span);
    node(AstNode::Is(Box::new(IsPredicate {
        item,
        operator: text_of(ctx, shape, operator, "a truth test")?,
        right: None,
    })))
}

// ============================================================================
// PREDICATES
// ============================================================================

pub(super) fn comparison(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let (shape, positional) = full_shape(ctx, caps)?;
    let [left, operator, right]: [Capture; 3] = positional
        .try_into()
        .map_err(|_| ctx.structure(shape, "a left operand, an operator and a right operand"))?;

    let mut left = node_of(ctx, shape, left, "a left operand")?;
    let operator = text_of(ctx, shape, operator, "a comparison operator")?;
    let mut right = node_of(ctx, shape, right, "a right operand")?;
    ctx.promote_node(&mut left, SubstitutionType::Predicand, shape.span);
    ctx.promote_node(&mut right, SubstitutionType::Predicand, shape.span);

    node(AstNode::Condition(Box::new(Condition {
        left,
        operator,
        right,
    })))
}

/// Keywords are recognised wherever they appear; every other capture fills
/// the next of item, range begin and range end.
pub(super) fn between(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let (shape, positional) = full_shape(ctx, caps)?;
    if !(3..=5).contains(&positional.len()) {
        return Err(ctx.structure(shape, "an operand and two range bounds"));
    }

    let mut operator = "between".to_string();
    let mut symmetry = None;
    let mut fields: Vec<AstNode> = Vec::with_capacity(3);
    for capture in positional {
        match capture {
            Capture::Text(word) if word.eq_ignore_ascii_case("not") => {
                operator = "not between".to_string();
            }
            Capture::Text(word)
                if word.eq_ignore_ascii_case("symmetric")
                    || word.eq_ignore_ascii_case("asymmetric") =>
            {
                symmetry = Some(word);
            }
            other => {
                if fields.len() == 3 {
                    return Err(ctx.structure(shape, "exactly three operands"));
                }
                let mut field = node_of(ctx, shape, other, "an operand")?;
                ctx.promote_node(&mut field, SubstitutionType::Predicand, shape.span);
                fields.push(field);
            }
        }
    }

    let mut fields = fields.into_iter();
    let (Some(item), Some(range_begin), Some(range_end)) =
        (fields.next(), fields.next(), fields.next())
    else {
        return Err(ctx.structure(shape, "an operand and two range bounds"));
    };
    node(AstNode::Between(Box::new(Between {
        item,
        operator,
        symmetry,
        range_begin,
        range_end,
    })))
}

/// `x [NOT] IN (...)`. The list itself is the substitution target when it
/// is a placeholder.
pub(super) fn in_predicate(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let (shape, positional) = full_shape(ctx, caps)?;
    let mut items = positional.into_iter();
    let (item, negation, list) = match (items.next(), items.next(), items.next(), items.next()) {
        (Some(item), Some(list), None, None) => (item, None, list),
        (Some(item), Some(negation), Some(list), None) => (item, Some(negation), list),
        _ => return Err(ctx.structure(shape, "an operand, an optional NOT and a list")),
    };
    let negated = match negation {
        Some(negation) => {
            let word = text_of(ctx, shape, negation, "NOT")?;
            if !word.eq_ignore_ascii_case("not") {
                return Err(ctx.structure(shape, "NOT"));
            }
            true
        }
        None => false,
    };

    let mut item = node_of(ctx, shape, item, "an operand")?;
    let mut list = node_of(ctx, shape, list, "a list, a query or a substitution")?;
    ctx.promote_node(&mut item, SubstitutionType::Predicand, shape.span);
    ctx.promote_node(&mut list, SubstitutionType::InList, shape.span);
    let list = if negated {
        InList::NotInList(list)
    } else {
        InList::InList(list)
    };
    node(AstNode::In(Box::new(InPredicate { item, list })))
}

/// `x IS [NOT] NULL`
pub(super) fn null_predicate(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let (shape, positional) = full_shape(ctx, caps)?;
    let [item, operator]: [Capture; 2] = positional
        .try_into()
        .map_err(|_| ctx.structure(shape, "an operand and IS [NOT] NULL"))?;
    let mut item = node_of(ctx, shape, item, "an operand")?;
    ctx.promote_node(&mut item, SubstitutionType::Predicand, shape.span);
    node(AstNode::Is(Box::new(IsPredicate {
        item,
        operator: text_of(ctx, shape, operator, "IS [NOT] NULL")?,
        right: None,
    })))
}

/// `x IS [NOT] DISTINCT FROM y`
pub(super) fn distinct_predicate(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let (shape, positional) = full_shape(ctx, caps)?;
    let [item, operator, right]: [Capture; 3] = positional
        .try_into()
        .map_err(|_| ctx.structure(shape, "two operands around IS [NOT] DISTINCT FROM"))?;
    let mut item = node_of(ctx, shape, item, "an operand")?;
    let mut right = node_of(ctx, shape, right, "an operand")?;
    ctx.promote_node(&mut item, SubstitutionType::Predicand, shape.span);
    ctx.promote_node(&mut right, SubstitutionType::Predicand, shape.span);
    node(AstNode::Is(Box::new(IsPredicate {
        item,
        operator: text_of(ctx, shape, operator, "IS [NOT] DISTINCT FROM")?,
        right: Some(right),
    })))
}

pub(super) fn exists(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let query = node_of(ctx, shape, single(ctx, caps)?, "a query")?;
    node(AstNode::Exists(Box::new(query)))
}

pub(super) fn row_value_predicand(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let span = caps.span;
    let mut value = single(ctx, caps)?;
    if matches!(
        ctx.parent_rule(),
        Some(
            Rule::comparison_predicate
                | Rule::between_predicate
                | Rule::distinct_predicate
                | Rule::in_value_list
        )
    ) {
        ctx.promote(&mut value, SubstitutionType::Predicand, span);
    }
    Ok(Outcome::Value(value))
}
