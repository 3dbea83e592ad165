//! Value expressions, references, functions and CASE.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{
    AstNode, Calculation, Capture, Case, Cast, ColumnRef, Function, Substitution,
    SubstitutionParts, Trim, When, Window, WindowFunction,
};
use crate::diagnostics::SnippetError;
use crate::engine::context::AssemblyContext;

use super::{node_list, node_of, single, text_of, Captures, Outcome};

static SUBSTITUTION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<([^<>]+)>$").expect("static pattern"));

fn node(value: AstNode) -> Result<Outcome, SnippetError> {
    Ok(Outcome::Value(Capture::Node(value)))
}

// ============================================================================
// OPERATORS
// ============================================================================

/// `a || b || c` as one flat list.
pub(super) fn concatenation(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    if caps.len() == 1 {
        return super::collapse(ctx, caps);
    }
    let shape = caps.shape();
    if caps.len() % 2 == 0 || !caps.named.is_empty() {
        return Err(ctx.structure(shape, "operands separated by ||"));
    }
    let mut operands = Vec::with_capacity(caps.len() / 2 + 1);
    for (index, capture) in caps.positional.into_iter().enumerate() {
        if index % 2 == 1 {
            text_of(ctx, shape, capture, "||")?;
        } else {
            operands.push(node_of(ctx, shape, capture, "an operand")?);
        }
    }
    node(AstNode::Concatenate(operands))
}

/// Additive and multiplicative chains, folded to the left:
/// `a - b - c` is `(a - b) - c`.
pub(super) fn arithmetic_fold(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    if caps.len() == 1 {
        return super::collapse(ctx, caps);
    }
    let shape = caps.shape();
    if caps.len() % 2 == 0 || !caps.named.is_empty() {
        return Err(ctx.structure(shape, "operands separated by operators"));
    }
    let mut items = caps.positional.into_iter();
    let mut acc = match items.next() {
        Some(first) => node_of(ctx, shape, first, "an operand")?,
        None => return Err(ctx.structure(shape, "an operand")),
    };
    while let (Some(operator), Some(right)) = (items.next(), items.next()) {
        acc = AstNode::Calculation(Box::new(Calculation {
            left: acc,
            operator: text_of(ctx, shape, operator, "an arithmetic operator")?,
            right: node_of(ctx, shape, right, "an operand")?,
        }));
    }
    node(acc)
}

/// Unary sign. A negated number stays a literal; any other negation is
/// multiplication by -1.
pub(super) fn factor(ctx: &mut AssemblyContext, caps: Captures) -> Result<Outcome, SnippetError> {
    if caps.len() == 1 {
        return super::collapse(ctx, caps);
    }
    let shape = caps.shape();
    let [sign, operand]: [Capture; 2] = caps
        .positional
        .try_into()
        .map_err(|_| ctx.structure(shape, "a sign and an operand"))?;
    let sign = text_of(ctx, shape, sign, "a sign")?;
    let operand = node_of(ctx, shape, operand, "an operand")?;

    match sign.as_str() {
        "+" => node(operand),
        "-" => match operand {
            AstNode::Literal(text) if text.starts_with(|c: char| c.is_ascii_digit() || c == '.') => {
                node(AstNode::Literal(format!("-{text}")))
            }
            other => node(AstNode::Calculation(Box::new(Calculation {
                left: AstNode::Literal("-1".to_string()),
                operator: "*".to_string(),
                right: other,
            }))),
        },
        _ => Err(ctx.structure(shape, "+ or -")),
    }
}

pub(super) fn signed_numeric_literal(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let mut text = String::new();
    for capture in caps.positional {
        text.push_str(&text_of(ctx, shape, capture, "a signed number")?);
    }
    if text.is_empty() {
        return Err(ctx.structure(shape, "a signed number"));
    }
    node(AstNode::Literal(text))
}

pub(super) fn parentheses(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let inner = node_of(ctx, shape, single(ctx, caps)?, "an expression")?;
    node(AstNode::Parentheses(Box::new(inner)))
}

// ============================================================================
// LITERALS AND REFERENCES
// ============================================================================

pub(super) fn literal(ctx: &mut AssemblyContext, caps: Captures) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let text = text_of(ctx, shape, single(ctx, caps)?, "a literal token")?;
    if text.eq_ignore_ascii_case("null") {
        return node(AstNode::NullLiteral);
    }
    node(AstNode::Literal(text))
}

/// `column`, `table.column` or `schema.table.column`. Every reference is
/// recorded against the current scope.
pub(super) fn column_reference(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let mut parts = caps
        .positional
        .into_iter()
        .map(|capture| text_of(ctx, shape, capture, "name parts"))
        .collect::<Result<Vec<_>, _>>()?;
    if !(1..=3).contains(&parts.len()) {
        return Err(ctx.structure(shape, "one to three name parts"));
    }
    let column = parts.pop().unwrap_or_default();
    let table = parts.pop();
    let column = ColumnRef {
        schema: parts.pop(),
        table,
        column,
    };
    ctx.resolver.record_column(&column);
    node(AstNode::Column(column))
}

/// `<name>`, `<table.column>` or `<schema.table.column>`. The node keeps the
/// delimited spelling as its name; the type is set later by promotion.
pub(super) fn substitution_variable(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let name = text_of(ctx, shape, single(ctx, caps)?, "a substitution name")?;
    let inner = SUBSTITUTION_NAME
        .captures(&name)
        .and_then(|found| found.get(1))
        .map(|inner| inner.as_str().to_string())
        .ok_or_else(|| ctx.structure(shape, "a name between < and >"))?;

    let mut parts: Vec<String> = inner.split('.').map(str::to_string).collect();
    if parts.iter().any(String::is_empty) {
        return Err(ctx.structure(shape, "non-empty name parts"));
    }
    let parts = match parts.len() {
        1 => SubstitutionParts::Name(parts.remove(0)),
        2 => {
            let column = parts.remove(1);
            SubstitutionParts::TableColumn {
                table: parts.remove(0),
                column,
            }
        }
        3 => {
            let column = parts.remove(2);
            let table = parts.remove(1);
            SubstitutionParts::SchemaTableColumn {
                schema: parts.remove(0),
                table,
                column,
            }
        }
        _ => return Err(ctx.structure(shape, "at most three name parts")),
    };
    node(AstNode::Substitution(Substitution {
        name,
        parts,
        declared_type: None,
    }))
}

// ============================================================================
// FUNCTIONS
// ============================================================================

pub(super) fn routine_name(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let parts = caps
        .positional
        .into_iter()
        .map(|capture| text_of(ctx, shape, capture, "name parts"))
        .collect::<Result<Vec<_>, _>>()?;
    if parts.is_empty() {
        return Err(ctx.structure(shape, "a function name"));
    }
    Ok(Outcome::Value(Capture::Text(parts.join("."))))
}

/// A function call, or a window function when an `OVER` clause follows.
pub(super) fn routine_invocation(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    if !caps.named.is_empty() {
        return Err(ctx.structure(shape, "positional captures only"));
    }
    let mut items = caps.positional.into_iter().peekable();
    let name = match items.next() {
        Some(capture) => text_of(ctx, shape, capture, "a function name")?,
        None => return Err(ctx.structure(shape, "a function name")),
    };
    let quantifier = match items.next_if(Capture::is_text) {
        Some(capture) => Some(text_of(ctx, shape, capture, "a set quantifier")?.to_lowercase()),
        None => None,
    };
    let parameters = match items.next_if(|capture| matches!(capture, Capture::List(_))) {
        Some(capture) => capture.into_list().unwrap_or_default(),
        None => Vec::new(),
    };
    let over = match items.next() {
        Some(Capture::Node(AstNode::Over(window))) => Some(*window),
        Some(_) => return Err(ctx.structure(shape, "an OVER clause after the arguments")),
        None => None,
    };
    if items.next().is_some() {
        return Err(ctx.structure(shape, "name, quantifier, arguments and OVER"));
    }

    let (schema, function_name) = match name.rsplit_once('.') {
        Some((schema, function)) => (Some(schema.to_string()), function.to_string()),
        None => (None, name),
    };
    let function = Function {
        schema,
        function_name,
        quantifier,
        parameters,
    };
    match over {
        Some(over) => node(AstNode::WindowFunction(Box::new(WindowFunction {
            function,
            over,
        }))),
        None => node(AstNode::Function(Box::new(function))),
    }
}

pub(super) fn routine_argument(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    if let [Capture::Text(star)] = caps.positional.as_slice() {
        if star == "*" {
            return node(AstNode::Column(ColumnRef::bare("*")));
        }
    }
    super::collapse(ctx, caps)
}

pub(super) fn over_clause(
    ctx: &mut AssemblyContext,
    mut caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let take_list = |caps: &mut Captures, key: &str| match caps.take_named(key) {
        Some(capture) => capture
            .into_list()
            .ok_or_else(|| ctx.structure(shape, "a list")),
        None => Ok(Vec::new()),
    };
    let window = Window {
        partition_by: take_list(&mut caps, "partition_by")?,
        orderby: take_list(&mut caps, "orderby")?,
    };
    if !caps.positional.is_empty() || !caps.named.is_empty() {
        return Err(ctx.structure(shape, "PARTITION BY and ORDER BY only"));
    }
    node(AstNode::Over(Box::new(window)))
}

pub(super) fn cast(ctx: &mut AssemblyContext, caps: Captures) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let [value, data_type]: [Capture; 2] = caps
        .positional
        .try_into()
        .map_err(|_| ctx.structure(shape, "a value and a type"))?;
    let data_type = text_of(ctx, shape, data_type, "a type name")?
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    node(AstNode::Cast(Box::new(Cast {
        value: node_of(ctx, shape, value, "a value")?,
        data_type,
    })))
}

/// `TRIM([LEADING|TRAILING|BOTH] [chars] FROM value)` or `TRIM(value)`.
pub(super) fn trim_operands(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let mut qualifier = None;
    let mut operands = Vec::with_capacity(2);
    for capture in caps.positional {
        match capture {
            Capture::Text(text) if qualifier.is_none() && operands.is_empty() => {
                qualifier = Some(text.to_lowercase());
            }
            other => operands.push(node_of(ctx, shape, other, "an operand")?),
        }
    }
    let mut operands = operands.into_iter();
    let trim = match (operands.next(), operands.next(), operands.next()) {
        (Some(value), None, None) => Trim {
            qualifier,
            trim_character: None,
            value,
        },
        (Some(trim_character), Some(value), None) => Trim {
            qualifier,
            trim_character: Some(trim_character),
            value,
        },
        _ => return Err(ctx.structure(shape, "an optional trim character and a value")),
    };
    node(AstNode::Trim(Box::new(trim)))
}

// ============================================================================
// CASE
// ============================================================================

pub(super) fn case_expression(
    ctx: &mut AssemblyContext,
    mut caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let value = caps
        .take_named("value")
        .map(|capture| node_of(ctx, shape, capture, "a case operand"))
        .transpose()?;
    let else_result = caps
        .take_named("else")
        .map(|capture| node_of(ctx, shape, capture, "an ELSE result"))
        .transpose()?;
    let when = node_list(ctx, caps)?
        .into_iter()
        .map(|item| match item {
            AstNode::When(when) => Ok(*when),
            _ => Err(ctx.structure(shape, "WHEN clauses")),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if when.is_empty() {
        return Err(ctx.structure(shape, "at least one WHEN clause"));
    }
    node(AstNode::Case(Box::new(Case {
        value,
        when,
        else_result,
    })))
}

pub(super) fn when_clause(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let [when, then]: [Capture; 2] = caps
        .positional
        .try_into()
        .map_err(|_| ctx.structure(shape, "a condition and a result"))?;
    node(AstNode::When(Box::new(When {
        when: node_of(ctx, shape, when, "a condition")?,
        then: node_of(ctx, shape, then, "a result")?,
    })))
}
