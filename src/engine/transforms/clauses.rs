//! Query, clause, table and data-modification productions.

use crate::ast::{
    Aliased, AstNode, Assignment, Capture, ColumnRef, Cte, Insert, Join, JoinExtension, NullOrder,
    Query, QueryExpression, QueryTail, SetOperation, SortOrder, SortSpec, TableName, TableRef,
    TableSource, Update,
};
use crate::diagnostics::SnippetError;
use crate::engine::context::AssemblyContext;
use crate::registry::SubstitutionType;

use super::{node_list, node_of, single, text_of, Captures, Outcome, Shape};

// ============================================================================
// QUERIES
// ============================================================================

fn list_of(
    ctx: &AssemblyContext,
    shape: Shape,
    capture: Option<Capture>,
) -> Result<Vec<AstNode>, SnippetError> {
    match capture {
        Some(capture) => capture
            .into_list()
            .ok_or_else(|| ctx.structure(shape, "a list")),
        None => Ok(Vec::new()),
    }
}

fn optional_node(
    ctx: &AssemblyContext,
    shape: Shape,
    capture: Option<Capture>,
) -> Result<Option<AstNode>, SnippetError> {
    capture
        .map(|capture| node_of(ctx, shape, capture, "a node"))
        .transpose()
}

fn ctes_of(
    ctx: &AssemblyContext,
    shape: Shape,
    capture: Option<Capture>,
) -> Result<Vec<Cte>, SnippetError> {
    list_of(ctx, shape, capture)?
        .into_iter()
        .map(|node| match node {
            AstNode::Cte(cte) => Ok(*cte),
            _ => Err(ctx.structure(shape, "common table expressions")),
        })
        .collect()
}

/// Attaches `WITH`, `ORDER BY`, `LIMIT` and `OFFSET` to the body they apply
/// to. A body that already has its own tail is wrapped instead.
fn attach_tail(body: AstNode, tail: QueryTail) -> AstNode {
    match body {
        AstNode::Query(mut query)
            if query.with.is_empty()
                && query.orderby.is_empty()
                && query.limit.is_none()
                && query.offset.is_none() =>
        {
            query.with = tail.with;
            query.orderby = tail.orderby;
            query.limit = tail.limit;
            query.offset = tail.offset;
            AstNode::Query(query)
        }
        AstNode::Union(mut op) if op.tail.is_empty() => {
            op.tail = tail;
            AstNode::Union(op)
        }
        AstNode::Except(mut op) if op.tail.is_empty() => {
            op.tail = tail;
            AstNode::Except(op)
        }
        AstNode::Intersect(mut op) if op.tail.is_empty() => {
            op.tail = tail;
            AstNode::Intersect(op)
        }
        other => AstNode::QueryExpression(Box::new(QueryExpression { query: other, tail })),
    }
}

pub(super) fn query_expression(
    ctx: &mut AssemblyContext,
    mut caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let tail = QueryTail {
        with: ctes_of(ctx, shape, caps.take_named("with"))?,
        orderby: list_of(ctx, shape, caps.take_named("orderby"))?,
        limit: optional_node(ctx, shape, caps.take_named("limit"))?,
        offset: optional_node(ctx, shape, caps.take_named("offset"))?,
    };
    let body = single(ctx, caps)?;
    if tail.is_empty() {
        return Ok(Outcome::Value(body));
    }
    let body = node_of(ctx, shape, body, "a query body")?;
    Ok(Outcome::Value(Capture::Node(attach_tail(body, tail))))
}

/// Left fold of `UNION`/`EXCEPT` or `INTERSECT` chains.
pub(super) fn set_operation(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    if caps.len() == 1 {
        return super::collapse(ctx, caps);
    }
    let shape = caps.shape();
    let mut items = caps.positional.into_iter();
    let first = items
        .next()
        .ok_or_else(|| ctx.structure(shape, "a query"))?;
    let mut acc = node_of(ctx, shape, first, "a query")?;

    while let Some(op) = items.next() {
        let op = text_of(ctx, shape, op, "a set operator")?.to_lowercase();
        let mut next = items
            .next()
            .ok_or_else(|| ctx.structure(shape, "an operand after the set operator"))?;
        let mut quantifier = None;
        if next.is_text() {
            quantifier = next.as_text().map(str::to_lowercase);
            next = items
                .next()
                .ok_or_else(|| ctx.structure(shape, "an operand after the quantifier"))?;
        }
        let right = node_of(ctx, shape, next, "a query")?;
        let set = Box::new(SetOperation {
            quantifier,
            left: acc,
            right,
            tail: QueryTail::default(),
        });
        acc = match op.as_str() {
            "union" => AstNode::Union(set),
            "except" => AstNode::Except(set),
            "intersect" => AstNode::Intersect(set),
            _ => return Err(ctx.structure(shape, "UNION, EXCEPT or INTERSECT")),
        };
    }
    Ok(Outcome::Value(Capture::Node(acc)))
}

pub(super) fn query_specification(
    ctx: &mut AssemblyContext,
    mut caps: Captures,
) -> Result<Outcome, SnippetError> {
    ctx.resolver.close_scope();
    let shape = caps.shape();

    let select = caps
        .take_named("select")
        .ok_or_else(|| ctx.structure(shape, "a select list"))?;
    let mut query = Query {
        select: list_of(ctx, shape, Some(select))?,
        from: optional_node(ctx, shape, caps.take_named("from"))?,
        where_clause: optional_node(ctx, shape, caps.take_named("where"))?,
        groupby: list_of(ctx, shape, caps.take_named("groupby"))?,
        having: optional_node(ctx, shape, caps.take_named("having"))?,
        ..Query::default()
    };

    match caps.positional.len() {
        0 => {}
        1 => {
            let quantifier = caps.positional.remove(0);
            query.quantifier = Some(text_of(ctx, shape, quantifier, "a set quantifier")?.to_lowercase());
        }
        _ => return Err(ctx.structure(shape, "at most a set quantifier besides the clauses")),
    }
    if !caps.named.is_empty() {
        return Err(ctx.structure(shape, "only SELECT, FROM, WHERE, GROUP BY and HAVING"));
    }
    Ok(Outcome::Value(Capture::Node(AstNode::Query(Box::new(query)))))
}

pub(super) fn with_list_element(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let mark = ctx.scope_marks.pop();
    ctx.resolver.exit_cte();
    let shape = caps.shape();
    let [name, query]: [Capture; 2] = caps
        .positional
        .try_into()
        .map_err(|_| ctx.structure(shape, "a name and a query"))?;
    let name = text_of(ctx, shape, name, "a name")?;
    let query = node_of(ctx, shape, query, "a query")?;

    if let Some(scope) = mark.filter(|scope| *scope < ctx.resolver.next_scope_id()) {
        ctx.resolver.register_cte(&name, scope);
    }
    Ok(Outcome::Value(Capture::Node(AstNode::Cte(Box::new(Cte { name, query })))))
}

// ============================================================================
// SELECT LIST
// ============================================================================

pub(super) fn select_list(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    if let [Capture::Text(star)] = caps.positional.as_slice() {
        if star == "*" {
            let column = ColumnRef::bare("*");
            ctx.resolver.record_column(&column);
            ctx.resolver.add_output("*".to_string());
            return Ok(Outcome::Keyed(
                "select",
                Capture::List(vec![AstNode::Column(column)]),
            ));
        }
    }
    Ok(Outcome::Keyed("select", Capture::List(node_list(ctx, caps)?)))
}

pub(super) fn qualified_asterisk(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let mut parts = caps
        .positional
        .into_iter()
        .map(|capture| text_of(ctx, shape, capture, "qualifier names"))
        .collect::<Result<Vec<_>, _>>()?;
    let column = match parts.len() {
        1 => ColumnRef {
            schema: None,
            table: parts.pop(),
            column: "*".to_string(),
        },
        2 => {
            let table = parts.pop();
            ColumnRef {
                schema: parts.pop(),
                table,
                column: "*".to_string(),
            }
        }
        _ => return Err(ctx.structure(shape, "one or two qualifier names")),
    };

    ctx.resolver.record_column(&column);
    let output = match &column.table {
        Some(table) => format!("{table}.*"),
        None => "*".to_string(),
    };
    ctx.resolver.add_output(output);
    Ok(Outcome::Value(Capture::Node(AstNode::Column(column))))
}

/// A select-list entry. The output name is the alias, or the name the
/// expression staged for itself.
pub(super) fn derived_column(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let staged = ctx.pending_output.take();
    let mut items = caps.positional.into_iter();
    let value = match items.next() {
        Some(capture) => node_of(ctx, shape, capture, "an expression")?,
        None => return Err(ctx.structure(shape, "an expression and an optional alias")),
    };
    let alias = items
        .next()
        .map(|capture| text_of(ctx, shape, capture, "an alias"))
        .transpose()?;
    if items.next().is_some() {
        return Err(ctx.structure(shape, "an expression and an optional alias"));
    }

    match alias {
        Some(alias) => {
            ctx.resolver.add_output(alias.clone());
            Ok(Outcome::Value(Capture::Node(AstNode::Aliased(Box::new(
                Aliased { value, alias },
            )))))
        }
        None => {
            let name = staged.unwrap_or_else(|| value.display_name());
            ctx.resolver.add_output(name);
            Ok(Outcome::Value(Capture::Node(value)))
        }
    }
}

// ============================================================================
// FROM
// ============================================================================

pub(super) fn table_reference_list(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    if caps.len() == 1 {
        return super::collapse(ctx, caps);
    }
    Ok(Outcome::Value(Capture::List(node_list(ctx, caps)?)))
}

/// Folds `JOIN` steps onto the leading table, left to right.
pub(super) fn table_reference(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let mut items = node_list(ctx, caps)?.into_iter();
    let mut acc = items
        .next()
        .ok_or_else(|| ctx.structure(shape, "a table"))?;
    for item in items {
        let AstNode::JoinExtension(ext) = item else {
            return Err(ctx.structure(shape, "join steps after the first table"));
        };
        let ext = *ext;
        acc = AstNode::Join(Box::new(Join {
            left: acc,
            join_type: ext.join_type,
            right: ext.table,
            on: ext.on,
            using: ext.using,
        }));
    }
    Ok(Outcome::Value(Capture::Node(acc)))
}

pub(super) fn join_extension(
    ctx: &mut AssemblyContext,
    mut caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let on = optional_node(ctx, shape, caps.take_named("on"))?;
    let using = list_of(ctx, shape, caps.take_named("using"))?;

    let mut join_type = None;
    let mut table = None;
    for capture in caps.positional {
        match capture {
            Capture::Text(text) if join_type.is_none() && table.is_none() => {
                join_type = Some(text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase());
            }
            Capture::Node(node) if table.is_none() => table = Some(node),
            _ => return Err(ctx.structure(shape, "an optional join type and a table")),
        }
    }
    let table = table.ok_or_else(|| ctx.structure(shape, "a joined table"))?;

    Ok(Outcome::Value(Capture::Node(AstNode::JoinExtension(
        Box::new(JoinExtension {
            join_type,
            table,
            on,
            using,
        }),
    ))))
}

pub(super) fn named_columns_join(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let columns = caps
        .positional
        .into_iter()
        .map(|capture| text_of(ctx, shape, capture, "column names").map(ColumnRef::bare))
        .map(|column| column.map(AstNode::Column))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Outcome::Keyed("using", Capture::List(columns)))
}

/// A table or derived table with an optional alias. Binds the alias in the
/// current scope.
pub(super) fn table_primary(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let mark = ctx.scope_marks.pop();
    let shape = caps.shape();
    let mut items = caps.positional.into_iter();
    let source = items
        .next()
        .ok_or_else(|| ctx.structure(shape, "a table and an optional alias"))?;
    let alias = items
        .next()
        .map(|capture| text_of(ctx, shape, capture, "an alias"))
        .transpose()?;
    if items.next().is_some() {
        return Err(ctx.structure(shape, "a table and an optional alias"));
    }

    let table = match node_of(ctx, shape, source, "a table")? {
        AstNode::Table(mut table) => {
            match &table.source {
                TableSource::Named(name) => {
                    ctx.resolver.bind_table(&name.qualified_name(), alias.as_deref())
                }
                TableSource::Substitution(sub) => {
                    ctx.resolver.bind_table(&sub.name, alias.as_deref())
                }
                TableSource::Query(_) => {}
            }
            table.alias = alias;
            table
        }
        query => {
            let opened = mark.filter(|scope| *scope < ctx.resolver.next_scope_id());
            if let (Some(alias), Some(scope)) = (&alias, opened) {
                ctx.resolver.bind_scope(alias, scope);
            }
            TableRef {
                source: TableSource::Query(Box::new(query)),
                alias,
            }
        }
    };
    Ok(Outcome::Value(Capture::Node(AstNode::Table(table))))
}

pub(super) fn table_name(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let span = caps.span;
    let mut positional = caps.positional;

    if let [Capture::Node(_)] = positional.as_slice() {
        let mut node = node_of(ctx, shape, positional.remove(0), "a table")?;
        ctx.promote_node(&mut node, SubstitutionType::Table, span);
        let AstNode::Substitution(sub) = node else {
            return Err(ctx.structure(shape, "a table name or substitution variable"));
        };
        return Ok(Outcome::Value(Capture::Node(AstNode::Table(TableRef {
            source: TableSource::Substitution(sub),
            alias: None,
        }))));
    }

    let mut parts = positional
        .into_iter()
        .map(|capture| text_of(ctx, shape, capture, "name parts"))
        .collect::<Result<Vec<_>, _>>()?;
    let name = match parts.len() {
        1..=3 => {
            let table = parts.pop().unwrap_or_default();
            let schema = parts.pop();
            TableName {
                database_name: parts.pop(),
                schema,
                table,
            }
        }
        _ => return Err(ctx.structure(shape, "one to three name parts")),
    };
    Ok(Outcome::Value(Capture::Node(AstNode::Table(TableRef {
        source: TableSource::Named(name),
        alias: None,
    }))))
}

// ============================================================================
// ORDERING
// ============================================================================

pub(super) fn sort_specification(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    if !(1..=3).contains(&caps.len()) || !caps.named.is_empty() {
        return Err(ctx.structure(shape, "a sort key with optional ordering and null ordering"));
    }
    let mut items = caps.positional.into_iter();
    let predicand = match items.next() {
        Some(capture) => node_of(ctx, shape, capture, "a sort key")?,
        None => return Err(ctx.structure(shape, "a sort key")),
    };

    let mut spec = SortSpec {
        predicand,
        sort_order: SortOrder::Ascending,
        null_order: NullOrder::Unspecified,
    };
    for capture in items {
        let word = text_of(ctx, shape, capture, "ordering keywords")?.to_lowercase();
        if word.starts_with("nulls") {
            spec.null_order = if word.ends_with("first") {
                NullOrder::First
            } else {
                NullOrder::Last
            };
        } else if word == "desc" {
            spec.sort_order = SortOrder::Descending;
        } else if word == "asc" {
            spec.sort_order = SortOrder::Ascending;
        } else {
            return Err(ctx.structure(shape, "ASC, DESC or NULLS FIRST|LAST"));
        }
    }
    Ok(Outcome::Value(Capture::Node(AstNode::SortSpec(Box::new(spec)))))
}

// ============================================================================
// DATA MODIFICATION
// ============================================================================

pub(super) fn insert_column_list(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let columns = caps
        .positional
        .into_iter()
        .map(|capture| text_of(ctx, shape, capture, "column names"))
        .map(|name| name.map(|name| AstNode::Column(ColumnRef::bare(name))))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Outcome::Keyed("columns", Capture::List(columns)))
}

/// The target table and column list belong to the statement's own scope,
/// which stays open until they are recorded.
pub(super) fn insert_statement(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let result = build_insert(ctx, caps);
    ctx.resolver.close_scope();
    result
}

fn build_insert(ctx: &mut AssemblyContext, mut caps: Captures) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let columns = list_of(ctx, shape, caps.take_named("columns"))?;
    let returning = list_of(ctx, shape, caps.take_named("returning"))?;
    let [table, source]: [Capture; 2] = caps
        .positional
        .try_into()
        .map_err(|_| ctx.structure(shape, "a target table and a source"))?;
    let table = node_of(ctx, shape, table, "a target table")?;
    let source = node_of(ctx, shape, source, "VALUES or a query")?;

    if let AstNode::Table(target) = &table {
        match &target.source {
            TableSource::Named(name) => ctx.resolver.bind_table(&name.qualified_name(), None),
            TableSource::Substitution(sub) => ctx.resolver.bind_table(&sub.name, None),
            TableSource::Query(_) => {}
        }
    }
    for column in columns.iter().filter_map(AstNode::as_column) {
        ctx.resolver.record_column(column);
    }

    Ok(Outcome::Value(Capture::Node(AstNode::Insert(Box::new(
        Insert {
            table,
            columns,
            source,
            returning,
        },
    )))))
}

pub(super) fn update_statement(
    ctx: &mut AssemblyContext,
    mut caps: Captures,
) -> Result<Outcome, SnippetError> {
    ctx.resolver.close_scope();
    let shape = caps.shape();
    let set = list_of(ctx, shape, caps.take_named("set"))?;
    let where_clause = optional_node(ctx, shape, caps.take_named("where"))?;
    let returning = list_of(ctx, shape, caps.take_named("returning"))?;
    let table = node_of(ctx, shape, single(ctx, caps)?, "a target table")?;

    Ok(Outcome::Value(Capture::Node(AstNode::Update(Box::new(
        Update {
            table,
            set,
            where_clause,
            returning,
        },
    )))))
}

pub(super) fn assignment(
    ctx: &mut AssemblyContext,
    caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    let [column, value]: [Capture; 2] = caps
        .positional
        .try_into()
        .map_err(|_| ctx.structure(shape, "a column and a value"))?;
    Ok(Outcome::Value(Capture::Node(AstNode::Assignment(Box::new(
        Assignment {
            column: node_of(ctx, shape, column, "a column")?,
            value: node_of(ctx, shape, value, "a value")?,
        },
    )))))
}

pub(super) fn returning_clause(
    ctx: &mut AssemblyContext,
    mut caps: Captures,
) -> Result<Outcome, SnippetError> {
    let shape = caps.shape();
    match caps.take_named("select") {
        Some(list) if caps.positional.is_empty() && caps.named.is_empty() => {
            Ok(Outcome::Keyed("returning", list))
        }
        _ => Err(ctx.structure(shape, "a select list")),
    }
}
