//! Renders canonical nodes back to SQL text.
//!
//! Rendering is normalised rather than faithful: keywords are upper case,
//! single spaces separate tokens and parentheses appear only where the tree
//! has a `Parentheses` node or a subquery.

use super::*;

impl AstNode {
    pub fn pretty(&self) -> String {
        match self {
            AstNode::Literal(text) => text.clone(),
            AstNode::NullLiteral => "NULL".to_string(),
            AstNode::Column(column) => pretty_column(column),
            AstNode::Substitution(sub) => sub.name.clone(),
            AstNode::Table(table) => pretty_table(table),
            AstNode::Query(query) => pretty_query(query),
            AstNode::QueryExpression(expr) => {
                format!("({}){}", expr.query.pretty(), pretty_tail(&expr.tail))
            }
            AstNode::Union(op) => pretty_set_operation("UNION", op),
            AstNode::Except(op) => pretty_set_operation("EXCEPT", op),
            AstNode::Intersect(op) => pretty_set_operation("INTERSECT", op),
            AstNode::Cte(cte) => format!("{} AS ({})", cte.name, cte.query.pretty()),
            AstNode::Condition(cond) => {
                format!("{} {} {}", cond.left.pretty(), cond.operator, cond.right.pretty())
            }
            AstNode::And(items) => join(items, " AND "),
            AstNode::Or(items) => join(items, " OR "),
            AstNode::Not(inner) => format!("NOT {}", inner.pretty()),
            AstNode::In(pred) => match &pred.list {
                InList::InList(list) => format!("{} IN {}", pred.item.pretty(), pretty_in(list)),
                InList::NotInList(list) => {
                    format!("{} NOT IN {}", pred.item.pretty(), pretty_in(list))
                }
            },
            AstNode::Between(between) => {
                let mut out = format!("{} {}", between.item.pretty(), between.operator.to_uppercase());
                if let Some(symmetry) = &between.symmetry {
                    out.push(' ');
                    out.push_str(&symmetry.to_uppercase());
                }
                out.push_str(&format!(
                    " {} AND {}",
                    between.range_begin.pretty(),
                    between.range_end.pretty()
                ));
                out
            }
            AstNode::Is(pred) => match &pred.right {
                Some(right) => format!("{} {} {}", pred.item.pretty(), pred.operator, right.pretty()),
                None => format!("{} {}", pred.item.pretty(), pred.operator),
            },
            AstNode::Exists(query) => format!("EXISTS ({})", query.pretty()),
            AstNode::Calculation(calc) => {
                format!("{} {} {}", calc.left.pretty(), calc.operator, calc.right.pretty())
            }
            AstNode::Concatenate(items) => join(items, " || "),
            AstNode::Function(function) => pretty_function(function),
            AstNode::WindowFunction(window) => format!(
                "{} OVER ({})",
                pretty_function(&window.function),
                pretty_window(&window.over)
            ),
            AstNode::Over(window) => format!("OVER ({})", pretty_window(window)),
            AstNode::Cast(cast) => format!("CAST({} AS {})", cast.value.pretty(), cast.data_type),
            AstNode::Trim(trim) => pretty_trim(trim),
            AstNode::Case(case) => pretty_case(case),
            AstNode::When(when) => format!("WHEN {} THEN {}", when.when.pretty(), when.then.pretty()),
            AstNode::Parentheses(inner) => format!("({})", inner.pretty()),
            AstNode::List(items) => join(items, ", "),
            AstNode::Join(j) => {
                let mut out = format!("{} ", j.left.pretty());
                if let Some(kind) = &j.join_type {
                    out.push_str(&kind.to_uppercase());
                    out.push(' ');
                }
                out.push_str(&format!("JOIN {}", j.right.pretty()));
                pretty_join_condition(&mut out, j.on.as_ref(), &j.using);
                out
            }
            AstNode::JoinExtension(ext) => {
                let mut out = String::new();
                if let Some(kind) = &ext.join_type {
                    out.push_str(&kind.to_uppercase());
                    out.push(' ');
                }
                out.push_str(&format!("JOIN {}", ext.table.pretty()));
                pretty_join_condition(&mut out, ext.on.as_ref(), &ext.using);
                out
            }
            AstNode::SortSpec(spec) => {
                let mut out = spec.predicand.pretty();
                if spec.sort_order == SortOrder::Descending {
                    out.push_str(" DESC");
                }
                match spec.null_order {
                    NullOrder::First => out.push_str(" NULLS FIRST"),
                    NullOrder::Last => out.push_str(" NULLS LAST"),
                    NullOrder::Unspecified => {}
                }
                out
            }
            AstNode::Aliased(aliased) => format!("{} AS {}", aliased.value.pretty(), aliased.alias),
            AstNode::Insert(insert) => pretty_insert(insert),
            AstNode::Update(update) => pretty_update(update),
            AstNode::Assignment(assign) => {
                format!("{} = {}", assign.column.pretty(), assign.value.pretty())
            }
            AstNode::Unrecognized(node) => format!("/* {} */", node.rule),
        }
    }
}

fn join(items: &[AstNode], separator: &str) -> String {
    items
        .iter()
        .map(AstNode::pretty)
        .collect::<Vec<_>>()
        .join(separator)
}

fn pretty_column(column: &ColumnRef) -> String {
    [&column.schema, &column.table]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .chain(std::iter::once(column.column.as_str()))
        .collect::<Vec<_>>()
        .join(".")
}

fn pretty_table(table: &TableRef) -> String {
    let base = match &table.source {
        TableSource::Named(name) => name.qualified_name(),
        TableSource::Substitution(sub) => sub.name.clone(),
        TableSource::Query(query) => format!("({})", query.pretty()),
    };
    match &table.alias {
        Some(alias) => format!("{base} {alias}"),
        None => base,
    }
}

fn pretty_query(query: &Query) -> String {
    let mut out = String::new();
    if !query.with.is_empty() {
        out.push_str(&pretty_with(&query.with));
    }
    out.push_str("SELECT ");
    if let Some(quantifier) = &query.quantifier {
        out.push_str(&quantifier.to_uppercase());
        out.push(' ');
    }
    out.push_str(&join(&query.select, ", "));
    if let Some(from) = &query.from {
        out.push_str(&format!(" FROM {}", from.pretty()));
    }
    if let Some(cond) = &query.where_clause {
        out.push_str(&format!(" WHERE {}", cond.pretty()));
    }
    if !query.groupby.is_empty() {
        out.push_str(&format!(" GROUP BY {}", join(&query.groupby, ", ")));
    }
    if let Some(cond) = &query.having {
        out.push_str(&format!(" HAVING {}", cond.pretty()));
    }
    out.push_str(&pretty_tail(&QueryTail {
        with: Vec::new(),
        orderby: query.orderby.clone(),
        limit: query.limit.clone(),
        offset: query.offset.clone(),
    }));
    out
}

fn pretty_with(ctes: &[Cte]) -> String {
    let list = ctes
        .iter()
        .map(|cte| format!("{} AS ({})", cte.name, cte.query.pretty()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("WITH {list} ")
}

fn pretty_tail(tail: &QueryTail) -> String {
    let mut out = String::new();
    if !tail.orderby.is_empty() {
        out.push_str(&format!(" ORDER BY {}", join(&tail.orderby, ", ")));
    }
    if let Some(limit) = &tail.limit {
        out.push_str(&format!(" LIMIT {}", limit.pretty()));
    }
    if let Some(offset) = &tail.offset {
        out.push_str(&format!(" OFFSET {}", offset.pretty()));
    }
    out
}

fn pretty_set_operation(keyword: &str, op: &SetOperation) -> String {
    let mut out = String::new();
    if !op.tail.with.is_empty() {
        out.push_str(&pretty_with(&op.tail.with));
    }
    out.push_str(&format!("{} {keyword} ", op.left.pretty()));
    if let Some(quantifier) = &op.quantifier {
        out.push_str(&quantifier.to_uppercase());
        out.push(' ');
    }
    out.push_str(&op.right.pretty());
    out.push_str(&pretty_tail(&op.tail));
    out
}

fn pretty_in(list: &AstNode) -> String {
    match list {
        AstNode::Substitution(sub) => sub.name.clone(),
        other => format!("({})", other.pretty()),
    }
}

fn pretty_function(function: &Function) -> String {
    let mut out = String::new();
    if let Some(schema) = &function.schema {
        out.push_str(schema);
        out.push('.');
    }
    out.push_str(&function.function_name);
    out.push('(');
    if let Some(quantifier) = &function.quantifier {
        out.push_str(&quantifier.to_uppercase());
        out.push(' ');
    }
    out.push_str(&join(&function.parameters, ", "));
    out.push(')');
    out
}

fn pretty_window(window: &Window) -> String {
    let mut parts = Vec::new();
    if !window.partition_by.is_empty() {
        parts.push(format!("PARTITION BY {}", join(&window.partition_by, ", ")));
    }
    if !window.orderby.is_empty() {
        parts.push(format!("ORDER BY {}", join(&window.orderby, ", ")));
    }
    parts.join(" ")
}

fn pretty_trim(trim: &Trim) -> String {
    let mut parts = Vec::new();
    if let Some(qualifier) = &trim.qualifier {
        parts.push(qualifier.to_uppercase());
    }
    if let Some(character) = &trim.trim_character {
        parts.push(character.pretty());
    }
    if parts.is_empty() {
        return format!("TRIM({})", trim.value.pretty());
    }
    format!("TRIM({} FROM {})", parts.join(" "), trim.value.pretty())
}

fn pretty_case(case: &Case) -> String {
    let mut out = String::from("CASE");
    if let Some(value) = &case.value {
        out.push(' ');
        out.push_str(&value.pretty());
    }
    for when in &case.when {
        out.push_str(&format!(" WHEN {} THEN {}", when.when.pretty(), when.then.pretty()));
    }
    if let Some(result) = &case.else_result {
        out.push_str(&format!(" ELSE {}", result.pretty()));
    }
    out.push_str(" END");
    out
}

fn pretty_join_condition(out: &mut String, on: Option<&AstNode>, using: &[AstNode]) {
    if let Some(cond) = on {
        out.push_str(&format!(" ON {}", cond.pretty()));
    }
    if !using.is_empty() {
        out.push_str(&format!(" USING ({})", join(using, ", ")));
    }
}

fn pretty_insert(insert: &Insert) -> String {
    let mut out = format!("INSERT INTO {}", insert.table.pretty());
    if !insert.columns.is_empty() {
        out.push_str(&format!(" ({})", join(&insert.columns, ", ")));
    }
    match &insert.source {
        AstNode::List(rows) => {
            let rows = rows
                .iter()
                .map(|row| format!("({})", row.pretty()))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!(" VALUES {rows}"));
        }
        query => out.push_str(&format!(" {}", query.pretty())),
    }
    if !insert.returning.is_empty() {
        out.push_str(&format!(" RETURNING {}", join(&insert.returning, ", ")));
    }
    out
}

fn pretty_update(update: &Update) -> String {
    let mut out = format!(
        "UPDATE {} SET {}",
        update.table.pretty(),
        join(&update.set, ", ")
    );
    if let Some(cond) = &update.where_clause {
        out.push_str(&format!(" WHERE {}", cond.pretty()));
    }
    if !update.returning.is_empty() {
        out.push_str(&format!(" RETURNING {}", join(&update.returning, ", ")));
    }
    out
}
