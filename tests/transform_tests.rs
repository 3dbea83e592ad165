// tests/transform_tests.rs
//
// One group per family of production transforms, driven through the full
// parser, followed by structural-error cases fed as hand-built trees.

mod common;

use common::{assemble_tree, column, leaf, node, number, query, snippet, where_of};
use sqlsnip::ast::{
    AstNode, ColumnRef, InList, NullOrder, SortOrder, SubstitutionParts, TableSource,
};
use sqlsnip::diagnostics::ErrorType;
use sqlsnip::snippet::{AliasTarget, Owner, ScopeKind};
use sqlsnip::syntax::Rule;
use sqlsnip::{SnippetError, SubstitutionType, Warning};

fn col(name: &str) -> AstNode {
    AstNode::Column(ColumnRef::bare(name))
}

fn lit(text: &str) -> AstNode {
    AstNode::Literal(text.to_string())
}

// ---
// Queries and set operations
// ---

#[test]
fn test_select_clauses_land_under_their_keys() {
    let snippet = snippet(
        "SELECT DISTINCT dept, count(*) AS n FROM staff WHERE active = true \
         GROUP BY dept HAVING count(*) > 1 ORDER BY n DESC NULLS LAST LIMIT 10 OFFSET 5",
    );
    let query = query(&snippet);
    assert_eq!(query.quantifier.as_deref(), Some("distinct"));
    assert_eq!(query.select.len(), 2);
    assert!(matches!(&query.select[1], AstNode::Aliased(a) if a.alias == "n"));
    assert_eq!(query.groupby, vec![col("dept")]);
    assert!(matches!(query.having, Some(AstNode::Condition(_))));
    assert_eq!(query.limit, Some(lit("10")));
    assert_eq!(query.offset, Some(lit("5")));

    let [AstNode::SortSpec(spec)] = query.orderby.as_slice() else {
        panic!("expected one sort specification");
    };
    assert_eq!(spec.predicand, col("n"));
    assert_eq!(spec.sort_order, SortOrder::Descending);
    assert_eq!(spec.null_order, NullOrder::Last);

    assert_eq!(snippet.interface().columns(), ["dept", "n"]);
}

#[test]
fn test_sort_specification_defaults() {
    let snippet = snippet("SELECT a FROM t ORDER BY a, b ASC NULLS FIRST");
    let query = query(&snippet);
    let specs: Vec<_> = query
        .orderby
        .iter()
        .map(|item| match item {
            AstNode::SortSpec(spec) => (spec.sort_order, spec.null_order),
            other => panic!("expected sort spec, got {}", other.type_name()),
        })
        .collect();
    assert_eq!(
        specs,
        vec![
            (SortOrder::Ascending, NullOrder::Unspecified),
            (SortOrder::Ascending, NullOrder::First),
        ]
    );
}

#[test]
fn test_union_all_keeps_tail_on_set_operation() {
    let snippet = snippet("SELECT a FROM t UNION ALL SELECT b FROM u ORDER BY 1");
    let AstNode::Union(union) = snippet.ast() else {
        panic!("expected union, got {}", snippet.ast().type_name());
    };
    assert_eq!(union.quantifier.as_deref(), Some("all"));
    assert!(matches!(union.left, AstNode::Query(_)));
    assert!(matches!(union.right, AstNode::Query(_)));
    assert_eq!(union.tail.orderby.len(), 1);
    assert_eq!(snippet.interface().columns(), ["a"]);
}

#[test]
fn test_intersect_binds_tighter_than_except() {
    let snippet = snippet("SELECT a FROM t EXCEPT SELECT a FROM u INTERSECT SELECT a FROM v");
    let AstNode::Except(except) = snippet.ast() else {
        panic!("expected except, got {}", snippet.ast().type_name());
    };
    assert!(matches!(except.left, AstNode::Query(_)));
    assert!(matches!(except.right, AstNode::Intersect(_)));
}

#[test]
fn test_cte_scope_feeds_main_query() {
    let snippet = snippet("WITH recent AS (SELECT id FROM orders) SELECT id FROM recent");
    let query = query(&snippet);
    assert_eq!(query.with.len(), 1);
    assert_eq!(query.with[0].name, "recent");

    let table = snippet.symbol_table();
    let root = table.root().expect("root scope");
    let Some(AliasTarget::Scope(cte)) = root.aliases.get("recent") else {
        panic!("recent should bind the CTE scope");
    };
    assert_eq!(root.columns[0].owner, Owner::Scope(*cte));
    assert_eq!(snippet.interface().columns(), ["id"]);
    assert!(snippet.tables().get("orders").unwrap().columns.contains("id"));
    assert!(!snippet.tables().contains("recent"));
}

#[test]
fn test_parenthesised_query_with_own_tail_is_wrapped() {
    let snippet = snippet("(SELECT a FROM t ORDER BY a LIMIT 1) ORDER BY 1");
    let AstNode::QueryExpression(expr) = snippet.ast() else {
        panic!("expected query expression, got {}", snippet.ast().type_name());
    };
    assert!(matches!(&expr.query, AstNode::Query(q) if q.limit.is_some()));
    assert_eq!(expr.tail.orderby.len(), 1);
}

#[test]
fn test_order_by_columns_resolve_in_query_scope() {
    let snippet = snippet("SELECT a FROM t ORDER BY b LIMIT 5");
    let table = snippet.symbol_table();
    assert_eq!(table.len(), 1);

    let root = table.root().expect("root scope");
    assert_eq!(root.kind, ScopeKind::Query);
    let owners: Vec<_> = root
        .columns
        .iter()
        .map(|c| (c.column.as_str(), c.owner.clone()))
        .collect();
    assert_eq!(
        owners,
        vec![("a", Owner::Table("t".into())), ("b", Owner::Table("t".into()))]
    );
    let t = snippet.tables().get("t").unwrap();
    assert!(t.columns.contains("a") && t.columns.contains("b"));
    assert!(snippet.warnings().is_empty());
}

#[test]
fn test_derived_table_order_by_stays_inside() {
    let snippet = snippet("SELECT x FROM (SELECT y FROM t ORDER BY z) d, u");
    let table = snippet.symbol_table();
    assert_eq!(table.len(), 2);

    let inner = table.scope(1).expect("derived table scope");
    assert_eq!(inner.parent, Some(0));
    assert!(inner
        .columns
        .iter()
        .any(|c| c.column == "z" && c.owner == Owner::Table("t".into())));
    assert!(snippet.tables().get("t").unwrap().columns.contains("z"));

    // Only the outer, genuinely ambiguous column is reported.
    assert_eq!(
        snippet.warnings(),
        [Warning::UnresolvedOwner {
            scope: 0,
            column: "x".into()
        }]
    );
}

#[test]
fn test_set_operation_tail_resolves_in_first_branch() {
    let snippet = snippet("SELECT a FROM t UNION SELECT a FROM u ORDER BY a");
    let table = snippet.symbol_table();
    assert_eq!(table.len(), 2);
    let first = table.scope(0).unwrap();
    assert_eq!(first.columns.len(), 2);
    assert!(first
        .columns
        .iter()
        .all(|c| c.owner == Owner::Table("t".into())));
}

// ---
// FROM clause and the symbol table
// ---

#[test]
fn test_joins_fold_to_the_left() {
    let snippet = snippet(
        "SELECT a.id FROM a LEFT OUTER JOIN b ON a.id = b.id JOIN c USING (id, kind)",
    );
    let query = query(&snippet);
    let Some(AstNode::Join(outer)) = &query.from else {
        panic!("expected join");
    };
    assert_eq!(outer.join_type, None);
    assert_eq!(outer.using, vec![col("id"), col("kind")]);
    let AstNode::Join(inner) = &outer.left else {
        panic!("left side should be the first join");
    };
    assert_eq!(inner.join_type.as_deref(), Some("left outer"));
    assert!(matches!(inner.on, Some(AstNode::Condition(_))));
    assert!(snippet.tables().get("b").unwrap().columns.contains("id"));
}

#[test]
fn test_comma_separated_tables_form_a_list() {
    let snippet = snippet("SELECT x FROM db.sch.t1, t2");
    let query = query(&snippet);
    let Some(AstNode::List(tables)) = &query.from else {
        panic!("expected table list");
    };
    let AstNode::Table(first) = &tables[0] else {
        panic!("expected table");
    };
    let TableSource::Named(name) = &first.source else {
        panic!("expected named table");
    };
    assert_eq!(name.database_name.as_deref(), Some("db"));
    assert_eq!(name.qualified_name(), "db.sch.t1");
    assert!(snippet.tables().contains("db.sch.t1"));

    let root = snippet.symbol_table().root().unwrap();
    assert_eq!(root.columns[0].owner, Owner::Unresolved);
    assert_eq!(
        snippet.warnings(),
        [Warning::UnresolvedOwner {
            scope: root.id,
            column: "x".into()
        }]
    );
}

#[test]
fn test_derived_table_alias_binds_its_scope() {
    let snippet = snippet("SELECT d.n FROM (SELECT count(*) AS n FROM t) d");
    let root = snippet.symbol_table().root().unwrap();
    let Some(AliasTarget::Scope(inner)) = root.aliases.get("d") else {
        panic!("d should bind the derived table's scope");
    };
    assert_eq!(snippet.symbol_table().scope(*inner).unwrap().outputs, ["n"]);
    assert_eq!(root.columns[0].owner, Owner::Scope(*inner));
    assert_eq!(snippet.interface().columns(), ["n"]);
}

#[test]
fn test_correlated_subquery_resolves_outer_alias() {
    let snippet = snippet(
        "SELECT o.id, (SELECT max(i.qty) FROM items i WHERE i.order_id = o.id) AS top \
         FROM orders o",
    );
    assert_eq!(snippet.interface().columns(), ["id", "top"]);
    let orders = snippet.tables().get("orders").unwrap();
    assert!(orders.columns.contains("id"));
    let items = snippet.tables().get("items").unwrap();
    assert!(items.columns.contains("qty"));
    assert!(items.columns.contains("order_id"));
    assert!(snippet.warnings().is_empty());
}

#[test]
fn test_unknown_qualifier_is_a_warning() {
    let snippet = snippet("SELECT z.a FROM t");
    assert!(matches!(
        snippet.warnings(),
        [Warning::UnknownQualifier { qualifier, .. }] if qualifier == "z"
    ));
}

// ---
// Predicates
// ---

#[test]
fn test_comparison_keeps_operator_text() {
    let AstNode::Condition(cond) = where_of("SELECT a FROM t WHERE name NOT LIKE 'x%'") else {
        panic!("expected condition");
    };
    assert_eq!(cond.left, col("name"));
    assert_eq!(cond.operator, "NOT LIKE");
    assert_eq!(cond.right, lit("'x%'"));
}

#[test]
fn test_not_between() {
    let AstNode::Between(between) = where_of("SELECT a FROM t WHERE a NOT BETWEEN 1 AND <Hi>")
    else {
        panic!("expected between");
    };
    assert_eq!(between.operator, "not between");
    assert_eq!(between.symmetry, None);
    assert!(matches!(
        &between.range_end,
        AstNode::Substitution(sub) if sub.declared_type == Some(SubstitutionType::Predicand)
    ));
}

#[test]
fn test_in_list_and_not_in_subquery() {
    let AstNode::In(pred) = where_of("SELECT a FROM t WHERE a IN (1, 2, <Three>)") else {
        panic!("expected in");
    };
    let InList::InList(AstNode::List(items)) = &pred.list else {
        panic!("expected a literal list");
    };
    assert_eq!(items.len(), 3);

    let snippet = snippet("SELECT a FROM t WHERE a NOT IN (SELECT b FROM u)");
    let AstNode::In(pred) = query(&snippet).where_clause.clone().unwrap() else {
        panic!("expected in");
    };
    assert!(matches!(pred.list, InList::NotInList(AstNode::Query(_))));
    assert_eq!(snippet.substitutions().len(), 0);
}

#[test]
fn test_is_predicates_concatenate_tokens() {
    let AstNode::Is(null) = where_of("SELECT a FROM t WHERE a IS NOT NULL") else {
        panic!("expected is");
    };
    assert_eq!(null.operator, "IS NOT NULL");
    assert_eq!(null.right, None);

    let AstNode::Is(distinct) = where_of("SELECT a FROM t WHERE a IS NOT DISTINCT   FROM b") else {
        panic!("expected is");
    };
    assert_eq!(distinct.operator, "IS NOT DISTINCT FROM");
    assert_eq!(distinct.right, Some(col("b")));

    let AstNode::Is(truth) = where_of("SELECT a FROM t WHERE flag IS TRUE") else {
        panic!("expected is");
    };
    assert_eq!(truth.operator, "IS TRUE");
}

#[test]
fn test_is_predicate_operands_are_typed() {
    let snippet = snippet("SELECT a FROM t WHERE <X> IS NULL AND <Flag> IS NOT TRUE");
    let registry = snippet.substitutions();
    assert_eq!(registry.get("<X>"), Some(SubstitutionType::Predicand));
    assert_eq!(registry.get("<Flag>"), Some(SubstitutionType::Condition));

    let Some(AstNode::And(items)) = &query(&snippet).where_clause else {
        panic!("expected AND");
    };
    let declared: Vec<_> = items
        .iter()
        .map(|item| match item {
            AstNode::Is(is) => is.item.as_substitution().and_then(|sub| sub.declared_type),
            other => panic!("expected is, got {}", other.type_name()),
        })
        .collect();
    assert_eq!(
        declared,
        vec![Some(SubstitutionType::Predicand), Some(SubstitutionType::Condition)]
    );
}

#[test]
fn test_not_and_exists() {
    let AstNode::Not(inner) = where_of("SELECT a FROM t WHERE NOT <Cond>") else {
        panic!("expected not");
    };
    assert!(matches!(
        inner.as_ref(),
        AstNode::Substitution(sub) if sub.declared_type == Some(SubstitutionType::Condition)
    ));

    let where_clause = where_of("SELECT a FROM t WHERE EXISTS (SELECT 1 FROM u WHERE u.a = t.a)");
    assert!(matches!(where_clause, AstNode::Exists(_)));
}

#[test]
fn test_parenthesised_condition_is_promoted() {
    let snippet = snippet("SELECT a FROM t WHERE (<A>) OR a = 1");
    assert_eq!(
        snippet.substitutions().get("<A>"),
        Some(SubstitutionType::Condition)
    );
}

// ---
// Value expressions
// ---

#[test]
fn test_arithmetic_precedence_and_concatenation() {
    let snippet = snippet("a + b * c || 'x'");
    let AstNode::Concatenate(items) = snippet.ast() else {
        panic!("expected concatenate");
    };
    assert_eq!(items.len(), 2);
    let AstNode::Calculation(sum) = &items[0] else {
        panic!("expected calculation");
    };
    assert_eq!(sum.operator, "+");
    assert!(matches!(&sum.right, AstNode::Calculation(product) if product.operator == "*"));
}

#[test]
fn test_signed_literals() {
    assert_eq!(snippet("-5").ast(), &lit("-5"));
    assert_eq!(snippet("- 5").ast(), &lit("-5"));
    assert_eq!(snippet("+x").ast(), &col("x"));
    assert_eq!(snippet("NULL").ast(), &AstNode::NullLiteral);
}

#[test]
fn test_column_reference_parts() {
    let snippet = snippet("s.t.c");
    assert_eq!(
        snippet.ast(),
        &AstNode::Column(ColumnRef {
            schema: Some("s".into()),
            table: Some("t".into()),
            column: "c".into(),
        })
    );
}

#[test]
fn test_substitution_parts() {
    let AstNode::Substitution(sub) = snippet("<sales.orders.total>").ast().clone() else {
        panic!("expected substitution");
    };
    assert_eq!(sub.name, "<sales.orders.total>");
    assert_eq!(
        sub.parts,
        SubstitutionParts::SchemaTableColumn {
            schema: "sales".into(),
            table: "orders".into(),
            column: "total".into(),
        }
    );
    assert_eq!(sub.declared_type, None);
}

#[test]
fn test_function_calls() {
    let AstNode::Function(function) = snippet("pg_catalog.count(DISTINCT t.id)").ast().clone()
    else {
        panic!("expected function");
    };
    assert_eq!(function.schema.as_deref(), Some("pg_catalog"));
    assert_eq!(function.function_name, "count");
    assert_eq!(function.quantifier.as_deref(), Some("distinct"));
    assert_eq!(
        function.parameters,
        vec![AstNode::Column(ColumnRef::qualified("t", "id"))]
    );

    let AstNode::Function(star) = snippet("count(*)").ast().clone() else {
        panic!("expected function");
    };
    assert_eq!(star.parameters, vec![col("*")]);

    let AstNode::Function(empty) = snippet("now()").ast().clone() else {
        panic!("expected function");
    };
    assert!(empty.parameters.is_empty());
}

#[test]
fn test_window_function() {
    let snippet = snippet("SELECT rank() OVER (PARTITION BY dept ORDER BY pay DESC) FROM staff");
    let AstNode::WindowFunction(window) = &query(&snippet).select[0] else {
        panic!("expected window function");
    };
    assert_eq!(window.function.function_name, "rank");
    assert_eq!(window.over.partition_by, vec![col("dept")]);
    assert_eq!(window.over.orderby.len(), 1);
}

#[test]
fn test_cast_and_trim() {
    let AstNode::Cast(cast) = snippet("CAST(<Amount> AS numeric(10, 2))").ast().clone() else {
        panic!("expected cast");
    };
    assert_eq!(cast.data_type, "numeric(10, 2)");

    let snippet = snippet("TRIM(LEADING 'x' FROM name)");
    let AstNode::Trim(trim) = snippet.ast() else {
        panic!("expected trim");
    };
    assert_eq!(trim.qualifier.as_deref(), Some("leading"));
    assert_eq!(trim.trim_character, Some(lit("'x'")));
    assert_eq!(trim.value, col("name"));
}

#[test]
fn test_case_expressions() {
    let snippet = snippet("CASE <Kind> WHEN 1 THEN 'one' WHEN 2 THEN <Two> ELSE 'many' END");
    let AstNode::Case(case) = snippet.ast() else {
        panic!("expected case");
    };
    assert!(case.value.is_some());
    assert_eq!(case.when.len(), 2);
    assert_eq!(case.else_result, Some(lit("'many'")));
    assert_eq!(
        snippet.substitutions().get("<Kind>"),
        Some(SubstitutionType::Predicand)
    );
    assert_eq!(
        snippet.substitutions().get("<Two>"),
        Some(SubstitutionType::Predicand)
    );
}

#[test]
fn test_fragment_columns_stay_unresolved_quietly() {
    let snippet = snippet("a = b");
    let root = snippet.symbol_table().root().unwrap();
    assert_eq!(root.kind, ScopeKind::Fragment);
    assert!(root.columns.iter().all(|c| c.owner == Owner::Unresolved));
    assert!(snippet.warnings().is_empty());
}

// ---
// Data modification
// ---

#[test]
fn test_insert_values_returning() {
    let snippet = snippet("INSERT INTO users (id, name) VALUES (1, <Name>) RETURNING id");
    let AstNode::Insert(insert) = snippet.ast() else {
        panic!("expected insert");
    };
    assert_eq!(insert.columns, vec![col("id"), col("name")]);
    assert!(matches!(&insert.source, AstNode::List(rows) if rows.len() == 1));
    assert_eq!(insert.returning, vec![col("id")]);
    assert_eq!(
        snippet.substitutions().get("<Name>"),
        Some(SubstitutionType::Predicand)
    );
    let users = snippet.tables().get("users").unwrap();
    assert!(users.columns.contains("name"));
    assert_eq!(snippet.interface().columns(), ["id"]);
}

#[test]
fn test_insert_from_query() {
    let snippet = snippet("INSERT INTO archive SELECT * FROM orders");
    let AstNode::Insert(insert) = snippet.ast() else {
        panic!("expected insert");
    };
    assert!(matches!(insert.source, AstNode::Query(_)));
    assert!(snippet.tables().get("orders").unwrap().wildcard);
    assert!(snippet.interface().is_empty());
}

#[test]
fn test_update_set_where() {
    let snippet = snippet("UPDATE accounts a SET balance = balance - <Amount> WHERE a.id = <Id>");
    let AstNode::Update(update) = snippet.ast() else {
        panic!("expected update");
    };
    assert_eq!(update.set.len(), 1);
    assert!(matches!(&update.set[0], AstNode::Assignment(_)));
    assert!(update.where_clause.is_some());

    let accounts = snippet.tables().get("accounts").unwrap();
    assert!(accounts.columns.contains("balance"));
    assert!(accounts.columns.contains("id"));
    assert_eq!(snippet.symbol_table().root().unwrap().kind, ScopeKind::Update);
}

// ---
// Structural errors from hand-built trees
// ---

fn structure_rules(err: &SnippetError) -> Vec<(String, usize)> {
    let SnippetError::Invalid { errors, .. } = err else {
        panic!("expected an aggregate error, got {err:?}");
    };
    errors
        .iter()
        .map(|e| match e {
            SnippetError::Structure { rule, captures, .. } => (rule.clone(), *captures),
            other => panic!("expected a structural error, got {other:?}"),
        })
        .collect()
}

#[test]
fn test_comparison_with_missing_operand_is_structural() {
    let tree = node(
        Rule::comparison_predicate,
        vec![column("a"), leaf(Rule::comp_op, Rule::comp_symbol, "=")],
    );
    let err = assemble_tree(&tree).unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Structure);
    assert_eq!(
        structure_rules(&err),
        vec![("comparison_predicate".to_string(), 2)]
    );
}

#[test]
fn test_hand_built_comparison_succeeds() {
    let tree = node(
        Rule::comparison_predicate,
        vec![
            column("a"),
            leaf(Rule::comp_op, Rule::comp_symbol, "<="),
            number("3"),
        ],
    );
    let snippet = assemble_tree(&tree).unwrap();
    assert_eq!(snippet.ast().pretty(), "a <= 3");
}

#[test]
fn test_every_structural_error_is_collected() {
    let tree = node(
        Rule::boolean_term,
        vec![node(Rule::when_clause, vec![number("1")])],
    )
    .with_terminal(Rule::and_op, "AND")
    .with_node(node(Rule::cast_specification, vec![number("1")]));
    let err = assemble_tree(&tree).unwrap_err();
    assert_eq!(
        structure_rules(&err),
        vec![
            ("when_clause".to_string(), 1),
            ("cast_specification".to_string(), 1),
        ]
    );
}

#[test]
fn test_too_many_substitution_parts() {
    let tree = leaf(Rule::substitution_variable, Rule::substitution_name, "<a.b.c.d>");
    let err = assemble_tree(&tree).unwrap_err();
    assert_eq!(
        structure_rules(&err),
        vec![("substitution_variable".to_string(), 1)]
    );
}

#[test]
fn test_sort_specification_rejects_unknown_keyword() {
    let tree = node(Rule::sort_specification, vec![column("a")])
        .with_terminal(Rule::ordering, "sideways");
    let err = assemble_tree(&tree).unwrap_err();
    assert_eq!(
        structure_rules(&err),
        vec![("sort_specification".to_string(), 2)]
    );
}
