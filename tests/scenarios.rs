// tests/scenarios.rs
//
// End-to-end behaviour of the engine on whole templates: the reference
// scenarios, the structural properties of the assembled tree, and the
// substitution registry policies.

mod common;

use common::{process_with, process_with_policy, query, snippet};
use sqlsnip::ast::{AstNode, ColumnRef, InList, TableSource};
use sqlsnip::diagnostics::ErrorType;
use sqlsnip::{ConflictPolicy, EngineConfig, SnippetError, SubstitutionType, Warning};

// ---
// Reference scenarios
// ---

#[test]
fn test_join_with_substituted_condition() {
    let snippet = snippet(
        "SELECT a.*, col2 FROM third a join fourth b on <OnJoinCondition> order by 2,1",
    );
    let query = query(&snippet);

    assert_eq!(
        query.select,
        vec![
            AstNode::Column(ColumnRef::qualified("a", "*")),
            AstNode::Column(ColumnRef::bare("col2")),
        ]
    );

    let Some(AstNode::Join(join)) = &query.from else {
        panic!("expected a join, got {:?}", query.from);
    };
    let Some(AstNode::Substitution(on)) = &join.on else {
        panic!("expected a substituted ON condition, got {:?}", join.on);
    };
    assert_eq!(on.name, "<OnJoinCondition>");
    assert_eq!(on.declared_type, Some(SubstitutionType::Condition));
    assert_eq!(query.orderby.len(), 2);

    assert_eq!(
        snippet.substitutions().get("<OnJoinCondition>"),
        Some(SubstitutionType::Condition)
    );
    assert_eq!(snippet.substitutions().len(), 1);

    let third = snippet.tables().get("third").expect("third is recorded");
    assert!(third.wildcard);
    let fourth = snippet.tables().get("fourth").expect("fourth is recorded");
    assert!(fourth.is_empty());

    assert_eq!(snippet.interface().columns(), ["a.*", "col2"]);
}

#[test]
fn test_between_symmetric_fragment() {
    let snippet = snippet("x BETWEEN SYMMETRIC 1 AND 10");
    let AstNode::Between(between) = snippet.ast() else {
        panic!("expected between, got {}", snippet.ast().type_name());
    };
    assert_eq!(between.item, AstNode::Column(ColumnRef::bare("x")));
    assert_eq!(between.range_begin, AstNode::Literal("1".into()));
    assert_eq!(between.range_end, AstNode::Literal("10".into()));
    assert_eq!(between.symmetry.as_deref(), Some("SYMMETRIC"));
    assert_eq!(between.operator, "between");
    assert!(snippet.warnings().is_empty());
}

#[test]
fn test_and_or_precedence_is_two_flat_levels() {
    let snippet = snippet("a AND b OR c AND d");
    let column = |name: &str| AstNode::Column(ColumnRef::bare(name));
    assert_eq!(
        snippet.ast(),
        &AstNode::Or(vec![
            AstNode::And(vec![column("a"), column("b")]),
            AstNode::And(vec![column("c"), column("d")]),
        ])
    );
}

#[test]
fn test_unary_minus_on_parentheses_is_multiplication() {
    let snippet = snippet("-(x * 2)");
    let AstNode::Calculation(calc) = snippet.ast() else {
        panic!("expected calculation, got {}", snippet.ast().type_name());
    };
    assert_eq!(calc.left, AstNode::Literal("-1".into()));
    assert_eq!(calc.operator, "*");
    assert!(matches!(calc.right, AstNode::Parentheses(_)));
    assert_eq!(snippet.ast().pretty(), "-1 * (x * 2)");
}

#[test]
fn test_placeholder_reused_with_two_types_is_reported() {
    let snippet = snippet("SELECT <v> FROM t WHERE <v>");
    assert_eq!(
        snippet.warnings(),
        [Warning::RegistryConflict {
            name: "<v>".into(),
            previous: SubstitutionType::Predicand,
            attempted: SubstitutionType::Condition,
            kept: SubstitutionType::Condition,
        }]
    );
    assert_eq!(
        snippet.substitutions().get("<v>"),
        Some(SubstitutionType::Condition)
    );
}

// ---
// Structural properties
// ---

#[test]
fn test_subtraction_is_left_associative() {
    let snippet = snippet("a - b - c");
    let AstNode::Calculation(outer) = snippet.ast() else {
        panic!("expected calculation");
    };
    assert_eq!(outer.right, AstNode::Column(ColumnRef::bare("c")));
    let AstNode::Calculation(inner) = &outer.left else {
        panic!("left operand should be the fold of a - b");
    };
    assert_eq!(inner.left, AstNode::Column(ColumnRef::bare("a")));
    assert_eq!(inner.right, AstNode::Column(ColumnRef::bare("b")));
}

#[test]
fn test_deeply_nested_parentheses_balance() {
    let snippet = snippet("((((((((((1))))))))))");
    let mut depth = 0;
    let mut current = snippet.ast();
    while let AstNode::Parentheses(inner) = current {
        depth += 1;
        current = inner;
    }
    assert_eq!(depth, 10);
    assert_eq!(current, &AstNode::Literal("1".into()));
}

#[test]
fn test_nested_subqueries_of_the_same_shape() {
    let snippet = snippet(
        "SELECT a FROM (SELECT a FROM (SELECT a FROM (SELECT a FROM t) x) y) z",
    );
    assert_eq!(snippet.symbol_table().len(), 4);
    assert_eq!(snippet.interface().columns(), ["a"]);
    assert!(snippet.tables().get("t").unwrap().columns.contains("a"));
}

#[test]
fn test_nesting_limit_is_enforced() {
    let err = process_with(
        "SELECT a FROM t",
        EngineConfig::default().with_max_nesting(4),
    )
    .unwrap_err();
    assert!(matches!(err, SnippetError::NestingLimit { limit: 4, .. }));
}

#[test]
fn test_default_nesting_admits_deep_parentheses() {
    let depth = 40;
    let sql = format!("SELECT {}1{} FROM t", "(".repeat(depth), ")".repeat(depth));
    let snippet = snippet(&sql);
    assert_eq!(snippet.interface().len(), 1);
}

#[test]
fn test_syntax_error_stops_before_assembly() {
    let err = process_with("SELECT FROM WHERE", EngineConfig::default()).unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Syntax);
}

// ---
// Registry policies
// ---

#[test]
fn test_promotion_is_idempotent() {
    let snippet = snippet("SELECT <v> FROM t WHERE a = <v> AND b BETWEEN <v> AND 3");
    assert!(snippet.warnings().is_empty());
    assert_eq!(snippet.substitutions().len(), 1);
    assert_eq!(
        snippet.substitutions().get("<v>"),
        Some(SubstitutionType::Predicand)
    );
}

#[test]
fn test_keep_first_policy() {
    let snippet = process_with_policy("SELECT <v> FROM t WHERE <v>", ConflictPolicy::KeepFirst)
        .unwrap();
    assert_eq!(
        snippet.substitutions().get("<v>"),
        Some(SubstitutionType::Predicand)
    );
    assert_eq!(snippet.warnings().len(), 1);

    // The WHERE placeholder carries the type the registry kept.
    let Some(AstNode::Substitution(sub)) = &query(&snippet).where_clause else {
        panic!("expected a substituted WHERE clause");
    };
    assert_eq!(sub.declared_type, Some(SubstitutionType::Predicand));
}

#[test]
fn test_reject_policy_fails_the_statement() {
    let err =
        process_with_policy("SELECT <v> FROM t WHERE <v>", ConflictPolicy::Reject).unwrap_err();
    let SnippetError::Invalid { errors, .. } = &err else {
        panic!("expected an aggregate error, got {err:?}");
    };
    assert!(matches!(
        errors.as_slice(),
        [SnippetError::RegistryConflict { name, .. }] if name == "<v>"
    ));
}

#[test]
fn test_placeholder_types_by_position() {
    let snippet = snippet(
        "SELECT <Col> FROM <Source> s WHERE s.id IN <Ids> AND <Extra> ORDER BY 1",
    );
    let registry = snippet.substitutions();
    assert_eq!(registry.get("<Col>"), Some(SubstitutionType::Predicand));
    assert_eq!(registry.get("<Source>"), Some(SubstitutionType::Table));
    assert_eq!(registry.get("<Ids>"), Some(SubstitutionType::InList));
    assert_eq!(registry.get("<Extra>"), Some(SubstitutionType::Condition));

    let query = query(&snippet);
    let Some(AstNode::Table(table)) = &query.from else {
        panic!("expected a table");
    };
    assert!(matches!(&table.source, TableSource::Substitution(sub) if sub.name == "<Source>"));
    assert_eq!(table.alias.as_deref(), Some("s"));

    let Some(AstNode::And(items)) = &query.where_clause else {
        panic!("expected AND");
    };
    let AstNode::In(pred) = &items[0] else {
        panic!("expected IN");
    };
    assert!(matches!(&pred.list, InList::InList(AstNode::Substitution(_))));
}
