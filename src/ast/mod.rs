//! AST module for SQL templates
//!
//! The canonical tree produced by the assembly engine. Each variant is one
//! entry of the fixed key vocabulary; serialising a node yields that key
//! (`{"condition": {"left": .., "operator": .., "right": ..}}`). Consumers
//! must pass over keys they do not know, and the engine emits
//! [`AstNode::Unrecognized`] for productions it has no shape for.

// ============================================================================
// IMPORTS
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::registry::SubstitutionType;

mod pretty;

// ============================================================================
// CAPTURES
// ============================================================================

/// A value held in an assembly frame: raw token text, a finished node or an
/// ordered list of finished nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capture {
    Text(String),
    Node(AstNode),
    List(Vec<AstNode>),
}

impl Capture {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Capture::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&AstNode> {
        match self {
            Capture::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Capture::Text(_))
    }

    /// Converts a node or list capture into a node. Raw text has no node form.
    pub fn into_node(self) -> Option<AstNode> {
        match self {
            Capture::Node(node) => Some(node),
            Capture::List(items) => Some(AstNode::List(items)),
            Capture::Text(_) => None,
        }
    }

    /// Converts into a list of nodes, unwrapping one level of list.
    pub fn into_list(self) -> Option<Vec<AstNode>> {
        match self {
            Capture::List(items) | Capture::Node(AstNode::List(items)) => Some(items),
            Capture::Node(node) => Some(vec![node]),
            Capture::Text(_) => None,
        }
    }
}

// ============================================================================
// CORE NODE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AstNode {
    Literal(String),
    NullLiteral,
    Column(ColumnRef),
    Substitution(Substitution),
    Table(TableRef),

    Query(Box<Query>),
    QueryExpression(Box<QueryExpression>),
    Union(Box<SetOperation>),
    Except(Box<SetOperation>),
    Intersect(Box<SetOperation>),
    Cte(Box<Cte>),

    Condition(Box<Condition>),
    And(Vec<AstNode>),
    Or(Vec<AstNode>),
    Not(Box<AstNode>),
    In(Box<InPredicate>),
    Between(Box<Between>),
    Is(Box<IsPredicate>),
    Exists(Box<AstNode>),

    Calculation(Box<Calculation>),
    Concatenate(Vec<AstNode>),
    Function(Box<Function>),
    WindowFunction(Box<WindowFunction>),
    Over(Box<Window>),
    Cast(Box<Cast>),
    Trim(Box<Trim>),
    Case(Box<Case>),
    When(Box<When>),
    Parentheses(Box<AstNode>),
    List(Vec<AstNode>),

    Join(Box<Join>),
    JoinExtension(Box<JoinExtension>),
    SortSpec(Box<SortSpec>),
    Aliased(Box<Aliased>),

    Insert(Box<Insert>),
    Update(Box<Update>),
    Assignment(Box<Assignment>),

    Unrecognized(Unrecognized),
}

impl AstNode {
    pub fn type_name(&self) -> &'static str {
        match self {
            AstNode::Literal(_) => "literal",
            AstNode::NullLiteral => "null_literal",
            AstNode::Column(_) => "column",
            AstNode::Substitution(_) => "substitution",
            AstNode::Table(_) => "table",
            AstNode::Query(_) => "query",
            AstNode::QueryExpression(_) => "query_expression",
            AstNode::Union(_) => "union",
            AstNode::Except(_) => "except",
            AstNode::Intersect(_) => "intersect",
            AstNode::Cte(_) => "cte",
            AstNode::Condition(_) => "condition",
            AstNode::And(_) => "and",
            AstNode::Or(_) => "or",
            AstNode::Not(_) => "not",
            AstNode::In(_) => "in",
            AstNode::Between(_) => "between",
            AstNode::Is(_) => "is",
            AstNode::Exists(_) => "exists",
            AstNode::Calculation(_) => "calculation",
            AstNode::Concatenate(_) => "concatenate",
            AstNode::Function(_) => "function",
            AstNode::WindowFunction(_) => "window_function",
            AstNode::Over(_) => "over",
            AstNode::Cast(_) => "cast",
            AstNode::Trim(_) => "trim",
            AstNode::Case(_) => "case",
            AstNode::When(_) => "when",
            AstNode::Parentheses(_) => "parentheses",
            AstNode::List(_) => "list",
            AstNode::Join(_) => "join",
            AstNode::JoinExtension(_) => "join_extension",
            AstNode::SortSpec(_) => "sort_spec",
            AstNode::Aliased(_) => "aliased",
            AstNode::Insert(_) => "insert",
            AstNode::Update(_) => "update",
            AstNode::Assignment(_) => "assignment",
            AstNode::Unrecognized(_) => "unrecognized",
        }
    }

    pub fn as_substitution(&self) -> Option<&Substitution> {
        match self {
            AstNode::Substitution(sub) => Some(sub),
            _ => None,
        }
    }

    pub fn as_column(&self) -> Option<&ColumnRef> {
        match self {
            AstNode::Column(column) => Some(column),
            _ => None,
        }
    }

    /// Display name of an output expression when no alias is given.
    pub fn display_name(&self) -> String {
        match self {
            AstNode::Column(column) => column.column.clone(),
            AstNode::Substitution(sub) => sub.name.clone(),
            AstNode::Aliased(aliased) => aliased.alias.clone(),
            other => other.pretty(),
        }
    }
}

// ============================================================================
// REFERENCES
// ============================================================================

/// A column reference of one to three parts. `*` marks a wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn bare(column: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: None,
            column: column.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: Some(table.into()),
            column: column.into(),
        }
    }
}

/// A substitution variable such as `<Name>` or `<schema.table.column>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    /// Name as written, delimiters included.
    pub name: String,
    pub parts: SubstitutionParts,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub declared_type: Option<SubstitutionType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionParts {
    Name(String),
    TableColumn {
        table: String,
        column: String,
    },
    SchemaTableColumn {
        schema: String,
        table: String,
        column: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRef {
    pub source: TableSource,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableSource {
    #[serde(rename = "table_ref")]
    Named(TableName),
    Substitution(Substitution),
    Query(Box<AstNode>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableName {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub database_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub schema: Option<String>,
    pub table: String,
}

impl TableName {
    /// Dotted name as used for table dictionary keys.
    pub fn qualified_name(&self) -> String {
        [&self.database_name, &self.schema]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .chain(std::iter::once(self.table.as_str()))
            .collect::<Vec<_>>()
            .join(".")
    }
}

// ============================================================================
// QUERIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Query {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub with: Vec<Cte>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub quantifier: Option<String>,
    pub select: Vec<AstNode>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub from: Option<AstNode>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none", default)]
    pub where_clause: Option<AstNode>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub groupby: Vec<AstNode>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub having: Option<AstNode>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub orderby: Vec<AstNode>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub limit: Option<AstNode>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub offset: Option<AstNode>,
}

/// Trailing clauses of a query expression that apply to its whole body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryTail {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub with: Vec<Cte>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub orderby: Vec<AstNode>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub limit: Option<AstNode>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub offset: Option<AstNode>,
}

impl QueryTail {
    pub fn is_empty(&self) -> bool {
        self.with.is_empty()
            && self.orderby.is_empty()
            && self.limit.is_none()
            && self.offset.is_none()
    }
}

/// A query body whose own tail could not absorb an outer one, as in
/// `(SELECT .. ORDER BY a) ORDER BY b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryExpression {
    pub query: AstNode,
    #[serde(flatten)]
    pub tail: QueryTail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetOperation {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub quantifier: Option<String>,
    pub left: AstNode,
    pub right: AstNode,
    #[serde(flatten)]
    pub tail: QueryTail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cte {
    pub name: String,
    pub query: AstNode,
}

// ============================================================================
// CONDITIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub left: AstNode,
    pub operator: String,
    pub right: AstNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InPredicate {
    pub item: AstNode,
    #[serde(flatten)]
    pub list: InList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InList {
    InList(AstNode),
    NotInList(AstNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Between {
    pub item: AstNode,
    pub operator: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub symmetry: Option<String>,
    pub range_begin: AstNode,
    pub range_end: AstNode,
}

/// `IS [NOT] NULL`, `IS [NOT] TRUE|FALSE|UNKNOWN` and
/// `IS [NOT] DISTINCT FROM x`. The operator keeps the tokens as written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsPredicate {
    pub item: AstNode,
    pub operator: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub right: Option<AstNode>,
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    pub left: AstNode,
    pub operator: String,
    pub right: AstNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub schema: Option<String>,
    pub function_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub quantifier: Option<String>,
    pub parameters: Vec<AstNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowFunction {
    pub function: Function,
    pub over: Window,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Window {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub partition_by: Vec<AstNode>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub orderby: Vec<AstNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cast {
    pub value: AstNode,
    #[serde(rename = "type")]
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trim {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub qualifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trim_character: Option<AstNode>,
    pub value: AstNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<AstNode>,
    pub when: Vec<When>,
    #[serde(rename = "else", skip_serializing_if = "Option::is_none", default)]
    pub else_result: Option<AstNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct When {
    pub when: AstNode,
    pub then: AstNode,
}

// ============================================================================
// FROM, ORDERING, ALIASES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub left: AstNode,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub join_type: Option<String>,
    pub right: AstNode,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub on: Option<AstNode>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub using: Vec<AstNode>,
}

/// One `JOIN` step before it is folded onto its left-hand table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinExtension {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub join_type: Option<String>,
    pub table: AstNode,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub on: Option<AstNode>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub using: Vec<AstNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullOrder {
    #[default]
    Unspecified,
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    pub predicand: AstNode,
    pub sort_order: SortOrder,
    pub null_order: NullOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aliased {
    pub value: AstNode,
    pub alias: String,
}

// ============================================================================
// DATA MODIFICATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insert {
    pub table: AstNode,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub columns: Vec<AstNode>,
    pub source: AstNode,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub returning: Vec<AstNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub table: AstNode,
    pub set: Vec<AstNode>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none", default)]
    pub where_clause: Option<AstNode>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub returning: Vec<AstNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub column: AstNode,
    pub value: AstNode,
}

// ============================================================================
// FORWARD COMPATIBILITY
// ============================================================================

/// A production the engine has no canonical shape for, kept with its
/// captures in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unrecognized {
    pub rule: String,
    pub entries: Vec<(String, Capture)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialises_under_vocabulary_key() {
        let node = AstNode::Condition(Box::new(Condition {
            left: AstNode::Column(ColumnRef::bare("a")),
            operator: "=".to_string(),
            right: AstNode::Literal("1".to_string()),
        }));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["condition"]["operator"], "=");
        assert_eq!(json["condition"]["left"]["column"]["column"], "a");
    }

    #[test]
    fn test_in_list_key_follows_negation() {
        let node = AstNode::In(Box::new(InPredicate {
            item: AstNode::Column(ColumnRef::bare("a")),
            list: InList::NotInList(AstNode::List(vec![AstNode::Literal("1".into())])),
        }));
        let json = serde_json::to_value(&node).unwrap();
        assert!(json["in"].get("not_in_list").is_some());
        assert!(json["in"].get("in_list").is_none());
    }

    #[test]
    fn test_qualified_table_name() {
        let name = TableName {
            database_name: None,
            schema: Some("public".into()),
            table: "users".into(),
        };
        assert_eq!(name.qualified_name(), "public.users");
    }

    #[test]
    fn test_display_name_prefers_alias() {
        let node = AstNode::Aliased(Box::new(Aliased {
            value: AstNode::Column(ColumnRef::bare("a")),
            alias: "b".into(),
        }));
        assert_eq!(node.display_name(), "b");
        assert_eq!(AstNode::Column(ColumnRef::qualified("t", "c")).display_name(), "c");
    }
}
