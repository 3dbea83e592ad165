//! The finished result of assembling one statement.
//!
//! A [`Snippet`] bundles the canonical tree with the symbol table, the table
//! dictionary, the substitution registry and the query interface, plus any
//! warnings. It is built once, after the root production finishes, and is
//! read-only afterwards.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::ast::AstNode;
use crate::diagnostics::Warning;
use crate::registry::SubstitutionRegistry;

/// Identifier of a query scope, assigned in the order scopes are opened.
pub type ScopeId = usize;

// ============================================================================
// SYMBOL TABLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Query,
    Insert,
    Update,
    /// A bare expression or condition template.
    Fragment,
}

/// What an alias in a scope stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasTarget {
    Table(String),
    Scope(ScopeId),
}

/// Which table or nested scope a column was attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    Table(String),
    Scope(ScopeId),
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedColumn {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    pub column: String,
    pub owner: Owner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ScopeId>,
    pub aliases: BTreeMap<String, AliasTarget>,
    pub columns: Vec<ResolvedColumn>,
    /// Output column names in select-list order.
    pub outputs: Vec<String>,
}

impl Scope {
    pub fn new(id: ScopeId, kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            id,
            kind,
            parent,
            aliases: BTreeMap::new(),
            columns: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Base tables bound in this scope, by alias.
    pub fn base_tables(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().filter_map(|(alias, target)| match target {
            AliasTarget::Table(table) => Some((alias.as_str(), table.as_str())),
            AliasTarget::Scope(_) => None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolTable {
    #[serde(skip_serializing_if = "Option::is_none")]
    root: Option<ScopeId>,
    scopes: BTreeMap<ScopeId, Scope>,
}

impl SymbolTable {
    pub(crate) fn new(root: Option<ScopeId>, scopes: BTreeMap<ScopeId, Scope>) -> Self {
        Self { root, scopes }
    }

    pub fn root(&self) -> Option<&Scope> {
        self.root.and_then(|id| self.scopes.get(&id))
    }

    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(&id)
    }

    pub fn scopes(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.values()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Looks `alias` up in `scope` and then its enclosing scopes.
    pub fn resolve_alias(&self, scope: ScopeId, alias: &str) -> Option<&AliasTarget> {
        let mut current = self.scopes.get(&scope);
        while let Some(entry) = current {
            if let Some(target) = entry.aliases.get(alias) {
                return Some(target);
            }
            current = entry.parent.and_then(|parent| self.scopes.get(&parent));
        }
        None
    }
}

// ============================================================================
// TABLE DICTIONARY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableEntry {
    pub columns: BTreeSet<String>,
    /// Set when `*` or `alias.*` selected every column.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub wildcard: bool,
}

impl TableEntry {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && !self.wildcard
    }
}

/// Tables referenced by the statement and the columns seen for each.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TableDictionary {
    tables: BTreeMap<String, TableEntry>,
}

impl TableDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures an entry exists even if no column ever names the table.
    pub fn add_table(&mut self, table: &str) {
        self.tables.entry(table.to_string()).or_default();
    }

    pub fn add_column(&mut self, table: &str, column: &str) {
        let entry = self.tables.entry(table.to_string()).or_default();
        if column == "*" {
            entry.wildcard = true;
        } else {
            entry.columns.insert(column.to_string());
        }
    }

    pub fn get(&self, table: &str) -> Option<&TableEntry> {
        self.tables.get(table)
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableEntry)> {
        self.tables.iter().map(|(name, entry)| (name.as_str(), entry))
    }
}

// ============================================================================
// QUERY INTERFACE
// ============================================================================

/// Output column names of the outermost query, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueryInterface {
    columns: Vec<String>,
}

impl QueryInterface {
    pub(crate) fn push(&mut self, name: String) {
        self.columns.push(name);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// ============================================================================
// SNIPPET
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snippet {
    source: String,
    ast: AstNode,
    symbol_table: SymbolTable,
    tables: TableDictionary,
    substitutions: SubstitutionRegistry,
    interface: QueryInterface,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<Warning>,
}

impl Snippet {
    pub(crate) fn new(
        source: String,
        ast: AstNode,
        symbol_table: SymbolTable,
        tables: TableDictionary,
        substitutions: SubstitutionRegistry,
        interface: QueryInterface,
        warnings: Vec<Warning>,
    ) -> Self {
        Self {
            source,
            ast,
            symbol_table,
            tables,
            substitutions,
            interface,
            warnings,
        }
    }

    /// Name of the source the statement came from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &AstNode {
        &self.ast
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbol_table
    }

    pub fn tables(&self) -> &TableDictionary {
        &self.tables
    }

    pub fn substitutions(&self) -> &SubstitutionRegistry {
        &self.substitutions
    }

    pub fn interface(&self) -> &QueryInterface {
        &self.interface
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_column_sets_flag() {
        let mut tables = TableDictionary::new();
        tables.add_table("fourth");
        tables.add_column("third", "*");
        tables.add_column("third", "id");

        assert!(tables.get("fourth").unwrap().is_empty());
        let third = tables.get("third").unwrap();
        assert!(third.wildcard);
        assert!(third.columns.contains("id"));
        assert!(!third.columns.contains("*"));
    }

    #[test]
    fn test_alias_lookup_walks_parents() {
        let mut outer = Scope::new(0, ScopeKind::Query, None);
        outer
            .aliases
            .insert("o".into(), AliasTarget::Table("orders".into()));
        let inner = Scope::new(1, ScopeKind::Query, Some(0));
        let table = SymbolTable::new(Some(0), BTreeMap::from([(0, outer), (1, inner)]));

        assert_eq!(
            table.resolve_alias(1, "o"),
            Some(&AliasTarget::Table("orders".into()))
        );
        assert_eq!(table.resolve_alias(1, "x"), None);
    }
}
