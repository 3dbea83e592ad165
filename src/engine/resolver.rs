//! Symbol table, table dictionary and query interface builder.
//!
//! Scopes are opened and closed by the transforms as query productions are
//! entered and finished. Table bindings, column uses and output names are
//! recorded against the innermost open scope. Column ownership is resolved
//! once the whole statement has been seen, because a correlated subquery in a
//! select list may name an alias that the enclosing `FROM` binds later.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::ast::ColumnRef;
use crate::diagnostics::Warning;
use crate::snippet::{
    AliasTarget, Owner, QueryInterface, ResolvedColumn, Scope, ScopeId, ScopeKind, SymbolTable,
    TableDictionary,
};

#[derive(Debug, Clone)]
struct ColumnUse {
    qualifier: Option<String>,
    column: String,
}

#[derive(Debug)]
struct ScopeState {
    scope: Scope,
    uses: Vec<ColumnUse>,
}

/// Everything the resolver produces for the output bundle.
#[derive(Debug)]
pub struct Resolution {
    pub symbol_table: SymbolTable,
    pub tables: TableDictionary,
    pub interface: QueryInterface,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Default)]
pub struct Resolver {
    scopes: Vec<ScopeState>,
    stack: Vec<ScopeId>,
    root: Option<ScopeId>,
    ctes: HashMap<String, ScopeId>,
    cte_depth: usize,
    interface: QueryInterface,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------------

    /// Opens a scope nested in the current one. The first top-level scope
    /// outside any `WITH` element becomes the root.
    pub fn open_scope(&mut self, kind: ScopeKind) -> ScopeId {
        let id = self.scopes.len();
        let parent = self.stack.last().copied();
        if self.root.is_none() && parent.is_none() && self.cte_depth == 0 {
            self.root = Some(id);
        }
        debug!(id, ?kind, ?parent, "open scope");
        self.scopes.push(ScopeState {
            scope: Scope::new(id, kind, parent),
            uses: Vec::new(),
        });
        self.stack.push(id);
        id
    }

    pub fn close_scope(&mut self) -> Option<ScopeId> {
        self.stack.pop()
    }

    /// Makes an already closed scope current again, so that clauses which
    /// follow its body (`ORDER BY`, `LIMIT`, `OFFSET`) record against it.
    pub fn reenter_scope(&mut self, id: ScopeId) {
        if id < self.scopes.len() {
            debug!(id, "reenter scope");
            self.stack.push(id);
        }
    }

    pub fn current(&self) -> Option<ScopeId> {
        self.stack.last().copied()
    }

    /// Id the next opened scope will receive.
    pub fn next_scope_id(&self) -> ScopeId {
        self.scopes.len()
    }

    pub fn root(&self) -> Option<ScopeId> {
        self.root
    }

    pub fn enter_cte(&mut self) {
        self.cte_depth += 1;
    }

    pub fn exit_cte(&mut self) {
        self.cte_depth = self.cte_depth.saturating_sub(1);
    }

    /// Makes `name` usable as a table that stands for `scope`.
    pub fn register_cte(&mut self, name: &str, scope: ScopeId) {
        self.ctes.insert(name.to_string(), scope);
    }

    /// The current scope. Outside every open scope this is the root, and a
    /// fragment scope is opened only for trees that have no statement
    /// production around them.
    fn current_or_open(&mut self) -> ScopeId {
        match self.current().or(self.root) {
            Some(id) => id,
            None => self.open_scope(ScopeKind::Fragment),
        }
    }

    fn current_state(&mut self) -> &mut ScopeState {
        let id = self.current_or_open();
        &mut self.scopes[id]
    }

    // ------------------------------------------------------------------------
    // Bindings
    // ------------------------------------------------------------------------

    /// Binds a table in the current scope under `alias`, or under its last
    /// name part when unaliased. A name registered by `WITH` binds the
    /// common table expression's scope instead.
    pub fn bind_table(&mut self, table: &str, alias: Option<&str>) {
        let key = alias
            .map(str::to_string)
            .unwrap_or_else(|| table.rsplit('.').next().unwrap_or(table).to_string());
        let target = match self.ctes.get(table) {
            Some(scope) => AliasTarget::Scope(*scope),
            None => AliasTarget::Table(table.to_string()),
        };
        self.current_state().scope.aliases.insert(key, target);
    }

    pub fn bind_scope(&mut self, alias: &str, scope: ScopeId) {
        self.current_state()
            .scope
            .aliases
            .insert(alias.to_string(), AliasTarget::Scope(scope));
    }

    /// Records a column reference made anywhere in the current scope.
    pub fn record_column(&mut self, column: &ColumnRef) {
        let state = self.current_state();
        state.uses.push(ColumnUse {
            qualifier: column.table.clone(),
            column: column.column.clone(),
        });
    }

    /// Appends an output column name to the current scope, and to the query
    /// interface when the current scope is the root.
    pub fn add_output(&mut self, name: String) {
        let id = self.current_or_open();
        if Some(id) == self.root {
            self.interface.push(name.clone());
        }
        self.scopes[id].scope.outputs.push(name);
    }

    // ------------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------------

    fn lookup(&self, scope: ScopeId, alias: &str) -> Option<AliasTarget> {
        let mut current = self.scopes.get(scope);
        while let Some(state) = current {
            if let Some(target) = state.scope.aliases.get(alias) {
                return Some(target.clone());
            }
            current = state.scope.parent.and_then(|parent| self.scopes.get(parent));
        }
        None
    }

    fn resolve_use(&self, scope: &Scope, used: &ColumnUse, warnings: &mut Vec<Warning>) -> Owner {
        match &used.qualifier {
            Some(qualifier) => match self.lookup(scope.id, qualifier) {
                Some(AliasTarget::Table(table)) => Owner::Table(table),
                Some(AliasTarget::Scope(id)) => Owner::Scope(id),
                None => {
                    warn!(scope = scope.id, %qualifier, column = %used.column, "unknown qualifier");
                    warnings.push(Warning::UnknownQualifier {
                        scope: scope.id,
                        qualifier: qualifier.clone(),
                        column: used.column.clone(),
                    });
                    Owner::Unresolved
                }
            },
            None => {
                let mut bindings = scope.aliases.values();
                match (bindings.next(), bindings.next()) {
                    (Some(AliasTarget::Table(table)), None) => Owner::Table(table.clone()),
                    (Some(AliasTarget::Scope(id)), None) => Owner::Scope(*id),
                    _ => {
                        if scope.kind != ScopeKind::Fragment {
                            warn!(scope = scope.id, column = %used.column, "column owner is ambiguous");
                            warnings.push(Warning::UnresolvedOwner {
                                scope: scope.id,
                                column: used.column.clone(),
                            });
                        }
                        Owner::Unresolved
                    }
                }
            }
        }
    }

    /// Resolves every recorded column and produces the finished maps.
    pub fn finish(self) -> Resolution {
        let mut warnings = Vec::new();
        let mut tables = TableDictionary::new();
        let mut resolved: Vec<Vec<ResolvedColumn>> = Vec::with_capacity(self.scopes.len());

        for state in &self.scopes {
            for (_, table) in state.scope.base_tables() {
                tables.add_table(table);
            }
            let mut columns = Vec::with_capacity(state.uses.len());
            for used in &state.uses {
                let owner = self.resolve_use(&state.scope, used, &mut warnings);
                if let Owner::Table(table) = &owner {
                    tables.add_column(table, &used.column);
                }
                columns.push(ResolvedColumn {
                    qualifier: used.qualifier.clone(),
                    column: used.column.clone(),
                    owner,
                });
            }
            resolved.push(columns);
        }

        let scopes: BTreeMap<ScopeId, Scope> = self
            .scopes
            .into_iter()
            .zip(resolved)
            .map(|(state, columns)| {
                let mut scope = state.scope;
                scope.columns = columns;
                (scope.id, scope)
            })
            .collect();

        Resolution {
            symbol_table: SymbolTable::new(self.root, scopes),
            tables,
            interface: self.interface,
            warnings,
        }
    }
}
