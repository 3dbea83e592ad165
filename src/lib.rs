//! sqlsnip: SQL templates with typed substitution variables.
//!
//! A template is ordinary SQL in which a value, a predicate, a table or an
//! IN-list may be replaced by a placeholder such as `<OnJoinCondition>`.
//! Processing a template yields a [`Snippet`]: the canonical AST, a symbol
//! table per query scope, a dictionary of referenced tables and columns, the
//! placeholders with the types inferred from where they appear, and the
//! ordered output columns of the outermost query.
//!
//! ```
//! use sqlsnip::{parse_snippet, SubstitutionType};
//!
//! let snippet = parse_snippet("SELECT id FROM users WHERE <Filter>").unwrap();
//! assert_eq!(snippet.interface().columns(), ["id"]);
//! assert_eq!(
//!     snippet.substitutions().get("<Filter>"),
//!     Some(SubstitutionType::Condition)
//! );
//! ```

pub mod ast;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod registry;
pub mod snippet;
pub mod syntax;

pub use crate::ast::{AstNode, Capture};
pub use crate::config::{ConflictPolicy, EngineConfig};
pub use crate::diagnostics::{SnippetError, SourceContext, Warning};
pub use crate::engine::{assemble, Engine};
pub use crate::registry::{SubstitutionRegistry, SubstitutionType};
pub use crate::snippet::Snippet;

/// Processes one template with the default configuration.
pub fn parse_snippet(sql: &str) -> Result<Snippet, SnippetError> {
    Engine::default().process_source(&SourceContext::inline(sql))
}
