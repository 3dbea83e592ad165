//! Diagnostics for the snippet engine
//!
//! Every failure mode of parsing and assembly is a [`SnippetError`], a
//! `miette`-based diagnostic carrying the named source and a labelled span
//! whenever a location exists. Non-fatal findings are [`Warning`] values that
//! travel with the finished [`Snippet`](crate::snippet::Snippet).
//!
//! # Propagation
//!
//! - Syntax errors stop before assembly starts.
//! - Structural errors are collected during one best-effort pass and returned
//!   together as [`SnippetError::Invalid`]; no snippet is produced.
//! - Registry conflicts and unresolved owners are warnings unless the
//!   configured conflict policy is `reject`.

use std::sync::Arc;

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::Serialize;
use thiserror::Error;

use crate::registry::SubstitutionType;
use crate::snippet::ScopeId;
use crate::syntax::Span;

pub type SourceArc = Arc<NamedSource<String>>;

// ============================================================================
// SOURCE CONTEXT
// ============================================================================

/// Names a statement's source text for error reporting.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Context for text that did not come from a file.
    pub fn inline(content: impl Into<String>) -> Self {
        Self::from_file("<inline>", content)
    }

    pub fn to_named_source(&self) -> SourceArc {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Coarse classification used by callers and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    Syntax,
    Structure,
    Registry,
    Internal,
    Io,
    Config,
    Check,
}

#[derive(Debug, Error, Diagnostic)]
pub enum SnippetError {
    #[error("Syntax error: {message}")]
    #[diagnostic(code(sqlsnip::syntax))]
    Syntax {
        message: String,
        #[source_code]
        src: SourceArc,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("Structural error: `{rule}` captured {captures} value(s), expected {expected}")]
    #[diagnostic(
        code(sqlsnip::structure),
        help("the grammar production and its reshaping rule disagree")
    )]
    Structure {
        rule: String,
        captures: usize,
        expected: String,
        #[source_code]
        src: SourceArc,
        #[label("captured here")]
        span: SourceSpan,
    },

    #[error("Internal error: no frame for `{rule}` at depth {depth}")]
    #[diagnostic(code(sqlsnip::frame))]
    MissingFrame { rule: String, depth: usize },

    #[error("Internal error: positional captures of `{rule}` at depth {depth} are not contiguous")]
    #[diagnostic(code(sqlsnip::frame_order))]
    FrameOrder { rule: String, depth: usize },

    #[error("Nesting limit of {limit} exceeded")]
    #[diagnostic(
        code(sqlsnip::nesting),
        help("raise `max_nesting` in the engine configuration")
    )]
    NestingLimit {
        limit: usize,
        #[source_code]
        src: SourceArc,
        #[label("too deeply nested")]
        span: SourceSpan,
    },

    #[error("Substitution `{name}` is used as `{previous}` and as `{attempted}`")]
    #[diagnostic(code(sqlsnip::registry_conflict))]
    RegistryConflict {
        name: String,
        previous: SubstitutionType,
        attempted: SubstitutionType,
        #[source_code]
        src: SourceArc,
        #[label("typed `{attempted}` here")]
        span: SourceSpan,
    },

    #[error("{} error(s) while assembling `{name}`", .errors.len())]
    #[diagnostic(code(sqlsnip::invalid))]
    Invalid {
        name: String,
        #[related]
        errors: Vec<SnippetError>,
    },

    #[error("Failed to read `{path}`")]
    #[diagnostic(code(sqlsnip::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(sqlsnip::config))]
    Config { message: String },

    #[error("{failed} of {checked} templates failed")]
    #[diagnostic(code(sqlsnip::check), help("each failure is reported above"))]
    CheckFailed { failed: usize, checked: usize },
}

impl SnippetError {
    pub fn error_type(&self) -> ErrorType {
        match self {
            SnippetError::Syntax { .. } => ErrorType::Syntax,
            SnippetError::Structure { .. } | SnippetError::Invalid { .. } => ErrorType::Structure,
            SnippetError::RegistryConflict { .. } => ErrorType::Registry,
            SnippetError::MissingFrame { .. }
            | SnippetError::FrameOrder { .. }
            | SnippetError::NestingLimit { .. } => ErrorType::Internal,
            SnippetError::Io { .. } => ErrorType::Io,
            SnippetError::Config { .. } => ErrorType::Config,
            SnippetError::CheckFailed { .. } => ErrorType::Check,
        }
    }

    /// The individual errors behind an `Invalid` aggregate, or `self` alone.
    pub fn flatten(&self) -> Vec<&SnippetError> {
        match self {
            SnippetError::Invalid { errors, .. } => errors.iter().collect(),
            other => vec![other],
        }
    }
}

/// Creates a structural error for a production whose captures match no shape.
pub fn structure_error(
    source: &SourceArc,
    rule: impl std::fmt::Debug,
    captures: usize,
    expected: &str,
    span: Span,
) -> SnippetError {
    SnippetError::Structure {
        rule: format!("{rule:?}"),
        captures,
        expected: expected.to_string(),
        src: Arc::clone(source),
        span: span.into(),
    }
}

// ============================================================================
// WARNINGS
// ============================================================================

/// Non-fatal findings attached to a finished snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    #[error("substitution `{name}` typed `{previous}` and `{attempted}`; kept `{kept}`")]
    RegistryConflict {
        name: String,
        previous: SubstitutionType,
        attempted: SubstitutionType,
        kept: SubstitutionType,
    },

    #[error("column `{column}` in scope {scope} has no single owning table")]
    UnresolvedOwner { scope: ScopeId, column: String },

    #[error("qualifier `{qualifier}` of column `{column}` in scope {scope} names no table or alias")]
    UnknownQualifier {
        scope: ScopeId,
        qualifier: String,
        column: String,
    },
}

// ============================================================================
// FORMATTING
// ============================================================================

/// Prints a `SnippetError` with full miette diagnostics to stderr.
pub fn print_error(error: SnippetError) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}
