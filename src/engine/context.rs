//! Per-statement assembly state.
//!
//! One [`AssemblyContext`] exists for each statement being assembled. It owns
//! the frame stack, the resolver and the registry under construction, so two
//! statements never share mutable state.

use tracing::{debug, error};

use crate::ast::{AstNode, Capture};
use crate::config::{ConflictPolicy, EngineConfig};
use crate::diagnostics::{SnippetError, SourceArc, SourceContext, Warning};
use crate::engine::frame::{Frame, FrameStack};
use crate::engine::promotion;
use crate::engine::resolver::Resolver;
use crate::registry::{SubstitutionRegistry, SubstitutionType};
use crate::snippet::{ScopeId, Snippet};
use crate::syntax::{RuleKind, Span};

/// One entry of the path from the root to the node being visited. Leaf
/// nodes have no frame and therefore no depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub rule: RuleKind,
    pub depth: Option<usize>,
    pub span: Span,
}

pub struct AssemblyContext<'a> {
    pub(crate) source: &'a SourceContext,
    pub(crate) named_source: SourceArc,
    pub(crate) config: &'a EngineConfig,
    pub(crate) frames: FrameStack,
    pub(crate) path: Vec<Slot>,
    pub(crate) resolver: Resolver,
    pub(crate) registry: SubstitutionRegistry,
    pub(crate) warnings: Vec<Warning>,
    pub(crate) errors: Vec<SnippetError>,
    pub(crate) root: Option<AstNode>,
    /// Inferred output name staged by a select-list expression for its
    /// enclosing `derived_column`.
    pub(crate) pending_output: Option<String>,
    /// Id of the first scope opened inside each open `table_primary`,
    /// `with_list_element` or `query_body`.
    pub(crate) scope_marks: Vec<ScopeId>,
    /// One entry per open `query_expression` whose body scope was reentered
    /// for its trailing clauses.
    pub(crate) held_scopes: Vec<bool>,
}

impl<'a> AssemblyContext<'a> {
    pub fn new(source: &'a SourceContext, config: &'a EngineConfig) -> Self {
        Self {
            source,
            named_source: source.to_named_source(),
            config,
            frames: FrameStack::new(),
            path: Vec::new(),
            resolver: Resolver::new(),
            registry: SubstitutionRegistry::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            root: None,
            pending_output: None,
            scope_marks: Vec::new(),
            held_scopes: Vec::new(),
        }
    }

    /// The enclosing node. During exit the finished node has already been
    /// popped, so this is its parent.
    pub fn parent(&self) -> Option<Slot> {
        self.path.last().copied()
    }

    pub fn parent_rule(&self) -> Option<RuleKind> {
        self.parent().map(|slot| slot.rule)
    }

    pub fn parent_frame_mut(&mut self) -> Result<&mut Frame, SnippetError> {
        match self.parent() {
            Some(Slot {
                rule,
                depth: Some(depth),
                ..
            }) => self.frames.peek_mut(rule, depth),
            Some(Slot { rule, .. }) => Err(SnippetError::MissingFrame {
                rule: format!("{rule:?}"),
                depth: 0,
            }),
            None => Err(SnippetError::MissingFrame {
                rule: "<root>".to_string(),
                depth: 0,
            }),
        }
    }

    // ------------------------------------------------------------------------
    // Promotion
    // ------------------------------------------------------------------------

    pub fn promote(&mut self, capture: &mut Capture, ty: SubstitutionType, span: Span) {
        if let Capture::Node(node) = capture {
            self.promote_node(node, ty, span);
        }
    }

    pub fn promote_node(&mut self, node: &mut AstNode, ty: SubstitutionType, span: Span) {
        let policy = self.config.conflict_policy;
        let Some(conflict) = promotion::promote(node, ty, &mut self.registry, policy) else {
            return;
        };
        self.warnings.push(Warning::RegistryConflict {
            name: conflict.name.clone(),
            previous: conflict.previous,
            attempted: conflict.attempted,
            kept: conflict.kept,
        });
        if policy == ConflictPolicy::Reject {
            self.errors.push(SnippetError::RegistryConflict {
                name: conflict.name,
                previous: conflict.previous,
                attempted: conflict.attempted,
                src: self.named_source.clone(),
                span: span.into(),
            });
        }
    }

    // ------------------------------------------------------------------------
    // Completion
    // ------------------------------------------------------------------------

    pub fn record_error(&mut self, err: SnippetError) {
        error!(error = %err, "structural error");
        self.errors.push(err);
    }

    /// Builds the snippet, or fails with every error collected on the way.
    pub fn finish(self) -> Result<Snippet, SnippetError> {
        if !self.errors.is_empty() {
            return Err(SnippetError::Invalid {
                name: self.source.name.clone(),
                errors: self.errors,
            });
        }
        if !self.frames.is_balanced() {
            return Err(SnippetError::MissingFrame {
                rule: "<unbalanced>".to_string(),
                depth: 0,
            });
        }
        let Some(ast) = self.root else {
            return Err(SnippetError::MissingFrame {
                rule: "<root>".to_string(),
                depth: 0,
            });
        };

        let resolution = self.resolver.finish();
        let mut warnings = self.warnings;
        warnings.extend(resolution.warnings);
        debug!(
            substitutions = self.registry.len(),
            scopes = resolution.symbol_table.len(),
            warnings = warnings.len(),
            "snippet assembled"
        );

        Ok(Snippet::new(
            self.source.name.clone(),
            ast,
            resolution.symbol_table,
            resolution.tables,
            self.registry,
            resolution.interface,
            warnings,
        ))
    }
}
