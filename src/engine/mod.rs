//! Tree-assembly engine.
//!
//! Walks a [`ParseNode`] tree once and assembles the canonical AST together
//! with the symbol table, table dictionary, substitution registry and query
//! interface. Each call works on its own [`AssemblyContext`], so separate
//! statements can be processed concurrently with separate engines or the
//! same shared one.

pub mod assembler;
pub mod context;
pub mod frame;
pub mod promotion;
pub mod resolver;
pub mod transforms;

use tracing::debug_span;

use crate::config::EngineConfig;
use crate::diagnostics::{SnippetError, SourceContext};
use crate::snippet::Snippet;
use crate::syntax::{parser, walker::walk, ParseNode};

use self::context::AssemblyContext;

/// Assembles a snippet from an already parsed tree.
///
/// `source` supplies the name and the text spans point into. Hand-built
/// trees may pass a source with empty content.
pub fn assemble(
    tree: &ParseNode,
    source: &SourceContext,
    config: &EngineConfig,
) -> Result<Snippet, SnippetError> {
    let span = debug_span!("assemble", name = %source.name, nodes = tree.node_count());
    let _guard = span.enter();

    let mut ctx = AssemblyContext::new(source, config);
    walk(&mut ctx, tree)?;
    ctx.finish()
}

/// Parser and assembler behind one configuration.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, SnippetError> {
        Ok(Self {
            config: config.validate()?,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parses and assembles one template.
    pub fn process(&self, name: &str, sql: &str) -> Result<Snippet, SnippetError> {
        let source = SourceContext::from_file(name, sql);
        self.process_source(&source)
    }

    pub fn process_source(&self, source: &SourceContext) -> Result<Snippet, SnippetError> {
        let tree = parser::parse(source)?;
        assemble(&tree, source, &self.config)
    }
}
