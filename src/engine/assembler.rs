//! The default assembler: the enter/exit protocol every node goes through.
//!
//! On entry a node either gets a frame (more than one child, or a single
//! non-terminal child) or is marked as a leaf. Terminal children are appended
//! to the current frame under the next positional key. On exit the node's
//! finished value is handed to the transform catalog, and the outcome is
//! merged into the parent frame, positionally or under a named key.

use tracing::trace;

use crate::ast::{AstNode, Capture, Unrecognized};
use crate::diagnostics::{ErrorType, SnippetError};
use crate::engine::context::{AssemblyContext, Slot};
use crate::engine::frame::Frame;
use crate::engine::transforms::{self, Outcome};
use crate::syntax::{ParseNode, ParseTreeListener, Rule, RuleKind, Token};

/// What a finished node resolved to before its transform runs.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Leaf(String),
    Container(Frame),
}

/// Rules whose finished value is their raw source text even though they
/// have several tokens. Reassembling a signed literal from its parts would
/// lose the original spelling.
pub fn is_leaf_override(rule: RuleKind) -> bool {
    matches!(rule, Rule::signed_numeric_literal)
}

fn allocates_frame(node: &ParseNode) -> bool {
    !node.is_leaf()
}

impl<'a> ParseTreeListener for AssemblyContext<'a> {
    type Error = SnippetError;

    fn enter_node(&mut self, node: &ParseNode) -> Result<(), SnippetError> {
        if self.path.len() >= self.config.max_nesting {
            return Err(SnippetError::NestingLimit {
                limit: self.config.max_nesting,
                src: self.named_source.clone(),
                span: node.span.into(),
            });
        }

        transforms::on_enter(self, node);

        let depth = if allocates_frame(node) {
            let depth = self.frames.enter(node.rule);
            self.frames.store(node.rule, depth, Frame::new(node.rule, depth));
            Some(depth)
        } else {
            None
        };
        self.path.push(Slot {
            rule: node.rule,
            depth,
            span: node.span,
        });
        Ok(())
    }

    fn visit_terminal(&mut self, token: &Token) -> Result<(), SnippetError> {
        if let Some(Slot {
            rule,
            depth: Some(depth),
            ..
        }) = self.path.last().copied()
        {
            self.frames
                .peek_mut(rule, depth)?
                .push_positional(Capture::Text(token.text.clone()));
        }
        Ok(())
    }

    fn exit_node(&mut self, node: &ParseNode) -> Result<(), SnippetError> {
        let slot = self.path.pop().ok_or_else(|| SnippetError::MissingFrame {
            rule: format!("{:?}", node.rule),
            depth: 0,
        })?;

        let value = match slot.depth {
            None => NodeValue::Leaf(node.leaf_text().unwrap_or_default().to_string()),
            Some(depth) => {
                let frame = self.frames.take(slot.rule, depth)?;
                self.frames.exit(slot.rule);
                if !frame.is_contiguous() {
                    return Err(SnippetError::FrameOrder {
                        rule: format!("{:?}", slot.rule),
                        depth,
                    });
                }
                if is_leaf_override(slot.rule) {
                    NodeValue::Leaf(node.raw_text(&self.source.content))
                } else {
                    NodeValue::Container(frame)
                }
            }
        };

        let outcome = match transforms::finish(self, node, value) {
            Ok(outcome) => outcome,
            Err(err) if err.error_type() == ErrorType::Structure => {
                self.record_error(err);
                Outcome::Value(Capture::Node(AstNode::Unrecognized(Unrecognized {
                    rule: format!("{:?}", node.rule),
                    entries: Vec::new(),
                })))
            }
            Err(err) => return Err(err),
        };

        self.merge(node.rule, outcome)
    }
}

impl<'a> AssemblyContext<'a> {
    /// Places a finished value into the parent frame. The root's value
    /// becomes the snippet's tree.
    fn merge(&mut self, rule: RuleKind, outcome: Outcome) -> Result<(), SnippetError> {
        if self.path.is_empty() {
            let capture = match outcome {
                Outcome::Value(capture) | Outcome::Keyed(_, capture) => capture,
            };
            self.root = Some(match capture {
                Capture::Text(text) => AstNode::Literal(text),
                other => other.into_node().unwrap_or(AstNode::List(Vec::new())),
            });
            return Ok(());
        }

        let frame = self.parent_frame_mut()?;
        match outcome {
            Outcome::Value(capture) => {
                let position = frame.push_positional(capture);
                trace!(?rule, position, "merge positional");
            }
            Outcome::Keyed(key, capture) => {
                frame.insert_named(key, capture);
                trace!(?rule, key, "merge named");
            }
        }
        Ok(())
    }
}
