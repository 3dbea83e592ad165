//! Frames and the frame stack.
//!
//! A [`Frame`] collects the captures of one active parse-tree node. Frames of
//! the same rule kind that are active at once (nested subqueries, nested
//! parentheses) are told apart by the per-rule depth the [`FrameStack`]
//! hands out on entry.

use std::collections::HashMap;

use tracing::trace;

use crate::ast::Capture;
use crate::diagnostics::SnippetError;
use crate::syntax::RuleKind;

// ============================================================================
// FRAME
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKey {
    /// 1-based, contiguous, in child visitation order.
    Position(usize),
    Named(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    rule: RuleKind,
    depth: usize,
    entries: Vec<(FrameKey, Capture)>,
    next_position: usize,
}

impl Frame {
    pub fn new(rule: RuleKind, depth: usize) -> Self {
        Self {
            rule,
            depth,
            entries: Vec::new(),
            next_position: 1,
        }
    }

    pub fn rule(&self) -> RuleKind {
        self.rule
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Appends under the next positional key and returns that key.
    pub fn push_positional(&mut self, capture: Capture) -> usize {
        let position = self.next_position;
        self.entries.push((FrameKey::Position(position), capture));
        self.next_position += 1;
        position
    }

    /// Stores under a named key, replacing an earlier value for that key.
    pub fn insert_named(&mut self, key: &'static str, capture: Capture) {
        if let Some(slot) = self
            .entries
            .iter_mut()
            .find(|(k, _)| *k == FrameKey::Named(key))
        {
            slot.1 = capture;
            return;
        }
        self.entries.push((FrameKey::Named(key), capture));
    }

    pub fn named(&self, key: &str) -> Option<&Capture> {
        self.entries.iter().find_map(|(k, capture)| match k {
            FrameKey::Named(name) if *name == key => Some(capture),
            _ => None,
        })
    }

    pub fn positional_len(&self) -> usize {
        self.next_position - 1
    }

    /// Removes the capture with the highest position, keeping the positions
    /// contiguous. Used to reclaim a left operand that was captured before
    /// the production that consumes it.
    pub fn take_last_positional(&mut self) -> Option<Capture> {
        let index = self
            .entries
            .iter()
            .rposition(|(key, _)| matches!(key, FrameKey::Position(_)))?;
        let (_, capture) = self.entries.remove(index);
        self.next_position -= 1;
        Some(capture)
    }

    /// True when the positional keys are exactly `1..=N` in entry order.
    pub fn is_contiguous(&self) -> bool {
        self.entries
            .iter()
            .filter_map(|(key, _)| match key {
                FrameKey::Position(n) => Some(*n),
                FrameKey::Named(_) => None,
            })
            .enumerate()
            .all(|(index, position)| position == index + 1)
    }

    /// Splits the frame into positional captures (in order) and named ones.
    pub fn into_parts(self) -> (Vec<Capture>, Vec<(&'static str, Capture)>) {
        let mut positional = Vec::with_capacity(self.entries.len());
        let mut named = Vec::new();
        for (key, capture) in self.entries {
            match key {
                FrameKey::Position(_) => positional.push(capture),
                FrameKey::Named(name) => named.push((name, capture)),
            }
        }
        (positional, named)
    }
}

// ============================================================================
// FRAME STACK
// ============================================================================

/// Per-rule depth counters and the frames they key. One per traversal.
#[derive(Debug, Default)]
pub struct FrameStack {
    depths: HashMap<RuleKind, usize>,
    frames: HashMap<(RuleKind, usize), Frame>,
}

impl FrameStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the depth of `rule` and returns the new depth.
    pub fn enter(&mut self, rule: RuleKind) -> usize {
        let depth = self.depths.entry(rule).or_insert(0);
        *depth += 1;
        *depth
    }

    /// Returns the current depth of `rule` and decrements it, dropping the
    /// counter when it reaches zero.
    pub fn exit(&mut self, rule: RuleKind) -> usize {
        let Some(depth) = self.depths.get_mut(&rule) else {
            return 0;
        };
        let current = *depth;
        *depth -= 1;
        if *depth == 0 {
            self.depths.remove(&rule);
        }
        current
    }

    pub fn depth(&self, rule: RuleKind) -> usize {
        self.depths.get(&rule).copied().unwrap_or(0)
    }

    pub fn store(&mut self, rule: RuleKind, depth: usize, frame: Frame) {
        trace!(?rule, depth, "push frame");
        self.frames.insert((rule, depth), frame);
    }

    pub fn take(&mut self, rule: RuleKind, depth: usize) -> Result<Frame, SnippetError> {
        trace!(?rule, depth, "pop frame");
        self.frames
            .remove(&(rule, depth))
            .ok_or_else(|| missing(rule, depth))
    }

    pub fn peek(&self, rule: RuleKind, depth: usize) -> Result<&Frame, SnippetError> {
        self.frames.get(&(rule, depth)).ok_or_else(|| missing(rule, depth))
    }

    pub fn peek_mut(&mut self, rule: RuleKind, depth: usize) -> Result<&mut Frame, SnippetError> {
        self.frames
            .get_mut(&(rule, depth))
            .ok_or_else(|| missing(rule, depth))
    }

    /// True when no frame is live and every depth counter is gone.
    pub fn is_balanced(&self) -> bool {
        self.depths.is_empty() && self.frames.is_empty()
    }
}

fn missing(rule: RuleKind, depth: usize) -> SnippetError {
    SnippetError::MissingFrame {
        rule: format!("{rule:?}"),
        depth,
    }
}
