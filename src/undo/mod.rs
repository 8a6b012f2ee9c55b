use crate::models::Slide;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A whole-document state captured for undo/redo (deep copy)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub title: String,
    pub slides: Vec<Slide>,
}

impl Snapshot {
    pub fn new(title: &str, slides: &[Slide]) -> Self {
        Self {
            title: title.to_string(),
            slides: slides.to_vec(),
        }
    }
}

/// Bounded undo and redo stacks of whole-document snapshots
///
/// The history never inspects or diffs snapshots. Callers decide when to
/// record: discrete actions push right before they mutate, continuous typing
/// pushes from a debounce timer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct History {
    undo_stack: VecDeque<Snapshot>,
    redo_stack: VecDeque<Snapshot>,
    /// Maximum number of entries kept on each stack
    max_size: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(50)
    }
}

impl PartialEq for History {
    fn eq(&self, other: &Self) -> bool {
        self.undo_stack == other.undo_stack
            && self.redo_stack == other.redo_stack
            && self.max_size == other.max_size
    }
}

impl History {
    /// Create a history with the given capacity per stack
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_size: max_size.max(1),
        }
    }

    /// Record `snapshot` as the newest undo entry and drop all redo history
    pub fn push(&mut self, snapshot: Snapshot) {
        push_bounded(&mut self.undo_stack, snapshot, self.max_size);
        self.redo_stack.clear();
    }

    /// Step back: `current` moves to the redo stack and the newest undo entry
    /// is returned for the caller to install. `None` (and no stack change)
    /// when there is nothing to undo.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.undo_stack.pop_back()?;
        push_bounded(&mut self.redo_stack, current, self.max_size);
        Some(previous)
    }

    /// Step forward, symmetric to [`History::undo`]
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo_stack.pop_back()?;
        push_bounded(&mut self.undo_stack, current, self.max_size);
        Some(next)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Get the number of available undo steps
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get the number of available redo steps
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

/// Push onto the top of `stack`, evicting the oldest entry past `max_size`
fn push_bounded(stack: &mut VecDeque<Snapshot>, snapshot: Snapshot, max_size: usize) {
    stack.push_back(snapshot);
    while stack.len() > max_size {
        stack.pop_front();
    }
}
