use std::collections::VecDeque;
use tracing::trace;

use crate::Operation;

/// Default number of operations retained on each stack.
pub const HISTORY_CAPACITY: usize = 50;

/// Bounded undo/redo history of forward operations.
///
/// The *original* operation is what travels between the two stacks; undo
/// hands the caller its inverse to apply, redo hands back the original.
#[derive(Debug)]
pub struct UndoRedoStack {
    undo_stack: VecDeque<Operation>,
    redo_stack: VecDeque<Operation>,
    capacity: usize,
}

impl Default for UndoRedoStack {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoRedoStack {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Stack bounded to `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            undo_stack: VecDeque::with_capacity(capacity + 1),
            redo_stack: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Record a new user operation. Clears redo history and evicts the oldest
    /// entry once the bound is exceeded.
    pub fn push(&mut self, op: Operation) {
        self.undo_stack.push_back(op);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.capacity {
            let _ = self.undo_stack.pop_front();
            trace!(target: "state.history", capacity = self.capacity, "undo_stack_trimmed");
        }
        trace!(target: "state.history", undo_depth = self.undo_stack.len(), redo_depth = 0, "push");
    }

    /// Move the newest operation to the redo stack and return its inverse.
    pub fn undo(&mut self) -> Option<Operation> {
        let op = self.undo_stack.pop_back()?;
        let inverse = op.inverse();
        Self::push_bounded(&mut self.redo_stack, op, self.capacity);
        trace!(target: "state.history", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "undo_pop");
        Some(inverse)
    }

    /// Move the newest undone operation back and return it unchanged.
    pub fn redo(&mut self) -> Option<Operation> {
        let op = self.redo_stack.pop_back()?;
        Self::push_bounded(&mut self.undo_stack, op.clone(), self.capacity);
        trace!(target: "state.history", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "redo_pop");
        Some(op)
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        trace!(target: "state.history", "cleared");
    }

    fn push_bounded(stack: &mut VecDeque<Operation>, op: Operation, capacity: usize) {
        stack.push_back(op);
        if stack.len() > capacity {
            let _ = stack.pop_front();
        }
    }
}
