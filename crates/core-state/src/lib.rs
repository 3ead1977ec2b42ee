//! Edit history: reversible operations and the bounded undo/redo stacks.
//!
//! Ownership model:
//! - Operations are produced by the change coalescer (diff-derived edits), by
//!   the controller (style toggles, image inserts, replaces) and by
//!   `UndoRedoStack::undo` (synthetic inverses). They are values; nothing
//!   mutates an operation after construction.
//! - The stacks are owned by the single document-owning thread. No locking:
//!   background work only ever computes operations, it never pushes them.
//!
//! Stack transitions:
//! - `push`   : undo += op, redo cleared, oldest undo entry evicted past capacity.
//! - `undo`   : undo -> redo (original op travels), caller applies `op.inverse()`.
//! - `redo`   : redo -> undo (original op travels), caller re-applies `op`.
//! - `clear`  : both emptied (fresh document load).
//!
//! Telemetry: stack transitions emit `trace` events under target `state.history`.

pub mod operation;
pub mod undo;

pub use operation::{Operation, OperationKind};
pub use undo::{HISTORY_CAPACITY, UndoRedoStack};
