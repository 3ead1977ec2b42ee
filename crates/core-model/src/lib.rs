//! Editor controller: the public surface of the rich-text core.
//!
//! [`EditorController`] owns the live [`Document`](core_text::Document), the
//! undo/redo history and the change coalescer, and is the only thing that
//! mutates them. Embedders drive it from a single owner thread.
//!
//! Two kinds of mutation reach the document:
//! * User edits (`type_text`, `delete_range`) mutate the buffer directly and
//!   are reported to the coalescer as raw changes. Once the debounce window
//!   closes (or a programmatic edit forces a flush) the coalesced diff is
//!   recorded as an operation. It is never re-applied: the buffer already
//!   holds it.
//! * Programmatic edits (toggles, undo, redo, replace, image insert, load)
//!   run inside the [`EditGuard`] phase. They push and apply their own
//!   operations, and the raw changes they cause only resync the coalescer.
//!
//! Invariants (hold after every public call):
//! * The guard is `Idle`.
//! * The coalescer's stable snapshot plus any pending user edit equals the
//!   document text.
//! * Every recorded operation's inverse, applied to the current document,
//!   yields the state before that operation.
//!
//! Background work (debounce timers, diffing, image copies) runs on the tokio
//! runtime handle passed at construction. Results are only folded into the
//! document by [`EditorController::poll`] or [`EditorController::settle`], on
//! the owner thread.
//!
//! Telemetry target: `model.controller`.

mod controller;
mod guard;
pub mod logging;

pub use controller::{ControllerError, EditorController};
pub use guard::{EditGuard, EditPhase, GuardScope};
