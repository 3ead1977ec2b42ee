//! Programmatic-edit guard.
//!
//! `Idle -> ProgrammaticEdit -> Idle`. The controller enters the guarded
//! phase around every mutation it performs itself (undo, redo, toggles,
//! replace, image insert, load). The change coalescer's ignore predicate reads
//! the same cell, so raw changes observed in that window resync its snapshot
//! instead of being recorded a second time.

use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditPhase {
    #[default]
    Idle,
    ProgrammaticEdit,
}

/// Shared handle to the controller's edit phase. Clones observe the same cell.
#[derive(Debug, Clone, Default)]
pub struct EditGuard {
    phase: Rc<Cell<EditPhase>>,
}

impl EditGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> EditPhase {
        self.phase.get()
    }

    pub fn is_programmatic(&self) -> bool {
        self.phase.get() == EditPhase::ProgrammaticEdit
    }

    /// Enter the guarded phase until the returned scope drops. Nested scopes
    /// keep the phase until the outermost one ends.
    pub fn enter(&self) -> GuardScope {
        let previous = self.phase.replace(EditPhase::ProgrammaticEdit);
        GuardScope {
            phase: Rc::clone(&self.phase),
            previous,
        }
    }
}

#[must_use = "the guarded phase ends when the scope is dropped"]
pub struct GuardScope {
    phase: Rc<Cell<EditPhase>>,
    previous: EditPhase,
}

impl Drop for GuardScope {
    fn drop(&mut self) {
        self.phase.set(self.previous);
    }
}
