//! Debounced diff coalescer.
//!
//! State held on the owner thread:
//! * `last_stable`: text as of the last emitted (or suppressed) change.
//! * `min_modified_start`: earliest offset touched since then; `usize::MAX`
//!   stands for "nothing touched" and doubles as the diff hint.
//!
//! Single flight: every raw change aborts the pending debounce task and drains
//! any result it already queued, then arms a new one. At most one task is in
//! flight per coalescer, so results arrive in raw-mutation order and the
//! consumer never sees two competing results.
//!
//! Suppression: while the ignore predicate returns true (programmatic edits),
//! raw changes cancel the pending task and resync `last_stable` to the current
//! text without emitting, so the next user edit is diffed against the
//! post-edit snapshot.

use crate::{CANCELLED_WINDOWS, COALESCED_EDITS, SUPPRESSED_CHANGES};
use core_text::{TextDiff, diff_text};
use std::fmt;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

const UNTOUCHED: usize = usize::MAX;

#[derive(Debug)]
enum DebounceOutcome {
    /// Edits cancelled out; current text equals the stable snapshot.
    Unchanged,
    Diffed {
        text: String,
        diff: Option<TextDiff>,
    },
    Failed,
}

pub struct ChangeCoalescer {
    last_stable: String,
    min_modified_start: usize,
    debounce: Duration,
    runtime: Handle,
    pending: Option<JoinHandle<()>>,
    tx: UnboundedSender<DebounceOutcome>,
    rx: UnboundedReceiver<DebounceOutcome>,
    ignore: Box<dyn Fn() -> bool>,
}

impl fmt::Debug for ChangeCoalescer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeCoalescer")
            .field("stable_len", &self.last_stable.len())
            .field("min_modified_start", &self.min_modified_start())
            .field("debounce", &self.debounce)
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

impl ChangeCoalescer {
    /// Coalescer whose first stable snapshot is `initial_text`. Debounce tasks
    /// are spawned on `runtime`.
    pub fn new(initial_text: impl Into<String>, debounce: Duration, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            last_stable: initial_text.into(),
            min_modified_start: UNTOUCHED,
            debounce,
            runtime,
            pending: None,
            tx,
            rx,
            ignore: Box::new(|| false),
        }
    }

    /// Predicate consulted on every raw change; `true` suppresses recording.
    pub fn set_ignore_predicate(&mut self, predicate: impl Fn() -> bool + 'static) {
        self.ignore = Box::new(predicate);
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn last_stable_text(&self) -> &str {
        &self.last_stable
    }

    /// Earliest dirty offset since the last stable snapshot, if any.
    pub fn min_modified_start(&self) -> Option<usize> {
        (self.min_modified_start != UNTOUCHED).then_some(self.min_modified_start)
    }

    /// True while a debounce window is armed or its result is unconsumed.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Observe one raw mutation that started at `change_start` and left the
    /// buffer holding `current_text`.
    pub fn on_raw_change(&mut self, change_start: usize, current_text: &str) {
        if (self.ignore)() {
            self.cancel_pending();
            self.last_stable.clear();
            self.last_stable.push_str(current_text);
            self.min_modified_start = UNTOUCHED;
            SUPPRESSED_CHANGES.fetch_add(1, Ordering::Relaxed);
            trace!(target: "events.coalescer", change_start, "raw_change_suppressed");
            return;
        }
        self.min_modified_start = self.min_modified_start.min(change_start);
        self.cancel_pending();
        self.arm(current_text.to_string());
        trace!(target: "events.coalescer", change_start, hint = self.min_modified_start, "debounce_armed");
    }

    /// Consume a finished debounce result without waiting.
    pub fn try_next(&mut self) -> Option<TextDiff> {
        while let Ok(outcome) = self.rx.try_recv() {
            self.pending = None;
            if let Some(diff) = self.settle(outcome) {
                return Some(diff);
            }
        }
        None
    }

    /// Wait for the armed debounce window to fire and return its edit.
    /// Returns `None` immediately when nothing is armed.
    pub async fn next(&mut self) -> Option<TextDiff> {
        loop {
            if self.pending.is_none() {
                return self.try_next();
            }
            let outcome = self.rx.recv().await?;
            self.pending = None;
            if let Some(diff) = self.settle(outcome) {
                return Some(diff);
            }
        }
    }

    /// Cancel the armed window and diff synchronously on the calling thread.
    pub fn flush(&mut self, current_text: &str) -> Option<TextDiff> {
        self.cancel_pending();
        if self.min_modified_start == UNTOUCHED && current_text == self.last_stable {
            return None;
        }
        let hint = self.min_modified_start;
        let diff = diff_text(&self.last_stable, current_text, hint);
        self.settle(DebounceOutcome::Diffed {
            text: current_text.to_string(),
            diff,
        })
    }

    fn arm(&mut self, current: String) {
        let stable = self.last_stable.clone();
        let hint = self.min_modified_start;
        let delay = self.debounce;
        let tx = self.tx.clone();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if current == stable {
                let _ = tx.send(DebounceOutcome::Unchanged);
                return;
            }
            let outcome = match tokio::task::spawn_blocking(move || {
                let diff = diff_text(&stable, &current, hint);
                (current, diff)
            })
            .await
            {
                Ok((text, diff)) => DebounceOutcome::Diffed { text, diff },
                Err(err) => {
                    warn!(target: "events.coalescer", ?err, "diff_task_failed");
                    DebounceOutcome::Failed
                }
            };
            let _ = tx.send(outcome);
        });
        self.pending = Some(task);
    }

    fn cancel_pending(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
            CANCELLED_WINDOWS.fetch_add(1, Ordering::Relaxed);
        }
        while self.rx.try_recv().is_ok() {}
    }

    fn settle(&mut self, outcome: DebounceOutcome) -> Option<TextDiff> {
        match outcome {
            DebounceOutcome::Unchanged => {
                self.min_modified_start = UNTOUCHED;
                trace!(target: "events.coalescer", "debounce_fired_unchanged");
                None
            }
            DebounceOutcome::Diffed { text, diff } => {
                self.last_stable = text;
                self.min_modified_start = UNTOUCHED;
                if let Some(d) = &diff {
                    COALESCED_EDITS.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        target: "events.coalescer",
                        position = d.position(),
                        is_insert = d.is_insert(),
                        len = d.content().chars().count(),
                        "coalesced_edit"
                    );
                }
                diff
            }
            DebounceOutcome::Failed => None,
        }
    }
}

impl Drop for ChangeCoalescer {
    fn drop(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}
