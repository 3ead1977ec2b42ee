//! Image-aware deletion recording.
//!
//! A raw deletion that swallows image placeholders loses the image references
//! the moment it is committed. [`ImageDeletionTracker::capture`] runs right
//! before such a deletion and remembers `offset -> reference` for every image
//! in the doomed range. When the coalesced deletion arrives later,
//! [`split_deletion`] turns it into a batch where each placeholder becomes a
//! reversible `CancelImage` instead of an anonymous char delete.

use ahash::AHashMap;
use core_state::Operation;
use core_text::{Document, PLACEHOLDER};
use tracing::trace;

#[derive(Debug, Default)]
pub struct ImageDeletionTracker {
    captured: AHashMap<usize, String>,
}

impl ImageDeletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the images about to be deleted from `[start,end)`. Every call
    /// discards the previous capture, so placeholders without a span map to
    /// nothing.
    pub fn capture(&mut self, doc: &Document, start: usize, end: usize) {
        self.captured.clear();
        for (at, span) in doc.images_in(start, end) {
            self.captured.insert(at, span.reference.clone());
        }
        trace!(target: "actions.deletion", start, end, images = self.captured.len(), "images_captured");
    }

    /// Reference of the image that sat at absolute offset `pos`.
    pub fn reference_at(&self, pos: usize) -> Option<&str> {
        self.captured.get(&pos).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.captured.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captured.is_empty()
    }

    pub fn clear(&mut self) {
        self.captured.clear();
    }
}

/// Split a deletion of `deleted` (which started at `start`) into plain-text
/// deletes and image cancellations. Sub-operations are stored in reverse
/// document order, so applying the batch deletes right to left and its
/// inverse restores left to right. Returns `None` for an empty deletion.
pub fn split_deletion(
    start: usize,
    deleted: &str,
    tracker: &ImageDeletionTracker,
) -> Option<Operation> {
    let mut ops = Vec::new();
    let mut run = String::new();
    let mut run_start = start;
    for (i, ch) in deleted.chars().enumerate() {
        let at = start + i;
        if ch != PLACEHOLDER {
            if run.is_empty() {
                run_start = at;
            }
            run.push(ch);
            continue;
        }
        if !run.is_empty() {
            ops.push(Operation::delete(run_start, std::mem::take(&mut run)));
        }
        ops.push(match tracker.reference_at(at) {
            Some(reference) => Operation::cancel_image(at, reference),
            None => {
                trace!(target: "actions.deletion", at, "placeholder_without_reference");
                Operation::delete(at, PLACEHOLDER.to_string())
            }
        });
    }
    if !run.is_empty() {
        ops.push(Operation::delete(run_start, run));
    }
    if ops.is_empty() {
        return None;
    }
    ops.reverse();
    Some(Operation::batch(ops))
}
