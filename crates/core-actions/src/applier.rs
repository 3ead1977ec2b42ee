//! Operation application against the live document.
//!
//! Scope:
//! * Executes one `Operation` (recursing into batches in listed order) and
//!   places the caret after the edit.
//! * Never fails. Ranges that went stale (typically a coalesced edit racing a
//!   programmatic one) are skipped with a debug event. An image that fails to
//!   decode is logged and attached unresolved, keeping its reference for
//!   export, so batch siblings and the history stay intact. A batch may
//!   therefore apply partially.
//!
//! Image operations reuse a bare placeholder at `start` (no span attached) and
//! otherwise insert one. `CancelImage` only deletes an actual placeholder.

use crate::image_io::ImageLoader;
use core_state::{Operation, OperationKind};
use core_text::{Document, ImageBounds, ImageSpan, PLACEHOLDER};
use tracing::{debug, trace, warn};

pub struct DocumentApplier<'a> {
    loader: &'a dyn ImageLoader,
    bounds: ImageBounds,
}

impl<'a> DocumentApplier<'a> {
    pub fn new(loader: &'a dyn ImageLoader, bounds: ImageBounds) -> Self {
        Self { loader, bounds }
    }

    pub fn bounds(&self) -> ImageBounds {
        self.bounds
    }

    /// Apply `op` to `doc`; `None` is a no-op.
    pub fn apply(&self, doc: &mut Document, op: Option<&Operation>) {
        let Some(op) = op else {
            return;
        };
        self.apply_one(doc, op);
    }

    fn apply_one(&self, doc: &mut Document, op: &Operation) {
        let (start, end) = (op.start(), op.end());
        trace!(target: "actions.apply", kind = ?op.kind(), start, end, "apply");
        match op.kind() {
            OperationKind::Batch => {
                for sub in op.sub_operations() {
                    self.apply_one(doc, sub);
                }
            }
            OperationKind::Insert => {
                if start > doc.len_chars() {
                    debug!(target: "actions.apply", start, len = doc.len_chars(), "stale_insert_skipped");
                    return;
                }
                doc.insert(start, op.text());
                doc.set_cursor(start + op.text().chars().count());
            }
            OperationKind::Delete => {
                if end > doc.len_chars() {
                    debug!(target: "actions.apply", start, end, len = doc.len_chars(), "stale_delete_skipped");
                    return;
                }
                doc.delete(start, end);
                doc.set_cursor(start);
            }
            OperationKind::Bold | OperationKind::Italic => {
                if let Some(style) = op.kind().style_kind() {
                    let end = end.min(doc.len_chars());
                    doc.styles_mut().apply(style, start, end);
                }
            }
            OperationKind::CancelBold | OperationKind::CancelItalic => {
                if let Some(style) = op.kind().style_kind() {
                    doc.styles_mut().remove(style, start, end);
                }
            }
            OperationKind::Image => self.apply_image(doc, op),
            OperationKind::CancelImage => {
                if end > doc.len_chars() {
                    debug!(target: "actions.apply", start, end, len = doc.len_chars(), "stale_image_cancel_skipped");
                    return;
                }
                if doc.char_at(start) != Some(PLACEHOLDER) {
                    debug!(target: "actions.apply", start, "image_cancel_without_placeholder");
                    return;
                }
                doc.delete(start, end);
                doc.set_cursor(start);
            }
        }
    }

    fn apply_image(&self, doc: &mut Document, op: &Operation) {
        let start = op.start();
        if start > doc.len_chars() {
            debug!(target: "actions.apply", start, len = doc.len_chars(), "stale_image_skipped");
            return;
        }
        // Reuse a bare placeholder left behind by a failed load; never one that
        // already carries another image.
        let bare = doc.char_at(start) == Some(PLACEHOLDER) && doc.image_at(start).is_none();
        if !bare {
            doc.insert(start, &PLACEHOLDER.to_string());
        }
        let span = match self.loader.load_scaled(op.text(), self.bounds) {
            Ok(image) => ImageSpan::resolved(op.text(), image),
            Err(err) => {
                warn!(target: "actions.apply", reference = op.text(), %err, "image_decode_failed");
                ImageSpan::unresolved(op.text())
            }
        };
        doc.attach_image(start, span);
        doc.set_cursor(op.end());
    }
}
