use crate::guard::EditGuard;
use core_actions::{
    DocumentApplier, FsImageLoader, FsImageStore, ImageDeletionTracker, ImageLoader, ImageStore,
    PassthroughImageStore, split_deletion,
};
use core_config::{Config, ConfigContext};
use core_events::{ChangeCoalescer, TextDiff};
use core_html::HtmlError;
use core_state::{Operation, UndoRedoStack};
use core_text::{Document, ImageBounds, PLACEHOLDER, StyleKind, Viewport};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, trace, warn};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("cannot load document")]
    Html(#[from] HtmlError),
}

/// Image copied into storage (or the original reference when the copy failed),
/// waiting to be inserted on the owner thread.
#[derive(Debug)]
struct PersistedImage {
    reference: String,
}

type ContentChanged = Box<dyn FnMut(&str)>;
type WidthPolicy = Box<dyn Fn(Viewport) -> u32>;

/// Owner of the live document and its edit history.
///
/// All methods run on the owner thread. Background work (debounced diffing,
/// image copies) runs on the tokio runtime passed at construction and is
/// folded back in by [`poll`](Self::poll) or [`settle`](Self::settle).
pub struct EditorController {
    doc: Document,
    history: UndoRedoStack,
    coalescer: ChangeCoalescer,
    tracker: ImageDeletionTracker,
    guard: EditGuard,
    loader: Arc<dyn ImageLoader>,
    store: Arc<dyn ImageStore>,
    config: Config,
    width_policy: WidthPolicy,
    on_content_changed: Option<ContentChanged>,
    runtime: Handle,
    image_tx: UnboundedSender<PersistedImage>,
    image_rx: UnboundedReceiver<PersistedImage>,
    images_in_flight: usize,
}

impl fmt::Debug for EditorController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorController")
            .field("chars", &self.doc.len_chars())
            .field("undo_depth", &self.history.undo_depth())
            .field("redo_depth", &self.history.redo_depth())
            .field("phase", &self.guard.phase())
            .field("coalescer", &self.coalescer)
            .field("images_in_flight", &self.images_in_flight)
            .finish()
    }
}

impl EditorController {
    pub fn new(
        config: Config,
        loader: Arc<dyn ImageLoader>,
        store: Arc<dyn ImageStore>,
        runtime: Handle,
    ) -> Self {
        let guard = EditGuard::new();
        let mut coalescer = ChangeCoalescer::new(String::new(), config.debounce(), runtime.clone());
        let observer = guard.clone();
        coalescer.set_ignore_predicate(move || observer.is_programmatic());
        let (image_tx, image_rx) = mpsc::unbounded_channel();
        Self {
            doc: Document::new(),
            history: UndoRedoStack::with_capacity(config.history_capacity()),
            coalescer,
            tracker: ImageDeletionTracker::new(),
            guard,
            loader,
            store,
            config,
            width_policy: Box::new(|viewport| viewport.width),
            on_content_changed: None,
            runtime,
            image_tx,
            image_rx,
            images_in_flight: 0,
        }
    }

    /// Controller with filesystem image IO. Inserted images are copied into
    /// the configured storage directory when one is set.
    pub fn from_config(config: Config, runtime: Handle) -> Self {
        let store: Arc<dyn ImageStore> = match config.storage_dir() {
            Some(dir) => Arc::new(FsImageStore::new(dir.clone())),
            None => Arc::new(PassthroughImageStore),
        };
        Self::new(config, Arc::new(FsImageLoader), store, runtime)
    }

    // ---------------------------------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------------------------------

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn text(&self) -> String {
        self.doc.text()
    }

    pub fn history(&self) -> &UndoRedoStack {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn guard(&self) -> &EditGuard {
        &self.guard
    }

    pub fn viewport(&self) -> Viewport {
        self.config.effective_viewport
    }

    /// Bounds images are scaled into: the width policy applied to the
    /// viewport, and half the viewport height.
    pub fn image_bounds(&self) -> ImageBounds {
        let viewport = self.config.effective_viewport;
        ImageBounds::for_viewport(viewport, (self.width_policy)(viewport))
    }

    // ---------------------------------------------------------------------------------------------
    // Embedder wiring
    // ---------------------------------------------------------------------------------------------

    pub fn set_on_content_changed(&mut self, callback: impl FnMut(&str) + 'static) {
        self.on_content_changed = Some(Box::new(callback));
    }

    pub fn set_image_width_policy(&mut self, policy: impl Fn(Viewport) -> u32 + 'static) {
        self.width_policy = Box::new(policy);
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if let Some(viewport) = self
            .config
            .recompute_with_context(ConfigContext::with_viewport(width, height))
        {
            debug!(target: "model.controller", width = viewport.width, height = viewport.height, "viewport_changed");
        }
    }

    // ---------------------------------------------------------------------------------------------
    // User edits (raw buffer mutations observed by the coalescer)
    // ---------------------------------------------------------------------------------------------

    pub fn set_selection(&mut self, start: usize, end: usize) {
        self.doc.set_selection(start, end);
    }

    /// Type `text` at `pos` as the user would.
    pub fn type_text(&mut self, pos: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        let at = self.doc.insert(pos, text);
        self.doc.set_cursor(at + text.chars().count());
        self.coalescer.on_raw_change(at, &self.doc.text());
    }

    /// Delete `[start,end)` as the user would. Deletions that swallow placeholders
    /// are recorded immediately so the captured offsets match the deletion.
    pub fn delete_range(&mut self, start: usize, end: usize) {
        let len = self.doc.len_chars();
        let (start, end) = (start.min(len), end.min(len));
        if start >= end {
            return;
        }
        let has_placeholders = self.doc.slice(start, end).contains(PLACEHOLDER);
        if has_placeholders {
            self.flush_pending();
            self.tracker.capture(&self.doc, start, end);
        }
        self.doc.delete(start, end);
        self.doc.set_cursor(start);
        self.coalescer.on_raw_change(start, &self.doc.text());
        if has_placeholders {
            self.flush_pending();
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Programmatic edits
    // ---------------------------------------------------------------------------------------------

    pub fn toggle_bold(&mut self) {
        self.toggle_style(StyleKind::Bold);
    }

    pub fn toggle_italic(&mut self) {
        self.toggle_style(StyleKind::Italic);
    }

    fn toggle_style(&mut self, kind: StyleKind) {
        let Some(sel) = self.doc.selection() else {
            return;
        };
        if sel.is_empty() || sel.end > self.doc.len_chars() {
            return;
        }
        let op = if self.doc.styles().is_fully_styled(sel.start, sel.end, kind) {
            Operation::cancel_style(kind, sel.start, sel.end)
        } else {
            Operation::apply_style(kind, sel.start, sel.end)
        };
        debug!(target: "model.controller", kind = ?op.kind(), start = sel.start, end = sel.end, "toggle_style");
        self.guarded(|this| {
            this.history.push(op.clone());
            this.apply(&op);
        });
        self.notify_content_changed();
    }

    pub fn undo(&mut self) -> bool {
        let applied = self.guarded(|this| {
            let op = this.history.undo();
            this.apply_opt(op.as_ref());
            op.is_some()
        });
        if applied {
            self.notify_content_changed();
        }
        applied
    }

    pub fn redo(&mut self) -> bool {
        let applied = self.guarded(|this| {
            let op = this.history.redo();
            this.apply_opt(op.as_ref());
            op.is_some()
        });
        if applied {
            self.notify_content_changed();
        }
        applied
    }

    /// Replace `[start,end)` with `new_text` as one undoable step. Rejects
    /// invalid bounds without touching the document or the history.
    pub fn perform_replace(&mut self, start: usize, end: usize, new_text: &str) -> bool {
        if start > end || end > self.doc.len_chars() {
            debug!(target: "model.controller", start, end, len = self.doc.len_chars(), "replace_rejected");
            return false;
        }
        self.guarded(|this| {
            let old = this.doc.slice(start, end);
            let removal = if old.contains(PLACEHOLDER) {
                this.tracker.capture(&this.doc, start, end);
                split_deletion(start, &old, &this.tracker)
            } else {
                Some(Operation::delete(start, old))
            };
            let mut parts: Vec<Operation> = removal.into_iter().collect();
            parts.push(Operation::insert(start, new_text));
            this.history.push(Operation::batch(parts));
            this.doc.replace(start, end, new_text);
            this.doc.set_cursor(start + new_text.chars().count());
        });
        debug!(target: "model.controller", start, end, inserted = new_text.chars().count(), "replace_committed");
        self.notify_content_changed();
        true
    }

    /// Copy `reference` into durable storage off the owner thread, then insert
    /// it at the selection start (document end without a selection) once the
    /// copy finishes. A failed copy inserts the original reference.
    pub fn insert_image(&mut self, reference: impl Into<String>) {
        let reference = reference.into();
        let store = Arc::clone(&self.store);
        let tx = self.image_tx.clone();
        self.images_in_flight += 1;
        trace!(target: "model.controller", reference = %reference, "image_persist_started");
        self.runtime.spawn_blocking(move || {
            let reference = match store.persist(&reference) {
                Ok(stored) => stored,
                Err(err) => {
                    warn!(target: "model.controller", reference = %reference, %err, "image_persist_failed");
                    reference
                }
            };
            let _ = tx.send(PersistedImage { reference });
        });
    }

    fn commit_image(&mut self, image: PersistedImage) {
        let at = self
            .doc
            .selection()
            .map_or(self.doc.len_chars(), |sel| sel.start);
        let op = Operation::image(at, image.reference);
        debug!(target: "model.controller", at, reference = op.text(), "image_inserted");
        self.guarded(|this| {
            this.history.push(op.clone());
            this.apply(&op);
        });
        self.notify_content_changed();
    }

    // ---------------------------------------------------------------------------------------------
    // Markup
    // ---------------------------------------------------------------------------------------------

    pub fn export_html(&self) -> String {
        core_html::encode(&self.doc)
    }

    /// Replace the whole document with decoded `html`. History is cleared and
    /// no content-changed notification fires. A structural error leaves the
    /// current document untouched.
    pub fn load_html(&mut self, html: &str) -> Result<(), ControllerError> {
        let decoded = core_html::decode(html, self.loader.as_ref(), self.image_bounds())?;
        self.guarded(|this| {
            this.doc.replace_with(decoded);
            this.doc.set_cursor(this.doc.len_chars());
            this.history.clear();
            this.tracker.clear();
        });
        info!(
            target: "model.controller",
            chars = self.doc.len_chars(),
            images = self.doc.images().len(),
            "document_loaded"
        );
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------
    // Background work
    // ---------------------------------------------------------------------------------------------

    /// Fold finished background work into the document without waiting.
    /// Returns how many results were handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Some(diff) = self.coalescer.try_next() {
            self.record(diff);
            handled += 1;
        }
        while let Ok(image) = self.image_rx.try_recv() {
            self.images_in_flight = self.images_in_flight.saturating_sub(1);
            self.commit_image(image);
            handled += 1;
        }
        handled
    }

    /// Wait for every armed debounce window and in-flight image copy, folding
    /// each result in as it arrives.
    pub async fn settle(&mut self) {
        loop {
            if self.coalescer.has_pending() {
                if let Some(diff) = self.coalescer.next().await {
                    self.record(diff);
                }
                continue;
            }
            if self.images_in_flight > 0 {
                let Some(image) = self.image_rx.recv().await else {
                    break;
                };
                self.images_in_flight -= 1;
                self.commit_image(image);
                continue;
            }
            break;
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------------------------------

    /// Run `f` in the programmatic phase. A pending user edit is recorded
    /// first; text changes made by `f` resync the coalescer without being
    /// recorded.
    fn guarded<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.flush_pending();
        let _scope = self.guard.enter();
        let revision = self.doc.revision();
        let out = f(self);
        if self.doc.revision() != revision {
            self.coalescer.on_raw_change(0, &self.doc.text());
        }
        out
    }

    fn flush_pending(&mut self) {
        if self.coalescer.min_modified_start().is_none() {
            return;
        }
        if let Some(diff) = self.coalescer.flush(&self.doc.text()) {
            self.record(diff);
        }
    }

    fn apply(&mut self, op: &Operation) {
        self.apply_opt(Some(op));
    }

    fn apply_opt(&mut self, op: Option<&Operation>) {
        let bounds = self.image_bounds();
        DocumentApplier::new(self.loader.as_ref(), bounds).apply(&mut self.doc, op);
    }

    /// Turn a coalesced user edit (already present in the document) into
    /// history.
    fn record(&mut self, diff: TextDiff) {
        let op = match diff {
            TextDiff::Insert { position, content } => Some(Operation::insert(position, content)),
            TextDiff::Delete { position, content } => self.removal(position, &content),
            TextDiff::Replace {
                position,
                removed,
                inserted,
            } => {
                let mut parts: Vec<Operation> = self.removal(position, &removed).into_iter().collect();
                parts.push(Operation::insert(position, inserted));
                Some(Operation::batch(parts))
            }
        };
        let Some(op) = op else {
            return;
        };
        debug!(target: "model.controller", kind = ?op.kind(), start = op.start(), end = op.end(), "user_edit_recorded");
        self.history.push(op);
        self.notify_content_changed();
    }

    fn removal(&self, position: usize, removed: &str) -> Option<Operation> {
        if removed.contains(PLACEHOLDER) {
            split_deletion(position, removed, &self.tracker)
        } else if removed.is_empty() {
            None
        } else {
            Some(Operation::delete(position, removed))
        }
    }

    fn notify_content_changed(&mut self) {
        let Some(callback) = self.on_content_changed.as_mut() else {
            return;
        };
        let html = core_html::encode(&self.doc);
        callback(&html);
    }
}
