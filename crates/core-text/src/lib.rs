//! Rope-backed styled document.
//!
//! The `Document` is the single backing store of the live editing surface: a
//! `ropey::Rope` of characters plus two side indexes that move with the text:
//!
//! * a [`StyleSpanIndex`] of bold/italic intervals, and
//! * a map of image placeholder offsets to the [`ImageSpan`] rendered there.
//!
//! All offsets in this crate are *char* offsets (Unicode scalar values), never
//! byte offsets. Embedders that speak UTF-16 must convert at the boundary.
//!
//! Interval bookkeeping on text mutation:
//! * Insertion at `pos` shifts every interval/placeholder at or after `pos`.
//!   An interval strictly containing `pos` grows; an interval that merely
//!   touches `pos` (starts or ends exactly there) does not absorb the new text.
//! * Deletion of `[start,end)` collapses offsets inside the range onto `start`
//!   and shifts the tail left. Intervals that collapse to nothing are dropped,
//!   and so are image spans whose placeholder was deleted.
//!
//! Every text mutation bumps `revision`, which lets owners detect whether a
//! batch of programmatic edits actually touched the characters (style-only
//! edits leave it unchanged).

use ropey::Rope;
use std::collections::BTreeMap;
use tracing::trace;

pub mod diff;
pub mod image;
pub mod style;

pub use diff::{TextDiff, diff_text};
pub use image::{ImageBounds, ImageSpan, PLACEHOLDER, ScaledImage, Viewport};
pub use style::{StyleInterval, StyleKind, StyleMask, StyleSpanIndex};

/// Half-open selection `[start,end)` in char offsets. `start == end` is a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    /// Construct a selection normalizing ordering so that `start <= end`.
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn caret(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    rope: Rope,
    styles: StyleSpanIndex,
    images: BTreeMap<usize, ImageSpan>,
    selection: Option<Selection>,
    revision: u64,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct an unstyled document from plain text.
    pub fn from_text(content: &str) -> Self {
        Self {
            rope: Rope::from_str(content),
            ..Self::default()
        }
    }

    /// Total number of chars in the document.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Monotonic counter bumped by every text mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Full plain-text content (placeholders included).
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Text in `[start,end)`, clamped to the document.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let len = self.len_chars();
        let s = start.min(len);
        let e = end.min(len);
        if s >= e {
            return String::new();
        }
        self.rope.slice(s..e).to_string()
    }

    pub fn char_at(&self, idx: usize) -> Option<char> {
        self.rope.get_char(idx)
    }

    /// Insert `text` at `pos` (clamped to the document end). Returns the offset
    /// the text was actually inserted at.
    pub fn insert(&mut self, pos: usize, text: &str) -> usize {
        let pos = pos.min(self.len_chars());
        let added = text.chars().count();
        if added == 0 {
            return pos;
        }
        self.rope.insert(pos, text);
        self.styles.shift_for_insert(pos, added);
        let tail = self.images.split_off(&pos);
        self.images
            .extend(tail.into_iter().map(|(at, span)| (at + added, span)));
        self.revision += 1;
        trace!(target: "text.document", pos, added, revision = self.revision, "insert");
        pos
    }

    /// Delete `[start,end)` (clamped). Returns the removed text.
    pub fn delete(&mut self, start: usize, end: usize) -> String {
        let len = self.len_chars();
        let s = start.min(len);
        let e = end.min(len);
        if s >= e {
            return String::new();
        }
        let removed = self.rope.slice(s..e).to_string();
        self.rope.remove(s..e);
        self.styles.shift_for_delete(s, e);
        let removed_len = e - s;
        let tail = self.images.split_off(&s);
        self.images.extend(
            tail.into_iter()
                .filter(|(at, _)| *at >= e)
                .map(|(at, span)| (at - removed_len, span)),
        );
        self.revision += 1;
        trace!(target: "text.document", start = s, end = e, revision = self.revision, "delete");
        removed
    }

    /// Replace `[start,end)` with `text`, returning the removed text.
    pub fn replace(&mut self, start: usize, end: usize, text: &str) -> String {
        let removed = self.delete(start, end);
        self.insert(start, text);
        removed
    }

    /// Swap the whole content (text, styles, images) for `other`'s. The
    /// selection is cleared; the revision keeps increasing monotonically.
    pub fn replace_with(&mut self, other: Document) {
        self.rope = other.rope;
        self.styles = other.styles;
        self.images = other.images;
        self.selection = None;
        self.revision += 1;
    }

    pub fn styles(&self) -> &StyleSpanIndex {
        &self.styles
    }

    pub fn styles_mut(&mut self) -> &mut StyleSpanIndex {
        &mut self.styles
    }

    /// Every attached image keyed by placeholder offset, in document order.
    pub fn images(&self) -> &BTreeMap<usize, ImageSpan> {
        &self.images
    }

    pub fn image_at(&self, pos: usize) -> Option<&ImageSpan> {
        self.images.get(&pos)
    }

    /// Attached images whose placeholder lies in `[start,end)`.
    pub fn images_in(&self, start: usize, end: usize) -> impl Iterator<Item = (usize, &ImageSpan)> {
        let end = end.max(start);
        self.images.range(start..end).map(|(at, span)| (*at, span))
    }

    /// Attach `span` to the placeholder at `pos`. Returns false (and attaches
    /// nothing) when the char at `pos` is not a placeholder.
    pub fn attach_image(&mut self, pos: usize, span: ImageSpan) -> bool {
        if self.char_at(pos) != Some(PLACEHOLDER) {
            return false;
        }
        self.images.insert(pos, span);
        true
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Set the selection, clamping both ends to the document.
    pub fn set_selection(&mut self, start: usize, end: usize) {
        let len = self.len_chars();
        self.selection = Some(Selection::new(start.min(len), end.min(len)));
    }

    pub fn set_cursor(&mut self, pos: usize) {
        let pos = pos.min(self.len_chars());
        self.selection = Some(Selection::caret(pos));
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }
}
