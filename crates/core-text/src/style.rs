//! Typed style interval index (bold / italic).
//!
//! Intervals are half-open `[start,end)` char ranges tagged with a
//! [`StyleKind`]. Several disjoint intervals of one kind may coexist; `apply`
//! merges overlapping or touching intervals of the same kind so the index
//! never holds redundant coverage. `remove` punches a hole: every interval of
//! the kind overlapping the target range is removed and the parts lying outside
//! the range are re-added, leaving styling outside the range untouched.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StyleKind {
    Bold,
    Italic,
}

impl StyleKind {
    pub const ALL: [StyleKind; 2] = [StyleKind::Bold, StyleKind::Italic];

    pub fn mask(self) -> StyleMask {
        match self {
            StyleKind::Bold => StyleMask::BOLD,
            StyleKind::Italic => StyleMask::ITALIC,
        }
    }
}

bitflags::bitflags! {
    /// Set of styles active at a single char position.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct StyleMask: u8 {
        const BOLD   = 0b0000_0001;
        const ITALIC = 0b0000_0010;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleInterval {
    pub kind: StyleKind,
    pub start: usize,
    pub end: usize,
}

impl StyleInterval {
    pub fn new(kind: StyleKind, start: usize, end: usize) -> Self {
        Self { kind, start, end }
    }

    fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

#[derive(Debug, Clone, Default)]
pub struct StyleSpanIndex {
    intervals: Vec<StyleInterval>,
}

impl StyleSpanIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// All intervals, unordered.
    pub fn intervals(&self) -> &[StyleInterval] {
        &self.intervals
    }

    /// Intervals of one kind sorted by start offset.
    pub fn intervals_of(&self, kind: StyleKind) -> Vec<StyleInterval> {
        let mut out: Vec<StyleInterval> = self
            .intervals
            .iter()
            .filter(|iv| iv.kind == kind)
            .copied()
            .collect();
        out.sort_by_key(|iv| (iv.start, iv.end));
        out
    }

    /// True when `[start,end)` is covered end to end by intervals of `kind`
    /// chaining without gaps. Empty ranges are never considered styled.
    pub fn is_fully_styled(&self, start: usize, end: usize, kind: StyleKind) -> bool {
        if start >= end {
            return false;
        }
        let mut covered = start;
        for iv in self
            .intervals_of(kind)
            .into_iter()
            .filter(|iv| iv.overlaps(start, end))
        {
            if iv.start > covered {
                return false;
            }
            covered = covered.max(iv.end);
            if covered >= end {
                return true;
            }
        }
        covered >= end
    }

    /// Style `[start,end)` with `kind`, merging with overlapping or adjacent
    /// intervals of the same kind.
    pub fn apply(&mut self, kind: StyleKind, start: usize, end: usize) {
        if start >= end {
            return;
        }
        self.intervals.push(StyleInterval::new(kind, start, end));
        self.normalize(kind);
    }

    /// Remove `kind` from `[start,end)` only, keeping the left and right
    /// remainders of every interval that straddles a boundary.
    pub fn remove(&mut self, kind: StyleKind, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let mut remainders = Vec::new();
        self.intervals.retain(|iv| {
            if iv.kind != kind || !iv.overlaps(start, end) {
                return true;
            }
            if iv.start < start {
                remainders.push(StyleInterval::new(kind, iv.start, start));
            }
            if iv.end > end {
                remainders.push(StyleInterval::new(kind, end, iv.end));
            }
            false
        });
        self.intervals.extend(remainders);
    }

    /// Styles active at `pos`.
    pub fn mask_at(&self, pos: usize) -> StyleMask {
        self.intervals
            .iter()
            .filter(|iv| iv.start <= pos && pos < iv.end)
            .fold(StyleMask::empty(), |acc, iv| acc | iv.kind.mask())
    }

    pub fn clear(&mut self) {
        self.intervals.clear();
    }

    pub(crate) fn shift_for_insert(&mut self, pos: usize, added: usize) {
        for iv in &mut self.intervals {
            if iv.start >= pos {
                iv.start += added;
                iv.end += added;
            } else if iv.end > pos {
                iv.end += added;
            }
        }
    }

    pub(crate) fn shift_for_delete(&mut self, start: usize, end: usize) {
        let removed = end - start;
        let map = |x: usize| {
            if x <= start {
                x
            } else if x <= end {
                start
            } else {
                x - removed
            }
        };
        for iv in &mut self.intervals {
            iv.start = map(iv.start);
            iv.end = map(iv.end);
        }
        self.intervals.retain(|iv| iv.start < iv.end);
    }

    fn normalize(&mut self, kind: StyleKind) {
        let sorted = self.intervals_of(kind);
        self.intervals.retain(|iv| iv.kind != kind);
        let mut merged: Vec<StyleInterval> = Vec::with_capacity(sorted.len());
        for iv in sorted {
            match merged.last_mut() {
                Some(last) if iv.start <= last.end => last.end = last.end.max(iv.end),
                _ => merged.push(iv),
            }
        }
        self.intervals.extend(merged);
    }
}
