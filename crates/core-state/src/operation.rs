//! Reversible edit operations.
//!
//! An [`Operation`] is an immutable description of one edit against the
//! document as it was when the operation was defined: a half-open char range,
//! a kind, and the text payload (inserted/deleted text, or the image reference
//! for image kinds). A `Batch` wraps an ordered list of sub-operations that
//! are applied first to last.
//!
//! Inversion never mutates; it builds a new value:
//! * Insert <-> Delete, Bold <-> CancelBold, Italic <-> CancelItalic,
//!   Image <-> CancelImage, keeping range and text.
//! * A batch inverts every sub-operation and reverses their order, so the
//!   last effect applied is the first one undone.

use core_text::StyleKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Insert,
    Delete,
    Bold,
    CancelBold,
    Italic,
    CancelItalic,
    Image,
    CancelImage,
    Batch,
}

impl OperationKind {
    pub fn inverse(self) -> Self {
        match self {
            OperationKind::Insert => OperationKind::Delete,
            OperationKind::Delete => OperationKind::Insert,
            OperationKind::Bold => OperationKind::CancelBold,
            OperationKind::CancelBold => OperationKind::Bold,
            OperationKind::Italic => OperationKind::CancelItalic,
            OperationKind::CancelItalic => OperationKind::Italic,
            OperationKind::Image => OperationKind::CancelImage,
            OperationKind::CancelImage => OperationKind::Image,
            OperationKind::Batch => OperationKind::Batch,
        }
    }

    /// Style kind addressed by a style/cancel-style operation.
    pub fn style_kind(self) -> Option<StyleKind> {
        match self {
            OperationKind::Bold | OperationKind::CancelBold => Some(StyleKind::Bold),
            OperationKind::Italic | OperationKind::CancelItalic => Some(StyleKind::Italic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    start: usize,
    end: usize,
    kind: OperationKind,
    text: String,
    sub_operations: Option<Vec<Operation>>,
}

impl Operation {
    fn leaf(kind: OperationKind, start: usize, end: usize, text: String) -> Self {
        debug_assert!(start <= end, "operation range must be ordered");
        Self {
            start,
            end,
            kind,
            text,
            sub_operations: None,
        }
    }

    /// Insertion of `text` at `start`; the range covers the inserted chars.
    pub fn insert(start: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        let end = start + text.chars().count();
        Self::leaf(OperationKind::Insert, start, end, text)
    }

    /// Deletion of `text`, which occupied `[start, start + len)`.
    pub fn delete(start: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        let end = start + text.chars().count();
        Self::leaf(OperationKind::Delete, start, end, text)
    }

    pub fn apply_style(style: StyleKind, start: usize, end: usize) -> Self {
        let kind = match style {
            StyleKind::Bold => OperationKind::Bold,
            StyleKind::Italic => OperationKind::Italic,
        };
        Self::leaf(kind, start, end, String::new())
    }

    pub fn cancel_style(style: StyleKind, start: usize, end: usize) -> Self {
        Self::apply_style(style, start, end).inverse()
    }

    /// Image embedded at `start`, spanning its single placeholder char.
    pub fn image(start: usize, reference: impl Into<String>) -> Self {
        Self::leaf(OperationKind::Image, start, start + 1, reference.into())
    }

    pub fn cancel_image(start: usize, reference: impl Into<String>) -> Self {
        Self::leaf(OperationKind::CancelImage, start, start + 1, reference.into())
    }

    /// Composite applied in the listed order. The range spans all children.
    pub fn batch(sub_operations: Vec<Operation>) -> Self {
        let start = sub_operations.iter().map(|op| op.start).min().unwrap_or(0);
        let end = sub_operations.iter().map(|op| op.end).max().unwrap_or(start);
        Self {
            start,
            end,
            kind: OperationKind::Batch,
            text: String::new(),
            sub_operations: Some(sub_operations),
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Children of a batch in application order; empty for leaf kinds.
    pub fn sub_operations(&self) -> &[Operation] {
        self.sub_operations.as_deref().unwrap_or(&[])
    }

    pub fn is_batch(&self) -> bool {
        self.kind == OperationKind::Batch
    }

    pub fn inverse(&self) -> Operation {
        match &self.sub_operations {
            Some(subs) => Operation {
                start: self.start,
                end: self.end,
                kind: OperationKind::Batch,
                text: self.text.clone(),
                sub_operations: Some(subs.iter().rev().map(Operation::inverse).collect()),
            },
            None => Operation {
                start: self.start,
                end: self.end,
                kind: self.kind.inverse(),
                text: self.text.clone(),
                sub_operations: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn constructors_derive_ranges() {
        let ins = Operation::insert(3, "héllo");
        assert_eq!((ins.start(), ins.end()), (3, 8));
        let img = Operation::image(4, "img://a");
        assert_eq!((img.start(), img.end()), (4, 5));
        assert_eq!(img.text(), "img://a");
        let b = Operation::batch(vec![Operation::delete(6, "xy"), Operation::insert(2, "q")]);
        assert_eq!((b.start(), b.end()), (2, 8));
        assert!(b.is_batch());
    }

    #[test]
    fn leaf_kinds_swap_on_inverse() {
        let pairs = [
            (Operation::insert(0, "a"), OperationKind::Delete),
            (Operation::delete(0, "a"), OperationKind::Insert),
            (Operation::apply_style(StyleKind::Bold, 0, 2), OperationKind::CancelBold),
            (Operation::cancel_style(StyleKind::Bold, 0, 2), OperationKind::Bold),
            (Operation::apply_style(StyleKind::Italic, 0, 2), OperationKind::CancelItalic),
            (Operation::cancel_style(StyleKind::Italic, 0, 2), OperationKind::Italic),
            (Operation::image(1, "r"), OperationKind::CancelImage),
            (Operation::cancel_image(1, "r"), OperationKind::Image),
        ];
        for (op, expected) in pairs {
            let inv = op.inverse();
            assert_eq!(inv.kind(), expected);
            assert_eq!((inv.start(), inv.end()), (op.start(), op.end()));
            assert_eq!(inv.text(), op.text());
        }
    }

    #[test]
    fn batch_inverse_reverses_order() {
        let x = Operation::insert(0, "ab");
        let y = Operation::apply_style(StyleKind::Bold, 0, 2);
        let batch = Operation::batch(vec![x.clone(), y.clone()]);
        let inv = batch.inverse();
        assert!(inv.is_batch());
        assert_eq!(inv.sub_operations(), &[y.inverse(), x.inverse()]);
        assert_eq!(inv.inverse(), batch);
    }

    #[test]
    fn nested_batches_invert_recursively() {
        let inner = Operation::batch(vec![Operation::delete(3, "c"), Operation::delete(0, "ab")]);
        let outer = Operation::batch(vec![inner.clone(), Operation::insert(0, "z")]);
        let inv = outer.inverse();
        assert_eq!(inv.sub_operations()[0], Operation::delete(0, "z"));
        assert_eq!(
            inv.sub_operations()[1].sub_operations(),
            &[Operation::insert(0, "ab"), Operation::insert(3, "c")]
        );
    }

    #[test]
    fn style_kind_lookup() {
        assert_eq!(OperationKind::CancelItalic.style_kind(), Some(StyleKind::Italic));
        assert_eq!(OperationKind::Image.style_kind(), None);
    }

    fn leaf_strategy() -> impl Strategy<Value = Operation> {
        (0usize..20, 0usize..20, "[a-z\u{FFFC}]{0,5}", 0u8..8).prop_map(|(a, len, text, k)| {
            match k {
                0 => Operation::insert(a, text),
                1 => Operation::delete(a, text),
                2 => Operation::apply_style(StyleKind::Bold, a, a + len),
                3 => Operation::cancel_style(StyleKind::Bold, a, a + len),
                4 => Operation::apply_style(StyleKind::Italic, a, a + len),
                5 => Operation::cancel_style(StyleKind::Italic, a, a + len),
                6 => Operation::image(a, text),
                _ => Operation::cancel_image(a, text),
            }
        })
    }

    proptest! {
        #[test]
        fn inverse_is_an_involution(op in leaf_strategy()) {
            prop_assert_eq!(op.inverse().inverse(), op);
        }

        #[test]
        fn batch_inverse_is_an_involution(ops in proptest::collection::vec(leaf_strategy(), 0..6)) {
            let batch = Operation::batch(ops);
            prop_assert_eq!(batch.inverse().inverse(), batch);
        }
    }
}
