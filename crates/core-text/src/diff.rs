//! Prefix/suffix text diff between two snapshots.
//!
//! `diff_text(old, new, hint)` finds the single contiguous region where the
//! two snapshots differ:
//!
//! 1. Extend the common prefix forward starting at `hint` (callers guarantee
//!    both texts agree on every offset below `hint`). A hint beyond either
//!    length is clamped to `min(old_len, new_len)`.
//! 2. Extend the common suffix backward from both ends, never crossing the
//!    prefix boundary.
//! 3. Classify the middle slices: only new chars -> `Insert`, only old chars
//!    -> `Delete`, both -> `Replace`, neither -> `None` (nothing changed).
//!
//! Any edit whose middle slices are both non-empty is a `Replace`, whether or
//! not the two slices have the same length: selecting three chars and typing
//! one yields `Replace { removed: 3 chars, inserted: 1 char }`. Reporting
//! `Replace` rather than folding it into an insertion keeps the removed text,
//! so an undo can restore it. [`TextDiff::is_insert`] and
//! [`TextDiff::content`] expose the insertion-shaped view of a replace.
//!
//! Pure and allocation-light; runs on worker threads.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextDiff {
    Insert {
        position: usize,
        content: String,
    },
    Delete {
        position: usize,
        content: String,
    },
    Replace {
        position: usize,
        removed: String,
        inserted: String,
    },
}

impl TextDiff {
    /// Char offset of the prefix boundary where the change starts.
    pub fn position(&self) -> usize {
        match self {
            TextDiff::Insert { position, .. }
            | TextDiff::Delete { position, .. }
            | TextDiff::Replace { position, .. } => *position,
        }
    }

    /// True for insertions and (insertion-shaped) replacements.
    pub fn is_insert(&self) -> bool {
        !matches!(self, TextDiff::Delete { .. })
    }

    /// Inserted text for insert/replace, deleted text for delete.
    pub fn content(&self) -> &str {
        match self {
            TextDiff::Insert { content, .. } | TextDiff::Delete { content, .. } => content,
            TextDiff::Replace { inserted, .. } => inserted,
        }
    }

    /// Apply this diff to `text` (the old snapshot), producing the new one.
    pub fn apply_to(&self, text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        let (position, removed_len, inserted) = match self {
            TextDiff::Insert { position, content } => (*position, 0, content.as_str()),
            TextDiff::Delete { position, content } => (*position, content.chars().count(), ""),
            TextDiff::Replace {
                position,
                removed,
                inserted,
            } => (*position, removed.chars().count(), inserted.as_str()),
        };
        let position = position.min(chars.len());
        let tail = (position + removed_len).min(chars.len());
        let mut out: String = chars[..position].iter().collect();
        out.push_str(inserted);
        out.extend(&chars[tail..]);
        out
    }
}

/// Compute the edit turning `old` into `new`. `hint` is a char offset below
/// which both texts are known to be identical.
pub fn diff_text(old: &str, new: &str, hint: usize) -> Option<TextDiff> {
    let old: Vec<char> = old.chars().collect();
    let new: Vec<char> = new.chars().collect();
    let min_len = old.len().min(new.len());

    let mut prefix = hint.min(min_len);
    while prefix < min_len && old[prefix] == new[prefix] {
        prefix += 1;
    }

    let mut old_end = old.len();
    let mut new_end = new.len();
    while old_end > prefix && new_end > prefix && old[old_end - 1] == new[new_end - 1] {
        old_end -= 1;
        new_end -= 1;
    }

    let removed: String = old[prefix..old_end].iter().collect();
    let inserted: String = new[prefix..new_end].iter().collect();
    match (removed.is_empty(), inserted.is_empty()) {
        (true, true) => None,
        (true, false) => Some(TextDiff::Insert {
            position: prefix,
            content: inserted,
        }),
        (false, true) => Some(TextDiff::Delete {
            position: prefix,
            content: removed,
        }),
        (false, false) => Some(TextDiff::Replace {
            position: prefix,
            removed,
            inserted,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn typed_word_is_an_insert() {
        let d = diff_text("Hello world", "Hello brave world", 0).unwrap();
        assert_eq!(
            d,
            TextDiff::Insert {
                position: 6,
                content: "brave ".into()
            }
        );
        assert!(d.is_insert());
    }

    #[test]
    fn backspace_run_is_a_delete() {
        let d = diff_text("abcdef", "abf", 0).unwrap();
        assert_eq!(
            d,
            TextDiff::Delete {
                position: 2,
                content: "cde".into()
            }
        );
        assert!(!d.is_insert());
        assert_eq!(d.content(), "cde");
    }

    #[test]
    fn equal_length_change_is_insertion_shaped_replace() {
        let d = diff_text("cat", "cut", 0).unwrap();
        assert_eq!(
            d,
            TextDiff::Replace {
                position: 1,
                removed: "a".into(),
                inserted: "u".into()
            }
        );
        assert!(d.is_insert());
        assert_eq!(d.content(), "u");
    }

    #[test]
    fn identical_texts_yield_none() {
        assert_eq!(diff_text("same", "same", 0), None);
        assert_eq!(diff_text("", "", 0), None);
        assert_eq!(diff_text("same", "same", 99), None);
    }

    #[test]
    fn repeated_chars_prefer_prefix_position() {
        // Suffix matching stops at the prefix boundary.
        let d = diff_text("aaa", "aaaa", 0).unwrap();
        assert_eq!(
            d,
            TextDiff::Insert {
                position: 3,
                content: "a".into()
            }
        );
    }

    #[test]
    fn hint_beyond_lengths_is_clamped() {
        let d = diff_text("ab", "abc", 50).unwrap();
        assert_eq!(
            d,
            TextDiff::Insert {
                position: 2,
                content: "c".into()
            }
        );
    }

    #[test]
    fn multibyte_positions_are_char_offsets() {
        let d = diff_text("día", "día!", 0).unwrap();
        assert_eq!(d.position(), 3);
        assert_eq!(d.apply_to("día"), "día!");
    }

    fn first_difference(a: &str, b: &str) -> usize {
        a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
    }

    proptest! {
        #[test]
        fn applying_diff_reproduces_new_text(a in "[ab\u{FFFC}é ]{0,12}", b in "[ab\u{FFFC}é ]{0,12}") {
            match diff_text(&a, &b, 0) {
                Some(d) => prop_assert_eq!(d.apply_to(&a), b),
                None => prop_assert_eq!(a, b),
            }
        }

        #[test]
        fn hint_up_to_first_difference_is_equivalent(a in "[abc]{0,10}", b in "[abc]{0,10}", frac in 0.0f64..=1.0) {
            let first = first_difference(&a, &b);
            let hint = (first as f64 * frac) as usize;
            prop_assert_eq!(diff_text(&a, &b, hint), diff_text(&a, &b, 0));
        }
    }
}
