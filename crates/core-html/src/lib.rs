//! Markup interchange for styled documents.
//!
//! The format is a small HTML subset:
//! - `<b>`/`<strong>` and `<i>`/`<em>` map to bold and italic intervals.
//! - `<img src="...">` maps to one placeholder char carrying the reference.
//! - `<br>` is a line break; `<p>` and `<div>` blocks are separated by one.
//! - Any other tag is accepted and ignored; comments and declarations are
//!   skipped.
//!
//! [`encode`] always produces well-formed output that [`decode`] reads back
//! to the same text, styles and image references.

mod decode;
mod encode;
pub mod entity;

pub use decode::decode;
pub use encode::encode;

use thiserror::Error;

/// Structural failure while decoding. Offsets are byte offsets into the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HtmlError {
    #[error("unterminated tag at byte {offset}")]
    UnterminatedTag { offset: usize },
    #[error("closing </{tag}> at byte {offset} has no matching open tag")]
    UnexpectedClose { tag: String, offset: usize },
    #[error("expected </{expected}> but found </{found}> at byte {offset}")]
    MismatchedClose {
        expected: String,
        found: String,
        offset: usize,
    },
    #[error("<{tag}> is never closed")]
    UnclosedTag { tag: String },
}
