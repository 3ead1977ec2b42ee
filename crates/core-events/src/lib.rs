//! Raw change coalescing for the live document.
//!
//! The editing surface reports every raw mutation to a [`ChangeCoalescer`].
//! The coalescer debounces the burst, diffs the last stable snapshot against
//! the current text on a worker thread, and hands one coalesced
//! [`TextDiff`](core_text::TextDiff) back to the owner thread.

use std::sync::atomic::AtomicU64;

mod coalescer;

pub use coalescer::{ChangeCoalescer, DEFAULT_DEBOUNCE};
pub use core_text::TextDiff;

// -------------------------------------------------------------------------------------------------
// Telemetry
// -------------------------------------------------------------------------------------------------
// Relaxed atomic counters, inspected by tests or logged periodically by embedders.
// -------------------------------------------------------------------------------------------------
/// Coalesced edits handed to the owner (debounced or flushed).
pub static COALESCED_EDITS: AtomicU64 = AtomicU64::new(0);
/// Raw changes observed while the ignore predicate was true.
pub static SUPPRESSED_CHANGES: AtomicU64 = AtomicU64::new(0);
/// Debounce windows cancelled before their result was consumed.
pub static CANCELLED_WINDOWS: AtomicU64 = AtomicU64::new(0);
