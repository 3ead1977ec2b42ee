//! Turning operations into document mutations.
//!
//! - [`DocumentApplier`] executes an [`Operation`](core_state::Operation)
//!   against a [`Document`](core_text::Document), including image decoding
//!   through an [`ImageLoader`].
//! - [`ImageDeletionTracker`] and [`split_deletion`] keep image references
//!   recoverable when a user deletion swallows placeholders.
//! - [`image_io`] holds the filesystem-backed loader and store.
//!
//! Telemetry targets: `actions.apply`, `actions.deletion`, `actions.image_io`.

pub mod applier;
pub mod deletion;
pub mod image_io;

pub use applier::DocumentApplier;
pub use deletion::{ImageDeletionTracker, split_deletion};
pub use image_io::{
    FsImageLoader, FsImageStore, ImageError, ImageLoader, ImageStore, PassthroughImageStore,
};
