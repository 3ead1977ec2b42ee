//! Image reference resolution: decoding into scaled bitmaps and persisting
//! picked files into app-owned storage.
//!
//! References are plain filesystem paths or `file://` URIs. Any other scheme
//! is reported as [`ImageError::UnsupportedReference`] so callers can decide
//! on a fallback.

use core_text::{ImageBounds, ScaledImage};
use image::imageops::FilterType;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("cannot read image {reference}")]
    Io {
        reference: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode image {reference}")]
    Decode {
        reference: String,
        #[source]
        source: image::ImageError,
    },
    #[error("unsupported image reference {0}")]
    UnsupportedReference(String),
}

/// Decodes a reference into a bitmap no larger than `bounds`.
pub trait ImageLoader: Send + Sync {
    fn load_scaled(&self, reference: &str, bounds: ImageBounds) -> Result<ScaledImage, ImageError>;
}

/// Copies a picked image into durable storage and returns the reference to
/// record in the document.
pub trait ImageStore: Send + Sync {
    fn persist(&self, reference: &str) -> Result<String, ImageError>;
}

/// Resolve `reference` to a local path, stripping a `file://` prefix.
fn local_path(reference: &str) -> Result<PathBuf, ImageError> {
    if let Some(rest) = reference.strip_prefix("file://") {
        return Ok(PathBuf::from(rest));
    }
    if reference.contains("://") {
        return Err(ImageError::UnsupportedReference(reference.to_string()));
    }
    Ok(PathBuf::from(reference))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsImageLoader;

impl ImageLoader for FsImageLoader {
    fn load_scaled(&self, reference: &str, bounds: ImageBounds) -> Result<ScaledImage, ImageError> {
        let path = local_path(reference)?;
        let bytes = std::fs::read(&path).map_err(|source| ImageError::Io {
            reference: reference.to_string(),
            source,
        })?;
        let decoded = image::load_from_memory(&bytes).map_err(|source| ImageError::Decode {
            reference: reference.to_string(),
            source,
        })?;
        let (width, height) = bounds.fit(decoded.width(), decoded.height());
        let decoded = if (width, height) != (decoded.width(), decoded.height()) {
            decoded.resize_exact(width, height, FilterType::Triangle)
        } else {
            decoded
        };
        debug!(
            target: "actions.image_io",
            reference,
            width,
            height,
            "image_decoded"
        );
        let rgba = decoded.to_rgba8();
        Ok(ScaledImage {
            width: rgba.width(),
            height: rgba.height(),
            pixels: Arc::from(rgba.into_raw()),
        })
    }
}

/// Stores copies under `dir` as `img_<millis>_<n>.<ext>`.
#[derive(Debug)]
pub struct FsImageStore {
    dir: PathBuf,
    counter: AtomicU64,
}

impl FsImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn already_stored(&self, path: &Path) -> bool {
        match (path.canonicalize(), self.dir.canonicalize()) {
            (Ok(p), Ok(d)) => p.starts_with(d),
            _ => path.starts_with(&self.dir),
        }
    }

    fn unique_name(&self, source: &Path) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("img");
        format!("img_{millis}_{n}.{ext}")
    }
}

impl ImageStore for FsImageStore {
    fn persist(&self, reference: &str) -> Result<String, ImageError> {
        let source = local_path(reference)?;
        if self.already_stored(&source) {
            return Ok(reference.to_string());
        }
        let io_err = |source| ImageError::Io {
            reference: reference.to_string(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        let target = self.dir.join(self.unique_name(&source));
        std::fs::copy(&source, &target).map_err(io_err)?;
        let stored = target.to_string_lossy().into_owned();
        info!(target: "actions.image_io", from = reference, to = %stored, "image_persisted");
        Ok(stored)
    }
}

/// Store that records references as given.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughImageStore;

impl ImageStore for PassthroughImageStore {
    fn persist(&self, reference: &str) -> Result<String, ImageError> {
        Ok(reference.to_string())
    }
}
