//! Image placeholder types.
//!
//! An embedded image occupies exactly one [`PLACEHOLDER`] char in the text.
//! The [`ImageSpan`] attached to that offset carries the durable reference
//! (file path or URI) and, when decoding succeeded, the scaled pixels.

use std::fmt;
use std::sync::Arc;

/// Object replacement character standing in for an embedded image.
pub const PLACEHOLDER: char = '\u{FFFC}';

/// Decoded RGBA8 pixels already scaled to fit the display bounds.
#[derive(Clone, PartialEq, Eq)]
pub struct ScaledImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl fmt::Debug for ScaledImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScaledImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpan {
    pub reference: String,
    /// `None` when the reference could not be resolved; nothing is rendered.
    pub image: Option<ScaledImage>,
}

impl ImageSpan {
    pub fn resolved(reference: impl Into<String>, image: ScaledImage) -> Self {
        Self {
            reference: reference.into(),
            image: Some(image),
        }
    }

    pub fn unresolved(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            image: None,
        }
    }
}

/// Size of the editing surface in display units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Maximum display box an image is scaled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBounds {
    pub max_width: u32,
    pub max_height: u32,
}

impl ImageBounds {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width: max_width.max(1),
            max_height: max_height.max(1),
        }
    }

    /// Bounds for a viewport: the supplied max width and half the viewport height.
    pub fn for_viewport(viewport: Viewport, max_width: u32) -> Self {
        Self::new(max_width, viewport.height / 2)
    }

    /// Largest size fitting these bounds with the source aspect ratio.
    /// Images already inside the bounds are never upscaled.
    pub fn fit(&self, width: u32, height: u32) -> (u32, u32) {
        if width == 0 || height == 0 {
            return (0, 0);
        }
        if width <= self.max_width && height <= self.max_height {
            return (width, height);
        }
        let scale_w = f64::from(self.max_width) / f64::from(width);
        let scale_h = f64::from(self.max_height) / f64::from(height);
        let scale = scale_w.min(scale_h);
        let w = (f64::from(width) * scale).round().max(1.0) as u32;
        let h = (f64::from(height) * scale).round().max(1.0) as u32;
        (w.min(self.max_width), h.min(self.max_height))
    }
}
