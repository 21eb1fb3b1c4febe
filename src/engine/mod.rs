//! The layout/OCR engine boundary.
//!
//! The model that detects layout elements and recognizes text is an
//! external collaborator: a black-box function from an image to a list of
//! detected regions. This module defines that boundary as the
//! [`LayoutEngine`] trait plus the raw region types it produces. The
//! normalization pipeline in [`crate::extract`] consumes these and never
//! looks past them.
//!
//! The production backend lives in [`paddle`] behind the `paddle` cargo
//! feature; tests implement the trait directly with canned regions.

#[cfg(feature = "paddle")]
pub mod paddle;

use std::sync::Arc;

use image::RgbImage;
use thiserror::Error;

use crate::geometry::BoundingBox;

/// Errors raised by a layout engine backend.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A required model file was not found at construction time.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// The backend configuration was invalid.
    #[error("Invalid engine configuration: {0}")]
    Config(String),

    /// Inference failed on a specific image.
    #[error("Inference failed: {0}")]
    Inference(String),
}

/// One recognized text line inside a detected region.
#[derive(Debug, Clone)]
pub struct RecognizedLine {
    /// The recognized text.
    pub text: String,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f32,
    /// Line-level bounding box, when the backend exposes one.
    pub bbox: Option<BoundingBox>,
}

impl RecognizedLine {
    /// Creates a line with text and confidence but no box.
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            bbox: None,
        }
    }
}

/// One detected layout region, pre-normalization.
///
/// `label` is the engine-native type label (e.g. `"paragraph_title"`,
/// `"figure"`, `"header"`); the pipeline maps it onto the closed contract
/// type set and treats anything it does not recognize as plain text.
#[derive(Debug, Clone)]
pub struct RawRegion {
    /// Engine-native type label.
    pub label: String,
    /// Region bounding box in input-image pixel coordinates.
    pub bbox: BoundingBox,
    /// Recognized text lines, in recognition order. Empty for regions the
    /// engine did not OCR (typically figures).
    pub lines: Vec<RecognizedLine>,
    /// Cropped sub-image for visual regions, when available.
    pub crop: Option<RgbImage>,
    /// Layout-detection score in `[0, 1]`, when the backend reports one.
    pub layout_score: Option<f32>,
}

impl RawRegion {
    /// Creates a region with a label and box and nothing else.
    pub fn new(label: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            bbox,
            lines: Vec::new(),
            crop: None,
            layout_score: None,
        }
    }

    /// Attaches recognized lines.
    pub fn with_lines(mut self, lines: Vec<RecognizedLine>) -> Self {
        self.lines = lines;
        self
    }

    /// Attaches a cropped sub-image.
    pub fn with_crop(mut self, crop: RgbImage) -> Self {
        self.crop = Some(crop);
        self
    }

    /// Attaches a layout score.
    pub fn with_layout_score(mut self, score: f32) -> Self {
        self.layout_score = Some(score);
        self
    }
}

/// A document layout/OCR engine.
///
/// Implementations must be safe to invoke from multiple concurrent
/// callers (`Send + Sync`): the engine is expensive to construct and is
/// built once per process, then shared across request handlers. A backend
/// whose underlying runtime is not reentrant must serialize calls
/// internally (e.g. with a mutex) rather than pushing that burden onto
/// callers.
pub trait LayoutEngine: Send + Sync {
    /// Runs layout analysis (and OCR, where the backend integrates it)
    /// over one image and returns the detected regions in the backend's
    /// native emission order.
    fn analyze(&self, image: &RgbImage) -> Result<Vec<RawRegion>, EngineError>;
}

/// Shared handle to the process-wide engine instance.
pub type SharedLayoutEngine = Arc<dyn LayoutEngine>;
