//! Error types for the extraction pipeline.

use std::path::PathBuf;
use thiserror::Error;

use crate::engine::EngineError;

/// Errors raised while turning an uploaded image into an extraction result.
///
/// Decode failures are local validation failures and happen before the
/// engine is invoked; engine and artifact failures are fatal to the
/// request. PDF export is deliberately *not* part of this enum; its
/// failures are recovered by the caller (see [`PdfExportError`]).
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The uploaded bytes did not decode to a usable raster.
    #[error("Could not decode image")]
    Decode,

    /// The layout/OCR engine raised during inference.
    #[error("layout analysis failed: {0}")]
    Engine(#[from] EngineError),

    /// An artifact (figure crop, annotated preview) could not be written.
    #[error("failed to write artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractionError {
    /// Returns true if this failure happened before any engine work,
    /// i.e. it is the caller's fault and maps to a 400.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, ExtractionError::Decode)
    }
}

/// Errors raised by the PDF exporter.
///
/// These never invalidate an otherwise-successful extraction: the HTTP
/// layer catches them and appends a message to `ExtractionResponse.errors`.
#[derive(Debug, Error)]
pub enum PdfExportError {
    /// The document could not be laid out or serialized.
    #[error("failed to render PDF: {0}")]
    Render(String),

    /// The destination was not writable.
    #[error("failed to write PDF to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
