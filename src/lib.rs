//! Page-image extraction service.
//!
//! This crate decomposes a page image into typed content blocks (titles,
//! text, lists, tables, figures) with bounding boxes, reading order, and
//! confidence scores. Layout detection and OCR are delegated to a
//! pluggable [`engine::LayoutEngine`]; everything downstream of the engine
//! lives here: reading-order sequencing, type mapping, text/line
//! aggregation, figure persistence, preview annotation, and PDF
//! reconstruction.
//!
//! # Main APIs
//!
//! - [`extract::run_extraction`] - Normalize one image into an [`extract::response::ExtractionResponse`]
//! - [`pdf::PdfExporter`] - Render the finalized block list as a linear PDF
//! - [`server::build_router`] - The HTTP surface (`/health`, `/extract`, `/outputs`, `/openapi.yaml`)

pub mod engine;
pub mod error;
pub mod extract;
pub mod geometry;
pub mod pdf;
pub mod server;

pub use error::{ExtractionError, PdfExportError};
pub use extract::response::ExtractionResponse;
pub use extract::{ExtractionOptions, run_extraction};

/// Initializes the tracing subscriber for logging.
///
/// Typically called once at the start of the binary. Respects `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
