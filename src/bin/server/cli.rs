//! CLI mode for one-shot extraction.

use std::path::Path;
use std::time::Instant;

use tracing::info;
use uuid::Uuid;

use page_extract::engine::LayoutEngine;
use page_extract::extract::{ExtractionOptions, run_extraction};
use page_extract::pdf::PdfExporter;

/// Processes a local image file and prints the extraction result as JSON.
///
/// When `output_dir` is given, artifacts (figure crops, optionally the
/// annotated preview and a reconstructed PDF) are written beneath it.
pub fn process_file(
    engine: &dyn LayoutEngine,
    path: &Path,
    output_dir: Option<&Path>,
    annotated: bool,
    generate_pdf: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let start = Instant::now();

    info!("Loading image from file...");
    let image_bytes = std::fs::read(path)?;

    let request_id = Uuid::new_v4().to_string();
    let options = match output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            ExtractionOptions::persisting(&request_id, dir, annotated)
        }
        None => ExtractionOptions::in_memory(&request_id),
    };

    let mut response = run_extraction(engine, &image_bytes, &options)?;

    if generate_pdf {
        match output_dir {
            Some(dir) => {
                let destination = dir.join("output.pdf");
                PdfExporter::new().export(&response.blocks, &destination)?;
                response.exports.pdf_path = Some(destination.display().to_string());
            }
            None => {
                response
                    .errors
                    .push("PDF export skipped: no output directory".to_string());
            }
        }
    }

    info!(
        blocks = response.blocks.len(),
        figures = response.figures.len(),
        total_ms = start.elapsed().as_millis() as u64,
        "Extraction complete"
    );

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
