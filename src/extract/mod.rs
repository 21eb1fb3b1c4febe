//! The extraction orchestrator.
//!
//! Owns the end-to-end normalization pipeline: decode the uploaded image,
//! invoke the layout/OCR engine, sequence the detected regions into
//! reading order, map and aggregate each region into a contract block,
//! persist figure crops, optionally render the annotated preview, and
//! assemble the response with per-stage timings.

pub mod annotate;
pub mod blocks;
pub mod response;

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::RgbImage;
use tracing::{debug, info};

use crate::engine::{LayoutEngine, RawRegion};
use crate::error::ExtractionError;
use annotate::{AnnotationStyle, render_annotated};
use blocks::{aggregate_lines, sort_by_reading_order};
use response::{
    Block, BlockType, ExtractionResponse, Exports, Figure, ImageSize, Meta, TimingsMs,
};

/// Fallback confidence for figures whose layout score is not populated.
const DEFAULT_FIGURE_CONFIDENCE: f32 = 0.9;

/// Per-request extraction parameters.
///
/// `output_dir` must be present iff `store_outputs` is true; the caller
/// creates the directory, the orchestrator only writes beneath it.
#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    /// Request identifier; also the artifact directory key.
    pub request_id: String,
    /// Output directory for this request's artifacts.
    pub output_dir: Option<PathBuf>,
    /// Whether figure crops (and the preview) are persisted.
    pub store_outputs: bool,
    /// Whether the annotated preview is rendered (requires `store_outputs`).
    pub return_annotated: bool,
}

impl ExtractionOptions {
    /// Options that keep everything in memory: nothing is written.
    pub fn in_memory(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            output_dir: None,
            store_outputs: false,
            return_annotated: false,
        }
    }

    /// Options that persist artifacts under `output_dir`.
    pub fn persisting(
        request_id: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        return_annotated: bool,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            output_dir: Some(output_dir.into()),
            store_outputs: true,
            return_annotated,
        }
    }
}

/// Runs layout analysis and OCR over one image and normalizes the result.
///
/// Fails with [`ExtractionError::Decode`] before any engine work when the
/// bytes are not a valid raster; engine failures propagate unchanged. PDF
/// export is not part of this pipeline: it consumes the finished block
/// list separately so its failure cannot invalidate the extraction.
pub fn run_extraction(
    engine: &dyn LayoutEngine,
    image_bytes: &[u8],
    options: &ExtractionOptions,
) -> Result<ExtractionResponse, ExtractionError> {
    let t_start = Instant::now();

    let image = decode_image(image_bytes)?;
    let (width, height) = image.dimensions();
    let preprocess_ms = t_start.elapsed().as_millis() as u64;

    let t_layout = Instant::now();
    let mut regions = engine.analyze(&image)?;
    let layout_ms = t_layout.elapsed().as_millis() as u64;

    info!(
        request_id = %options.request_id,
        regions = regions.len(),
        layout_ms,
        "Layout analysis complete"
    );

    sort_by_reading_order(&mut regions);

    let output_dir = if options.store_outputs {
        options.output_dir.as_deref()
    } else {
        None
    };

    let t_crop = Instant::now();
    let mut blocks = Vec::with_capacity(regions.len());
    let mut figures = Vec::new();

    for (idx, region) in regions.iter().enumerate() {
        let block_type = BlockType::from_label(&region.label);
        let aggregated = aggregate_lines(&region.lines);

        if block_type == BlockType::Figure {
            figures.push(build_figure(
                region,
                figures.len(),
                output_dir,
                &options.request_id,
            )?);
        }

        blocks.push(Block {
            id: format!("b{}", idx + 1),
            block_type,
            bbox: region.bbox,
            order: (idx + 1) as u32,
            text: aggregated.text,
            confidence: aggregated.confidence,
            lines: aggregated.lines,
        });
    }
    let crop_ms = t_crop.elapsed().as_millis() as u64;

    let annotated_image_path = if options.store_outputs && options.return_annotated {
        match output_dir {
            Some(dir) => Some(save_annotated(
                &image,
                &blocks,
                dir,
                &options.request_id,
            )?),
            None => None,
        }
    } else {
        None
    };

    Ok(ExtractionResponse {
        meta: Meta {
            request_id: options.request_id.clone(),
            image: ImageSize { width, height },
            timings_ms: TimingsMs {
                preprocess: preprocess_ms,
                layout: layout_ms,
                // OCR runs inside the engine's layout pass; the split is
                // not measurable, so this stays a documented zero.
                ocr: 0,
                crop: crop_ms,
            },
        },
        blocks,
        figures,
        exports: Exports {
            annotated_image_path,
            pdf_path: None,
        },
        errors: Vec::new(),
    })
}

/// Decodes upload bytes into an RGB raster, rejecting empty images.
fn decode_image(image_bytes: &[u8]) -> Result<RgbImage, ExtractionError> {
    let image = image::load_from_memory(image_bytes)
        .map_err(|_| ExtractionError::Decode)?
        .to_rgb8();

    if image.width() == 0 || image.height() == 0 {
        return Err(ExtractionError::Decode);
    }

    Ok(image)
}

/// Builds the figure record for a figure-typed region, persisting its
/// crop when requested and available.
fn build_figure(
    region: &RawRegion,
    figures_emitted: usize,
    output_dir: Option<&Path>,
    request_id: &str,
) -> Result<Figure, ExtractionError> {
    let fig_id = format!("f{}", figures_emitted + 1);

    let image_path = match (output_dir, &region.crop) {
        (Some(dir), Some(crop)) => {
            let file_name = format!("{}_{}.png", fig_id, region.label.to_lowercase());
            let path = dir.join(&file_name);
            crop.save(&path).map_err(|e| ExtractionError::Artifact {
                path: path.clone(),
                source: std::io::Error::other(e),
            })?;
            debug!(figure = %fig_id, path = %path.display(), "Saved figure crop");
            format!("/outputs/{}/{}", request_id, file_name)
        }
        _ => String::new(),
    };

    Ok(Figure {
        id: fig_id,
        bbox: region.bbox,
        image_path,
        caption: None,
        confidence: region.layout_score.unwrap_or(DEFAULT_FIGURE_CONFIDENCE),
    })
}

/// Renders and persists the annotated preview, returning its path.
fn save_annotated(
    image: &RgbImage,
    blocks: &[Block],
    output_dir: &Path,
    request_id: &str,
) -> Result<String, ExtractionError> {
    let preview = render_annotated(image, blocks, default_style());
    let path = output_dir.join("annotated.png");
    preview.save(&path).map_err(|e| ExtractionError::Artifact {
        path: path.clone(),
        source: std::io::Error::other(e),
    })?;
    Ok(format!("/outputs/{}/annotated.png", request_id))
}

/// Process-wide annotation style; the system font lookup runs once.
fn default_style() -> &'static AnnotationStyle {
    use std::sync::OnceLock;
    static STYLE: OnceLock<AnnotationStyle> = OnceLock::new();
    STYLE.get_or_init(AnnotationStyle::with_system_font)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, RecognizedLine};
    use crate::geometry::BoundingBox;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    /// Engine returning canned regions, for exercising the pipeline.
    struct StubEngine {
        regions: Vec<RawRegion>,
    }

    impl LayoutEngine for StubEngine {
        fn analyze(&self, _image: &RgbImage) -> Result<Vec<RawRegion>, EngineError> {
            Ok(self.regions.clone())
        }
    }

    /// Engine that always fails, for the propagation path.
    struct FailingEngine;

    impl LayoutEngine for FailingEngine {
        fn analyze(&self, _image: &RgbImage) -> Result<Vec<RawRegion>, EngineError> {
            Err(EngineError::Inference("model exploded".to_string()))
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([200, 200, 200]));
        let mut bytes = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(image)
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_rejects_undecodable_bytes() {
        let err = run_extraction(
            &StubEngine { regions: vec![] },
            b"definitely not an image",
            &ExtractionOptions::in_memory("req-1"),
        )
        .unwrap_err();
        assert!(matches!(err, ExtractionError::Decode));
        assert_eq!(err.to_string(), "Could not decode image");
    }

    #[test]
    fn test_engine_failure_propagates() {
        let err = run_extraction(
            &FailingEngine,
            &png_bytes(4, 4),
            &ExtractionOptions::in_memory("req-1"),
        )
        .unwrap_err();
        assert!(matches!(err, ExtractionError::Engine(_)));
    }

    #[test]
    fn test_meta_reports_true_dimensions() {
        let response = run_extraction(
            &StubEngine { regions: vec![] },
            &png_bytes(31, 17),
            &ExtractionOptions::in_memory("req-1"),
        )
        .unwrap();

        assert_eq!(response.meta.request_id, "req-1");
        assert_eq!(response.meta.image.width, 31);
        assert_eq!(response.meta.image.height, 17);
        assert_eq!(response.meta.timings_ms.ocr, 0);
        assert!(response.blocks.is_empty());
        assert!(response.figures.is_empty());
        assert!(response.errors.is_empty());
    }

    #[test]
    fn test_blocks_are_sequenced_and_densely_ordered() {
        // Deliberately shuffled vertical order.
        let regions = vec![
            RawRegion::new("text", BoundingBox::from_coords(0, 200, 50, 240)).with_lines(vec![
                RecognizedLine::new("body", 0.9),
            ]),
            RawRegion::new("title", BoundingBox::from_coords(0, 10, 50, 40))
                .with_lines(vec![RecognizedLine::new("Heading", 0.99)]),
            RawRegion::new("list", BoundingBox::from_coords(0, 100, 50, 140)),
        ];

        let response = run_extraction(
            &StubEngine { regions },
            &png_bytes(64, 256),
            &ExtractionOptions::in_memory("req-1"),
        )
        .unwrap();

        let types: Vec<&str> = response
            .blocks
            .iter()
            .map(|b| b.block_type.as_str())
            .collect();
        assert_eq!(types, vec!["title", "list", "text"]);

        for (i, block) in response.blocks.iter().enumerate() {
            assert_eq!(block.order, (i + 1) as u32);
            assert_eq!(block.id, format!("b{}", i + 1));
        }
    }

    #[test]
    fn test_text_aggregation_round_trip() {
        let regions = vec![
            RawRegion::new("text", BoundingBox::from_coords(0, 0, 50, 40)).with_lines(vec![
                RecognizedLine::new("Hello World", 0.99),
                RecognizedLine::new("Line 2", 0.95),
            ]),
        ];

        let response = run_extraction(
            &StubEngine { regions },
            &png_bytes(64, 64),
            &ExtractionOptions::in_memory("req-1"),
        )
        .unwrap();

        let block = &response.blocks[0];
        assert_eq!(block.text, "Hello World\nLine 2");
        assert!((block.confidence - 0.97).abs() < 1e-4);
        assert_eq!(block.lines.len(), 2);
    }

    #[test]
    fn test_figures_without_store_outputs_leave_no_artifacts() {
        let crop = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        let regions = vec![
            RawRegion::new("figure", BoundingBox::from_coords(0, 0, 4, 4))
                .with_crop(crop)
                .with_layout_score(0.8),
        ];

        let dir = tempfile::tempdir().unwrap();
        let response = run_extraction(
            &StubEngine { regions },
            &png_bytes(8, 8),
            &ExtractionOptions::in_memory("req-1"),
        )
        .unwrap();

        assert_eq!(response.figures.len(), 1);
        let figure = &response.figures[0];
        assert_eq!(figure.id, "f1");
        assert_eq!(figure.image_path, "");
        assert_eq!(figure.caption, None);
        assert!((figure.confidence - 0.8).abs() < 1e-6);
        assert!(response.exports.annotated_image_path.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        // Figure rides along as a block of the same box.
        assert_eq!(response.blocks[0].block_type, BlockType::Figure);
        assert_eq!(response.blocks[0].bbox, figure.bbox);
    }

    #[test]
    fn test_figure_confidence_defaults_when_score_missing() {
        let regions = vec![RawRegion::new(
            "figure",
            BoundingBox::from_coords(0, 0, 4, 4),
        )];
        let response = run_extraction(
            &StubEngine { regions },
            &png_bytes(8, 8),
            &ExtractionOptions::in_memory("req-1"),
        )
        .unwrap();
        assert!((response.figures[0].confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_persisted_artifacts_and_paths() {
        let crop = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        let regions = vec![
            RawRegion::new("Figure", BoundingBox::from_coords(0, 20, 4, 24)).with_crop(crop),
            RawRegion::new("text", BoundingBox::from_coords(0, 0, 8, 8))
                .with_lines(vec![RecognizedLine::new("hi", 0.9)]),
        ];

        let dir = tempfile::tempdir().unwrap();
        let response = run_extraction(
            &StubEngine { regions },
            &png_bytes(16, 32),
            &ExtractionOptions::persisting("req-9", dir.path(), true),
        )
        .unwrap();

        let figure = &response.figures[0];
        assert_eq!(figure.image_path, "/outputs/req-9/f1_figure.png");
        assert!(dir.path().join("f1_figure.png").exists());

        assert_eq!(
            response.exports.annotated_image_path.as_deref(),
            Some("/outputs/req-9/annotated.png")
        );
        assert!(dir.path().join("annotated.png").exists());
    }

    #[test]
    fn test_annotation_skipped_when_not_requested() {
        let dir = tempfile::tempdir().unwrap();
        let response = run_extraction(
            &StubEngine { regions: vec![] },
            &png_bytes(8, 8),
            &ExtractionOptions::persisting("req-2", dir.path(), false),
        )
        .unwrap();

        assert!(response.exports.annotated_image_path.is_none());
        assert!(!dir.path().join("annotated.png").exists());
    }
}
