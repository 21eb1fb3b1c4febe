//! PP-StructureV3 backend via the `oar-ocr` crate.
//!
//! Wraps `OARStructureBuilder` into a [`LayoutEngine`]: layout detection
//! is required, integrated OCR (text detection + recognition + character
//! dictionary) is optional. Model files are validated at construction so
//! a misconfigured deployment fails at startup, not on the first request.

use std::path::PathBuf;

use image::{RgbImage, imageops};
use oar_ocr::domain::structure::{LayoutElementType, StructureResult};
use oar_ocr::oarocr::{OARStructure, OARStructureBuilder};
use tracing::{debug, info};

use crate::engine::{EngineError, LayoutEngine, RawRegion, RecognizedLine};
use crate::geometry::BoundingBox;

/// IoA threshold for assigning an OCR line to the layout element that
/// contains it.
const LINE_MEMBERSHIP_IOA_THRESHOLD: f32 = 0.5;

/// Configuration for the PP-Structure backend.
#[derive(Debug, Clone)]
pub struct PaddleEngineConfig {
    /// Path to the layout detection model (required).
    pub layout_model: PathBuf,
    /// Layout model preset name (e.g. `PP-DocLayout_plus-L`).
    pub layout_model_name: Option<String>,
    /// Path to the text detection model (optional, enables OCR).
    pub text_det_model: Option<PathBuf>,
    /// Path to the text recognition model (optional, enables OCR).
    pub text_rec_model: Option<PathBuf>,
    /// Path to the recognition character dictionary (optional, enables OCR).
    pub char_dict: Option<PathBuf>,
    /// Device to run on. Only `cpu` is supported by this build.
    pub device: String,
}

/// Layout/OCR engine backed by the `oar-ocr` structure pipeline.
pub struct PaddleStructureEngine {
    analyzer: OARStructure,
}

impl PaddleStructureEngine {
    /// Builds the engine, validating model paths first.
    pub fn new(config: &PaddleEngineConfig) -> Result<Self, EngineError> {
        if !config.layout_model.exists() {
            return Err(EngineError::ModelNotFound(format!(
                "Layout model not found: {}",
                config.layout_model.display()
            )));
        }

        let ocr_models = match (
            &config.text_det_model,
            &config.text_rec_model,
            &config.char_dict,
        ) {
            (Some(det), Some(rec), Some(dict)) => {
                for (name, path) in [
                    ("Text detection model", det),
                    ("Text recognition model", rec),
                    ("Character dictionary", dict),
                ] {
                    if !path.exists() {
                        return Err(EngineError::ModelNotFound(format!(
                            "{} not found: {}",
                            name,
                            path.display()
                        )));
                    }
                }
                Some((det.clone(), rec.clone(), dict.clone()))
            }
            (None, None, None) => None,
            _ => {
                return Err(EngineError::Config(
                    "OCR requires text detection model, recognition model and dictionary together"
                        .to_string(),
                ));
            }
        };

        if config.device.to_lowercase() != "cpu" {
            return Err(EngineError::Config(format!(
                "Unsupported device: {} (this build runs on cpu only)",
                config.device
            )));
        }

        let mut builder = OARStructureBuilder::new(&config.layout_model);

        if let Some(name) = &config.layout_model_name {
            builder = builder.layout_model_name(name);
        }

        if let Some((det, rec, dict)) = ocr_models {
            builder = builder.with_ocr(det, rec, dict);
        } else {
            info!("No OCR models configured; blocks will carry no text");
        }

        let analyzer = builder
            .build()
            .map_err(|e| EngineError::Config(e.to_string()))?;

        Ok(Self { analyzer })
    }
}

impl LayoutEngine for PaddleStructureEngine {
    fn analyze(&self, image: &RgbImage) -> Result<Vec<RawRegion>, EngineError> {
        let result = self
            .analyzer
            .predict_image(image.clone())
            .map_err(|e| EngineError::Inference(e.to_string()))?;

        Ok(regions_from_structure(result, image))
    }
}

/// Flattens a structure analysis result into raw regions.
///
/// OCR lines are attached to the layout element that contains them (IoA
/// against the element box); visual elements get a crop taken from the
/// original image rather than trusting any backend-rendered crop.
fn regions_from_structure(result: StructureResult, image: &RgbImage) -> Vec<RawRegion> {
    let text_regions = result.text_regions.unwrap_or_default();

    let mut regions = Vec::with_capacity(result.layout_elements.len());
    for element in result.layout_elements {
        // Region blocks are grouping metadata, not page content.
        if element.element_type == LayoutElementType::Region {
            continue;
        }

        let bbox = BoundingBox::from_model_coords(
            element.bbox.x_min(),
            element.bbox.y_min(),
            element.bbox.x_max(),
            element.bbox.y_max(),
        )
        .clamp_to(image.width(), image.height());

        let lines: Vec<RecognizedLine> = text_regions
            .iter()
            .filter(|tr| tr.bounding_box.ioa(&element.bbox) > LINE_MEMBERSHIP_IOA_THRESHOLD)
            .filter_map(|tr| {
                tr.text_with_confidence().map(|(text, confidence)| {
                    let line_bbox = BoundingBox::from_model_coords(
                        tr.bounding_box.x_min(),
                        tr.bounding_box.y_min(),
                        tr.bounding_box.x_max(),
                        tr.bounding_box.y_max(),
                    );
                    RecognizedLine {
                        text: text.to_string(),
                        confidence,
                        bbox: Some(line_bbox),
                    }
                })
            })
            .collect();

        let crop = if element.element_type.is_visual() {
            crop_region(image, bbox)
        } else {
            None
        };

        let label = element
            .label
            .unwrap_or_else(|| element.element_type.as_str().to_string());

        debug!(
            label = %label,
            lines = lines.len(),
            confidence = element.confidence,
            "Converted layout element"
        );

        regions.push(RawRegion {
            label,
            bbox,
            lines,
            crop,
            layout_score: Some(element.confidence),
        });
    }

    regions
}

/// Crops a region out of the input image; `None` for degenerate boxes.
fn crop_region(image: &RgbImage, bbox: BoundingBox) -> Option<RgbImage> {
    if bbox.is_empty() {
        return None;
    }
    Some(
        imageops::crop_imm(
            image,
            bbox.x1 as u32,
            bbox.y1 as u32,
            bbox.width(),
            bbox.height(),
        )
        .to_image(),
    )
}
