//! Contract-shaped response types.
//!
//! These are the stable wire schema of the service. Field names and
//! shapes are part of the external contract (see `openapi.yaml`) and must
//! not drift with the engine's native result types.

use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// The closed set of content block types in a response.
///
/// Engine-native labels outside this set are folded into [`BlockType::Text`]
/// by the classifier; see [`BlockType::from_label`](crate::extract::blocks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Title,
    Text,
    List,
    Table,
    Figure,
}

impl BlockType {
    /// Returns the wire representation of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Title => "title",
            BlockType::Text => "text",
            BlockType::List => "list",
            BlockType::Table => "table",
            BlockType::Figure => "figure",
        }
    }
}

/// One recognized line within a block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineRecord {
    /// Line bounding box; the zero box when the engine does not expose one.
    pub bbox: BoundingBox,
    /// The recognized text.
    pub text: String,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f32,
}

/// A normalized content block in reading order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// `"b<n>"`, 1-based; the numeric suffix equals `order`.
    pub id: String,
    /// Contract block type.
    #[serde(rename = "type")]
    pub block_type: BlockType,
    /// Region bounding box in input-image pixel coordinates.
    pub bbox: BoundingBox,
    /// 1-based position in the emitted sequence; strictly increasing and
    /// dense.
    pub order: u32,
    /// Newline-joined block text; empty when the region carried no lines.
    pub text: String,
    /// Mean of line confidences; 0.0 when there are no lines.
    pub confidence: f32,
    /// Per-line records, in recognition order.
    pub lines: Vec<LineRecord>,
}

/// A normalized figure record.
///
/// Every figure is accompanied by a [`Block`] of type `figure` sharing the
/// same bounding box; the contract surfaces the two through separate
/// top-level collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    /// `"f<n>"`, 1-based over figures only.
    pub id: String,
    /// Figure bounding box.
    pub bbox: BoundingBox,
    /// Artifact path under `/outputs/<request_id>/`, or the empty string
    /// when the crop was not persisted. Never null.
    pub image_path: String,
    /// Always null: no caption-association heuristic exists.
    pub caption: Option<String>,
    /// Layout-detection score; defaults to 0.9 when the engine does not
    /// report one.
    pub confidence: f32,
}

/// Pixel dimensions of the decoded input image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Per-stage wall-clock timings in milliseconds, truncated to integers.
///
/// `ocr` is reported as 0: the engine performs OCR inside the layout pass
/// and the split is not measurable. This is a documented placeholder, not
/// an estimate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimingsMs {
    pub preprocess: u64,
    pub layout: u64,
    pub ocr: u64,
    pub crop: u64,
}

/// Request-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    pub request_id: String,
    pub image: ImageSize,
    pub timings_ms: TimingsMs,
}

/// Paths of optional exported artifacts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Exports {
    /// Path of the annotated preview, or null when not rendered.
    pub annotated_image_path: Option<String>,
    /// Path of the reconstructed PDF; present only when PDF export was
    /// requested and succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<String>,
}

/// The full extraction response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResponse {
    pub meta: Meta,
    pub blocks: Vec<Block>,
    pub figures: Vec<Figure>,
    pub exports: Exports,
    /// Messages from downstream stages that failed without aborting the
    /// request (today: PDF export).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_serializes_contract_field_names() {
        let block = Block {
            id: "b1".to_string(),
            block_type: BlockType::Title,
            bbox: BoundingBox::from_coords(10, 20, 30, 40),
            order: 1,
            text: "Chapter One".to_string(),
            confidence: 0.98,
            lines: vec![LineRecord {
                bbox: BoundingBox::ZERO,
                text: "Chapter One".to_string(),
                confidence: 0.98,
            }],
        };

        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "title");
        assert_eq!(value["bbox"], serde_json::json!([10, 20, 30, 40]));
        assert_eq!(value["lines"][0]["bbox"], serde_json::json!([0, 0, 0, 0]));
    }

    #[test]
    fn test_exports_pdf_path_omitted_when_absent() {
        let exports = Exports::default();
        let value = serde_json::to_value(&exports).unwrap();
        assert!(value.get("pdf_path").is_none());
        assert_eq!(value["annotated_image_path"], serde_json::Value::Null);
    }

    #[test]
    fn test_figure_image_path_is_string_not_null() {
        let figure = Figure {
            id: "f1".to_string(),
            bbox: BoundingBox::from_coords(0, 0, 10, 10),
            image_path: String::new(),
            caption: None,
            confidence: 0.9,
        };
        let value = serde_json::to_value(&figure).unwrap();
        assert_eq!(value["image_path"], "");
        assert_eq!(value["caption"], serde_json::Value::Null);
    }
}
