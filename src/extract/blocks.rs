//! Region classification, text aggregation, and reading-order sequencing.

use crate::engine::{RawRegion, RecognizedLine};
use crate::extract::response::{BlockType, LineRecord};
use crate::geometry::BoundingBox;

impl BlockType {
    /// Maps an engine-native type label onto the contract type set.
    ///
    /// The mapping is case-insensitive and closed: `figure`, `table`,
    /// `title` and `list` map to themselves, everything else (text,
    /// header, footer, reference, equation, unknown labels, ...) folds
    /// into [`BlockType::Text`].
    pub fn from_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "figure" => BlockType::Figure,
            "table" => BlockType::Table,
            "title" => BlockType::Title,
            "list" => BlockType::List,
            _ => BlockType::Text,
        }
    }
}

/// Orders regions for emission: ascending top edge of the bounding box.
///
/// The sort is stable, so regions with equal top edges keep the engine's
/// emission order. True multi-column reading order is a non-goal.
pub fn sort_by_reading_order(regions: &mut [RawRegion]) {
    regions.sort_by_key(|region| region.bbox.top());
}

/// Aggregated text content of one region.
pub struct AggregatedText {
    /// Lines joined with `\n`; empty when the region carried no lines.
    pub text: String,
    /// Arithmetic mean of line confidences; 0.0 when there are no lines.
    pub confidence: f32,
    /// One record per recognized line.
    pub lines: Vec<LineRecord>,
}

/// Collapses a region's recognized lines into block-level text.
pub fn aggregate_lines(lines: &[RecognizedLine]) -> AggregatedText {
    if lines.is_empty() {
        return AggregatedText {
            text: String::new(),
            confidence: 0.0,
            lines: Vec::new(),
        };
    }

    let text = lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let confidence = lines.iter().map(|line| line.confidence).sum::<f32>() / lines.len() as f32;

    let lines = lines
        .iter()
        .map(|line| LineRecord {
            bbox: line.bbox.unwrap_or(BoundingBox::ZERO),
            text: line.text.clone(),
            confidence: line.confidence,
        })
        .collect();

    AggregatedText {
        text,
        confidence,
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_mapping_table() {
        assert_eq!(BlockType::from_label("figure"), BlockType::Figure);
        assert_eq!(BlockType::from_label("table"), BlockType::Table);
        assert_eq!(BlockType::from_label("title"), BlockType::Title);
        assert_eq!(BlockType::from_label("list"), BlockType::List);
        assert_eq!(BlockType::from_label("text"), BlockType::Text);
    }

    #[test]
    fn test_unknown_labels_default_to_text() {
        for label in ["header", "footer", "reference", "equation", "seal", ""] {
            assert_eq!(BlockType::from_label(label), BlockType::Text, "{label}");
        }
    }

    #[test]
    fn test_label_mapping_is_case_insensitive() {
        assert_eq!(BlockType::from_label("Figure"), BlockType::Figure);
        assert_eq!(BlockType::from_label("TITLE"), BlockType::Title);
    }

    #[test]
    fn test_aggregate_lines_joins_and_averages() {
        let lines = vec![
            RecognizedLine::new("Hello World", 0.99),
            RecognizedLine::new("Line 2", 0.95),
        ];
        let agg = aggregate_lines(&lines);
        assert_eq!(agg.text, "Hello World\nLine 2");
        assert!((agg.confidence - 0.97).abs() < 1e-4);
        assert_eq!(agg.lines.len(), 2);
        assert_eq!(agg.lines[0].bbox, BoundingBox::ZERO);
    }

    #[test]
    fn test_aggregate_empty_lines() {
        let agg = aggregate_lines(&[]);
        assert_eq!(agg.text, "");
        assert_eq!(agg.confidence, 0.0);
        assert!(agg.lines.is_empty());
    }

    #[test]
    fn test_line_bbox_passes_through_when_present() {
        let mut line = RecognizedLine::new("x", 1.0);
        line.bbox = Some(BoundingBox::from_coords(1, 2, 3, 4));
        let agg = aggregate_lines(&[line]);
        assert_eq!(agg.lines[0].bbox, BoundingBox::from_coords(1, 2, 3, 4));
    }

    #[test]
    fn test_sort_by_reading_order_is_stable() {
        let mut regions = vec![
            RawRegion::new("text", BoundingBox::from_coords(0, 300, 10, 310)),
            RawRegion::new("title", BoundingBox::from_coords(0, 10, 10, 20)),
            // Two regions sharing a top edge: emission order must hold.
            RawRegion::new("left", BoundingBox::from_coords(0, 100, 10, 110)),
            RawRegion::new("right", BoundingBox::from_coords(20, 100, 30, 110)),
        ];
        sort_by_reading_order(&mut regions);

        let labels: Vec<&str> = regions.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["title", "left", "right", "text"]);
    }
}
