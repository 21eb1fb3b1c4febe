//! Geometric primitives for layout regions.
//!
//! Layout elements on a page are axis-aligned rectangles in the pixel
//! coordinate system of the decoded input image. On the wire a box is the
//! contract's `[x1, y1, x2, y2]` array form.

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in pixel coordinates.
///
/// Invariant for detected regions: `x1 < x2` and `y1 < y2`. The zero box
/// (`[0, 0, 0, 0]`) is used as a documented placeholder where a real box
/// is not available, e.g. per-line boxes an engine does not expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BoundingBox {
    /// X-coordinate of the left edge.
    pub x1: i32,
    /// Y-coordinate of the top edge.
    pub y1: i32,
    /// X-coordinate of the right edge.
    pub x2: i32,
    /// Y-coordinate of the bottom edge.
    pub y2: i32,
}

impl BoundingBox {
    /// The placeholder zero box.
    pub const ZERO: BoundingBox = BoundingBox {
        x1: 0,
        y1: 0,
        x2: 0,
        y2: 0,
    };

    /// Creates a bounding box from corner coordinates.
    pub fn from_coords(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Creates a bounding box from floating-point model coordinates,
    /// rounding to the nearest pixel.
    pub fn from_model_coords(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1.round() as i32,
            y1: y1.round() as i32,
            x2: x2.round() as i32,
            y2: y2.round() as i32,
        }
    }

    /// Y-coordinate of the top edge; the sort key for reading order.
    pub fn top(&self) -> i32 {
        self.y1
    }

    /// Width in pixels (zero for degenerate boxes).
    pub fn width(&self) -> u32 {
        (self.x2 - self.x1).max(0) as u32
    }

    /// Height in pixels (zero for degenerate boxes).
    pub fn height(&self) -> u32 {
        (self.y2 - self.y1).max(0) as u32
    }

    /// Returns true if the box has no area.
    pub fn is_empty(&self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    /// Clamps the box to an image of the given dimensions.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        Self {
            x1: self.x1.clamp(0, width as i32),
            y1: self.y1.clamp(0, height as i32),
            x2: self.x2.clamp(0, width as i32),
            y2: self.y2.clamp(0, height as i32),
        }
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from(v: [i32; 4]) -> Self {
        Self {
            x1: v[0],
            y1: v[1],
            x2: v[2],
            y2: v[3],
        }
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_dimensions() {
        let bbox = BoundingBox::from_coords(10, 20, 110, 80);
        assert_eq!(bbox.top(), 20);
        assert_eq!(bbox.width(), 100);
        assert_eq!(bbox.height(), 60);
        assert!(!bbox.is_empty());
    }

    #[test]
    fn test_zero_box_is_empty() {
        assert!(BoundingBox::ZERO.is_empty());
        assert_eq!(BoundingBox::ZERO.width(), 0);
        assert_eq!(BoundingBox::ZERO.height(), 0);
    }

    #[test]
    fn test_from_model_coords_rounds() {
        let bbox = BoundingBox::from_model_coords(10.4, 19.6, 110.5, 79.9);
        assert_eq!(bbox, BoundingBox::from_coords(10, 20, 111, 80));
    }

    #[test]
    fn test_clamp_to_image() {
        let bbox = BoundingBox::from_coords(-5, 10, 650, 700);
        let clamped = bbox.clamp_to(640, 480);
        assert_eq!(clamped, BoundingBox::from_coords(0, 10, 640, 480));
    }

    #[test]
    fn test_serializes_as_array() {
        let bbox = BoundingBox::from_coords(1, 2, 3, 4);
        let json = serde_json::to_string(&bbox).unwrap();
        assert_eq!(json, "[1,2,3,4]");

        let back: BoundingBox = serde_json::from_str("[1,2,3,4]").unwrap();
        assert_eq!(back, bbox);
    }
}
