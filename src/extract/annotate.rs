//! Annotated preview rendering.
//!
//! Draws every block's bounding box and identifier over a copy of the
//! decoded input image. The input is never mutated.

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::debug;

use crate::extract::response::Block;

const BBOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const BBOX_THICKNESS: i32 = 2;

const LABEL_SCALE: f32 = 16.0;

/// Styling for the annotated preview.
///
/// Identifier labels need a font; when none can be loaded the preview is
/// still rendered with boxes only.
pub struct AnnotationStyle {
    /// Font used for block-id labels. `None` skips label rendering.
    pub font: Option<FontVec>,
}

impl AnnotationStyle {
    /// Attempts to load a system font from common locations, falling back
    /// to box-only rendering when none is found.
    pub fn with_system_font() -> Self {
        let font_paths = [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/System/Library/Fonts/Supplemental/Arial.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ];

        for path in &font_paths {
            if let Ok(font_data) = std::fs::read(path)
                && let Ok(font) = FontVec::try_from_vec(font_data)
            {
                debug!("Loaded annotation font: {}", path);
                return Self { font: Some(font) };
            }
        }

        debug!("No system font found, block ids will not be drawn");
        Self { font: None }
    }
}

/// Renders the annotated preview: one hollow rectangle per block plus its
/// id near the top-left corner.
pub fn render_annotated(image: &RgbImage, blocks: &[Block], style: &AnnotationStyle) -> RgbImage {
    let mut preview = image.clone();
    let (img_w, img_h) = (preview.width() as i32, preview.height() as i32);

    for block in blocks {
        let bbox = &block.bbox;
        if bbox.is_empty() {
            continue;
        }

        for thickness in 0..BBOX_THICKNESS {
            let rect = Rect::at(bbox.x1 - thickness, bbox.y1 - thickness).of_size(
                bbox.width() + (2 * thickness) as u32,
                bbox.height() + (2 * thickness) as u32,
            );
            if rect.left() >= 0
                && rect.top() >= 0
                && rect.left() + rect.width() as i32 <= img_w
                && rect.top() + rect.height() as i32 <= img_h
            {
                draw_hollow_rect_mut(&mut preview, rect, BBOX_COLOR);
            }
        }

        if let Some(font) = &style.font {
            // Label sits just above the box, clamped into the image.
            let label_y = (bbox.y1 - LABEL_SCALE as i32 - 2).max(0);
            let label_x = bbox.x1.max(0);
            draw_text_mut(
                &mut preview,
                BBOX_COLOR,
                label_x,
                label_y,
                PxScale::from(LABEL_SCALE),
                font,
                &block.id,
            );
        }
    }

    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::response::BlockType;
    use crate::geometry::BoundingBox;

    fn block(id: &str, bbox: BoundingBox) -> Block {
        Block {
            id: id.to_string(),
            block_type: BlockType::Text,
            bbox,
            order: 1,
            text: String::new(),
            confidence: 0.0,
            lines: Vec::new(),
        }
    }

    #[test]
    fn test_render_preserves_dimensions_and_input() {
        let image = RgbImage::from_pixel(64, 48, Rgb([255, 255, 255]));
        let blocks = vec![block("b1", BoundingBox::from_coords(10, 10, 40, 30))];

        let preview = render_annotated(&image, &blocks, &AnnotationStyle { font: None });

        assert_eq!(preview.dimensions(), (64, 48));
        // Input untouched, box drawn on the copy.
        assert_eq!(image.get_pixel(10, 10), &Rgb([255, 255, 255]));
        assert_eq!(preview.get_pixel(10, 10), &BBOX_COLOR);
    }

    #[test]
    fn test_render_skips_degenerate_boxes() {
        let image = RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]));
        let blocks = vec![block("b1", BoundingBox::ZERO)];

        let preview = render_annotated(&image, &blocks, &AnnotationStyle { font: None });
        assert_eq!(preview.as_raw(), image.as_raw());
    }
}
