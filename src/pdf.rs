//! PDF reconstruction from the finalized block list.
//!
//! Renders blocks as a linear document using printpdf 0.8's data-oriented
//! API: pages are `Vec<Op>` operation lists serialized via
//! `PdfDocument::save()`. The exporter consumes only blocks (not figures
//! or raw regions), so it can run after extraction completes and fail
//! without invalidating the extraction result.
//!
//! Styling is deliberately simple: titles become large bold headings,
//! tables a labeled text dump (no grid reconstruction), figures an italic
//! bracketed line. Figure images are not embedded.

use std::path::Path;

use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, TextItem,
};
use tracing::{debug, info};

use crate::error::PdfExportError;
use crate::extract::response::{Block, BlockType};

// US Letter, matching the service's document reconstruction contract.
const PAGE_WIDTH_MM: f32 = 215.9;
const PAGE_HEIGHT_MM: f32 = 279.4;
const MARGIN_PT: f32 = 72.0;

const BODY_SIZE_PT: f32 = 11.0;
const BODY_LINE_HEIGHT_PT: f32 = 14.0;
const TITLE_SIZE_PT: f32 = 18.0;
const TITLE_LINE_HEIGHT_PT: f32 = 22.0;
const BLOCK_SPACING_PT: f32 = 12.0;

/// One laid-out text line with its style.
struct StyledLine {
    text: String,
    font: BuiltinFont,
    size: f32,
    height: f32,
}

/// Renders extraction blocks into a sequential PDF document.
pub struct PdfExporter;

impl PdfExporter {
    pub fn new() -> Self {
        Self
    }

    /// Renders the block list and writes the document to `destination`.
    pub fn export(&self, blocks: &[Block], destination: &Path) -> Result<(), PdfExportError> {
        let bytes = self.render(blocks)?;
        std::fs::write(destination, &bytes).map_err(|source| PdfExportError::Write {
            path: destination.to_path_buf(),
            source,
        })?;
        info!(
            blocks = blocks.len(),
            path = %destination.display(),
            "PDF export complete"
        );
        Ok(())
    }

    /// Renders the block list into PDF bytes.
    pub fn render(&self, blocks: &[Block]) -> Result<Vec<u8>, PdfExportError> {
        let page_w = Mm(PAGE_WIDTH_MM);
        let page_h = Mm(PAGE_HEIGHT_MM);
        let page_h_pt = page_h.into_pt().0;
        let usable_width_pt = page_w.into_pt().0 - 2.0 * MARGIN_PT;

        let mut styled: Vec<StyledLine> = Vec::new();
        for block in blocks {
            styled.extend(layout_block(block, usable_width_pt));
            styled.push(StyledLine {
                text: String::new(),
                font: BuiltinFont::Helvetica,
                size: BODY_SIZE_PT,
                height: BLOCK_SPACING_PT,
            });
        }

        let mut doc = PdfDocument::new("Extracted Page");
        let mut pages: Vec<PdfPage> = Vec::new();
        let mut ops: Vec<Op> = Vec::new();
        let mut y_pt = page_h_pt - MARGIN_PT;

        for line in &styled {
            if y_pt - line.height < MARGIN_PT {
                pages.push(PdfPage::new(page_w, page_h, std::mem::take(&mut ops)));
                y_pt = page_h_pt - MARGIN_PT;
            }
            y_pt -= line.height;

            if line.text.is_empty() {
                continue;
            }

            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt(MARGIN_PT),
                    y: Pt(y_pt),
                },
            });
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(line.size),
                font: line.font,
            });
            ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(line.text.clone())],
                font: line.font,
            });
            ops.push(Op::EndTextSection);
        }

        pages.push(PdfPage::new(page_w, page_h, ops));
        doc.with_pages(pages);

        debug!(lines = styled.len(), pages = doc.pages.len(), "PDF layout complete");

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        Ok(doc.save(&PdfSaveOptions::default(), &mut warnings))
    }
}

impl Default for PdfExporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Lays out one block as styled lines, wrapping to the usable width.
///
/// Newlines inside the block text become explicit line breaks.
fn layout_block(block: &Block, usable_width_pt: f32) -> Vec<StyledLine> {
    let (font, size, height, text) = match block.block_type {
        BlockType::Title => (
            BuiltinFont::HelveticaBold,
            TITLE_SIZE_PT,
            TITLE_LINE_HEIGHT_PT,
            block.text.clone(),
        ),
        BlockType::Figure => (
            BuiltinFont::HelveticaOblique,
            BODY_SIZE_PT,
            BODY_LINE_HEIGHT_PT,
            format!("[Figure: {}]", block.text),
        ),
        BlockType::Table => (
            BuiltinFont::Helvetica,
            BODY_SIZE_PT,
            BODY_LINE_HEIGHT_PT,
            format!("[Table]\n{}", block.text),
        ),
        BlockType::Text | BlockType::List => (
            BuiltinFont::Helvetica,
            BODY_SIZE_PT,
            BODY_LINE_HEIGHT_PT,
            block.text.clone(),
        ),
    };

    // Approximate Helvetica glyph width as half the font size.
    let max_chars = ((usable_width_pt / (0.5 * size)) as usize).max(1);

    wrap_text(&text, max_chars)
        .into_iter()
        .map(|line| StyledLine {
            text: line,
            font,
            size,
            height,
        })
        .collect()
}

/// Wraps a multi-line string so no line exceeds `max_width` characters.
///
/// Splits on existing newlines first, then word-wraps each paragraph.
/// Words longer than `max_width` are force-broken.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut result = Vec::new();

    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            result.push(String::new());
            continue;
        }

        let mut current = String::with_capacity(max_width);
        for word in words {
            if word.len() > max_width {
                if !current.is_empty() {
                    result.push(std::mem::take(&mut current));
                }
                let mut remaining = word;
                while remaining.len() > max_width {
                    let (chunk, rest) = remaining.split_at(max_width);
                    result.push(chunk.to_string());
                    remaining = rest;
                }
                current.push_str(remaining);
            } else if current.is_empty() {
                current.push_str(word);
            } else if current.len() + 1 + word.len() <= max_width {
                current.push(' ');
                current.push_str(word);
            } else {
                result.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }

        if !current.is_empty() {
            result.push(current);
        }
    }

    result
}
