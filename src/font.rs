//! TrueType-backed [`GlyphPainter`].

use std::path::Path;

use ab_glyph::{Font, FontVec, InvalidFont, PxScale, ScaleFont};
use anyhow::Context;
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;

use crate::layout::{GlyphPainter, PaintPass};

const STROKE_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);
const FILL_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Paints captions with a loaded font: black outline, white body.
pub struct FontPainter {
    font: FontVec,
}

impl std::fmt::Debug for FontPainter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontPainter")
            .field("glyphs", &self.font.glyph_count())
            .finish()
    }
}

impl FontPainter {
    /// Parse a TrueType or OpenType font.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, InvalidFont> {
        Ok(Self {
            font: FontVec::try_from_vec(bytes)?,
        })
    }

    /// Read and parse a font file, eg Impact or Anton.
    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read font {}", path.display()))?;
        Self::from_bytes(bytes).with_context(|| format!("Failed to parse font {}", path.display()))
    }

    fn draw(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        x: i32,
        y: i32,
        scale: PxScale,
        color: Rgba<u8>,
    ) {
        draw_text_mut(canvas, color, x, y, scale, &self.font, text);
    }
}

impl GlyphPainter for FontPainter {
    fn measure(&self, text: &str, font_size: f32) -> f32 {
        let scaled = self.font.as_scaled(PxScale::from(font_size));
        let mut width = 0.0f32;
        let mut prev = None;
        for c in text.chars() {
            let glyph_id = scaled.glyph_id(c);
            if let Some(prev_id) = prev {
                width += scaled.kern(prev_id, glyph_id);
            }
            width += scaled.h_advance(glyph_id);
            prev = Some(glyph_id);
        }
        width
    }

    fn paint(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        left: f32,
        baseline: f32,
        font_size: f32,
        pass: PaintPass,
    ) {
        let scale = PxScale::from(font_size);
        // draw_text_mut takes the top of the line box, not the baseline
        let top = (baseline - self.font.as_scaled(scale).ascent()).round() as i32;
        let left = left.round() as i32;

        match pass {
            PaintPass::Fill => self.draw(canvas, text, left, top, scale, FILL_COLOR),
            PaintPass::Stroke { width } => {
                let radius = (width / 2.0).max(1.0);
                let reach = radius.ceil() as i32;
                for dy in -reach..=reach {
                    for dx in -reach..=reach {
                        if ((dx * dx + dy * dy) as f32) > radius * radius {
                            continue;
                        }
                        self.draw(canvas, text, left + dx, top + dy, scale, STROKE_COLOR);
                    }
                }
            }
        }
    }
}
