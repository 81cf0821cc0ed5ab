//! Local meme rendering: word wrapping, caption placement and compositing.
//!
//! Everything between fetching the template and encoding the result is a
//! pure function of the slot texts, the image size and the glyph metrics.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use tracing::debug;
use url::Url;

use crate::catalog::Template;
use crate::constants::{
    BOTTOM_ANCHOR_RATIO, FONT_WIDTH_DIVISOR, JPEG_QUALITY, LINE_HEIGHT_RATIO,
    MAX_LINE_WIDTH_RATIO, MIN_FONT_SIZE, SLOT_COUNT,
};
use crate::error::MemeError;
use crate::render::{MemeImage, Renderer};

/// Which of the two passes a caption line is being drawn in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PaintPass {
    /// Dark outline, drawn first.
    Stroke {
        /// Outline width in pixels.
        width: f32,
    },
    /// Light glyph body, drawn over the stroke.
    Fill,
}

/// Measures and draws text. Implemented by [`crate::font::FontPainter`].
pub trait GlyphPainter {
    /// Width in pixels of `text` set at `font_size`.
    fn measure(&self, text: &str, font_size: f32) -> f32;

    /// Draw `text` with its left edge at `left` and its baseline at `baseline`.
    fn paint(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        left: f32,
        baseline: f32,
        font_size: f32,
        pass: PaintPass,
    );
}

/// Size-derived layout numbers for one image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutMetrics {
    /// Caption font size in pixels.
    pub font_size: f32,
    /// Outline width in pixels.
    pub stroke_width: f32,
    /// Widest a wrapped line may measure.
    pub max_line_width: f32,
    /// Distance between consecutive baselines.
    pub line_height: f32,
}

impl LayoutMetrics {
    /// Font size scales with width only; height plays no part.
    pub fn for_width(width: u32) -> Self {
        let font_size = (width as f32 / FONT_WIDTH_DIVISOR).floor().max(MIN_FONT_SIZE);
        Self {
            font_size,
            stroke_width: font_size / 6.0,
            max_line_width: width as f32 * MAX_LINE_WIDTH_RATIO,
            line_height: font_size * LINE_HEIGHT_RATIO,
        }
    }
}

/// One wrapped caption row and where it goes.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedLine {
    /// Which slot the line came from.
    pub slot: usize,
    /// Uppercased line text.
    pub text: String,
    /// Horizontal centre of the line.
    pub center_x: f32,
    /// Baseline y coordinate.
    pub baseline: f32,
}

/// Uppercases `text` and greedily packs its words into lines no wider than
/// `max_width`. A word wider than `max_width` gets a line of its own and is
/// never split.
pub fn wrap_text<P: GlyphPainter + ?Sized>(
    painter: &P,
    text: &str,
    font_size: f32,
    max_width: f32,
) -> Vec<String> {
    let upper = text.to_uppercase();
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in upper.split_whitespace() {
        if current_line.is_empty() {
            current_line.push_str(word);
            continue;
        }
        let candidate = format!("{current_line} {word}");
        if painter.measure(&candidate, font_size) > max_width {
            lines.push(std::mem::replace(&mut current_line, word.to_string()));
        } else {
            current_line = candidate;
        }
    }
    if !current_line.is_empty() {
        lines.push(current_line);
    }
    lines
}

/// Wraps every slot the template uses and assigns each line a baseline.
///
/// - slot 0 starts one line height down and grows downward
/// - slot 1 has a single anchor just above the bottom edge; extra lines stack
///   upward from it and are not kept clear of slot 0
/// - slots 2 and 3 are spread over rows between top and bottom
pub fn layout_lines<P: GlyphPainter + ?Sized>(
    painter: &P,
    width: u32,
    height: u32,
    template: &Template,
    texts: &[String; SLOT_COUNT],
) -> Vec<PlacedLine> {
    let metrics = LayoutMetrics::for_width(width);
    let center_x = width as f32 / 2.0;
    let extra_slots = usize::from(template.slot_count).saturating_sub(2);
    let mut placed = Vec::new();

    for (slot, text) in texts.iter().enumerate() {
        if !template.uses_slot(slot) || text.trim().is_empty() {
            continue;
        }
        let lines = wrap_text(painter, text, metrics.font_size, metrics.max_line_width);
        let count = lines.len() as f32;
        let first_baseline = match slot {
            0 => metrics.line_height,
            1 => {
                let anchor = height as f32 - BOTTOM_ANCHOR_RATIO * metrics.font_size;
                anchor - (count - 1.0) * metrics.line_height
            }
            _ => {
                let row = (slot - 1) as f32 / (extra_slots + 1) as f32 * height as f32;
                // cap height is roughly 0.7em, so this centres the block on the row
                row + 0.35 * metrics.font_size - (count - 1.0) * metrics.line_height / 2.0
            }
        };
        for (index, text) in lines.into_iter().enumerate() {
            placed.push(PlacedLine {
                slot,
                text,
                center_x,
                baseline: first_baseline + index as f32 * metrics.line_height,
            });
        }
    }
    placed
}

/// Draws `lines` onto a copy of `source`, stroke first and fill second, both
/// at the same spot.
pub fn composite<P: GlyphPainter + ?Sized>(
    painter: &P,
    source: &DynamicImage,
    lines: &[PlacedLine],
) -> RgbaImage {
    let mut canvas = source.to_rgba8();
    let metrics = LayoutMetrics::for_width(canvas.width());
    for line in lines {
        let left = line.center_x - painter.measure(&line.text, metrics.font_size) / 2.0;
        painter.paint(
            &mut canvas,
            &line.text,
            left,
            line.baseline,
            metrics.font_size,
            PaintPass::Stroke {
                width: metrics.stroke_width,
            },
        );
        painter.paint(
            &mut canvas,
            &line.text,
            left,
            line.baseline,
            metrics.font_size,
            PaintPass::Fill,
        );
    }
    canvas
}

/// Encodes the canvas as a JPEG at [`JPEG_QUALITY`].
pub fn encode_jpeg(canvas: &RgbaImage) -> Result<Vec<u8>, MemeError> {
    let rgb = DynamicImage::ImageRgba8(canvas.clone()).to_rgb8();
    let mut output = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut output, JPEG_QUALITY);
    encoder
        .encode_image(&rgb)
        .map_err(|err| MemeError::ImageEncode(err.to_string()))?;
    Ok(output)
}

/// Decodes image bytes, guessing the format.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, MemeError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| MemeError::ImageLoad(format!("failed to guess image format: {err}")))?;
    Ok(reader.decode()?)
}

/// Fetches a template raster from an `http`, `https` or `file` URL.
pub async fn fetch_template_image(
    client: &reqwest::Client,
    url: &Url,
) -> Result<DynamicImage, MemeError> {
    let bytes = match url.scheme() {
        "http" | "https" => {
            let resp = client
                .get(url.clone())
                .send()
                .await
                .map_err(|err| MemeError::ImageLoad(format!("request to {url} failed: {err}")))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(MemeError::ImageLoad(format!("{url} returned {status}")));
            }
            resp.bytes()
                .await
                .map_err(|err| MemeError::ImageLoad(format!("failed reading {url}: {err}")))?
                .to_vec()
        }
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| MemeError::ImageLoad(format!("not a local path: {url}")))?;
            tokio::fs::read(&path).await?
        }
        scheme => {
            return Err(MemeError::ImageLoad(format!(
                "unsupported URL scheme {scheme} for {url}"
            )));
        }
    };
    debug!("Fetched {} bytes from {}", bytes.len(), url);
    decode_image(&bytes)
}

/// Renders memes locally by compositing captions onto the template image.
#[derive(Clone, Debug)]
pub struct LayoutEngine<P> {
    client: reqwest::Client,
    painter: P,
}

impl<P: GlyphPainter> LayoutEngine<P> {
    /// Engine drawing with `painter`, fetching templates with `client`.
    pub fn new(client: reqwest::Client, painter: P) -> Self {
        Self { client, painter }
    }

    /// The painter captions are drawn with.
    pub fn painter(&self) -> &P {
        &self.painter
    }

    /// Lays out and draws the captions onto an already decoded template.
    pub fn compose(
        &self,
        source: &DynamicImage,
        template: &Template,
        texts: &[String; SLOT_COUNT],
    ) -> RgbaImage {
        let lines = layout_lines(
            &self.painter,
            source.width(),
            source.height(),
            template,
            texts,
        );
        debug!(
            "Placing {} caption lines on {}x{} \"{}\"",
            lines.len(),
            source.width(),
            source.height(),
            template.name
        );
        composite(&self.painter, source, &lines)
    }
}

impl<P: GlyphPainter + Sync> Renderer for LayoutEngine<P> {
    async fn render(
        &self,
        template: &Template,
        texts: &[String; SLOT_COUNT],
    ) -> Result<MemeImage, MemeError> {
        let source = fetch_template_image(&self.client, &template.image_url).await?;
        let canvas = self.compose(&source, template, texts);
        let bytes = encode_jpeg(&canvas)?;
        Ok(MemeImage::Encoded {
            mime: "image/jpeg",
            bytes,
        })
    }
}
