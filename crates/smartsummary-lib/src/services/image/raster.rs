// Rasterization
// Paints a `Layout` onto an RGBA canvas; text goes through a `Rasterizer`

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::RgbaImage;
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, Blend};
use imageproc::rect::Rect;
use std::path::Path;

use super::format::SpanStyle;
use super::layout::{Element, EstimateMeasure, Layout, TextMeasure};
use super::template::{Color, Fill};
use super::RenderError;

pub type Canvas = Blend<RgbaImage>;

/// Text drawing capability; `measure` must agree with what `draw_text` paints
pub trait Rasterizer: TextMeasure + Send + Sync {
    /// Draw `text` with its glyph box top-left at (`x`, `y`), in canvas pixels
    fn draw_text(&self, canvas: &mut Canvas, x: f32, y: f32, px: f32, color: Color, style: SpanStyle, text: &str);
}

/// Renders glyphs from a caller-provided TrueType/OpenType font
#[derive(Clone)]
pub struct GlyphRasterizer {
    regular: FontArc,
    bold: Option<FontArc>,
}

impl GlyphRasterizer {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, RenderError> {
        let regular = FontArc::try_from_vec(bytes).map_err(|e| RenderError::InvalidFont(e.to_string()))?;
        Ok(Self { regular, bold: None })
    }

    pub fn from_file(path: &Path) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path)
            .map_err(|e| RenderError::FontIo(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(bytes)
    }

    /// Use a dedicated bold face instead of the offset double-strike
    pub fn with_bold(mut self, bytes: Vec<u8>) -> Result<Self, RenderError> {
        let bold = FontArc::try_from_vec(bytes).map_err(|e| RenderError::InvalidFont(e.to_string()))?;
        self.bold = Some(bold);
        Ok(self)
    }
}

impl TextMeasure for GlyphRasterizer {
    fn measure(&self, text: &str, px: f32) -> f32 {
        let font = self.regular.as_scaled(PxScale::from(px));
        let mut width = 0.0;
        let mut previous = None;
        for c in text.chars() {
            let id = font.glyph_id(c);
            if let Some(prev) = previous {
                width += font.kern(prev, id);
            }
            width += font.h_advance(id);
            previous = Some(id);
        }
        width
    }
}

impl Rasterizer for GlyphRasterizer {
    fn draw_text(&self, canvas: &mut Canvas, x: f32, y: f32, px: f32, color: Color, style: SpanStyle, text: &str) {
        let scale = PxScale::from(px);
        let (ix, iy) = (x.round() as i32, y.round() as i32);
        match (style, &self.bold) {
            (SpanStyle::Bold, Some(bold)) => draw_text_mut(canvas, color, ix, iy, scale, bold, text),
            (SpanStyle::Bold, None) => {
                let offset = (px / 24.0).round().max(1.0) as i32;
                draw_text_mut(canvas, color, ix, iy, scale, &self.regular, text);
                draw_text_mut(canvas, color, ix + offset, iy, scale, &self.regular, text);
            }
            _ => draw_text_mut(canvas, color, ix, iy, scale, &self.regular, text),
        }
    }
}

/// Draws each text run as a solid bar; for previews and tests without a font
#[derive(Debug, Default, Clone, Copy)]
pub struct WireframeRasterizer;

impl TextMeasure for WireframeRasterizer {
    fn measure(&self, text: &str, px: f32) -> f32 {
        EstimateMeasure.measure(text, px)
    }
}

impl Rasterizer for WireframeRasterizer {
    fn draw_text(&self, canvas: &mut Canvas, x: f32, y: f32, px: f32, color: Color, _style: SpanStyle, text: &str) {
        let width = self.measure(text.trim(), px);
        if let Some(rect) = to_rect(x, y + px * 0.2, width, px * 0.6) {
            draw_filled_rect_mut(canvas, rect, color);
        }
    }
}

fn to_rect(x: f32, y: f32, width: f32, height: f32) -> Option<Rect> {
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    Some(Rect::at(x.round() as i32, y.round() as i32).of_size(width.round().max(1.0) as u32, height.round().max(1.0) as u32))
}

fn lerp(a: Color, b: Color, t: f32) -> Color {
    let mut out = a;
    for (channel, (from, to)) in out.0.iter_mut().zip(a.0.iter().zip(b.0.iter())) {
        *channel = (*from as f32 + (*to as f32 - *from as f32) * t).round() as u8;
    }
    out
}

fn fill_background(image: &mut RgbaImage, fill: Fill) {
    let (width, height) = (image.width().max(1) as f32, image.height().max(1) as f32);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        *pixel = match fill {
            Fill::Solid(color) => color,
            Fill::Gradient(from, to) => lerp(from, to, (x as f32 / width + y as f32 / height) / 2.0),
        };
    }
}

/// Paint `layout` at `pixel_scale` device pixels per logical pixel
pub fn paint(
    layout: &Layout,
    background: Fill,
    rasterizer: &dyn Rasterizer,
    pixel_scale: f32,
) -> Result<RgbaImage, RenderError> {
    let width = (layout.width as f32 * pixel_scale).round() as u32;
    let height = (layout.height as f32 * pixel_scale).round() as u32;
    if width == 0 || height == 0 {
        return Err(RenderError::EmptyCanvas);
    }

    let mut canvas = Blend(RgbaImage::new(width, height));
    fill_background(&mut canvas.0, background);

    let s = pixel_scale;
    for element in &layout.elements {
        match element {
            Element::Rect { x, y, width, height, color } => {
                if let Some(rect) = to_rect(x * s, y * s, width * s, height * s) {
                    draw_filled_rect_mut(&mut canvas, rect, *color);
                }
            }
            Element::Outline { x, y, width, height, color } => {
                if let Some(rect) = to_rect(x * s, y * s, width * s, height * s) {
                    draw_hollow_rect_mut(&mut canvas, rect, *color);
                }
            }
            Element::Text { x, y, px, color, style, text } => {
                if !text.trim().is_empty() {
                    rasterizer.draw_text(&mut canvas, x * s, y * s, px * s, *color, *style, text);
                }
            }
        }
    }

    Ok(canvas.0)
}
