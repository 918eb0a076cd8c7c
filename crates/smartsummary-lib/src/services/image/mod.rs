// Share Image Module
//
// Renders a stored summary onto one of the share templates and encodes it
// as PNG. Formatting and layout are font-independent; only the final
// rasterization needs a `Rasterizer`.

pub mod format;
pub mod layout;
pub mod raster;
pub mod template;

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::sync::Arc;
use thiserror::Error;

use crate::models::SummaryResult;

pub use format::{format_content, FormattedContent};
pub use layout::{layout_summary, EstimateMeasure, Layout, TextMeasure};
pub use raster::{GlyphRasterizer, Rasterizer, WireframeRasterizer};
pub use template::{ImageTemplate, TemplateStyle};

/// Device pixels per layout pixel
pub const DEFAULT_PIXEL_SCALE: f32 = 2.0;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Failed to read font: {0}")]
    FontIo(String),

    #[error("Invalid font data: {0}")]
    InvalidFont(String),

    #[error("Nothing to render: canvas has no area")]
    EmptyCanvas,

    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub template: TemplateStyle,
    pub png: Vec<u8>,
    /// Pixel dimensions of the encoded image
    pub width: u32,
    pub height: u32,
    /// Formatted content as an HTML fragment
    pub html: String,
    pub truncated: bool,
}

impl RenderedImage {
    pub fn file_name(&self, summary: &SummaryResult) -> String {
        format!("smartsummary-{}-{}.png", self.template, summary.timestamp)
    }
}

pub struct ImageRenderer {
    rasterizer: Arc<dyn Rasterizer>,
    pixel_scale: f32,
}

impl ImageRenderer {
    pub fn new(rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self { rasterizer, pixel_scale: DEFAULT_PIXEL_SCALE }
    }

    pub fn with_pixel_scale(mut self, pixel_scale: f32) -> Self {
        self.pixel_scale = pixel_scale;
        self
    }

    pub fn layout(&self, summary: &SummaryResult, template: &ImageTemplate) -> (FormattedContent, Layout) {
        let formatted = format_content(&summary.content, template.char_budget());
        let layout = layout_summary(summary, &formatted, template, self.rasterizer.as_ref());
        (formatted, layout)
    }

    pub fn render(&self, summary: &SummaryResult, template: &ImageTemplate) -> Result<RenderedImage, RenderError> {
        let (formatted, layout) = self.layout(summary, template);
        if formatted.truncated {
            log::debug!(
                "Summary {} truncated to {} chars for template {}",
                summary.id,
                template.char_budget(),
                template.style
            );
        }

        let image = raster::paint(&layout, template.theme().background, self.rasterizer.as_ref(), self.pixel_scale)?;
        let (width, height) = image.dimensions();

        let mut png = Vec::new();
        DynamicImage::ImageRgba8(image).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        log::info!(
            "Rendered summary {} with template {} ({}x{}, {} bytes)",
            summary.id,
            template.style,
            width,
            height,
            png.len()
        );

        Ok(RenderedImage {
            template: template.style,
            png,
            width,
            height,
            html: formatted.html,
            truncated: formatted.truncated,
        })
    }

    pub fn render_by_id(&self, summary: &SummaryResult, template_id: &str) -> Result<RenderedImage, RenderError> {
        let template = ImageTemplate::by_id(template_id)
            .ok_or_else(|| RenderError::UnknownTemplate(template_id.to_string()))?;
        self.render(summary, &template)
    }
}
