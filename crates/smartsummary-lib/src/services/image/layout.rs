// Share-image layout
//
// Positions the heading, title, formatted content, rule and footer of a
// template in logical pixels, wrapping text against a `TextMeasure`. The
// canvas height follows the content: natural height plus a 50 px buffer,
// clamped to [400, template max height].

use chrono::{Local, TimeZone};

use super::format::{Block, FormattedContent, Span, SpanStyle};
use super::template::{Color, FooterDetail, ImageTemplate, Theme};
use crate::models::SummaryResult;

pub const MIN_HEIGHT: u32 = 400;
pub const HEIGHT_BUFFER: f32 = 50.0;

const HEADING_PX: f32 = 20.0;
const SECTION_MARGIN: f32 = 20.0;
const FOOTER_LINE_HEIGHT: f32 = 1.4;

pub trait TextMeasure {
    /// Advance width of `text` set at `px`
    fn measure(&self, text: &str, px: f32) -> f32;
}

/// Font-free width estimate: wide (CJK, fullwidth) chars take 1em, others 0.55em
#[derive(Debug, Default, Clone, Copy)]
pub struct EstimateMeasure;

impl TextMeasure for EstimateMeasure {
    fn measure(&self, text: &str, px: f32) -> f32 {
        text.chars()
            .map(|c| if is_wide(c) { 1.0 } else { 0.55 })
            .sum::<f32>()
            * px
    }
}

pub fn is_wide(c: char) -> bool {
    matches!(
        c as u32,
        0x1100..=0x115F
            | 0x2E80..=0xA4CF
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Rect { x: f32, y: f32, width: f32, height: f32, color: Color },
    Outline { x: f32, y: f32, width: f32, height: f32, color: Color },
    /// `y` is the top of the glyph box
    Text { x: f32, y: f32, px: f32, color: Color, style: SpanStyle, text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
    /// Height the content needs before the buffer and clamp
    pub natural_height: f32,
    pub elements: Vec<Element>,
}

impl Layout {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|element| match element {
            Element::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// A styled piece of one wrapped line
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub x: f32,
    pub text: String,
    pub style: SpanStyle,
}

/// Splits text into wrap units: each wide char alone, narrow words with their trailing whitespace
fn wrap_units(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        let end = i + c.len_utf8();
        if is_wide(c) {
            if let Some(s) = start.take() {
                units.push(&text[s..i]);
            }
            units.push(&text[i..end]);
        } else if c.is_whitespace() {
            let s = start.take().unwrap_or(i);
            units.push(&text[s..end]);
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        units.push(&text[s..]);
    }
    units
}

/// Greedy line wrapping of styled spans within `max_width`
pub fn wrap_spans(spans: &[Span], px: f32, max_width: f32, measure: &dyn TextMeasure) -> Vec<Vec<Run>> {
    let mut lines: Vec<Vec<Run>> = vec![Vec::new()];
    let mut x = 0.0_f32;

    for span in spans {
        for unit in wrap_units(&span.text) {
            let width = measure.measure(unit, px);
            if x > 0.0 && x + width > max_width {
                lines.push(Vec::new());
                x = 0.0;
            }
            if x == 0.0 && unit.trim().is_empty() {
                continue;
            }

            let Some(line) = lines.last_mut() else { continue };
            match line.last_mut() {
                Some(run) if run.style == span.style => run.text.push_str(unit),
                _ => line.push(Run { x, text: unit.to_string(), style: span.style }),
            }
            x += width;
        }
    }

    lines
}

struct Cursor<'a> {
    measure: &'a dyn TextMeasure,
    theme: &'a Theme,
    left: f32,
    text_width: f32,
    y: f32,
    elements: Vec<Element>,
}

impl Cursor<'_> {
    fn push_lines(&mut self, lines: Vec<Vec<Run>>, indent: f32, px: f32, line_height: f32, color: Color) {
        for line in lines {
            for run in line {
                let x = self.left + indent + run.x;
                if run.style == SpanStyle::Code {
                    self.elements.push(Element::Rect {
                        x,
                        y: self.y,
                        width: self.measure.measure(&run.text, px),
                        height: line_height,
                        color: self.theme.code_background,
                    });
                }
                self.elements.push(Element::Text {
                    x,
                    y: self.y + (line_height - px) / 2.0,
                    px,
                    color,
                    style: run.style,
                    text: run.text.trim_end().to_string(),
                });
            }
            self.y += line_height;
        }
    }

    fn paragraph(&mut self, spans: &[Span], px: f32, line_height: f32, color: Color) {
        let lines = wrap_spans(spans, px, self.text_width, self.measure);
        self.push_lines(lines, 0.0, px, line_height, color);
    }

    fn list_item(&mut self, marker: &str, spans: &[Span], px: f32, line_height: f32, color: Color) {
        let indent = self.measure.measure(&format!("{} ", marker), px);
        self.elements.push(Element::Text {
            x: self.left,
            y: self.y + (line_height - px) / 2.0,
            px,
            color,
            style: SpanStyle::Plain,
            text: marker.to_string(),
        });
        let lines = wrap_spans(spans, px, (self.text_width - indent).max(px), self.measure);
        self.push_lines(lines, indent, px, line_height, color);
    }

    fn rule(&mut self, thickness: f32, color: Color) {
        self.elements.push(Element::Rect {
            x: self.left,
            y: self.y,
            width: self.text_width,
            height: thickness.max(1.0),
            color,
        });
        self.y += thickness;
    }
}

fn footer_detail(summary: &SummaryResult, detail: FooterDetail) -> String {
    let when = Local.timestamp_millis_opt(summary.timestamp).single();
    match (detail, when) {
        (FooterDetail::WordCount, _) => format!("{} 字", summary.word_count),
        (FooterDetail::Date, Some(when)) => when.format("%Y/%-m/%-d").to_string(),
        (FooterDetail::DateTime, Some(when)) => when.format("%Y/%-m/%-d %H:%M:%S").to_string(),
        (_, None) => String::new(),
    }
}

/// Lay out `summary` on `template` using already formatted content
pub fn layout_summary(
    summary: &SummaryResult,
    content: &FormattedContent,
    template: &ImageTemplate,
    measure: &dyn TextMeasure,
) -> Layout {
    let theme = template.theme();
    let scale = template.scale();
    let width = template.width as f32;
    let margin = theme.outer_margin * scale;
    let accent = theme.card_accent.map_or(0.0, |(_, w)| w * scale);
    let inset = margin + theme.inner_padding * scale;
    let left = inset + accent;
    let text_width = (width - left - inset).max(1.0);
    let section = SECTION_MARGIN * scale;

    let mut cursor = Cursor {
        measure,
        theme: &theme,
        left,
        text_width,
        y: inset,
        elements: Vec::new(),
    };

    if let Some(heading) = theme.heading {
        let px = HEADING_PX * scale;
        let heading_width = measure.measure(heading, px);
        cursor.elements.push(Element::Text {
            x: left + ((text_width - heading_width) / 2.0).max(0.0),
            y: cursor.y,
            px,
            color: theme.title_color,
            style: SpanStyle::Bold,
            text: heading.to_string(),
        });
        cursor.y += px * theme.title_line_height + section;
        cursor.rule(2.0 * scale, theme.title_color);
        cursor.y += section;
    }

    let title_px = theme.title_px * scale;
    cursor.paragraph(
        &[Span::new(summary.title.trim(), SpanStyle::Bold)],
        title_px,
        title_px * theme.title_line_height,
        theme.title_color,
    );
    cursor.y += section;

    let content_px = theme.content_px * scale;
    let line_height = content_px * theme.content_line_height;
    for block in &content.blocks {
        match block {
            Block::Break => cursor.y += content_px * 0.5,
            Block::Paragraph(spans) => cursor.paragraph(spans, content_px, line_height, theme.text_color),
            Block::ListItem { marker, spans } => {
                cursor.list_item(marker, spans, content_px, line_height, theme.text_color)
            }
        }
    }
    if let Some(trailer) = theme.trailer {
        cursor.y += content_px * 0.5;
        cursor.paragraph(&[Span::plain(trailer)], content_px, line_height, theme.text_color);
    }
    cursor.y += section;

    cursor.rule(theme.rule_width * scale, theme.rule_color);
    cursor.y += section;

    let meta_px = theme.meta_px * scale;
    let footer_top = cursor.y;
    cursor.elements.push(Element::Text {
        x: left,
        y: footer_top,
        px: meta_px,
        color: theme.meta_color,
        style: SpanStyle::Plain,
        text: theme.footer_label.to_string(),
    });
    let detail = footer_detail(summary, theme.footer_detail);
    if !detail.is_empty() {
        cursor.elements.push(Element::Text {
            x: left + text_width - measure.measure(&detail, meta_px),
            y: footer_top,
            px: meta_px,
            color: theme.meta_color,
            style: SpanStyle::Plain,
            text: detail,
        });
    }
    cursor.y += meta_px * FOOTER_LINE_HEIGHT + inset;

    let natural_height = cursor.y;
    let height = ((natural_height + HEIGHT_BUFFER).ceil() as u32).clamp(MIN_HEIGHT, template.max_height());

    let mut elements = card_elements(&theme, width, height as f32, margin, accent);
    elements.append(&mut cursor.elements);

    Layout { width: template.width, height, natural_height, elements }
}

fn card_elements(theme: &Theme, width: f32, height: f32, margin: f32, accent: f32) -> Vec<Element> {
    let mut elements = Vec::new();
    let Some(card) = theme.card else {
        return elements;
    };
    let (card_width, card_height) = (width - 2.0 * margin, height - 2.0 * margin);

    elements.push(Element::Rect { x: margin, y: margin, width: card_width, height: card_height, color: card });
    if let Some(border) = theme.card_border {
        elements.push(Element::Outline { x: margin, y: margin, width: card_width, height: card_height, color: border });
    }
    if let Some((color, _)) = theme.card_accent {
        elements.push(Element::Rect { x: margin, y: margin, width: accent, height: card_height, color });
    }
    elements
}
