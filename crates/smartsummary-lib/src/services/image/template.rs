// Share-image templates
// Fixed canvas sizes, content budgets and per-template visual themes

use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Layout widths are designed against an 800 px reference canvas
pub const REFERENCE_WIDTH: f32 = 800.0;
/// Rendered images never grow past this height unless the template is taller
pub const MIN_MAX_HEIGHT: u32 = 1500;

pub type Color = Rgba<u8>;

const fn rgb(hex: u32) -> Color {
    Rgba([(hex >> 16) as u8, (hex >> 8) as u8, hex as u8, 255])
}

const fn rgba(hex: u32, alpha: u8) -> Color {
    Rgba([(hex >> 16) as u8, (hex >> 8) as u8, hex as u8, alpha])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStyle {
    Modern,
    Xiaohongshu,
    Zhihu,
    Weibo,
    Academic,
}

impl TemplateStyle {
    pub const ALL: [TemplateStyle; 5] = [
        TemplateStyle::Modern,
        TemplateStyle::Xiaohongshu,
        TemplateStyle::Zhihu,
        TemplateStyle::Weibo,
        TemplateStyle::Academic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateStyle::Modern => "modern",
            TemplateStyle::Xiaohongshu => "xiaohongshu",
            TemplateStyle::Zhihu => "zhihu",
            TemplateStyle::Weibo => "weibo",
            TemplateStyle::Academic => "academic",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        let id = id.trim().to_lowercase();
        Self::ALL.into_iter().find(|style| style.as_str() == id)
    }
}

impl fmt::Display for TemplateStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canvas fill behind everything else
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill {
    Solid(Color),
    /// Diagonal gradient from the top-left corner to the bottom-right corner
    Gradient(Color, Color),
}

/// What the right-hand side of the footer shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FooterDetail {
    Date,
    DateTime,
    WordCount,
}

/// Visual parameters of a template, in reference (unscaled) units
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub background: Fill,
    /// White card drawn inside the outer margin, if any
    pub card: Option<Color>,
    pub card_border: Option<Color>,
    /// Accent bar on the card's left edge: (color, width)
    pub card_accent: Option<(Color, f32)>,
    /// Gap between canvas edge and card (or content when there is no card)
    pub outer_margin: f32,
    /// Padding inside the card
    pub inner_padding: f32,
    pub heading: Option<&'static str>,
    pub title_px: f32,
    pub content_px: f32,
    pub meta_px: f32,
    pub title_line_height: f32,
    pub content_line_height: f32,
    pub title_color: Color,
    pub text_color: Color,
    pub meta_color: Color,
    pub code_background: Color,
    pub rule_color: Color,
    pub rule_width: f32,
    pub footer_label: &'static str,
    pub footer_detail: FooterDetail,
    /// Appended after the content, e.g. hashtags
    pub trailer: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageTemplate {
    pub style: TemplateStyle,
    pub name: &'static str,
    pub description: &'static str,
    pub width: u32,
    pub height: u32,
    /// Character budget at the reference width
    pub base_chars: usize,
}

impl ImageTemplate {
    pub fn all() -> Vec<ImageTemplate> {
        TemplateStyle::ALL.into_iter().map(Self::for_style).collect()
    }

    pub fn by_id(id: &str) -> Option<ImageTemplate> {
        TemplateStyle::parse(id).map(Self::for_style)
    }

    pub fn for_style(style: TemplateStyle) -> ImageTemplate {
        let (name, description, width, height, base_chars) = match style {
            TemplateStyle::Modern => ("现代简洁", "简洁现代的设计风格，适合各种场景", 1200, 1200, 600),
            TemplateStyle::Xiaohongshu => ("小红书风格", "适合小红书分享的竖版卡片", 1080, 1800, 500),
            TemplateStyle::Zhihu => ("知乎风格", "知乎回答风格的专业排版", 1200, 1350, 650),
            TemplateStyle::Weibo => ("微博风格", "适合微博分享的动态卡片", 1080, 1200, 400),
            TemplateStyle::Academic => ("学术论文", "学术摘要风格的正式排版", 1200, 1800, 700),
        };
        ImageTemplate { style, name, description, width, height, base_chars }
    }

    pub fn scale(&self) -> f32 {
        self.width as f32 / REFERENCE_WIDTH
    }

    /// Maximum content characters shown on this template
    pub fn char_budget(&self) -> usize {
        self.base_chars * self.width as usize / REFERENCE_WIDTH as usize
    }

    pub fn max_height(&self) -> u32 {
        self.height.max(MIN_MAX_HEIGHT)
    }

    pub fn theme(&self) -> Theme {
        match self.style {
            TemplateStyle::Modern => Theme {
                background: Fill::Gradient(rgb(0x667eea), rgb(0x764ba2)),
                card: None,
                card_border: None,
                card_accent: None,
                outer_margin: 30.0,
                inner_padding: 0.0,
                heading: None,
                title_px: 28.0,
                content_px: 16.0,
                meta_px: 14.0,
                title_line_height: 1.3,
                content_line_height: 1.4,
                title_color: rgb(0xffffff),
                text_color: rgba(0xffffff, 242),
                meta_color: rgba(0xffffff, 204),
                code_background: rgba(0xffffff, 48),
                rule_color: rgba(0xffffff, 51),
                rule_width: 1.0,
                footer_label: "智能摘要助手",
                footer_detail: FooterDetail::Date,
                trailer: None,
            },
            TemplateStyle::Xiaohongshu => Theme {
                background: Fill::Gradient(rgb(0xff9a9e), rgb(0xfecfef)),
                card: Some(rgb(0xffffff)),
                card_border: None,
                card_accent: None,
                outer_margin: 20.0,
                inner_padding: 30.0,
                heading: None,
                title_px: 24.0,
                content_px: 16.0,
                meta_px: 13.0,
                title_line_height: 1.3,
                content_line_height: 1.4,
                title_color: rgb(0xe91e63),
                text_color: rgb(0x333333),
                meta_color: rgb(0xe91e63),
                code_background: rgb(0xf1f1f1),
                rule_color: rgb(0xfce4ec),
                rule_width: 2.0,
                footer_label: "智能摘要助手",
                footer_detail: FooterDetail::Date,
                trailer: None,
            },
            TemplateStyle::Zhihu => Theme {
                background: Fill::Solid(rgb(0xf6f6f6)),
                card: Some(rgb(0xffffff)),
                card_border: None,
                card_accent: Some((rgb(0x0084ff), 4.0)),
                outer_margin: 20.0,
                inner_padding: 35.0,
                heading: None,
                title_px: 22.0,
                content_px: 15.0,
                meta_px: 13.0,
                title_line_height: 1.4,
                content_line_height: 1.4,
                title_color: rgb(0x1a1a1a),
                text_color: rgb(0x444444),
                meta_color: rgb(0x8590a6),
                code_background: rgb(0xf1f1f1),
                rule_color: rgb(0xe6e6e6),
                rule_width: 1.0,
                footer_label: "智能摘要助手",
                footer_detail: FooterDetail::WordCount,
                trailer: None,
            },
            TemplateStyle::Weibo => Theme {
                background: Fill::Gradient(rgb(0xff6b6b), rgb(0xfeca57)),
                card: None,
                card_border: None,
                card_accent: None,
                outer_margin: 30.0,
                inner_padding: 0.0,
                heading: None,
                title_px: 18.0,
                content_px: 14.0,
                meta_px: 12.0,
                title_line_height: 1.4,
                content_line_height: 1.3,
                title_color: rgb(0xffffff),
                text_color: rgb(0xffffff),
                meta_color: rgba(0xffffff, 204),
                code_background: rgba(0xffffff, 48),
                rule_color: rgba(0xffffff, 51),
                rule_width: 1.0,
                footer_label: "智能摘要助手",
                footer_detail: FooterDetail::DateTime,
                trailer: Some("#AI摘要 #智能助手 #效率工具"),
            },
            TemplateStyle::Academic => Theme {
                background: Fill::Solid(rgb(0xfafafa)),
                card: Some(rgb(0xffffff)),
                card_border: Some(rgb(0xdddddd)),
                card_accent: None,
                outer_margin: 20.0,
                inner_padding: 40.0,
                heading: Some("ABSTRACT SUMMARY"),
                title_px: 18.0,
                content_px: 14.0,
                meta_px: 12.0,
                title_line_height: 1.3,
                content_line_height: 1.4,
                title_color: rgb(0x333333),
                text_color: rgb(0x444444),
                meta_color: rgb(0x666666),
                code_background: rgb(0xf1f1f1),
                rule_color: rgb(0xdddddd),
                rule_width: 1.0,
                footer_label: "Generated by: AI Summary Assistant",
                footer_detail: FooterDetail::Date,
                trailer: None,
            },
        }
    }
}
