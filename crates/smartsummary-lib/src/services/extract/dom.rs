// DOM walking helpers shared by the extraction strategies

use scraper::{ElementRef, Node, Selector};

/// Elements whose text never counts as content
const BASE_NOISE_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "iframe", "nav", "aside", "footer",
];

/// Leaf blocks collected by [`aggregate_paragraphs`]
const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "pre", "td", "dd", "dt",
    "figcaption", "div",
];

/// Tags that start a new line in flattened text
const LINE_BREAK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "header", "h1", "h2", "h3", "h4", "h5", "h6",
    "li", "ul", "ol", "blockquote", "pre", "tr", "table", "dd", "dt", "dl", "figure",
    "figcaption", "br", "hr",
];

/// Minimum chars for an aggregated block to be kept
const MIN_BLOCK_CHARS: usize = 10;

/// Compile selectors, dropping any that fail to parse
pub fn parse_selectors(list: &[&str]) -> Vec<Selector> {
    list.iter()
        .filter_map(|css| match Selector::parse(css) {
            Ok(selector) => Some(selector),
            Err(e) => {
                log::warn!("Ignoring invalid selector '{}': {}", css, e);
                None
            }
        })
        .collect()
}

/// Decides which subtrees are skipped while reading text
#[derive(Debug, Clone)]
pub struct NoiseFilter {
    tags: Vec<&'static str>,
    classes: Vec<&'static str>,
}

impl NoiseFilter {
    /// Scripts, styles and page chrome
    pub fn base() -> Self {
        Self {
            tags: BASE_NOISE_TAGS.to_vec(),
            classes: Vec::new(),
        }
    }

    /// Base noise plus headers, ads, sidebars, share bars and comments
    pub fn aggressive() -> Self {
        let mut filter = Self::base();
        filter.tags.push("header");
        filter.classes.extend([
            "navigation",
            "sidebar",
            "ads",
            "advertisement",
            "social-share",
            "comments",
        ]);
        filter
    }

    pub fn is_noise(&self, el: &ElementRef<'_>) -> bool {
        let element = el.value();
        self.tags.contains(&element.name())
            || element.classes().any(|c| self.classes.iter().any(|k| *k == c))
    }

    /// Whether `el` or one of its ancestors is noise
    pub fn is_within_noise(&self, el: &ElementRef<'_>) -> bool {
        self.is_noise(el)
            || el
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| self.is_noise(&a))
    }
}

fn push_text(el: ElementRef<'_>, noise: &NoiseFilter, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if noise.is_noise(&child_el) {
                        continue;
                    }
                    let breaks = LINE_BREAK_TAGS.contains(&child_el.value().name());
                    if breaks {
                        out.push('\n');
                    }
                    push_text(child_el, noise, out);
                    if breaks {
                        out.push('\n');
                    }
                }
            }
            _ => {}
        }
    }
}

/// Text of `el` with noise removed and block boundaries kept as newlines
pub fn visible_text(el: ElementRef<'_>, noise: &NoiseFilter) -> String {
    let mut out = String::new();
    push_text(el, noise, &mut out);
    out
}

/// Text of one block collapsed onto a single line
pub fn block_text(el: ElementRef<'_>, noise: &NoiseFilter) -> String {
    visible_text(el, noise)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Marker standing in for a code block
pub fn code_block_marker(el: ElementRef<'_>) -> String {
    let code: String = el.text().collect::<String>().trim().chars().take(50).collect();
    format!("[代码块: {}...]", code)
}

fn collect_blocks<'a>(el: ElementRef<'a>, noise: &NoiseFilter, out: &mut Vec<ElementRef<'a>>) -> bool {
    let mut has_block_descendant = false;
    for child in el.children().filter_map(ElementRef::wrap) {
        if noise.is_noise(&child) {
            continue;
        }
        if collect_blocks(child, noise, out) {
            has_block_descendant = true;
        }
    }

    let is_block = BLOCK_TAGS.contains(&el.value().name());
    if is_block && !has_block_descendant {
        out.push(el);
    }
    is_block || has_block_descendant
}

/// Paragraph-preserving text of a container
///
/// Innermost blocks (paragraphs, headings, list items, cells, divs without
/// nested blocks) are read in document order and joined by blank lines;
/// `pre` blocks become a short code marker. Falls back to the container's
/// visible text when it has no usable blocks.
pub fn aggregate_paragraphs(root: ElementRef<'_>, noise: &NoiseFilter) -> String {
    let mut blocks = Vec::new();
    for child in root.children().filter_map(ElementRef::wrap) {
        if !noise.is_noise(&child) {
            collect_blocks(child, noise, &mut blocks);
        }
    }

    let paragraphs: Vec<String> = blocks
        .into_iter()
        .filter_map(|block| {
            if block.value().name() == "pre" {
                return Some(code_block_marker(block));
            }
            let text = block_text(block, noise);
            (text.chars().count() > MIN_BLOCK_CHARS).then_some(text)
        })
        .collect();

    if paragraphs.is_empty() {
        visible_text(root, noise)
    } else {
        paragraphs.join("\n\n")
    }
}
