// Content formatting for share images
//
// Truncates a summary to a template's character budget at a natural break
// and parses the markdown-lite subset the providers emit (bold, emphasis,
// inline code, list markers) into styled spans and an HTML fragment.

use once_cell::sync::Lazy;
use regex::Regex;

const SENTENCE_END: &[char] = &['。', '！', '？', '.', '!', '?'];
const CLAUSE_BREAK: &[char] = &['，', '、', '；', ',', ';'];
const ELLIPSIS: &str = "...";
const PARAGRAPH_OPEN: &str = "<p style=\"margin: 0.5em 0;\">";

static INLINE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*|\*(.+?)\*|`(.+?)`").ok());
static BULLET_ITEM: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[-*•]\s+(.*)$").ok());
static ORDERED_ITEM: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^(\d+)[.)]\s+(.*)$").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStyle {
    Plain,
    Bold,
    Emphasis,
    Code,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

impl Span {
    pub fn new(text: impl Into<String>, style: SpanStyle) -> Self {
        Self { text: text.into(), style }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, SpanStyle::Plain)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// A single source line
    Paragraph(Vec<Span>),
    ListItem { marker: String, spans: Vec<Span> },
    /// One or more blank lines
    Break,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedContent {
    /// Truncated plain text, ellipsis included when cut
    pub text: String,
    pub truncated: bool,
    pub blocks: Vec<Block>,
    pub html: String,
}

/// Char index at which `chars` should be cut to fit `max_chars`.
///
/// Prefers, in order: a sentence terminator, a newline, a clause separator,
/// a space. A candidate only counts when it sits inside the last tenth of the
/// budget (at most 50 chars back); otherwise the text is cut hard.
pub fn find_truncate_point(chars: &[char], max_chars: usize) -> usize {
    if chars.len() <= max_chars {
        return chars.len();
    }

    let buffer = (max_chars / 10).min(50);
    let window_start = max_chars.saturating_sub(buffer);
    let search = &chars[..max_chars];
    let candidate = |set: &[char], ratio: f32| {
        search
            .iter()
            .rposition(|c| set.contains(c))
            .filter(|&idx| idx > window_start && idx as f32 > max_chars as f32 * ratio)
    };

    if let Some(idx) = candidate(SENTENCE_END, 0.7) {
        return idx + 1;
    }
    if let Some(idx) = candidate(&['\n'], 0.7) {
        return idx;
    }
    if let Some(idx) = candidate(CLAUSE_BREAK, 0.6) {
        return idx + 1;
    }
    if let Some(idx) = candidate(&[' '], 0.5) {
        return idx;
    }
    max_chars
}

/// Cut `content` to at most `max_chars` chars plus an ellipsis
pub fn truncate_content(content: &str, max_chars: usize) -> (String, bool) {
    let chars: Vec<char> = content.chars().collect();
    if chars.len() <= max_chars {
        return (content.to_string(), false);
    }
    let point = find_truncate_point(&chars, max_chars);
    let mut text: String = chars[..point].iter().collect();
    text.truncate(text.trim_end().len());
    text.push_str(ELLIPSIS);
    (text, true)
}

pub fn format_content(content: &str, max_chars: usize) -> FormattedContent {
    let (text, truncated) = truncate_content(content.trim(), max_chars);
    let blocks = parse_blocks(&text);
    let html = to_html(&blocks);
    FormattedContent { text, truncated, blocks, html }
}

pub fn parse_blocks(content: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut pending_break = false;

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() {
            pending_break = !blocks.is_empty();
            continue;
        }
        if pending_break {
            blocks.push(Block::Break);
            pending_break = false;
        }
        blocks.push(parse_line(line));
    }

    blocks
}

fn parse_line(line: &str) -> Block {
    if let Some(caps) = BULLET_ITEM.as_ref().and_then(|re| re.captures(line)) {
        let body = caps.get(1).map_or("", |m| m.as_str());
        return Block::ListItem {
            marker: "•".to_string(),
            spans: inline_spans(body),
        };
    }
    if let Some(caps) = ORDERED_ITEM.as_ref().and_then(|re| re.captures(line)) {
        let number = caps.get(1).map_or("", |m| m.as_str());
        let body = caps.get(2).map_or("", |m| m.as_str());
        return Block::ListItem {
            marker: format!("{}.", number),
            spans: inline_spans(body),
        };
    }
    Block::Paragraph(inline_spans(line))
}

pub fn inline_spans(text: &str) -> Vec<Span> {
    let Some(re) = INLINE.as_ref() else {
        return vec![Span::plain(text)];
    };

    let mut spans = Vec::new();
    let mut cursor = 0;
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > cursor {
            spans.push(Span::plain(&text[cursor..whole.start()]));
        }
        let styled = [SpanStyle::Bold, SpanStyle::Emphasis, SpanStyle::Code]
            .into_iter()
            .zip(1..=3)
            .find_map(|(style, group)| caps.get(group).map(|m| Span::new(m.as_str(), style)));
        if let Some(span) = styled {
            spans.push(span);
        }
        cursor = whole.end();
    }
    if cursor < text.len() {
        spans.push(Span::plain(&text[cursor..]));
    }
    spans
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn push_spans(html: &mut String, spans: &[Span]) {
    for span in spans {
        let text = escape_html(&span.text);
        match span.style {
            SpanStyle::Plain => html.push_str(&text),
            SpanStyle::Bold => {
                html.push_str("<strong>");
                html.push_str(&text);
                html.push_str("</strong>");
            }
            SpanStyle::Emphasis => {
                html.push_str("<em>");
                html.push_str(&text);
                html.push_str("</em>");
            }
            SpanStyle::Code => {
                html.push_str(
                    "<code style=\"background:#f1f1f1;padding:2px 4px;border-radius:3px;\">",
                );
                html.push_str(&text);
                html.push_str("</code>");
            }
        }
    }
}

/// Paragraph-wrapped fragment; lines within a paragraph are joined by a single `<br>`
pub fn to_html(blocks: &[Block]) -> String {
    let mut html = String::from(PARAGRAPH_OPEN);
    let mut line_open = false;

    for block in blocks {
        match block {
            Block::Break => {
                html.push_str("</p>");
                html.push_str(PARAGRAPH_OPEN);
                line_open = false;
            }
            Block::Paragraph(spans) => {
                if line_open {
                    html.push_str("<br>");
                }
                push_spans(&mut html, spans);
                line_open = true;
            }
            Block::ListItem { marker, spans } => {
                if line_open {
                    html.push_str("<br>");
                }
                html.push_str(&escape_html(marker));
                html.push(' ');
                push_spans(&mut html, spans);
                line_open = true;
            }
        }
    }

    html.push_str("</p>");
    html
}
