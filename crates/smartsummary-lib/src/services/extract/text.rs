// Text post-processing and content heuristics

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{ContentType, Language};

/// Hard cap on extracted content, in chars
pub const MAX_CONTENT_CHARS: usize = 50_000;

static HORIZONTAL_SPACE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"[^\S\n]+").ok());
static BLANK_RUNS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\n{3,}").ok());
static LATIN_RUN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"[a-zA-Z]+").ok());

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

/// Normalize whitespace and cap the length
///
/// Runs of horizontal whitespace become one space, each line is trimmed, at
/// most one blank line separates paragraphs, and the result is cut to
/// [`MAX_CONTENT_CHARS`] on a char boundary.
pub fn clean_content(raw: &str) -> String {
    let collapsed = match HORIZONTAL_SPACE.as_ref() {
        Some(re) => re.replace_all(raw, " ").into_owned(),
        None => raw.to_string(),
    };
    let lines: Vec<&str> = collapsed.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    let paragraphs = match BLANK_RUNS.as_ref() {
        Some(re) => re.replace_all(&joined, "\n\n").into_owned(),
        None => joined,
    };

    let trimmed = paragraphs.trim();
    match trimmed.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((cut, _)) => trimmed[..cut].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

/// CJK ideographs plus Latin words
pub fn count_words(content: &str) -> usize {
    let cjk = content.chars().filter(|c| is_cjk(*c)).count();
    let latin = LATIN_RUN
        .as_ref()
        .map(|re| re.find_iter(content).count())
        .unwrap_or(0);
    cjk + latin
}

/// Majority of CJK ideographs versus Latin letters; a tie is `Auto`
pub fn detect_language(content: &str) -> Language {
    let (cjk, latin) = content.chars().fold((0usize, 0usize), |(cjk, latin), c| {
        if is_cjk(c) {
            (cjk + 1, latin)
        } else if c.is_ascii_alphabetic() {
            (cjk, latin + 1)
        } else {
            (cjk, latin)
        }
    });
    match cjk.cmp(&latin) {
        std::cmp::Ordering::Greater => Language::Zh,
        std::cmp::Ordering::Less => Language::En,
        std::cmp::Ordering::Equal => Language::Auto,
    }
}

const ARTICLE_INDICATORS: &[&str] = &["作者", "author", "发布时间", "published", "阅读量", "转发", "share"];

/// Guess the page category from its URL, then from byline-like words
pub fn detect_content_type(content: &str, url: &str) -> ContentType {
    let url = url.to_lowercase();
    if url.contains("github.com") || url.contains("docs.") || url.contains("documentation") {
        return ContentType::Documentation;
    }
    if url.contains("blog") || url.contains("/post/") || url.contains("/article/") {
        return ContentType::Blog;
    }
    if url.contains("news") {
        return ContentType::News;
    }

    let content = content.to_lowercase();
    if ARTICLE_INDICATORS.iter().any(|i| content.contains(i)) {
        ContentType::Article
    } else {
        ContentType::General
    }
}
