// Readability-style extraction
//
// Scores paragraph-like blocks, propagates the score to their parent and
// grandparent containers, penalizes link-heavy containers, then reads the
// paragraphs of the best container.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use std::collections::HashMap;

use super::dom::{aggregate_paragraphs, block_text, NoiseFilter};
use super::{Document, ExtractionStrategy};

/// Blocks shorter than this are not scored
const MIN_PARAGRAPH_CHARS: usize = 25;

static UNLIKELY_CANDIDATES: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)-ad-|banner|breadcrumbs|combx|comment|community|cover-wrap|disqus|extra|gdpr|legends|menu|related|remark|replies|rss|shoutbox|sidebar|skyscraper|social|sponsor|supplemental|ad-break|agegate|pagination|pager|popup").ok()
});
static MAYBE_CANDIDATE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)and|article|body|column|content|main|shadow").ok());
static POSITIVE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)article|body|content|entry|hentry|h-entry|main|page|pagination|post|text|blog|story").ok()
});
static NEGATIVE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)-ad-|hidden|^hid$| hid$| hid |^hid |banner|combx|comment|com-|contact|foot|footer|footnote|gdpr|masthead|media|meta|outbrain|promo|related|scroll|share|shoutbox|sidebar|skyscraper|sponsor|shopping|tags|tool|widget").ok()
});

fn matches(re: &Lazy<Option<Regex>>, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

/// Initial score of a container by tag
fn tag_score(name: &str) -> f64 {
    match name {
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    }
}

/// +/-25 for the class and for the id
fn class_weight(el: &ElementRef<'_>) -> f64 {
    let mut weight = 0.0;
    for value in [el.value().attr("class"), el.value().id()].into_iter().flatten() {
        if matches(&NEGATIVE, value) {
            weight -= 25.0;
        }
        if matches(&POSITIVE, value) {
            weight += 25.0;
        }
    }
    weight
}

fn is_unlikely(el: &ElementRef<'_>) -> bool {
    let name = el.value().name();
    if name == "body" || name == "html" || name == "article" || name == "main" {
        return false;
    }
    let descriptor = format!(
        "{} {}",
        el.value().attr("class").unwrap_or_default(),
        el.value().id().unwrap_or_default()
    );
    matches(&UNLIKELY_CANDIDATES, &descriptor) && !matches(&MAYBE_CANDIDATE, &descriptor)
}

/// Share of the text inside links
pub fn link_density(el: ElementRef<'_>) -> f64 {
    let total: usize = el.text().map(|t| t.chars().count()).sum();
    if total == 0 {
        return 0.0;
    }
    let linked: usize = el
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "a")
        .map(|a| a.text().map(|t| t.chars().count()).sum::<usize>())
        .sum();
    (linked as f64 / total as f64).min(1.0)
}

/// Points a paragraph contributes: base 1, one per comma, one per 100 chars (max 3)
pub fn paragraph_score(text: &str) -> f64 {
    let commas = text.chars().filter(|c| *c == ',' || *c == '，').count();
    let length_bonus = (text.chars().count() / 100).min(3);
    1.0 + commas as f64 + length_bonus as f64
}

pub struct ReadabilityExtractor {
    candidates: Option<Selector>,
    noise: NoiseFilter,
}

impl Default for ReadabilityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadabilityExtractor {
    pub fn new() -> Self {
        Self {
            candidates: Selector::parse("p, pre, td, blockquote").ok(),
            noise: NoiseFilter::base(),
        }
    }

    fn excluded(&self, el: &ElementRef<'_>) -> bool {
        self.noise.is_within_noise(el)
            || is_unlikely(el)
            || el.ancestors().filter_map(ElementRef::wrap).any(|a| is_unlikely(&a))
    }

    /// Best container and its final score
    pub fn top_candidate<'a>(&self, doc: &'a Document) -> Option<(ElementRef<'a>, f64)> {
        let selector = self.candidates.as_ref()?;
        let mut scores: HashMap<_, (ElementRef<'a>, f64)> = HashMap::new();

        for block in doc.html().select(selector) {
            if self.excluded(&block) {
                continue;
            }
            let text = block_text(block, &self.noise);
            if text.chars().count() < MIN_PARAGRAPH_CHARS {
                continue;
            }
            let score = paragraph_score(&text);

            let ancestors = block.ancestors().filter_map(ElementRef::wrap);
            for (level, ancestor) in ancestors.take(2).enumerate() {
                let entry = scores.entry(ancestor.id()).or_insert_with(|| {
                    (ancestor, tag_score(ancestor.value().name()) + class_weight(&ancestor))
                });
                entry.1 += if level == 0 { score } else { score / 2.0 };
            }
        }

        scores
            .into_values()
            .map(|(el, score)| (el, score * (1.0 - link_density(el))))
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

impl ExtractionStrategy for ReadabilityExtractor {
    fn name(&self) -> &str {
        "readability"
    }

    fn try_extract(&self, doc: &Document) -> Option<String> {
        let (top, score) = self.top_candidate(doc)?;
        log::debug!(
            "Readability picked <{}> with score {:.1}",
            top.value().name(),
            score
        );
        let text = aggregate_paragraphs(top, &self.noise);
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
