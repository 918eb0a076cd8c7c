// Site-specific extraction for forum threads and Q&A pages

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

use super::dom::{aggregate_paragraphs, block_text, parse_selectors, NoiseFilter};
use super::{Document, ExtractionStrategy};

/// Replies kept after the main post
pub const MAX_REPLIES: usize = 100;

/// Text shorter than this is checked against the chrome keywords
const SHORT_TEXT_CHARS: usize = 40;

static CHROME_KEYWORDS: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)\b(nav|navbar|navigation|menu|login|log-in|signin|sign-in|signup|sign-up|register|header|footer)\b|登录|注册")
        .ok()
});

/// How to recognize one family of thread pages and where their posts live
#[derive(Debug, Clone)]
pub struct ThreadSite {
    pub name: &'static str,
    /// Matched against the host and its parent domains
    pub hosts: &'static [&'static str],
    /// Prefix of `<meta name="generator">`
    pub generator_prefix: Option<&'static str>,
    pub title_selectors: &'static [&'static str],
    /// Tried in order; the first that matches anything defines the posts
    pub post_selectors: &'static [&'static str],
}

impl ThreadSite {
    pub fn discourse() -> Self {
        Self {
            name: "discourse",
            hosts: &["linux.do", "meta.discourse.org"],
            generator_prefix: Some("Discourse"),
            title_selectors: &["#topic-title h1", ".fancy-title", "h1"],
            post_selectors: &[".topic-post .cooked", ".crawler-post .post", "[itemprop='articleBody']"],
        }
    }

    pub fn stack_exchange() -> Self {
        Self {
            name: "stackexchange",
            hosts: &[
                "stackoverflow.com",
                "stackexchange.com",
                "superuser.com",
                "serverfault.com",
                "askubuntu.com",
            ],
            generator_prefix: None,
            title_selectors: &["#question-header h1", "h1[itemprop='name']", "h1"],
            post_selectors: &[
                ".question .s-prose, .answer .s-prose",
                ".question .post-text, .answer .post-text",
            ],
        }
    }

    fn matches(&self, doc: &Document) -> bool {
        let host_match = doc.host().is_some_and(|host| {
            let host = host.to_ascii_lowercase();
            self.hosts
                .iter()
                .any(|h| host == *h || host.ends_with(&format!(".{}", h)))
        });
        host_match
            || self.generator_prefix.is_some_and(|prefix| {
                doc.meta("generator")
                    .is_some_and(|g| g.trim_start().starts_with(prefix))
            })
    }
}

/// Title, main post and replies of a recognized thread page
pub struct ThreadExtractor {
    sites: Vec<(ThreadSite, Vec<Selector>, Vec<Selector>)>,
    max_replies: usize,
    noise: NoiseFilter,
}

impl Default for ThreadExtractor {
    fn default() -> Self {
        Self::new(vec![ThreadSite::discourse(), ThreadSite::stack_exchange()])
    }
}

impl ThreadExtractor {
    pub fn new(sites: Vec<ThreadSite>) -> Self {
        let sites = sites
            .into_iter()
            .map(|site| {
                let titles = parse_selectors(site.title_selectors);
                let posts = parse_selectors(site.post_selectors);
                (site, titles, posts)
            })
            .collect();
        Self {
            sites,
            max_replies: MAX_REPLIES,
            noise: NoiseFilter::base(),
        }
    }

    pub fn with_max_replies(mut self, max_replies: usize) -> Self {
        self.max_replies = max_replies;
        self
    }

    fn is_chrome(&self, el: &ElementRef<'_>, text: &str) -> bool {
        let Some(re) = CHROME_KEYWORDS.as_ref() else {
            return false;
        };
        let class = el.value().attr("class").unwrap_or_default();
        re.is_match(class) || (text.chars().count() < SHORT_TEXT_CHARS && re.is_match(text))
    }

    fn extract_site(&self, doc: &Document, titles: &[Selector], posts: &[Selector]) -> Option<String> {
        let html = doc.html();
        let title = titles
            .iter()
            .filter_map(|s| html.select(s).next())
            .map(|el| block_text(el, &self.noise))
            .find(|t| !t.is_empty());

        let elements: Vec<ElementRef<'_>> = posts
            .iter()
            .map(|s| html.select(s).collect::<Vec<_>>())
            .find(|found| !found.is_empty())?;

        let mut bodies = Vec::new();
        for el in elements {
            if bodies.len() > self.max_replies {
                break;
            }
            let text = aggregate_paragraphs(el, &self.noise);
            let text = text.trim();
            if text.is_empty() || self.is_chrome(&el, text) {
                continue;
            }
            bodies.push(text.to_string());
        }

        if bodies.is_empty() {
            return None;
        }

        let mut sections = Vec::with_capacity(bodies.len() + 1);
        if let Some(title) = title {
            sections.push(title);
        }
        sections.extend(bodies);
        Some(sections.join("\n\n"))
    }
}

impl ExtractionStrategy for ThreadExtractor {
    fn name(&self) -> &str {
        "thread"
    }

    fn try_extract(&self, doc: &Document) -> Option<String> {
        self.sites
            .iter()
            .filter(|(site, _, _)| site.matches(doc))
            .find_map(|(site, titles, posts)| {
                log::debug!("Page recognized as {} thread", site.name);
                self.extract_site(doc, titles, posts)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discourse_page(replies: usize) -> String {
        let mut posts = String::from(
            "<div class=\"topic-post\"><div class=\"cooked\"><p>Main post body with details.</p></div></div>",
        );
        for i in 0..replies {
            posts.push_str(&format!(
                "<div class=\"topic-post\"><div class=\"cooked\"><p>Reply number {} here.</p></div></div>",
                i
            ));
        }
        format!(
            "<html><head><title>t</title></head><body><div id=\"topic-title\"><h1>Thread title</h1></div>{}</body></html>",
            posts
        )
    }

    #[test]
    fn test_discourse_by_host() {
        let doc = Document::parse(&discourse_page(2), "https://linux.do/t/topic/123");
        let text = ThreadExtractor::default().try_extract(&doc).unwrap();
        assert_eq!(
            text,
            "Thread title\n\nMain post body with details.\n\nReply number 0 here.\n\nReply number 1 here."
        );
    }

    #[test]
    fn test_discourse_by_generator() {
        let html = discourse_page(0).replace(
            "<title>t</title>",
            "<title>t</title><meta name=\"generator\" content=\"Discourse 3.3.0 - https://github.com/discourse\">",
        );
        let doc = Document::parse(&html, "https://forum.example.org/t/1");
        assert!(ThreadExtractor::default().try_extract(&doc).is_some());
    }

    #[test]
    fn test_reply_cap() {
        let doc = Document::parse(&discourse_page(150), "https://linux.do/t/topic/1");
        let text = ThreadExtractor::default().try_extract(&doc).unwrap();
        assert!(text.contains("Reply number 99 here."));
        assert!(!text.contains("Reply number 100 here."));
    }

    #[test]
    fn test_skips_chrome_posts() {
        let html = "<html><body><h1 id=\"question-header\">Q</h1>\
            <div class=\"question\"><div class=\"s-prose\"><p>How do I parse HTML in Rust?</p></div></div>\
            <div class=\"answer\"><div class=\"s-prose login-prompt\"><p>Log in to answer this question</p></div></div>\
            <div class=\"answer\"><div class=\"s-prose\"><p>Use the scraper crate for that.</p></div></div>\
            <div class=\"answer\"><div class=\"s-prose\"><p>登录</p></div></div>\
            </body></html>";
        let doc = Document::parse(html, "https://stackoverflow.com/questions/1");
        let text = ThreadExtractor::default().try_extract(&doc).unwrap();
        assert!(text.contains("How do I parse HTML in Rust?"));
        assert!(text.contains("Use the scraper crate"));
        assert!(!text.contains("Log in"));
        assert!(!text.contains("登录"));
    }

    #[test]
    fn test_other_hosts_are_ignored() {
        let doc = Document::parse(&discourse_page(1), "https://example.com/t/1");
        assert!(ThreadExtractor::default().try_extract(&doc).is_none());
    }
}
