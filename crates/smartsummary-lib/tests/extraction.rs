// Content extraction over realistic page snapshots

use smartsummary_lib::models::{ContentType, Language, PageSnapshot};
use smartsummary_lib::services::extract::{count_words, ContentExtractor, ExtractError, MAX_CONTENT_CHARS};

fn article_page() -> String {
    r#"<html>
      <head><title>Ownership in Rust</title></head>
      <body>
        <nav><a href="/">Home</a> <a href="/about">About</a></nav>
        <div class="content">
          <h1>Ownership in Rust</h1>
          <p>Ownership is a set of rules that govern how a Rust program manages memory, and it is checked at compile time.</p>
          <p>Each value has an owner, there can only be one owner at a time, and the value is dropped when the owner goes out of scope.</p>
          <pre>let s = String::from("hello");</pre>
          <p>Borrowing lets code use a value without taking ownership, through shared or mutable references.</p>
        </div>
        <footer>Copyright 2024 Example Corp, all rights reserved.</footer>
      </body>
    </html>"#
        .to_string()
}

#[test]
fn article_extraction_drops_chrome() {
    let extractor = ContentExtractor::new();
    let snapshot = PageSnapshot::new("https://example.com/post/ownership", article_page());

    let content = extractor.extract_page_content(&snapshot).unwrap();

    assert_eq!(content.title, "Ownership in Rust");
    assert!(content.content.contains("Each value has an owner"));
    assert!(content.content.contains("Borrowing lets code use a value"));
    assert!(content.content.contains("[代码块: "));
    assert!(!content.content.contains("Home"));
    assert!(!content.content.contains("Copyright"));
    assert_eq!(content.language, Language::En);
    assert_eq!(content.content_type, ContentType::Blog);
    assert_eq!(content.word_count, count_words(&content.content));
}

#[test]
fn word_count_is_independent_of_extraction_path() {
    let text = "Rust 语言的所有权 system keeps memory safe 没有垃圾回收";
    let extractor = ContentExtractor::new();

    let page = PageSnapshot::new(
        "https://example.com/x",
        format!("<html><body><p>{}</p></body></html>", text),
    );
    let selection = PageSnapshot::new("https://example.com/x", "<p></p>").with_selection(text);

    let from_page = extractor.extract_page_content(&page).unwrap();
    let from_selection = extractor.extract_selected_content(&selection).unwrap();

    // 12 CJK chars + 5 latin runs
    assert_eq!(count_words(text), 17);
    assert_eq!(from_page.word_count, 17);
    assert_eq!(from_selection.word_count, 17);
}

#[test]
fn million_char_document_is_truncated() {
    let paragraph = "很长的测试内容，".repeat(125_000);
    assert_eq!(paragraph.chars().count(), 1_000_000);
    let html = format!("<html><body><article><p>{}</p></article></body></html>", paragraph);
    let snapshot = PageSnapshot::new("https://example.com/long", html);

    let content = ContentExtractor::new().extract_page_content(&snapshot).unwrap();

    assert!(content.content.chars().count() <= MAX_CONTENT_CHARS);
    assert!(content.content.chars().count() > MAX_CONTENT_CHARS - 10);
}

#[test]
fn empty_selection_returns_none() {
    let extractor = ContentExtractor::new();
    let blank = PageSnapshot::new("https://example.com", article_page()).with_selection("   \n\t ");
    let missing = PageSnapshot::new("https://example.com", article_page());

    assert!(extractor.extract_selected_content(&blank).is_none());
    assert!(extractor.extract_selected_content(&missing).is_none());
    assert!(!ContentExtractor::has_selection(&blank));
}

#[test]
fn selection_overrides_page_metadata() {
    let snapshot = PageSnapshot::new("https://example.com/news/today", article_page())
        .with_selection("这是用户选中的一段中文内容");
    let content = ContentExtractor::new().extract_selected_content(&snapshot).unwrap();

    assert_eq!(content.title, "选中内容");
    assert_eq!(content.content_type, ContentType::General);
    assert_eq!(content.language, Language::Zh);
    assert_eq!(content.url, "https://example.com/news/today");
}

#[test]
fn page_without_text_is_an_error() {
    let snapshot = PageSnapshot::new("https://example.com/empty", "<html><body><script>var a = 1;</script></body></html>");
    let err = ContentExtractor::new().extract_page_content(&snapshot).unwrap_err();
    assert!(matches!(err, ExtractError::NoContent(url) if url == "https://example.com/empty"));
}

#[test]
fn untitled_page_gets_placeholder_title() {
    let snapshot = PageSnapshot::new(
        "https://example.com/untitled",
        "<html><body><p>Some body text that is long enough to be picked up as content.</p></body></html>",
    );
    let content = ContentExtractor::new().extract_page_content(&snapshot).unwrap();
    assert_eq!(content.title, "未知页面");
}
