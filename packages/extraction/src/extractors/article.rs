//! Web-article extraction.
//!
//! Fetches the page once, then assembles body-text candidates from
//! several strategies: semantic containers, class-name blocks, a full
//! paragraph sweep, JSON-LD payloads, embedded script literals, and the
//! title plus meta description. The longest candidate wins and the
//! winning strategy is recorded in `extraction_notes`.
//!
//! Pages that do not look like a direct article (section fronts,
//! homepages) are rejected as `Unsupported` instead of scoring whatever
//! navigation text happens to be longest.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::content::{ExtractedContent, SourceKind};
use crate::error::{ExtractionError, Result};
use crate::extractors::{clean_text, decode_json_string, html_to_text};
use crate::fetch::{FetchedPage, PageFetcher};

/// Minimum article body length in characters. Shorter recoveries are
/// reported as `Empty` rather than scored.
pub const MIN_ARTICLE_CHARS: usize = 200;

/// Single path segments treated as section fronts rather than articles.
const SECTION_NAMES: &[&str] = &[
    "news",
    "world",
    "us",
    "politics",
    "business",
    "sport",
    "sports",
    "entertainment",
    "video",
    "live",
];

pub struct ArticleExtractor {
    fetcher: Arc<dyn PageFetcher>,
}

impl ArticleExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Extract article text from a web page.
    pub async fn extract(&self, url: &Url) -> Result<ExtractedContent> {
        let page = self.fetcher.fetch(url.as_str()).await?;
        if !page.is_success() {
            return Err(ExtractionError::unreachable(format!(
                "HTTP {} for {}",
                page.status, page.url
            )));
        }

        // MSN renders articles client-side; the page HTML is a shell and
        // the text lives behind the content API.
        if let Some(article_id) = msn_article_id(&page.url) {
            if let Some(content) = self.extract_msn(&page.url, &article_id).await {
                return Ok(content);
            }
        }

        // Synchronous from here on: `Html` is not Send and must not be
        // held across an await point.
        self.extract_from_html(&page)
    }

    async fn extract_msn(&self, page_url: &str, article_id: &str) -> Option<ExtractedContent> {
        let detail_url = msn_detail_url(article_id);
        let detail = match self.fetcher.fetch(&detail_url).await {
            Ok(page) if page.is_success() => page,
            // fall through to the page HTML on any API trouble
            Ok(_) | Err(_) => return None,
        };

        let value: serde_json::Value = serde_json::from_str(&detail.body).ok()?;
        let body_html = value.get("body").and_then(|v| v.as_str()).unwrap_or("");
        let body = clean_text(&html_to_text(body_html));
        if body.chars().count() < MIN_ARTICLE_CHARS {
            return None;
        }

        debug!(url = %page_url, chars = body.chars().count(), "article extracted via MSN content API");

        let mut content = ExtractedContent::new(SourceKind::Article, page_url, body)
            .with_note("article body via MSN content API");
        if let Some(title) = value.get("title").and_then(|v| v.as_str()) {
            content = content.with_title(title);
        }
        Some(content)
    }

    fn extract_from_html(&self, page: &FetchedPage) -> Result<ExtractedContent> {
        let doc = Html::parse_document(&page.body);
        let path = Url::parse(&page.url)
            .map(|u| u.path().to_string())
            .unwrap_or_default();

        let likely_article = looks_like_article_path(&path)
            || (has_article_signals(&doc) && !is_home_or_section_path(&path));

        let article_paragraphs = container_paragraphs(&doc, "article");
        let main_paragraphs = container_paragraphs(&doc, "main");

        let mut candidates: Vec<(&'static str, String)> = vec![
            ("article element", article_paragraphs.clone()),
            ("main element", main_paragraphs.clone()),
            ("content blocks", class_block_text(&doc)),
            ("paragraph sweep", all_paragraphs_text(&doc)),
            ("structured data", json_ld_text(&doc)),
            ("embedded script data", embedded_script_text(&doc)),
            ("title and meta description", title_and_description(&doc)),
        ];

        // Div-based article bodies have no <p> to sweep; convert the
        // semantic container wholesale as a fallback candidate.
        if article_paragraphs.chars().count() < MIN_ARTICLE_CHARS
            && main_paragraphs.chars().count() < MIN_ARTICLE_CHARS
        {
            candidates.push(("container markup", container_markdown(&doc)));
        }

        // First-listed candidate wins ties, keeping strategy labels stable
        // when two strategies recover identical text.
        let mut strategy = "none";
        let mut body = String::new();
        for (label, text) in candidates {
            if text.len() > body.len() {
                strategy = label;
                body = text;
            }
        }

        if !likely_article {
            return Err(ExtractionError::unsupported(format!(
                "{} does not look like a direct article page",
                page.url
            )));
        }
        if body.chars().count() < MIN_ARTICLE_CHARS {
            return Err(ExtractionError::empty(format!(
                "recovered only {} chars of article text from {}",
                body.chars().count(),
                page.url
            )));
        }

        debug!(url = %page.url, strategy, chars = body.chars().count(), "article extracted");

        let mut content = ExtractedContent::new(SourceKind::Article, &page.url, body)
            .with_note(format!("article body via {}", strategy));
        if let Some(title) = page_title(&doc) {
            content = content.with_title(title);
        }
        if let Some(author) = meta_content(&doc, "meta[name='author']") {
            content = content.with_author(author);
        }
        if let Some(published_at) = published_timestamp(&doc) {
            content = content.with_published_at(published_at);
        }
        Ok(content)
    }
}

/// Paths like `/2024/03/05/...`, `/article/...`, or a long hyphenated
/// slug are article-shaped regardless of page markup.
fn looks_like_article_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    if lower.contains("/ar-") || lower.contains("/article/") || lower.contains("/story/") {
        return true;
    }
    if Regex::new(r"/\d{4}/\d{2}/\d{2}/").unwrap().is_match(&lower) {
        return true;
    }
    if let Some(last) = lower.trim_end_matches('/').rsplit('/').next() {
        if last.len() >= 20
            && last.contains('-')
            && Regex::new(r"^[a-z0-9-]+$").unwrap().is_match(last)
        {
            return true;
        }
    }
    false
}

/// Root paths and single well-known section segments (`/politics`,
/// `/news`) are fronts, not articles.
fn is_home_or_section_path(path: &str) -> bool {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [] => true,
        [only] => {
            let lower = only.to_ascii_lowercase();
            SECTION_NAMES.contains(&lower.as_str())
        }
        _ => false,
    }
}

/// Markup-level hints that the page is an article: an `<article>`
/// element, article OpenGraph type, a publish timestamp, or JSON-LD of
/// type (News)Article.
fn has_article_signals(doc: &Html) -> bool {
    if let Ok(selector) = Selector::parse("article") {
        if doc.select(&selector).next().is_some() {
            return true;
        }
    }
    if let Some(og_type) = meta_content(doc, "meta[property='og:type']") {
        if og_type.to_ascii_lowercase().contains("article") {
            return true;
        }
    }
    if meta_content(doc, "meta[property='article:published_time']").is_some() {
        return true;
    }
    if let Ok(selector) = Selector::parse("script[type='application/ld+json']") {
        for script in doc.select(&selector) {
            let raw = script.text().collect::<String>();
            if raw.contains("\"@type\"")
                && (raw.contains("NewsArticle") || raw.contains("\"Article\""))
            {
                return true;
            }
        }
    }
    false
}

/// Joined `<p>` text within the first element matching `container`.
fn container_paragraphs(doc: &Html, container: &str) -> String {
    let container_selector = match Selector::parse(container) {
        Ok(s) => s,
        Err(_) => return String::new(),
    };
    let p_selector = match Selector::parse("p") {
        Ok(s) => s,
        Err(_) => return String::new(),
    };
    let element = match doc.select(&container_selector).next() {
        Some(e) => e,
        None => return String::new(),
    };
    let joined = element
        .select(&p_selector)
        .map(|p| p.text().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ");
    clean_text(&joined)
}

/// Joined `<p>` text from elements whose class or id smells like
/// article content, capped at the first ten blocks.
fn class_block_text(doc: &Html) -> String {
    let block_selector = match Selector::parse(
        "[class*='article'], [class*='content'], [class*='story'], [id*='article']",
    ) {
        Ok(s) => s,
        Err(_) => return String::new(),
    };
    let p_selector = match Selector::parse("p") {
        Ok(s) => s,
        Err(_) => return String::new(),
    };

    let mut parts = Vec::new();
    for block in doc.select(&block_selector).take(10) {
        for p in block.select(&p_selector) {
            parts.push(p.text().collect::<String>());
        }
    }
    clean_text(&parts.join(" "))
}

/// Every `<p>` on the page, joined.
fn all_paragraphs_text(doc: &Html) -> String {
    let p_selector = match Selector::parse("p") {
        Ok(s) => s,
        Err(_) => return String::new(),
    };
    let joined = doc
        .select(&p_selector)
        .map(|p| p.text().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ");
    clean_text(&joined)
}

/// Markdown conversion of the first semantic container.
fn container_markdown(doc: &Html) -> String {
    for selector_str in ["article", "main", "[role='main']"] {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = doc.select(&selector).next() {
                let text = clean_text(&html_to_text(&element.html()));
                if !text.is_empty() {
                    return text;
                }
            }
        }
    }
    String::new()
}

/// Text fields pulled out of JSON-LD script payloads.
fn json_ld_text(doc: &Html) -> String {
    let selector = match Selector::parse("script[type='application/ld+json']") {
        Ok(s) => s,
        Err(_) => return String::new(),
    };

    let mut chunks: Vec<String> = Vec::new();
    for script in doc.select(&selector) {
        let raw = script.text().collect::<String>();
        if raw.trim().is_empty() {
            continue;
        }
        let payload: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(_) => continue,
        };
        let nodes: Vec<&serde_json::Value> = match &payload {
            serde_json::Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        for node in nodes {
            if let Some(object) = node.as_object() {
                for key in ["articleBody", "headline", "description", "text"] {
                    if let Some(serde_json::Value::String(s)) = object.get(key) {
                        chunks.push(s.clone());
                    }
                }
            }
        }
    }
    clean_text(&chunks.join(" "))
}

/// Article text embedded as a JSON string literal in an inline script,
/// the usual shape for hydration payloads.
fn embedded_script_text(doc: &Html) -> String {
    let selector = match Selector::parse("script") {
        Ok(s) => s,
        Err(_) => return String::new(),
    };
    let body_pattern = Regex::new(r#""articleBody"\s*:\s*"((?:[^"\\]|\\.){80,})""#).unwrap();
    let text_pattern = Regex::new(r#""text"\s*:\s*"((?:[^"\\]|\\.){200,})""#).unwrap();

    let mut best = String::new();
    for script in doc.select(&selector) {
        let raw = script.text().collect::<String>();
        for pattern in [&body_pattern, &text_pattern] {
            if let Some(m) = pattern.captures(&raw).and_then(|c| c.get(1)) {
                let decoded = clean_text(&decode_json_string(m.as_str()));
                if decoded.len() > best.len() {
                    best = decoded;
                }
            }
        }
    }
    best
}

/// Weakest candidate: page title plus meta description.
fn title_and_description(doc: &Html) -> String {
    let mut parts = Vec::new();
    if let Some(title) = page_title(doc) {
        parts.push(title);
    }
    if let Some(description) = meta_content(doc, "meta[name='description']")
        .or_else(|| meta_content(doc, "meta[property='og:description']"))
    {
        parts.push(description);
    }
    clean_text(&parts.join(" "))
}

fn page_title(doc: &Html) -> Option<String> {
    if let Some(title) = meta_content(doc, "meta[property='og:title']") {
        return Some(title);
    }
    let selector = Selector::parse("title").ok()?;
    let title = doc.select(&selector).next()?.text().collect::<String>();
    let title = clean_text(&title);
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

fn meta_content(doc: &Html, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    let content = doc.select(&selector).next()?.value().attr("content")?;
    let content = clean_text(content);
    if content.is_empty() {
        None
    } else {
        Some(content)
    }
}

fn published_timestamp(doc: &Html) -> Option<DateTime<Utc>> {
    let raw = meta_content(doc, "meta[property='article:published_time']")?;
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn msn_article_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    if host != "msn.com" && !host.ends_with(".msn.com") {
        return None;
    }
    let captures = Regex::new(r"/ar-([A-Za-z0-9]+)")
        .unwrap()
        .captures(parsed.path())?;
    Some(captures.get(1)?.as_str().to_string())
}

fn msn_detail_url(article_id: &str) -> String {
    format!(
        "https://assets.msn.com/content/view/v2/Detail/en-us/{}",
        article_id
    )
}
