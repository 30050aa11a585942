//! Ordered-fallback field extraction.
//!
//! Each field has a fixed slice of pure strategies over a parsed source. They
//! are tried in order and the first non-empty trimmed value wins; if none
//! produces one, the caller's fallback literal is used. Post markup is
//! uncontrolled, so the strategy lists go from most to least specific.
use regex::Regex;
use scraper::{Html, Selector};

use crate::youtube::types::OEmbed;

/// A pure extraction step over `S`.
pub type Strategy<S> = fn(&S) -> Option<String>;

/// Value of the first strategy yielding a non-empty trimmed string.
pub fn first_present<S>(source: &S, strategies: &[Strategy<S>]) -> Option<String> {
    strategies
        .iter()
        .filter_map(|strategy| strategy(source))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// [`first_present`], or `fallback` when every strategy comes up empty.
pub fn extract_or<S>(source: &S, strategies: &[Strategy<S>], fallback: &str) -> String {
    first_present(source, strategies).unwrap_or_else(|| fallback.to_string())
}

// ==============================
// Video (oEmbed)
// ==============================

pub const VIDEO_TITLE: &[Strategy<OEmbed>] = &[oembed_title];

fn oembed_title(embed: &OEmbed) -> Option<String> {
    embed.title.clone()
}

// ==============================
// Post (HTML document)
// ==============================

/// A fetched post page, parsed once and queried by the post strategies.
pub struct PostDocument {
    html: Html,
    /// Matches ` | {site}...` at the end of `<title>` text.
    title_suffix: Option<Regex>,
}

impl PostDocument {
    /// Parse `html`; `site_name` is the suffix stripped from `<title>` text.
    pub fn parse(html: &str, site_name: Option<&str>) -> Self {
        let title_suffix = site_name
            .map(str::trim)
            .filter(|site| !site.is_empty())
            .and_then(|site| Regex::new(&format!(r"\s*\|\s*{}.*$", regex::escape(site))).ok());
        Self {
            html: Html::parse_document(html),
            title_suffix,
        }
    }

    fn first(&self, selector: &str) -> Option<scraper::ElementRef<'_>> {
        let sel = Selector::parse(selector).ok()?;
        self.html.select(&sel).next()
    }

    fn attr(&self, selector: &str, name: &str) -> Option<String> {
        self.first(selector)?.value().attr(name).map(str::to_string)
    }

    fn text(&self, selector: &str) -> Option<String> {
        self.first(selector).map(|el| el.text().collect::<String>())
    }
}

pub const POST_TITLE: &[Strategy<PostDocument>] =
    &[og_title, twitter_title, first_heading, page_title];

pub const POST_CONTENT: &[Strategy<PostDocument>] = &[
    tagged_content,
    content_class,
    article_body,
    post_class_substring,
];

fn og_title(doc: &PostDocument) -> Option<String> {
    doc.attr(r#"[property="og:title"]"#, "content")
}

fn twitter_title(doc: &PostDocument) -> Option<String> {
    doc.attr(r#"meta[name="twitter:title"]"#, "content")
}

fn first_heading(doc: &PostDocument) -> Option<String> {
    doc.text("h1")
}

fn page_title(doc: &PostDocument) -> Option<String> {
    let title = doc.text("title")?;
    match &doc.title_suffix {
        Some(suffix) => Some(suffix.replace(&title, "").into_owned()),
        None => Some(title),
    }
}

fn tagged_content(doc: &PostDocument) -> Option<String> {
    doc.text(r#"[data-tag="post-content"]"#)
}

fn content_class(doc: &PostDocument) -> Option<String> {
    doc.text(".post-content")
}

fn article_body(doc: &PostDocument) -> Option<String> {
    doc.text("article")
}

fn post_class_substring(doc: &PostDocument) -> Option<String> {
    doc.text(r#"[class*="post"]"#)
}
