//! HTML card rendering.
//!
//! Titles and excerpts come from third parties, so every interpolated value is
//! entity-encoded: text nodes with `encode_text`, double-quoted attribute
//! values with `encode_double_quoted_attribute`.
use glimpse_common::{CardModel, PostCard, VideoCard};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use crate::page::Mount;

pub fn render_video_card(card: &VideoCard) -> String {
    let link = attr(&card.link);
    let alt = attr(&card.title);
    let title = text(&card.title);
    let primary = attr(&card.image_primary);
    // The fallback URL sits inside a JS string inside an attribute.
    let js_fallback = card.image_fallback.replace('\\', "\\\\").replace('\'', "\\'");
    let fallback = attr(&js_fallback);
    format!(
        r#"<div class="video-card">
    <a href="{link}" target="_blank" rel="noopener" class="video-link">
        <div class="video-thumbnail">
            <img src="{primary}" alt="{alt}" loading="lazy" onerror="this.onerror=null;this.src='{fallback}'">
            <div class="play-overlay">
                <span class="play-icon">▶</span>
            </div>
        </div>
        <h3>{title}</h3>
    </a>
</div>"#
    )
}

pub fn render_post_card(card: &PostCard) -> String {
    let link = attr(&card.link);
    format!(
        r#"<article class="blog-item">
    <div class="blog-meta">
        <span class="blog-category">{category}</span>
    </div>
    <h3>{title}</h3>
    <p>{body}</p>
    <a href="{link}" class="read-more" target="_blank" rel="noopener">{read_more}</a>
</article>"#,
        category = text(&card.category),
        title = text(&card.title),
        body = text(card.body()),
        read_more = text(&card.read_more_label),
    )
}

pub fn render_card(card: &CardModel) -> String {
    match card {
        CardModel::Video(video) => render_video_card(video),
        CardModel::Post(post) => render_post_card(post),
    }
}

/// Render `card` into `mount`: videos are appended in call order, posts go to
/// the front so fresh content shows first.
pub fn render_into(mount: &mut Mount, card: &CardModel) {
    let html = render_card(card);
    match card {
        CardModel::Video(_) => mount.append(html),
        CardModel::Post(_) => mount.prepend(html),
    }
}
