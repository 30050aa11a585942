//! Canonical id extraction for video links.
use glimpse_common::CanonicalId;
use regex::Regex;
use std::sync::LazyLock;

/// Length of a video token.
pub const VIDEO_ID_LEN: usize = 11;

// Greedy prefix: the token after the *last* recognized marker wins.
static VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*(youtu.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*")
        .expect("video url pattern")
});

/// Extract the video token from a watch, short, embed, legacy or channel link.
///
/// Returns `None` unless the token is exactly [`VIDEO_ID_LEN`] characters.
///
/// ```
/// use glimpse_web::resolve::resolve_video_id;
///
/// let id = resolve_video_id("https://www.youtube.com/watch?v=4ewrGvc6PqM&t=6s").unwrap();
/// assert_eq!(id.as_str(), "4ewrGvc6PqM");
/// assert!(resolve_video_id("https://example.com/").is_none());
/// ```
pub fn resolve_video_id(url: &str) -> Option<CanonicalId> {
    let caps = VIDEO_URL.captures(url)?;
    let token = caps.get(2)?.as_str();
    (token.chars().count() == VIDEO_ID_LEN).then(|| CanonicalId::new(token))
}
