//! Video metadata over the public oEmbed endpoint.
//!
//! Thumbnails are never fetched as metadata: both tiers are derived from the
//! canonical id, so a card can be built even when the oEmbed call fails.
pub mod client;
pub mod types;

pub use client::OEmbedClient;

use glimpse_common::CanonicalId;

/// Primary and fallback thumbnail URLs for one video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnails {
    pub primary: String,
    pub fallback: String,
}

impl Thumbnails {
    /// `{base}/{id}/maxresdefault.jpg`, falling back to `hqdefault.jpg`.
    ///
    /// ```
    /// use glimpse_common::CanonicalId;
    /// use glimpse_web::youtube::Thumbnails;
    ///
    /// let thumbs = Thumbnails::for_id("https://img.youtube.com/vi/", &CanonicalId::new("MG8POs0jwUQ"));
    /// assert_eq!(thumbs.primary, "https://img.youtube.com/vi/MG8POs0jwUQ/maxresdefault.jpg");
    /// assert_eq!(thumbs.fallback, "https://img.youtube.com/vi/MG8POs0jwUQ/hqdefault.jpg");
    /// ```
    pub fn for_id(base: &str, id: &CanonicalId) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            primary: format!("{base}/{id}/maxresdefault.jpg"),
            fallback: format!("{base}/{id}/hqdefault.jpg"),
        }
    }
}
