//! Seams between the orchestrator and the network.
//!
//! Each call is exactly one attempt; implementations never retry.
use async_trait::async_trait;

use crate::error::EnrichError;
use crate::youtube::types::OEmbed;

#[async_trait]
pub trait VideoMetadataSource: Send + Sync {
    /// Structured metadata for the original (not canonicalized) video URL.
    async fn fetch_oembed(&self, video_url: &str) -> Result<OEmbed, EnrichError>;
}

#[async_trait]
pub trait PostSource: Send + Sync {
    /// Raw HTML of the page at `post_url`.
    async fn fetch_html(&self, post_url: &str) -> Result<String, EnrichError>;
}
