use async_trait::async_trait;
use glimpse_http::{HttpClient, RequestOpts};
use std::borrow::Cow;
use std::time::Instant;

use super::types::OEmbed;
use crate::error::EnrichError;
use crate::source::VideoMetadataSource;

/// Client for an oEmbed endpoint such as `https://www.youtube.com/oembed`.
#[derive(Clone)]
pub struct OEmbedClient {
    http: HttpClient,
}

impl OEmbedClient {
    /// `http` must be anchored at the endpoint itself.
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn endpoint(&self) -> &str {
        self.http.base().as_str()
    }
}

#[async_trait]
impl VideoMetadataSource for OEmbedClient {
    async fn fetch_oembed(&self, video_url: &str) -> Result<OEmbed, EnrichError> {
        let started = Instant::now();
        let embed: OEmbed = self
            .http
            .get_json(
                "",
                RequestOpts {
                    query: Some(vec![
                        ("url", Cow::Borrowed(video_url)),
                        ("format", Cow::Borrowed("json")),
                    ]),
                    ..Default::default()
                },
            )
            .await?;

        tracing::debug!(
            target: "enrich.video",
            video_url,
            title = ?embed.title,
            author = ?embed.author_name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "oembed.fetched"
        );
        Ok(embed)
    }
}
