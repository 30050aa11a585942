use async_trait::async_trait;
use glimpse_http::{HttpClient, RequestOpts};
use std::borrow::Cow;

use super::types::RelayEnvelope;
use crate::error::EnrichError;
use crate::source::PostSource;

/// Fetches pages through a relay that answers `GET ?url=<target>` with a JSON
/// envelope whose `contents` holds the page body.
///
/// When the envelope's `status.http_code` is present and not 2xx, the body is
/// treated as an upstream error page and rejected even if `contents` is set.
#[derive(Clone)]
pub struct RelayClient {
    http: HttpClient,
}

impl RelayClient {
    /// `http` must be anchored at the relay endpoint.
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl PostSource for RelayClient {
    async fn fetch_html(&self, post_url: &str) -> Result<String, EnrichError> {
        let envelope: RelayEnvelope = self
            .http
            .get_json(
                "",
                RequestOpts {
                    query: Some(vec![("url", Cow::Borrowed(post_url))]),
                    ..Default::default()
                },
            )
            .await?;

        if let Some(status) = &envelope.status {
            tracing::debug!(
                target: "enrich.post",
                upstream_code = ?status.http_code,
                content_type = ?status.content_type,
                response_time_ms = ?status.response_time,
                "relay.status"
            );
            if !status.upstream_ok() {
                return Err(EnrichError::Transport(format!(
                    "relay reported upstream status {}",
                    status.http_code.unwrap_or_default()
                )));
            }
        }

        envelope
            .contents
            .filter(|body| !body.trim().is_empty())
            .ok_or_else(|| EnrichError::Parse("relay envelope has no contents".into()))
    }
}

/// Fetches the page itself. A server-side render is not bound by
/// same-origin rules, so this is used when no relay is configured.
#[derive(Clone)]
pub struct DirectClient {
    http: HttpClient,
}

impl DirectClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl PostSource for DirectClient {
    async fn fetch_html(&self, post_url: &str) -> Result<String, EnrichError> {
        let body = self
            .http
            .get_text(
                post_url,
                RequestOpts {
                    allow_absolute: true,
                    ..Default::default()
                },
            )
            .await?;
        if body.trim().is_empty() {
            return Err(EnrichError::Parse("empty page body".into()));
        }
        Ok(body)
    }
}
