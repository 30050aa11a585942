use serde::Deserialize;

/// Envelope returned by an allorigins-style relay: the upstream body plus
/// what the relay saw when fetching it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayEnvelope {
    #[serde(default)]
    pub contents: Option<String>,
    #[serde(default)]
    pub status: Option<RelayStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayStatus {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub http_code: Option<u16>,
    #[serde(default)]
    pub response_time: Option<u64>,
}

impl RelayStatus {
    /// Upstream status is unknown or 2xx.
    pub fn upstream_ok(&self) -> bool {
        self.http_code.is_none_or(|code| (200..300).contains(&code))
    }
}
