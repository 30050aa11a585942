use glimpse_http::HttpError;

/// Why one item's pipeline run could not use remote data.
///
/// Every variant is recoverable: the orchestrator turns it into a degraded
/// card (or a skip, for [`EnrichError::Resolution`] and [`EnrichError::Mount`])
/// and moves on.
#[derive(thiserror::Error, Debug)]
pub enum EnrichError {
    /// The URL did not contain a recognizable identifier.
    #[error("unrecognized resource url: {0}")]
    Resolution(String),

    /// Network failure, non-success status, or an upstream failure reported by a relay.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The response arrived but its body could not be interpreted.
    #[error("parse failure: {0}")]
    Parse(String),

    /// The item's container was missing when its card was attached.
    #[error("container not on page: {0}")]
    Mount(String),
}

impl EnrichError {
    /// Short stable label for logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            EnrichError::Resolution(_) => "resolution",
            EnrichError::Transport(_) => "transport",
            EnrichError::Parse(_) => "parse",
            EnrichError::Mount(_) => "mount",
        }
    }
}

impl From<HttpError> for EnrichError {
    fn from(err: HttpError) -> Self {
        if err.is_decode() {
            EnrichError::Parse(err.to_string())
        } else {
            EnrichError::Transport(err.to_string())
        }
    }
}
