use serde::{Deserialize, Serialize};

/// oEmbed response body. Only `title` is used for cards; the rest is kept
/// for diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OEmbed {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}
