//! Loader for Glimpse configuration with YAML + environment overlays.
//!
//! Sources are merged in order: an optional YAML file, inline snippets, then
//! `GLIMPSE__`-prefixed environment variables (`__` separates nesting levels,
//! e.g. `GLIMPSE__POST__RELAY_ENDPOINT`). `${VAR}` placeholders inside string
//! values are expanded afterwards. Every field has a default, so an empty
//! source set yields the stock page configuration.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const CONFIG_FILE_NAME: &str = "glimpse.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlimpseConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub videos: VideoSettings,
    #[serde(default)]
    pub post: PostSettings,
}

/// Transport knobs shared by every outbound request.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            connect_timeout_secs: 5,
            user_agent: concat!("glimpse/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: Option<PathBuf>,
    /// `text` or `json`.
    pub format: String,
    pub stderr: bool,
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: None,
            format: "text".into(),
            stderr: false,
            filter: "info".into(),
        }
    }
}

/// The video grid job.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    pub enabled: bool,
    /// `id` of the grid container in the host page.
    pub mount: String,
    pub oembed_endpoint: String,
    pub thumbnail_base: String,
    pub fallback_title: String,
    /// Rendered in this order.
    pub links: Vec<String>,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mount: "video-grid".into(),
            oembed_endpoint: "https://www.youtube.com/oembed".into(),
            thumbnail_base: "https://img.youtube.com/vi".into(),
            fallback_title: "YouTube Video".into(),
            links: vec![
                "https://www.youtube.com/watch?v=MG8POs0jwUQ".into(),
                "https://www.youtube.com/watch?v=SkMjSF7C7r8".into(),
                "https://www.youtube.com/watch?v=4ewrGvc6PqM&t=6s".into(),
                "https://www.youtube.com/watch?v=Ij5hrTmfOgs".into(),
            ],
        }
    }
}

/// The single post preview job.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostSettings {
    pub enabled: bool,
    pub mount: String,
    pub url: String,
    /// Relay that returns `{ "contents": "<html>" }`; `None` fetches the post directly.
    pub relay_endpoint: Option<String>,
    pub category: String,
    /// Stripped from the end of `<title>` text (`Title | Site …`).
    pub site_name: Option<String>,
    pub fallback_title: String,
    pub fallback_body: String,
    pub read_more_label: String,
}

impl Default for PostSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mount: "blog-list".into(),
            url: "https://www.patreon.com/posts/bi-te-bi-li-lun-146765098?utm_medium=clipboard_copy&utm_source=copyLink&utm_campaign=postshare_creator&utm_content=join_link".into(),
            relay_endpoint: Some("https://api.allorigins.win/get".into()),
            category: "Patreon".into(),
            site_name: Some("Patreon".into()),
            fallback_title: "Patreon Post".into(),
            fallback_body: "Click the link below to read the full post on Patreon.".into(),
            read_more_label: "Read More →".into(),
        }
    }
}

/// `$XDG_CONFIG_HOME/glimpse/glimpse.yaml` (or the platform equivalent).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("glimpse").join(CONFIG_FILE_NAME))
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct GlimpseConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for GlimpseConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl GlimpseConfigLoader {
    /// Start with `GLIMPSE__` env overrides only.
    ///
    /// ```
    /// use glimpse_config::GlimpseConfigLoader;
    ///
    /// let config = GlimpseConfigLoader::new()
    ///     .with_yaml_str("version: '1'\nvideos:\n  links: []")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert!(config.videos.links.is_empty());
    /// assert_eq!(config.post.mount, "blog-list");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be missing, for environment-only deployments.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use glimpse_config::GlimpseConfigLoader;
    ///
    /// let cfg = GlimpseConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// post:
    ///   url: "https://example.com/posts/42"
    ///   relay_endpoint: null
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.post.url, "https://example.com/posts/42");
    /// assert!(cfg.post.relay_endpoint.is_none());
    /// assert_eq!(cfg.post.fallback_title, "Patreon Post");
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into [`GlimpseConfig`].
    ///
    /// Environment overrides are applied last, then `${VAR}` placeholders are
    /// expanded before the typed structs are materialised.
    ///
    /// ```
    /// use glimpse_config::GlimpseConfigLoader;
    ///
    /// unsafe { std::env::set_var("GLIMPSE_DOC_RELAY", "https://relay.example/get"); }
    ///
    /// let config = GlimpseConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// post:
    ///   relay_endpoint: "${GLIMPSE_DOC_RELAY}"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.post.relay_endpoint.as_deref(), Some("https://relay.example/get"));
    ///
    /// unsafe { std::env::remove_var("GLIMPSE_DOC_RELAY"); }
    /// ```
    pub fn load(self) -> Result<GlimpseConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("GLIMPSE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: GlimpseConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}
