//! Wiring from configuration to the enrichment jobs.
use anyhow::{Context, Result};
use glimpse_common::ResourceRef;
use glimpse_common::observability::{LogConfig, LogFormat};
use glimpse_config::{GlimpseConfig, HttpSettings, LoggingSettings, PostSettings, VideoSettings};
use glimpse_http::HttpClient;
use glimpse_web::relay::{DirectClient, RelayClient};
use glimpse_web::youtube::OEmbedClient;
use glimpse_web::{
    EnrichReport, HostPage, JobReport, PostJob, PostSource, VideoJob, VideoMetadataSource,
    enrich_page,
};
use std::time::Duration;

pub fn log_config(settings: &LoggingSettings, force_stderr: bool) -> LogConfig {
    LogConfig {
        app_name: "glimpse",
        log_dir: settings.dir.clone(),
        emit_stderr: settings.stderr || force_stderr,
        format: LogFormat::from_name(&settings.format),
        default_filter: settings.filter.clone(),
    }
}

fn http_client(settings: &HttpSettings, base: &str) -> Result<HttpClient> {
    HttpClient::builder(base)
        .timeout(Duration::from_secs(settings.timeout_secs))
        .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .user_agent(settings.user_agent.clone())
        .build()
        .with_context(|| format!("invalid endpoint: {base}"))
}

pub fn video_job(settings: &VideoSettings) -> Option<VideoJob> {
    settings.enabled.then(|| VideoJob {
        mount: settings.mount.clone(),
        links: settings.links.iter().map(ResourceRef::video).collect(),
        thumbnail_base: settings.thumbnail_base.clone(),
        fallback_title: settings.fallback_title.clone(),
    })
}

pub fn post_job(settings: &PostSettings) -> Option<PostJob> {
    settings.enabled.then(|| PostJob {
        mount: settings.mount.clone(),
        link: ResourceRef::post(settings.url.clone()),
        site_name: settings.site_name.clone(),
        category: settings.category.clone(),
        fallback_title: settings.fallback_title.clone(),
        fallback_body: settings.fallback_body.clone(),
        read_more_label: settings.read_more_label.clone(),
    })
}

fn post_source(http: &HttpSettings, settings: &PostSettings) -> Result<Box<dyn PostSource>> {
    match settings.relay_endpoint.as_deref().map(str::trim) {
        Some(relay) if !relay.is_empty() => Ok(Box::new(RelayClient::new(http_client(http, relay)?))),
        _ => {
            tracing::debug!(target: "glimpse", "no relay configured, fetching post directly");
            Ok(Box::new(DirectClient::new(http_client(http, &settings.url)?)))
        }
    }
}

/// Enrich `html` with every enabled job. Only client construction can fail.
pub async fn enrich(cfg: &GlimpseConfig, html: String) -> Result<(String, EnrichReport)> {
    let videos = video_job(&cfg.videos);
    let post = post_job(&cfg.post);

    let oembed = match &videos {
        Some(_) => Some(OEmbedClient::new(http_client(&cfg.http, &cfg.videos.oembed_endpoint)?)),
        None => None,
    };
    let relay = match &post {
        Some(_) => Some(post_source(&cfg.http, &cfg.post)?),
        None => None,
    };

    let video_arg = oembed
        .as_ref()
        .zip(videos.as_ref())
        .map(|(source, job)| (source as &dyn VideoMetadataSource, job));
    let post_arg = relay.as_deref().zip(post.as_ref());

    let mut page = HostPage::new(html);
    let report = enrich_page(&mut page, video_arg, post_arg).await;
    Ok((page.into_html(), report))
}

fn log_job(report: &JobReport) {
    if !report.ran {
        tracing::info!(target: "glimpse", domain = %report.domain, "job.skipped");
        return;
    }
    tracing::info!(
        target: "glimpse",
        domain = %report.domain,
        rendered = report.rendered(),
        degraded = report.degraded(),
        skipped = report.skipped(),
        "job.summary"
    );
}

pub fn log_summary(report: &EnrichReport) {
    log_job(&report.videos);
    log_job(&report.post);
}
