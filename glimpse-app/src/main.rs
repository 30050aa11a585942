use anyhow::{Context, Result};
use clap::Parser;
use glimpse_common::observability::init_logging;
use glimpse_config::{GlimpseConfigLoader, default_config_path};
use std::io::Write;
use std::path::PathBuf;

mod host;

/// Enrich a static page with video cards and a post preview.
#[derive(Debug, Parser)]
#[command(name = "glimpse", version)]
struct Args {
    /// YAML configuration file (defaults to the per-user config path when present).
    #[arg(long, env = "GLIMPSE_CONFIG")]
    config: Option<PathBuf>,

    /// Host page to enrich.
    #[arg(long)]
    page: PathBuf,

    /// Where to write the enriched page; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Copy log events to stderr.
    #[arg(long)]
    log_stderr: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1) Load config (env wins)
    let loader = match &args.config {
        Some(path) => GlimpseConfigLoader::new().with_file(path),
        None => match default_config_path() {
            Some(path) => GlimpseConfigLoader::new().with_optional_file(path),
            None => GlimpseConfigLoader::new(),
        },
    };
    let cfg = loader.load().context("failed to load configuration")?;

    // 2) Logging
    let log_path = init_logging(host::log_config(&cfg.logging, args.log_stderr))?;
    tracing::info!(target: "glimpse", log = %log_path.display(), page = %args.page.display(), "start");

    // 3) Page in, enriched page out
    let html = std::fs::read_to_string(&args.page)
        .with_context(|| format!("failed to read page: {}", args.page.display()))?;
    let (enriched, report) = host::enrich(&cfg, html).await?;
    host::log_summary(&report);

    match &args.out {
        Some(path) => std::fs::write(path, enriched)
            .with_context(|| format!("failed to write page: {}", path.display()))?,
        None => std::io::stdout()
            .write_all(enriched.as_bytes())
            .context("failed to write page to stdout")?,
    }
    Ok(())
}
