//! Enrichment orchestration: resolve → fetch → extract → render, per item.
//!
//! Video links are processed strictly one after another so at most one oEmbed
//! request is in flight and cards land in input order. The post job runs
//! concurrently with the video loop; the two only share the page, and each
//! owns its detached [`Mount`] while running. No failure, including a panic
//! inside one item, escapes its item: it becomes a degraded card (or a skip
//! when a video link has no resolvable id).
use futures::FutureExt;
use glimpse_common::{
    CanonicalId, CardModel, Domain, ExtractedMetadata, Field, PostLabels, ResourceRef,
};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use crate::error::EnrichError;
use crate::extract::{POST_CONTENT, POST_TITLE, PostDocument, VIDEO_TITLE, extract_or, first_present};
use crate::page::{HostPage, Mount};
use crate::render::render_into;
use crate::resolve::resolve_video_id;
use crate::source::{PostSource, VideoMetadataSource};
use crate::summarize::summarize;
use crate::youtube::Thumbnails;

/// Per-item pipeline states, recorded in order as the item moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Resolved,
    Unresolved,
    Fetched,
    FetchFailed,
    Rendered,
    /// Rendered, but the container was gone when cards were attached.
    Dropped,
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemState::Pending => "pending",
            ItemState::Resolved => "resolved",
            ItemState::Unresolved => "unresolved",
            ItemState::Fetched => "fetched",
            ItemState::FetchFailed => "fetch_failed",
            ItemState::Rendered => "rendered",
            ItemState::Dropped => "dropped",
        };
        f.write_str(name)
    }
}

/// How one item ended.
#[derive(Debug)]
pub enum Outcome {
    /// Rendered from fetched metadata.
    Rendered,
    /// Rendered from id-derived data and literals after a failure.
    Degraded(EnrichError),
    /// Nothing rendered.
    Skipped(EnrichError),
}

#[derive(Debug)]
pub struct ItemReport {
    pub url: String,
    pub id: Option<CanonicalId>,
    pub states: Vec<ItemState>,
    pub outcome: Outcome,
}

impl ItemReport {
    fn new(domain: Domain, url: &str) -> Self {
        let report = Self {
            url: url.to_string(),
            id: None,
            states: Vec::new(),
            outcome: Outcome::Rendered,
        };
        report.trace(domain, ItemState::Pending)
    }

    fn trace(mut self, domain: Domain, state: ItemState) -> Self {
        self.record(domain, state);
        self
    }

    fn record(&mut self, domain: Domain, state: ItemState) {
        tracing::debug!(target: "enrich", %domain, url = %self.url, %state, "item.state");
        self.states.push(state);
    }

    /// Mark rendered unless the item was skipped.
    fn trace_rendered_if(self, domain: Domain) -> Self {
        if matches!(self.outcome, Outcome::Skipped(_)) {
            self
        } else {
            self.trace(domain, ItemState::Rendered)
        }
    }

    pub fn state(&self) -> Option<ItemState> {
        self.states.last().copied()
    }
}

/// What a job did with its mount.
#[derive(Debug)]
pub struct JobReport {
    pub domain: Domain,
    /// False when the job was disabled or its mount was missing.
    pub ran: bool,
    pub items: Vec<ItemReport>,
}

impl JobReport {
    fn idle(domain: Domain) -> Self {
        Self {
            domain,
            ran: false,
            items: Vec::new(),
        }
    }

    pub fn rendered(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Rendered))
    }

    pub fn degraded(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Degraded(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    /// The container was gone at attach time, so none of this job's cards reached the page.
    fn mark_dropped(&mut self, mount: &str) {
        let domain = self.domain;
        for item in &mut self.items {
            if matches!(item.outcome, Outcome::Skipped(_)) {
                continue;
            }
            item.record(domain, ItemState::Dropped);
            item.outcome = Outcome::Skipped(EnrichError::Mount(mount.to_string()));
        }
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.items.iter().filter(|item| pred(&item.outcome)).count()
    }
}

#[derive(Debug)]
pub struct EnrichReport {
    pub videos: JobReport,
    pub post: JobReport,
}

// ==============================
// Video job
// ==============================

/// The video grid: links in display order plus the literals for degraded cards.
#[derive(Debug, Clone)]
pub struct VideoJob {
    pub mount: String,
    pub links: Vec<ResourceRef>,
    pub thumbnail_base: String,
    pub fallback_title: String,
}

/// Enrich every link sequentially, appending one card per resolved link.
pub async fn run_video_job(
    source: &dyn VideoMetadataSource,
    job: &VideoJob,
    mount: &mut Mount,
) -> JobReport {
    let started = Instant::now();
    let mut report = JobReport {
        domain: Domain::Video,
        ran: true,
        items: Vec::with_capacity(job.links.len()),
    };

    for link in &job.links {
        let run = AssertUnwindSafe(enrich_video(source, job, link)).catch_unwind();
        let (card, item) = match run.await {
            Ok(done) => done,
            Err(_) => {
                tracing::error!(target: "enrich.video", url = link.url(), "item.panicked");
                degraded_video(job, link, EnrichError::Parse("extraction panicked".into()))
            }
        };
        if let Some(card) = card {
            render_into(mount, &card);
        }
        report.items.push(item.trace_rendered_if(Domain::Video));
    }

    tracing::info!(
        target: "enrich.video",
        mount = %job.mount,
        rendered = report.rendered(),
        degraded = report.degraded(),
        skipped = report.skipped(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "video.job.done"
    );
    report
}

async fn enrich_video(
    source: &dyn VideoMetadataSource,
    job: &VideoJob,
    link: &ResourceRef,
) -> (Option<CardModel>, ItemReport) {
    let mut item = ItemReport::new(Domain::Video, link.url());

    let Some(id) = resolve_video_id(link.url()) else {
        tracing::warn!(target: "enrich.video", url = link.url(), "invalid video url, skipping");
        item = item.trace(Domain::Video, ItemState::Unresolved);
        item.outcome = Outcome::Skipped(EnrichError::Resolution(link.url().to_string()));
        return (None, item);
    };
    item.id = Some(id.clone());
    item = item.trace(Domain::Video, ItemState::Resolved);

    let mut meta = video_images(job, &id);
    match source.fetch_oembed(link.url()).await {
        Ok(embed) => {
            item = item.trace(Domain::Video, ItemState::Fetched);
            meta.insert(Field::Title, extract_or(&embed, VIDEO_TITLE, &job.fallback_title));
        }
        Err(err) => {
            tracing::warn!(
                target: "enrich.video",
                url = link.url(),
                kind = err.kind(),
                error = %err,
                "video metadata unavailable, rendering degraded card"
            );
            item = item.trace(Domain::Video, ItemState::FetchFailed);
            item.outcome = Outcome::Degraded(err);
        }
    }

    let card = CardModel::video(link, &meta, &job.fallback_title);
    (Some(card), item)
}

fn video_images(job: &VideoJob, id: &CanonicalId) -> ExtractedMetadata {
    let thumbs = Thumbnails::for_id(&job.thumbnail_base, id);
    let mut meta = ExtractedMetadata::default();
    meta.insert(Field::ImagePrimary, thumbs.primary);
    meta.insert(Field::ImageFallback, thumbs.fallback);
    meta
}

fn degraded_video(
    job: &VideoJob,
    link: &ResourceRef,
    err: EnrichError,
) -> (Option<CardModel>, ItemReport) {
    let mut item = ItemReport::new(Domain::Video, link.url());
    match resolve_video_id(link.url()) {
        Some(id) => {
            let meta = video_images(job, &id);
            item.id = Some(id);
            item = item.trace(Domain::Video, ItemState::FetchFailed);
            item.outcome = Outcome::Degraded(err);
            (Some(CardModel::video(link, &meta, &job.fallback_title)), item)
        }
        None => {
            item = item.trace(Domain::Video, ItemState::Unresolved);
            item.outcome = Outcome::Skipped(err);
            (None, item)
        }
    }
}

// ==============================
// Post job
// ==============================

/// The single post preview.
#[derive(Debug, Clone)]
pub struct PostJob {
    pub mount: String,
    pub link: ResourceRef,
    /// Suffix stripped from `<title>` text.
    pub site_name: Option<String>,
    pub category: String,
    pub fallback_title: String,
    pub fallback_body: String,
    pub read_more_label: String,
}

impl PostJob {
    pub fn labels(&self) -> PostLabels<'_> {
        PostLabels {
            category: &self.category,
            fallback_title: &self.fallback_title,
            fallback_body: &self.fallback_body,
            read_more_label: &self.read_more_label,
        }
    }
}

/// Title and excerpt from a post page. Fields no strategy could fill are left out.
pub fn extract_post_metadata(html: &str, site_name: Option<&str>) -> ExtractedMetadata {
    let doc = PostDocument::parse(html, site_name);
    let mut meta = ExtractedMetadata::default();
    meta.insert_opt(Field::Title, first_present(&doc, POST_TITLE));
    meta.insert_opt(
        Field::Excerpt,
        first_present(&doc, POST_CONTENT).map(|body| summarize(&body)),
    );
    meta
}

/// Fetch, extract and prepend the post card; any failure prepends the fallback card.
pub async fn run_post_job(source: &dyn PostSource, job: &PostJob, mount: &mut Mount) -> JobReport {
    let started = Instant::now();
    let run = AssertUnwindSafe(enrich_post(source, job)).catch_unwind();
    let (card, item) = match run.await {
        Ok(done) => done,
        Err(_) => {
            tracing::error!(target: "enrich.post", url = job.link.url(), "item.panicked");
            let mut item = ItemReport::new(Domain::Post, job.link.url())
                .trace(Domain::Post, ItemState::Resolved)
                .trace(Domain::Post, ItemState::FetchFailed);
            item.outcome = Outcome::Degraded(EnrichError::Parse("extraction panicked".into()));
            let card = CardModel::post(&job.link, &ExtractedMetadata::default(), &job.labels());
            (card, item)
        }
    };
    render_into(mount, &card);
    let item = item.trace(Domain::Post, ItemState::Rendered);

    tracing::info!(
        target: "enrich.post",
        mount = %job.mount,
        degraded = matches!(item.outcome, Outcome::Degraded(_)),
        title = card.title(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "post.job.done"
    );
    JobReport {
        domain: Domain::Post,
        ran: true,
        items: vec![item],
    }
}

async fn enrich_post(source: &dyn PostSource, job: &PostJob) -> (CardModel, ItemReport) {
    // The post URL is its own identifier.
    let mut item =
        ItemReport::new(Domain::Post, job.link.url()).trace(Domain::Post, ItemState::Resolved);
    let meta = match source.fetch_html(job.link.url()).await {
        Ok(html) => {
            item = item.trace(Domain::Post, ItemState::Fetched);
            let meta = extract_post_metadata(&html, job.site_name.as_deref());
            tracing::debug!(
                target: "enrich.post",
                has_title = meta.contains(Field::Title),
                has_excerpt = meta.contains(Field::Excerpt),
                "post.extracted"
            );
            meta
        }
        Err(err) => {
            tracing::warn!(
                target: "enrich.post",
                url = job.link.url(),
                kind = err.kind(),
                error = %err,
                "post unavailable, rendering fallback card"
            );
            item = item.trace(Domain::Post, ItemState::FetchFailed);
            item.outcome = Outcome::Degraded(err);
            ExtractedMetadata::default()
        }
    };
    (CardModel::post(&job.link, &meta, &job.labels()), item)
}

// ==============================
// Page
// ==============================

fn detach_mount(page: &HostPage, domain: Domain, id: &str) -> Option<Mount> {
    let mount = page.detach(id);
    if mount.is_none() {
        tracing::debug!(target: "enrich", %domain, mount = id, "mount missing, job disabled");
    }
    mount
}

/// Run both jobs against `page`. A job given as `None`, or whose mount the
/// page lacks, is skipped silently.
pub async fn enrich_page(
    page: &mut HostPage,
    videos: Option<(&dyn VideoMetadataSource, &VideoJob)>,
    post: Option<(&dyn PostSource, &PostJob)>,
) -> EnrichReport {
    let video_run = videos.and_then(|(source, job)| {
        detach_mount(page, Domain::Video, &job.mount).map(|mount| (source, job, mount))
    });
    let post_run = post.and_then(|(source, job)| {
        detach_mount(page, Domain::Post, &job.mount).map(|mount| (source, job, mount))
    });

    let video_fut = async move {
        match video_run {
            Some((source, job, mut mount)) => {
                let report = run_video_job(source, job, &mut mount).await;
                (Some(mount), report)
            }
            None => (None, JobReport::idle(Domain::Video)),
        }
    };
    let post_fut = async move {
        match post_run {
            Some((source, job, mut mount)) => {
                let report = run_post_job(source, job, &mut mount).await;
                (Some(mount), report)
            }
            None => (None, JobReport::idle(Domain::Post)),
        }
    };

    let ((video_mount, mut videos), (post_mount, mut post)) = tokio::join!(video_fut, post_fut);

    let mut filled = Vec::with_capacity(2);
    if let Some(mount) = video_mount {
        filled.push((mount, &mut videos));
    }
    if let Some(mount) = post_mount {
        filled.push((mount, &mut post));
    }
    attach_jobs(page, filled);

    EnrichReport { videos, post }
}

/// Attach every filled mount in one pass; a job whose container is gone has
/// its rendered items moved to skipped.
fn attach_jobs(page: &mut HostPage, filled: Vec<(Mount, &mut JobReport)>) {
    let (mounts, reports): (Vec<Mount>, Vec<&mut JobReport>) = filled.into_iter().unzip();
    let ids: Vec<String> = mounts.iter().map(|mount| mount.id().to_string()).collect();
    let attached = page.attach_all(mounts);

    for ((report, id), ok) in reports.into_iter().zip(ids).zip(attached) {
        if !ok {
            tracing::warn!(target: "enrich", domain = %report.domain, mount = %id, "mount vanished before attach");
            report.mark_dropped(&id);
        }
    }
}
