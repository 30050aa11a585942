//! External-content enrichment for a static page.
//!
//! - Video ids from watch/short/embed links (`resolve`)
//! - Ordered-fallback field extraction over oEmbed JSON and post HTML (`extract`)
//! - Bounded previews (`summarize`) and escaped card markup (`render`)
//! - Host page mount points (`page`)
//! - oEmbed and relay/direct post sources (`youtube`, `relay`) behind the
//!   traits in `source`
//! - The per-item pipeline and both jobs (`pipeline`)

pub mod error;
pub mod extract;
pub mod page;
pub mod pipeline;
pub mod relay;
pub mod render;
pub mod resolve;
pub mod source;
pub mod summarize;
pub mod youtube;

pub use error::EnrichError;
pub use page::{HostPage, Mount};
pub use pipeline::{
    EnrichReport, ItemState, JobReport, Outcome, PostJob, VideoJob, enrich_page, run_post_job,
    run_video_job,
};
pub use source::{PostSource, VideoMetadataSource};
