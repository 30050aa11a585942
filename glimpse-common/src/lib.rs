//! Shared types and utilities for the Glimpse crates.
//!
//! This crate holds the data model that flows through the enrichment pipeline
//! and the tracing setup shared by the binary and integration tests. It stays
//! dependency-light so every other crate can depend on it.
//!
//! # Overview
//!
//! - [`ResourceRef`]: an external URL tagged with its [`Domain`]
//! - [`CanonicalId`]: the validated identifier resolved from a video URL
//! - [`ExtractedMetadata`]: field values collected while extracting
//! - [`CardModel`]: the render-ready card, always complete
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! A card built from empty metadata still renders with fallback literals:
//!
//! ```rust
//! use glimpse_common::{CanonicalId, CardModel, ExtractedMetadata, Field, ResourceRef};
//!
//! let link = ResourceRef::video("https://www.youtube.com/watch?v=MG8POs0jwUQ");
//! let id = CanonicalId::new("MG8POs0jwUQ");
//! let mut meta = ExtractedMetadata::default();
//! meta.insert(Field::ImagePrimary, format!("https://img.youtube.com/vi/{id}/maxresdefault.jpg"));
//!
//! let card = CardModel::video(&link, &meta, "YouTube Video");
//! assert_eq!(card.title(), "YouTube Video");
//! ```
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub mod observability;

/// Which enrichment job a resource belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Video,
    Post,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Video => f.write_str("video"),
            Domain::Post => f.write_str("post"),
        }
    }
}

/// An external URL plus the domain it is enriched under. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    url: String,
    domain: Domain,
}

impl ResourceRef {
    pub fn new(url: impl Into<String>, domain: Domain) -> Self {
        Self {
            url: url.into(),
            domain,
        }
    }

    pub fn video(url: impl Into<String>) -> Self {
        Self::new(url, Domain::Video)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(url, Domain::Post)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }
}

/// Identifier extracted from a [`ResourceRef`], e.g. an 11-character video token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalId(String);

impl CanonicalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named fields that extraction can fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Title,
    ImagePrimary,
    ImageFallback,
    Excerpt,
}

/// Field values gathered for one item, built up stage by stage.
///
/// Empty or whitespace-only values are never stored, so a present field is
/// always displayable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    fields: BTreeMap<Field, String>,
}

impl ExtractedMetadata {
    /// Store `value` under `field` unless it trims to nothing. Returns whether it was stored.
    pub fn insert(&mut self, field: Field, value: impl Into<String>) -> bool {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.fields.insert(field, trimmed.to_string());
        true
    }

    /// Like [`ExtractedMetadata::insert`], for values that may be absent.
    pub fn insert_opt(&mut self, field: Field, value: Option<String>) -> bool {
        value.is_some_and(|v| self.insert(field, v))
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Render-ready video card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoCard {
    pub link: String,
    pub title: String,
    pub image_primary: String,
    pub image_fallback: String,
}

/// Render-ready post card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCard {
    pub link: String,
    pub category: String,
    pub title: String,
    /// Preview text; `None` renders the fallback body instead.
    pub excerpt: Option<String>,
    pub fallback_body: String,
    pub read_more_label: String,
}

impl PostCard {
    /// Text shown in the card body.
    pub fn body(&self) -> &str {
        self.excerpt.as_deref().unwrap_or(&self.fallback_body)
    }
}

/// Static labels for post cards that never come from the fetched document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostLabels<'a> {
    pub category: &'a str,
    pub fallback_title: &'a str,
    pub fallback_body: &'a str,
    pub read_more_label: &'a str,
}

/// A card ready for rendering. Every variant is complete even when the
/// metadata it came from was empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CardModel {
    Video(VideoCard),
    Post(PostCard),
}

impl CardModel {
    /// Build a video card. Missing image fields render as empty sources, which
    /// the orchestrator never produces since images come from the id.
    pub fn video(link: &ResourceRef, meta: &ExtractedMetadata, fallback_title: &str) -> Self {
        let image_primary = meta.get(Field::ImagePrimary).unwrap_or_default();
        let image_fallback = meta
            .get(Field::ImageFallback)
            .unwrap_or(image_primary)
            .to_string();
        CardModel::Video(VideoCard {
            link: link.url().to_string(),
            title: meta.get(Field::Title).unwrap_or(fallback_title).to_string(),
            image_primary: image_primary.to_string(),
            image_fallback,
        })
    }

    pub fn post(link: &ResourceRef, meta: &ExtractedMetadata, labels: &PostLabels<'_>) -> Self {
        CardModel::Post(PostCard {
            link: link.url().to_string(),
            category: labels.category.to_string(),
            title: meta
                .get(Field::Title)
                .unwrap_or(labels.fallback_title)
                .to_string(),
            excerpt: meta.get(Field::Excerpt).map(str::to_string),
            fallback_body: labels.fallback_body.to_string(),
            read_more_label: labels.read_more_label.to_string(),
        })
    }

    pub fn domain(&self) -> Domain {
        match self {
            CardModel::Video(_) => Domain::Video,
            CardModel::Post(_) => Domain::Post,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            CardModel::Video(card) => &card.title,
            CardModel::Post(card) => &card.title,
        }
    }

    pub fn link(&self) -> &str {
        match self {
            CardModel::Video(card) => &card.link,
            CardModel::Post(card) => &card.link,
        }
    }
}
