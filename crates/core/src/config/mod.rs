//! Per-domain extraction recipes.
//!
//! A [`DomainConfig`] is a JSON document naming one [`FieldSpec`] per
//! document field plus a global cleanup list. Configs are validated once,
//! when they are loaded, and are read-only afterwards.
//!
//! # Example
//!
//! ```rust
//! use excerpta_core::config::{DomainConfig, Field};
//!
//! let config = DomainConfig::from_json(r#"{
//!     "domain": "example.com",
//!     "title": {"selector": "h1.post-title"},
//!     "content": {"selector": ".content", "type": "html"}
//! }"#).unwrap();
//!
//! assert_eq!(config.lang, "en");
//! assert!(config.field(Field::Title).is_some());
//! assert!(config.field(Field::Tags).is_none());
//! ```

pub mod loader;

pub use loader::{ConfigLoader, ConfigLoaderBuilder};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::selector::FieldSpec;
use crate::{ExcerptaError, Result};

/// Named field slots of a document, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Description,
    Authors,
    DatePublished,
    DateModified,
    Tags,
    Topics,
    MainPoints,
    FollowUrls,
    Content,
}

impl Field {
    /// Every field, metadata first and `Content` last.
    pub const ALL: [Field; 10] = [
        Field::Title,
        Field::Description,
        Field::Authors,
        Field::DatePublished,
        Field::DateModified,
        Field::Tags,
        Field::Topics,
        Field::MainPoints,
        Field::FollowUrls,
        Field::Content,
    ];

    /// Config and output key of the field.
    pub fn name(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::Authors => "authors",
            Field::DatePublished => "date_published",
            Field::DateModified => "date_modified",
            Field::Tags => "tags",
            Field::Topics => "topics",
            Field::MainPoints => "main_points",
            Field::FollowUrls => "follow_urls",
            Field::Content => "content",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_content_type() -> String {
    "article".to_string()
}

/// Extraction recipe for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainConfig {
    pub domain: String,

    #[serde(default = "default_lang")]
    pub lang: String,

    #[serde(rename = "type", default = "default_content_type")]
    pub content_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<FieldSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<FieldSpec>,
    /// Also read from the singular `author` key.
    #[serde(default, alias = "author", skip_serializing_if = "Option::is_none")]
    pub authors: Option<FieldSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_published: Option<FieldSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<FieldSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<FieldSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<FieldSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_points: Option<FieldSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_urls: Option<FieldSpec>,

    /// Mandatory. Checked by [`DomainConfig::validate`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<FieldSpec>,

    /// Queries removed from the whole document before any field is read.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleanup: Vec<String>,

    /// Sitemap URLs for discovery tooling. Not used during extraction.
    #[serde(default, alias = "manual_sitemaps", skip_serializing_if = "Vec::is_empty")]
    pub sitemaps: Vec<String>,

    /// Feed URLs for discovery tooling. Not used during extraction.
    #[serde(default, alias = "manual_rss_feeds", skip_serializing_if = "Vec::is_empty")]
    pub rss_feeds: Vec<String>,
}

impl DomainConfig {
    /// A config with only the mandatory fields set.
    pub fn new(domain: impl Into<String>, content: FieldSpec) -> Self {
        Self {
            domain: domain.into(),
            lang: default_lang(),
            content_type: default_content_type(),
            title: None,
            description: None,
            authors: None,
            date_published: None,
            date_modified: None,
            tags: None,
            topics: None,
            main_points: None,
            follow_urls: None,
            content: Some(content),
            cleanup: Vec::new(),
            sitemaps: Vec::new(),
            rss_feeds: Vec::new(),
        }
    }

    /// Sets a field slot.
    pub fn with_field(mut self, field: Field, spec: FieldSpec) -> Self {
        *self.slot_mut(field) = Some(spec);
        self
    }

    pub fn with_cleanup<I, S>(mut self, queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cleanup = queries.into_iter().map(Into::into).collect();
        self
    }

    /// Parses and validates a config from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ExcerptaError::Json`] for malformed JSON or unknown keys,
    /// and the errors of [`DomainConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self> {
        let config: DomainConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ExcerptaError::FileNotFound(path.to_path_buf()));
        }
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Checks the config invariants.
    ///
    /// # Errors
    ///
    /// [`ExcerptaError::MissingContent`] when the `content` slot is empty,
    /// [`ExcerptaError::ConfigError`] for a blank domain or an invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.domain.trim().is_empty() {
            return Err(ExcerptaError::ConfigError("domain must not be empty".to_string()));
        }

        if self.content.is_none() {
            return Err(ExcerptaError::MissingContent { domain: self.domain.clone() });
        }

        for field in Field::ALL {
            if let Some(spec) = self.field(field) {
                spec.check()
                    .map_err(|reason| ExcerptaError::ConfigError(format!("{}.{}: {}", self.domain, field, reason)))?;
            }
        }

        Ok(())
    }

    /// The selector configuration for a field slot.
    pub fn field(&self, field: Field) -> Option<&FieldSpec> {
        match field {
            Field::Title => self.title.as_ref(),
            Field::Description => self.description.as_ref(),
            Field::Authors => self.authors.as_ref(),
            Field::DatePublished => self.date_published.as_ref(),
            Field::DateModified => self.date_modified.as_ref(),
            Field::Tags => self.tags.as_ref(),
            Field::Topics => self.topics.as_ref(),
            Field::MainPoints => self.main_points.as_ref(),
            Field::FollowUrls => self.follow_urls.as_ref(),
            Field::Content => self.content.as_ref(),
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<FieldSpec> {
        match field {
            Field::Title => &mut self.title,
            Field::Description => &mut self.description,
            Field::Authors => &mut self.authors,
            Field::DatePublished => &mut self.date_published,
            Field::DateModified => &mut self.date_modified,
            Field::Tags => &mut self.tags,
            Field::Topics => &mut self.topics,
            Field::MainPoints => &mut self.main_points,
            Field::FollowUrls => &mut self.follow_urls,
            Field::Content => &mut self.content,
        }
    }
}
