//! Document-level parser: runs every configured field against one page.
//!
//! Global cleanup runs once on the parsed document, then fields are resolved
//! in [`FIELD_ORDER`]. Content comes last so that nothing a metadata field
//! reads can be affected by the content field's cleanup list.
//!
//! # Example
//!
//! ```rust
//! use excerpta_core::config::DomainConfig;
//! use excerpta_core::parser::DocumentParser;
//!
//! let config = DomainConfig::from_json(r#"{
//!     "domain": "example.com",
//!     "title": {"selector": "h1"},
//!     "content": {"selector": ".content", "type": "html"}
//! }"#).unwrap();
//!
//! let doc = DocumentParser::new(&config)
//!     .parse(r#"<h1>T</h1><div class="content"><p>Body.</p></div>"#);
//!
//! assert_eq!(doc.text(excerpta_core::config::Field::Title), Some("T"));
//! assert!(doc.content().is_some());
//! ```

use serde::ser::{Serialize, SerializeMap, Serializer};
use url::Url;

use crate::config::{DomainConfig, Field};
use crate::parse::Document;
use crate::query::{Arena, Queries};
use crate::resolver::{ElementResolver, ExtractedValue};
use crate::selector::FieldSpec;
use crate::{ExcerptaError, Result};

type Accessor = fn(&DomainConfig) -> Option<&FieldSpec>;

/// Evaluation order of document fields.
pub const FIELD_ORDER: [(Field, Accessor); 10] = [
    (Field::Title, |c| c.title.as_ref()),
    (Field::Description, |c| c.description.as_ref()),
    (Field::Authors, |c| c.authors.as_ref()),
    (Field::DatePublished, |c| c.date_published.as_ref()),
    (Field::DateModified, |c| c.date_modified.as_ref()),
    (Field::Tags, |c| c.tags.as_ref()),
    (Field::Topics, |c| c.topics.as_ref()),
    (Field::MainPoints, |c| c.main_points.as_ref()),
    (Field::FollowUrls, |c| c.follow_urls.as_ref()),
    (Field::Content, |c| c.content.as_ref()),
];

/// Result of a parse pass.
///
/// Fields are kept in evaluation order. A field that resolved to nothing is
/// absent rather than empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedDocument {
    fields: Vec<(Field, ExtractedValue)>,
}

impl ExtractedDocument {
    pub fn get(&self, field: Field) -> Option<&ExtractedValue> {
        self.fields.iter().find(|(name, _)| *name == field).map(|(_, value)| value)
    }

    /// Scalar value of a field, or the first entry of a list field.
    pub fn text(&self, field: Field) -> Option<&str> {
        self.get(field).and_then(ExtractedValue::first)
    }

    /// Values of a field as a list; empty when the field is absent.
    pub fn list(&self, field: Field) -> Vec<String> {
        self.get(field).map(ExtractedValue::to_vec).unwrap_or_default()
    }

    /// Extracted content, if any.
    pub fn content(&self) -> Option<&str> {
        self.text(Field::Content)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.get(field).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &ExtractedValue)> {
        self.fields.iter().map(|(field, value)| (*field, value))
    }

    fn insert(&mut self, field: Field, value: ExtractedValue) {
        self.fields.push((field, value));
    }
}

impl Serialize for ExtractedDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in &self.fields {
            map.serialize_entry(field.name(), value)?;
        }
        map.end()
    }
}

/// Applies a [`DomainConfig`] to HTML pages.
pub struct DocumentParser<'c> {
    config: &'c DomainConfig,
    base_url: Option<Url>,
}

impl<'c> DocumentParser<'c> {
    pub fn new(config: &'c DomainConfig) -> Self {
        Self { config, base_url: None }
    }

    /// Base URL used to absolutize extracted `href`/`src` values.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Parses a page and resolves every configured field.
    pub fn parse(&self, html: &str) -> ExtractedDocument {
        let mut document = Document::parse(html);
        if let Some(base_url) = &self.base_url {
            document = document.with_base_url(base_url.clone());
        }

        if !self.config.cleanup.is_empty() {
            let removed = document.remove_matching(&self.config.cleanup);
            tracing::debug!(domain = %self.config.domain, removed, "applied global cleanup");
        }

        self.extract(&document)
    }

    /// Resolves every configured field against an already prepared document.
    ///
    /// Global cleanup is not applied.
    pub fn extract(&self, document: &Document) -> ExtractedDocument {
        let arena = Arena::default();
        let session = Queries::new(document.html(), &arena);
        let resolver = ElementResolver::new(document);
        let mut extracted = ExtractedDocument::default();

        for (field, accessor) in FIELD_ORDER {
            let Some(spec) = accessor(self.config) else {
                continue;
            };

            match resolver.resolve_in(&session, spec) {
                Some(value) => extracted.insert(field, value),
                None => tracing::debug!(domain = %self.config.domain, %field, "field not found"),
            }
        }

        extracted
    }
}

/// Parses `html` with `config`, resolving links against `base_url`.
///
/// # Errors
///
/// Returns [`ExcerptaError::InvalidUrl`] if `base_url` is given but is not an
/// absolute URL.
pub fn parse_document(html: &str, config: &DomainConfig, base_url: Option<&str>) -> Result<ExtractedDocument> {
    let mut parser = DocumentParser::new(config);
    if let Some(base_url) = base_url {
        let url = Url::parse(base_url).map_err(|e| ExcerptaError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        parser = parser.with_base_url(url);
    }
    Ok(parser.parse(html))
}
