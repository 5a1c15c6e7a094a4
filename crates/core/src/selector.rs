//! Selector model: single query attempts and field-level extraction recipes.
//!
//! A field's `selector` value in a domain config may be written three ways,
//! all of which normalize to an ordered `Vec<QuerySpec>` at deserialization
//! time:
//!
//! ```json
//! {"selector": "h1.title"}
//! {"selector": ["h1.title", "//h1", ".headline"]}
//! {"selector": [{"query": "a", "attribute": "href", "parent": ".byline"}, "a[rel=author]"]}
//! ```
//!
//! # Example
//!
//! ```rust
//! use excerpta_core::selector::{FieldSpec, QueryLanguage, QuerySpec};
//!
//! let spec: FieldSpec = serde_json::from_str(r#"{"selector": ["h1.title", "//h1"]}"#).unwrap();
//! assert_eq!(spec.selectors.len(), 2);
//! assert_eq!(spec.selectors[1].language(), QueryLanguage::XPath);
//!
//! let byline = QuerySpec::new("a").with_attribute("href").with_parent(".byline");
//! assert_eq!(byline.parent.as_deref(), Some(".byline"));
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Query language requested by a config entry.
///
/// `Auto` is never executed directly: [`detect`] resolves it to a
/// [`QueryLanguage`] before any query runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorType {
    Css,
    #[serde(rename = "xpath")]
    XPath,
    #[default]
    Auto,
}

/// Concrete query language a query is executed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryLanguage {
    Css,
    XPath,
}

impl fmt::Display for QueryLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryLanguage::Css => write!(f, "css"),
            QueryLanguage::XPath => write!(f, "xpath"),
        }
    }
}

/// Classify a query string.
///
/// An explicit type is returned unchanged. Under `Auto`, queries whose
/// trimmed form starts with `/` are XPath and everything else is CSS. Every
/// query the crate executes (field selectors, parents, cleanup lists) goes
/// through this function.
pub fn detect(query: &str, explicit: SelectorType) -> QueryLanguage {
    match explicit {
        SelectorType::Css => QueryLanguage::Css,
        SelectorType::XPath => QueryLanguage::XPath,
        SelectorType::Auto => {
            if query.trim_start().starts_with('/') {
                QueryLanguage::XPath
            } else {
                QueryLanguage::Css
            }
        }
    }
}

/// One selector attempt in a fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuerySpec {
    /// CSS selector or XPath expression.
    #[serde(alias = "selector")]
    pub query: String,

    #[serde(default)]
    pub selector_type: SelectorType,

    /// Attribute to pull instead of text or markup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,

    /// Query locating the element to search within. Its type is detected
    /// on its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl QuerySpec {
    /// A bare query: auto-detected type, no attribute, no parent.
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), selector_type: SelectorType::Auto, attribute: None, parent: None }
    }

    pub fn with_type(mut self, selector_type: SelectorType) -> Self {
        self.selector_type = selector_type;
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Effective language of the query itself.
    pub fn language(&self) -> QueryLanguage {
        detect(&self.query, self.selector_type)
    }

    /// Attribute this query extracts, falling back to the field default.
    pub fn effective_attribute<'a>(&'a self, field: &'a FieldSpec) -> Option<&'a str> {
        self.attribute
            .as_deref()
            .or(field.default_attribute.as_deref())
            .filter(|name| !name.trim().is_empty())
    }
}

impl From<&str> for QuerySpec {
    fn from(query: &str) -> Self {
        Self::new(query)
    }
}

impl From<String> for QuerySpec {
    fn from(query: String) -> Self {
        Self::new(query)
    }
}

/// What to pull out of each matched element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Visible text with collapsed whitespace.
    #[default]
    Text,
    /// Outer markup of the element.
    Html,
    /// Value of the resolved attribute.
    Attribute,
}

/// Whether a field keeps the first value or every value.
///
/// Serialized as the boolean `all` flag of the config format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "bool", into = "bool")]
pub enum Multiplicity {
    #[default]
    First,
    All,
}

impl From<bool> for Multiplicity {
    fn from(all: bool) -> Self {
        if all { Multiplicity::All } else { Multiplicity::First }
    }
}

impl From<Multiplicity> for bool {
    fn from(multiplicity: Multiplicity) -> Self {
        multiplicity == Multiplicity::All
    }
}

/// Extraction recipe for one document field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    /// Fallback chain, tried in order until one query matches.
    #[serde(
        rename = "selector",
        alias = "css_selector",
        alias = "selectors",
        deserialize_with = "deserialize_chain"
    )]
    pub selectors: Vec<QuerySpec>,

    #[serde(rename = "type", default)]
    pub extraction_mode: ExtractionMode,

    /// Attribute used by queries that don't name their own.
    #[serde(rename = "attribute", default, skip_serializing_if = "Option::is_none")]
    pub default_attribute: Option<String>,

    #[serde(rename = "all", default)]
    pub multiplicity: Multiplicity,

    /// Queries removed from a copy of each matched element before extraction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleanup: Vec<String>,
}

impl FieldSpec {
    /// Text-mode, first-match field over the given chain.
    pub fn new<I, Q>(selectors: I) -> Self
    where
        I: IntoIterator<Item = Q>,
        Q: Into<QuerySpec>,
    {
        Self {
            selectors: selectors.into_iter().map(Into::into).collect(),
            extraction_mode: ExtractionMode::Text,
            default_attribute: None,
            multiplicity: Multiplicity::First,
            cleanup: Vec::new(),
        }
    }

    pub fn html(mut self) -> Self {
        self.extraction_mode = ExtractionMode::Html;
        self
    }

    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.extraction_mode = ExtractionMode::Attribute;
        self.default_attribute = Some(name.into());
        self
    }

    pub fn all(mut self) -> Self {
        self.multiplicity = Multiplicity::All;
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

    /// Checks the invariants a field must hold before it can be executed.
    ///
    /// Returns a human-readable reason on failure.
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.selectors.is_empty() {
            return Err("selector chain is empty".to_string());
        }

        if let Some(spec) = self.selectors.iter().find(|spec| spec.query.trim().is_empty()) {
            return Err(format!("empty query in selector chain (parent: {:?})", spec.parent));
        }

        if self.extraction_mode == ExtractionMode::Attribute
            && let Some(spec) = self.selectors.iter().find(|spec| spec.effective_attribute(self).is_none())
        {
            return Err(format!("attribute extraction for '{}' has no attribute name", spec.query));
        }

        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChainEntry {
    Query(String),
    Spec(QuerySpec),
}

impl From<ChainEntry> for QuerySpec {
    fn from(entry: ChainEntry) -> Self {
        match entry {
            ChainEntry::Query(query) => QuerySpec::new(query),
            ChainEntry::Spec(spec) => spec,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChainInput {
    Many(Vec<ChainEntry>),
    One(ChainEntry),
}

fn deserialize_chain<'de, D>(deserializer: D) -> std::result::Result<Vec<QuerySpec>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ChainInput::deserialize(deserializer)? {
        ChainInput::Many(entries) => entries.into_iter().map(Into::into).collect(),
        ChainInput::One(entry) => vec![entry.into()],
    })
}
