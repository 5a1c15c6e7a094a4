//! HTML parsing and DOM access.
//!
//! This module provides the [`Document`] and [`Element`] types. A `Document`
//! owns the parsed html5ever tree; everything else in the crate borrows from
//! it. The only mutation a document ever sees is global cleanup
//! ([`Document::remove_matching`]), which runs before any field is read.
//!
//! # Example
//!
//! ```rust
//! use excerpta_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <body>
//!             <h1>Title</h1>
//!             <p class="content">Paragraph</p>
//!             <div class="ads">Buy now</div>
//!         </body>
//!     </html>
//! "#;
//!
//! let mut doc = Document::parse(html);
//! assert_eq!(doc.remove_matching(&[".ads".to_string()]), 1);
//! let paragraphs = doc.select("p.content").unwrap();
//! assert_eq!(paragraphs[0].text(), "Paragraph");
//! ```

use std::collections::HashSet;

use ego_tree::NodeId;
use ego_tree::iter::Edge;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::query::{self, Arena, Match, Queries, Scope};
use crate::selector::{Multiplicity, QueryLanguage, SelectorType, detect};
use crate::{ExcerptaError, Result};

/// Elements whose text payload is never visible.
pub(crate) const INVISIBLE_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// A parsed HTML document plus the base URL used to resolve links.
#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses a full HTML document.
    ///
    /// html5ever recovers from any malformed input, so parsing itself
    /// cannot fail.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html), base_url: None }
    }

    /// Parses an HTML fragment (no implied `<head>`/`<body>`).
    pub fn parse_fragment(html: &str) -> Self {
        Self { html: Html::parse_fragment(html), base_url: None }
    }

    /// Sets the base URL used to absolutize `href`/`src` values.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Parses and sets the base URL from a string.
    ///
    /// # Errors
    ///
    /// Returns [`ExcerptaError::InvalidUrl`] if `base_url` is not an absolute URL.
    pub fn with_base_url_str(self, base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url).map_err(|e| ExcerptaError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        Ok(self.with_base_url(url))
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Gets the underlying `scraper::Html` tree.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Serializes the whole document.
    pub fn as_string(&self) -> String {
        self.html.html()
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`ExcerptaError::InvalidSelector`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_css(selector)?;
        Ok(self.html.select(&sel).map(Element::from).collect())
    }

    /// Runs a CSS or XPath query over the whole document.
    pub fn query(&'_ self, language: QueryLanguage, query: &str, multiplicity: Multiplicity) -> Result<Vec<Match<'_>>> {
        query::execute(&self.html, Scope::Document, language, query, multiplicity)
    }

    /// Removes every element matched by any of `queries` from the document.
    ///
    /// Each query is type-detected on its own. Invalid queries are logged and
    /// skipped. Returns the number of detached elements.
    pub fn remove_matching(&mut self, queries: &[String]) -> usize {
        let ids: Vec<NodeId> = {
            let arena = Arena::default();
            let session = Queries::new(&self.html, &arena);
            let mut seen = HashSet::new();
            let ids: Vec<NodeId> = cleanup_matches(&session, Scope::Document, queries)
                .into_iter()
                .map(|el| el.id())
                .filter(|id| seen.insert(*id))
                .collect();
            ids
        };

        for id in &ids {
            if let Some(mut node) = self.html.tree.get_mut(*id) {
                node.detach();
            }
        }
        ids.len()
    }

    /// Gets the text of the `<title>` element.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .and_then(|el| crate::text::non_empty(&el.text().collect::<String>()))
    }

    /// Gets the visible text of the document with collapsed whitespace.
    pub fn text_content(&self) -> String {
        visible_text(self.html.root_element())
    }
}

/// A thin wrapper around scraper's `ElementRef`.
///
/// # Example
///
/// ```rust
/// use excerpta_core::parse::Document;
///
/// let doc = Document::parse(r#"<a href="https://example.com">Link  text</a>"#);
/// let link = doc.select("a").unwrap()[0];
///
/// assert_eq!(link.text(), "Link text");
/// assert_eq!(link.attr("href"), Some("https://example.com"));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> From<ElementRef<'a>> for Element<'a> {
    fn from(element: ElementRef<'a>) -> Self {
        Self { element }
    }
}

impl<'a> Element<'a> {
    /// Gets the HTML content inside this element.
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// Gets the HTML content including this element's own tags.
    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Visible text with whitespace runs collapsed to single spaces.
    ///
    /// Text inside `script`, `style`, `noscript` and `template` is skipped.
    pub fn text(&self) -> String {
        visible_text(self.element)
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`ExcerptaError::InvalidSelector`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = parse_css(selector)?;
        Ok(self.element.select(&sel).map(Element::from).collect())
    }

    /// The wrapped `ElementRef`.
    pub fn element_ref(&self) -> ElementRef<'a> {
        self.element
    }
}

pub(crate) fn parse_css(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ExcerptaError::InvalidSelector { query: selector.to_string(), reason: e.to_string() })
}

/// Elements matched by any of `queries` within `scope`, query by query.
///
/// Each query is type-detected on its own; invalid queries are logged and
/// skipped.
pub(crate) fn cleanup_matches<'a>(session: &Queries<'_, 'a>, scope: Scope<'a>, queries: &[String]) -> Vec<ElementRef<'a>> {
    let mut found = Vec::new();
    for raw in queries {
        let language = detect(raw, SelectorType::Auto);
        match session.execute(scope, language, raw, Multiplicity::All) {
            Ok(matches) => found.extend(matches.iter().filter_map(Match::element)),
            Err(e) => tracing::warn!(query = %raw, %language, error = %e, "skipping cleanup query"),
        }
    }
    found
}

/// Collapsed visible text of an element subtree.
pub(crate) fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_visible_text(element, &mut raw);
    crate::text::collapse_whitespace(&raw)
}

/// Appends the raw text of a subtree, skipping invisible elements below
/// `element`. Iterative, so nesting depth is unbounded.
pub(crate) fn push_visible_text(element: ElementRef<'_>, out: &mut String) {
    let mut hidden = 0usize;
    for edge in element.traverse() {
        match edge {
            Edge::Open(node) => match node.value().as_element() {
                Some(el) => {
                    if hidden > 0 || (node.id() != element.id() && INVISIBLE_ELEMENTS.contains(&el.name())) {
                        hidden += 1;
                    }
                }
                None => {
                    if hidden == 0
                        && let Some(text) = node.value().as_text()
                    {
                        out.push_str(text);
                    }
                }
            },
            Edge::Close(node) => {
                if hidden > 0 && node.value().is_element() {
                    hidden -= 1;
                }
            }
        }
    }
}
