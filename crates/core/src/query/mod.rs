//! Query backends behind a single `execute(scope, type, query)` interface.
//!
//! The resolver never talks to scraper selectors or the XPath evaluator
//! directly: it calls [`execute`] with a concrete [`QueryLanguage`] and gets
//! back [`Match`]es in document order.
//!
//! Code that runs several queries against one tree opens a [`Queries`]
//! session instead, so the XPath view of the tree is built at most once.

use scraper::{ElementRef, Html};

use crate::parse::parse_css;
use crate::selector::{Multiplicity, QueryLanguage};
use crate::Result;

#[cfg(feature = "xpath")]
pub mod xpath;

#[cfg(feature = "xpath")]
pub use xpath::{MAX_MIRROR_DEPTH, XPathEngine, XPathIndex, scope_relative};

#[cfg(feature = "xpath")]
use std::cell::OnceCell;

/// Where a query searches.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    /// The whole document.
    Document,
    /// Descendants of one element.
    Element(ElementRef<'a>),
}

/// One query result.
#[derive(Debug, Clone)]
pub enum Match<'a> {
    /// An element of the queried tree.
    Element(ElementRef<'a>),
    /// A literal value produced by XPath (attribute node, text node, or a
    /// string-valued expression).
    Value(String),
}

impl<'a> Match<'a> {
    pub fn element(&self) -> Option<ElementRef<'a>> {
        match self {
            Match::Element(element) => Some(*element),
            Match::Value(_) => None,
        }
    }
}

/// A query language backend.
pub trait QueryEngine {
    /// Runs `query` within `scope`, returning the first match or all matches
    /// in document order.
    fn execute<'a>(
        &self, html: &'a Html, scope: Scope<'a>, query: &str, multiplicity: Multiplicity,
    ) -> Result<Vec<Match<'a>>>;
}

/// CSS backend over scraper selectors.
#[derive(Debug, Default, Clone, Copy)]
pub struct CssEngine;

impl QueryEngine for CssEngine {
    fn execute<'a>(
        &self, html: &'a Html, scope: Scope<'a>, query: &str, multiplicity: Multiplicity,
    ) -> Result<Vec<Match<'a>>> {
        let selector = parse_css(query)?;
        let limit = match multiplicity {
            Multiplicity::First => 1,
            Multiplicity::All => usize::MAX,
        };

        let matches = match scope {
            Scope::Document => html.select(&selector).take(limit).map(Match::Element).collect(),
            Scope::Element(parent) => parent.select(&selector).take(limit).map(Match::Element).collect(),
        };
        Ok(matches)
    }
}

/// Storage backing the XPath view of a tree. Must outlive the [`Queries`]
/// session borrowing it.
pub struct Arena {
    #[cfg(feature = "xpath")]
    package: sxd_document::Package,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            #[cfg(feature = "xpath")]
            package: sxd_document::Package::new(),
        }
    }
}

/// A query session over one tree.
///
/// # Example
///
/// ```rust
/// use excerpta_core::query::{Arena, Queries, Scope};
/// use excerpta_core::{Multiplicity, QueryLanguage};
/// use scraper::Html;
///
/// let html = Html::parse_document("<p>One</p><p>Two</p>");
/// let arena = Arena::default();
/// let queries = Queries::new(&html, &arena);
///
/// let css = queries.execute(Scope::Document, QueryLanguage::Css, "p", Multiplicity::All).unwrap();
/// let xpath = queries.execute(Scope::Document, QueryLanguage::XPath, "//p", Multiplicity::All).unwrap();
/// assert_eq!(css.len(), xpath.len());
/// ```
pub struct Queries<'p, 'a> {
    html: &'a Html,
    #[cfg_attr(not(feature = "xpath"), allow(dead_code))]
    arena: &'p Arena,
    #[cfg(feature = "xpath")]
    index: OnceCell<XPathIndex<'p, 'a>>,
}

impl<'p, 'a> Queries<'p, 'a> {
    pub fn new(html: &'a Html, arena: &'p Arena) -> Self {
        Self {
            html,
            arena,
            #[cfg(feature = "xpath")]
            index: OnceCell::new(),
        }
    }

    pub fn html(&self) -> &'a Html {
        self.html
    }

    /// Runs one query; see [`execute`].
    pub fn execute(
        &self, scope: Scope<'a>, language: QueryLanguage, query: &str, multiplicity: Multiplicity,
    ) -> Result<Vec<Match<'a>>> {
        match language {
            QueryLanguage::Css => CssEngine.execute(self.html, scope, query, multiplicity),
            #[cfg(feature = "xpath")]
            QueryLanguage::XPath => {
                let index = self.index.get_or_init(|| XPathIndex::build(&self.arena.package, self.html));
                XPathEngine::new().evaluate(index, scope, query, multiplicity)
            }
            #[cfg(not(feature = "xpath"))]
            QueryLanguage::XPath => Err(crate::ExcerptaError::InvalidSelector {
                query: query.to_string(),
                reason: "XPath support is disabled (enable the `xpath` feature)".to_string(),
            }),
        }
    }
}

/// Dispatches a single query to the backend for `language`.
///
/// # Errors
///
/// Returns [`crate::ExcerptaError::InvalidSelector`] for queries that don't
/// compile and [`crate::ExcerptaError::XPathError`] for XPath evaluation
/// failures.
pub fn execute<'a>(
    html: &'a Html, scope: Scope<'a>, language: QueryLanguage, query: &str, multiplicity: Multiplicity,
) -> Result<Vec<Match<'a>>> {
    let arena = Arena::default();
    let queries = Queries::new(html, &arena);
    queries.execute(scope, language, query, multiplicity)
}
