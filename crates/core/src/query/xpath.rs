//! XPath backend.
//!
//! sxd-xpath evaluates over its own DOM, so the html5ever tree is mirrored
//! into an `sxd_document::Package` once per [`XPathIndex`] and every query of
//! a session reuses that mirror. Running on the html5ever tree (rather than
//! re-parsing the source as XML) means XPath sees exactly the same document
//! CSS queries see, including after global cleanup.
//!
//! Mirroring stops at [`MAX_MIRROR_DEPTH`]; the text of anything deeper is
//! folded into its deepest mirrored ancestor, so string values stay intact
//! while the evaluator never walks an unbounded tree.

use std::borrow::Cow;
use std::collections::HashMap;

use ego_tree::NodeId;
use scraper::{ElementRef, Html};
use sxd_document::{Package, dom};
use sxd_xpath::nodeset::Node;
use sxd_xpath::{Context, Factory, Value, XPath};

use crate::query::{Match, QueryEngine, Scope};
use crate::selector::Multiplicity;
use crate::{ExcerptaError, Result};

/// Deepest element level copied into the XPath view.
pub const MAX_MIRROR_DEPTH: usize = 256;

/// XPath evaluator over html5ever trees.
pub struct XPathEngine {
    factory: Factory,
}

impl XPathEngine {
    pub fn new() -> Self {
        Self { factory: Factory::new() }
    }

    /// Compiles an expression, mapping syntax errors to
    /// [`ExcerptaError::InvalidSelector`].
    pub fn compile(&self, query: &str) -> Result<XPath> {
        self.factory
            .build(query)
            .map_err(|e| ExcerptaError::InvalidSelector { query: query.to_string(), reason: e.to_string() })?
            .ok_or_else(|| ExcerptaError::InvalidSelector {
                query: query.to_string(),
                reason: "empty expression".to_string(),
            })
    }

    /// Runs `query` against a prebuilt index.
    pub fn evaluate<'a>(
        &self, index: &XPathIndex<'_, 'a>, scope: Scope<'a>, query: &str, multiplicity: Multiplicity,
    ) -> Result<Vec<Match<'a>>> {
        let expression = match scope {
            Scope::Document => Cow::Borrowed(query),
            Scope::Element(_) => scope_relative(query),
        };
        let xpath = self.compile(&expression)?;
        let context = Context::new();

        let value = match scope {
            Scope::Document => xpath.evaluate(&context, index.document.root())?,
            Scope::Element(element) => {
                let node = index.mirrored(element).ok_or_else(|| {
                    ExcerptaError::XPathError("scope element is outside the XPath view of the document".to_string())
                })?;
                xpath.evaluate(&context, node)?
            }
        };

        Ok(index.collect(value, multiplicity))
    }
}

impl Default for XPathEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryEngine for XPathEngine {
    /// One-shot evaluation; builds a throwaway index.
    fn execute<'a>(
        &self, html: &'a Html, scope: Scope<'a>, query: &str, multiplicity: Multiplicity,
    ) -> Result<Vec<Match<'a>>> {
        let package = Package::new();
        let index = XPathIndex::build(&package, html);
        self.evaluate(&index, scope, query, multiplicity)
    }
}

/// Rewrites an absolute expression so it runs relative to the context node.
///
/// `//a` becomes `.//a` and `/div` becomes `./div`. Expressions that do not
/// start with `/` (already relative, parenthesized, function calls, other
/// axes) are left untouched.
pub fn scope_relative(query: &str) -> Cow<'_, str> {
    let trimmed = query.trim_start();
    if trimmed.starts_with('/') { Cow::Owned(format!(".{}", trimmed)) } else { Cow::Borrowed(query) }
}

/// sxd mirror of an html5ever tree, with lookups in both directions.
pub struct XPathIndex<'d, 'a> {
    document: dom::Document<'d>,
    root: ElementRef<'a>,
    mirrored: HashMap<NodeId, dom::Element<'d>>,
    originals: HashMap<dom::Element<'d>, ElementRef<'a>>,
}

impl<'d, 'a> XPathIndex<'d, 'a> {
    /// Copies `html` into `package`.
    pub fn build(package: &'d Package, html: &'a Html) -> Self {
        let root = html.root_element();
        let mut index =
            Self { document: package.as_document(), root, mirrored: HashMap::new(), originals: HashMap::new() };

        let root_copy = index.copy_element(root);
        index.document.root().append_child(root_copy);

        let mut pending = vec![(root, root_copy, 1)];
        while let Some((source, parent, depth)) = pending.pop() {
            for child in source.children() {
                if let Some(child_element) = ElementRef::wrap(child) {
                    if depth < MAX_MIRROR_DEPTH {
                        let copy = index.copy_element(child_element);
                        parent.append_child(copy);
                        pending.push((child_element, copy, depth + 1));
                    } else {
                        let text: String = child_element.text().collect();
                        if !text.is_empty() {
                            parent.append_child(index.document.create_text(&text));
                        }
                    }
                } else if let Some(text) = child.value().as_text() {
                    parent.append_child(index.document.create_text(text));
                }
            }
        }

        index
    }

    /// Number of mirrored elements.
    pub fn len(&self) -> usize {
        self.mirrored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirrored.is_empty()
    }

    fn copy_element(&mut self, source: ElementRef<'a>) -> dom::Element<'d> {
        let element = self.document.create_element(source.value().name());
        for (name, value) in source.value().attrs() {
            element.set_attribute_value(name, value);
        }
        self.mirrored.insert(source.id(), element);
        self.originals.insert(element, source);
        element
    }

    fn mirrored(&self, source: ElementRef<'_>) -> Option<dom::Element<'d>> {
        self.mirrored.get(&source.id()).copied()
    }

    fn collect(&self, value: Value<'d>, multiplicity: Multiplicity) -> Vec<Match<'a>> {
        match value {
            Value::Nodeset(nodeset) => {
                let mut matches = Vec::new();
                for node in nodeset.document_order() {
                    let found = match node {
                        Node::Element(element) => self.originals.get(&element).copied().map(Match::Element),
                        Node::Root(_) => Some(Match::Element(self.root)),
                        Node::Attribute(attribute) => Some(Match::Value(attribute.value().to_string())),
                        Node::Text(text) => Some(Match::Value(text.text().to_string())),
                        other => Some(Match::Value(other.string_value())),
                    };

                    if let Some(found) = found {
                        matches.push(found);
                        if multiplicity == Multiplicity::First {
                            break;
                        }
                    }
                }
                matches
            }
            Value::String(s) if !s.trim().is_empty() => vec![Match::Value(s)],
            Value::String(_) => Vec::new(),
            Value::Number(_) | Value::Boolean(_) => {
                tracing::trace!("xpath expression produced a scalar, ignoring");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"
        <html>
            <head><meta property="og:title" content="Meta Title"></head>
            <body>
                <nav><a href="/about">About</a></nav>
                <div class="post-meta">
                    <time datetime="2024-01-15T10:00:00Z">January 15</time>
                    <div class="byline"><a class="author" href="/author/john">John</a><a class="author" href="/author/jane">Jane</a></div>
                </div>
                <p>First</p><p>Second</p>
            </body>
        </html>
    "#;

    fn texts(matches: &[Match<'_>]) -> Vec<String> {
        matches
            .iter()
            .map(|m| match m {
                Match::Element(el) => el.text().collect::<String>(),
                Match::Value(v) => v.clone(),
            })
            .collect()
    }

    #[test]
    fn test_scope_relative() {
        assert_eq!(scope_relative("//a"), ".//a");
        assert_eq!(scope_relative("/div/a"), "./div/a");
        assert_eq!(scope_relative(".//a"), ".//a");
        assert_eq!(scope_relative("(//a)[1]"), "(//a)[1]");
    }

    #[test]
    fn test_element_matches_in_document_order() {
        let html = Html::parse_document(HTML);
        let engine = XPathEngine::new();

        let all = engine.execute(&html, Scope::Document, "//p", Multiplicity::All).unwrap();
        assert_eq!(texts(&all), vec!["First", "Second"]);

        let first = engine.execute(&html, Scope::Document, "//p", Multiplicity::First).unwrap();
        assert_eq!(texts(&first), vec!["First"]);
    }

    #[test]
    fn test_attribute_and_text_nodes() {
        let html = Html::parse_document(HTML);
        let engine = XPathEngine::new();

        let content = engine
            .execute(&html, Scope::Document, "//meta[@property='og:title']/@content", Multiplicity::First)
            .unwrap();
        assert_eq!(texts(&content), vec!["Meta Title"]);

        let text = engine.execute(&html, Scope::Document, "//time/text()", Multiplicity::First).unwrap();
        assert_eq!(texts(&text), vec!["January 15"]);
    }

    #[test]
    fn test_string_expression() {
        let html = Html::parse_document(HTML);
        let engine = XPathEngine::new();

        let value = engine.execute(&html, Scope::Document, "string(//time/@datetime)", Multiplicity::First).unwrap();
        assert_eq!(texts(&value), vec!["2024-01-15T10:00:00Z"]);
    }

    #[test]
    fn test_absolute_query_is_scoped_under_parent() {
        let html = Html::parse_document(HTML);
        let engine = XPathEngine::new();

        let parent = engine
            .execute(&html, Scope::Document, "//div[@class='byline']", Multiplicity::First)
            .unwrap();
        let parent = parent[0].element().unwrap();

        let links = engine.execute(&html, Scope::Element(parent), "//a", Multiplicity::All).unwrap();
        let hrefs: Vec<_> = links
            .iter()
            .filter_map(Match::element)
            .filter_map(|el| el.value().attr("href"))
            .collect();
        assert_eq!(hrefs, vec!["/author/john", "/author/jane"]);
    }

    #[test]
    fn test_contains_predicate() {
        let html = Html::parse_document(HTML);
        let engine = XPathEngine::new();

        let authors = engine
            .execute(&html, Scope::Document, "//a[contains(@class, 'author')]", Multiplicity::All)
            .unwrap();
        assert_eq!(texts(&authors), vec!["John", "Jane"]);
    }

    #[test]
    fn test_invalid_expression() {
        let html = Html::parse_document(HTML);
        let engine = XPathEngine::new();

        let result = engine.execute(&html, Scope::Document, "//div[@class='x'", Multiplicity::First);
        assert!(matches!(result, Err(ExcerptaError::InvalidSelector { .. })));
    }

    #[test]
    fn test_axis_leaves_parent_scope() {
        let html = Html::parse_document(HTML);
        let engine = XPathEngine::new();

        let parent = engine
            .execute(&html, Scope::Document, "//div[@class='byline']", Multiplicity::First)
            .unwrap();
        let parent = parent[0].element().unwrap();

        let time = engine
            .execute(&html, Scope::Element(parent), "ancestor::div[@class='post-meta']/time", Multiplicity::First)
            .unwrap();
        assert_eq!(texts(&time), vec!["January 15"]);
    }

    #[test]
    fn test_index_serves_many_queries() {
        let html = Html::parse_document(HTML);
        let package = Package::new();
        let index = XPathIndex::build(&package, &html);
        let engine = XPathEngine::new();

        let paragraphs = engine.evaluate(&index, Scope::Document, "//p", Multiplicity::All).unwrap();
        let authors = engine.evaluate(&index, Scope::Document, "//a[@class='author']", Multiplicity::All).unwrap();
        assert_eq!(texts(&paragraphs), vec!["First", "Second"]);
        assert_eq!(texts(&authors), vec!["John", "Jane"]);
    }

    #[test]
    fn test_deep_nesting_is_folded() {
        let depth = 10_000;
        let source = format!(
            r#"<div class="outer">{}deep{}</div>"#,
            "<div>".repeat(depth),
            "</div>".repeat(depth)
        );
        let html = Html::parse_document(&source);
        let package = Package::new();
        let index = XPathIndex::build(&package, &html);
        assert!(index.len() <= MAX_MIRROR_DEPTH + 1);

        let engine = XPathEngine::new();
        let outer = engine
            .evaluate(&index, Scope::Document, "//div[@class='outer']", Multiplicity::First)
            .unwrap();
        assert_eq!(outer[0].element().and_then(|el| el.value().attr("class")), Some("outer"));

        let text = engine
            .evaluate(&index, Scope::Document, "string(//div[@class='outer'])", Multiplicity::First)
            .unwrap();
        assert_eq!(texts(&text), vec!["deep"]);
    }

    #[test]
    fn test_no_match_is_empty() {
        let html = Html::parse_document(HTML);
        let engine = XPathEngine::new();

        let result = engine.execute(&html, Scope::Document, "//article", Multiplicity::All).unwrap();
        assert!(result.is_empty());
    }
}
