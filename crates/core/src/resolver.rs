//! Element resolver: turns one [`FieldSpec`] into a value.
//!
//! Resolution walks the fallback chain in order. The first query that
//! produces at least one match wins, whatever the field's multiplicity, and
//! later queries are never executed. Per-field cleanup runs on a clone of
//! the document so the shared tree is never modified; one clone serves every
//! match of the field.

use std::collections::HashSet;

use ego_tree::NodeId;
use scraper::{ElementRef, Html};
use serde::Serialize;

use crate::parse::{Document, cleanup_matches, visible_text};
use crate::query::{Arena, Match, Queries, Scope};
use crate::selector::{ExtractionMode, FieldSpec, Multiplicity, QuerySpec, SelectorType, detect};

/// Value of one extracted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExtractedValue {
    /// Result of a `first` field.
    Single(String),
    /// Result of an `all` field, in document order.
    Many(Vec<String>),
}

impl ExtractedValue {
    /// The scalar value, or the first entry of a list.
    pub fn first(&self) -> Option<&str> {
        match self {
            ExtractedValue::Single(value) => Some(value),
            ExtractedValue::Many(values) => values.first().map(String::as_str),
        }
    }

    /// All values as a list.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            ExtractedValue::Single(value) => vec![value.clone()],
            ExtractedValue::Many(values) => values.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ExtractedValue::Single(_) => 1,
            ExtractedValue::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves field specs against one document.
pub struct ElementResolver<'d> {
    document: &'d Document,
}

impl<'d> ElementResolver<'d> {
    pub fn new(document: &'d Document) -> Self {
        Self { document }
    }

    /// Resolves a field, returning `None` when nothing in the chain produced
    /// a non-empty value.
    pub fn resolve(&self, spec: &FieldSpec) -> Option<ExtractedValue> {
        let arena = Arena::default();
        let session = Queries::new(self.document.html(), &arena);
        self.resolve_in(&session, spec)
    }

    /// Like [`ElementResolver::resolve`], reusing an open session over this
    /// resolver's document.
    pub fn resolve_in(&self, session: &Queries<'_, 'd>, spec: &FieldSpec) -> Option<ExtractedValue> {
        let (query, matches) = self.first_matching(session, spec)?;
        let attribute = query.effective_attribute(spec);

        let mut values: Vec<String> = if spec.cleanup.is_empty() {
            matches.iter().filter_map(|found| self.extract_match(spec.extraction_mode, attribute, found)).collect()
        } else {
            self.extract_cleaned(spec, attribute, &matches)
        };

        if values.is_empty() {
            tracing::debug!(query = %query.query, "matched elements yielded no value");
            return None;
        }

        match spec.multiplicity {
            Multiplicity::First => Some(ExtractedValue::Single(values.swap_remove(0))),
            Multiplicity::All => Some(ExtractedValue::Many(values)),
        }
    }

    /// Walks the fallback chain and returns the first query with matches.
    fn first_matching<'s>(
        &self, session: &Queries<'_, 'd>, spec: &'s FieldSpec,
    ) -> Option<(&'s QuerySpec, Vec<Match<'d>>)> {
        for query in &spec.selectors {
            let Some(scope) = self.scope_for(session, query) else {
                continue;
            };

            let language = query.language();
            match session.execute(scope, language, &query.query, spec.multiplicity) {
                Ok(matches) if !matches.is_empty() => return Some((query, matches)),
                Ok(_) => tracing::trace!(query = %query.query, %language, "no match, trying next selector"),
                Err(e) => tracing::warn!(query = %query.query, %language, error = %e, "selector failed"),
            }
        }
        None
    }

    /// Search scope for a query: its parent element, or the whole document.
    ///
    /// `None` means the parent did not resolve and the query must be skipped.
    fn scope_for(&self, session: &Queries<'_, 'd>, query: &QuerySpec) -> Option<Scope<'d>> {
        let Some(parent) = query.parent.as_deref() else {
            return Some(Scope::Document);
        };

        let language = detect(parent, SelectorType::Auto);
        match session.execute(Scope::Document, language, parent, Multiplicity::First) {
            Ok(found) => match found.iter().find_map(Match::element) {
                Some(element) => Some(Scope::Element(element)),
                None => {
                    tracing::debug!(query = %query.query, %parent, "parent not found, skipping selector");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(query = %query.query, %parent, %language, error = %e, "parent selector failed");
                None
            }
        }
    }

    fn extract_match(&self, mode: ExtractionMode, attribute: Option<&str>, found: &Match<'_>) -> Option<String> {
        match found {
            Match::Element(element) => self.extract_value(mode, attribute, *element),
            Match::Value(value) => crate::text::non_empty(value),
        }
    }

    /// Extracts every match from a single cleaned copy of the document.
    fn extract_cleaned(&self, spec: &FieldSpec, attribute: Option<&str>, matches: &[Match<'_>]) -> Vec<String> {
        let roots: Vec<NodeId> = matches.iter().filter_map(Match::element).map(|el| el.id()).collect();
        let copy = cleaned_copy(self.document.html(), &roots, &spec.cleanup);

        matches
            .iter()
            .filter_map(|found| match found {
                Match::Element(element) => copy
                    .tree
                    .get(element.id())
                    .and_then(ElementRef::wrap)
                    .and_then(|cleaned| self.extract_value(spec.extraction_mode, attribute, cleaned)),
                Match::Value(value) => crate::text::non_empty(value),
            })
            .collect()
    }

    fn extract_value(&self, mode: ExtractionMode, attribute: Option<&str>, element: ElementRef<'_>) -> Option<String> {
        match mode {
            ExtractionMode::Html => {
                let html = element.html();
                if html.trim().is_empty() { None } else { Some(html) }
            }
            ExtractionMode::Attribute => {
                let name = attribute?;
                let value = element.value().attr(name)?;
                self.attribute_value(name, value)
            }
            ExtractionMode::Text => {
                if let Some(name) = attribute
                    && let Some(value) = element.value().attr(name)
                {
                    return self.attribute_value(name, value);
                }
                crate::text::non_empty(&visible_text(element))
            }
        }
    }

    /// Trims a raw attribute value and absolutizes link attributes against
    /// the document base URL.
    fn attribute_value(&self, name: &str, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        let is_link = name.eq_ignore_ascii_case("href") || name.eq_ignore_ascii_case("src");
        if is_link
            && let Some(base) = self.document.base_url()
            && let Ok(absolute) = base.join(value)
        {
            return Some(absolute.to_string());
        }

        Some(value.to_string())
    }
}

/// Resolves one field against a document.
pub fn resolve(document: &Document, spec: &FieldSpec) -> Option<ExtractedValue> {
    ElementResolver::new(document).resolve(spec)
}

/// Clones the tree once and removes, beneath each of `roots`, every element
/// a cleanup query matches there.
///
/// Node ids are stable across `Html::clone`, so the root ids address the
/// same elements in the copy. Matches outside their root (XPath axes such as
/// `ancestor::`) are ignored.
fn cleaned_copy(html: &Html, roots: &[NodeId], cleanup: &[String]) -> Html {
    let mut copy = html.clone();

    let doomed: Vec<NodeId> = {
        let arena = Arena::default();
        let session = Queries::new(&copy, &arena);
        let mut seen = HashSet::new();
        let mut doomed = Vec::new();

        for &root_id in roots {
            let Some(root) = copy.tree.get(root_id).and_then(ElementRef::wrap) else {
                continue;
            };
            for found in cleanup_matches(&session, Scope::Element(root), cleanup) {
                let inside = found.ancestors().any(|ancestor| ancestor.id() == root_id);
                if inside && seen.insert(found.id()) {
                    doomed.push(found.id());
                }
            }
        }
        doomed
    };

    for id in doomed {
        if let Some(mut node) = copy.tree.get_mut(id) {
            node.detach();
        }
    }
    copy
}
