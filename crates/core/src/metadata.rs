//! Page metadata from `<meta>` tags and schema.org JSON-LD.
//!
//! Meta tags are read first. JSON-LD only fills fields that are still empty
//! afterwards, and selector-based extraction (see [`crate::article`]) takes
//! priority over both.

use serde::Serialize;
use serde_json::Value;

use crate::parse::Document;
use crate::text::{non_empty, split_list};

/// Maximum number of tags kept.
pub const MAX_TAGS: usize = 10;
/// Maximum number of topics kept.
pub const MAX_TOPICS: usize = 5;
/// Section names that never count as topics.
pub const REJECTED_TOPICS: [&str; 3] = ["home", "homepage", "trang"];

const ARTICLE_TYPES: [&str; 4] = ["Article", "NewsArticle", "BlogPosting", "WebPage"];

/// Metadata extracted from a page head.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_published: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_card: Option<String>,
}

/// Parses `html` and extracts its metadata.
pub fn extract_meta(html: &str) -> ResponseMeta {
    extract_meta_from(&Document::parse(html))
}

/// Extracts metadata from an already parsed document.
pub fn extract_meta_from(document: &Document) -> ResponseMeta {
    let tags = MetaTags::collect(document);
    let mut meta = ResponseMeta::from_meta_tags(&tags, document);

    let nodes = json_ld_nodes(document);
    if let Some(article) = nodes.iter().find(|node| has_type(node, &ARTICLE_TYPES)) {
        meta.fill_from_json_ld(article);
    }
    if meta.topics.is_empty()
        && let Some(breadcrumbs) = nodes.iter().find(|node| has_type(node, &["BreadcrumbList"]))
    {
        meta.topics = breadcrumb_topics(breadcrumbs);
    }

    meta
}

impl ResponseMeta {
    /// Builds metadata from meta tags with priority fallback per field.
    fn from_meta_tags(tags: &MetaTags, document: &Document) -> Self {
        let title = tags.first(&["og:title", "twitter:title"]).or_else(|| document.title());
        let description = tags.first(&["description", "og:description", "twitter:description"]);
        let authors = tags
            .first(&["author", "article:author"])
            .map(|value| split_list(&value, &[]))
            .unwrap_or_default();
        let canonical = canonical_link(document).or_else(|| tags.first(&["og:url"]));
        let image = tags.first(&["og:image", "og:image:secure_url", "twitter:image"]);
        let locale = tags.first(&["og:locale"]);
        let language = html_lang(document).or_else(|| tags.first(&["content-language", "og:locale"]));

        let mut keywords: Vec<String> = Vec::new();
        for tag in tags.all("article:tag") {
            for item in split_list(tag, &[]) {
                if !keywords.contains(&item) {
                    keywords.push(item);
                }
            }
        }
        if keywords.is_empty() {
            keywords = tags
                .first(&["keywords", "news_keywords"])
                .map(|value| split_list(&value, &[]))
                .unwrap_or_default();
        }
        keywords.truncate(MAX_TAGS);

        let mut topics = tags
            .first(&["article:section"])
            .map(|value| split_list(&value, &REJECTED_TOPICS))
            .unwrap_or_default();
        topics.truncate(MAX_TOPICS);

        Self {
            title,
            description,
            authors,
            canonical,
            image,
            locale,
            language,
            site_name: tags.first(&["og:site_name"]),
            date_published: tags.first(&["article:published_time", "date"]),
            date_modified: tags.first(&["article:modified_time", "og:updated_time"]),
            tags: keywords,
            topics,
            twitter_card: tags.first(&["twitter:card"]),
        }
    }

    /// Fills empty fields from a schema.org article node.
    fn fill_from_json_ld(&mut self, node: &Value) {
        fill(&mut self.title, || string_field(node, "headline").or_else(|| string_field(node, "name")));
        fill(&mut self.description, || string_field(node, "description"));
        fill(&mut self.date_published, || string_field(node, "datePublished"));
        fill(&mut self.date_modified, || string_field(node, "dateModified"));
        fill(&mut self.language, || string_field(node, "inLanguage"));
        fill(&mut self.image, || node.get("image").and_then(json_ld_url));
        fill(&mut self.site_name, || node.get("publisher").and_then(|publisher| string_field(publisher, "name")));

        if self.authors.is_empty()
            && let Some(author) = node.get("author")
        {
            let mut names = Vec::new();
            json_ld_names(author, &mut names);
            self.authors = names;
        }

        if self.tags.is_empty()
            && let Some(keywords) = node.get("keywords")
        {
            let mut tags = string_list(keywords, &[]);
            tags.truncate(MAX_TAGS);
            self.tags = tags;
        }

        if self.topics.is_empty()
            && let Some(section) = node.get("articleSection")
        {
            let mut topics = string_list(section, &REJECTED_TOPICS);
            topics.truncate(MAX_TOPICS);
            self.topics = topics;
        }
    }
}

/// Meta tag `(key, content)` pairs in document order.
struct MetaTags {
    entries: Vec<(String, String)>,
}

impl MetaTags {
    fn collect(document: &Document) -> Self {
        let mut entries = Vec::new();
        if let Ok(elements) = document.select("meta") {
            for el in elements {
                let key = el.attr("property").or_else(|| el.attr("name")).or_else(|| el.attr("http-equiv"));
                if let Some(key) = key
                    && let Some(content) = el.attr("content").and_then(non_empty)
                {
                    entries.push((key.trim().to_lowercase(), content));
                }
            }
        }
        Self { entries }
    }

    /// First value of the first key that has one.
    fn first(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| {
            self.entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, content)| content.clone())
        })
    }

    fn all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries
            .iter()
            .filter(move |(name, _)| name == key)
            .map(|(_, content)| content.as_str())
    }
}

fn canonical_link(document: &Document) -> Option<String> {
    let links = document.select("link[rel=canonical]").ok()?;
    links.iter().find_map(|link| link.attr("href").and_then(non_empty))
}

fn html_lang(document: &Document) -> Option<String> {
    let html = document.select("html").ok()?;
    html.first().and_then(|el| el.attr("lang")).and_then(non_empty)
}

/// Every object node of every JSON-LD block, with arrays and `@graph`
/// containers flattened.
fn json_ld_nodes(document: &Document) -> Vec<Value> {
    let mut nodes = Vec::new();
    let Ok(scripts) = document.select(r#"script[type="application/ld+json"]"#) else {
        return nodes;
    };

    for script in scripts {
        let raw = script.element_ref().text().collect::<String>();
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value) => flatten_json_ld(value, &mut nodes),
            Err(e) => tracing::debug!(error = %e, "skipping malformed JSON-LD block"),
        }
    }
    nodes
}

fn flatten_json_ld(value: Value, nodes: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|item| flatten_json_ld(item, nodes)),
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten_json_ld(graph, nodes);
            }
            if map.contains_key("@type") {
                nodes.push(Value::Object(map));
            }
        }
        _ => {}
    }
}

fn has_type(node: &Value, types: &[&str]) -> bool {
    match node.get("@type") {
        Some(Value::String(name)) => types.contains(&name.as_str()),
        Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).any(|name| types.contains(&name)),
        _ => false,
    }
}

fn breadcrumb_topics(node: &Value) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    let Some(items) = node.get("itemListElement").and_then(Value::as_array) else {
        return topics;
    };

    for item in items {
        let name = string_field(item, "name").or_else(|| item.get("item").and_then(|inner| string_field(inner, "name")));
        if let Some(name) = name
            && !REJECTED_TOPICS.contains(&name.to_lowercase().as_str())
            && !topics.contains(&name)
        {
            topics.push(name);
        }
    }
    topics.truncate(MAX_TOPICS);
    topics
}

fn string_field(node: &Value, key: &str) -> Option<String> {
    node.get(key).and_then(Value::as_str).and_then(non_empty)
}

/// Strings of a value that is either a delimited string or a list.
fn string_list(value: &Value, rejected: &[&str]) -> Vec<String> {
    match value {
        Value::String(s) => split_list(s, rejected),
        Value::Array(items) => {
            let joined = items.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(",");
            split_list(&joined, rejected)
        }
        _ => Vec::new(),
    }
}

/// Person/organization names from a JSON-LD `author`: a string, an object
/// with `name`, or a list of either.
fn json_ld_names(value: &Value, names: &mut Vec<String>) {
    match value {
        Value::String(name) => {
            if let Some(name) = non_empty(name)
                && !names.contains(&name)
            {
                names.push(name);
            }
        }
        Value::Object(_) => {
            if let Some(name) = value.get("name") {
                json_ld_names(name, names);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| json_ld_names(item, names)),
        _ => {}
    }
}

/// URL of a JSON-LD image: a string, an `ImageObject`, or a list of either.
fn json_ld_url(value: &Value) -> Option<String> {
    match value {
        Value::String(url) => non_empty(url),
        Value::Object(_) => string_field(value, "url"),
        Value::Array(items) => items.iter().find_map(json_ld_url),
        _ => None,
    }
}

fn fill(slot: &mut Option<String>, value: impl FnOnce() -> Option<String>) {
    if slot.is_none() {
        *slot = value();
    }
}
