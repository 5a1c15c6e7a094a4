use serde::Serialize;

use crate::Result;
use crate::article::Article;
use crate::formatters::markdown::{LinkReference, extract_links};
use crate::formatters::text::{TextConfig, convert_to_text};
use crate::metadata::ResponseMeta;
use crate::parser::ExtractedDocument;

/// Article JSON with optional extra renderings.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    #[serde(flatten)]
    pub article: &'a Article,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<JsonReference>>,
}

/// A reference link for JSON output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonReference {
    /// 1-based position in document order
    pub index: usize,
    pub text: String,
    pub url: String,
}

/// Configuration for JSON output
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    /// Keep `content_html` in the output
    pub include_html: bool,
    /// Add a `text` rendering with paragraph breaks
    pub include_text: bool,
    /// Add a `references` array of content links
    pub include_references: bool,
    /// Pretty print JSON output
    pub pretty: bool,
}

fn references(html: &str) -> Vec<JsonReference> {
    extract_links(html)
        .into_iter()
        .enumerate()
        .map(|(i, LinkReference { text, url })| JsonReference { index: i + 1, text, url })
        .collect()
}

/// Serializes an article.
pub fn convert_to_json(article: &Article, config: &JsonConfig) -> Result<String> {
    let trimmed;
    let article = if config.include_html || article.content_html.is_none() {
        article
    } else {
        trimmed = Article { content_html: None, ..article.clone() };
        &trimmed
    };

    let text = if config.include_text {
        Some(convert_to_text(article, &TextConfig { preserve_paragraphs: true, ..Default::default() })?)
    } else {
        None
    };

    let references = match (&article.content_html, config.include_references) {
        (Some(html), true) => Some(references(html)),
        _ => None,
    };

    to_json_string(&JsonOutput { article, text, references }, config.pretty)
}

/// Serializes raw parser output, keyed by field name in evaluation order.
pub fn document_to_json(document: &ExtractedDocument, pretty: bool) -> Result<String> {
    to_json_string(document, pretty)
}

/// Serializes page metadata.
pub fn metadata_to_json(metadata: &ResponseMeta, pretty: bool) -> Result<String> {
    to_json_string(metadata, pretty)
}

fn to_json_string<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    if pretty { Ok(serde_json::to_string_pretty(value)?) } else { Ok(serde_json::to_string(value)?) }
}

/// JSON formatter with configurable options
pub struct JsonFormatter {
    config: JsonConfig,
}

impl JsonFormatter {
    pub fn new(config: JsonConfig) -> Self {
        Self { config }
    }

    pub fn format(&self, article: &Article) -> Result<String> {
        convert_to_json(article, &self.config)
    }

    pub fn metadata_only(&self, metadata: &ResponseMeta) -> Result<String> {
        metadata_to_json(metadata, self.config.pretty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn article() -> Article {
        Article {
            id: "abc".to_string(),
            url: Some("https://example.com/post".to_string()),
            domain: "example.com".to_string(),
            lang: "en".to_string(),
            content_type: "article".to_string(),
            title: Some("Test".to_string()),
            description: None,
            authors: vec!["Ann".to_string()],
            date_published: None,
            date_modified: None,
            tags: Vec::new(),
            topics: Vec::new(),
            main_points: Vec::new(),
            follow_urls: Vec::new(),
            image: None,
            site_name: None,
            canonical: None,
            content: "One [a](https://a.com)\n\nTwo".to_string(),
            content_html: Some(r#"<p>One <a href="https://a.com">a</a></p><p>Two</p>"#.to_string()),
            word_count: 3,
            token_estimate: 4,
            reading_time: 0.01,
        }
    }

    fn parse(json: &str) -> Value {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_default_output() {
        let json = parse(&convert_to_json(&article(), &JsonConfig::default()).unwrap());

        assert_eq!(json["id"], "abc");
        assert_eq!(json["type"], "article");
        assert_eq!(json["authors"], serde_json::json!(["Ann"]));
        assert_eq!(json["word_count"], 3);
        assert!(json.get("content_html").is_none());
        assert!(json.get("text").is_none());
        assert!(json.get("references").is_none());
    }

    #[test]
    fn test_all_renderings() {
        let config = JsonConfig { include_html: true, include_text: true, include_references: true, pretty: true };
        let output = convert_to_json(&article(), &config).unwrap();
        assert!(output.contains('\n'));

        let json = parse(&output);
        assert!(json["content_html"].as_str().unwrap().starts_with("<p>"));
        assert_eq!(json["text"], "One a\n\nTwo");
        assert_eq!(json["references"], serde_json::json!([{"index": 1, "text": "a", "url": "https://a.com"}]));
    }

    #[test]
    fn test_metadata_to_json() {
        let meta = ResponseMeta { title: Some("T".to_string()), ..Default::default() };
        let json = parse(&JsonFormatter::new(JsonConfig::default()).metadata_only(&meta).unwrap());

        assert_eq!(json, serde_json::json!({"title": "T"}));
    }
}
