//! Article assembly and format conversion.
//!
//! An [`Article`] merges the selector-extracted [`ExtractedDocument`] with
//! page [`ResponseMeta`]. Selector values always win; metadata only fills
//! fields the domain config did not produce.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::chunking::{ArticleChunk, ChunkBudget, RagDocument, RagMetadata, chunk_text};
use crate::config::{DomainConfig, Field};
use crate::convert::to_markdown;
use crate::formatters::json::{JsonConfig, convert_to_json};
use crate::formatters::markdown::{MarkdownConfig, convert_to_markdown};
use crate::formatters::text::{TextConfig, convert_to_text};
use crate::metadata::ResponseMeta;
use crate::parse::Document;
use crate::parser::ExtractedDocument;
use crate::selector::ExtractionMode;
use crate::text::{count_words, estimate_tokens, reading_time_minutes};
use crate::{ExcerptaError, Result};

/// Number of content characters hashed into [`Article::id`].
const ID_CONTENT_PREFIX: usize = 512;

/// Output format options for Article content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Extracted HTML, or the plain content for text-mode configs.
    Html,
    /// Markdown body.
    Markdown,
    /// Plain text with paragraph breaks.
    PlainText,
    /// Structured JSON.
    Json,
}

/// A fully assembled article.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    /// Stable identifier: SHA-256 of the URL (or domain) and the start of the content.
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub domain: String,
    pub lang: String,
    #[serde(rename = "type")]
    pub content_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_published: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub main_points: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub follow_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,

    /// Markdown for html-mode content, the extracted text otherwise.
    pub content: String,
    /// Extracted markup when the content field is in html mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_html: Option<String>,

    pub word_count: usize,
    pub token_estimate: usize,
    /// Minutes at 220 words per minute.
    pub reading_time: f64,
}

impl Article {
    /// Merges parser output over page metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ExcerptaError::NoContent`] when the content field is absent
    /// or renders to nothing.
    pub fn assemble(
        extracted: &ExtractedDocument, meta: &ResponseMeta, config: &DomainConfig, url: Option<&str>,
    ) -> Result<Self> {
        let raw = extracted.content().map(str::trim).filter(|c| !c.is_empty()).ok_or(ExcerptaError::NoContent)?;

        let html_mode = config.content.as_ref().is_some_and(|spec| spec.extraction_mode == ExtractionMode::Html);
        let (content, content_html, plain) = if html_mode {
            let plain = Document::parse_fragment(raw).text_content();
            (to_markdown(raw), Some(raw.to_string()), plain)
        } else {
            (raw.to_string(), None, raw.to_string())
        };

        if content.trim().is_empty() {
            return Err(ExcerptaError::NoContent);
        }

        let text = |field: Field, fallback: &Option<String>| {
            extracted.text(field).map(str::to_string).or_else(|| fallback.clone())
        };
        let list = |field: Field, fallback: &[String]| {
            let values = extracted.list(field);
            if values.is_empty() { fallback.to_vec() } else { values }
        };

        let word_count = count_words(&plain);

        Ok(Self {
            id: article_id(url.unwrap_or(&config.domain), &content),
            url: url.map(str::to_string),
            domain: config.domain.clone(),
            lang: config.lang.clone(),
            content_type: config.content_type.clone(),
            title: text(Field::Title, &meta.title),
            description: text(Field::Description, &meta.description),
            authors: list(Field::Authors, &meta.authors),
            date_published: text(Field::DatePublished, &meta.date_published),
            date_modified: text(Field::DateModified, &meta.date_modified),
            tags: list(Field::Tags, &meta.tags),
            topics: list(Field::Topics, &meta.topics),
            main_points: extracted.list(Field::MainPoints),
            follow_urls: extracted.list(Field::FollowUrls),
            image: meta.image.clone(),
            site_name: meta.site_name.clone(),
            canonical: meta.canonical.clone(),
            token_estimate: estimate_tokens(&plain),
            reading_time: reading_time_minutes(word_count),
            word_count,
            content,
            content_html,
        })
    }

    /// Converts content to the specified format.
    pub fn to_format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Html => Ok(self.content_html.clone().unwrap_or_else(|| self.content.clone())),
            OutputFormat::Markdown => self.to_markdown_with_config(&MarkdownConfig::default()),
            OutputFormat::PlainText => convert_to_text(self, &TextConfig { preserve_paragraphs: true, ..Default::default() }),
            OutputFormat::Json => convert_to_json(self, &JsonConfig::default()),
        }
    }

    /// Gets content as Markdown with custom configuration.
    pub fn to_markdown_with_config(&self, config: &MarkdownConfig) -> Result<String> {
        convert_to_markdown(self, config)
    }

    /// Gets the article as structured JSON.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Splits the plain-text body into chunks within `budget`.
    ///
    /// A leading copy of the title is dropped so it isn't repeated in the
    /// first chunk.
    pub fn chunks(&self, budget: ChunkBudget) -> Result<Vec<ArticleChunk>> {
        let text = convert_to_text(self, &TextConfig { preserve_paragraphs: true, ..Default::default() })?;
        let body = match self.title.as_deref() {
            Some(title) if !title.is_empty() => text.strip_prefix(title).unwrap_or(&text),
            _ => &text,
        };
        Ok(chunk_text(body, budget))
    }

    /// Chunks the article and tags each chunk with the article's identity.
    pub fn to_rag_documents(&self, budget: ChunkBudget) -> Result<Vec<RagDocument>> {
        let documents = self
            .chunks(budget)?
            .into_iter()
            .map(|chunk| RagDocument {
                id: format!("{}-chunk-{}", self.id, chunk.index),
                text: chunk.content,
                meta: RagMetadata {
                    article_id: self.id.clone(),
                    title: self.title.clone(),
                    source_url: self.url.clone(),
                    index: chunk.index,
                    domain: self.domain.clone(),
                },
            })
            .collect();
        Ok(documents)
    }
}

/// Hex SHA-256 of `key|content[..512 chars]`.
fn article_id(key: &str, content: &str) -> String {
    let prefix: String = content.chars().take(ID_CONTENT_PREFIX).collect();
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.update(b"|");
    hasher.update(prefix.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::DocumentParser;
    use crate::selector::FieldSpec;

    const PAGE: &str = r#"
        <html>
        <head>
            <meta property="og:title" content="Meta Title">
            <meta property="og:site_name" content="Example">
            <meta name="keywords" content="meta, keywords">
            <meta property="article:published_time" content="2024-01-15T10:00:00Z">
        </head>
        <body>
            <h1 class="post-title">Selector Title</h1>
            <div class="content"><p>Hello <b>brave</b> new world.</p></div>
        </body>
        </html>
    "#;

    fn assemble(config: &DomainConfig, url: Option<&str>) -> Result<Article> {
        let extracted = DocumentParser::new(config).parse(PAGE);
        let meta = crate::metadata::extract_meta(PAGE);
        Article::assemble(&extracted, &meta, config, url)
    }

    fn html_config() -> DomainConfig {
        DomainConfig::new("example.com", FieldSpec::new([".content"]).html())
            .with_field(Field::Title, FieldSpec::new(["h1.post-title"]))
    }

    #[test]
    fn test_selector_values_win_over_metadata() {
        let article = assemble(&html_config(), Some("https://example.com/a")).unwrap();

        assert_eq!(article.title.as_deref(), Some("Selector Title"));
        assert_eq!(article.date_published.as_deref(), Some("2024-01-15T10:00:00Z"));
        assert_eq!(article.tags, vec!["meta", "keywords"]);
        assert_eq!(article.site_name.as_deref(), Some("Example"));
        assert_eq!(article.url.as_deref(), Some("https://example.com/a"));
    }

    #[test]
    fn test_html_content_converted_to_markdown() {
        let article = assemble(&html_config(), None).unwrap();

        assert_eq!(article.content, "Hello **brave** new world.");
        assert!(article.content_html.as_deref().unwrap().starts_with("<div class=\"content\">"));
        assert_eq!(article.word_count, 4);
        assert_eq!(article.token_estimate, 6);
        assert_eq!(article.reading_time, 0.02);
    }

    #[test]
    fn test_text_content_kept_verbatim() {
        let config = DomainConfig::new("example.com", FieldSpec::new([".content"]));
        let article = assemble(&config, None).unwrap();

        assert_eq!(article.content, "Hello brave new world.");
        assert!(article.content_html.is_none());
        assert_eq!(article.to_format(OutputFormat::Html).unwrap(), "Hello brave new world.");
    }

    #[test]
    fn test_missing_content_is_error() {
        let config = DomainConfig::new("example.com", FieldSpec::new(["article.missing"]));
        assert!(matches!(assemble(&config, None), Err(ExcerptaError::NoContent)));
    }

    #[test]
    fn test_id_is_stable() {
        let first = assemble(&html_config(), Some("https://example.com/a")).unwrap();
        let second = assemble(&html_config(), Some("https://example.com/a")).unwrap();
        let other = assemble(&html_config(), Some("https://example.com/b")).unwrap();

        assert_eq!(first.id, second.id);
        assert_ne!(first.id, other.id);
        assert_eq!(first.id.len(), 64);
    }

    fn long_page_config() -> DomainConfig {
        DomainConfig::new("example.com", FieldSpec::new(["article"]).html())
            .with_field(Field::Title, FieldSpec::new(["h1"]))
    }

    fn long_page(paragraphs: usize) -> String {
        let body: String = (0..paragraphs)
            .map(|i| format!("<p>Paragraph {i} tells how the river rose past the mill. The town watched.</p>"))
            .collect();
        format!("<html><body><article><h1>River Notes</h1>{body}</article></body></html>")
    }

    fn assemble_page(html: &str, url: Option<&str>) -> Article {
        let config = long_page_config();
        let extracted = DocumentParser::new(&config).parse(html);
        let meta = crate::metadata::extract_meta(html);
        Article::assemble(&extracted, &meta, &config, url).unwrap()
    }

    #[test]
    fn test_chunks_drop_leading_title() {
        let article = assemble_page(&long_page(2), None);
        let chunks = article.chunks(ChunkBudget::DEFAULT_TOKENS).unwrap();

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.starts_with("Paragraph 0 tells"));
        assert!(chunks[0].content.contains("mill. The town watched.\n\nParagraph 1"));
    }

    #[test]
    fn test_chunks_respect_budget() {
        let article = assemble_page(&long_page(40), None);

        let chunks = article.chunks(ChunkBudget::Tokens { max: 60, overlap: 8 }).unwrap();
        assert!(chunks.len() > 5);
        assert!(chunks.iter().all(|c| c.token_estimate <= 60));

        let chunks = article.chunks(ChunkBudget::Chars { max: 300, overlap: 30 }).unwrap();
        assert!(chunks.iter().all(|c| c.char_length <= 300));
    }

    #[test]
    fn test_rag_documents() {
        let article = assemble_page(&long_page(40), Some("https://example.com/river"));
        let documents = article.to_rag_documents(ChunkBudget::Tokens { max: 60, overlap: 0 }).unwrap();

        assert!(documents.len() > 1);
        let second = &documents[1];
        assert_eq!(second.id, format!("{}-chunk-1", article.id));
        assert_eq!(second.meta.index, 1);
        assert_eq!(second.meta.article_id, article.id);
        assert_eq!(second.meta.title.as_deref(), Some("River Notes"));
        assert_eq!(second.meta.source_url.as_deref(), Some("https://example.com/river"));
        assert_eq!(second.meta.domain, "example.com");

        let json = serde_json::to_value(second).unwrap();
        assert_eq!(json["meta"]["index"], 1);
    }

    #[test]
    fn test_to_json() {
        let article = assemble(&html_config(), None).unwrap();
        let json = article.to_json().unwrap();

        assert_eq!(json["type"], "article");
        assert_eq!(json["title"], "Selector Title");
        assert!(json.get("url").is_none());
        assert!(json.get("authors").is_none());
    }
}
