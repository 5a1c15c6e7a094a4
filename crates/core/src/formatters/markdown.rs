use std::collections::HashSet;

use url::Url;

use crate::article::Article;
use crate::convert::to_markdown;
use crate::parse::Document;
use crate::{ExcerptaError, Result};

/// Configuration for Markdown output
#[derive(Debug, Clone, Default)]
pub struct MarkdownConfig {
    /// Include TOML frontmatter with article fields
    pub include_frontmatter: bool,
    /// Append a reference table of every link in the content
    pub include_references: bool,
    /// Drop images before conversion
    pub strip_images: bool,
    /// Start the body with the title as an H1
    pub include_title_heading: bool,
    /// Resolves relative `href` and `src` values before conversion
    pub base_url: Option<Url>,
}

/// A collected link reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReference {
    pub text: String,
    pub url: String,
}

/// Renders an article as Markdown.
///
/// Html-mode articles are converted again from `content_html` so that the
/// rewriting options apply; text-mode articles use `content` as is.
pub fn convert_to_markdown(article: &Article, config: &MarkdownConfig) -> Result<String> {
    let mut output = String::new();

    if config.include_frontmatter {
        output.push_str(&generate_frontmatter(article));
        output.push('\n');
    }

    if config.include_title_heading
        && let Some(title) = &article.title
    {
        output.push_str(&format!("# {}\n\n", title));
    }

    let processed_html = match &article.content_html {
        Some(html) => Some(prepare_html(html, config)?),
        None => None,
    };

    match &processed_html {
        Some(html) => output.push_str(&to_markdown(html)),
        None => output.push_str(&article.content),
    }

    if config.include_references
        && let Some(html) = &processed_html
    {
        let links = extract_links(html);
        if !links.is_empty() {
            output.push_str("\n\n## References\n\n");
            output.push_str(&generate_reference_table(&links));
        }
    }

    Ok(output)
}

fn prepare_html(html: &str, config: &MarkdownConfig) -> Result<String> {
    let mut html = html.to_string();
    if config.strip_images {
        html = strip_images(&html)?;
    }
    if let Some(base_url) = &config.base_url {
        html = absolutize_links(&html, base_url)?;
    }
    Ok(html)
}

/// TOML frontmatter between `+++` fences.
fn generate_frontmatter(article: &Article) -> String {
    let mut frontmatter = String::from("+++");

    let mut string_entry = |key: &str, value: Option<&str>| {
        if let Some(value) = value {
            frontmatter.push_str(&format!("\n{} = {}", key, toml_escape_string(value)));
        }
    };
    string_entry("title", article.title.as_deref());
    string_entry("description", article.description.as_deref());
    string_entry("date", article.date_published.as_deref());
    string_entry("updated", article.date_modified.as_deref());
    string_entry("site", article.site_name.as_deref());
    string_entry("url", article.url.as_deref());
    string_entry("lang", Some(&article.lang));

    if !article.authors.is_empty() {
        frontmatter.push_str(&format!("\nauthors = {}", toml_array(&article.authors)));
    }
    if !article.tags.is_empty() {
        frontmatter.push_str(&format!("\ntags = {}", toml_array(&article.tags)));
    }

    frontmatter.push_str(&format!("\nword_count = {}", article.word_count));
    frontmatter.push_str(&format!("\nreading_time_minutes = {:.1}", article.reading_time));
    frontmatter.push_str("\n+++\n");

    frontmatter
}

/// Escape a string for TOML format
fn toml_escape_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n"))
}

fn toml_array(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| toml_escape_string(v)).collect();
    format!("[{}]", items.join(", "))
}

/// Removes every `<img>` element.
fn strip_images(html: &str) -> Result<String> {
    rewrite(
        html,
        vec![lol_html::element!("img", |el| {
            el.remove();
            Ok(())
        })],
    )
}

/// Resolves relative link and image targets against `base`.
fn absolutize_links(html: &str, base: &Url) -> Result<String> {
    rewrite(
        html,
        vec![
            lol_html::element!("a[href]", |el| {
                if let Some(href) = el.get_attribute("href")
                    && let Some(resolved) = resolve_relative(base, &href)
                {
                    el.set_attribute("href", &resolved)?;
                }
                Ok(())
            }),
            lol_html::element!("img[src]", |el| {
                if let Some(src) = el.get_attribute("src")
                    && let Some(resolved) = resolve_relative(base, &src)
                {
                    el.set_attribute("src", &resolved)?;
                }
                Ok(())
            }),
        ],
    )
}

/// Joined URL for relative paths; `None` for fragments, schemes and blanks.
fn resolve_relative(base: &Url, value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.starts_with('#') || Url::parse(value).is_ok() {
        return None;
    }
    base.join(value).ok().map(String::from)
}

fn rewrite<'h>(
    html: &str, handlers: Vec<(std::borrow::Cow<'_, lol_html::Selector>, lol_html::ElementContentHandlers<'h>)>,
) -> Result<String> {
    let mut output = Vec::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings { element_content_handlers: handlers, ..Default::default() },
        |c: &[u8]| output.extend_from_slice(c),
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| ExcerptaError::HtmlParseError(e.to_string()))?;
    rewriter.end().map_err(|e| ExcerptaError::HtmlParseError(e.to_string()))?;

    String::from_utf8(output).map_err(|e| ExcerptaError::HtmlParseError(e.to_string()))
}

/// Collects links in document order, first occurrence of each URL wins.
pub fn extract_links(html: &str) -> Vec<LinkReference> {
    let document = Document::parse_fragment(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select("a[href]").unwrap_or_default() {
        let text = element.text();
        let Some(url) = element.attr("href").map(|u| u.trim().to_string()) else {
            continue;
        };

        if text.is_empty() || url.is_empty() {
            continue;
        }
        if seen.insert(url.clone()) {
            links.push(LinkReference { text, url });
        }
    }

    links
}

fn generate_reference_table(links: &[LinkReference]) -> String {
    let mut table = String::from("| # | Text | URL |\n");
    table.push_str("|---|------|-----|\n");

    for (i, link) in links.iter().enumerate() {
        table.push_str(&format!("| {} | {} | {} |\n", i + 1, escape_pipe(&link.text), escape_pipe(&link.url)));
    }

    table
}

fn escape_pipe(s: &str) -> String {
    s.replace('|', "\\|")
}

/// Markdown formatter with configurable options
pub struct MarkdownFormatter {
    config: MarkdownConfig,
}

impl MarkdownFormatter {
    pub fn new(config: MarkdownConfig) -> Self {
        Self { config }
    }

    pub fn format(&self, article: &Article) -> Result<String> {
        convert_to_markdown(article, &self.config)
    }
}
