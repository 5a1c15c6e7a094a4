use ego_tree::iter::Edge;
use scraper::ElementRef;

use crate::Result;
use crate::article::Article;
use crate::parse::{Document, INVISIBLE_ELEMENTS};
use crate::text::collapse_whitespace;

const BLOCK_ELEMENTS: [&str; 22] = [
    "p",
    "div",
    "section",
    "article",
    "header",
    "footer",
    "figure",
    "figcaption",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "ul",
    "ol",
    "li",
    "blockquote",
    "pre",
    "table",
    "tr",
    "hr",
];

const PARAGRAPH: char = '\u{2029}';
const LINE: char = '\u{2028}';

/// Configuration for plain text output
#[derive(Debug, Clone, Default)]
pub struct TextConfig {
    /// Keep block boundaries as blank lines
    pub preserve_paragraphs: bool,

    /// Wrap lines at this width (0 = no wrapping)
    pub line_width: usize,

    /// Start with a title and byline header
    pub include_header: bool,
}

/// Plain text formatter
pub struct TextFormatter {
    config: TextConfig,
}

impl TextFormatter {
    pub fn new(config: TextConfig) -> Self {
        Self { config }
    }

    pub fn format(&self, article: &Article) -> Result<String> {
        convert_to_text(article, &self.config)
    }
}

/// Renders an article as plain text.
pub fn convert_to_text(article: &Article, config: &TextConfig) -> Result<String> {
    let mut output = String::new();

    if config.include_header {
        output.push_str(generate_header(article).trim_end());
        output.push_str("\n\n");
    }

    let text = match (&article.content_html, config.preserve_paragraphs) {
        (Some(html), true) => extract_text_with_paragraphs(html),
        (Some(html), false) => Document::parse_fragment(html).text_content(),
        (None, _) => article.content.clone(),
    };

    let final_text = if config.line_width > 0 { wrap_text(&text, config.line_width) } else { text };
    output.push_str(&final_text);

    Ok(output.trim().to_string())
}

fn generate_header(article: &Article) -> String {
    let mut header = String::new();

    if let Some(title) = &article.title {
        header.push_str(title);
        header.push('\n');
        header.push_str(&"=".repeat(title.chars().count()));
        header.push('\n');
    }

    let mut meta_parts = Vec::new();

    if !article.authors.is_empty() {
        meta_parts.push(format!("By: {}", article.authors.join(", ")));
    }

    if let Some(date) = &article.date_published {
        meta_parts.push(format!("Date: {}", date));
    }

    if let Some(site) = &article.site_name {
        meta_parts.push(format!("Site: {}", site));
    }

    if !meta_parts.is_empty() {
        header.push_str(&meta_parts.join(" | "));
        header.push('\n');
    }

    header
}

/// Visible text with a blank line between blocks and `<br>` kept as a line break.
fn extract_text_with_paragraphs(html: &str) -> String {
    let document = Document::parse_fragment(html);
    let mut raw = String::new();
    push_blocks(document.html().root_element(), &mut raw);

    raw.split(PARAGRAPH)
        .map(|block| {
            block
                .split(LINE)
                .map(collapse_whitespace)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Walks the subtree without recursion, so nesting depth is unbounded.
fn push_blocks(root: ElementRef<'_>, out: &mut String) {
    let mut hidden = 0usize;
    for edge in root.traverse() {
        match edge {
            Edge::Open(node) => match node.value().as_element() {
                Some(element) => {
                    let name = element.name();
                    if hidden > 0 || INVISIBLE_ELEMENTS.contains(&name) {
                        hidden += 1;
                    } else if name == "br" {
                        out.push(LINE);
                    } else if BLOCK_ELEMENTS.contains(&name) {
                        out.push(PARAGRAPH);
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
                if let Some(element) = node.value().as_element() {
                    if hidden > 0 {
                        hidden -= 1;
                    } else if BLOCK_ELEMENTS.contains(&element.name()) {
                        out.push(PARAGRAPH);
                    }
                }
            }
        }
    }
}

/// Wraps each line of each paragraph to `width` columns.
fn wrap_text(text: &str, width: usize) -> String {
    if width == 0 {
        return text.to_string();
    }

    text.split("\n\n")
        .map(|paragraph| {
            paragraph
                .lines()
                .map(|line| {
                    let words: Vec<&str> = line.split_whitespace().collect();
                    wrap_words(&words, width)
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn wrap_words(words: &[&str], width: usize) -> String {
    let mut lines = Vec::new();
    let mut current_line = Vec::new();
    let mut current_length = 0;

    for &word in words {
        let word_len = word.chars().count();

        if current_length == 0 {
            current_line.push(word);
            current_length = word_len;
        } else if current_length + 1 + word_len <= width {
            current_length += 1 + word_len;
            current_line.push(word);
        } else {
            lines.push(current_line.join(" "));
            current_line = vec![word];
            current_length = word_len;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line.join(" "));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(html: Option<&str>, content: &str) -> Article {
        Article {
            id: "id".to_string(),
            url: None,
            domain: "example.com".to_string(),
            lang: "en".to_string(),
            content_type: "article".to_string(),
            title: Some("Título".to_string()),
            description: None,
            authors: vec!["Ann".to_string(), "Bob".to_string()],
            date_published: Some("2024-01-15".to_string()),
            date_modified: None,
            tags: Vec::new(),
            topics: Vec::new(),
            main_points: Vec::new(),
            follow_urls: Vec::new(),
            image: None,
            site_name: Some("Example".to_string()),
            canonical: None,
            content: content.to_string(),
            content_html: html.map(str::to_string),
            word_count: 0,
            token_estimate: 0,
            reading_time: 0.0,
        }
    }

    #[test]
    fn test_extract_text_with_paragraphs() {
        let html = r#"
            <div>
                <h1>Title</h1>
                <p>First <strong>para</strong>graph.</p>
                <p>Line one<br>line two</p>
                <ul><li>a</li><li>b</li></ul>
                <script>var x = 1;</script>
            </div>
        "#;

        assert_eq!(
            extract_text_with_paragraphs(html),
            "Title\n\nFirst paragraph.\n\nLine one\nline two\n\na\n\nb"
        );
    }

    #[test]
    fn test_paragraphs_of_deep_tree() {
        let depth = 10_000;
        let html = format!("{}<p>deep</p><noscript>no</noscript>{}", "<div>".repeat(depth), "</div>".repeat(depth));
        assert_eq!(extract_text_with_paragraphs(&html), "deep");
    }

    #[test]
    fn test_flat_text() {
        let article = article(Some("<p>One</p>\n<p>Two</p>"), "");
        let text = convert_to_text(&article, &TextConfig::default()).unwrap();
        assert_eq!(text, "One Two");
    }

    #[test]
    fn test_text_mode_content() {
        let article = article(None, "Already plain.");
        let config = TextConfig { preserve_paragraphs: true, ..Default::default() };
        assert_eq!(convert_to_text(&article, &config).unwrap(), "Already plain.");
    }

    #[test]
    fn test_header() {
        let article = article(Some("<p>Body</p>"), "");
        let config = TextConfig { include_header: true, preserve_paragraphs: true, ..Default::default() };
        let text = convert_to_text(&article, &config).unwrap();

        assert_eq!(text, "Título\n======\nBy: Ann, Bob | Date: 2024-01-15 | Site: Example\n\nBody");
    }

    #[test]
    fn test_wrap_text() {
        let text = "The quick brown fox jumps over the lazy dog.\n\nSecond paragraph here.";
        assert_eq!(
            wrap_text(text, 20),
            "The quick brown fox\njumps over the lazy\ndog.\n\nSecond paragraph\nhere."
        );
        assert_eq!(wrap_text(text, 0), text);
    }

    #[test]
    fn test_wrap_long_word() {
        assert_eq!(wrap_words(&["short", "extraordinarily", "x"], 8), "short\nextraordinarily\nx");
    }
}
