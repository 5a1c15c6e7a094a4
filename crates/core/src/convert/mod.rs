//! HTML to Markdown conversion.
//!
//! The converter is a post-order fold over the html5ever tree: each element's
//! children are converted first and the element's [`Rule`] then decides how
//! the concatenated child text is rendered. Source whitespace never survives
//! into the output layout; only rules emit line breaks.
//!
//! Elements nested deeper than [`MAX_NESTING`] are rendered as their plain
//! visible text, so hostile markup cannot exhaust the stack.
//!
//! # Example
//!
//! ```rust
//! use excerpta_core::convert::to_markdown;
//!
//! let md = to_markdown(r#"<h2>Intro</h2><p>Read <a href="https://example.com">this</a>.</p>"#);
//! assert_eq!(md, "## Intro\n\nRead [this](https://example.com).");
//! ```

mod rules;

pub use rules::{Rule, rule_for};

use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use url::Url;

use crate::parse::push_visible_text;
use rules::{BARE_LINK_PREFIXES, BRK, LAZY_IMAGE_ATTRIBUTES, SAFE_IMAGE_EXTENSIONS, SPACE, TAB};

static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").expect("valid regex"));
static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static EMPHASIS_PAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\*\*|_) +([.,;:!?)\]])").expect("valid regex"));

/// Element depth past which structure is dropped in favor of plain text.
pub const MAX_NESTING: usize = 128;

/// Converts an HTML fragment to Markdown.
pub fn to_markdown(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let raw = Converter::default().children(fragment.root_element());
    finish(&raw)
}

#[derive(Debug, Default, Clone, Copy)]
struct Converter {
    /// Inside `<pre>`: whitespace is literal.
    in_pre: bool,
    depth: usize,
}

impl Converter {
    fn children(self, element: ElementRef<'_>) -> String {
        let nested = Converter { depth: self.depth + 1, ..self };
        let mut out = String::new();
        for child in element.children() {
            if let Some(child_element) = ElementRef::wrap(child) {
                out.push_str(&nested.element(child_element));
            } else if let Some(text) = child.value().as_text() {
                self.push_text(text, &mut out);
            }
        }
        out
    }

    /// Source text with placeholder code points replaced, so only rules
    /// can produce layout.
    fn push_text(self, text: &str, out: &mut String) {
        for c in text.chars() {
            match c {
                '\r' if self.in_pre => {}
                '\n' if self.in_pre => out.push(BRK),
                '\t' if self.in_pre => out.push(TAB),
                ' ' if self.in_pre => out.push(SPACE),
                '\r' | '\n' | '\t' | BRK | TAB | SPACE => out.push(' '),
                _ => out.push(c),
            }
        }
    }

    fn element(self, element: ElementRef<'_>) -> String {
        let rule = rule_for(element.value().name());
        if self.depth >= MAX_NESTING && rule != Rule::Suppress {
            let mut raw = String::new();
            push_visible_text(element, &mut raw);
            let mut out = String::from(' ');
            self.push_text(&raw, &mut out);
            out.push(' ');
            return out;
        }

        match rule {
            Rule::Suppress => String::new(),
            Rule::PassThrough => self.children(element),
            Rule::Wrap { prefix, suffix } => wrap(prefix, &self.children(element), suffix),
            Rule::Heading(level) => {
                let text = inline(&self.children(element));
                if text.is_empty() {
                    return String::new();
                }
                format!("{BRK}{BRK}{} {}{BRK}", "#".repeat(level), text)
            }
            Rule::Blockquote => {
                let text = self.children(element);
                let text = trim_block(&text);
                if text.is_empty() {
                    return String::new();
                }

                let mut lines: Vec<&str> = Vec::new();
                for line in text.split(BRK).map(str::trim) {
                    if is_blank(line) && lines.last().is_some_and(|last| is_blank(last)) {
                        continue;
                    }
                    lines.push(line);
                }
                format!("{BRK}> {}{BRK}", lines.join(&format!("{BRK}> ")))
            }
            Rule::UnorderedList => {
                let items = self.children(element);
                if is_blank(&items) {
                    return String::new();
                }
                format!("{BRK}{}{BRK}{BRK}", items)
            }
            Rule::OrderedList => self.ordered_list(element),
            Rule::ListItem => match self.list_item(element) {
                Some(item) => format!("- {}{BRK}", item),
                None => String::new(),
            },
            Rule::Link => self.link(element),
            Rule::Image => image(element),
            Rule::LineBreak => BRK.to_string(),
            Rule::HorizontalRule => format!("{BRK}---{BRK}"),
            Rule::Preformatted => {
                let code = Converter { in_pre: true, ..self }.children(element);
                let code = code.trim_matches(BRK);
                if is_blank(code) {
                    return String::new();
                }
                format!("{BRK}```{BRK}{}{BRK}```{BRK}", code)
            }
            Rule::Code if self.in_pre => self.children(element),
            Rule::Code => {
                let text = inline(&self.children(element));
                if text.is_empty() { String::new() } else { format!("`{}`", text) }
            }
            Rule::Table => wrap(&BRK.to_string(), &self.children(element), &BRK.to_string()),
            Rule::TableHead => format!("{BRK}{}", self.children(element)),
            Rule::TableBody => format!("{}{BRK}{BRK}", self.children(element)),
            Rule::TableRow => self.table_row(element),
            Rule::TableCell => format!(" {} |", inline(&self.children(element))),
        }
    }

    /// Item text with blank lines removed and continuation lines indented.
    fn list_item(self, element: ElementRef<'_>) -> Option<String> {
        let text = self.children(element);
        let lines: Vec<&str> = text.split(BRK).map(str::trim).filter(|line| !is_blank(line)).collect();
        if lines.is_empty() {
            return None;
        }
        Some(lines.join(&format!("{BRK}{SPACE}{SPACE}")))
    }

    fn ordered_list(self, element: ElementRef<'_>) -> String {
        let nested = Converter { depth: self.depth + 1, ..self };
        let mut items = String::new();
        let mut number = 0;

        for child in element.children().filter_map(ElementRef::wrap) {
            if child.value().name() == "li" {
                if let Some(item) = nested.list_item(child) {
                    number += 1;
                    items.push_str(&format!("{}. {}{BRK}", number, item));
                }
            } else {
                items.push_str(&nested.element(child));
            }
        }

        if items.is_empty() {
            return String::new();
        }
        format!("{BRK}{}{BRK}{BRK}", items)
    }

    fn link(self, element: ElementRef<'_>) -> String {
        let text = inline(&self.children(element));
        if text.is_empty() {
            return String::new();
        }

        match element.value().attr("href").map(str::trim) {
            Some(href) if !href.is_empty() && !BARE_LINK_PREFIXES.iter().any(|prefix| href.starts_with(prefix)) => {
                format!(" [{}]({})", text, href)
            }
            _ => text,
        }
    }

    fn table_row(self, element: ElementRef<'_>) -> String {
        let cells: Vec<&str> = element
            .children()
            .filter_map(ElementRef::wrap)
            .map(|cell| cell.value().name())
            .filter(|name| matches!(*name, "th" | "td"))
            .collect();

        let mut row = format!("{BRK}| {}", self.children(element));
        if !cells.is_empty() && cells.iter().all(|name| *name == "th") {
            row.push(BRK);
            row.push('|');
            for _ in &cells {
                row.push_str(" --- |");
            }
        }
        row
    }
}

/// Renders an `<img>`, or nothing when no safe source resolves.
fn image(element: ElementRef<'_>) -> String {
    let attrs = element.value();
    let Some(src) = std::iter::once("src")
        .chain(LAZY_IMAGE_ATTRIBUTES)
        .filter_map(|name| attrs.attr(name).and_then(|value| image_candidate(name, value)))
        .find(|url| is_safe_image(url))
    else {
        return String::new();
    };

    let alt = attrs.attr("alt").map(clean_dash).unwrap_or_default();
    let title = attrs.attr("title").map(clean_dash).unwrap_or_default();

    let markdown = match (alt.is_empty(), title.is_empty()) {
        (false, false) => format!("![{}]({} \"{}\")", alt, src, title),
        (false, true) => format!("![{}]({})", alt, src),
        (true, _) => format!("![]({})", src),
    };
    format!("{BRK}{BRK}{}{BRK}", markdown)
}

/// URL carried by one image attribute. `srcset` contributes its first
/// candidate; protocol-relative URLs are given an https scheme.
fn image_candidate(name: &str, value: &str) -> Option<String> {
    let value = if name == "srcset" { value.split(',').next()?.split_whitespace().next()? } else { value.trim() };

    if value.is_empty() {
        None
    } else if let Some(rest) = value.strip_prefix("//") {
        Some(format!("https://{}", rest))
    } else {
        Some(value.to_string())
    }
}

fn is_safe_image(src: &str) -> bool {
    let Ok(url) = Url::parse(src) else {
        return false;
    };
    let path = url.path().to_lowercase();
    matches!(url.scheme(), "http" | "https") && SAFE_IMAGE_EXTENSIONS.iter().any(|ext| path.contains(ext))
}

/// Spaces out hyphens and quotes so alt/title text reads cleanly.
fn clean_dash(value: &str) -> String {
    crate::text::collapse_whitespace(&value.replace('-', " - ").replace('"', "'"))
}

fn wrap(prefix: &str, text: &str, suffix: &str) -> String {
    if is_blank(text) {
        return String::new();
    }
    format!("{}{}{}", prefix, text.trim(), suffix)
}

/// Single-line form of converted text.
fn inline(text: &str) -> String {
    crate::text::collapse_whitespace(&text.replace(BRK, " "))
}

fn trim_block(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || c == BRK)
}

fn is_blank(text: &str) -> bool {
    text.chars().all(|c| c.is_whitespace() || c == BRK || c == TAB || c == SPACE)
}

/// Collapses spaces, decodes placeholders and normalizes blank lines.
fn finish(raw: &str) -> String {
    let text = SPACES_RE.replace_all(raw, " ");
    let text = EMPHASIS_PAD_RE.replace_all(&text, "$1$2");
    let text = text.replace(BRK, "\n").replace(TAB, "\t");
    let text = text.lines().map(|line| line.trim_matches(' ')).collect::<Vec<_>>().join("\n");
    let text = BLANK_LINES_RE.replace_all(&text, "\n\n");
    text.replace(SPACE, " ").trim().to_string()
}
