//! Built-in domain configs for sites without a config of their own.
//!
//! Each preset is an ordinary [`DomainConfig`] built from long fallback
//! chains of selectors common across news and blog templates. The most
//! specific selectors come first; bare `h1`, `article` and `main` close the
//! chains.

use crate::config::{DomainConfig, Field};
use crate::selector::{FieldSpec, QuerySpec};

/// Boilerplate removed from the whole document by every preset.
pub const COMMON_CLEANUP_SELECTORS: &[&str] = &[
    ".ads-center",
    ".ads_middle",
    ".adscontent",
    ".adv",
    ".ap_container",
    ".google-ads",
    ".google-auto-placed",
    ".popup",
    ".popup-detail-content",
    ".related",
    ".social-bar",
    ".sponsor",
    ".table-of-contents",
    ".toc-plus",
    ".toc-subnav",
    ".tts-player",
    ".youtube-video",
    ".print-link",
    ".comment-links",
    "figure.wp-block-embed",
    ".tdb_single_content .tdb-block-inner.td-fix-index",
];

const TITLE_SELECTORS: &[&str] = &[
    "h1.article_title",
    "h1.article__title",
    "h1.article-title",
    "h1.cms-title",
    "h1.kbwc-title",
    "h1.text-title",
    "h1.the-article-title",
    "h1.tmp-title-large",
    "h1.main-title",
    "h1.main-title-super",
    "h1.detail-title",
    "h1.news-title",
    "h1.content-detail-title",
    "h1.single-page-title",
    ".tdb-title-text",
    "h1",
];

const CONTENT_SELECTORS: &[&str] = &[
    ".ContentDetail",
    ".art-body",
    ".article-content",
    ".cate-24h-foot-arti-deta-info",
    ".article__body",
    ".detail-body",
    ".detail-content",
    ".fck_detail",
    ".the-article-content",
    ".tmp-entry-content",
    ".zce-content-body",
    ".txt_content",
    ".edittor-content",
    ".content_detailnews",
    ".afcbc-body",
    ".cms-body",
    ".knc-content",
    ".singular-content",
    ".sapo_detail",
    ".entry-body",
    ".tdb_single_content",
    ".single-post-content",
    "[itemprop='articleBody']",
    "article",
    "main",
];

const AUTHOR_SELECTORS: &[&str] = &[
    ".article__author",
    ".author-name",
    ".author-title",
    ".authorName",
    ".cms-author",
    ".content-author",
    ".kbwcm-author",
    ".name-author",
    ".wrap-author",
    ".link_author",
    ".author-info",
    ".detail__author",
    ".author",
    ".authors",
    ".txt-name",
    "[rel='author']",
];

const TAG_SELECTORS: &[&str] = &["a[rel='tag']", ".tdb-tags a", ".tags a", ".tag a"];

const WORDPRESS_TITLE: &[&str] = &[".tdb-title-text", "h1.single-page-title", "h1.entry-title", "h1.post-title"];
const WORDPRESS_CONTENT: &[&str] = &[".tdb_single_content", ".single-post-content", ".entry-content", ".post-content"];
const WORDPRESS_AUTHOR: &[&str] = &[".tdb-author-name", ".author-box .author-name"];
const WORDPRESS_TAGS: &[&str] = &[".tdb-tags a", ".tags-links a"];
const WORDPRESS_CLEANUP: &[&str] = &[".td-post-sharing-top", ".td-post-sharing-bottom", ".td-g-rec", ".ez-toc-container"];

/// Names accepted by [`by_name`].
pub const PRESET_NAMES: [&str; 2] = ["generic", "wordpress"];

/// The generic fallback config, bound to `domain`.
///
/// Content is kept as markup so Markdown output retains its structure.
pub fn generic(domain: impl Into<String>) -> DomainConfig {
    DomainConfig::new(domain, FieldSpec::new(CONTENT_SELECTORS.iter().copied()).html())
        .with_field(Field::Title, FieldSpec::new(TITLE_SELECTORS.iter().copied()))
        .with_field(Field::Authors, FieldSpec::new(AUTHOR_SELECTORS.iter().copied()).all())
        .with_field(Field::DatePublished, date_published())
        .with_field(Field::DateModified, date_modified())
        .with_field(Field::Tags, FieldSpec::new(TAG_SELECTORS.iter().copied()).all())
        .with_cleanup(COMMON_CLEANUP_SELECTORS.iter().copied())
}

/// Config tuned for WordPress themes, bound to `domain`.
///
/// Theme selectors are tried before the generic chains.
pub fn wordpress(domain: impl Into<String>) -> DomainConfig {
    DomainConfig::new(domain, FieldSpec::new(chain(WORDPRESS_CONTENT, CONTENT_SELECTORS)).html())
        .with_field(Field::Title, FieldSpec::new(chain(WORDPRESS_TITLE, TITLE_SELECTORS)))
        .with_field(Field::Authors, FieldSpec::new(chain(WORDPRESS_AUTHOR, AUTHOR_SELECTORS)).all())
        .with_field(Field::DatePublished, date_published())
        .with_field(Field::DateModified, date_modified())
        .with_field(Field::Tags, FieldSpec::new(chain(WORDPRESS_TAGS, TAG_SELECTORS)).all())
        .with_cleanup(chain(COMMON_CLEANUP_SELECTORS, WORDPRESS_CLEANUP))
}

/// Looks up a preset by name, case-insensitively.
pub fn by_name(name: &str, domain: impl Into<String>) -> Option<DomainConfig> {
    match name.trim().to_lowercase().as_str() {
        "generic" => Some(generic(domain)),
        "wordpress" | "wp" => Some(wordpress(domain)),
        _ => None,
    }
}

fn date_published() -> FieldSpec {
    FieldSpec::new([
        QuerySpec::new("time[itemprop='datePublished']").with_attribute("datetime"),
        QuerySpec::new("time[property='article:published_time']").with_attribute("datetime"),
        QuerySpec::new("meta[property='article:published_time']").with_attribute("content"),
        QuerySpec::new("time").with_attribute("datetime"),
        QuerySpec::new("[data-role='publishdate']"),
        QuerySpec::new(".detail-time"),
        QuerySpec::new(".author-time"),
        QuerySpec::new(".post-time"),
    ])
}

fn date_modified() -> FieldSpec {
    FieldSpec::new([
        QuerySpec::new("time[itemprop='dateModified']").with_attribute("datetime"),
        QuerySpec::new("meta[property='article:modified_time']").with_attribute("content"),
    ])
}

/// Concatenates two selector lists, dropping repeats after their first
/// occurrence.
fn chain(first: &[&'static str], rest: &[&'static str]) -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::with_capacity(first.len() + rest.len());
    for &selector in first.iter().chain(rest) {
        if !out.contains(&selector) {
            out.push(selector);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;
    use crate::resolver::ExtractedValue;
    use crate::selector::{ExtractionMode, Multiplicity};

    const BLOG_HTML: &str = r#"
        <html><head>
            <meta property="article:published_time" content="2024-03-01T08:00:00Z">
        </head><body>
            <div class="popup">Subscribe now</div>
            <article>
                <h1 class="entry-title">Hello World</h1>
                <span class="author-name">Ann Lee</span>
                <div class="entry-content">
                    <p>First paragraph.</p>
                    <div class="td-g-rec">Ad</div>
                    <p>Second paragraph.</p>
                </div>
                <div class="tags-links"><a href="/t/a">alpha</a><a href="/t/b">beta</a></div>
            </article>
        </body></html>
    "#;

    #[test]
    fn test_presets_validate() {
        for name in PRESET_NAMES {
            let config = by_name(name, "example.com").unwrap();
            assert!(config.validate().is_ok(), "{name}");
            assert_eq!(config.domain, "example.com");
            assert!(config.cleanup.len() >= COMMON_CLEANUP_SELECTORS.len());
        }
        assert!(by_name("WP", "a.com").is_some());
        assert!(by_name("drupal", "a.com").is_none());
    }

    #[test]
    fn test_generic_shape() {
        let config = generic("a.com");

        let content = config.field(Field::Content).unwrap();
        assert_eq!(content.extraction_mode, ExtractionMode::Html);
        assert_eq!(content.selectors.last().map(|q| q.query.as_str()), Some("main"));
        assert_eq!(config.field(Field::Authors).unwrap().multiplicity, Multiplicity::All);
        assert_eq!(config.field(Field::Tags).unwrap().multiplicity, Multiplicity::All);
        assert!(config.field(Field::Topics).is_none());
    }

    #[test]
    fn test_wordpress_prepends_theme_selectors() {
        let config = wordpress("a.com");

        let title = config.field(Field::Title).unwrap();
        assert_eq!(title.selectors[0].query, ".tdb-title-text");
        let count = title.selectors.iter().filter(|q| q.query == ".tdb-title-text").count();
        assert_eq!(count, 1);
        assert!(config.cleanup.iter().any(|q| q == ".ez-toc-container"));
    }

    #[test]
    fn test_generic_extracts_blog_post() {
        let config = generic("blog.example.com");
        let doc = parse_document(BLOG_HTML, &config, None).unwrap();

        assert_eq!(doc.get(Field::Title), Some(&ExtractedValue::Single("Hello World".into())));
        assert_eq!(doc.get(Field::Authors), Some(&ExtractedValue::Many(vec!["Ann Lee".into()])));
        assert_eq!(
            doc.get(Field::DatePublished),
            Some(&ExtractedValue::Single("2024-03-01T08:00:00Z".into()))
        );

        let content = doc.get(Field::Content).and_then(ExtractedValue::first).unwrap();
        assert!(content.starts_with("<article>"));
        assert!(!content.contains("Subscribe"));
    }

    #[test]
    fn test_wordpress_extracts_blog_post() {
        let config = wordpress("blog.example.com");
        let doc = parse_document(BLOG_HTML, &config, None).unwrap();

        let content = doc.get(Field::Content).and_then(ExtractedValue::first).unwrap();
        assert!(content.contains("Second paragraph."));
        assert!(!content.contains("Ad"));
        assert_eq!(
            doc.get(Field::Tags),
            Some(&ExtractedValue::Many(vec!["alpha".into(), "beta".into()]))
        );
    }
}
