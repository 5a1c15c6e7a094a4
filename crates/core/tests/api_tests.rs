//! Library API integration tests
use excerpta_core::*;

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

fn get_site_fixture_path(site: &str, name: &str) -> String {
    format!("../../tests/fixtures/sites/{}/{}", site, name)
}

const NEWS_URL: &str = "https://news.example.com/environment/rivers-return";

fn news_html() -> String {
    std::fs::read_to_string(get_site_fixture_path("news", "article.html")).unwrap()
}

fn news_config() -> DomainConfig {
    DomainConfig::from_file(get_fixture_path("domains/news.example.com.json")).unwrap()
}

#[test]
fn test_end_to_end_scenario() {
    let html = r#"<h1 class="post-title">T</h1><div class="byline"><a href="/u">U</a></div><div class="content"><p>Body.</p></div>"#;
    let config = DomainConfig::from_json(
        r#"{
            "domain": "example.com",
            "title": {"selector": "h1.post-title"},
            "authors": {"selector": [{"query": "a", "parent": ".byline"}], "all": true},
            "content": {"selector": ".content", "type": "html"}
        }"#,
    )
    .unwrap();

    let doc = parse_document(html, &config, None).unwrap();

    assert_eq!(doc.get(Field::Title), Some(&ExtractedValue::Single("T".to_string())));
    assert_eq!(doc.get(Field::Authors), Some(&ExtractedValue::Many(vec!["U".to_string()])));
    assert_eq!(doc.content(), Some(r#"<div class="content"><p>Body.</p></div>"#));
    assert_eq!(doc.len(), 3);
    assert_eq!(to_markdown(doc.content().unwrap()), "Body.");
}

#[test]
fn test_parse_news_fixture() {
    let config = news_config();
    let doc = parse_document(&news_html(), &config, Some(NEWS_URL)).unwrap();

    assert_eq!(doc.text(Field::Title), Some("Rivers Return to the Valley"));
    assert_eq!(doc.text(Field::Description), Some("Snowmelt and spring rain have refilled the old channels."));
    assert_eq!(doc.list(Field::Authors), vec!["Mara Lind", "Tomas Reed"]);
    assert_eq!(doc.text(Field::DatePublished), Some("2024-03-02T08:30:00Z"));
    assert_eq!(doc.list(Field::Tags), vec!["rivers", "climate"]);
    assert_eq!(doc.list(Field::MainPoints), vec!["Rivers are flowing after a decade", "Snowpack hit a record high"]);
    assert_eq!(
        doc.list(Field::FollowUrls),
        vec!["https://news.example.com/environment/drought-ends"]
    );
    assert!(!doc.contains(Field::DateModified));

    let content = doc.content().unwrap();
    assert!(content.starts_with(r#"<div class="story-body">"#));
    assert!(content.contains("Alder Creek"));
    assert!(!content.contains("Subscribe"), "global cleanup removes ads");
    assert!(!content.contains("drought-ends"), "field cleanup removes related links");
}

#[test]
fn test_field_cleanup_does_not_leak() {
    let config = news_config();
    let doc = DocumentParser::new(&config).parse(&news_html());

    assert!(!doc.content().unwrap().contains("related"));
    assert_eq!(doc.list(Field::FollowUrls), vec!["/environment/drought-ends"]);
}

#[test]
fn test_extract_meta_news_fixture() {
    let meta = extract_meta(&news_html());

    assert_eq!(meta.title.as_deref(), Some("Rivers Return to the Valley"));
    assert_eq!(
        meta.description.as_deref(),
        Some("After a decade of drought, the valley's rivers are flowing again.")
    );
    assert_eq!(meta.authors, vec!["Mara Lind", "Tomas Reed"]);
    assert_eq!(meta.date_published.as_deref(), Some("2024-03-02T08:30:00Z"));
    assert_eq!(meta.date_modified.as_deref(), Some("2024-03-03T12:00:00Z"));
    assert_eq!(meta.tags, vec!["rivers", "drought", "valley"]);
    assert_eq!(meta.topics, vec!["Environment"]);
    assert_eq!(meta.canonical.as_deref(), Some(NEWS_URL));
    assert_eq!(meta.site_name.as_deref(), Some("Daily Ledger"));
    assert_eq!(meta.language.as_deref(), Some("en"));
    assert_eq!(meta.twitter_card.as_deref(), Some("summary_large_image"));
}

#[test]
fn test_article_assembly() {
    let html = news_html();
    let config = news_config();
    let doc = parse_document(&html, &config, Some(NEWS_URL)).unwrap();
    let meta = extract_meta(&html);

    let article = Article::assemble(&doc, &meta, &config, Some(NEWS_URL)).unwrap();

    assert_eq!(article.domain, "news.example.com");
    assert_eq!(article.title.as_deref(), Some("Rivers Return to the Valley"));
    assert_eq!(article.tags, vec!["rivers", "climate"]);
    assert_eq!(article.date_modified.as_deref(), Some("2024-03-03T12:00:00Z"));
    assert_eq!(article.topics, vec!["Environment"]);
    assert!(article.word_count > 30);
    assert!(article.reading_time > 0.0);
    assert_eq!(article.id.len(), 64);

    let markdown = &article.content;
    assert!(markdown.contains("**Alder Creek**"));
    assert!(markdown.contains("## What changed"));
    assert!(markdown.contains("- Record snowpack in the northern range"));
    assert!(markdown.contains("> We never thought we would see it again."));
    assert!(markdown.contains("[full hydrology report](https://news.example.com/reports/hydrology)"));
    assert!(!markdown.contains("trackView"));
    assert!(!markdown.contains("creek.jpg"), "relative images are not rendered");
}

#[test]
fn test_article_output_formats() {
    let html = news_html();
    let config = news_config();
    let doc = parse_document(&html, &config, Some(NEWS_URL)).unwrap();
    let article = Article::assemble(&doc, &extract_meta(&html), &config, Some(NEWS_URL)).unwrap();

    let md = article
        .to_markdown_with_config(&MarkdownConfig {
            include_frontmatter: true,
            base_url: Some(url::Url::parse(NEWS_URL).unwrap()),
            ..Default::default()
        })
        .unwrap();
    assert!(md.starts_with("+++\ntitle = \"Rivers Return to the Valley\""));
    assert!(md.contains("![Alder Creek in March](https://news.example.com/img/creek.jpg)"));

    let json = article.to_json().unwrap();
    assert_eq!(json["authors"], serde_json::json!(["Mara Lind", "Tomas Reed"]));
    assert_eq!(json["url"], NEWS_URL);

    let text = article.to_format(OutputFormat::PlainText).unwrap();
    assert!(text.contains("What changed\n\nRecord snowpack in the northern range"));
    assert!(!text.contains("**"));

    let html_out = article.to_format(OutputFormat::Html).unwrap();
    assert!(html_out.starts_with("<div class=\"story-body\">"));
}

#[test]
fn test_empty_content_is_no_content() {
    let html = std::fs::read_to_string(get_fixture_path("empty_content.html")).unwrap();
    let config = news_config();
    let doc = parse_document(&html, &config, None).unwrap();

    let result = Article::assemble(&doc, &extract_meta(&html), &config, None);
    assert!(matches!(result, Err(ExcerptaError::NoContent)));
}

#[test]
fn test_config_loader_finds_fixture() {
    let mut loader = ConfigLoaderBuilder::new().custom_dir(get_fixture_path("domains")).build();

    let config = loader.load_for_url(NEWS_URL).unwrap().expect("config for news.example.com");
    assert_eq!(config.domain, "news.example.com");

    let from_subdomain = loader.load_for_domain("www.news.example.com").unwrap();
    assert_eq!(from_subdomain.map(|c| c.domain), Some("news.example.com".to_string()));

    assert!(loader.load_for_domain("unknown.org").unwrap().is_none());
}

#[test]
fn test_invalid_config_fails_at_load() {
    let missing_content = DomainConfig::from_json(r#"{"domain": "example.com", "title": {"selector": "h1"}}"#);
    assert!(matches!(missing_content, Err(ExcerptaError::MissingContent { .. })));

    let bad_attribute =
        DomainConfig::from_json(r#"{"domain": "example.com", "content": {"selector": "a", "type": "attribute"}}"#);
    assert!(matches!(bad_attribute, Err(ExcerptaError::ConfigError(_))));
}

#[test]
fn test_resolve_single_field() {
    let document = Document::parse(&news_html());
    let spec = FieldSpec::new([QuerySpec::new("//nav/a").with_attribute("href")]).attribute("href").all();

    let value = resolve(&document, &spec).unwrap();
    assert_eq!(value, ExtractedValue::Many(vec!["/".to_string(), "/environment".to_string()]));
}

#[test]
fn test_deeply_nested_page() {
    let depth = 10_000;
    let html = format!(
        r#"<html><body><h1>Deep</h1><article>{}<p class="x">inner <b>text</b><span class="ad">ad</span></p>{}</article></body></html>"#,
        "<div>".repeat(depth),
        "</div>".repeat(depth)
    );
    let config = DomainConfig::from_json(
        r#"{
            "domain": "example.com",
            "title": {"selector": "//h1"},
            "main_points": {"selector": "p.x", "all": true, "cleanup": [".ad"]},
            "content": {"selector": "//article", "type": "html", "cleanup": ["span"]}
        }"#,
    )
    .unwrap();

    let doc = parse_document(&html, &config, None).unwrap();
    assert_eq!(doc.text(Field::Title), Some("Deep"));
    assert_eq!(doc.list(Field::MainPoints), vec!["inner text"]);

    let article = Article::assemble(&doc, &extract_meta(&html), &config, None).unwrap();
    assert_eq!(article.content, "inner text");
    assert_eq!(article.chunks(ChunkBudget::DEFAULT_TOKENS).unwrap().len(), 1);
}

#[test]
fn test_generic_preset_on_news_fixture() {
    let config = presets::generic("news.example.com");
    let doc = parse_document(&news_html(), &config, Some(NEWS_URL)).unwrap();

    assert_eq!(doc.text(Field::Title), Some("Rivers Return to the Valley"));
    assert_eq!(doc.list(Field::Authors), vec!["Mara Lind", "Tomas Reed"]);
    assert_eq!(doc.text(Field::DatePublished), Some("2024-03-02T08:30:00Z"));
    assert_eq!(doc.list(Field::Tags), vec!["rivers", "climate"]);

    let content = doc.content().unwrap();
    assert!(content.contains("Alder Creek"));
    assert!(!content.contains("drought-ends"), "preset cleanup removes related links");
}

#[test]
fn test_news_rag_documents() {
    let config = news_config();
    let doc = parse_document(&news_html(), &config, Some(NEWS_URL)).unwrap();
    let article = Article::assemble(&doc, &extract_meta(&news_html()), &config, Some(NEWS_URL)).unwrap();

    let documents = article.to_rag_documents(ChunkBudget::Chars { max: 120, overlap: 20 }).unwrap();
    assert!(documents.len() > 1);
    for (index, document) in documents.iter().enumerate() {
        assert_eq!(document.id, format!("{}-chunk-{}", article.id, index));
        assert_eq!(document.meta.source_url.as_deref(), Some(NEWS_URL));
        assert!(document.text.chars().count() <= 120);
    }
}
