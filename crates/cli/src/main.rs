use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::Parser;
use excerpta_core::{
    Article, ConfigLoader, ConfigLoaderBuilder, DocumentParser, DomainConfig, JsonConfig, MarkdownConfig, OutputFormat,
    TextConfig, convert_to_json, convert_to_markdown, convert_to_text, document_to_json, extract_meta,
    metadata_to_json, presets,
};
use owo_colors::OwoColorize;
use url::Url;

mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What to write to the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Markdown,
    Html,
    Text,
    Json,
    /// Raw field values from the domain config
    Fields,
    /// Page metadata only; no domain config needed
    Meta,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "html" => Ok(Self::Html),
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "fields" => Ok(Self::Fields),
            "meta" | "metadata" => Ok(Self::Meta),
            _ => Err(format!(
                "Invalid format: {}. Valid options: markdown, html, text, json, fields, meta",
                s
            )),
        }
    }
}

/// Extract structured articles from HTML using per-domain selector configs
#[derive(Parser, Debug)]
#[command(name = "excerpta")]
#[command(version)]
#[command(about = "Extract structured articles from HTML using per-domain selector configs", long_about = None)]
struct Args {
    /// Local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Domain config file
    #[arg(short, long, value_name = "FILE", conflicts_with = "config_dir")]
    config: Option<PathBuf>,

    /// Directory searched for <domain>.json configs
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Page URL; resolves relative links and selects the domain config
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Domain used for config lookup when no URL is given
    #[arg(long, value_name = "DOMAIN")]
    domain: Option<String>,

    /// Use a built-in config instead of a lookup (generic, wordpress)
    #[arg(long, value_name = "NAME", conflicts_with_all = ["config", "config_dir"])]
    preset: Option<String>,

    /// Fail when lookup finds no config instead of using the generic preset
    #[arg(long, conflicts_with = "preset")]
    strict: bool,

    /// Output format (markdown, html, text, json, fields, meta)
    #[arg(short, long, default_value = "markdown", value_name = "FORMAT")]
    format: Format,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Include TOML frontmatter (Markdown) or a title header (text)
    #[arg(long)]
    frontmatter: bool,

    /// Include a reference table with all links (Markdown/JSON only)
    #[arg(long)]
    references: bool,

    /// Strip images from output
    #[arg(long)]
    no_images: bool,

    /// Pretty print JSON output
    #[arg(long)]
    pretty: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "excerpta_core=debug" } else { "warn" }));

    fmt().with_env_filter(filter).with_target(false).with_writer(io::stderr).init();
}

fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).context("Failed to read from stdin")?;
        Ok(buffer)
    } else {
        fs::read_to_string(input).with_context(|| format!("Failed to read file: {}", input))
    }
}

fn load_config(args: &Args, base_url: Option<&Url>) -> anyhow::Result<DomainConfig> {
    if let Some(path) = &args.config {
        return DomainConfig::from_file(path).with_context(|| format!("Failed to load config: {}", path.display()));
    }

    let domain = match (&args.domain, base_url.and_then(Url::host_str)) {
        (Some(domain), _) => domain.clone(),
        (None, Some(host)) => host.to_string(),
        (None, None) => bail!("A domain config is required: pass --config, or --url/--domain for lookup"),
    };

    if let Some(name) = &args.preset {
        return presets::by_name(name, domain.as_str()).with_context(|| {
            format!("Unknown preset: {}. Valid options: {}", name, presets::PRESET_NAMES.join(", "))
        });
    }

    let mut loader = match &args.config_dir {
        Some(dir) => ConfigLoaderBuilder::new().custom_dir(dir).build(),
        None => ConfigLoader::default(),
    };

    let found = loader
        .load_for_domain(&domain)
        .with_context(|| format!("Failed to look up config for {}", domain))?;

    match found {
        Some(config) => Ok(config),
        None if args.strict => bail!("No config found for domain: {}", domain),
        None => {
            echo::print_warning(&format!("No config found for domain: {}, using the generic preset", domain));
            Ok(presets::generic(domain))
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let started = Instant::now();
    let mut timings: Vec<(&str, Duration)> = Vec::new();

    if args.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
    }

    let base_url = args
        .url
        .as_deref()
        .map(Url::parse)
        .transpose()
        .context("Invalid --url")?;

    if args.verbose {
        let source = if args.input == "-" { "stdin".to_string() } else { args.input.clone() };
        echo::print_step(1, 4, &format!("Reading from {}", source.bright_white()));
    }
    let step = Instant::now();
    let html = read_input(&args.input)?;
    timings.push(("Read", step.elapsed()));

    if args.verbose {
        echo::print_detail("Size", &echo::format_size(html.len()));
        eprintln!();
    }

    if args.format == Format::Meta {
        let output = metadata_to_json(&extract_meta(&html), args.pretty).context("Failed to serialize metadata")?;
        return write_output(&args, output);
    }

    if args.verbose {
        echo::print_step(2, 4, "Loading domain config");
    }
    let config = load_config(&args, base_url.as_ref())?;
    if args.verbose {
        echo::print_detail("Domain", &config.domain);
        eprintln!();
    }

    if args.verbose {
        echo::print_step(3, 4, "Extracting fields");
    }
    let step = Instant::now();
    let mut parser = DocumentParser::new(&config);
    if let Some(url) = &base_url {
        parser = parser.with_base_url(url.clone());
    }
    let extracted = parser.parse(&html);
    timings.push(("Extract", step.elapsed()));

    if args.verbose {
        echo::print_field_report(&config, &extracted);
        eprintln!();
    }

    let output = if args.format == Format::Fields {
        document_to_json(&extracted, args.pretty).context("Failed to serialize fields")?
    } else {
        let step = Instant::now();
        let meta = extract_meta(&html);
        let article = Article::assemble(&extracted, &meta, &config, args.url.as_deref())
            .with_context(|| format!("No article content extracted for {}", config.domain))?;
        let rendered = render(&args, &article, base_url)?;
        timings.push(("Render", step.elapsed()));
        rendered
    };

    if args.verbose {
        echo::print_step(4, 4, "Writing output");
        echo::print_detail("Format", &format!("{:?}", args.format));
        eprintln!();
        echo::print_timing_summary(started.elapsed(), &timings);
    }

    write_output(&args, output)
}

fn render(args: &Args, article: &Article, base_url: Option<Url>) -> anyhow::Result<String> {
    let output = match args.format {
        Format::Markdown => {
            let config = MarkdownConfig {
                include_frontmatter: args.frontmatter,
                include_references: args.references,
                strip_images: args.no_images,
                include_title_heading: false,
                base_url,
            };
            convert_to_markdown(article, &config).context("Failed to convert to Markdown")?
        }
        Format::Text => {
            let config = TextConfig { preserve_paragraphs: true, line_width: 0, include_header: args.frontmatter };
            convert_to_text(article, &config)?
        }
        Format::Json => {
            let config = JsonConfig {
                include_html: false,
                include_text: false,
                include_references: args.references,
                pretty: args.pretty,
            };
            convert_to_json(article, &config).context("Failed to serialize article")?
        }
        Format::Html => article.to_format(OutputFormat::Html)?,
        Format::Fields | Format::Meta => bail!("{:?} output is written without article assembly", args.format),
    };
    Ok(output)
}

fn write_output(args: &Args, output: String) -> anyhow::Result<()> {
    match &args.output {
        Some(path) => {
            fs::write(path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            echo::print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => println!("{}", output),
    }
    Ok(())
}
