pub mod article;
pub mod chunking;
pub mod config;
pub mod convert;
pub mod error;
pub mod formatters;
pub mod metadata;
pub mod parse;
pub mod parser;
pub mod presets;
pub mod query;
pub mod resolver;
pub mod selector;
pub mod text;

pub use article::{Article, OutputFormat};
pub use chunking::{ArticleChunk, ChunkBudget, RagDocument, RagMetadata};
pub use config::{ConfigLoader, ConfigLoaderBuilder, DomainConfig, Field};
pub use convert::to_markdown;
pub use error::{ExcerptaError, Result};
pub use formatters::{JsonConfig, JsonFormatter, MarkdownConfig, MarkdownFormatter, TextConfig, TextFormatter};
pub use formatters::{convert_to_json, convert_to_markdown, convert_to_text, document_to_json, metadata_to_json};
pub use metadata::{ResponseMeta, extract_meta};
pub use parse::{Document, Element};
pub use parser::{DocumentParser, ExtractedDocument, parse_document};
pub use presets::COMMON_CLEANUP_SELECTORS;
pub use resolver::{ElementResolver, ExtractedValue, resolve};
pub use selector::{ExtractionMode, FieldSpec, Multiplicity, QueryLanguage, QuerySpec, SelectorType};
