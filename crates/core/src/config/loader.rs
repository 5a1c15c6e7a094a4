use crate::config::DomainConfig;
use crate::error::{ExcerptaError, Result};
use crate::presets;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Loads [`DomainConfig`] files from a directory store.
///
/// Two layouts are recognized in every directory:
///
/// ```text
/// <dir>/example.com.json
/// <dir>/<lang>/e/example.com.json
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Custom config directory path
    custom_dir: Option<PathBuf>,
    /// Standard config directory path
    standard_dir: Option<PathBuf>,
    /// Language shard searched in the sharded layout
    lang: String,
    /// Loaded configs keyed by requested domain
    cache: HashMap<String, DomainConfig>,
}

impl ConfigLoader {
    /// Create a loader without any directories
    pub fn new() -> Self {
        Self { custom_dir: None, standard_dir: None, lang: "en".to_string(), cache: HashMap::new() }
    }

    /// Load the config for a URL's host
    pub fn load_for_url(&mut self, url: &str) -> Result<Option<DomainConfig>> {
        let domain = self.extract_domain(url)?;
        self.load_for_domain(&domain)
    }

    /// Load the config for a domain.
    ///
    /// Returns `Ok(None)` when no candidate file exists or every candidate
    /// failed to parse.
    pub fn load_for_domain(&mut self, domain: &str) -> Result<Option<DomainConfig>> {
        let domain = domain.trim().trim_end_matches('.').to_lowercase();
        if let Some(config) = self.cache.get(&domain) {
            return Ok(Some(config.clone()));
        }

        for file_path in self.find_config_files(&domain) {
            match DomainConfig::from_file(&file_path) {
                Ok(config) => {
                    tracing::debug!(%domain, path = %file_path.display(), "loaded domain config");
                    self.cache.insert(domain, config.clone());
                    return Ok(Some(config));
                }
                Err(e) => tracing::warn!(path = %file_path.display(), error = %e, "failed to parse domain config"),
            }
        }

        tracing::debug!(%domain, "no domain config found");
        Ok(None)
    }

    /// Load the config for a domain, falling back to the generic preset
    /// bound to that domain when no file exists.
    ///
    /// The fallback is not cached, so a config file added later is picked up.
    pub fn load_or_generic(&mut self, domain: &str) -> Result<DomainConfig> {
        match self.load_for_domain(domain)? {
            Some(config) => Ok(config),
            None => {
                let domain = domain.trim().trim_end_matches('.').to_lowercase();
                tracing::info!(%domain, "no domain config found, using the generic preset");
                Ok(presets::generic(domain))
            }
        }
    }

    /// Load the config for a URL's host, falling back to the generic preset
    pub fn load_or_generic_for_url(&mut self, url: &str) -> Result<DomainConfig> {
        let domain = self.extract_domain(url)?;
        self.load_or_generic(&domain)
    }

    /// Find all existing config files for a domain in priority order
    fn find_config_files(&self, domain: &str) -> Vec<PathBuf> {
        let mut config_files = Vec::new();
        let config_names = self.generate_config_names(domain);

        for dir in [&self.custom_dir, &self.standard_dir].into_iter().flatten() {
            for name in &config_names {
                for file_path in self.candidate_paths(dir, name) {
                    if file_path.is_file() && !config_files.contains(&file_path) {
                        config_files.push(file_path);
                    }
                }
            }
        }

        config_files
    }

    /// Flat and sharded locations of one config name
    fn candidate_paths(&self, dir: &Path, name: &str) -> Vec<PathBuf> {
        let file_name = format!("{}.json", name);
        let mut paths = vec![dir.join(&file_name)];
        if let Some(shard) = name.chars().next() {
            paths.push(dir.join(&self.lang).join(shard.to_string()).join(&file_name));
        }
        paths
    }

    /// Generate candidate config names for a domain, most specific first
    fn generate_config_names(&self, domain: &str) -> Vec<String> {
        let mut names = vec![domain.to_string()];

        let base = domain.strip_prefix("www.").unwrap_or(domain);
        if base != domain {
            names.push(base.to_string());
        }

        let parts: Vec<&str> = base.split('.').collect();
        for i in 1..parts.len().saturating_sub(1) {
            let parent = parts[i..].join(".");
            if !names.contains(&parent) {
                names.push(parent);
            }
        }

        names
    }

    /// Extract the host from a URL
    fn extract_domain(&self, url: &str) -> Result<String> {
        let url = url::Url::parse(url).map_err(|e| ExcerptaError::InvalidUrl(e.to_string()))?;

        let domain = url
            .host_str()
            .ok_or_else(|| ExcerptaError::InvalidUrl("No domain found in URL".to_string()))?;

        Ok(domain.to_string())
    }

    /// Clear the config cache
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

/// Builder for ConfigLoader
#[derive(Debug)]
pub struct ConfigLoaderBuilder {
    custom_dir: Option<PathBuf>,
    standard_dir: Option<PathBuf>,
    lang: String,
}

impl ConfigLoaderBuilder {
    pub fn new() -> Self {
        Self { custom_dir: None, standard_dir: None, lang: "en".to_string() }
    }

    /// Set custom config directory, searched first
    pub fn custom_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.custom_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set standard config directory
    pub fn standard_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.standard_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the language shard of the sharded layout
    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn build(self) -> ConfigLoader {
        ConfigLoader {
            custom_dir: self.custom_dir,
            standard_dir: self.standard_dir,
            lang: self.lang,
            cache: HashMap::new(),
        }
    }
}

impl Default for ConfigLoaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        let mut builder = ConfigLoaderBuilder::new();

        if let Some(custom_dir) = Self::default_custom_dir() {
            builder = builder.custom_dir(custom_dir);
        }

        if let Some(standard_dir) = Self::default_standard_dir() {
            builder = builder.standard_dir(standard_dir);
        }

        builder.build()
    }
}

impl ConfigLoader {
    /// Default custom config directory (~/.config/excerpta/domains)
    pub fn default_custom_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("excerpta").join("domains"))
    }

    /// Default standard config directory (`domains/` next to the working directory)
    fn default_standard_dir() -> Option<PathBuf> {
        let std_dir = PathBuf::from("domains");
        if std_dir.is_dir() { Some(std_dir) } else { None }
    }
}
