//! Configuration management (lexqa.toml).
//!
//! Every section is `#[serde(default)]`, so an empty or partial file is valid
//! and missing keys take the defaults below.
//!
//! ```toml
//! corpus = "real_eu_laws.json"
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//!
//! [retrieval]
//! top_k = 3
//! batch_size = 32
//! encode_timeout_ms = 5000
//!
//! [embedder]
//! kind = "hash"
//! dimension = 384
//! model = "all-MiniLM-L6-v2"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Remediation;
use crate::logging::LogConfig;
use crate::search::{Embedder, HashEmbedder, TimeoutEmbedder};

/// File name searched for in the working directory and the config dir.
pub const CONFIG_FILE_NAME: &str = "lexqa.toml";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown log format: {s}. Expected pretty or json")),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    ParseFailed { path: PathBuf, message: String },

    #[error("invalid config value {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("embedder '{0}' is not available in this build")]
    EmbedderUnavailable(String),

    #[error("no corpus configured")]
    NoCorpus,
}

impl ConfigError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::ReadFailed { path, .. } => {
                Remediation::new(format!("Check that {} is readable.", path.display()))
            }
            Self::ParseFailed { .. } => Remediation::new("Fix the TOML syntax in lexqa.toml.")
                .alternative("Delete the file to fall back to defaults."),
            Self::Invalid { key, .. } => {
                Remediation::new(format!("Set {key} to a positive value in lexqa.toml."))
            }
            Self::EmbedderUnavailable(_) => Remediation::new(
                "Rebuild with the semantic-search feature or use the hash embedder.",
            )
            .command("Rebuild", "cargo install --path crates/lexqa --features semantic-search")
            .alternative("Set embedder.kind = \"hash\" in lexqa.toml."),
            Self::NoCorpus => Remediation::new("Point lexqa at a corpus JSON file.")
                .command("Ask", "lexqa --corpus laws.json ask \"...\"")
                .alternative("Set corpus = \"laws.json\" in lexqa.toml."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Deterministic feature hashing; needs no model files.
    #[default]
    Hash,
    /// Sentence embeddings through fastembed (feature `semantic-search`).
    Fastembed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub kind: EmbedderKind,
    /// Output width of the hash embedder. Model embedders report their own.
    pub dimension: usize,
    pub model: String,
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::Hash,
            dimension: 384,
            model: "all-MiniLM-L6-v2".to_string(),
            cache_dir: None,
        }
    }
}

impl EmbedderConfig {
    /// Construct the configured provider.
    pub fn build(&self) -> crate::Result<Arc<dyn Embedder>> {
        match self.kind {
            EmbedderKind::Hash => Ok(Arc::new(HashEmbedder::new(self.dimension))),
            #[cfg(feature = "semantic-search")]
            EmbedderKind::Fastembed => Ok(Arc::new(crate::search::FastEmbedEmbedder::new(
                &self.model,
                self.cache_dir.clone(),
            )?)),
            #[cfg(not(feature = "semantic-search"))]
            EmbedderKind::Fastembed => {
                Err(ConfigError::EmbedderUnavailable(format!("fastembed/{}", self.model)).into())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Results per query when the caller does not say.
    pub top_k: usize,
    /// Passages per provider call during the startup encode.
    pub batch_size: usize,
    /// Per-call encode budget; unset means wait indefinitely.
    pub encode_timeout_ms: Option<u64>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            batch_size: 32,
            encode_timeout_ms: None,
        }
    }
}

impl RetrievalConfig {
    pub fn encode_timeout(&self) -> Option<Duration> {
        self.encode_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub corpus: Option<PathBuf>,
    pub logging: LogConfig,
    pub retrieval: RetrievalConfig,
    pub embedder: EmbedderConfig,
}

impl Config {
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::ParseFailed {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or from the first discovered config file, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = resolve_config_path(path) else {
            tracing::debug!("No lexqa.toml found; using defaults");
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadFailed {
            path: path.clone(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text, &path)?;
        if let Some(base) = path.parent() {
            config.anchor_paths(base);
        }
        tracing::debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Resolve relative file paths against `base`, the config file's directory.
    pub fn anchor_paths(&mut self, base: &Path) {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(corpus) = self.corpus.as_mut() {
            anchor(corpus);
        }
        if let Some(file) = self.logging.file.as_mut() {
            anchor(file);
        }
        if let Some(dir) = self.embedder.cache_dir.as_mut() {
            anchor(dir);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid {
                key: "retrieval.top_k",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.retrieval.batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "retrieval.batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.embedder.dimension == 0 {
            return Err(ConfigError::Invalid {
                key: "embedder.dimension",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.retrieval.encode_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid {
                key: "retrieval.encode_timeout_ms",
                reason: "must be positive when set".to_string(),
            });
        }
        Ok(())
    }

    /// The configured provider, wrapped in a timeout when one is set.
    pub fn embedder(&self) -> crate::Result<Arc<dyn Embedder>> {
        let base = self.embedder.build()?;
        let embedder: Arc<dyn Embedder> = match self.retrieval.encode_timeout() {
            Some(budget) => Arc::new(TimeoutEmbedder::new(base, budget)),
            None => base,
        };
        Ok(embedder)
    }

    pub fn corpus_path(&self) -> Result<&Path, ConfigError> {
        self.corpus.as_deref().ok_or(ConfigError::NoCorpus)
    }
}

/// Explicit path if given, else `./lexqa.toml`, else `<config dir>/lexqa/lexqa.toml`.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("lexqa").join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}
