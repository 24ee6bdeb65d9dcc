//! Error types for lexqa-core

use std::fmt::Write;
use thiserror::Error;

use crate::config::ConfigError;
use crate::corpus::CorpusError;
use crate::search::{EmbedError, IndexError};

/// Actionable remediation guidance for an error
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Remediation {
    /// One-line summary of how to fix the issue
    pub summary: String,
    /// Suggested commands to resolve or diagnose the issue
    pub commands: Vec<(String, String)>,
    /// Additional alternative guidance
    pub alternatives: Vec<String>,
}

impl Remediation {
    #[must_use]
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            commands: Vec::new(),
            alternatives: Vec::new(),
        }
    }

    #[must_use]
    pub fn command(mut self, label: impl Into<String>, command: impl Into<String>) -> Self {
        self.commands.push((label.into(), command.into()));
        self
    }

    #[must_use]
    pub fn alternative(mut self, alternative: impl Into<String>) -> Self {
        self.alternatives.push(alternative.into());
        self
    }

    /// Render remediation text for human-readable output
    #[must_use]
    pub fn render_plain(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "To fix:");
        let _ = writeln!(output, "  {}", self.summary);

        if !self.commands.is_empty() {
            let _ = writeln!(output, "  Commands:");
            for (label, command) in &self.commands {
                let _ = writeln!(output, "    - {label}: {command}");
            }
        }

        if !self.alternatives.is_empty() {
            let _ = writeln!(output, "  Alternatives:");
            for alt in &self.alternatives {
                let _ = writeln!(output, "    - {alt}");
            }
        }

        output
    }
}

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Query-path invariant breaches.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The index returned a position with no passage behind it. Indicates the
    /// index and the passage store were built from different inputs.
    #[error("index returned position {index} but only {passages} passages exist")]
    IndexOutOfRange { index: usize, passages: usize },
}

/// Main error type for lexqa-core
#[derive(Error, Debug)]
pub enum Error {
    /// Corpus loading/shape errors
    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    /// Embedding provider errors, including timeouts
    #[error("Encoding error: {0}")]
    Encoding(#[from] EmbedError),

    /// Vector index build/search errors
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Invariant breaches on the query path
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Return remediation guidance when available.
    #[must_use]
    pub fn remediation(&self) -> Option<Remediation> {
        match self {
            Self::Corpus(CorpusError::Malformed { line, column, .. }) => Some(
                Remediation::new(format!(
                    "Fix the corpus JSON near line {line}, column {column}."
                ))
                .command("Validate JSON", "python -m json.tool < laws.json")
                .alternative(
                    "Every law needs title, url and articles; every article needs article and paragraphs; every paragraph needs number and text.",
                ),
            ),
            Self::Corpus(CorpusError::Read { path, .. }) => Some(
                Remediation::new(format!("Check that {} exists and is readable.", path.display()))
                    .alternative("Pass the corpus explicitly with --corpus <path>."),
            ),
            Self::Encoding(err) if err.is_timeout() => Some(
                Remediation::new("The embedding provider did not answer in time. Try again.")
                    .alternative("Raise retrieval.encode_timeout_ms in lexqa.toml."),
            ),
            Self::Encoding(EmbedError::ModelNotFound(_)) => Some(
                Remediation::new("The embedding model could not be loaded.")
                    .alternative("Check embedder.model and embedder.cache_dir in lexqa.toml.")
                    .alternative("Use embedder.kind = \"hash\" to run without a model."),
            ),
            Self::Encoding(_) => Some(
                Remediation::new("The embedding provider failed. Retry the request.")
                    .command("Check setup", "lexqa stats"),
            ),
            Self::Index(IndexError::Empty) => Some(
                Remediation::new("The corpus has no paragraphs, so there is nothing to search.")
                    .command("Inspect passages", "lexqa passages"),
            ),
            Self::Index(IndexError::DimensionMismatch { .. }) => Some(
                Remediation::new(
                    "The query encoder and the index disagree on vector width. Rebuild with one embedder configuration.",
                )
                .command("Show embedder", "lexqa stats"),
            ),
            Self::Index(IndexError::NonFinite { .. }) => Some(Remediation::new(
                "The embedding provider produced NaN or infinite values; check the model.",
            )),
            Self::Index(IndexError::ZeroDimension) => Some(
                Remediation::new("The embedder reports zero-width vectors.")
                    .alternative("Set embedder.dimension to a positive value in lexqa.toml."),
            ),
            Self::Query(_) => Some(
                Remediation::new("Internal index/passage misalignment. Restart to rebuild the index.")
                    .alternative("Report this as a bug with the corpus that triggered it."),
            ),
            Self::Config(err) => Some(err.remediation()),
        }
    }
}

/// Format an error with its remediation guidance for terminal output.
#[must_use]
pub fn format_error_with_remediation(error: &Error) -> String {
    let mut output = format!("Error: {error}\n");
    if let Some(remediation) = error.remediation() {
        output.push('\n');
        output.push_str(&remediation.render_plain());
    }
    output
}
