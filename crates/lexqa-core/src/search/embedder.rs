//! Core embedding trait and types.
use std::fmt;

#[derive(Debug)]
pub enum EmbedError {
    /// `embed_batch` was called with zero texts.
    EmptyInput,
    ModelNotFound(String),
    TokenizationFailed(String),
    InferenceFailed(String),
    DimensionMismatch {
        expected: usize,
        actual: usize,
    },
    /// The provider did not answer within the configured budget.
    Timeout {
        elapsed_ms: u64,
    },
    Io(std::io::Error),
}

impl fmt::Display for EmbedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "cannot encode an empty batch"),
            Self::ModelNotFound(p) => write!(f, "model not found: {p}"),
            Self::TokenizationFailed(e) => write!(f, "tokenization failed: {e}"),
            Self::InferenceFailed(e) => write!(f, "inference failed: {e}"),
            Self::DimensionMismatch { expected, actual } => {
                write!(f, "dimension mismatch: expected {expected}, got {actual}")
            }
            Self::Timeout { elapsed_ms } => {
                write!(f, "encoding timed out after {elapsed_ms} ms")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for EmbedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EmbedError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl EmbedError {
    /// Timeouts are transient; the same request may succeed on retry.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbedderTier {
    Hash,
    Quality,
}

impl fmt::Display for EmbedderTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hash => write!(f, "hash"),
            Self::Quality => write!(f, "quality"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbedderInfo {
    pub name: String,
    pub dimension: usize,
    pub tier: EmbedderTier,
}

/// Maps text to fixed-dimension dense vectors.
///
/// `embed_batch` must preserve length and order, and every vector an instance
/// produces has exactly `dimension()` components.
pub trait Embedder: Send + Sync {
    fn info(&self) -> EmbedderInfo;
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        texts.iter().map(|t| self.embed(t)).collect()
    }
    fn dimension(&self) -> usize {
        self.info().dimension
    }
    fn tier(&self) -> EmbedderTier {
        self.info().tier
    }
}

impl<E: Embedder + ?Sized> Embedder for std::sync::Arc<E> {
    fn info(&self) -> EmbedderInfo {
        (**self).info()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        (**self).embed_batch(texts)
    }
}

/// Checks that a provider kept its length and dimension contract for a batch.
pub(crate) fn check_batch(
    expected_len: usize,
    dimension: usize,
    vectors: &[Vec<f32>],
) -> Result<(), EmbedError> {
    if vectors.len() != expected_len {
        return Err(EmbedError::InferenceFailed(format!(
            "provider returned {} vectors for {expected_len} texts",
            vectors.len()
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(EmbedError::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        });
    }
    Ok(())
}
