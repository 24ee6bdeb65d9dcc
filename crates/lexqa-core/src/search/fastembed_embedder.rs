//! FastEmbed embedder: sentence embeddings via ONNX Runtime.
//!
//! Requires the `semantic-search` feature.

use std::path::PathBuf;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use parking_lot::Mutex;

use super::embedder::{EmbedError, Embedder, EmbedderInfo, EmbedderTier, check_batch};

/// Models this crate knows how to load, with their output width.
const KNOWN_MODELS: &[(&str, usize)] = &[
    ("all-MiniLM-L6-v2", 384),
    ("all-MiniLM-L12-v2", 384),
    ("bge-small-en-v1.5", 384),
    ("bge-base-en-v1.5", 768),
];

fn resolve(model_name: &str) -> Option<(EmbeddingModel, usize)> {
    let dimension = KNOWN_MODELS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(model_name))
        .map(|(_, dim)| *dim)?;
    let model = match model_name.to_ascii_lowercase().as_str() {
        "all-minilm-l6-v2" => EmbeddingModel::AllMiniLML6V2,
        "all-minilm-l12-v2" => EmbeddingModel::AllMiniLML12V2,
        "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        _ => return None,
    };
    Some((model, dimension))
}

/// FastEmbed-based embedder for quality sentence embeddings.
pub struct FastEmbedEmbedder {
    model_name: String,
    dimension: usize,
    model: Mutex<TextEmbedding>,
}

impl FastEmbedEmbedder {
    /// Load `model_name`, downloading into `cache_dir` on first use.
    pub fn new(model_name: &str, cache_dir: Option<PathBuf>) -> Result<Self, EmbedError> {
        let (model, dimension) =
            resolve(model_name).ok_or_else(|| EmbedError::ModelNotFound(model_name.to_string()))?;

        let mut options = InitOptions::new(model).with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }

        tracing::info!(model = model_name, dimension, "Loading sentence embedding model");
        let model = TextEmbedding::try_new(options)
            .map_err(|e| EmbedError::ModelNotFound(format!("{model_name}: {e}")))?;

        Ok(Self {
            model_name: model_name.to_string(),
            dimension,
            model: Mutex::new(model),
        })
    }
}

impl Embedder for FastEmbedEmbedder {
    fn info(&self) -> EmbedderInfo {
        EmbedderInfo {
            name: format!("fastembed-{}", self.model_name),
            dimension: self.dimension,
            tier: EmbedderTier::Quality,
        }
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| EmbedError::InferenceFailed("model returned no vector".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        let vectors = self
            .model
            .lock()
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbedError::InferenceFailed(e.to_string()))?;
        check_batch(texts.len(), self.dimension, &vectors)?;
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_models() {
        let (_, dim) = resolve("all-MiniLM-L6-v2").unwrap();
        assert_eq!(dim, 384);
        let (_, dim) = resolve("BGE-BASE-EN-V1.5").unwrap();
        assert_eq!(dim, 768);
    }

    #[test]
    fn unknown_model_is_reported() {
        assert!(resolve("word2vec").is_none());
        let err = FastEmbedEmbedder::new("word2vec", None).err().unwrap();
        assert!(matches!(err, EmbedError::ModelNotFound(_)));
    }
}
