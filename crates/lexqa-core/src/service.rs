//! Query pipeline: the built knowledge base plus the provider that encodes
//! queries against it.
//!
//! [`KnowledgeBase::build`] encodes every passage and builds the index in one
//! pass, so passage `i` and index row `i` always come from the same input.
//! [`RetrievalService`] owns that bundle together with the embedder and is
//! immutable once constructed; share it with `Arc`. [`ServiceHandle`] adds
//! whole-service replacement for callers that reload the corpus.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::{Config, RetrievalConfig};
use crate::corpus::{Corpus, FlattenedCorpus, Passage, flatten};
use crate::error::{Error, QueryError, Result};
use crate::search::{Embedder, EmbedderInfo, FlatIndex, IndexError, Neighbor, check_batch};

/// One ranked result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub reference: String,
    pub url: String,
    /// Euclidean distance between query and passage embeddings.
    pub distance: f32,
}

/// Passages and their index, aligned by position.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    passages: Vec<Passage>,
    index: FlatIndex,
}

impl KnowledgeBase {
    /// Encode `flat.passages` in batches of `batch_size` and index them.
    ///
    /// Fails with [`IndexError::Empty`] for a corpus with no paragraphs; the
    /// provider is never called in that case.
    pub fn build(flat: FlattenedCorpus, embedder: &dyn Embedder, batch_size: usize) -> Result<Self> {
        if flat.is_empty() {
            return Err(IndexError::Empty.into());
        }

        let dimension = embedder.dimension();
        let total = flat.len();
        let started = Instant::now();
        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(total);

        for (batch_no, batch) in flat.passages.chunks(batch_size.max(1)).enumerate() {
            let texts: Vec<&str> = batch.iter().map(String::as_str).collect();
            let vectors = embedder.embed_batch(&texts)?;
            check_batch(texts.len(), dimension, &vectors)?;
            embeddings.extend(vectors);
            tracing::debug!(
                batch = batch_no,
                encoded = embeddings.len(),
                total,
                "Encoded passage batch"
            );
        }

        let index = FlatIndex::build(dimension, &embeddings)?;
        tracing::info!(
            passages = total,
            dimension,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Knowledge base built"
        );

        Ok(Self {
            passages: flat.metadata,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    /// Map search hits back to passages, keeping their order.
    pub fn resolve(&self, hits: &[Neighbor]) -> std::result::Result<Vec<Answer>, QueryError> {
        hits.iter()
            .map(|hit| {
                let passage =
                    self.passages
                        .get(hit.index)
                        .ok_or(QueryError::IndexOutOfRange {
                            index: hit.index,
                            passages: self.passages.len(),
                        })?;
                Ok(Answer {
                    text: passage.text.clone(),
                    reference: passage.reference.clone(),
                    url: passage.url.clone(),
                    distance: hit.distance,
                })
            })
            .collect()
    }
}

/// What a single query produced, for presentation layers that must not fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    /// Blank input; nothing was asked.
    NoQuery,
    Results { answers: Vec<Answer> },
    /// The corpus is empty or no passage was returned.
    NoResults,
    /// The query failed; the service is still usable.
    Failed { message: String, retryable: bool },
}

impl QueryOutcome {
    /// Classify a successful [`RetrievalService::answer`] result.
    pub fn from_answers(query: &str, answers: Vec<Answer>) -> Self {
        if query.trim().is_empty() {
            Self::NoQuery
        } else if answers.is_empty() {
            Self::NoResults
        } else {
            Self::Results { answers }
        }
    }
}

/// Embedder, passages and index for one corpus.
pub struct RetrievalService {
    embedder: Arc<dyn Embedder>,
    knowledge: Option<KnowledgeBase>,
    default_k: usize,
    laws: usize,
}

impl std::fmt::Debug for RetrievalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalService")
            .field("embedder", &self.embedder.info().name)
            .field("passages", &self.passage_count())
            .field("default_k", &self.default_k)
            .finish()
    }
}

impl RetrievalService {
    /// Flatten, encode and index `corpus`.
    ///
    /// A corpus without paragraphs yields a service that answers every query
    /// with nothing, rather than an error or a zero-row index.
    pub fn from_corpus(
        corpus: &Corpus,
        embedder: Arc<dyn Embedder>,
        config: &RetrievalConfig,
    ) -> Result<Self> {
        let span = crate::lexqa_span!(
            "build_retrieval_service",
            laws = corpus.laws.len(),
            embedder = %embedder.info().name
        );
        let _guard = span.enter();

        let flat = flatten(&corpus.laws);
        let knowledge = if flat.is_empty() {
            tracing::warn!("Corpus has no paragraphs; every query will return no results");
            None
        } else {
            Some(KnowledgeBase::build(flat, embedder.as_ref(), config.batch_size)?)
        };

        Ok(Self {
            embedder,
            knowledge,
            default_k: config.top_k,
            laws: corpus.laws.len(),
        })
    }

    /// Load the configured corpus and provider, then build.
    pub fn from_config(config: &Config) -> Result<Self> {
        let corpus = Corpus::load(config.corpus_path()?)?;
        let embedder = config.embedder()?;
        Self::from_corpus(&corpus, embedder, &config.retrieval)
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    pub fn embedder_info(&self) -> EmbedderInfo {
        self.embedder.info()
    }

    pub fn law_count(&self) -> usize {
        self.laws
    }

    pub fn passage_count(&self) -> usize {
        self.knowledge.as_ref().map_or(0, KnowledgeBase::len)
    }

    pub fn passages(&self) -> &[Passage] {
        match &self.knowledge {
            Some(knowledge) => knowledge.passages(),
            None => &[],
        }
    }

    pub fn knowledge(&self) -> Option<&KnowledgeBase> {
        self.knowledge.as_ref()
    }

    /// The `k` passages closest to `query`, most relevant first.
    ///
    /// Blank queries and empty corpora return an empty list without calling
    /// the provider.
    pub fn answer(&self, query: &str, k: usize) -> Result<Vec<Answer>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let Some(knowledge) = &self.knowledge else {
            return Ok(Vec::new());
        };

        let started = Instant::now();
        let vector = self.embedder.embed(query)?;
        let hits = knowledge.index().search(&vector, k)?;
        let answers = knowledge.resolve(&hits)?;

        tracing::debug!(
            query_len = query.len(),
            k,
            hits = answers.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query answered"
        );
        Ok(answers)
    }

    /// [`answer`](Self::answer) with failures folded into the outcome.
    pub fn respond(&self, query: &str, k: usize) -> QueryOutcome {
        if query.trim().is_empty() {
            return QueryOutcome::NoQuery;
        }
        match self.answer(query, k) {
            Ok(answers) => QueryOutcome::from_answers(query, answers),
            Err(err) => {
                let retryable = matches!(&err, Error::Encoding(e) if e.is_timeout());
                tracing::warn!(error = %err, retryable, "Query failed");
                QueryOutcome::Failed {
                    message: err.to_string(),
                    retryable,
                }
            }
        }
    }
}

/// Publishes complete services; readers never see a partial rebuild.
pub struct ServiceHandle {
    current: RwLock<Arc<RetrievalService>>,
    generation: AtomicU64,
}

impl ServiceHandle {
    pub fn new(service: RetrievalService) -> Self {
        Self {
            current: RwLock::new(Arc::new(service)),
            generation: AtomicU64::new(0),
        }
    }

    /// Snapshot of the live service. Holding it does not block publication.
    pub fn current(&self) -> Arc<RetrievalService> {
        Arc::clone(&self.current.read())
    }

    /// Number of services published after the initial one.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Replace the live service, returning the previous one.
    pub fn publish(&self, service: RetrievalService) -> Arc<RetrievalService> {
        let next = Arc::new(service);
        let previous = std::mem::replace(&mut *self.current.write(), next);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::info!(generation, "Published rebuilt retrieval service");
        previous
    }

    /// Build a replacement with `build` and publish it only if it succeeds.
    pub fn rebuild<F>(&self, build: F) -> Result<()>
    where
        F: FnOnce() -> Result<RetrievalService>,
    {
        let service = build()?;
        self.publish(service);
        Ok(())
    }
}
