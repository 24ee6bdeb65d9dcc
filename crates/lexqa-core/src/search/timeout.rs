//! Bounded-latency wrapper around an [`Embedder`].
//!
//! Provider calls are not cancellable, so the call runs on a worker thread and
//! the caller waits on a bounded channel. When the budget expires the caller
//! gets [`EmbedError::Timeout`] and the worker's eventual result is dropped.
//!
//! Every call spawns its own worker. A timed-out worker keeps running until the
//! provider returns, so at most [`MAX_IN_FLIGHT`] workers may be alive at once;
//! further calls fail fast instead of piling up threads behind a hung provider.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel;

use super::embedder::{EmbedError, Embedder, EmbedderInfo};

/// Upper bound on live encode workers per wrapper, including stalled ones.
pub const MAX_IN_FLIGHT: usize = 4;

/// Releases a worker slot when the worker finishes or is never started.
struct Slot(Arc<AtomicUsize>);

impl Drop for Slot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct TimeoutEmbedder {
    inner: Arc<dyn Embedder>,
    budget: Duration,
    in_flight: Arc<AtomicUsize>,
}

impl TimeoutEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, budget: Duration) -> Self {
        Self {
            inner,
            budget,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn reserve(&self) -> Result<Slot, EmbedError> {
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < MAX_IN_FLIGHT).then_some(n + 1)
            })
            .map_err(|busy| {
                tracing::warn!(
                    embedder = %self.inner.info().name,
                    in_flight = busy,
                    "Encode workers exhausted"
                );
                EmbedError::InferenceFailed(format!(
                    "{busy} encode workers are still running; provider appears stuck"
                ))
            })?;
        Ok(Slot(Arc::clone(&self.in_flight)))
    }

    fn run<T, F>(&self, job: F) -> Result<T, EmbedError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Embedder) -> Result<T, EmbedError> + Send + 'static,
    {
        let slot = self.reserve()?;
        let (tx, rx) = channel::bounded(1);
        let inner = Arc::clone(&self.inner);
        let started = Instant::now();

        thread::Builder::new()
            .name("lexqa-encode".into())
            .spawn(move || {
                let _slot = slot;
                // Receiver may be gone after a timeout.
                let _ = tx.send(job(inner.as_ref()));
            })?;

        match rx.recv_timeout(self.budget) {
            Ok(result) => result,
            Err(channel::RecvTimeoutError::Timeout) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                tracing::warn!(
                    embedder = %self.inner.info().name,
                    budget_ms = self.budget.as_millis() as u64,
                    elapsed_ms,
                    "Encode call exceeded its budget"
                );
                Err(EmbedError::Timeout { elapsed_ms })
            }
            Err(channel::RecvTimeoutError::Disconnected) => Err(EmbedError::InferenceFailed(
                "encode worker exited without a result".to_string(),
            )),
        }
    }
}

impl Embedder for TimeoutEmbedder {
    fn info(&self) -> EmbedderInfo {
        self.inner.info()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let text = text.to_owned();
        self.run(move |e| e.embed(&text))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        let owned: Vec<String> = texts.iter().map(|t| (*t).to_owned()).collect();
        self.run(move |e| {
            let refs: Vec<&str> = owned.iter().map(String::as_str).collect();
            e.embed_batch(&refs)
        })
    }
}
