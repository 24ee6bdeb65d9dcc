//! Embedding providers and the exact L2 vector index.
//!
//! Providers implement [`Embedder`]; [`FlatIndex`] stores their output and
//! answers k-nearest-neighbor queries by Euclidean distance.

mod embedder;
mod hash_embedder;
mod timeout;
mod vector_index;

#[cfg(feature = "semantic-search")]
mod fastembed_embedder;

pub(crate) use embedder::check_batch;
pub use embedder::{EmbedError, Embedder, EmbedderInfo, EmbedderTier};
pub use hash_embedder::HashEmbedder;
pub use timeout::TimeoutEmbedder;
pub use vector_index::{FlatIndex, IndexError, Neighbor};

#[cfg(feature = "semantic-search")]
pub use fastembed_embedder::FastEmbedEmbedder;
