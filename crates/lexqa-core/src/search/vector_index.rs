//! Flat (exhaustive) L2 vector index.
//!
//! Rows are stored contiguously, row-major, in build order. Row `i` of the
//! build input is result index `i` for the lifetime of the index; there is no
//! insert or remove, a rebuild constructs a new index.
//!
//! Search computes squared L2 distance with an 8-lane unrolled kernel against
//! every row, ranks by `(distance, index)` and reports the Euclidean distance.

use std::cmp::Ordering;

use thiserror::Error;

/// Errors raised while building or querying a [`FlatIndex`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndexError {
    /// k-NN over zero rows is undefined; callers branch to a no-results state.
    #[error("cannot build an index over zero embeddings")]
    Empty,

    #[error("vector dimension must be at least 1")]
    ZeroDimension,

    #[error("dimension mismatch at row {row:?}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// `None` for a query vector.
        row: Option<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("non-finite component at row {row:?}")]
    NonFinite {
        /// `None` for a query vector.
        row: Option<usize>,
    },
}

/// One search hit: build position plus Euclidean distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

/// 8-lane unrolled squared Euclidean distance.
pub(crate) fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let chunks = n / 8;
    let mut lanes = [0.0f32; 8];

    for i in 0..chunks {
        let base = i * 8;
        for (lane, acc) in lanes.iter_mut().enumerate() {
            let d = a[base + lane] - b[base + lane];
            *acc += d * d;
        }
    }

    let mut tail = 0.0f32;
    for i in (chunks * 8)..n {
        let d = a[i] - b[i];
        tail += d * d;
    }
    (lanes[0] + lanes[1]) + (lanes[2] + lanes[3]) + (lanes[4] + lanes[5]) + (lanes[6] + lanes[7])
        + tail
}

fn rank(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    a.1.total_cmp(&b.1).then(a.0.cmp(&b.0))
}

/// Immutable exact nearest-neighbor index over fixed-dimension vectors.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    rows: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build an index over `embeddings`, in order.
    pub fn build<V: AsRef<[f32]>>(dimension: usize, embeddings: &[V]) -> Result<Self, IndexError> {
        if embeddings.is_empty() {
            return Err(IndexError::Empty);
        }
        if dimension == 0 {
            return Err(IndexError::ZeroDimension);
        }

        let mut data = Vec::with_capacity(dimension * embeddings.len());
        for (row, vector) in embeddings.iter().enumerate() {
            let vector = vector.as_ref();
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    row: Some(row),
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            if vector.iter().any(|x| !x.is_finite()) {
                return Err(IndexError::NonFinite { row: Some(row) });
            }
            data.extend_from_slice(vector);
        }

        Ok(Self {
            dimension,
            rows: embeddings.len(),
            data,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    /// Always false for a successfully built index; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Stored vector at build position `index`.
    pub fn vector(&self, index: usize) -> Option<&[f32]> {
        (index < self.rows).then(|| &self.data[index * self.dimension..(index + 1) * self.dimension])
    }

    /// The `k` rows closest to `query`, by ascending distance then index.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                row: None,
                expected: self.dimension,
                actual: query.len(),
            });
        }
        // NaN distances would all tie and fall back to build order.
        if query.iter().any(|x| !x.is_finite()) {
            return Err(IndexError::NonFinite { row: None });
        }
        let k = k.min(self.rows);
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .map(|row| l2_squared(query, row))
            .enumerate()
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank);
            scored.truncate(k);
        }
        scored.sort_unstable_by(rank);

        Ok(scored
            .into_iter()
            .map(|(index, d2)| Neighbor {
                index,
                distance: d2.sqrt(),
            })
            .collect())
    }
}
