//! Compression-distance similarity for source-code files.
//!
//! Pairwise similarity is estimated from general-purpose compressors as an
//! approximation of Kolmogorov complexity: if two files compress better
//! together than apart, they share information. The crate computes full
//! similarity matrices (NCD and ICD formulas, batched in parallel), reorders
//! them into group blocks, scores them with a precision/recall metric, and
//! classifies unseen files against a labeled reference set.

pub mod classifier;
pub mod clustering;
pub mod compressor;
pub mod data;
pub mod error;
pub mod fscore;
pub mod similarity;

pub use classifier::{classify, classify_files, Scheme, Tally};
pub use clustering::reorder_by_group;
pub use compressor::{Codec, Compressor};
pub use data::{Dataset, SourceFile};
pub use error::{CompressionError, ConfigError, DataError, SimError};
pub use fscore::{fscore, fscore_sweep, Fscore};
pub use similarity::{Formula, SimilarityEngine};

/// An n×n matrix of pairwise similarity scores.
///
/// Scores are bounded but not strictly confined to `[0, 1]`; small inputs and
/// codec overhead can push individual entries slightly outside. The matrix is
/// immutable once produced: reordering (see [`reorder_by_group`]) builds a new
/// matrix rather than mutating in place.
///
/// A matrix flagged symmetric guarantees `get(i, j) == get(j, i)` for all
/// `i, j`. Asymmetric matrices (the ICD formula) carry no such guarantee and
/// their diagonal is computed from the real formula, never forced to `1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    /// Row-major score storage, `n * n` entries.
    values: Vec<f64>,

    /// Number of rows (and columns).
    n: usize,

    /// Whether `get(i, j) == get(j, i)` holds for all entries.
    symmetric: bool,

    /// Row/column labels, one per file, in matrix order.
    labels: Vec<String>,
}

impl SimilarityMatrix {
    pub(crate) fn new(
        values: Vec<f64>,
        n: usize,
        symmetric: bool,
        labels: Vec<String>,
    ) -> SimilarityMatrix {
        debug_assert_eq!(values.len(), n * n);
        debug_assert_eq!(labels.len(), n);
        SimilarityMatrix {
            values,
            n,
            symmetric,
            labels,
        }
    }

    /// Number of rows (equal to the number of files compared).
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn is_symmetric(&self) -> bool {
        self.symmetric
    }

    /// The similarity score at row `i`, column `j`.
    ///
    /// # Panics
    ///
    /// Panics if `i` or `j` is out of bounds.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(i < self.n && j < self.n, "index ({i}, {j}) out of bounds");
        self.values[i * self.n + j]
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Row `i` as a contiguous slice.
    pub fn row(&self, i: usize) -> &[f64] {
        assert!(i < self.n, "row {i} out of bounds");
        &self.values[i * self.n..(i + 1) * self.n]
    }
}
