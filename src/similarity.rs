//! Pairwise similarity matrices from compression distances.
//!
//! The expensive step is compressing every pair's concatenated bytes, an
//! O(n²) sweep of CPU-bound work. Index pairs are grouped into fixed-size
//! batches and dispatched onto a rayon pool; each worker returns
//! `(i, j, compressed_length)` triples that are merged back by index, so the
//! result never depends on worker count or completion order.

use std::time::Instant;

use log::debug;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::compressor::Compressor;
use crate::data::SourceFile;
use crate::error::{ConfigError, SimError};
use crate::SimilarityMatrix;

/// Index pairs handed to one worker task. Amortizes task-dispatch overhead
/// against parallelism granularity and bounds how many concatenation buffers
/// a single task holds at once.
const PAIR_BATCH_SIZE: usize = 64;

/// Distance formula for a similarity matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formula {
    /// Normalized Compression Distance, `(Zxy - min(Zx, Zy)) / max(Zx, Zy)`.
    ///
    /// Computed once per unordered pair and mirrored into the lower triangle.
    /// The mirror treats the matrix as symmetric by convention: a codec could
    /// in principle give `|compress(x ++ y)| != |compress(y ++ x)|`, and that
    /// small approximation is accepted rather than recomputed.
    Ncd,

    /// Inclusion Compression Divergence, `(Zxy - Zy) / Zx`.
    ///
    /// Asymmetric on purpose: every ordered pair is computed independently,
    /// including the diagonal, which comes out of the real formula rather
    /// than being pinned to 1.0.
    Icd,
}

impl Formula {
    pub fn name(&self) -> &'static str {
        match self {
            Formula::Ncd => "NCD",
            Formula::Icd => "ICD",
        }
    }
}

/// Computes similarity matrices and single-pair similarities for one
/// compressor configuration.
pub struct SimilarityEngine {
    compressor: Compressor,
    workers: usize,
}

impl SimilarityEngine {
    /// An engine using rayon's default worker count.
    pub fn new(compressor: Compressor) -> SimilarityEngine {
        SimilarityEngine {
            compressor,
            workers: 0,
        }
    }

    /// Overrides the worker count. The result of [`Self::matrix`] is
    /// identical for any count; this exists for tuning and for tests.
    pub fn with_workers(mut self, workers: usize) -> SimilarityEngine {
        self.workers = workers;
        self
    }

    pub fn compressor(&self) -> &Compressor {
        &self.compressor
    }

    /// Label identifying this formula/codec combination in reports,
    /// e.g. `"NCD_bzip2"`.
    pub fn tool_label(&self, formula: Formula) -> String {
        format!("{}_{}", formula.name(), self.compressor.codec().name())
    }

    /// Computes the n×n similarity matrix for `files` under `formula`.
    ///
    /// Any compression or read failure aborts the whole matrix; partial
    /// results are discarded.
    pub fn matrix(
        &self,
        files: &[SourceFile],
        formula: Formula,
    ) -> Result<SimilarityMatrix, SimError> {
        let n = files.len();
        let labels: Vec<String> = files.iter().map(SourceFile::label).collect();

        // Standalone sizes, one compression per file. Sequential on purpose:
        // this pass also warms every file's byte cache, so the parallel phase
        // below only ever reads memoized bytes.
        let start = Instant::now();
        let mut lens = Vec::with_capacity(n);
        for file in files {
            lens.push(self.compressor.compressed_len(file.bytes()?)?);
        }
        debug!("standalone sizes for {n} files in {:?}", start.elapsed());

        let pairs: Vec<(usize, usize)> = match formula {
            Formula::Ncd => (0..n)
                .flat_map(|i| (i..n).map(move |j| (i, j)))
                .collect(),
            Formula::Icd => (0..n)
                .flat_map(|i| (0..n).map(move |j| (i, j)))
                .collect(),
        };

        let start = Instant::now();
        let triples = self.pair_lengths(files, &pairs)?;
        debug!(
            "{} pair compressions for {} in {:?}",
            pairs.len(),
            self.tool_label(formula),
            start.elapsed()
        );

        // Merge by index; batch completion order is irrelevant.
        let mut pair_len = vec![0usize; n * n];
        for (i, j, len) in triples {
            pair_len[i * n + j] = len;
            if formula == Formula::Ncd && i != j {
                pair_len[j * n + i] = len;
            }
        }

        let mut values = vec![0.0f64; n * n];
        for i in 0..n {
            for j in 0..n {
                let z_xy = pair_len[i * n + j] as f64;
                values[i * n + j] = match formula {
                    Formula::Ncd => {
                        let z_min = lens[i].min(lens[j]) as f64;
                        let z_max = lens[i].max(lens[j]) as f64;
                        1.0 - (z_xy - z_min) / z_max
                    }
                    Formula::Icd => 1.0 - (z_xy - lens[j] as f64) / lens[i] as f64,
                };
            }
        }

        Ok(SimilarityMatrix::new(
            values,
            n,
            formula == Formula::Ncd,
            labels,
        ))
    }

    /// Single-pair NCD similarity, used by the classifier. No matrix is
    /// materialized.
    pub fn pair_similarity(&self, a: &SourceFile, b: &SourceFile) -> Result<f64, SimError> {
        let x = a.bytes()?;
        let y = b.bytes()?;
        let z_x = self.compressor.compressed_len(x)?;
        let z_y = self.compressor.compressed_len(y)?;
        let z_xy = self.compressor.compressed_len(&concat(x, y))?;
        let z_min = z_x.min(z_y) as f64;
        let z_max = z_x.max(z_y) as f64;
        Ok(1.0 - (z_xy as f64 - z_min) / z_max)
    }

    /// Compresses the concatenation for every index pair, batched across the
    /// worker pool. A failure in any batch aborts the whole computation.
    fn pair_lengths(
        &self,
        files: &[SourceFile],
        pairs: &[(usize, usize)],
    ) -> Result<Vec<(usize, usize, usize)>, SimError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| ConfigError::WorkerPool(e.to_string()))?;

        let compressor = self.compressor;
        let batches: Result<Vec<Vec<(usize, usize, usize)>>, SimError> = pool.install(|| {
            pairs
                .par_chunks(PAIR_BATCH_SIZE)
                .map(|batch| {
                    let mut out = Vec::with_capacity(batch.len());
                    for &(i, j) in batch {
                        let joined = concat(files[i].bytes()?, files[j].bytes()?);
                        out.push((i, j, compressor.compressed_len(&joined)?));
                    }
                    Ok(out)
                })
                .collect()
        });

        Ok(batches?.into_iter().flatten().collect())
    }
}

fn concat(x: &[u8], y: &[u8]) -> Vec<u8> {
    let mut joined = Vec::with_capacity(x.len() + y.len());
    joined.extend_from_slice(x);
    joined.extend_from_slice(y);
    joined
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compressor::Codec;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn file_with(dir: &Path, name: &str, contents: &[u8], group: usize) -> SourceFile {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        SourceFile::new(path, Some(group)).unwrap()
    }

    fn sample_files(dir: &TempDir) -> Vec<SourceFile> {
        let base = "public class Main { public static void main(String[] a) {} }".repeat(20);
        let other = "0123456789abcdefghijklmnopqrstuvwxyz".repeat(40);
        vec![
            file_with(dir.path(), "a.java", base.as_bytes(), 0),
            file_with(dir.path(), "b.java", format!("{base}// v2").as_bytes(), 0),
            file_with(dir.path(), "c.java", other.as_bytes(), 1),
        ]
    }

    #[test]
    fn ncd_matrix_is_symmetric() {
        let dir = TempDir::new().unwrap();
        let files = sample_files(&dir);
        let engine = SimilarityEngine::new(Compressor::with_default_level(Codec::Gzip));
        let matrix = engine.matrix(&files, Formula::Ncd).unwrap();

        assert!(matrix.is_symmetric());
        for i in 0..matrix.len() {
            for j in 0..matrix.len() {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
            }
        }
    }

    #[test]
    fn ncd_self_similarity_matches_formula() {
        let dir = TempDir::new().unwrap();
        let files = sample_files(&dir);
        let compressor = Compressor::with_default_level(Codec::Zstd);
        let engine = SimilarityEngine::new(compressor);
        let matrix = engine.matrix(&files, Formula::Ncd).unwrap();

        // The diagonal follows 1 - (Zxx - Zx) / Zx, which is not 1.0.
        for (i, file) in files.iter().enumerate() {
            let bytes = file.bytes().unwrap();
            let z_x = compressor.compressed_len(bytes).unwrap() as f64;
            let z_xx = compressor.compressed_len(&concat(bytes, bytes)).unwrap() as f64;
            let expected = 1.0 - (z_xx - z_x) / z_x;
            assert!((matrix.get(i, i) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn icd_matrix_is_not_mirrored() {
        let dir = TempDir::new().unwrap();
        let files = sample_files(&dir);
        let compressor = Compressor::with_default_level(Codec::Bzip2);
        let engine = SimilarityEngine::new(compressor);
        let matrix = engine.matrix(&files, Formula::Icd).unwrap();

        assert!(!matrix.is_symmetric());

        // Every ordered pair comes from the real formula, diagonal included.
        for (i, file) in files.iter().enumerate() {
            let bytes = file.bytes().unwrap();
            let z_x = compressor.compressed_len(bytes).unwrap() as f64;
            let z_xx = compressor.compressed_len(&concat(bytes, bytes)).unwrap() as f64;
            let expected = 1.0 - (z_xx - z_x) / z_x;
            assert!((matrix.get(i, i) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn matrix_is_independent_of_worker_count() {
        let dir = TempDir::new().unwrap();
        let files = sample_files(&dir);
        let compressor = Compressor::with_default_level(Codec::Zlib);

        for formula in [Formula::Ncd, Formula::Icd] {
            let serial = SimilarityEngine::new(compressor)
                .with_workers(1)
                .matrix(&files, formula)
                .unwrap();
            let parallel = SimilarityEngine::new(compressor)
                .with_workers(4)
                .matrix(&files, formula)
                .unwrap();
            assert_eq!(serial, parallel);
        }
    }

    #[test]
    fn similar_files_score_higher_than_unrelated() {
        let dir = TempDir::new().unwrap();
        let files = sample_files(&dir);
        let engine = SimilarityEngine::new(Compressor::with_default_level(Codec::Gzip));
        let matrix = engine.matrix(&files, Formula::Ncd).unwrap();

        // a and b are near-duplicates; c is from different content entirely.
        assert!(matrix.get(0, 1) > matrix.get(0, 2));
        assert!(matrix.get(0, 1) > matrix.get(1, 2));
    }

    #[test]
    fn pair_similarity_agrees_with_matrix() {
        let dir = TempDir::new().unwrap();
        let files = sample_files(&dir);
        let engine = SimilarityEngine::new(Compressor::with_default_level(Codec::Gzip));
        let matrix = engine.matrix(&files, Formula::Ncd).unwrap();

        let single = engine.pair_similarity(&files[0], &files[1]).unwrap();
        assert!((single - matrix.get(0, 1)).abs() < 1e-12);
    }

    #[test]
    fn empty_file_list_gives_empty_matrix() {
        let engine = SimilarityEngine::new(Compressor::with_default_level(Codec::Gzip));
        let matrix = engine.matrix(&[], Formula::Ncd).unwrap();
        assert!(matrix.is_empty());
    }
}
