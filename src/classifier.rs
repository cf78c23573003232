//! Classification of unseen files against a labeled reference set.
//!
//! Each scheme only needs single-pair similarities, computed on demand
//! through a caller-supplied function; no full matrix is materialized.

use std::cmp::Ordering;
use std::collections::HashMap;

use log::debug;

use crate::compressor::Codec;
use crate::data::SourceFile;
use crate::error::{ConfigError, DataError, SimError};
use crate::similarity::SimilarityEngine;

/// A classification strategy, resolved from configuration before any
/// similarity computation starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// The group of the single most similar reference file wins.
    BestMatch,

    /// The group with the highest summed similarity wins. Equivalent to
    /// highest average under the (unenforced) assumption of equal group
    /// sizes.
    HighestAverage,

    /// Majority vote over the K most similar reference files.
    Knn(usize),
}

impl Scheme {
    /// Resolves a scheme by its short configuration name: `"bm"`, `"ha"`, or
    /// `"knnK"` with a positive integer K.
    pub fn from_name(name: &str) -> Result<Scheme, ConfigError> {
        match name {
            "bm" => Ok(Scheme::BestMatch),
            "ha" => Ok(Scheme::HighestAverage),
            other => match other.strip_prefix("knn").and_then(|k| k.parse().ok()) {
                Some(k) => Ok(Scheme::Knn(k)),
                None => Err(ConfigError::UnknownScheme(other.to_string())),
            },
        }
    }

    pub fn label(&self) -> String {
        match self {
            Scheme::BestMatch => "best_match".to_string(),
            Scheme::HighestAverage => "highest_average".to_string(),
            Scheme::Knn(k) => format!("knn{k}"),
        }
    }

    /// Checks this scheme against a reference set of `reference_len` files.
    ///
    /// A configuration error, not a runtime one: K for KNN must satisfy
    /// `0 < K <= reference_len`, and no scheme can run against an empty
    /// reference set.
    pub fn validate(&self, reference_len: usize) -> Result<(), ConfigError> {
        if reference_len == 0 {
            return Err(ConfigError::EmptyReference);
        }
        if let Scheme::Knn(k) = *self {
            if k == 0 || k > reference_len {
                return Err(ConfigError::KnnRange {
                    k,
                    max: reference_len,
                });
            }
        }
        Ok(())
    }
}

/// Predicts the group of `file` from its similarity to `reference` files.
///
/// `sim(a, b)` supplies a single-pair similarity score on demand. Ties in
/// every scheme resolve to the first-encountered candidate in reference
/// iteration order, so predictions are deterministic for a fixed reference
/// set and similarity function.
pub fn classify<F>(
    scheme: Scheme,
    file: &SourceFile,
    reference: &[SourceFile],
    mut sim: F,
) -> Result<usize, SimError>
where
    F: FnMut(&SourceFile, &SourceFile) -> Result<f64, SimError>,
{
    scheme.validate(reference.len())?;
    match scheme {
        Scheme::BestMatch => {
            // Sentinel below any valid similarity score.
            let mut best_score = f64::NEG_INFINITY;
            let mut best_group = 0;
            for sample in reference {
                let group = group_of(sample)?;
                let score = sim(file, sample)?;
                if score > best_score {
                    best_score = score;
                    best_group = group;
                }
            }
            Ok(best_group)
        }
        Scheme::HighestAverage => {
            let mut totals: Vec<(usize, f64)> = Vec::new();
            for sample in reference {
                let group = group_of(sample)?;
                let score = sim(file, sample)?;
                match totals.iter_mut().find(|(g, _)| *g == group) {
                    Some((_, total)) => *total += score,
                    None => totals.push((group, score)),
                }
            }
            Ok(argmax(&totals))
        }
        Scheme::Knn(k) => {
            let mut scored: Vec<(f64, usize)> = Vec::with_capacity(reference.len());
            for sample in reference {
                let group = group_of(sample)?;
                scored.push((sim(file, sample)?, group));
            }
            // Ascending stable sort; the last k entries are the k nearest.
            scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

            let mut votes: Vec<(usize, f64)> = Vec::new();
            for &(_, group) in &scored[scored.len() - k..] {
                match votes.iter_mut().find(|(g, _)| *g == group) {
                    Some((_, count)) => *count += 1.0,
                    None => votes.push((group, 1.0)),
                }
            }
            Ok(argmax(&votes))
        }
    }
}

/// Argmax over `(group, score)` pairs; strict `>` keeps the first group
/// encountered on ties.
fn argmax(scores: &[(usize, f64)]) -> usize {
    let mut best = scores[0];
    for &(group, score) in &scores[1..] {
        if score > best.1 {
            best = (group, score);
        }
    }
    best.0
}

fn group_of(sample: &SourceFile) -> Result<usize, DataError> {
    sample
        .group()
        .ok_or_else(|| DataError::UnassignedGroup(sample.name().to_string()))
}

/// Sparse confusion-count accumulator keyed by classifier configuration.
///
/// Append-only during a classification run and read-only afterward; owned by
/// the run and returned by value rather than living in ambient state.
#[derive(Debug, Default)]
pub struct Tally {
    counts: HashMap<(Scheme, Codec), HashMap<(usize, usize), u64>>,
}

impl Tally {
    pub fn new() -> Tally {
        Tally::default()
    }

    /// Records one `(actual, predicted)` observation for a configuration.
    pub fn record(&mut self, scheme: Scheme, codec: Codec, actual: usize, predicted: usize) {
        *self
            .counts
            .entry((scheme, codec))
            .or_default()
            .entry((actual, predicted))
            .or_insert(0) += 1;
    }

    /// Confusion counts for one configuration, keyed by
    /// `(actual, predicted)`.
    pub fn counts(&self, scheme: Scheme, codec: Codec) -> Option<&HashMap<(usize, usize), u64>> {
        self.counts.get(&(scheme, codec))
    }

    /// Fraction of correctly classified files for one configuration, if it
    /// has recorded any observations.
    pub fn accuracy(&self, scheme: Scheme, codec: Codec) -> Option<f64> {
        let counts = self.counts(scheme, codec)?;
        let total: u64 = counts.values().sum();
        if total == 0 {
            return None;
        }
        let correct: u64 = counts
            .iter()
            .filter(|((actual, predicted), _)| actual == predicted)
            .map(|(_, count)| count)
            .sum();
        Some(correct as f64 / total as f64)
    }
}

/// Classifies every file in `files` against `reference` using single-pair
/// NCD similarity from `engine`, tallying `(actual, predicted)` pairs.
///
/// A file without a group label aborts the run with a data error.
pub fn classify_files(
    scheme: Scheme,
    engine: &SimilarityEngine,
    files: &[SourceFile],
    reference: &[SourceFile],
    tally: &mut Tally,
) -> Result<(), SimError> {
    scheme.validate(reference.len())?;
    let codec = engine.compressor().codec();
    for file in files {
        let actual = group_of(file)?;
        let predicted = classify(scheme, file, reference, |a, b| engine.pair_similarity(a, b))?;
        debug!(
            "{}/{}: {} actual {actual} predicted {predicted}",
            scheme.label(),
            codec.name(),
            file.name()
        );
        tally.record(scheme, codec, actual, predicted);
    }
    Ok(())
}
