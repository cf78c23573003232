//! Precision/recall scoring of a similarity matrix against the group
//! partition.
//!
//! The matrix must already be in block-diagonal order: group blocks of
//! uniform size, contiguous and in ascending group order (what
//! [`crate::Dataset::reference_files`] produces and
//! [`crate::reorder_by_group`] preserves). Scoring an unordered matrix
//! silently produces meaningless numbers; that layout is a caller
//! responsibility and is not re-derived here.

use crate::error::ConfigError;
use crate::SimilarityMatrix;

/// Precision, recall and F1 at one detection threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fscore {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Scores `matrix` at detection threshold `threshold`.
///
/// Conceptually the n×n matrix is reshaped into G×G blocks of
/// `files_per_group` × `files_per_group` entries. The diagonal blocks
/// (same-group pairs) are the ground-truth positives; everything else is a
/// negative. An entry counts as detected when its value exceeds the
/// threshold.
///
/// The actual-positives denominator is the full diagonal-block count,
/// `G * files_per_group²`.
pub fn fscore(
    matrix: &SimilarityMatrix,
    files_per_group: usize,
    threshold: f64,
) -> Result<Fscore, ConfigError> {
    let n = matrix.len();
    if files_per_group == 0 || n % files_per_group != 0 {
        return Err(ConfigError::GroupShape {
            n,
            files_per_group,
        });
    }
    let num_groups = n / files_per_group;

    let mut true_positives = 0usize;
    let mut detected = 0usize;
    for i in 0..n {
        for j in 0..n {
            if matrix.get(i, j) > threshold {
                detected += 1;
                if i / files_per_group == j / files_per_group {
                    true_positives += 1;
                }
            }
        }
    }
    let false_positives = detected - true_positives;
    let actual_positives = num_groups * files_per_group * files_per_group;

    let precision = ratio(true_positives, true_positives + false_positives);
    let recall = ratio(true_positives, actual_positives);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    Ok(Fscore {
        precision,
        recall,
        f1,
    })
}

/// Scores `matrix` at each threshold in turn.
pub fn fscore_sweep(
    matrix: &SimilarityMatrix,
    files_per_group: usize,
    thresholds: &[f64],
) -> Result<Vec<(f64, Fscore)>, ConfigError> {
    thresholds
        .iter()
        .map(|&threshold| Ok((threshold, fscore(matrix, files_per_group, threshold)?)))
        .collect()
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
