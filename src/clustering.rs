//! Matrix reordering into group blocks.

use std::cmp::Ordering;

use crate::error::ConfigError;
use crate::SimilarityMatrix;

/// Reorders `matrix` so files of the same group become index-contiguous.
///
/// Groups are laid out in ascending group-id order. Within a group, members
/// are sorted by their mean similarity to the *other* members of the group,
/// descending; ties keep the original index order (stable sort). The returned
/// permutation maps new index -> old index and is applied symmetrically to
/// rows, columns and labels. The input matrix is left untouched.
pub fn reorder_by_group(
    matrix: &SimilarityMatrix,
    groups: &[usize],
) -> Result<(SimilarityMatrix, Vec<usize>), ConfigError> {
    let n = matrix.len();
    if groups.len() != n {
        return Err(ConfigError::LabelCount {
            expected: n,
            got: groups.len(),
        });
    }

    let num_groups = groups.iter().copied().max().map_or(0, |g| g + 1);
    let mut permutation = Vec::with_capacity(n);
    for group in 0..num_groups {
        let members: Vec<usize> = (0..n).filter(|&i| groups[i] == group).collect();

        let mut scored: Vec<(usize, f64)> = members
            .iter()
            .map(|&i| (i, intra_group_mean(matrix, i, &members)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        permutation.extend(scored.into_iter().map(|(i, _)| i));
    }

    let mut values = vec![0.0f64; n * n];
    for a in 0..n {
        for b in 0..n {
            values[a * n + b] = matrix.get(permutation[a], permutation[b]);
        }
    }
    let labels = permutation
        .iter()
        .map(|&i| matrix.labels()[i].clone())
        .collect();

    Ok((
        SimilarityMatrix::new(values, n, matrix.is_symmetric(), labels),
        permutation,
    ))
}

/// Mean similarity of `i` to the other members of its group; 0.0 for a
/// singleton group.
fn intra_group_mean(matrix: &SimilarityMatrix, i: usize, members: &[usize]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &j in members {
        if j != i {
            sum += matrix.get(i, j);
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn matrix_from_rows(rows: &[&[f64]]) -> SimilarityMatrix {
        let n = rows.len();
        let values: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        let labels = (0..n).map(|i| format!("f{i}")).collect();
        SimilarityMatrix::new(values, n, true, labels)
    }

    #[test]
    fn permutation_is_a_bijection() {
        let matrix = matrix_from_rows(&[
            &[1.0, 0.2, 0.8, 0.1],
            &[0.2, 1.0, 0.3, 0.9],
            &[0.8, 0.3, 1.0, 0.2],
            &[0.1, 0.9, 0.2, 1.0],
        ]);
        let groups = [0, 1, 0, 1];

        let (_, permutation) = reorder_by_group(&matrix, &groups).unwrap();
        let mut sorted = permutation.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3]);
    }

    #[test]
    fn groups_become_contiguous_in_ascending_order() {
        let matrix = matrix_from_rows(&[
            &[1.0, 0.2, 0.8, 0.1],
            &[0.2, 1.0, 0.3, 0.9],
            &[0.8, 0.3, 1.0, 0.2],
            &[0.1, 0.9, 0.2, 1.0],
        ]);
        let groups = [0, 1, 0, 1];

        let (_, permutation) = reorder_by_group(&matrix, &groups).unwrap();
        let reordered_groups: Vec<usize> = permutation.iter().map(|&i| groups[i]).collect();
        assert_eq!(reordered_groups, vec![0, 0, 1, 1]);
    }

    #[test]
    fn members_sort_by_descending_intra_group_mean() {
        // Within group 0: file 2 is closer to its peers than file 0 is.
        let matrix = matrix_from_rows(&[
            &[1.0, 0.1, 0.4, 0.2],
            &[0.1, 1.0, 0.9, 0.3],
            &[0.4, 0.9, 1.0, 0.1],
            &[0.2, 0.3, 0.1, 1.0],
        ]);
        let groups = [0, 0, 0, 1];

        let (reordered, permutation) = reorder_by_group(&matrix, &groups).unwrap();
        // Means over the other two members: f0 -> 0.25, f1 -> 0.5, f2 -> 0.65.
        assert_eq!(permutation, vec![2, 1, 0, 3]);
        assert_eq!(reordered.labels(), ["f2", "f1", "f0", "f3"]);
        assert_eq!(reordered.get(0, 1), matrix.get(2, 1));
    }

    #[test]
    fn ties_keep_original_index_order() {
        let matrix = matrix_from_rows(&[
            &[1.0, 0.5, 0.5],
            &[0.5, 1.0, 0.5],
            &[0.5, 0.5, 1.0],
        ]);
        let groups = [0, 0, 0];

        let (_, permutation) = reorder_by_group(&matrix, &groups).unwrap();
        assert_eq!(permutation, vec![0, 1, 2]);
    }

    #[test]
    fn reordering_sorted_input_is_idempotent() {
        let matrix = matrix_from_rows(&[
            &[1.0, 0.1, 0.4, 0.2],
            &[0.1, 1.0, 0.9, 0.3],
            &[0.4, 0.9, 1.0, 0.1],
            &[0.2, 0.3, 0.1, 1.0],
        ]);
        let groups = [0, 0, 0, 1];

        let (sorted, permutation) = reorder_by_group(&matrix, &groups).unwrap();
        let sorted_groups: Vec<usize> = permutation.iter().map(|&i| groups[i]).collect();
        let (again, identity) = reorder_by_group(&sorted, &sorted_groups).unwrap();
        assert_eq!(identity, vec![0, 1, 2, 3]);
        assert_eq!(again, sorted);
    }

    #[test]
    fn rejects_mismatched_group_labels() {
        let matrix = matrix_from_rows(&[&[1.0, 0.5], &[0.5, 1.0]]);
        assert!(matches!(
            reorder_by_group(&matrix, &[0]),
            Err(ConfigError::LabelCount { .. })
        ));
    }
}
