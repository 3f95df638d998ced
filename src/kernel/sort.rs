//! Adaptive parallel merge sort over an index permutation
//!
//! The sorter never moves dataset values. It orders a permutation of
//! `0..len` by the transformed value of each index:
//!
//! - ranges of at most `insertion_cutoff` elements are insertion sorted in place
//! - larger ranges split at the midpoint; both halves run as a `rayon::join`
//!   pair when the range is above the grain size and the split depth is under
//!   its cap, and inline otherwise
//! - the two sorted halves are merged into scratch space. Large merges split
//!   the left run at its midpoint, binary-search the pivot's partition point
//!   in the right run, place the pivot directly and merge both sides as a
//!   `rayon::join` pair, down to `merge_depth_cap` levels. Everything else is
//!   a two-pointer merge that prefers the left run on ties.
//!
//! Every step is stable, so the final permutation is the unique stable order
//! of the keys and does not depend on the worker count or on any tunable.

use super::transform::transform;
use crate::config::SortTuning;
use rayon::prelude::*;

/// Output of [`sort_partition`]
#[derive(Debug, Clone, PartialEq)]
pub struct SortedPartition {
    /// Indices into the partition in ascending key order
    pub permutation: Vec<usize>,
    /// `transform(data[permutation[i]])` for every `i`
    pub values: Vec<f32>,
}

impl SortedPartition {
    pub fn len(&self) -> usize {
        self.permutation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permutation.is_empty()
    }
}

/// Sort a partition by transformed value using the current rayon pool
///
/// `workers` is the size of that pool; it only feeds the default grain size.
pub fn sort_partition(data: &[f32], tuning: &SortTuning, workers: usize) -> SortedPartition {
    let len = data.len();

    let keys: Vec<f32> = data.par_iter().map(|&x| transform(x)).collect();
    let mut permutation: Vec<usize> = (0..len).into_par_iter().collect();
    let mut scratch = vec![0usize; len];

    let sorter = Sorter {
        keys: &keys,
        tuning,
        grain: tuning.grain_for(workers),
    };
    sorter.sort(&mut permutation, &mut scratch, 0);

    let values = materialize(data, &permutation);

    SortedPartition { permutation, values }
}

/// Fill `values[i] = transform(data[permutation[i]])` in four parallel blocks
fn materialize(data: &[f32], permutation: &[usize]) -> Vec<f32> {
    let mut values = vec![0.0f32; permutation.len()];
    let block = permutation.len().div_ceil(4).max(1);

    values
        .par_chunks_mut(block)
        .zip(permutation.par_chunks(block))
        .for_each(|(out, indices)| {
            for (slot, &idx) in out.iter_mut().zip(indices) {
                *slot = transform(data[idx]);
            }
        });

    values
}

struct Sorter<'a> {
    keys: &'a [f32],
    tuning: &'a SortTuning,
    grain: usize,
}

impl Sorter<'_> {
    #[inline(always)]
    fn key(&self, idx: usize) -> f32 {
        self.keys[idx]
    }

    fn sort(&self, perm: &mut [usize], scratch: &mut [usize], depth: usize) {
        let len = perm.len();
        if len <= 1 {
            return;
        }
        if len <= self.tuning.insertion_cutoff {
            self.insertion_sort(perm);
            return;
        }

        let mid = len.div_ceil(2);
        {
            let (perm_lo, perm_hi) = perm.split_at_mut(mid);
            let (scratch_lo, scratch_hi) = scratch.split_at_mut(mid);

            if len > self.grain && depth < self.tuning.split_depth_cap {
                rayon::join(
                    || self.sort(perm_lo, scratch_lo, depth + 1),
                    || self.sort(perm_hi, scratch_hi, depth + 1),
                );
            } else {
                self.sort(perm_lo, scratch_lo, depth + 1);
                self.sort(perm_hi, scratch_hi, depth + 1);
            }
        }

        let (run_lo, run_hi) = perm.split_at(mid);
        self.merge(run_lo, run_hi, scratch, 0);
        perm.copy_from_slice(scratch);
    }

    fn insertion_sort(&self, perm: &mut [usize]) {
        for i in 1..perm.len() {
            let idx = perm[i];
            let key = self.key(idx);
            let mut j = i;
            while j > 0 && self.key(perm[j - 1]) > key {
                perm[j] = perm[j - 1];
                j -= 1;
            }
            perm[j] = idx;
        }
    }

    fn merge(&self, left: &[usize], right: &[usize], out: &mut [usize], depth: usize) {
        debug_assert_eq!(left.len() + right.len(), out.len());

        if left.is_empty()
            || out.len() < self.tuning.merge_min_len
            || depth >= self.tuning.merge_depth_cap
        {
            self.merge_linear(left, right, out);
            return;
        }

        let left_mid = left.len() / 2;
        let pivot = self.key(left[left_mid]);
        // First right element not below the pivot. Equal right keys stay
        // after the pivot, which keeps the left run ahead on ties.
        let right_mid = right.partition_point(|&idx| self.key(idx) < pivot);

        let (out_lo, out_rest) = out.split_at_mut(left_mid + right_mid);
        let (pivot_slot, out_hi) = out_rest.split_at_mut(1);
        pivot_slot[0] = left[left_mid];

        rayon::join(
            || self.merge(&left[..left_mid], &right[..right_mid], out_lo, depth + 1),
            || self.merge(&left[left_mid + 1..], &right[right_mid..], out_hi, depth + 1),
        );
    }

    fn merge_linear(&self, left: &[usize], right: &[usize], out: &mut [usize]) {
        let (mut i, mut j) = (0, 0);
        for slot in out.iter_mut() {
            let take_left = j >= right.len()
                || (i < left.len() && self.key(left[i]) <= self.key(right[j]));
            if take_left {
                *slot = left[i];
                i += 1;
            } else {
                *slot = right[j];
                j += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn shuffled(len: usize, seed: u64) -> Vec<f32> {
        let mut data: Vec<f32> = (1..=len).map(|v| v as f32).collect();
        data.shuffle(&mut Xoshiro256PlusPlus::seed_from_u64(seed));
        data
    }

    /// Tuning that forces parallel splits and parallel merges on small inputs
    fn eager_tuning() -> SortTuning {
        SortTuning {
            insertion_cutoff: 4,
            split_depth_cap: 16,
            merge_depth_cap: 8,
            merge_min_len: 16,
            grain_size: Some(8),
        }
    }

    fn run(data: &[f32], tuning: &SortTuning, workers: usize) -> SortedPartition {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .unwrap();
        pool.install(|| sort_partition(data, tuning, workers))
    }

    fn assert_is_permutation(perm: &[usize]) {
        let mut seen = vec![false; perm.len()];
        for &idx in perm {
            assert!(idx < perm.len(), "index {} out of range", idx);
            assert!(!seen[idx], "index {} appears twice", idx);
            seen[idx] = true;
        }
    }

    fn assert_sorted(values: &[f32]) {
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_empty_partition() {
        let sorted = run(&[], &SortTuning::default(), 2);
        assert!(sorted.is_empty());
        assert!(sorted.values.is_empty());
    }

    #[test]
    fn test_single_element() {
        let sorted = run(&[9.0], &SortTuning::default(), 2);
        assert_eq!(sorted.permutation, vec![0]);
        assert_eq!(sorted.values, vec![transform(9.0)]);
    }

    #[test]
    fn test_permutation_and_order() {
        for len in [2usize, 31, 32, 33, 100, 5000, 40_000] {
            let data = shuffled(len, len as u64);
            let sorted = run(&data, &SortTuning::default(), 4);

            assert_eq!(sorted.len(), len);
            assert_is_permutation(&sorted.permutation);
            assert_sorted(&sorted.values);
            for (value, &idx) in sorted.values.iter().zip(&sorted.permutation) {
                assert_eq!(*value, transform(data[idx]));
            }
        }
    }

    #[test]
    fn test_result_independent_of_parallelism() {
        let data = shuffled(30_000, 7);
        let reference = run(&data, &SortTuning::default(), 1);

        for workers in [1usize, 2, 3, 8] {
            let eager = run(&data, &eager_tuning(), workers);
            assert_eq!(eager.permutation, reference.permutation, "workers={}", workers);
            assert_eq!(eager.values, reference.values);
        }
    }

    #[test]
    fn test_ties_keep_input_index_order() {
        // Many duplicate keys; the stable order is by (key, index)
        let data: Vec<f32> = (0..10_000).map(|i| ((i * 7919) % 13) as f32 + 1.0).collect();
        let sorted = run(&data, &eager_tuning(), 4);

        let mut expected: Vec<usize> = (0..data.len()).collect();
        expected.sort_by(|&a, &b| transform(data[a]).total_cmp(&transform(data[b])).then(a.cmp(&b)));
        assert_eq!(sorted.permutation, expected);
    }

    #[test]
    fn test_already_sorted_input_is_identity() {
        let data: Vec<f32> = (1..=20_000).map(|v| v as f32).collect();
        let sorted = run(&data, &eager_tuning(), 4);
        let identity: Vec<usize> = (0..data.len()).collect();
        assert_eq!(sorted.permutation, identity);
    }

    #[test]
    fn test_non_positive_values_sort_first() {
        let data = [5.0f32, -1.0, 0.0, 2.0, f32::NAN, 1.0];
        let sorted = run(&data, &SortTuning::default(), 2);
        assert_sorted(&sorted.values);
        assert!(sorted.values.iter().all(|v| !v.is_nan()));
        assert_eq!(sorted.permutation[..3], [1, 2, 4]);
        assert_eq!(sorted.permutation[3..], [5, 3, 0]);
    }
}
