//! Single-thread, single-lane reference kernels
//!
//! Timing baseline for the basic phase and an oracle for the parallel
//! kernels. They share [`transform`] with the parallel code, so both paths
//! apply the same clamping and agree on every input.

use super::sort::SortedPartition;
use super::transform::transform;

/// Number of striped accumulators used by [`sum`]
const SUM_STRIPES: usize = 4096;

/// Sum of `transform(x)` using striped `f32` accumulators
pub fn sum(data: &[f32]) -> f32 {
    let mut stripes = vec![0.0f32; SUM_STRIPES];
    for block in data.chunks(SUM_STRIPES) {
        for (acc, &x) in stripes.iter_mut().zip(block) {
            *acc += transform(x);
        }
    }
    stripes.iter().sum()
}

/// Maximum of `transform(x)`; negative infinity for an empty slice
pub fn max(data: &[f32]) -> f32 {
    data.iter()
        .fold(f32::NEG_INFINITY, |acc, &x| acc.max(transform(x)))
}

/// Top-down merge sort of an index permutation, recomputing keys on compare
pub fn sort(data: &[f32]) -> SortedPartition {
    let mut permutation: Vec<usize> = (0..data.len()).collect();
    let mut scratch = vec![0usize; data.len()];
    merge_sort(data, &mut permutation, &mut scratch);

    let values = permutation.iter().map(|&idx| transform(data[idx])).collect();
    SortedPartition { permutation, values }
}

fn merge_sort(data: &[f32], perm: &mut [usize], scratch: &mut [usize]) {
    let len = perm.len();
    if len <= 1 {
        return;
    }

    let mid = len.div_ceil(2);
    {
        let (perm_lo, perm_hi) = perm.split_at_mut(mid);
        let (scratch_lo, scratch_hi) = scratch.split_at_mut(mid);
        merge_sort(data, perm_lo, scratch_lo);
        merge_sort(data, perm_hi, scratch_hi);
    }

    let (mut i, mut j) = (0, mid);
    for slot in scratch.iter_mut() {
        let take_left = j >= len || (i < mid && transform(data[perm[i]]) <= transform(data[perm[j]]));
        if take_left {
            *slot = perm[i];
            i += 1;
        } else {
            *slot = perm[j];
            j += 1;
        }
    }
    perm.copy_from_slice(scratch);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SortTuning;
    use crate::kernel::KernelPool;

    fn shuffled(len: usize) -> Vec<f32> {
        // Deterministic scramble without pulling in an RNG
        (0..len).map(|i| ((i * 104_729) % len + 1) as f32).collect()
    }

    #[test]
    fn test_empty() {
        assert_eq!(sum(&[]), 0.0);
        assert_eq!(max(&[]), f32::NEG_INFINITY);
        assert!(sort(&[]).is_empty());
    }

    #[test]
    fn test_serial_and_parallel_agree() {
        let data = shuffled(50_001);
        let pool = KernelPool::new(4, SortTuning::default()).unwrap();

        let serial_sum = sum(&data) as f64;
        let parallel_sum = pool.reduce_sum(&data) as f64;
        assert!((serial_sum - parallel_sum).abs() <= serial_sum.abs() * 1e-4);

        assert_eq!(max(&data), pool.reduce_max(&data));
        assert_eq!(sort(&data), pool.sort_partition(&data));
    }

    #[test]
    fn test_serial_and_parallel_agree_on_clamped_inputs() {
        let data = [3.0f32, 0.0, -2.0, 8.0, 1.0, -0.5, 2.0];
        let pool = KernelPool::new(2, SortTuning::default()).unwrap();

        assert_eq!(max(&data), pool.reduce_max(&data));
        assert_eq!(sort(&data), pool.sort_partition(&data));
        assert!(sum(&data).is_finite());
    }
}
