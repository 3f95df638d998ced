//! Vectorized sum and max reductions
//!
//! A partition is split into a body whose length is a multiple of
//! [`LANE_WIDTH`] and a scalar tail of `len % LANE_WIDTH` elements. The body
//! is handed to the current rayon pool in task-sized chunks; each task walks
//! its chunk one lane-group at a time and keeps a local partial. Partials are
//! combined with a `+` or `max` reduction, in no particular order.
//!
//! Sums are accumulated in `f64` and rounded once at the end, so the result
//! stays within reassociation error of an exact sum over the transformed
//! values regardless of how the work was split.

use super::transform::{transform, transform_lanes, LANE_WIDTH};
use rayon::prelude::*;

/// Elements handed to one task (a whole number of lane-groups)
pub const TASK_CHUNK: usize = 16 * 1024;

/// Sum of `transform(x)` over the partition. Empty partitions sum to 0.
pub fn sum(data: &[f32]) -> f32 {
    let (body, tail) = split_lanes(data);

    let body_sum: f64 = body
        .par_chunks(TASK_CHUNK)
        .map(|chunk| {
            chunk
                .chunks_exact(LANE_WIDTH)
                .map(|group| {
                    let t = transform_lanes(&lane_group(group));
                    (t[0] as f64 + t[1] as f64) + (t[2] as f64 + t[3] as f64)
                })
                .sum::<f64>()
        })
        .sum();

    let tail_sum: f64 = tail.iter().map(|&x| transform(x) as f64).sum();

    (body_sum + tail_sum) as f32
}

/// Maximum of `transform(x)` over the partition.
///
/// Empty partitions return negative infinity, the identity of `max`.
pub fn max(data: &[f32]) -> f32 {
    let (body, tail) = split_lanes(data);

    let body_max = body
        .par_chunks(TASK_CHUNK)
        .map(|chunk| {
            chunk
                .chunks_exact(LANE_WIDTH)
                .fold(f32::NEG_INFINITY, |acc, group| {
                    let t = transform_lanes(&lane_group(group));
                    acc.max(t[0].max(t[1])).max(t[2].max(t[3]))
                })
        })
        .reduce(|| f32::NEG_INFINITY, f32::max);

    tail.iter()
        .fold(body_max, |acc, &x| acc.max(transform(x)))
}

#[inline(always)]
fn split_lanes(data: &[f32]) -> (&[f32], &[f32]) {
    let body_len = data.len() - data.len() % LANE_WIDTH;
    data.split_at(body_len)
}

#[inline(always)]
fn lane_group(group: &[f32]) -> [f32; LANE_WIDTH] {
    [group[0], group[1], group[2], group[3]]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequential_sum(data: &[f32]) -> f64 {
        data.iter().map(|&x| transform(x) as f64).sum()
    }

    fn sequential_max(data: &[f32]) -> f32 {
        data.iter().map(|&x| transform(x)).fold(f32::NEG_INFINITY, f32::max)
    }

    fn assert_close(actual: f32, expected: f64) {
        let tolerance = expected.abs().max(1.0) * 1e-4;
        assert!(
            (actual as f64 - expected).abs() <= tolerance,
            "expected {} got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_empty_partition_identities() {
        assert_eq!(sum(&[]), 0.0);
        assert_eq!(max(&[]), f32::NEG_INFINITY);
    }

    #[test]
    fn test_single_element() {
        assert_eq!(sum(&[16.0]), transform(16.0));
        assert_eq!(max(&[16.0]), transform(16.0));
    }

    #[test]
    fn test_tail_only_partition() {
        let data = [4.0f32, 9.0, 25.0];
        assert_close(sum(&data), sequential_sum(&data));
        assert_eq!(max(&data), transform(25.0));
    }

    #[test]
    fn test_matches_sequential_for_all_tail_lengths() {
        for len in [4usize, 5, 6, 7, 1023, TASK_CHUNK, TASK_CHUNK + 3, 3 * TASK_CHUNK + 1] {
            let data: Vec<f32> = (1..=len).map(|v| v as f32).collect();
            assert_close(sum(&data), sequential_sum(&data));
            assert_eq!(max(&data), sequential_max(&data));
        }
    }

    #[test]
    fn test_max_found_in_any_position() {
        let mut data = vec![2.0f32; 4099];
        for pos in [0usize, 1, 2, 3, 2048, 4096, 4098] {
            data.fill(2.0);
            data[pos] = 100.0;
            assert_eq!(max(&data), transform(100.0), "max at position {}", pos);
        }
    }

    #[test]
    fn test_non_positive_values_use_clamped_transform() {
        let data = [0.0f32, -3.0, 1.0, 4.0, -1.0];
        assert_close(sum(&data), sequential_sum(&data));
        assert!(sum(&data).is_finite());
    }
}
