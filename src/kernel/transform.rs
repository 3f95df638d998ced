//! Value transform applied before every reduction and comparison
//!
//! Every kernel in this crate (parallel and serial, sum, max and sort) works in
//! the transformed value space `ln(sqrt(x))`. Raw dataset values are never
//! reduced or compared directly.
//!
//! # Clamping policy
//!
//! `sqrt` is undefined for negative inputs and `ln(0)` is `-inf`, so inputs are
//! clamped to [`TRANSFORM_FLOOR`] before the square root. Anything that is not
//! strictly greater than the floor (zero, negatives, NaN) maps to the floor.
//! The scalar and lane forms apply the same rule, so both produce bit-identical
//! outputs and sort keys are always ordered (never NaN).

/// Smallest value fed into `sqrt`
pub const TRANSFORM_FLOOR: f32 = 1e-37;

/// Number of elements in one lane-group
pub const LANE_WIDTH: usize = 4;

/// Clamp a raw value into the transform's domain
#[inline(always)]
pub fn clamp(x: f32) -> f32 {
    // Written as a comparison so NaN falls through to the floor, matching
    // the lane form's max instruction.
    if x > TRANSFORM_FLOOR {
        x
    } else {
        TRANSFORM_FLOOR
    }
}

/// Transform a single value: `ln(sqrt(clamp(x)))`
#[inline(always)]
pub fn transform(x: f32) -> f32 {
    clamp(x).sqrt().ln()
}

/// Transform one lane-group
///
/// Clamp and square root run as one vector operation; the logarithm is
/// applied per lane.
#[inline(always)]
pub fn transform_lanes(lanes: &[f32; LANE_WIDTH]) -> [f32; LANE_WIDTH] {
    let roots = sqrt_lanes(lanes);
    [roots[0].ln(), roots[1].ln(), roots[2].ln(), roots[3].ln()]
}

#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn sqrt_lanes(lanes: &[f32; LANE_WIDTH]) -> [f32; LANE_WIDTH] {
    use std::arch::x86_64::{_mm_loadu_ps, _mm_max_ps, _mm_set1_ps, _mm_sqrt_ps, _mm_storeu_ps};

    let mut out = [0.0f32; LANE_WIDTH];
    // SAFETY: SSE is part of the x86_64 baseline. Both pointers refer to
    // arrays of exactly four f32 and the unaligned load/store variants are used.
    unsafe {
        let v = _mm_loadu_ps(lanes.as_ptr());
        // max_ps returns the second operand when the first is NaN
        let v = _mm_max_ps(v, _mm_set1_ps(TRANSFORM_FLOOR));
        _mm_storeu_ps(out.as_mut_ptr(), _mm_sqrt_ps(v));
    }
    out
}

#[cfg(not(target_arch = "x86_64"))]
#[inline(always)]
fn sqrt_lanes(lanes: &[f32; LANE_WIDTH]) -> [f32; LANE_WIDTH] {
    lanes.map(|x| clamp(x).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_matches_definition() {
        for v in [1.0f32, 2.0, 16.0, 12345.0, 1.0e7] {
            let expected = v.sqrt().ln();
            assert_eq!(transform(v), expected);
        }
    }

    #[test]
    fn test_transform_of_one_is_zero() {
        assert_eq!(transform(1.0), 0.0);
    }

    #[test]
    fn test_non_positive_inputs_are_clamped() {
        let floor = transform(TRANSFORM_FLOOR);
        assert!(floor.is_finite());
        assert_eq!(transform(0.0), floor);
        assert_eq!(transform(-5.0), floor);
        assert_eq!(transform(f32::NAN), floor);
        assert_eq!(transform(f32::NEG_INFINITY), floor);
    }

    #[test]
    fn test_lane_form_matches_scalar_form() {
        let inputs = [
            [1.0f32, 2.0, 3.0, 4.0],
            [0.0, -1.0, f32::NAN, 1e-40],
            [f32::INFINITY, f32::MAX, f32::MIN_POSITIVE, TRANSFORM_FLOOR],
            [7.5, 1.0e6, 0.25, 99999.0],
        ];

        for group in inputs {
            let lanes = transform_lanes(&group);
            for (lane, &x) in lanes.iter().zip(group.iter()) {
                assert_eq!(lane.to_bits(), transform(x).to_bits(), "input {}", x);
            }
        }
    }

    #[test]
    fn test_transform_is_monotonic_for_positive_inputs() {
        let mut prev = transform(1.0);
        for i in 2..1000 {
            let next = transform(i as f32);
            assert!(next >= prev);
            prev = next;
        }
    }
}
