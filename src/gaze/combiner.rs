//! Binocular gaze combination
//!
//! Converts per-eye pitch/yaw angles into one unit gaze vector in the
//! device frame (+X right, +Y up, -Z forward).
//!
//! # Convention
//!
//! Pitch arrives positive-down and is negated for both eyes before
//! projection. Each eye then projects to:
//!
//! ```text
//! x =  sin(yaw) · cos(pitch)
//! y =  sin(pitch)
//! z = -cos(yaw) · cos(pitch)
//! ```
//!
//! Both eye vectors are averaged and the mean is normalized. Any non-finite
//! input angle, or a mean that cannot be normalized, yields
//! [`EyeTrackingData::fallback`] rather than a partially valid sample.

use crate::core::types::{EyeTrackingData, RawGazeSample};

/// Means shorter than this are treated as degenerate (eyes diverging 180°)
const MIN_MEAN_LENGTH: f32 = 1e-6;

/// Combine both eyes into a single published gaze sample
pub fn combine(sample: &RawGazeSample) -> EyeTrackingData {
    if !sample.is_finite() {
        return EyeTrackingData::fallback();
    }

    let left = eye_direction(sample.left_pitch, sample.left_yaw);
    let right = eye_direction(sample.right_pitch, sample.right_yaw);

    let mean = [
        (left[0] + right[0]) / 2.0,
        (left[1] + right[1]) / 2.0,
        (left[2] + right[2]) / 2.0,
    ];

    match normalize(mean) {
        Some(direction) => EyeTrackingData::tracked(direction),
        None => EyeTrackingData::fallback(),
    }
}

/// Unit direction of a single eye from angles in degrees
pub fn eye_direction(pitch_deg: f32, yaw_deg: f32) -> [f32; 3] {
    let pitch = -pitch_deg.to_radians();
    let yaw = yaw_deg.to_radians();

    let (sin_pitch, cos_pitch) = pitch.sin_cos();
    let (sin_yaw, cos_yaw) = yaw.sin_cos();

    [sin_yaw * cos_pitch, sin_pitch, -cos_yaw * cos_pitch]
}

fn normalize(v: [f32; 3]) -> Option<[f32; 3]> {
    let length = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if !length.is_finite() || length < MIN_MEAN_LENGTH {
        return None;
    }
    Some([v[0] / length, v[1] / length, v[2] / length])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_fallback(data: &EyeTrackingData) {
        assert_eq!(data.gaze_target, [0.0, 0.0, -1.0]);
        assert!(!data.valid);
        assert!(!data.tracked);
        assert!(!data.active);
    }

    #[test]
    fn test_straight_ahead() {
        let data = combine(&RawGazeSample::new(0.0, 0.0, 0.0, 0.0));
        assert!(data.valid && data.tracked && data.active);
        assert_abs_diff_eq!(data.gaze_target[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(data.gaze_target[1], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(data.gaze_target[2], -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_full_right() {
        let data = combine(&RawGazeSample::new(0.0, 90.0, 0.0, 90.0));
        assert!(data.valid);
        assert_abs_diff_eq!(data.gaze_target[0], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(data.gaze_target[1], 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(data.gaze_target[2], 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_positive_pitch_looks_down() {
        let data = combine(&RawGazeSample::binocular(30.0, 0.0));
        assert!(data.valid);
        assert!(data.gaze_target[1] < 0.0);
        assert_abs_diff_eq!(data.gaze_target[1], -0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_symmetric_eyes_match_single_eye() {
        for &(pitch, yaw) in &[(10.0, -20.0), (-35.0, 45.0), (5.5, 80.0), (-60.0, -5.0)] {
            let data = combine(&RawGazeSample::binocular(pitch, yaw));
            let single = eye_direction(pitch, yaw);
            for axis in 0..3 {
                assert_abs_diff_eq!(data.gaze_target[axis], single[axis], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_unit_length_for_finite_inputs() {
        let mut angle = -170.0_f32;
        while angle <= 170.0 {
            let sample = RawGazeSample::new(angle * 0.5, angle, -angle * 0.25, angle * 0.75);
            let data = combine(&sample);
            assert!(data.valid, "sample {:?} should be valid", sample);
            assert_abs_diff_eq!(data.magnitude(), 1.0, epsilon = 1e-5);
            angle += 7.3;
        }
    }

    #[test]
    fn test_vergence_averages_eyes() {
        // Converging eyes: yaw cancels out, result points forward
        let data = combine(&RawGazeSample::new(0.0, 10.0, 0.0, -10.0));
        assert!(data.valid);
        assert_abs_diff_eq!(data.gaze_target[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(data.gaze_target[2], -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_non_finite_inputs_fall_back() {
        let bad = [f32::NAN, f32::INFINITY, f32::NEG_INFINITY];
        for &value in &bad {
            assert_fallback(&combine(&RawGazeSample::new(value, 0.0, 0.0, 0.0)));
            assert_fallback(&combine(&RawGazeSample::new(0.0, value, 0.0, 0.0)));
            assert_fallback(&combine(&RawGazeSample::new(0.0, 0.0, value, 0.0)));
            assert_fallback(&combine(&RawGazeSample::new(0.0, 0.0, 0.0, value)));
        }
    }

    #[test]
    fn test_opposite_eyes_fall_back() {
        let data = combine(&RawGazeSample::new(0.0, 90.0, 0.0, -90.0));
        assert_fallback(&data);
    }
}
