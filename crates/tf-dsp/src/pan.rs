//! Equal-power stereo panning

use tf_core::Sample;

/// Convert a pan position in [-1, 1] to constant-power (left, right) gains.
///
/// Center yields cos(π/4) ≈ 0.707 on both sides so panning never changes
/// perceived loudness. Out-of-range input clamps.
#[inline]
pub fn equal_power_pan(pan: Sample) -> (Sample, Sample) {
    let pan = pan.clamp(-1.0, 1.0);
    let angle = (pan + 1.0) * 0.25 * std::f32::consts::PI;
    (angle.cos(), angle.sin())
}
