//! Spatial panner
//!
//! World horizontal position → stereo pan. Only synthesized effects carry
//! a world position; music and ambient stay centered.

use tf_core::Sample;

/// Map a world x coordinate to a pan value in [-1, 1].
///
/// Linear: 0 → hard left, `world_width / 2` → center, `world_width` →
/// hard right; positions outside the world clamp.
#[inline]
pub fn pan_for_x(x: Sample, world_width: Sample) -> Sample {
    if world_width <= 0.0 {
        return 0.0;
    }
    ((x / world_width) * 2.0 - 1.0).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pan_linearity() {
        assert_relative_eq!(pan_for_x(0.0, 1280.0), -1.0);
        assert_relative_eq!(pan_for_x(640.0, 1280.0), 0.0);
        assert_relative_eq!(pan_for_x(1280.0, 1280.0), 1.0);
        assert_relative_eq!(pan_for_x(320.0, 1280.0), -0.5);
    }

    #[test]
    fn test_out_of_world_clamps() {
        assert_relative_eq!(pan_for_x(-500.0, 1280.0), -1.0);
        assert_relative_eq!(pan_for_x(4000.0, 1280.0), 1.0);
    }

    #[test]
    fn test_degenerate_world_centers() {
        assert_relative_eq!(pan_for_x(100.0, 0.0), 0.0);
    }
}
