//! Frame/time arithmetic
//!
//! The render clock counts sample frames since stream start; control-side
//! scheduling converts seconds to frames against the device rate.

/// A position or span measured in sample frames
pub type Frames = u64;

/// Convert a duration in seconds to frames at the given rate (rounded)
#[inline]
pub fn secs_to_frames(secs: f64, sample_rate: u32) -> Frames {
    (secs * sample_rate as f64).round() as Frames
}

/// Convert a frame count to seconds at the given rate
#[inline]
pub fn frames_to_secs(frames: Frames, sample_rate: u32) -> f64 {
    frames as f64 / sample_rate as f64
}
