//! Piecewise ramp envelopes
//!
//! An [`Envelope`] is an initial value plus an ordered list of
//! `(time_offset, target, curve)` keyframes. Evaluation interpolates each
//! segment with its keyframe's curve; before the first keyframe the value
//! ramps from the initial value at t = 0, after the last it holds.

use tf_core::Sample;

use crate::RampCurve;

/// One envelope keyframe: reach `target` at `time` seconds from voice start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    /// Offset from the envelope start, in seconds
    pub time: Sample,
    /// Value to reach at `time`
    pub target: Sample,
    /// Shape of the ramp leading into this keyframe
    pub curve: RampCurve,
}

impl Keyframe {
    pub fn linear(time: Sample, target: Sample) -> Self {
        Self {
            time,
            target,
            curve: RampCurve::Linear,
        }
    }

    pub fn exponential(time: Sample, target: Sample) -> Self {
        Self {
            time,
            target,
            curve: RampCurve::Exponential,
        }
    }
}

/// Immutable piecewise envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    initial: Sample,
    keyframes: Vec<Keyframe>,
}

impl Envelope {
    /// Build an envelope. Keyframe times are forced non-decreasing and
    /// non-negative so evaluation is total for any input.
    pub fn new(initial: Sample, keyframes: impl Into<Vec<Keyframe>>) -> Self {
        let mut keyframes = keyframes.into();
        let mut last = 0.0;
        for kf in &mut keyframes {
            if kf.time < last {
                kf.time = last;
            }
            last = kf.time;
        }
        Self { initial, keyframes }
    }

    /// An envelope that holds a single value forever
    pub fn constant(value: Sample) -> Self {
        Self {
            initial: value,
            keyframes: Vec::new(),
        }
    }

    /// A single ramp from `from` to `to` over `duration` seconds
    pub fn ramp(from: Sample, to: Sample, duration: Sample, curve: RampCurve) -> Self {
        Self::new(
            from,
            vec![Keyframe {
                time: duration,
                target: to,
                curve,
            }],
        )
    }

    #[inline]
    pub fn initial(&self) -> Sample {
        self.initial
    }

    #[inline]
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Final settled value (the last target, or the initial value)
    pub fn final_value(&self) -> Sample {
        self.keyframes.last().map(|kf| kf.target).unwrap_or(self.initial)
    }

    /// Largest value the envelope ever reaches at a keyframe boundary
    pub fn peak(&self) -> Sample {
        self.keyframes
            .iter()
            .map(|kf| kf.target)
            .fold(self.initial, Sample::max)
    }

    /// Evaluate the envelope at `t` seconds from its start
    pub fn value_at(&self, t: Sample) -> Sample {
        if self.keyframes.is_empty() || t <= 0.0 {
            return if t <= 0.0 {
                self.initial
            } else {
                self.final_value()
            };
        }

        let mut prev_time = 0.0;
        let mut prev_value = self.initial;
        for kf in &self.keyframes {
            if t < kf.time {
                let span = kf.time - prev_time;
                let pos = if span > 0.0 { (t - prev_time) / span } else { 1.0 };
                return kf.curve.interpolate(prev_value, kf.target, pos);
            }
            prev_time = kf.time;
            prev_value = kf.target;
        }

        prev_value
    }
}
