//! Decoded clips and music sessions
//!
//! A [`ClipPair`] is the unit the music engine caches: an intro clip and a
//! loop clip decoded to deinterleaved stereo. A [`MusicSession`] is the
//! render-side playhead over a pair. It reads intro-then-loop-forever as
//! one continuous sample stream, which is what makes the handoff gapless:
//! there is no second scheduling decision that could drift.

use std::sync::Arc;

use tf_core::{Frames, Sample};

/// Decoded audio clip, deinterleaved stereo.
///
/// Mono sources are stored with both channels pointing at the same data;
/// never mutated after decode.
#[derive(Debug, Clone)]
pub struct ClipData {
    left: Arc<[Sample]>,
    right: Arc<[Sample]>,
    sample_rate: u32,
}

impl ClipData {
    pub fn stereo(left: Vec<Sample>, right: Vec<Sample>, sample_rate: u32) -> Self {
        debug_assert_eq!(left.len(), right.len());
        Self {
            left: left.into(),
            right: right.into(),
            sample_rate,
        }
    }

    pub fn mono(samples: Vec<Sample>, sample_rate: u32) -> Self {
        let shared: Arc<[Sample]> = samples.into();
        Self {
            left: Arc::clone(&shared),
            right: shared,
            sample_rate,
        }
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.left.len()
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.num_frames() as f64 / self.sample_rate as f64
    }

    #[inline]
    fn frame(&self, i: usize) -> (Sample, Sample) {
        (self.left[i], self.right[i])
    }
}

/// Intro + loop clips for one track
#[derive(Debug, Clone)]
pub struct ClipPair {
    pub intro: ClipData,
    pub looped: ClipData,
}

impl ClipPair {
    pub fn new(intro: ClipData, looped: ClipData) -> Self {
        if intro.sample_rate() != looped.sample_rate() {
            log::warn!(
                "[ClipPair] intro/loop sample rates differ ({} vs {}); using intro's",
                intro.sample_rate(),
                looped.sample_rate()
            );
        }
        Self { intro, looped }
    }

    /// Read a frame from the virtual intro-then-loop-forever timeline.
    /// Positions past the intro wrap inside the loop clip.
    #[inline]
    fn virtual_frame(&self, pos: usize) -> (Sample, Sample) {
        let intro_len = self.intro.num_frames();
        if pos < intro_len {
            self.intro.frame(pos)
        } else {
            let loop_len = self.looped.num_frames();
            self.looped.frame((pos - intro_len) % loop_len)
        }
    }
}

/// Render-side playhead over a [`ClipPair`] with a linear gain ramp.
///
/// The read head is fractional so clips decoded at a different rate than
/// the device play at the correct pitch (linear interpolation).
#[derive(Debug, Clone)]
pub struct MusicSession {
    id: u64,
    clips: Arc<ClipPair>,
    start_frame: Frames,
    /// Fractional position on the virtual intro+loop timeline, in source frames
    src_pos: f64,
    /// Source frames advanced per device frame
    rate: f64,
    gain: Sample,
    gain_step: Sample,
    gain_target: Sample,
}

impl MusicSession {
    pub fn new(
        id: u64,
        clips: Arc<ClipPair>,
        start_frame: Frames,
        fade_frames: Frames,
        device_rate: u32,
    ) -> Self {
        let rate = clips.intro.sample_rate() as f64 / device_rate as f64;
        let mut session = Self {
            id,
            clips,
            start_frame,
            src_pos: 0.0,
            rate,
            gain: 0.0,
            gain_step: 0.0,
            gain_target: 0.0,
        };
        session.ramp_to(1.0, fade_frames);
        session
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn start_frame(&self) -> Frames {
        self.start_frame
    }

    /// Device frame at which the loop clip takes over from the intro
    pub fn loop_start_frame(&self) -> Frames {
        let intro_device_frames = (self.clips.intro.num_frames() as f64 / self.rate).round();
        self.start_frame + intro_device_frames as Frames
    }

    /// Begin a linear gain ramp toward `target` over `fade_frames`
    pub fn ramp_to(&mut self, target: Sample, fade_frames: Frames) {
        self.gain_target = target;
        if fade_frames == 0 {
            self.gain = target;
            self.gain_step = 0.0;
        } else {
            self.gain_step = (target - self.gain) / fade_frames as Sample;
        }
    }

    #[inline]
    pub fn gain(&self) -> Sample {
        self.gain
    }

    /// Mix one frame into (left, right); `now` is the device frame index.
    #[inline]
    pub fn render_frame(&mut self, now: Frames) -> (Sample, Sample) {
        if now < self.start_frame {
            return (0.0, 0.0);
        }

        let base = self.src_pos.floor();
        let frac = (self.src_pos - base) as Sample;
        let i = base as usize;
        let (l0, r0) = self.clips.virtual_frame(i);
        let (l1, r1) = self.clips.virtual_frame(i + 1);
        let l = l0 + (l1 - l0) * frac;
        let r = r0 + (r1 - r0) * frac;

        self.src_pos += self.rate;
        // Keep the position bounded: once inside the loop region fold it
        // back by whole loop lengths so f64 precision never erodes.
        let intro_len = self.clips.intro.num_frames() as f64;
        let loop_len = self.clips.looped.num_frames() as f64;
        if self.src_pos >= intro_len + loop_len {
            self.src_pos -= loop_len;
        }

        self.step_gain();
        (l * self.gain, r * self.gain)
    }

    #[inline]
    fn step_gain(&mut self) {
        if self.gain_step != 0.0 {
            self.gain += self.gain_step;
            let arrived = (self.gain_step > 0.0 && self.gain >= self.gain_target)
                || (self.gain_step < 0.0 && self.gain <= self.gain_target);
            if arrived {
                self.gain = self.gain_target;
                self.gain_step = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp_clip(len: usize, offset: f32, rate: u32) -> ClipData {
        // Distinct, recognizable sample values: offset + index
        let data: Vec<Sample> = (0..len).map(|i| offset + i as Sample).collect();
        ClipData::mono(data, rate)
    }

    #[test]
    fn test_virtual_timeline_is_gapless() {
        let pair = ClipPair::new(ramp_clip(4, 0.0, 48000), ramp_clip(3, 100.0, 48000));
        // Intro frames 0..4 then loop 100,101,102 repeating
        assert_eq!(pair.virtual_frame(3).0, 3.0);
        assert_eq!(pair.virtual_frame(4).0, 100.0);
        assert_eq!(pair.virtual_frame(6).0, 102.0);
        assert_eq!(pair.virtual_frame(7).0, 100.0);
        assert_eq!(pair.virtual_frame(10).0, 100.0);
    }

    #[test]
    fn test_session_handoff_zero_gap_zero_overlap() {
        let pair = Arc::new(ClipPair::new(
            ramp_clip(8, 0.0, 48000),
            ramp_clip(4, 50.0, 48000),
        ));
        let mut session = MusicSession::new(1, pair, 0, 0, 48000);

        let mut out = Vec::new();
        for now in 0..16 {
            out.push(session.render_frame(now).0);
        }
        // Intro samples 0..8 then immediately loop 50..54 repeating:
        // nothing skipped, nothing doubled at the boundary.
        let expected = [
            0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 50.0, 51.0, 52.0, 53.0, 50.0, 51.0, 52.0,
            53.0,
        ];
        for (got, want) in out.iter().zip(expected.iter()) {
            assert_relative_eq!(got, want);
        }
    }

    #[test]
    fn test_loop_start_frame_is_intro_end() {
        let pair = Arc::new(ClipPair::new(
            ramp_clip(48000, 0.0, 48000),
            ramp_clip(96000, 0.0, 48000),
        ));
        let session = MusicSession::new(1, pair, 1000, 0, 48000);
        assert_eq!(session.loop_start_frame(), 1000 + 48000);
    }

    #[test]
    fn test_loop_start_frame_accounts_for_rate() {
        // 22050 Hz intro on a 44100 Hz device plays at half speed
        let pair = Arc::new(ClipPair::new(
            ramp_clip(1000, 0.0, 22050),
            ramp_clip(1000, 0.0, 22050),
        ));
        let session = MusicSession::new(1, pair, 0, 0, 44100);
        assert_eq!(session.loop_start_frame(), 2000);
    }

    #[test]
    fn test_gain_ramp_reaches_target() {
        let pair = Arc::new(ClipPair::new(
            ClipData::mono(vec![1.0; 64], 48000),
            ClipData::mono(vec![1.0; 64], 48000),
        ));
        let mut session = MusicSession::new(1, pair, 0, 10, 48000);
        assert_relative_eq!(session.gain(), 0.0);
        for now in 0..10 {
            session.render_frame(now);
        }
        assert_relative_eq!(session.gain(), 1.0);

        session.ramp_to(0.0, 10);
        for now in 10..20 {
            session.render_frame(now);
        }
        assert_relative_eq!(session.gain(), 0.0);
    }

    #[test]
    fn test_session_silent_before_start_frame() {
        let pair = Arc::new(ClipPair::new(
            ClipData::mono(vec![1.0; 8], 48000),
            ClipData::mono(vec![1.0; 8], 48000),
        ));
        let mut session = MusicSession::new(1, pair, 4, 0, 48000);
        assert_eq!(session.render_frame(0), (0.0, 0.0));
        assert_eq!(session.render_frame(3), (0.0, 0.0));
        let (l, _) = session.render_frame(4);
        assert_relative_eq!(l, 1.0);
    }
}
