//! Synthesized effect voices
//!
//! A [`VoiceSpec`] is an immutable synthesis recipe: source, frequency and
//! gain envelopes, duration, destination bus, pan. The renderer turns it
//! into a [`Voice`], which renders sample-by-sample until the recipe's
//! duration elapses and then frees its slot.

use tf_core::{Frames, Sample};
use tf_dsp::{equal_power_pan, Envelope, NoiseLfsr, OnePole, Oscillator, Waveform};

use crate::BusId;

/// Sound source for a voice
#[derive(Debug, Clone)]
pub enum VoiceSource {
    /// Phase-accumulated oscillator driven by the frequency envelope
    Osc(Waveform),
    /// LFSR noise through a one-pole lowpass whose cutoff follows
    /// `cutoff_env` (Hz)
    Noise { cutoff_env: Envelope },
}

/// A complete synthesis recipe, constructed and consumed within one call
#[derive(Debug, Clone)]
pub struct VoiceSpec {
    pub source: VoiceSource,
    /// Oscillator frequency over time, Hz (ignored for noise sources)
    pub freq_env: Envelope,
    /// Gain over time, linear
    pub gain_env: Envelope,
    /// Total length, seconds
    pub duration_secs: Sample,
    /// Offset from spawn before the voice sounds, seconds
    pub start_delay_secs: Sample,
    pub bus: BusId,
    /// Stereo position in [-1, 1]
    pub pan: Sample,
}

/// Live render state for one spawned voice
#[derive(Debug, Clone)]
pub struct Voice {
    spec: VoiceSpec,
    start_frame: Frames,
    end_frame: Frames,
    pan_gains: (Sample, Sample),
    osc: Oscillator,
    noise: NoiseLfsr,
    lowpass: OnePole,
    sample_rate: Sample,
}

impl Voice {
    /// Instantiate a spec; `now` is the renderer's current frame.
    pub fn start(spec: VoiceSpec, now: Frames, sample_rate: u32) -> Self {
        let sr = sample_rate as Sample;
        let start_frame = now + (spec.start_delay_secs.max(0.0) * sr) as Frames;
        let end_frame = start_frame + (spec.duration_secs.max(0.0) * sr) as Frames;
        let pan_gains = equal_power_pan(spec.pan);
        Self {
            spec,
            start_frame,
            end_frame,
            pan_gains,
            osc: Oscillator::new(),
            noise: NoiseLfsr::new(),
            lowpass: OnePole::new(),
            sample_rate: sr,
        }
    }

    #[inline]
    pub fn bus(&self) -> BusId {
        self.spec.bus
    }

    #[inline]
    pub fn start_frame(&self) -> Frames {
        self.start_frame
    }

    /// Finished voices are removed by the renderer
    #[inline]
    pub fn is_finished(&self, now: Frames) -> bool {
        now >= self.end_frame
    }

    /// Render one frame at device frame `now` into (left, right).
    #[inline]
    pub fn render_frame(&mut self, now: Frames) -> (Sample, Sample) {
        if now < self.start_frame || now >= self.end_frame {
            return (0.0, 0.0);
        }

        let t = (now - self.start_frame) as Sample / self.sample_rate;
        let raw = match &self.spec.source {
            VoiceSource::Osc(waveform) => {
                let freq = self.spec.freq_env.value_at(t);
                self.osc.next(*waveform, freq, self.sample_rate)
            }
            VoiceSource::Noise { cutoff_env } => {
                let cutoff = cutoff_env.value_at(t);
                let coeff = OnePole::coeff_for_cutoff(cutoff, self.sample_rate);
                self.lowpass.process(self.noise.next(), coeff)
            }
        };

        let gain = self.spec.gain_env.value_at(t);
        let sample = raw * gain;
        (sample * self.pan_gains.0, sample * self.pan_gains.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tf_dsp::RampCurve;

    fn tone_spec(duration: Sample, delay: Sample) -> VoiceSpec {
        VoiceSpec {
            source: VoiceSource::Osc(Waveform::Sine),
            freq_env: Envelope::constant(440.0),
            gain_env: Envelope::constant(0.5),
            duration_secs: duration,
            start_delay_secs: delay,
            bus: BusId::Effects,
            pan: 0.0,
        }
    }

    #[test]
    fn test_voice_lifespan() {
        let mut voice = Voice::start(tone_spec(0.001, 0.0), 0, 48000);
        // 48 frames at 48 kHz
        assert!(!voice.is_finished(0));
        assert!(!voice.is_finished(47));
        assert!(voice.is_finished(48));
        assert_eq!(voice.render_frame(48), (0.0, 0.0));
    }

    #[test]
    fn test_start_delay_silences_prefix() {
        let mut voice = Voice::start(tone_spec(0.001, 0.001), 0, 48000);
        assert_eq!(voice.render_frame(0), (0.0, 0.0));
        assert_eq!(voice.render_frame(47), (0.0, 0.0));
        // First audible frame is a sine at phase 0 (zero amplitude but the
        // voice is active); the next frame must be non-zero.
        voice.render_frame(48);
        let (l, _) = voice.render_frame(49);
        assert!(l.abs() > 0.0);
    }

    #[test]
    fn test_hard_pan_kills_opposite_channel() {
        let mut spec = tone_spec(0.01, 0.0);
        spec.pan = -1.0;
        let mut voice = Voice::start(spec, 0, 48000);
        voice.render_frame(0);
        let (l, r) = voice.render_frame(1);
        assert!(l.abs() > 0.0);
        assert!(r.abs() < 1e-6);
    }

    #[test]
    fn test_gain_envelope_decays_output() {
        let spec = VoiceSpec {
            source: VoiceSource::Osc(Waveform::Square),
            freq_env: Envelope::constant(100.0),
            gain_env: Envelope::ramp(0.5, 0.001, 0.1, RampCurve::Exponential),
            duration_secs: 0.1,
            start_delay_secs: 0.0,
            bus: BusId::Effects,
            pan: 0.0,
        };
        let mut voice = Voice::start(spec, 0, 48000);
        let early = voice.render_frame(1).0.abs();
        let mut late = 0.0;
        for now in 2..4790 {
            late = voice.render_frame(now).0.abs();
        }
        assert!(early > late);
    }

    #[test]
    fn test_noise_voice_produces_signal() {
        let spec = VoiceSpec {
            source: VoiceSource::Noise {
                cutoff_env: Envelope::constant(400.0),
            },
            freq_env: Envelope::constant(0.0),
            gain_env: Envelope::constant(0.2),
            duration_secs: 0.01,
            start_delay_secs: 0.0,
            bus: BusId::Effects,
            pan: 0.0,
        };
        let mut voice = Voice::start(spec, 0, 48000);
        let energy: Sample = (0..480).map(|n| voice.render_frame(n).0.abs()).sum();
        assert!(energy > 0.0);
    }
}
