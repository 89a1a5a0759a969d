//! Synthesis recipe library
//!
//! Every gameplay sound is a short parametric recipe over oscillators and
//! noise; there are no recorded effect assets anywhere in the game. Each
//! function here is pure: parameters in, [`VoiceSpec`]s out. Dispatch
//! (`crate::events`) sends the specs to the renderer; multi-part effects
//! (detonation layers, chime notes, alarm pulses) are several voices with
//! staggered start delays.

use tf_core::Sample;
use tf_dsp::{Envelope, Keyframe, RampCurve, Waveform};

use crate::{BusId, VoiceSource, VoiceSpec};

/// Intensity scalars outside this range are clamped before use
pub const INTENSITY_RANGE: (Sample, Sample) = (0.25, 4.0);

/// Chime pitches, low to high (C5, E5, G5)
const CHIME_PITCHES: [Sample; 3] = [523.25, 659.25, 783.99];

/// Alarm pulse pitches, alternating
const ALARM_PITCHES: [Sample; 2] = [880.0, 660.0];

#[inline]
fn clamp_intensity(intensity: Sample) -> Sample {
    intensity.clamp(INTENSITY_RANGE.0, INTENSITY_RANGE.1)
}

/// Interceptor leaving its silo: rising sawtooth sweep.
pub fn launch(pan: Sample) -> Vec<VoiceSpec> {
    vec![VoiceSpec {
        source: VoiceSource::Osc(Waveform::Sawtooth),
        freq_env: Envelope::ramp(200.0, 800.0, 0.2, RampCurve::Exponential),
        gain_env: Envelope::ramp(0.3, 0.01, 0.2, RampCurve::Exponential),
        duration_secs: 0.2,
        start_delay_secs: 0.0,
        bus: BusId::Effects,
        pan,
    }]
}

/// Warhead burst: a sub-bass sine drop layered with a darkening noise
/// wash. `intensity` scales peak gain linearly and stretches the tone
/// envelope.
pub fn detonation(pan: Sample, intensity: Sample) -> Vec<VoiceSpec> {
    let intensity = clamp_intensity(intensity);
    let tone_secs = 0.5 * intensity;
    let tone_peak = (0.4 * intensity).min(1.0);
    let noise_peak = (0.3 * intensity).min(1.0);

    vec![
        VoiceSpec {
            source: VoiceSource::Osc(Waveform::Sine),
            freq_env: Envelope::ramp(60.0, 20.0, tone_secs, RampCurve::Exponential),
            gain_env: Envelope::ramp(tone_peak, 0.001, tone_secs, RampCurve::Exponential),
            duration_secs: tone_secs,
            start_delay_secs: 0.0,
            bus: BusId::Effects,
            pan,
        },
        VoiceSpec {
            source: VoiceSource::Noise {
                cutoff_env: Envelope::ramp(2000.0, 200.0, 0.5, RampCurve::Exponential),
            },
            freq_env: Envelope::constant(0.0),
            gain_env: Envelope::ramp(noise_peak, 0.001, 0.5, RampCurve::Exponential),
            duration_secs: 0.5,
            start_delay_secs: 0.0,
            bus: BusId::Effects,
            pan,
        },
    ]
}

/// City block destroyed: dull rumble of fixed-color noise.
pub fn city_strike(pan: Sample) -> Vec<VoiceSpec> {
    vec![VoiceSpec {
        source: VoiceSource::Noise {
            cutoff_env: Envelope::constant(400.0),
        },
        freq_env: Envelope::constant(0.0),
        gain_env: Envelope::ramp(0.2, 0.0, 0.6, RampCurve::Linear),
        duration_secs: 0.6,
        start_delay_secs: 0.0,
        bus: BusId::Effects,
        pan,
    }]
}

/// Three-note triangle chime; `ascending` selects the direction.
pub fn wave_chime(ascending: bool) -> Vec<VoiceSpec> {
    let mut pitches = CHIME_PITCHES;
    if !ascending {
        pitches.reverse();
    }

    pitches
        .iter()
        .enumerate()
        .map(|(i, &pitch)| VoiceSpec {
            source: VoiceSource::Osc(Waveform::Triangle),
            freq_env: Envelope::constant(pitch),
            gain_env: Envelope::new(
                0.0,
                vec![
                    Keyframe::linear(0.01, 0.25),
                    Keyframe::exponential(0.2, 0.001),
                ],
            ),
            duration_secs: 0.2,
            start_delay_secs: i as Sample * 0.12,
            bus: BusId::Effects,
            pan: 0.0,
        })
        .collect()
}

/// Warhead splitting into independent re-entry vehicles: fast square chirp
/// falling through two octaves.
pub fn mirv_split(pan: Sample) -> Vec<VoiceSpec> {
    vec![VoiceSpec {
        source: VoiceSource::Osc(Waveform::Square),
        freq_env: Envelope::ramp(1200.0, 200.0, 0.1, RampCurve::Exponential),
        gain_env: Envelope::ramp(0.25, 0.01, 0.1, RampCurve::Exponential),
        duration_secs: 0.1,
        start_delay_secs: 0.0,
        bus: BusId::Effects,
        pan,
    }]
}

/// Early-warning radar contact: rising sine ping.
pub fn contact_ping(pan: Sample) -> Vec<VoiceSpec> {
    vec![VoiceSpec {
        source: VoiceSource::Osc(Waveform::Sine),
        freq_env: Envelope::ramp(800.0, 1200.0, 0.25, RampCurve::Exponential),
        gain_env: Envelope::ramp(0.4, 0.001, 0.25, RampCurve::Exponential),
        duration_secs: 0.25,
        start_delay_secs: 0.0,
        bus: BusId::Effects,
        pan,
    }]
}

/// Defense klaxon: six square pulses on two alternating pitches.
pub fn alarm() -> Vec<VoiceSpec> {
    (0..6)
        .map(|i| VoiceSpec {
            source: VoiceSource::Osc(Waveform::Square),
            freq_env: Envelope::constant(ALARM_PITCHES[i % 2]),
            gain_env: Envelope::new(
                0.0,
                vec![
                    Keyframe::linear(0.01, 0.3),
                    Keyframe::linear(0.12, 0.3),
                    Keyframe::linear(0.15, 0.0),
                ],
            ),
            duration_secs: 0.15,
            start_delay_secs: i as Sample * 0.15,
            bus: BusId::Effects,
            pan: 0.0,
        })
        .collect()
}
