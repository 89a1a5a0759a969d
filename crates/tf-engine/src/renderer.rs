//! Real-time renderer
//!
//! Runs inside the output stream callback. Each callback drains the
//! command queue, renders voices/sessions/ambient into the three input
//! buses, applies smoothed bus gains, sums into master and writes
//! interleaved output. Slot storage is fixed; the callback never
//! allocates once the scratch buffers have reached the stream's block
//! size.

use std::sync::atomic::Ordering;

use tf_core::{Frames, Sample};
use tf_dsp::{OnePole, Oscillator, Waveform};

use crate::{BusId, MusicSession, RenderCommand, RenderQueue, Voice};

/// Fixed polyphony; the oldest voice is stolen when all slots are busy
pub const VOICE_SLOTS: usize = 24;

/// Concurrent sessions ceiling (current + everything still fading out)
pub const SESSION_SLOTS: usize = 8;

/// Cutoff for bus/ambient gain smoothing (~15 ms settle)
const GAIN_SMOOTH_HZ: Sample = 10.0;

/// One smoothed gain parameter
#[derive(Debug, Clone, Copy)]
struct SmoothedGain {
    current: Sample,
    target: Sample,
    coeff: Sample,
}

impl SmoothedGain {
    fn new(initial: Sample, sample_rate: Sample) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: OnePole::coeff_for_cutoff(GAIN_SMOOTH_HZ, sample_rate),
        }
    }

    #[inline]
    fn set_target(&mut self, target: Sample) {
        self.target = target.clamp(0.0, 1.0);
    }

    #[inline]
    fn step(&mut self) -> Sample {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }
}

/// The single ambient tone slot
#[derive(Debug, Clone, Copy)]
struct AmbientVoice {
    osc: Oscillator,
    freq_hz: Sample,
    gain: SmoothedGain,
    stopping: bool,
}

/// Real-time mixer state
pub struct Renderer {
    queue: RenderQueue,
    sample_rate: u32,
    frames: Frames,
    voices: Vec<Option<Voice>>,
    sessions: Vec<MusicSession>,
    ambient: Option<AmbientVoice>,
    gains: [SmoothedGain; 4],
    bus_l: [Vec<Sample>; 3],
    bus_r: [Vec<Sample>; 3],
    stolen_voices: u64,
}

impl Renderer {
    pub fn new(queue: RenderQueue, sample_rate: u32, initial_gains: [Sample; 4]) -> Self {
        let sr = sample_rate as Sample;
        Self {
            queue,
            sample_rate,
            frames: 0,
            voices: (0..VOICE_SLOTS).map(|_| None).collect(),
            sessions: Vec::with_capacity(SESSION_SLOTS),
            ambient: None,
            gains: [
                SmoothedGain::new(initial_gains[0].clamp(0.0, 1.0), sr),
                SmoothedGain::new(initial_gains[1].clamp(0.0, 1.0), sr),
                SmoothedGain::new(initial_gains[2].clamp(0.0, 1.0), sr),
                SmoothedGain::new(initial_gains[3].clamp(0.0, 1.0), sr),
            ],
            bus_l: [Vec::new(), Vec::new(), Vec::new()],
            bus_r: [Vec::new(), Vec::new(), Vec::new()],
            stolen_voices: 0,
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Voices stolen because all slots were busy
    pub fn stolen_voices(&self) -> u64 {
        self.stolen_voices
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_some()).count()
    }

    pub fn sessions(&self) -> &[MusicSession] {
        &self.sessions
    }

    /// Render one interleaved block. `channels` is the device channel
    /// count; the mix is stereo, extra channels are zero-filled and a mono
    /// device gets the average.
    pub fn render(&mut self, out: &mut [Sample], channels: usize) {
        self.drain_commands();

        let channels = channels.max(1);
        let nframes = out.len() / channels;
        self.prepare_scratch(nframes);

        self.render_voices(nframes);
        self.render_sessions(nframes);
        self.render_ambient(nframes);

        for i in 0..nframes {
            let mut l = 0.0;
            let mut r = 0.0;
            for bus in BusId::inputs() {
                let g = self.gains[bus.index()].step();
                l += self.bus_l[bus.index()][i] * g;
                r += self.bus_r[bus.index()][i] * g;
            }
            let master = self.gains[BusId::Master.index()].step();
            l *= master;
            r *= master;

            let base = i * channels;
            if channels == 1 {
                out[base] = (l + r) * 0.5;
            } else {
                out[base] = l;
                out[base + 1] = r;
                for ch in 2..channels {
                    out[base + ch] = 0.0;
                }
            }
        }

        self.frames += nframes as Frames;
        self.queue.clock.store(self.frames, Ordering::Release);
    }

    fn drain_commands(&mut self) {
        while let Ok(cmd) = self.queue.commands.pop() {
            self.handle_command(cmd);
        }
    }

    fn handle_command(&mut self, cmd: RenderCommand) {
        match cmd {
            RenderCommand::SpawnVoice(spec) => {
                let voice = Voice::start(spec, self.frames, self.sample_rate);
                self.spawn_voice(voice);
            }
            RenderCommand::StartSession {
                id,
                clips,
                start_frame,
                fade_frames,
            } => {
                if self.sessions.len() >= SESSION_SLOTS {
                    // Evict the quietest session; it is necessarily one
                    // that was already fading out.
                    if let Some(idx) = self
                        .sessions
                        .iter()
                        .enumerate()
                        .min_by(|(_, a), (_, b)| a.gain().total_cmp(&b.gain()))
                        .map(|(idx, _)| idx)
                    {
                        self.sessions.swap_remove(idx);
                    }
                }
                self.sessions.push(MusicSession::new(
                    id,
                    clips,
                    start_frame.max(self.frames),
                    fade_frames,
                    self.sample_rate,
                ));
            }
            RenderCommand::FadeOutSession { id, fade_frames } => {
                if let Some(session) = self.sessions.iter_mut().find(|s| s.id() == id) {
                    session.ramp_to(0.0, fade_frames);
                }
            }
            RenderCommand::StopSession { id } => {
                self.sessions.retain(|s| s.id() != id);
            }
            RenderCommand::SetBusGain { bus, gain } => {
                self.gains[bus.index()].set_target(gain);
            }
            RenderCommand::StartAmbient { freq_hz, gain } => {
                let sr = self.sample_rate as Sample;
                match &mut self.ambient {
                    Some(ambient) => {
                        ambient.freq_hz = freq_hz;
                        ambient.gain.set_target(gain);
                        ambient.stopping = false;
                    }
                    None => {
                        let mut smoothed = SmoothedGain::new(0.0, sr);
                        smoothed.set_target(gain);
                        self.ambient = Some(AmbientVoice {
                            osc: Oscillator::new(),
                            freq_hz,
                            gain: smoothed,
                            stopping: false,
                        });
                    }
                }
            }
            RenderCommand::StopAmbient => {
                if let Some(ambient) = &mut self.ambient {
                    ambient.gain.set_target(0.0);
                    ambient.stopping = true;
                }
            }
        }
    }

    fn spawn_voice(&mut self, voice: Voice) {
        if let Some(slot) = self.voices.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(voice);
            return;
        }
        // All busy: steal the oldest
        if let Some(slot) = self
            .voices
            .iter_mut()
            .min_by_key(|slot| slot.as_ref().map(|v| v.start_frame()).unwrap_or(0))
        {
            *slot = Some(voice);
            self.stolen_voices += 1;
        }
    }

    fn prepare_scratch(&mut self, nframes: usize) {
        for b in 0..3 {
            if self.bus_l[b].len() < nframes {
                self.bus_l[b].resize(nframes, 0.0);
                self.bus_r[b].resize(nframes, 0.0);
            }
            self.bus_l[b][..nframes].fill(0.0);
            self.bus_r[b][..nframes].fill(0.0);
        }
    }

    fn render_voices(&mut self, nframes: usize) {
        for slot in &mut self.voices {
            if let Some(voice) = slot {
                let bus = voice.bus().index();
                for i in 0..nframes {
                    let (l, r) = voice.render_frame(self.frames + i as Frames);
                    self.bus_l[bus][i] += l;
                    self.bus_r[bus][i] += r;
                }
                if voice.is_finished(self.frames + nframes as Frames) {
                    *slot = None;
                }
            }
        }
    }

    fn render_sessions(&mut self, nframes: usize) {
        let music = BusId::Music.index();
        for session in &mut self.sessions {
            for i in 0..nframes {
                let (l, r) = session.render_frame(self.frames + i as Frames);
                self.bus_l[music][i] += l;
                self.bus_r[music][i] += r;
            }
        }
    }

    fn render_ambient(&mut self, nframes: usize) {
        let Some(ambient) = &mut self.ambient else {
            return;
        };
        let sr = self.sample_rate as Sample;
        let bus = BusId::Ambient.index();
        for i in 0..nframes {
            let gain = ambient.gain.step();
            let sample = ambient.osc.next(Waveform::Sine, ambient.freq_hz, sr) * gain;
            self.bus_l[bus][i] += sample;
            self.bus_r[bus][i] += sample;
        }
        if ambient.stopping && ambient.gain.current < 1.0e-4 {
            self.ambient = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{render_link, ClipData, ClipPair, VoiceSource, VoiceSpec};
    use std::sync::Arc;
    use tf_dsp::Envelope;

    fn test_renderer(capacity: usize) -> (crate::RenderLink, Renderer) {
        let (link, queue) = render_link(capacity, 48000);
        let renderer = Renderer::new(queue, 48000, [1.0, 1.0, 1.0, 1.0]);
        (link, renderer)
    }

    fn tone(duration_secs: Sample) -> VoiceSpec {
        VoiceSpec {
            source: VoiceSource::Osc(Waveform::Square),
            freq_env: Envelope::constant(1000.0),
            gain_env: Envelope::constant(0.5),
            duration_secs,
            start_delay_secs: 0.0,
            bus: BusId::Effects,
            pan: 0.0,
        }
    }

    fn block_energy(out: &[Sample]) -> Sample {
        out.iter().map(|s| s.abs()).sum()
    }

    #[test]
    fn test_clock_advances() {
        let (link, mut renderer) = test_renderer(8);
        let mut out = vec![0.0; 256 * 2];
        renderer.render(&mut out, 2);
        renderer.render(&mut out, 2);
        assert_eq!(link.now(), 512);
    }

    #[test]
    fn test_voice_mixes_and_expires() {
        let (mut link, mut renderer) = test_renderer(8);
        link.send(RenderCommand::SpawnVoice(tone(0.004)));

        let mut out = vec![0.0; 96 * 2];
        renderer.render(&mut out, 2);
        assert!(block_energy(&out) > 0.0);
        assert_eq!(renderer.active_voices(), 1);

        // 0.004s = 192 frames; the voice ends exactly at the second block
        renderer.render(&mut out, 2);
        assert_eq!(renderer.active_voices(), 0);
    }

    #[test]
    fn test_voice_slot_stealing() {
        let (mut link, mut renderer) = test_renderer(64);
        for _ in 0..VOICE_SLOTS + 3 {
            link.send(RenderCommand::SpawnVoice(tone(1.0)));
        }
        let mut out = vec![0.0; 32 * 2];
        renderer.render(&mut out, 2);
        assert_eq!(renderer.active_voices(), VOICE_SLOTS);
        assert_eq!(renderer.stolen_voices(), 3);
    }

    #[test]
    fn test_bus_gain_silences_voice() {
        let (mut link, mut renderer) = test_renderer(8);
        link.send(RenderCommand::SetBusGain {
            bus: BusId::Effects,
            gain: 0.0,
        });
        // Let smoothing settle before the voice starts
        let mut warmup = vec![0.0; 8192 * 2];
        renderer.render(&mut warmup, 2);
        renderer.render(&mut warmup, 2);

        link.send(RenderCommand::SpawnVoice(tone(0.01)));
        let mut out = vec![0.0; 128 * 2];
        renderer.render(&mut out, 2);
        assert!(block_energy(&out) < 1.0e-3);
    }

    #[test]
    fn test_master_zero_mutes_everything() {
        let (mut link, mut renderer) = test_renderer(8);
        link.send(RenderCommand::SetBusGain {
            bus: BusId::Master,
            gain: 0.0,
        });
        link.send(RenderCommand::StartAmbient {
            freq_hz: 55.0,
            gain: 0.2,
        });
        let mut warmup = vec![0.0; 8192 * 2];
        renderer.render(&mut warmup, 2);
        renderer.render(&mut warmup, 2);

        let mut out = vec![0.0; 256 * 2];
        renderer.render(&mut out, 2);
        assert!(block_energy(&out) < 1.0e-3);
    }

    #[test]
    fn test_session_start_fade_stop_cycle() {
        let (mut link, mut renderer) = test_renderer(8);
        let clip = ClipData::mono(vec![0.5; 48000], 48000);
        let pair = Arc::new(ClipPair::new(clip.clone(), clip));

        link.send(RenderCommand::StartSession {
            id: 7,
            clips: pair,
            start_frame: 0,
            fade_frames: 0,
        });
        let mut out = vec![0.0; 128 * 2];
        renderer.render(&mut out, 2);
        assert_eq!(renderer.sessions().len(), 1);
        assert!(block_energy(&out) > 0.0);

        link.send(RenderCommand::FadeOutSession {
            id: 7,
            fade_frames: 64,
        });
        renderer.render(&mut out, 2);
        assert!(renderer.sessions()[0].gain() < 1.0e-6);

        link.send(RenderCommand::StopSession { id: 7 });
        renderer.render(&mut out, 2);
        assert!(renderer.sessions().is_empty());
    }

    #[test]
    fn test_ambient_stop_releases_slot() {
        let (mut link, mut renderer) = test_renderer(8);
        link.send(RenderCommand::StartAmbient {
            freq_hz: 55.0,
            gain: 0.1,
        });
        let mut out = vec![0.0; 512 * 2];
        renderer.render(&mut out, 2);
        assert!(renderer.ambient.is_some());

        link.send(RenderCommand::StopAmbient);
        // Give the release ramp time to decay
        for _ in 0..40 {
            renderer.render(&mut out, 2);
        }
        assert!(renderer.ambient.is_none());
    }

    #[test]
    fn test_mono_output_is_averaged() {
        let (mut link, mut renderer) = test_renderer(8);
        link.send(RenderCommand::SpawnVoice(tone(0.01)));
        let mut out = vec![0.0; 64];
        renderer.render(&mut out, 1);
        assert!(block_energy(&out) > 0.0);
    }
}
