//! Control → render communication
//!
//! A single SPSC ring buffer carries [`RenderCommand`]s from the control
//! thread into the render callback; the only data flowing the other way is
//! the frame clock (an `AtomicU64` of frames rendered since stream start)
//! and a dropped-command counter. Neither side ever blocks.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};
use tf_core::{secs_to_frames, Frames, Sample};

use crate::{BusId, ClipPair, VoiceSpec};

/// Identifier for one music playback session
pub type SessionId = u64;

/// Commands consumed by the renderer at the start of each callback
#[derive(Debug, Clone)]
pub enum RenderCommand {
    /// Schedule-and-forget synthesized effect
    SpawnVoice(VoiceSpec),
    /// Start a music session: intro at `start_frame`, loop clip at exactly
    /// intro end, session gain ramped 0 → 1 over `fade_frames`
    StartSession {
        id: SessionId,
        clips: Arc<ClipPair>,
        start_frame: Frames,
        fade_frames: Frames,
    },
    /// Ramp a session's gain to 0 over `fade_frames`
    FadeOutSession { id: SessionId, fade_frames: Frames },
    /// Tear a session down (issued once its fade deadline has passed)
    StopSession { id: SessionId },
    /// Set a bus gain target (smoothed render-side)
    SetBusGain { bus: BusId, gain: Sample },
    /// Start (or retune) the single ambient tone
    StartAmbient { freq_hz: Sample, gain: Sample },
    /// Fade the ambient tone out and release its slot
    StopAmbient,
}

/// Output device availability, published by the graph and read wherever a
/// decision depends on whether sound can currently be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceState {
    /// No stream yet; created lazily on the first user interaction
    Uninitialized = 0,
    Running = 1,
    Suspended = 2,
    /// Device creation or resume failed; every call degrades to a no-op
    Failed = 3,
}

/// Shared cell holding a [`DeviceState`]
#[derive(Debug, Clone, Default)]
pub struct DeviceStateCell(Arc<AtomicU8>);

impl DeviceStateCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> DeviceState {
        match self.0.load(Ordering::Acquire) {
            1 => DeviceState::Running,
            2 => DeviceState::Suspended,
            3 => DeviceState::Failed,
            _ => DeviceState::Uninitialized,
        }
    }

    pub fn set(&self, state: DeviceState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Whether the device can make sound right now
    pub fn is_running(&self) -> bool {
        self.get() == DeviceState::Running
    }
}

/// Control-side handle: command producer plus the shared frame clock.
pub struct RenderLink {
    commands: Producer<RenderCommand>,
    clock: Arc<AtomicU64>,
    dropped: u64,
    sample_rate: u32,
}

/// Render-side handle, moved into the callback.
pub struct RenderQueue {
    pub(crate) commands: Consumer<RenderCommand>,
    pub(crate) clock: Arc<AtomicU64>,
}

impl RenderQueue {
    /// Pop the next pending command; never blocks. Exposed so headless
    /// hosts (and tests) can drive a renderer without a device stream.
    pub fn try_pop(&mut self) -> Option<RenderCommand> {
        self.commands.pop().ok()
    }

    /// Advance the shared frame clock without rendering.
    pub fn advance_clock(&self, frames: Frames) {
        self.clock.fetch_add(frames, Ordering::AcqRel);
    }
}

/// Create the command channel pair for one engine instance.
pub fn render_link(capacity: usize, sample_rate: u32) -> (RenderLink, RenderQueue) {
    let (tx, rx) = RingBuffer::new(capacity);
    let clock = Arc::new(AtomicU64::new(0));
    (
        RenderLink {
            commands: tx,
            clock: Arc::clone(&clock),
            dropped: 0,
            sample_rate,
        },
        RenderQueue {
            commands: rx,
            clock,
        },
    )
}

impl RenderLink {
    /// Push a command; a full queue drops the command rather than blocking.
    pub fn send(&mut self, cmd: RenderCommand) {
        if self.commands.push(cmd).is_err() {
            self.dropped += 1;
            log::warn!(
                "[RenderLink] command queue full, dropped ({} total)",
                self.dropped
            );
        }
    }

    /// Frames rendered since stream start
    #[inline]
    pub fn now(&self) -> Frames {
        self.clock.load(Ordering::Acquire)
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Convert seconds to frames at the device rate
    #[inline]
    pub fn frames(&self, secs: f64) -> Frames {
        secs_to_frames(secs, self.sample_rate)
    }

    /// Commands dropped due to a full queue
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_state_round_trip() {
        let cell = DeviceStateCell::new();
        assert_eq!(cell.get(), DeviceState::Uninitialized);
        assert!(!cell.is_running());

        cell.set(DeviceState::Running);
        assert!(cell.is_running());

        cell.set(DeviceState::Suspended);
        assert_eq!(cell.get(), DeviceState::Suspended);
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let (mut link, _queue) = render_link(2, 48000);
        for _ in 0..5 {
            link.send(RenderCommand::StopAmbient);
        }
        assert_eq!(link.dropped(), 3);
    }

    #[test]
    fn test_commands_arrive_in_order() {
        let (mut link, mut queue) = render_link(8, 48000);
        link.send(RenderCommand::StopAmbient);
        link.send(RenderCommand::SetBusGain {
            bus: BusId::Music,
            gain: 0.5,
        });

        assert!(matches!(
            queue.commands.pop(),
            Ok(RenderCommand::StopAmbient)
        ));
        assert!(matches!(
            queue.commands.pop(),
            Ok(RenderCommand::SetBusGain { .. })
        ));
    }

    #[test]
    fn test_clock_visible_through_link() {
        let (link, queue) = render_link(2, 48000);
        queue.clock.store(1234, Ordering::Release);
        assert_eq!(link.now(), 1234);
    }
}
