//! # tf-engine — the Thunderfall audio subsystem
//!
//! Turns discrete gameplay signals into sound with no pre-recorded
//! sound-effect assets: effects are synthesized from oscillators and noise
//! on demand, background music plays precomputed intro/loop clip pairs per
//! game phase, crossfaded as the phase changes.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐ commands ┌──────────┐ f32 frames ┌─────────────┐
//! │ AudioDirector │─────────▶│ Renderer │───────────▶│ cpal stream │
//! │  (game loop)  │  (rtrb)  │ (RT mix) │            │  (device)   │
//! └──────┬────────┘          └──────────┘            └─────────────┘
//!        │ spawn/settle
//!        ▼
//! ┌───────────────┐
//! │  ClipLoader   │  worker threads: fetch + decode, results over
//! │  (workers)    │  crossbeam-channel, drained by the control loop
//! └───────────────┘
//! ```
//!
//! The control thread (the game loop calling [`AudioDirector`]) never
//! blocks: clip loads run on worker threads, render-side state changes
//! travel over a lock-free ring buffer, and the only data read back across
//! the real-time boundary is the frame clock.

mod ambient;
mod bus;
mod clip;
mod command;
mod director;
mod error;
mod events;
mod graph;
pub mod music;
mod renderer;
mod spatial;
pub mod synth;
mod voice;

pub use ambient::*;
pub use bus::*;
pub use clip::*;
pub use command::*;
pub use director::*;
pub use error::*;
pub use events::*;
pub use graph::*;
pub use renderer::*;
pub use spatial::*;
pub use voice::*;

use serde::{Deserialize, Serialize};
use tf_core::{BufferSize, SampleRate};

/// Engine configuration, fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub sample_rate: SampleRate,
    pub buffer_size: BufferSize,
    /// Horizontal world extent used by the spatial panner
    pub world_width: f32,
    /// Crossfade duration `D` for music transitions, seconds
    pub crossfade_secs: f32,
    /// Extra grace after a fade-out before the session is torn down
    pub teardown_grace_secs: f32,
    /// In-flight clip loads older than this are abandoned
    pub load_timeout_secs: f32,
    /// Initial bus gains, indexed by [`BusId::index`]
    pub initial_gains: [f32; 4],
    /// Capacity of the control → render command queue
    pub command_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: SampleRate::default(),
            buffer_size: BufferSize::default(),
            world_width: 1280.0,
            crossfade_secs: 1.0,
            teardown_grace_secs: 0.1,
            load_timeout_secs: 15.0,
            initial_gains: [0.8, 0.6, 0.7, 1.0],
            command_capacity: 256,
        }
    }
}
