//! Music transition engine
//!
//! The core state machine of the subsystem: resolves a game phase to a
//! track, loads and caches intro/loop clip pairs, schedules gapless
//! intro→loop playback and crossfades between tracks on phase change, with
//! generation-counter protection against overlapping transitions.
//!
//! Per slot the states are `Silent`, `Loading(track, generation)` and
//! `Playing(session)`; a fading-out session is logically non-current the
//! instant a new transition begins and lives on only as a
//! [`FadingSession`] record with a teardown deadline polled by the control
//! loop.

mod engine;
mod loader;
mod tracks;

pub use engine::*;
pub use loader::*;
pub use tracks::*;
