//! SimEvent — discrete simulation occurrences that map to sound
//!
//! The simulation delivers each event exactly once, in order, batched per
//! tick. Events are independent of one another; the audio side never has
//! to correlate them.

use serde::{Deserialize, Serialize};

/// A discrete simulation event record.
///
/// Horizontal positions (`x`) are world coordinates; the audio side maps
/// them to stereo pan against the world width it was configured with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    /// Player interceptor left its silo
    MissileLaunched {
        x: f32,
    },

    /// Warhead burst, ours or theirs
    Detonation {
        x: f32,
        /// Explosive yield in kilotons; scales the effect's intensity
        #[serde(default = "default_yield")]
        yield_kt: f32,
    },

    /// Inbound warhead split into independent re-entry vehicles
    MirvSplit {
        x: f32,
    },

    /// A city block was destroyed
    CityStruck {
        x: f32,
    },

    /// A new attack wave began
    WaveStarted {
        wave: u32,
    },

    /// The wave ended; `survived` selects the rising or falling chime
    WaveEnded {
        survived: bool,
    },

    /// Early-warning radar picked up a new contact
    ContactDetected {
        x: f32,
    },

    /// Silos depleted or a city is undefended
    DefenseAlarm,
}

fn default_yield() -> f32 {
    1.0
}
