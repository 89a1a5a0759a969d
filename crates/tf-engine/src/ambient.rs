//! Ambient modulator
//!
//! One continuous low-frequency tone whose level follows the weather
//! severity the simulation reports. The renderer owns the single tone
//! slot; this module is the level table and command mapping.

use tf_core::Sample;
use tf_stage::Weather;

use crate::{RenderCommand, RenderLink};

/// Frequency of the ambient bed tone
pub const AMBIENT_FREQ_HZ: Sample = 55.0;

/// Ambient gain per weather severity; strictly increasing with severity.
pub fn ambient_gain(weather: Weather) -> Sample {
    match weather {
        Weather::Calm => 0.02,
        Weather::Overcast => 0.05,
        Weather::Storm => 0.10,
        Weather::Severe => 0.16,
    }
}

/// Replace any running ambient tone with one for `weather`.
pub fn start_ambient(link: &mut RenderLink, weather: Weather) {
    link.send(RenderCommand::StartAmbient {
        freq_hz: AMBIENT_FREQ_HZ,
        gain: ambient_gain(weather),
    });
    log::debug!("[Ambient] level set for {:?}", weather);
}

/// Stop the ambient tone; idempotent.
pub fn stop_ambient(link: &mut RenderLink) {
    link.send(RenderCommand::StopAmbient);
}
