//! Event consumer
//!
//! Fixed dispatch table from simulation event variants to synthesis
//! recipes. Batches are processed in order; each event is independent and
//! delivered exactly once upstream, so there is nothing to correlate or
//! deduplicate here.

use tf_stage::SimEvent;

use crate::{pan_for_x, synth, RenderCommand, RenderLink, VoiceSpec};

/// Process one batch of simulation events, emitting voices for each.
pub fn dispatch_events(link: &mut RenderLink, events: &[SimEvent], world_width: f32) {
    for event in events {
        for spec in specs_for_event(event, world_width) {
            link.send(RenderCommand::SpawnVoice(spec));
        }
    }
}

/// The dispatch table itself, pure for testability.
pub fn specs_for_event(event: &SimEvent, world_width: f32) -> Vec<VoiceSpec> {
    match event {
        SimEvent::MissileLaunched { x } => synth::launch(pan_for_x(*x, world_width)),
        SimEvent::Detonation { x, yield_kt } => {
            synth::detonation(pan_for_x(*x, world_width), *yield_kt)
        }
        SimEvent::MirvSplit { x } => synth::mirv_split(pan_for_x(*x, world_width)),
        SimEvent::CityStruck { x } => synth::city_strike(pan_for_x(*x, world_width)),
        SimEvent::WaveStarted { .. } => synth::wave_chime(true),
        SimEvent::WaveEnded { survived } => synth::wave_chime(*survived),
        SimEvent::ContactDetected { x } => synth::contact_ping(pan_for_x(*x, world_width)),
        SimEvent::DefenseAlarm => synth::alarm(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_every_variant_maps_to_voices() {
        let events = [
            SimEvent::MissileLaunched { x: 0.0 },
            SimEvent::Detonation {
                x: 640.0,
                yield_kt: 2.0,
            },
            SimEvent::MirvSplit { x: 100.0 },
            SimEvent::CityStruck { x: 900.0 },
            SimEvent::WaveStarted { wave: 1 },
            SimEvent::WaveEnded { survived: false },
            SimEvent::ContactDetected { x: 1280.0 },
            SimEvent::DefenseAlarm,
        ];
        for event in &events {
            assert!(
                !specs_for_event(event, 1280.0).is_empty(),
                "no voices for {:?}",
                event
            );
        }
    }

    #[test]
    fn test_detonation_centered_at_world_center() {
        let specs = specs_for_event(
            &SimEvent::Detonation {
                x: 640.0,
                yield_kt: 2.0,
            },
            1280.0,
        );
        for spec in specs {
            assert_relative_eq!(spec.pan, 0.0);
        }
    }

    #[test]
    fn test_wave_ended_picks_chime_direction() {
        let won = specs_for_event(&SimEvent::WaveEnded { survived: true }, 1280.0);
        let lost = specs_for_event(&SimEvent::WaveEnded { survived: false }, 1280.0);
        assert!(won[0].freq_env.value_at(0.0) < won[2].freq_env.value_at(0.0));
        assert!(lost[0].freq_env.value_at(0.0) > lost[2].freq_env.value_at(0.0));
    }

    #[test]
    fn test_batch_emits_in_order() {
        let (mut link, mut queue) = crate::render_link(32, 48000);
        let events = vec![
            SimEvent::MissileLaunched { x: 0.0 },
            SimEvent::MirvSplit { x: 100.0 },
        ];
        dispatch_events(&mut link, &events, 1280.0);

        // First the launch sweep (sawtooth), then the split chirp (square)
        let first = queue.commands.pop().ok();
        let second = queue.commands.pop().ok();
        assert!(matches!(first, Some(RenderCommand::SpawnVoice(_))));
        assert!(matches!(second, Some(RenderCommand::SpawnVoice(_))));
        assert!(queue.commands.pop().is_err());
    }
}
