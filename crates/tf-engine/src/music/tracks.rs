//! Track definitions, phase resolution and lookahead
//!
//! Static configuration, read-only at runtime. A built-in table covers the
//! shipped campaign; hosts can replace it with a JSON manifest.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tf_stage::GamePhase;

/// One musical piece: an intro clip and a seamlessly loopable body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDefinition {
    pub id: String,
    pub intro_url: String,
    pub loop_url: String,
}

/// All known tracks, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct TrackTable {
    tracks: HashMap<String, TrackDefinition>,
}

impl TrackTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shipped campaign tracks.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for id in [
            "menu_theme",
            "briefing",
            "strategic_calm",
            "strategic_tense",
            "assault",
            "assault_heavy",
            "debrief",
            "aftermath",
        ] {
            table.register(TrackDefinition {
                id: id.to_string(),
                intro_url: format!("assets/music/{id}_intro.ogg"),
                loop_url: format!("assets/music/{id}_loop.ogg"),
            });
        }
        table
    }

    /// Parse a manifest: a JSON array of track definitions.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let tracks: Vec<TrackDefinition> = serde_json::from_str(json)?;
        let mut table = Self::new();
        for def in tracks {
            table.register(def);
        }
        Ok(table)
    }

    pub fn register(&mut self, def: TrackDefinition) {
        self.tracks.insert(def.id.clone(), def);
    }

    pub fn get(&self, id: &str) -> Option<&TrackDefinition> {
        self.tracks.get(id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Resolve a phase (plus the campaign-intensity hint) to a track id.
/// `None` means silence, e.g. the pause screen.
pub fn resolve_track(phase: GamePhase, level_hint: u32) -> Option<&'static str> {
    match phase {
        GamePhase::Menu => Some("menu_theme"),
        GamePhase::Briefing => Some("briefing"),
        GamePhase::Strategic => {
            if level_hint >= 3 {
                Some("strategic_tense")
            } else {
                Some("strategic_calm")
            }
        }
        GamePhase::WaveActive => {
            if level_hint >= 3 {
                Some("assault_heavy")
            } else {
                Some("assault")
            }
        }
        GamePhase::Debrief => Some("debrief"),
        GamePhase::GameOver => Some("aftermath"),
        GamePhase::Paused => None,
    }
}

/// The phase most likely to follow `phase`, used for speculative preloads.
pub fn lookahead_phase(phase: GamePhase) -> Option<GamePhase> {
    match phase {
        GamePhase::Menu => Some(GamePhase::Briefing),
        GamePhase::Briefing => Some(GamePhase::Strategic),
        GamePhase::Strategic => Some(GamePhase::WaveActive),
        GamePhase::WaveActive => Some(GamePhase::Debrief),
        GamePhase::Debrief => Some(GamePhase::Strategic),
        GamePhase::GameOver => Some(GamePhase::Menu),
        GamePhase::Paused => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_every_resolvable_track() {
        let table = TrackTable::builtin();
        for phase in [
            GamePhase::Menu,
            GamePhase::Briefing,
            GamePhase::Strategic,
            GamePhase::WaveActive,
            GamePhase::Debrief,
            GamePhase::GameOver,
        ] {
            for hint in [0, 3] {
                let id = resolve_track(phase, hint).unwrap();
                assert!(table.get(id).is_some(), "missing track {id}");
            }
        }
    }

    #[test]
    fn test_paused_resolves_to_silence() {
        assert_eq!(resolve_track(GamePhase::Paused, 0), None);
        assert_eq!(lookahead_phase(GamePhase::Paused), None);
    }

    #[test]
    fn test_level_hint_switches_variant() {
        assert_eq!(
            resolve_track(GamePhase::WaveActive, 0),
            Some("assault")
        );
        assert_eq!(
            resolve_track(GamePhase::WaveActive, 4),
            Some("assault_heavy")
        );
    }

    #[test]
    fn test_manifest_round_trip() {
        let json = r#"[
            {"id": "menu_theme", "intro_url": "m_i.ogg", "loop_url": "m_l.ogg"}
        ]"#;
        let table = TrackTable::from_json(json).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("menu_theme").unwrap().intro_url, "m_i.ogg");
    }
}
