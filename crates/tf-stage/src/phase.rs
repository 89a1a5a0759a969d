//! Game phases and weather severity

use serde::{Deserialize, Serialize};

/// Coarse game-state mode, used to select the music track.
///
/// The owning game loop reports every phase change; the audio side holds no
/// opinion about legal phase orderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Title and main menu
    Menu,
    /// Pre-wave mission briefing
    Briefing,
    /// Strategic map between waves
    Strategic,
    /// An attack wave is in progress
    WaveActive,
    /// Post-wave summary
    Debrief,
    /// Game paused (music falls silent)
    Paused,
    /// Campaign over
    GameOver,
}

/// Weather severity reported by the simulation, driving the ambient bed.
///
/// Ordered: `Calm < Overcast < Storm < Severe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    Calm,
    Overcast,
    Storm,
    Severe,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_serde_round_trip() {
        let json = serde_json::to_string(&GamePhase::WaveActive).unwrap();
        assert_eq!(json, "\"wave_active\"");
        let back: GamePhase = serde_json::from_str(&json).unwrap();
        assert_eq!(back, GamePhase::WaveActive);
    }

    #[test]
    fn test_weather_ordering() {
        assert!(Weather::Calm < Weather::Overcast);
        assert!(Weather::Overcast < Weather::Storm);
        assert!(Weather::Storm < Weather::Severe);
    }
}
