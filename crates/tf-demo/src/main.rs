//! tf-demo — scripted battle against the real output device
//!
//! Plays a short campaign: menu music, a strategic interlude, then an
//! attack wave with synthesized launches, detonations and the defense
//! klaxon. Useful for hearing every recipe and transition path without
//! booting the game client.

use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use tf_engine::{AudioDirector, BusId, EngineConfig};
use tf_stage::{GamePhase, SimEvent, Weather};

#[derive(Parser)]
#[command(name = "tf-demo", about = "Thunderfall audio middleware demo")]
struct Args {
    /// Asset root containing the music track files
    #[arg(long, default_value = ".")]
    assets: PathBuf,

    /// Master volume in [0, 1]
    #[arg(long, default_value_t = 0.8)]
    volume: f32,

    /// Skip music transitions, play only synthesized effects
    #[arg(long)]
    effects_only: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    std::env::set_current_dir(&args.assets)?;

    let mut director = AudioDirector::new(EngineConfig::default());

    // Running the binary is the user interaction
    director.unlock();
    director.set_volume(BusId::Master, args.volume);
    director.start_ambient(Weather::Overcast);

    if !args.effects_only {
        log::info!("menu");
        director.set_phase(GamePhase::Menu, 0);
        tick(&mut director, 3000);

        log::info!("strategic map");
        director.set_phase(GamePhase::Strategic, 1);
        tick(&mut director, 3000);

        log::info!("wave incoming");
        director.set_phase(GamePhase::WaveActive, 1);
        tick(&mut director, 1000);
    }

    log::info!("battle");
    director.consume_events(&[SimEvent::WaveStarted { wave: 1 }]);
    tick(&mut director, 600);

    director.start_ambient(Weather::Storm);
    director.consume_events(&[
        SimEvent::ContactDetected { x: 200.0 },
        SimEvent::ContactDetected { x: 1100.0 },
    ]);
    tick(&mut director, 800);

    director.consume_events(&[SimEvent::MissileLaunched { x: 640.0 }]);
    tick(&mut director, 400);

    director.consume_events(&[SimEvent::MirvSplit { x: 900.0 }]);
    tick(&mut director, 400);

    director.consume_events(&[
        SimEvent::Detonation {
            x: 300.0,
            yield_kt: 0.5,
        },
        SimEvent::Detonation {
            x: 980.0,
            yield_kt: 2.5,
        },
    ]);
    tick(&mut director, 1200);

    director.consume_events(&[SimEvent::CityStruck { x: 1050.0 }]);
    director.consume_events(&[SimEvent::DefenseAlarm]);
    tick(&mut director, 1500);

    director.consume_events(&[SimEvent::WaveEnded { survived: true }]);
    tick(&mut director, 1000);

    if !args.effects_only {
        log::info!("debrief");
        director.set_phase(GamePhase::Debrief, 1);
        tick(&mut director, 3000);
    }

    director.stop_ambient();
    tick(&mut director, 500);
    director.shutdown();
    Ok(())
}

/// Run the control loop at ~60 Hz for `ms` milliseconds.
fn tick(director: &mut AudioDirector, ms: u64) {
    let ticks = ms / 16;
    for _ in 0..ticks {
        director.update();
        sleep(Duration::from_millis(16));
    }
}
