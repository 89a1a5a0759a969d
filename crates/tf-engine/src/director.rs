//! AudioDirector — the facade the game loop talks to
//!
//! Constructed once by the application root and passed by handle.
//! Lifecycle is explicit: [`new`](AudioDirector::new) builds the control
//! structures, [`unlock`](AudioDirector::unlock) opens the device after
//! the first genuine user interaction, [`update`](AudioDirector::update)
//! pumps the control loop once per game tick.
//!
//! No entry point panics or returns an error: device trouble degrades to
//! silent no-ops, load failures fall back to silence. Audio is not allowed
//! to take the game down.

use std::sync::Arc;

use tf_stage::{GamePhase, SimEvent, Weather};

use crate::music::{FsFetcher, MusicEngine, TrackFetcher, TrackTable};
use crate::{
    ambient, dispatch_events, render_link, AudioGraph, BusId, DeviceState, DeviceStateCell,
    EngineConfig, RenderCommand, RenderLink, Renderer,
};

/// Top-level handle to the audio subsystem.
pub struct AudioDirector {
    config: EngineConfig,
    link: RenderLink,
    graph: AudioGraph,
    device: DeviceStateCell,
    music: MusicEngine,
    /// Last explicit per-bus levels, indexed by [`BusId::index`]
    volumes: [f32; 4],
    muted: bool,
    /// Last ambient request, replayed when the device comes up
    ambient_weather: Option<Weather>,
}

impl AudioDirector {
    /// Build a director with the shipped track table and filesystem assets
    /// relative to the working directory.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_assets(config, TrackTable::builtin(), Arc::new(FsFetcher::new(".")))
    }

    /// Build a director with a custom track table and fetch strategy.
    pub fn with_assets(
        config: EngineConfig,
        table: TrackTable,
        fetcher: Arc<dyn TrackFetcher>,
    ) -> Self {
        let (link, queue) = render_link(config.command_capacity, config.sample_rate.as_u32());
        let renderer = Renderer::new(queue, config.sample_rate.as_u32(), config.initial_gains);
        let device = DeviceStateCell::new();
        let graph = AudioGraph::new(config.clone(), renderer, device.clone());
        let music = MusicEngine::new(table, fetcher, device.clone(), &config);

        Self {
            volumes: config.initial_gains,
            config,
            link,
            graph,
            device,
            music,
            muted: false,
            ambient_weather: None,
        }
    }

    /// The host calls this on the first click/keypress (and may call it on
    /// every one); creates the output stream lazily and resumes a
    /// suspended one.
    pub fn unlock(&mut self) {
        let was_running = self.device.is_running();
        self.graph.unlock();
        if !was_running && self.device.is_running() {
            self.apply_volumes();
            if let Some(weather) = self.ambient_weather {
                ambient::start_ambient(&mut self.link, weather);
            }
            // Replays any phase requested before the device was permitted
            self.music.pump(&mut self.link);
        }
    }

    /// Pump the control loop; call once per game tick.
    pub fn update(&mut self) {
        self.music.pump(&mut self.link);
    }

    /// Window lost focus / app backgrounded.
    pub fn suspend(&mut self) {
        self.graph.suspend();
    }

    /// Window regained focus.
    pub fn resume(&mut self) {
        self.graph.resume();
        self.music.pump(&mut self.link);
    }

    /// Tear the stream down; further calls become no-ops.
    pub fn shutdown(&mut self) {
        self.graph.shutdown();
    }

    // ── Game-facing entry points ──

    /// Report a phase change; triggers a (possibly no-op) music transition.
    pub fn set_phase(&mut self, phase: GamePhase, level_hint: u32) {
        self.nudge_suspended();
        self.music.set_phase(&mut self.link, phase, level_hint);
    }

    /// Feed one tick's batch of simulation events.
    pub fn consume_events(&mut self, events: &[SimEvent]) {
        if events.is_empty() {
            return;
        }
        self.nudge_suspended();
        if !self.device.is_running() {
            // Upstream fires triggers without checking readiness; dropped
            return;
        }
        dispatch_events(&mut self.link, events, self.config.world_width);
    }

    /// Set a bus level; clamped to [0, 1] and remembered as the last
    /// explicit volume for unmute.
    pub fn set_volume(&mut self, bus: BusId, level: f32) {
        let level = level.clamp(0.0, 1.0);
        self.volumes[bus.index()] = level;

        if bus == BusId::Master && self.muted {
            return; // applied on unmute
        }
        if self.is_active() {
            self.link.send(RenderCommand::SetBusGain { bus, gain: level });
        }
    }

    /// Toggle mute; returns the new muted state.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        if self.is_active() {
            let gain = if self.muted {
                0.0
            } else {
                self.volumes[BusId::Master.index()]
            };
            self.link.send(RenderCommand::SetBusGain {
                bus: BusId::Master,
                gain,
            });
        }
        self.muted
    }

    /// Start (or re-level) the ambient weather bed.
    pub fn start_ambient(&mut self, weather: Weather) {
        self.ambient_weather = Some(weather);
        self.nudge_suspended();
        if self.device.is_running() {
            ambient::start_ambient(&mut self.link, weather);
        }
    }

    /// Stop the ambient bed; idempotent.
    pub fn stop_ambient(&mut self) {
        self.ambient_weather = None;
        if self.is_active() {
            ambient::stop_ambient(&mut self.link);
        }
    }

    /// Fire-and-forget warm-up of the track for `(phase, level_hint)`.
    pub fn preload(&mut self, phase: GamePhase, level_hint: u32) {
        self.music.preload(phase, level_hint);
    }

    // ── Introspection ──

    pub fn device_state(&self) -> DeviceState {
        self.device.get()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn volume(&self, bus: BusId) -> f32 {
        self.volumes[bus.index()]
    }

    /// Track id of the audible music session, for HUD display
    pub fn current_track(&self) -> Option<&str> {
        self.music.current_track()
    }

    fn is_active(&self) -> bool {
        matches!(
            self.device.get(),
            DeviceState::Running | DeviceState::Suspended
        )
    }

    /// Push the remembered levels to the renderer (used once the device
    /// comes up, since levels may have been set while locked).
    fn apply_volumes(&mut self) {
        for bus in [BusId::Effects, BusId::Ambient, BusId::Music] {
            self.link.send(RenderCommand::SetBusGain {
                bus,
                gain: self.volumes[bus.index()],
            });
        }
        let master = if self.muted {
            0.0
        } else {
            self.volumes[BusId::Master.index()]
        };
        self.link.send(RenderCommand::SetBusGain {
            bus: BusId::Master,
            gain: master,
        });
    }

    /// A call arriving while suspended attempts a resume as a side effect.
    fn nudge_suspended(&mut self) {
        if self.device.get() == DeviceState::Suspended {
            self.graph.resume();
        }
    }
}
