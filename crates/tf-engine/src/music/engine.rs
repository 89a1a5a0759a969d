//! The transition state machine
//!
//! Ordering rule for races: transitions are ordered by a generation
//! counter and the result of a transition is only made audible if no later
//! transition has started since. Last-writer-wins, not
//! first-to-load-wins. There is no hard cancellation: a stale load
//! finishes in the background and its result is cached but never started.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tf_core::Frames;
use tf_stage::GamePhase;

use crate::{
    ClipPair, DeviceStateCell, EngineConfig, RenderCommand, RenderLink, SessionId,
};

use super::{lookahead_phase, resolve_track, ClipLoader, TrackFetcher, TrackTable};

/// A fetch+decode worker we have not heard back from yet
struct InflightLoad {
    started: Instant,
}

/// A transition waiting for its clips
struct PendingTransition {
    track_id: String,
    generation: u64,
    phase: GamePhase,
    level_hint: u32,
}

/// The audible session; at most one exists at a time
struct CurrentTrack {
    track_id: String,
    session_id: SessionId,
}

/// A session fading toward silence, owned until its teardown deadline.
/// Logically non-current from the instant the replacing transition began.
#[derive(Debug, Clone, Copy)]
pub struct FadingSession {
    pub session_id: SessionId,
    pub deadline_frame: Frames,
}

/// Music transition engine. All methods run on the control thread; the
/// only asynchronous inputs are settled loads, drained in [`pump`].
///
/// [`pump`]: MusicEngine::pump
pub struct MusicEngine {
    table: TrackTable,
    loader: ClipLoader,
    device: DeviceStateCell,

    cache: HashMap<String, Arc<ClipPair>>,
    inflight: HashMap<String, InflightLoad>,
    pending: Option<PendingTransition>,
    current: Option<CurrentTrack>,
    fading: Vec<FadingSession>,
    pending_resume: Option<(GamePhase, u32)>,

    generation: u64,
    next_session_id: SessionId,

    crossfade_secs: f64,
    teardown_grace_secs: f64,
    load_timeout: Duration,
}

impl MusicEngine {
    pub fn new(
        table: TrackTable,
        fetcher: Arc<dyn TrackFetcher>,
        device: DeviceStateCell,
        config: &EngineConfig,
    ) -> Self {
        Self {
            table,
            loader: ClipLoader::new(fetcher),
            device,
            cache: HashMap::new(),
            inflight: HashMap::new(),
            pending: None,
            current: None,
            fading: Vec::new(),
            pending_resume: None,
            generation: 0,
            next_session_id: 1,
            crossfade_secs: config.crossfade_secs as f64,
            teardown_grace_secs: config.teardown_grace_secs as f64,
            load_timeout: Duration::from_secs_f32(config.load_timeout_secs.max(0.0)),
        }
    }

    /// Begin a transition to the track for `(phase, level_hint)`.
    ///
    /// Idempotent when the resolved track is already current; otherwise the
    /// audible session starts fading immediately and the new track becomes
    /// audible once its clips are available (and the device may play).
    pub fn set_phase(&mut self, link: &mut RenderLink, phase: GamePhase, level_hint: u32) {
        // A new request supersedes anything parked while the device was
        // locked; it is re-armed below if this one must defer too.
        self.pending_resume = None;

        let desired = resolve_track(phase, level_hint);

        let current_id = self.current.as_ref().map(|c| c.track_id.as_str());
        if desired == current_id {
            // Already playing (or already silent with nothing on the way):
            // no envelope restart, no reload.
            if desired.is_some() || self.pending.is_none() {
                return;
            }
        }

        self.generation += 1;
        let generation = self.generation;
        log::debug!(
            "[Music] transition g{} for {:?} (hint {}) -> {:?}",
            generation,
            phase,
            level_hint,
            desired
        );

        self.begin_fade_out(link);

        let Some(track_id) = desired else {
            self.pending = None;
            return;
        };

        if let Some(clips) = self.cache.get(track_id).cloned() {
            self.pending = None;
            self.try_start(link, track_id.to_string(), clips, phase, level_hint);
        } else {
            self.pending = Some(PendingTransition {
                track_id: track_id.to_string(),
                generation,
                phase,
                level_hint,
            });
            self.ensure_loading(track_id);
        }
    }

    /// Fire-and-forget warm-up of the track for `(phase, level_hint)`.
    pub fn preload(&mut self, phase: GamePhase, level_hint: u32) {
        if let Some(track_id) = resolve_track(phase, level_hint) {
            self.ensure_loading(track_id);
        }
    }

    /// Control-loop pump: settle loads, expire fades, time out stuck
    /// workers, replay the pending-resume phase. Call once per game tick.
    pub fn pump(&mut self, link: &mut RenderLink) {
        while let Some(settled) = self.loader.try_recv() {
            self.on_load_settled(link, settled.track_id, settled.result);
        }

        self.expire_stale_loads();
        self.teardown_finished_fades(link);

        if self.pending_resume.is_some() && self.device.is_running() {
            if let Some((phase, level_hint)) = self.pending_resume.take() {
                log::debug!("[Music] device available, replaying {:?}", phase);
                self.set_phase(link, phase, level_hint);
            }
        }
    }

    fn on_load_settled(
        &mut self,
        link: &mut RenderLink,
        track_id: String,
        result: Result<ClipPair, crate::LoadError>,
    ) {
        let was_tracked = self.inflight.remove(&track_id).is_some();

        match result {
            Ok(pair) => {
                if !was_tracked {
                    log::debug!("[Music] late result for '{track_id}', cached anyway");
                }
                // Cache entries are written once and never replaced
                let clips = self
                    .cache
                    .entry(track_id.clone())
                    .or_insert_with(|| Arc::new(pair))
                    .clone();

                let Some(pending) = self.pending.take() else {
                    return;
                };
                if pending.track_id != track_id {
                    self.pending = Some(pending);
                    return;
                }
                // The generation must be read now, at settle time; a newer
                // transition may have started while this load was in flight.
                if pending.generation != self.generation {
                    log::debug!(
                        "[Music] discarding stale transition g{} to '{track_id}'",
                        pending.generation
                    );
                    return;
                }
                self.try_start(link, pending.track_id, clips, pending.phase, pending.level_hint);
            }
            Err(err) => {
                log::warn!("[Music] load of '{track_id}' failed, staying silent: {err}");
                if self
                    .pending
                    .as_ref()
                    .is_some_and(|p| p.track_id == track_id)
                {
                    self.pending = None;
                }
            }
        }
    }

    /// Fade the audible session out and clear the current pointer
    /// synchronously; teardown happens at the deadline via [`pump`].
    ///
    /// [`pump`]: MusicEngine::pump
    fn begin_fade_out(&mut self, link: &mut RenderLink) {
        if let Some(current) = self.current.take() {
            let fade_frames = link.frames(self.crossfade_secs);
            link.send(RenderCommand::FadeOutSession {
                id: current.session_id,
                fade_frames,
            });
            self.fading.push(FadingSession {
                session_id: current.session_id,
                deadline_frame: link.now() + fade_frames + link.frames(self.teardown_grace_secs),
            });
        }
    }

    /// Start playback now, or defer it if the device cannot produce sound.
    fn try_start(
        &mut self,
        link: &mut RenderLink,
        track_id: String,
        clips: Arc<ClipPair>,
        phase: GamePhase,
        level_hint: u32,
    ) {
        if !self.device.is_running() {
            log::debug!("[Music] device not ready, deferring {:?}", phase);
            self.pending_resume = Some((phase, level_hint));
            return;
        }

        let session_id = self.next_session_id;
        self.next_session_id += 1;

        link.send(RenderCommand::StartSession {
            id: session_id,
            clips,
            start_frame: link.now(),
            fade_frames: link.frames(self.crossfade_secs),
        });
        log::info!("[Music] now playing '{track_id}'");
        self.current = Some(CurrentTrack {
            track_id,
            session_id,
        });

        // Hide the next transition's load latency
        if let Some(next_phase) = lookahead_phase(phase) {
            if let Some(next_track) = resolve_track(next_phase, level_hint) {
                self.ensure_loading(next_track);
            }
        }
    }

    /// Exactly one fetch+decode per track id, no matter how many callers.
    fn ensure_loading(&mut self, track_id: &str) {
        if self.cache.contains_key(track_id) || self.inflight.contains_key(track_id) {
            return;
        }
        let Some(def) = self.table.get(track_id) else {
            log::error!("[Music] unknown track '{track_id}'");
            if self
                .pending
                .as_ref()
                .is_some_and(|p| p.track_id == track_id)
            {
                self.pending = None;
            }
            return;
        };
        self.inflight
            .insert(track_id.to_string(), InflightLoad {
                started: Instant::now(),
            });
        self.loader.spawn_load(def);
    }

    /// Abandon in-flight loads older than the timeout. A late success from
    /// the worker is still cached by [`pump`] but never started unless a
    /// new transition asks for it.
    ///
    /// [`pump`]: MusicEngine::pump
    fn expire_stale_loads(&mut self) {
        let timeout = self.load_timeout;
        let expired: Vec<String> = self
            .inflight
            .iter()
            .filter(|(_, load)| load.started.elapsed() > timeout)
            .map(|(id, _)| id.clone())
            .collect();

        for track_id in expired {
            self.inflight.remove(&track_id);
            log::warn!("[Music] load of '{track_id}' timed out, abandoning");
            if self
                .pending
                .as_ref()
                .is_some_and(|p| p.track_id == track_id)
            {
                self.pending = None;
            }
        }
    }

    fn teardown_finished_fades(&mut self, link: &mut RenderLink) {
        let now = link.now();
        let mut i = 0;
        while i < self.fading.len() {
            if self.fading[i].deadline_frame <= now {
                let finished = self.fading.swap_remove(i);
                link.send(RenderCommand::StopSession {
                    id: finished.session_id,
                });
            } else {
                i += 1;
            }
        }
    }

    // ── Introspection (used by the director and the test suite) ──

    /// Track id of the audible session, if any
    pub fn current_track(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.track_id.as_str())
    }

    /// Track id the engine is waiting on clips for, if any
    pub fn pending_track(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.track_id.as_str())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cached(&self, track_id: &str) -> bool {
        self.cache.contains_key(track_id)
    }

    pub fn inflight_count(&self) -> usize {
        self.inflight.len()
    }

    pub fn fading_sessions(&self) -> &[FadingSession] {
        &self.fading
    }

    pub fn has_pending_resume(&self) -> bool {
        self.pending_resume.is_some()
    }
}
