use std::cell::Cell;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::engine::{EngineEvent, EngineHandle, PlaybackEngine};
use crate::error::{Error, Result};
use crate::progress::{self, EngineSample, Snapshot};
use crate::resolver::{LevelOutcome, LevelRequest, ResolveOutcome, ResolveRequest};
use crate::timeline::{MAX_SILENCE_SECONDS, SourceRef, Timeline, Track, TrackId};

use super::clock::{Clock, SystemClock};
use super::state::{Phase, SequencerState};
use super::timers::{TimerKind, TimerQueue};
use super::transition::{self, Context, Effect, Event, Step};

/// Owns the timeline, the single engine handle and every timer of one
/// play-through session.
///
/// All calls happen on one thread. Each event runs to completion; events
/// raised while executing effects are queued and handled afterwards.
pub struct Sequencer<E: PlaybackEngine, C: Clock = SystemClock> {
    timeline: Timeline,
    engine: Option<E>,
    clock: C,
    state: SequencerState,
    handle: Option<EngineHandle>,
    timers: TimerQueue,
    tick: Duration,
    deferred: VecDeque<Event>,
    /// Highest elapsed value reported in the current play-through.
    elapsed_floor: Cell<f64>,
    dirty: bool,
    warned_no_engine: bool,
}

impl<E: PlaybackEngine, C: Clock> Sequencer<E, C> {
    /// `engine` is `None` when no audio output could be opened; the timeline
    /// still works but every play request fails.
    pub fn new(timeline: Timeline, engine: Option<E>, clock: C, tick: Duration) -> Self {
        Self {
            timeline,
            engine,
            clock,
            state: SequencerState::default(),
            handle: None,
            timers: TimerQueue::new(),
            tick,
            deferred: VecDeque::new(),
            elapsed_floor: Cell::new(0.0),
            dirty: true,
            warned_no_engine: false,
        }
    }

    /// Cancel timers, release the engine and hand the timeline back.
    pub fn dispose(mut self) -> Timeline {
        self.timers.cancel_all();
        self.release();
        info!(tracks = self.timeline.len(), "sequencer disposed");
        self.timeline
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    // ---- timeline edits --------------------------------------------------

    pub fn append(&mut self, source: SourceRef) -> TrackId {
        self.dirty = true;
        self.timeline.append(source)
    }

    pub fn remove(&mut self, index: usize) -> Result<Track> {
        let track = self.timeline.remove(index)?;
        debug!(index, track = %track.id, "track removed");
        self.user_action();
        self.dispatch(Event::TrackRemoved(index));
        Ok(track)
    }

    pub fn move_track(&mut self, from: usize, to: usize) -> Result<()> {
        self.timeline.move_track(from, to)?;
        self.user_action();
        self.dispatch(Event::TrackMoved { from, to });
        Ok(())
    }

    pub fn clear(&mut self) {
        let removed = self.timeline.clear();
        debug!(count = removed.len(), "timeline cleared");
        self.user_action();
        self.dispatch(Event::Cleared);
    }

    pub fn set_gap_seconds(&mut self, value: f64) -> f64 {
        self.user_action();
        self.timeline.set_gap_seconds(value)
    }

    pub fn set_lead_seconds(&mut self, value: f64) -> f64 {
        self.user_action();
        self.timeline.set_lead_seconds(value)
    }

    /// Set a track's level trim, applying it at once if that track is loaded.
    pub fn set_adjust_db(&mut self, index: usize, db: f64) -> Result<f64> {
        let db = self.timeline.set_adjust_db(index, db)?;
        if self.state.current == Some(index) {
            if let (Some(engine), Some(handle)) = (self.engine.as_mut(), self.handle) {
                engine.set_volume(handle, crate::timeline::gain_for_db(db));
            }
        }
        self.dirty = true;
        Ok(db)
    }

    // ---- duration resolution ---------------------------------------------

    /// Build a probe request for `id` with a fresh ticket.
    pub fn resolution_request(&mut self, id: TrackId) -> Option<ResolveRequest> {
        let ticket = self.timeline.issue_ticket(id)?;
        let index = self.timeline.position(id)?;
        let source = self.timeline.get(index)?.source.clone();
        Some(ResolveRequest {
            track: id,
            ticket,
            source,
        })
    }

    pub fn apply_resolution(&mut self, outcome: ResolveOutcome) {
        let ResolveOutcome {
            track,
            ticket,
            result,
        } = outcome;
        match self.timeline.apply_resolution(track, ticket, result) {
            Ok(state) => {
                debug!(%track, ?state, "resolution applied");
                self.dirty = true;
            }
            Err(Error::StaleResolution(id)) => debug!(track = %id, "discarding stale resolution"),
            Err(e) => warn!(%track, error = %e, "could not apply resolution"),
        }
    }

    /// Build a level check request for `id`.
    pub fn level_request(&self, id: TrackId) -> Option<LevelRequest> {
        let index = self.timeline.position(id)?;
        let source = self.timeline.get(index)?.source.clone();
        Some(LevelRequest { track: id, source })
    }

    /// Level check requests for every track, in timeline order.
    pub fn level_requests(&self) -> Vec<LevelRequest> {
        self.timeline
            .tracks()
            .iter()
            .map(|t| LevelRequest {
                track: t.id,
                source: t.source.clone(),
            })
            .collect()
    }

    pub fn apply_levels(&mut self, outcome: LevelOutcome) {
        let LevelOutcome { track, result } = outcome;
        let levels = match result {
            Ok(levels) => Some(levels),
            Err(e) => {
                debug!(%track, error = %e, "level check failed");
                None
            }
        };
        if self.timeline.apply_levels(track, levels) {
            self.dirty = true;
        } else {
            debug!(%track, "discarding levels for removed track");
        }
    }

    // ---- playback control ------------------------------------------------

    pub fn select_and_play(&mut self, index: usize) -> Result<()> {
        self.require_engine()?;
        self.check_index(index)?;
        self.user_action();
        self.dispatch(Event::SelectAndPlay(index));
        Ok(())
    }

    /// Load a track paused without starting it.
    pub fn select_only(&mut self, index: usize) -> Result<()> {
        self.require_engine()?;
        self.check_index(index)?;
        self.user_action();
        self.dispatch(Event::SelectOnly(index));
        Ok(())
    }

    pub fn toggle_play_pause(&mut self) -> Result<()> {
        self.require_engine()?;
        self.user_action();
        self.dispatch(Event::TogglePlayPause);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.user_action();
        self.dispatch(Event::Stop);
    }

    /// Jump to `ratio` of the current track. Ignored unless a track with a
    /// known duration is loaded.
    pub fn seek_ratio(&mut self, ratio: f64) -> Result<()> {
        self.require_engine()?;
        if self.state.phase != Phase::Playing || !ratio.is_finite() {
            return Ok(());
        }
        let Some(duration) = self
            .state
            .current
            .and_then(|i| self.timeline.get(i))
            .and_then(Track::known_duration)
        else {
            return Ok(());
        };
        let Some(handle) = self.handle else {
            return Ok(());
        };
        if let Some(engine) = self.engine.as_mut() {
            engine.seek(handle, ratio.clamp(0.0, 1.0) * duration)?;
        }
        self.user_action();
        Ok(())
    }

    // ---- runtime hooks ---------------------------------------------------

    /// Handle engine events and due timers. Returns whether anything the UI
    /// shows may have changed.
    pub fn poll(&mut self) -> bool {
        let events = self
            .engine
            .as_mut()
            .map(|e| e.poll_events())
            .unwrap_or_default();
        for event in events {
            self.on_engine_event(event);
        }

        loop {
            let now = self.clock.now();
            let Some((_, kind)) = self.timers.pop_due(now) else {
                break;
            };
            self.dirty = true;
            if kind == TimerKind::PhaseEnd {
                self.dispatch(Event::PhaseElapsed);
            }
        }
        std::mem::take(&mut self.dirty)
    }

    /// When `poll` next has timer work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn snapshot(&self) -> Snapshot {
        let now = self.clock.now();
        let mut snap = progress::compute(&self.timeline, &self.state, &self.sample(), now);
        if self.state.phase == Phase::Idle {
            self.elapsed_floor.set(0.0);
        } else {
            snap.elapsed_seconds = snap.elapsed_seconds.max(self.elapsed_floor.get());
            self.elapsed_floor.set(snap.elapsed_seconds);
        }
        snap
    }

    pub fn track_progress(&self, index: usize) -> f64 {
        progress::track_progress(&self.timeline, &self.state, &self.sample(), index)
    }

    // ---- internals -------------------------------------------------------

    fn sample(&self) -> EngineSample {
        match (self.engine.as_ref(), self.handle) {
            (Some(engine), Some(handle)) => EngineSample {
                position: engine.position(handle),
                duration: engine.duration(handle),
                playing: engine.is_playing(handle),
            },
            _ => EngineSample::default(),
        }
    }

    fn context(&self) -> Context {
        Context {
            track_count: self.timeline.len(),
            gap_seconds: self.timeline.gap_seconds(),
            lead_seconds: self.timeline.lead_seconds(),
            engine_playing: self.sample().playing,
            now: self.clock.now(),
        }
    }

    fn require_engine(&mut self) -> Result<()> {
        if self.engine.is_some() {
            return Ok(());
        }
        if !self.warned_no_engine {
            warn!("no playback engine; play controls are disabled");
            self.warned_no_engine = true;
        }
        Err(Error::PlaybackEngineUnavailable(
            "no audio output device".to_string(),
        ))
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.timeline.len() {
            return Err(Error::InvalidSelection {
                index,
                len: self.timeline.len(),
            });
        }
        Ok(())
    }

    fn user_action(&mut self) {
        self.elapsed_floor.set(0.0);
        self.dirty = true;
    }

    fn dispatch(&mut self, event: Event) {
        self.deferred.push_back(event);
        while let Some(event) = self.deferred.pop_front() {
            let ctx = self.context();
            let Step { state, effects } = transition::step(self.state, event, &ctx);
            if state.phase != self.state.phase || state.current != self.state.current {
                debug!(
                    ?event,
                    from = self.state.phase.label(),
                    to = state.phase.label(),
                    current = ?state.current,
                    "transition"
                );
            }
            self.state = state;
            for effect in effects {
                self.execute(effect);
            }
            self.dirty = true;
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::CancelTimers => self.timers.cancel_all(),
            Effect::Release => self.release(),
            Effect::Load(index) => self.load(index),
            Effect::Play => match (self.engine.as_mut(), self.handle) {
                (Some(engine), Some(handle)) => engine.play(handle),
                // Nothing could be loaded: count it as played through.
                _ => {
                    if self.state.phase == Phase::Playing {
                        self.deferred.push_back(Event::TrackEnded);
                    }
                }
            },
            Effect::Pause => {
                if let (Some(engine), Some(handle)) = (self.engine.as_mut(), self.handle) {
                    engine.pause(handle);
                }
            }
            Effect::StartWait(seconds) => {
                let now = self.clock.now();
                let wait = Duration::try_from_secs_f64(seconds.clamp(0.0, MAX_SILENCE_SECONDS))
                    .unwrap_or(Duration::ZERO);
                self.timers.once(TimerKind::PhaseEnd, wait, now);
                self.timers
                    .repeating(TimerKind::ProgressTick, self.tick, now);
            }
            Effect::MarkFinished(index) => self.timeline.set_finished(index, true),
            Effect::MarkUnfinished(index) => self.timeline.set_finished(index, false),
            Effect::ResetFinished => self.timeline.reset_finished(),
            Effect::ReconcileDuration(index) => {
                let Some((engine, handle)) = self.engine.as_ref().zip(self.handle) else {
                    return;
                };
                let reported = engine
                    .duration(handle)
                    .or_else(|| Some(engine.position(handle)))
                    .filter(|d| *d > 0.0);
                if let Some(seconds) = reported {
                    if self.timeline.reconcile_duration(index, seconds) {
                        debug!(index, seconds, "duration reconciled from engine");
                    }
                }
            }
        }
    }

    fn load(&mut self, index: usize) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let Some(track) = self.timeline.get(index) else {
            return;
        };
        match engine.load(&track.source) {
            Ok(handle) => {
                engine.set_volume(handle, track.gain());
                self.handle = Some(handle);
                info!(index, name = %track.name, "loaded track");
            }
            Err(e) => {
                warn!(index, error = %e, "track could not be loaded");
                self.timeline.mark_unreadable(index);
            }
        }
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Some(engine) = self.engine.as_mut() {
                engine.stop(handle);
                engine.unload(handle);
            }
        }
    }

    fn on_engine_event(&mut self, event: EngineEvent) {
        if Some(event.handle()) != self.handle {
            debug!(?event, "ignoring event for released handle");
            return;
        }
        self.dirty = true;
        match event {
            EngineEvent::Loaded { duration, .. } => {
                if let (Some(index), Some(seconds)) = (self.state.current, duration) {
                    if self.timeline.reconcile_duration(index, seconds) {
                        debug!(index, seconds, "duration reconciled on load");
                    }
                }
            }
            EngineEvent::Ended { .. } => self.dispatch(Event::TrackEnded),
            EngineEvent::Failed { reason, .. } => {
                warn!(current = ?self.state.current, %reason, "playback failed");
                if let Some(index) = self.state.current {
                    self.timeline.mark_unreadable(index);
                }
                self.release();
                if self.state.phase == Phase::Playing {
                    self.dispatch(Event::TrackEnded);
                }
            }
        }
    }
}
