//! The play-through state machine as a pure function.
//!
//! `step` never touches the engine or the timers. It returns the next state
//! plus the effects the `Sequencer` must run, in order.

use std::time::Instant;

use super::state::{Phase, SequencerState};

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Event {
    SelectAndPlay(usize),
    SelectOnly(usize),
    TogglePlayPause,
    Stop,
    /// The lead-in or gap timer fired.
    PhaseElapsed,
    /// The current track reached its end (or could not be played at all).
    TrackEnded,
    /// The track at this index was already removed from the timeline.
    TrackRemoved(usize),
    /// The track at `from` was already moved to `to`.
    TrackMoved { from: usize, to: usize },
    Cleared,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Effect {
    CancelTimers,
    /// Stop and unload the live engine handle, if any.
    Release,
    Load(usize),
    Play,
    Pause,
    /// Arm the phase-end timer and the progress tick.
    StartWait(f64),
    MarkFinished(usize),
    MarkUnfinished(usize),
    ResetFinished,
    /// Copy an engine-reported duration into the track if it was unknown.
    ReconcileDuration(usize),
}

/// Facts about the outside world a transition may depend on.
#[derive(Debug, Copy, Clone)]
pub struct Context {
    pub track_count: usize,
    pub gap_seconds: f64,
    pub lead_seconds: f64,
    pub engine_playing: bool,
    pub now: Instant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub state: SequencerState,
    pub effects: Vec<Effect>,
}

impl Step {
    fn unchanged(state: SequencerState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }
}

pub fn step(state: SequencerState, event: Event, ctx: &Context) -> Step {
    match event {
        Event::SelectAndPlay(index) => start_track(state, index, true, ctx),
        Event::SelectOnly(index) => start_track(state, index, false, ctx),
        Event::TogglePlayPause => toggle(state, ctx),
        Event::Stop | Event::Cleared => stop(),
        Event::PhaseElapsed => match state.phase {
            Phase::LeadIn => begin_playing(state),
            Phase::Gap => advance(state, ctx),
            _ => Step::unchanged(state),
        },
        Event::TrackEnded => track_ended(state, ctx),
        Event::TrackRemoved(index) => match state.current {
            Some(cur) if cur == index => stop(),
            Some(cur) if cur > index => Step::unchanged(SequencerState {
                current: Some(cur - 1),
                ..state
            }),
            _ => Step::unchanged(state),
        },
        Event::TrackMoved { from, to } => Step::unchanged(SequencerState {
            current: state.current.map(|cur| remap_index(cur, from, to)),
            ..state
        }),
    }
}

/// Where the item at `cur` ends up after moving `from` to `to`.
pub fn remap_index(cur: usize, from: usize, to: usize) -> usize {
    if cur == from {
        to
    } else if from < cur && cur <= to {
        cur - 1
    } else if to <= cur && cur < from {
        cur + 1
    } else {
        cur
    }
}

fn start_track(state: SequencerState, index: usize, autoplay: bool, ctx: &Context) -> Step {
    if index >= ctx.track_count {
        return Step::unchanged(state);
    }
    let mut effects = vec![Effect::CancelTimers, Effect::Release];
    if matches!(state.phase, Phase::Idle | Phase::Finished) {
        effects.push(Effect::ResetFinished);
    }
    effects.push(Effect::Load(index));
    effects.push(Effect::MarkUnfinished(index));

    let mut next = SequencerState {
        phase: Phase::Playing,
        current: Some(index),
        phase_started_at: None,
        phase_duration: 0.0,
        has_played_once: state.has_played_once,
    };
    if autoplay {
        if !next.has_played_once && ctx.lead_seconds > 0.0 {
            enter_wait(&mut next, Phase::LeadIn, ctx.lead_seconds, ctx, &mut effects);
        } else {
            effects.push(Effect::Play);
            next.has_played_once = true;
        }
    }
    Step {
        state: next,
        effects,
    }
}

fn enter_wait(
    state: &mut SequencerState,
    phase: Phase,
    seconds: f64,
    ctx: &Context,
    effects: &mut Vec<Effect>,
) {
    state.phase = phase;
    state.phase_started_at = Some(ctx.now);
    state.phase_duration = seconds;
    effects.push(Effect::StartWait(seconds));
}

/// Leave the lead-in and start the loaded track.
fn begin_playing(state: SequencerState) -> Step {
    Step {
        state: SequencerState {
            phase: Phase::Playing,
            phase_started_at: None,
            phase_duration: 0.0,
            has_played_once: true,
            ..state
        },
        effects: vec![Effect::CancelTimers, Effect::Play],
    }
}

/// Move on to the track after the current one, or finish.
fn advance(state: SequencerState, ctx: &Context) -> Step {
    let next = state.current.map_or(0, |cur| cur + 1);
    if next >= ctx.track_count {
        return finish(state);
    }
    Step {
        state: SequencerState {
            phase: Phase::Playing,
            current: Some(next),
            phase_started_at: None,
            phase_duration: 0.0,
            has_played_once: true,
        },
        effects: vec![
            Effect::CancelTimers,
            Effect::Release,
            Effect::Load(next),
            Effect::MarkUnfinished(next),
            Effect::Play,
        ],
    }
}

fn finish(state: SequencerState) -> Step {
    Step {
        state: SequencerState {
            phase: Phase::Finished,
            current: state.current,
            phase_started_at: None,
            phase_duration: 0.0,
            has_played_once: false,
        },
        effects: vec![Effect::CancelTimers, Effect::Release],
    }
}

fn stop() -> Step {
    Step {
        state: SequencerState::default(),
        effects: vec![Effect::CancelTimers, Effect::Release],
    }
}

fn track_ended(state: SequencerState, ctx: &Context) -> Step {
    let (Phase::Playing, Some(cur)) = (state.phase, state.current) else {
        return Step::unchanged(state);
    };
    let mut effects = vec![Effect::ReconcileDuration(cur), Effect::MarkFinished(cur)];

    let has_next = cur + 1 < ctx.track_count;
    let mut after = if has_next && ctx.gap_seconds > 0.0 {
        let mut next = state;
        let mut wait = vec![Effect::CancelTimers, Effect::Release];
        enter_wait(&mut next, Phase::Gap, ctx.gap_seconds, ctx, &mut wait);
        Step {
            state: next,
            effects: wait,
        }
    } else if has_next {
        advance(state, ctx)
    } else {
        finish(state)
    };
    effects.append(&mut after.effects);
    Step {
        state: after.state,
        effects,
    }
}

fn toggle(state: SequencerState, ctx: &Context) -> Step {
    match state.phase {
        Phase::Idle | Phase::Finished => start_track(state, 0, true, ctx),
        Phase::LeadIn => begin_playing(state),
        Phase::Gap => advance(state, ctx),
        Phase::Playing if ctx.engine_playing => Step {
            state,
            effects: vec![Effect::Pause],
        },
        Phase::Playing => {
            let mut next = state;
            let mut effects = Vec::new();
            if !state.has_played_once && ctx.lead_seconds > 0.0 {
                effects.push(Effect::CancelTimers);
                enter_wait(&mut next, Phase::LeadIn, ctx.lead_seconds, ctx, &mut effects);
            } else {
                next.has_played_once = true;
                effects.push(Effect::Play);
            }
            Step {
                state: next,
                effects,
            }
        }
    }
}
