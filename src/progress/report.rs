use std::time::Instant;

use crate::sequencer::{Phase, SequencerState};
use crate::timeline::{Timeline, TotalDuration};

/// What the engine says about the live handle at the moment of polling.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct EngineSample {
    pub position: f64,
    pub duration: Option<f64>,
    pub playing: bool,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Snapshot {
    pub phase: Phase,
    pub current: Option<usize>,
    pub total: TotalDuration,
    pub elapsed_seconds: f64,
    /// Seconds left in a lead-in or gap.
    pub phase_countdown: Option<f64>,
    pub unreadable_tracks: usize,
    pub engine_playing: bool,
}

impl Snapshot {
    /// Elapsed over total in `[0, 1]`; `None` while the total is pending.
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            TotalDuration::Known(total) if total > 0.0 => {
                Some((self.elapsed_seconds / total).clamp(0.0, 1.0))
            }
            TotalDuration::Known(_) => Some(0.0),
            TotalDuration::Pending => None,
        }
    }
}

pub fn compute(
    timeline: &Timeline,
    state: &SequencerState,
    sample: &EngineSample,
    now: Instant,
) -> Snapshot {
    Snapshot {
        phase: state.phase,
        current: state.current,
        total: timeline.total(),
        elapsed_seconds: elapsed_seconds(timeline, state, sample, now),
        phase_countdown: state.countdown(now),
        unreadable_tracks: timeline.unreadable_count(),
        engine_playing: sample.playing,
    }
}

/// Seconds of the play-through behind the playhead.
pub fn elapsed_seconds(
    timeline: &Timeline,
    state: &SequencerState,
    sample: &EngineSample,
    now: Instant,
) -> f64 {
    let Some(cur) = state.current else {
        return 0.0;
    };
    if state.phase == Phase::Idle {
        return 0.0;
    }

    let lead = match state.phase {
        Phase::LeadIn => state.elapsed_in_phase(now),
        _ => timeline.lead_seconds(),
    };
    let before = timeline.known_duration_before(cur) + timeline.gap_seconds() * cur as f64;
    let duration = timeline.get(cur).and_then(|t| t.known_duration());

    let within = match state.phase {
        Phase::Idle | Phase::LeadIn => 0.0,
        Phase::Playing => {
            let position = sample.position.max(0.0);
            match duration {
                Some(d) => position.min(d),
                None => position,
            }
        }
        Phase::Gap => duration.unwrap_or(0.0) + state.elapsed_in_phase(now),
        Phase::Finished => duration.unwrap_or(0.0),
    };
    lead + before + within
}

/// Fill level of one track's own progress bar, in `[0, 1]`.
pub fn track_progress(
    timeline: &Timeline,
    state: &SequencerState,
    sample: &EngineSample,
    index: usize,
) -> f64 {
    let Some(track) = timeline.get(index) else {
        return 0.0;
    };
    if track.finished {
        return 1.0;
    }
    let Some(cur) = state.current.filter(|_| state.phase != Phase::Idle) else {
        return 0.0;
    };
    if index < cur {
        return 1.0;
    }
    if index > cur {
        return 0.0;
    }
    match state.phase {
        Phase::Gap | Phase::Finished => 1.0,
        Phase::Playing => match track.known_duration().or(sample.duration) {
            Some(d) if d > 0.0 => (sample.position / d).clamp(0.0, 1.0),
            _ => 0.0,
        },
        Phase::Idle | Phase::LeadIn => 0.0,
    }
}
