use std::time::Instant;

/// Where the play-through currently is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Silence before the first track.
    LeadIn,
    /// A track is loaded; the engine may be paused.
    Playing,
    /// Silence between two tracks.
    Gap,
    Finished,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "Stopped",
            Phase::LeadIn => "Lead-in",
            Phase::Playing => "Playing",
            Phase::Gap => "Gap",
            Phase::Finished => "Finished",
        }
    }

    /// Phases that run on a wall-clock timer.
    pub fn is_waiting(self) -> bool {
        matches!(self, Phase::LeadIn | Phase::Gap)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct SequencerState {
    pub phase: Phase,
    /// Index into the timeline. Always `None` when idle.
    pub current: Option<usize>,
    /// Start of the current lead-in or gap.
    pub phase_started_at: Option<Instant>,
    /// Length of the current lead-in or gap, captured on entry.
    pub phase_duration: f64,
    pub has_played_once: bool,
}

impl SequencerState {
    /// Seconds spent in the current lead-in or gap, capped at its length.
    pub fn elapsed_in_phase(&self, now: Instant) -> f64 {
        match self.phase_started_at {
            Some(start) if self.phase.is_waiting() => now
                .saturating_duration_since(start)
                .as_secs_f64()
                .min(self.phase_duration),
            _ => 0.0,
        }
    }

    /// Seconds left in the current lead-in or gap.
    pub fn countdown(&self, now: Instant) -> Option<f64> {
        self.phase
            .is_waiting()
            .then(|| (self.phase_duration - self.elapsed_in_phase(now)).max(0.0))
    }
}
