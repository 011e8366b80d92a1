//! Deadline queue for the lead-in/gap timer and the progress tick.
//!
//! Timers only fire when the owner calls `pop_due`, so cancelling a timer
//! always wins over a deadline that has already passed.

use std::time::{Duration, Instant};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TimerKind {
    /// End of the current lead-in or gap.
    PhaseEnd,
    /// Periodic progress refresh while waiting.
    ProgressTick,
}

#[derive(Debug, Clone)]
struct Timer {
    id: TimerId,
    kind: TimerKind,
    deadline: Instant,
    period: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: Vec<Timer>,
    next_id: u64,
}

const MIN_PERIOD: Duration = Duration::from_millis(1);

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn once(&mut self, kind: TimerKind, after: Duration, now: Instant) -> TimerId {
        self.push(kind, deadline_after(now, after), None)
    }

    pub fn repeating(&mut self, kind: TimerKind, period: Duration, now: Instant) -> TimerId {
        let period = period.max(MIN_PERIOD);
        self.push(kind, deadline_after(now, period), Some(period))
    }

    fn push(&mut self, kind: TimerKind, deadline: Instant, period: Option<Duration>) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.timers.push(Timer {
            id,
            kind,
            deadline,
            period,
        });
        id
    }

    /// Cancel `id`. Returns false when it was not armed (already fired or
    /// cancelled), which is not an error.
    #[cfg(test)]
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    #[cfg(test)]
    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|t| t.deadline).min()
    }

    /// Take the earliest timer due at `now`. One-shot timers are removed;
    /// repeating timers are re-armed one period later (or one period from
    /// `now` if they fell behind).
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, TimerKind)> {
        let pos = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deadline <= now)
            .min_by_key(|(_, t)| t.deadline)
            .map(|(i, _)| i)?;

        let timer = &mut self.timers[pos];
        let fired = (timer.id, timer.kind);
        match timer.period {
            Some(period) => {
                let next = timer
                    .deadline
                    .checked_add(period)
                    .filter(|next| *next > now)
                    .or_else(|| now.checked_add(period));
                match next {
                    Some(next) => timer.deadline = next,
                    None => {
                        self.timers.remove(pos);
                    }
                }
            }
            None => {
                self.timers.remove(pos);
            }
        }
        Some(fired)
    }
}

/// `now + after`, or `now` when that instant cannot be represented.
fn deadline_after(now: Instant, after: Duration) -> Instant {
    now.checked_add(after).unwrap_or(now)
}
