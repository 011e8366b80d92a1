use std::time::Instant;

/// Source of wall-clock time for lead-in and gap phases.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Copy, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
pub(crate) use manual::ManualClock;
