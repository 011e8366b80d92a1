//! Play-through sequencing: lead-in, tracks, gaps and the end.
//!
//! `transition::step` is the state machine. `Sequencer` runs the effects it
//! asks for against a `PlaybackEngine`, a `TimerQueue` and a `Clock`.

mod clock;
mod runner;
mod state;
mod timers;
mod transition;

pub use clock::*;
pub use runner::Sequencer;
pub use state::*;
pub use timers::{TimerId, TimerKind, TimerQueue};
pub use transition::{remap_index, step, Context, Effect, Event, Step};

#[cfg(test)]
mod tests;
