//! Playback engine adapter.
//!
//! The sequencer drives audio only through `PlaybackEngine`. The binary uses
//! the rodio-backed `RodioEngine`; tests use an in-memory fake.

mod rodio_engine;
mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use rodio_engine::RodioEngine;
pub use types::*;
