//! Duration resolution and level checks off the UI thread.
//!
//! A `ResolverWorker` owns one background thread that probes sources with a
//! `DurationProbe`, measures them with a `LevelMeter` on request, and
//! reports back over channels. Outcomes are applied to the timeline by
//! whoever drains the channels, so the timeline itself never leaves the
//! event loop thread.

mod levels;
mod probe;
mod worker;

pub use levels::*;
pub use probe::*;
pub use worker::*;
