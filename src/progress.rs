//! Progress reporting over the whole timeline.
//!
//! Everything here is a pure function of the timeline, the sequencer state
//! and one engine sample, so the UI can poll as often as it likes.

mod report;

pub use report::*;
