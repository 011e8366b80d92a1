//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model holds what only the front end cares about: the cursor,
//! an open gap/lead editor and the last status message. Playback state
//! lives in the `Sequencer`.

mod model;

pub use model::*;
