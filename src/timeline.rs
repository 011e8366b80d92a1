//! Timeline model: the ordered track list plus the lead-in and gap settings.
//!
//! The model owns every `Track`. Structural edits (remove, move, clear) are
//! crate-private because the sequencer has to adjust its current index in
//! the same step; the public surface for those lives on `Sequencer`.

mod model;
mod seconds;
mod track;

pub use model::*;
pub use seconds::*;
pub use track::*;
