//! Import of audio files from the command line.
//!
//! Files named explicitly are taken as given; directories are walked and
//! filtered by extension.

mod scan;

pub use scan::*;
